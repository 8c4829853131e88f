//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Two entities are the same entity when their ids are equal, even if their
/// attributes (username, email, roles) differ.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Whether `other` refers to the same entity as `self`.
    fn is_same_entity(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

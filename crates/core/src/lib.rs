//! `smbridge-core` — shared building blocks for the header-identity bridge.
//!
//! This crate contains no HTTP, storage, or configuration concerns.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AccountId, SessionId};

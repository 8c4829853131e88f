//! Infrastructure layer: reference collaborators for the bridge and settings loading.

pub mod directory;
pub mod session;
pub mod settings;


pub use directory::InMemoryAccountDirectory;
pub use session::{InMemorySessionStore, SessionChange, SessionHandle, SessionRecord};

//! Storage collaborators for the domain handlers.
//!
//! - [`record`]: Stored entity types
//! - [`memory`]: In-memory implementation of every store trait

pub mod memory;
pub mod record;

pub use memory::MemoryStore;
pub use record::{Cart, CartLine, Product};

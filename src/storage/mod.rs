//! Storage abstraction
//!
//! The engine reads and writes collaborator-owned data through these
//! traits: the identity directory, the organization structure store, the
//! custom role store, and the append-only audit sink. `MemoryStore`
//! implements all four in process and backs the test suite.

mod memory;
#[cfg(test)]
mod tests;
mod traits;

pub use memory::MemoryStore;
pub use traits::{AuditSink, DirectoryStore, OrganizationStore, RoleStore};

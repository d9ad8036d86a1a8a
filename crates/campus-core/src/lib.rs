//! # campus-core
//!
//! Seam traits and the mutation gateway.
//!
//! The traits in [`traits`] are the only way the gateway and the attendance
//! state machine reach permissions, the audit ledger, or persistence. Each
//! is held as `Arc<dyn Trait>` so a deployment can swap the in-memory
//! implementations for real backends without touching the pipeline.

pub mod gateway;
pub mod memory;
pub mod traits;

pub use gateway::{MutationGateway, MutationReceipt};
pub use memory::InMemoryPrincipalStore;

//! Catalog passes over the blob store.

pub mod enumerator;
pub mod filter;
pub mod orchestrator;

pub use enumerator::{SourceEnumerator, SourceObject, SourceStream};
pub use filter::KeyFilter;
pub use orchestrator::{BackfillReport, SyncOrchestrator, SyncReport};

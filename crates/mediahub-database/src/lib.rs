//! # mediahub-database
//!
//! PostgreSQL connection management, migrations, and the catalog
//! persistence boundary. [`CatalogStore`] is implemented by
//! [`PgCatalogStore`] for production and by [`MemoryCatalogStore`] for
//! tests and dry runs.

pub mod catalog;
pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;

pub use catalog::{CatalogStore, ChildEntries, PgCatalogStore, Upserted};
pub use connection::DatabasePool;
pub use memory::MemoryCatalogStore;

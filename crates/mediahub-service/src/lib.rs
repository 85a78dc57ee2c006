//! # mediahub-service
//!
//! Catalog services for MediaHub. Every component takes a
//! [`CatalogContext`] holding the catalog store, blob store, transcoder,
//! and configuration:
//!
//! - [`PathResolver`] turns canonical paths into folder ids.
//! - [`SyncOrchestrator`] runs full syncs and backfills.
//! - [`AssetDeriver`] and [`HlsService`] produce derived artifacts.
//! - [`CatalogBrowser`] and [`UploadService`] serve the catalog.

pub mod assets;
pub mod catalog;
pub mod context;
pub mod sync;

pub use assets::{AssetDeriver, CleanupReport, Derivation, HlsService, PlaylistHandle};
pub use catalog::{CatalogBrowser, FileLocation, PathResolver, RenamedFile, UploadService};
pub use context::CatalogContext;
pub use sync::{BackfillReport, KeyFilter, SyncOrchestrator, SyncReport};

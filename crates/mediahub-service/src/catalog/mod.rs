//! Catalog tree maintenance and browsing.

pub mod browse;
pub mod resolver;
pub mod upload;

pub use browse::{CatalogBrowser, FileLocation, RenamedFile};
pub use resolver::PathResolver;
pub use upload::UploadService;

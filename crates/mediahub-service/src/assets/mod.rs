//! Derived media artifacts: thumbnails, subtitle tracks, and HLS.

pub mod deriver;
pub mod hls;
pub mod keys;

pub use deriver::{AssetDeriver, Derivation};
pub use hls::{CleanupReport, HlsService, PlaylistHandle};

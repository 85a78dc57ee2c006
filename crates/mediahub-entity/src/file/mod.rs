//! File domain entities.

pub mod model;

pub use model::{AssetUpdate, File, NewFile};

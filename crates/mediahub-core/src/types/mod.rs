//! Core type definitions used across the MediaHub workspace.

pub mod id;
pub mod path;

pub use id::*;
pub use path::{CanonicalPath, validate_name};

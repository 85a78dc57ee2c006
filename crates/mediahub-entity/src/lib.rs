//! # mediahub-entity
//!
//! Catalog entity models for MediaHub. `Folder` and `File` mirror the
//! two catalog tables and derive `sqlx::FromRow`; the remaining types are
//! creation payloads and listing value objects.

pub mod file;
pub mod folder;
pub mod listing;

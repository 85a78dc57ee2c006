//! Repository implementations for the catalog tables.

pub mod file;
pub mod folder;

pub use file::FileRepository;
pub use folder::FolderRepository;

/// Attempts for an insert-if-absent before giving up.
///
/// A conflict followed by a missing row on re-select means a concurrent
/// writer removed it in between; retrying settles that race.
pub(crate) const INSERT_ATTEMPTS: usize = 3;

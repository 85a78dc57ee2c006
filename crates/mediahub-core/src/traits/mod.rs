//! Core traits defined in `mediahub-core` and implemented by other crates.

pub mod storage;
pub mod transcoder;

pub use storage::{ByteStream, ObjectStream, ReadHandle, StorageObjectMeta, StorageProvider};
pub use transcoder::{DerivedKind, HLS_PLAYLIST, HlsProcess, TranscodeOutcome, Transcoder};

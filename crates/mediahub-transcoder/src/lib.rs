//! # mediahub-transcoder
//!
//! Runs ffmpeg out of process to derive thumbnails, subtitle tracks, and
//! HLS segment sets. [`FfmpegTranscoder`] implements the core
//! [`Transcoder`](mediahub_core::traits::Transcoder) trait on top of the
//! generic [`ProcessExecutor`].
//!
//! The `mock` feature adds [`mock::MockTranscoder`], a scripted
//! implementation used by tests across the workspace.

pub mod error;
pub mod executor;
pub mod ffmpeg;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod stream;

pub use error::ExecutorError;
pub use executor::{CapturedOutput, ExecutionParams, ProcessExecutor, StreamingProcess};
pub use ffmpeg::FfmpegTranscoder;

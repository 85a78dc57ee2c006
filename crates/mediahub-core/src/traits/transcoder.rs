//! Transcoder trait for the external media processor.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::task::JoinHandle;

use crate::result::AppResult;
use crate::traits::storage::{ByteStream, ReadHandle};

/// A single-file artifact derived from a media object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedKind {
    /// A JPEG frame.
    Thumbnail,
    /// A WebVTT track extracted from the first subtitle stream.
    Subtitle,
}

impl DerivedKind {
    /// Reserved top-level namespace holding artifacts of this kind.
    pub fn namespace(self) -> &'static str {
        match self {
            Self::Thumbnail => "thumbnails",
            Self::Subtitle => "subtitles",
        }
    }

    /// Extension (without the dot) of the stored artifact.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Thumbnail => "jpg",
            Self::Subtitle => "vtt",
        }
    }

    /// MIME type of the stored artifact.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Thumbnail => "image/jpeg",
            Self::Subtitle => "text/vtt",
        }
    }
}

impl fmt::Display for DerivedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thumbnail => write!(f, "thumbnail"),
            Self::Subtitle => write!(f, "subtitle"),
        }
    }
}

/// Result of a single render invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodeOutcome {
    /// The artifact bytes, captured from the process output.
    Produced(Bytes),
    /// The process ran but could not produce the artifact.
    Unavailable(String),
    /// The read reference expired before the process finished.
    Expired,
}

/// A running HLS generation.
///
/// Dropping `output` before it ends terminates the process.
pub struct HlsProcess {
    /// Bytes the transcoder writes to stdout while it runs.
    pub output: ByteStream,
    /// Resolves when the process exits.
    pub completion: JoinHandle<AppResult<()>>,
}

impl fmt::Debug for HlsProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HlsProcess").finish_non_exhaustive()
    }
}

/// An out-of-process transcoder.
#[async_trait]
pub trait Transcoder: Send + Sync + fmt::Debug + 'static {
    /// Produce a thumbnail or subtitle, capturing the output in memory.
    async fn render(&self, input: &ReadHandle, kind: DerivedKind) -> AppResult<TranscodeOutcome>;

    /// Start HLS generation into `output_dir`, which must already exist.
    ///
    /// The playlist is written to `output_dir/playlist.m3u8` and segments
    /// to `output_dir/NNN.ts`.
    async fn spawn_hls(
        &self,
        input: &ReadHandle,
        output_dir: &Path,
        segment_seconds: u32,
    ) -> AppResult<HlsProcess>;
}

/// File name of the HLS playlist inside an output directory.
pub const HLS_PLAYLIST: &str = "playlist.m3u8";

//! External transcoder configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the ffmpeg-backed transcoder and the HLS cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscoderConfig {
    /// Path or name of the ffmpeg executable.
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,
    /// Hard limit for a single thumbnail or subtitle invocation.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Seek offset for the thumbnail frame.
    #[serde(default = "default_seek")]
    pub thumbnail_seek: String,
    /// Scale thumbnails to this width, keeping aspect ratio.
    #[serde(default)]
    pub thumbnail_width: Option<u32>,
    /// Attempts per artifact when the signed reference expires mid-run.
    #[serde(default = "default_attempts")]
    pub max_attempts: u32,
    /// Regenerate artifacts older than their source object.
    #[serde(default = "default_true")]
    pub regenerate_stale: bool,
    /// Directory holding per-file HLS output.
    #[serde(default = "default_hls_root")]
    pub hls_root: String,
    /// Target segment duration.
    #[serde(default = "default_segment_seconds")]
    pub hls_segment_seconds: u32,
    /// Age after which a cached playlist is regenerated.
    #[serde(default = "default_freshness")]
    pub hls_freshness_hours: u64,
}

impl TranscoderConfig {
    /// Invocation timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// HLS freshness window as a [`Duration`].
    pub fn hls_freshness(&self) -> Duration {
        Duration::from_secs(self.hls_freshness_hours * 3600)
    }
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg(),
            timeout_seconds: default_timeout(),
            thumbnail_seek: default_seek(),
            thumbnail_width: None,
            max_attempts: default_attempts(),
            regenerate_stale: true,
            hls_root: default_hls_root(),
            hls_segment_seconds: default_segment_seconds(),
            hls_freshness_hours: default_freshness(),
        }
    }
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_timeout() -> u64 {
    600
}

fn default_seek() -> String {
    "00:00:05".to_string()
}

fn default_attempts() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

fn default_hls_root() -> String {
    "./data/hls".to_string()
}

fn default_segment_seconds() -> u32 {
    10
}

fn default_freshness() -> u64 {
    24
}

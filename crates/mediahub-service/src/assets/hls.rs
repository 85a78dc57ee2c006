//! On-demand HLS generation with a freshness-windowed cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use dashmap::DashSet;
use tokio::fs;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use mediahub_core::error::{AppError, ErrorKind};
use mediahub_core::result::AppResult;
use mediahub_core::traits::storage::ByteStream;
use mediahub_core::traits::transcoder::HLS_PLAYLIST;
use mediahub_core::types::CanonicalPath;

use crate::assets::keys::hls_dir;
use crate::context::CatalogContext;

/// What a caller gets back from [`HlsService::ensure_hls`].
pub enum PlaylistHandle {
    /// A playlist younger than the freshness window already exists.
    Cached {
        /// Path of the playlist.
        playlist: PathBuf,
    },
    /// Another request already started a generation into this
    /// directory; the playlist appears at `playlist` once the transcoder
    /// has written its first segment.
    InProgress {
        /// Where the playlist is being written.
        playlist: PathBuf,
    },
    /// A new generation is running.
    Generating {
        /// Where the playlist is being written.
        playlist: PathBuf,
        /// Transcoder output, to be relayed to the requester. Dropping it
        /// stops the transcoder.
        output: ByteStream,
        /// Waits for the transcoder to exit, then removes expired segments.
        cleanup: JoinHandle<CleanupReport>,
    },
    /// The source is not a video container.
    NotApplicable,
}

impl PlaylistHandle {
    /// Playlist path, if any.
    pub fn playlist(&self) -> Option<&Path> {
        match self {
            Self::Cached { playlist }
            | Self::InProgress { playlist }
            | Self::Generating { playlist, .. } => Some(playlist),
            Self::NotApplicable => None,
        }
    }
}

impl std::fmt::Debug for PlaylistHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cached { playlist } => f.debug_struct("Cached").field("playlist", playlist).finish(),
            Self::InProgress { playlist } => f
                .debug_struct("InProgress")
                .field("playlist", playlist)
                .finish(),
            Self::Generating { playlist, .. } => f
                .debug_struct("Generating")
                .field("playlist", playlist)
                .finish_non_exhaustive(),
            Self::NotApplicable => f.write_str("NotApplicable"),
        }
    }
}

/// Outcome of the post-generation cleanup task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Whether the transcoder exited successfully.
    pub completed: bool,
    /// Segment files removed for being older than the window.
    pub removed: usize,
}

/// Serves HLS playlists, regenerating them once they age out.
///
/// At most one generation runs per output directory. Clones share the set
/// of running generations.
#[derive(Debug, Clone)]
pub struct HlsService {
    ctx: CatalogContext,
    root: PathBuf,
    running: Arc<DashSet<PathBuf>>,
}

/// Holds an output directory in the running set until dropped.
struct RunningGuard {
    running: Arc<DashSet<PathBuf>>,
    dir: PathBuf,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.running.remove(&self.dir);
    }
}

impl HlsService {
    /// Creates the service, writing output under `transcoder.hls_root`.
    pub fn new(ctx: CatalogContext) -> Self {
        let root = PathBuf::from(&ctx.config.transcoder.hls_root);
        Self {
            ctx,
            root,
            running: Arc::new(DashSet::new()),
        }
    }

    /// Root directory for HLS output.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return a fresh cached playlist for `key`, or start generating one,
    /// using the configured freshness window.
    pub async fn ensure_hls(&self, key: &CanonicalPath) -> AppResult<PlaylistHandle> {
        let window = self.ctx.config.transcoder.hls_freshness();
        self.ensure_hls_within(key, window).await
    }

    /// Like [`ensure_hls`](Self::ensure_hls) with an explicit freshness
    /// window.
    ///
    /// `NotFound` if `key` is not cataloged.
    pub async fn ensure_hls_within(
        &self,
        key: &CanonicalPath,
        window: Duration,
    ) -> AppResult<PlaylistHandle> {
        if !key.extension().is_some_and(|ext| self.ctx.is_video_extension(ext)) {
            return Ok(PlaylistHandle::NotApplicable);
        }

        let url = self.ctx.public_url(key.as_str());
        if self.ctx.store.find_file_by_url(&url).await?.is_none() {
            return Err(AppError::not_found(format!("File not found: {key}")));
        }

        let dir = hls_dir(&self.root, key);
        let playlist = dir.join(HLS_PLAYLIST);

        if self.running.contains(&dir) {
            debug!(key = %key, "HLS generation already running");
            return Ok(PlaylistHandle::InProgress { playlist });
        }
        if is_fresh(&playlist, window).await {
            debug!(key = %key, "Serving cached HLS playlist");
            return Ok(PlaylistHandle::Cached { playlist });
        }
        if !self.running.insert(dir.clone()) {
            return Ok(PlaylistHandle::InProgress { playlist });
        }
        let guard = RunningGuard {
            running: self.running.clone(),
            dir: dir.clone(),
        };

        let handle = self
            .ctx
            .storage
            .read_handle(key.as_str(), self.ctx.presign_ttl())
            .await?;
        fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Internal,
                format!("Failed to create HLS directory: {}", dir.display()),
                e,
            )
        })?;

        let process = self
            .ctx
            .transcoder
            .spawn_hls(&handle, &dir, self.ctx.config.transcoder.hls_segment_seconds)
            .await?;
        info!(key = %key, dir = %dir.display(), "Generating HLS playlist");

        let completion = process.completion;
        let cleanup_dir = dir.clone();
        let cleanup = tokio::spawn(async move {
            let completed = match completion.await {
                Ok(Ok(())) => true,
                Ok(Err(e)) => {
                    warn!(dir = %cleanup_dir.display(), error = %e, "HLS transcoder failed");
                    false
                }
                Err(e) => {
                    warn!(dir = %cleanup_dir.display(), error = %e, "HLS wait task aborted");
                    false
                }
            };
            let removed = remove_expired_segments(&cleanup_dir, window).await;
            drop(guard);
            CleanupReport { completed, removed }
        });

        Ok(PlaylistHandle::Generating {
            playlist,
            output: process.output,
            cleanup,
        })
    }
}

async fn is_fresh(playlist: &Path, window: Duration) -> bool {
    let Ok(meta) = fs::metadata(playlist).await else {
        return false;
    };
    let Ok(modified) = meta.modified() else {
        return false;
    };
    match modified.elapsed() {
        Ok(age) => age < window,
        // Modified in the future.
        Err(_) => true,
    }
}

/// Delete `.ts` files in `dir` last modified longer than `window` ago.
async fn remove_expired_segments(dir: &Path, window: Duration) -> usize {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cannot scan HLS directory");
            return 0;
        }
    };

    let cutoff = SystemTime::now().checked_sub(window);
    let mut removed = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("ts") {
            continue;
        }
        let Ok(modified) = entry.metadata().await.and_then(|m| m.modified()) else {
            continue;
        };
        if cutoff.is_some_and(|cutoff| modified < cutoff) {
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove segment"),
            }
        }
    }
    if removed > 0 {
        debug!(dir = %dir.display(), removed, "Removed expired HLS segments");
    }
    removed
}

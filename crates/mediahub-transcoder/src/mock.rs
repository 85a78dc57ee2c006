//! Scripted transcoder for tests.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures::stream;
use tokio_util::sync::CancellationToken;

use mediahub_core::error::{AppError, ErrorKind};
use mediahub_core::result::AppResult;
use mediahub_core::traits::storage::ReadHandle;
use mediahub_core::traits::transcoder::{
    DerivedKind, HLS_PLAYLIST, HlsProcess, TranscodeOutcome, Transcoder,
};

use crate::stream::CancelOnDrop;

/// Transcoder returning scripted outcomes without running anything.
///
/// Each kind has a queue of outcomes; once the queue is empty the default
/// for that kind is returned. An expired read handle always yields
/// [`TranscodeOutcome::Expired`].
#[derive(Debug, Clone, Default)]
pub struct MockTranscoder {
    scripted: Arc<DashMap<DerivedKind, VecDeque<TranscodeOutcome>>>,
    defaults: Arc<DashMap<DerivedKind, TranscodeOutcome>>,
    calls: Arc<DashMap<DerivedKind, u64>>,
    hls_calls: Arc<AtomicU64>,
    hold_open: Arc<AtomicBool>,
    playlist_delay_ms: Arc<AtomicU64>,
    cancelled: Arc<DashMap<String, CancellationToken>>,
}

impl MockTranscoder {
    /// Bytes produced for thumbnails unless scripted otherwise.
    pub const THUMBNAIL: &'static [u8] = b"\xff\xd8jpeg";
    /// Bytes produced for subtitles unless scripted otherwise.
    pub const SUBTITLE: &'static [u8] = b"WEBVTT\n\n";

    /// Create a transcoder that succeeds for every kind.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an outcome for the next render of `kind`.
    pub fn push(&self, kind: DerivedKind, outcome: TranscodeOutcome) -> &Self {
        self.scripted.entry(kind).or_default().push_back(outcome);
        self
    }

    /// Replace the outcome returned once the queue for `kind` is drained.
    pub fn set_default(&self, kind: DerivedKind, outcome: TranscodeOutcome) -> &Self {
        self.defaults.insert(kind, outcome);
        self
    }

    /// Keep HLS output streams open until the consumer drops them.
    pub fn hold_hls_open(&self, hold: bool) {
        self.hold_open.store(hold, Ordering::Relaxed);
    }

    /// Write HLS output only after `delay`, the way ffmpeg writes its
    /// playlist once the first segment is done. The run completes after
    /// the write.
    pub fn delay_hls_playlist(&self, delay: Duration) {
        self.playlist_delay_ms
            .store(delay.as_millis() as u64, Ordering::Relaxed);
    }

    /// Number of renders requested for `kind`.
    pub fn render_calls(&self, kind: DerivedKind) -> u64 {
        self.calls.get(&kind).map(|c| *c).unwrap_or(0)
    }

    /// Number of HLS generations started.
    pub fn hls_calls(&self) -> u64 {
        self.hls_calls.load(Ordering::Relaxed)
    }

    /// Whether the HLS run writing into `output_dir` was cancelled.
    pub fn hls_cancelled(&self, output_dir: &Path) -> bool {
        self.cancelled
            .get(&output_dir.display().to_string())
            .map(|t| t.is_cancelled())
            .unwrap_or(false)
    }

    fn default_for(&self, kind: DerivedKind) -> TranscodeOutcome {
        if let Some(outcome) = self.defaults.get(&kind) {
            return outcome.clone();
        }
        match kind {
            DerivedKind::Thumbnail => TranscodeOutcome::Produced(Bytes::from_static(Self::THUMBNAIL)),
            DerivedKind::Subtitle => TranscodeOutcome::Produced(Bytes::from_static(Self::SUBTITLE)),
        }
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    async fn render(&self, input: &ReadHandle, kind: DerivedKind) -> AppResult<TranscodeOutcome> {
        *self.calls.entry(kind).or_insert(0) += 1;
        if input.is_expired() {
            return Ok(TranscodeOutcome::Expired);
        }
        let next = self
            .scripted
            .get_mut(&kind)
            .and_then(|mut queue| queue.pop_front());
        Ok(next.unwrap_or_else(|| self.default_for(kind)))
    }

    async fn spawn_hls(
        &self,
        _input: &ReadHandle,
        output_dir: &Path,
        _segment_seconds: u32,
    ) -> AppResult<HlsProcess> {
        self.hls_calls.fetch_add(1, Ordering::Relaxed);

        let delay = Duration::from_millis(self.playlist_delay_ms.load(Ordering::Relaxed));
        let dir = output_dir.to_path_buf();
        let delayed = !delay.is_zero() && !self.hold_open.load(Ordering::Relaxed);
        if !delayed {
            write_hls_output(&dir).await?;
        }

        let chunk = stream::iter([Ok::<_, std::io::Error>(Bytes::from_static(b"hls"))]);
        let token = CancellationToken::new();
        self.cancelled
            .insert(output_dir.display().to_string(), token.clone());

        if delayed {
            return Ok(HlsProcess {
                output: Box::pin(CancelOnDrop::new(chunk, token)),
                completion: tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    write_hls_output(&dir).await
                }),
            });
        }
        if !self.hold_open.load(Ordering::Relaxed) {
            return Ok(HlsProcess {
                output: Box::pin(CancelOnDrop::new(chunk, token)),
                completion: tokio::spawn(async { Ok(()) }),
            });
        }

        let watch = token.clone();
        let output = futures::StreamExt::chain(chunk, stream::pending());
        let completion = tokio::spawn(async move {
            watch.cancelled().await;
            Err(AppError::new(ErrorKind::ExternalService, "HLS generation cancelled"))
        });
        Ok(HlsProcess {
            output: Box::pin(CancelOnDrop::new(output, token)),
            completion,
        })
    }
}

async fn write_hls_output(dir: &Path) -> AppResult<()> {
    let write = |name: &str, body: &'static [u8]| {
        let path = dir.join(name);
        async move {
            tokio::fs::write(&path, body).await.map_err(|e| {
                AppError::with_source(ErrorKind::ExternalService, "mock HLS write failed", e)
            })
        }
    };
    write("000.ts", b"segment").await?;
    write(
        HLS_PLAYLIST,
        b"#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXTINF:10.0,\n000.ts\n#EXT-X-ENDLIST\n",
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::path::PathBuf;

    fn handle() -> ReadHandle {
        ReadHandle::Path {
            path: PathBuf::from("/media/a.mp4"),
        }
    }

    #[tokio::test]
    async fn test_scripted_then_default() {
        let mock = MockTranscoder::new();
        mock.push(
            DerivedKind::Subtitle,
            TranscodeOutcome::Unavailable("no subtitle stream".into()),
        );

        let first = mock.render(&handle(), DerivedKind::Subtitle).await.unwrap();
        let second = mock.render(&handle(), DerivedKind::Subtitle).await.unwrap();
        assert!(matches!(first, TranscodeOutcome::Unavailable(_)));
        assert_eq!(
            second,
            TranscodeOutcome::Produced(Bytes::from_static(MockTranscoder::SUBTITLE))
        );
        assert_eq!(mock.render_calls(DerivedKind::Subtitle), 2);
        assert_eq!(mock.render_calls(DerivedKind::Thumbnail), 0);
    }

    #[tokio::test]
    async fn test_expired_handle() {
        let mock = MockTranscoder::new();
        let expired = ReadHandle::Url {
            url: "memory:///a.mp4".into(),
            expires_at: chrono::Utc::now() - chrono::Duration::seconds(5),
        };
        let outcome = mock.render(&expired, DerivedKind::Thumbnail).await.unwrap();
        assert_eq!(outcome, TranscodeOutcome::Expired);
    }

    #[tokio::test]
    async fn test_held_hls_cancelled_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockTranscoder::new();
        mock.hold_hls_open(true);

        let mut process = mock.spawn_hls(&handle(), dir.path(), 10).await.unwrap();
        assert!(dir.path().join(HLS_PLAYLIST).exists());
        assert_eq!(process.output.next().await.unwrap().unwrap(), "hls");
        drop(process.output);

        assert!(process.completion.await.unwrap().is_err());
        assert!(mock.hls_cancelled(dir.path()));
    }

    #[tokio::test]
    async fn test_delayed_playlist_written_on_completion() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockTranscoder::new();
        mock.delay_hls_playlist(Duration::from_millis(100));

        let process = mock.spawn_hls(&handle(), dir.path(), 10).await.unwrap();
        assert!(!dir.path().join(HLS_PLAYLIST).exists());
        process.completion.await.unwrap().unwrap();
        assert!(dir.path().join(HLS_PLAYLIST).exists());
        assert!(dir.path().join("000.ts").exists());
    }
}

//! ffmpeg implementation of the [`Transcoder`] trait.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use mediahub_core::config::TranscoderConfig;
use mediahub_core::error::AppError;
use mediahub_core::result::AppResult;
use mediahub_core::traits::storage::ReadHandle;
use mediahub_core::traits::transcoder::{
    DerivedKind, HLS_PLAYLIST, HlsProcess, TranscodeOutcome, Transcoder,
};

use crate::error::ExecutorError;
use crate::executor::{ExecutionParams, ProcessExecutor};

/// Transcoder that shells out to ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    executor: ProcessExecutor,
    config: TranscoderConfig,
}

impl FfmpegTranscoder {
    /// Create a transcoder from configuration.
    pub fn new(config: TranscoderConfig) -> Self {
        Self {
            executor: ProcessExecutor::new(),
            config,
        }
    }

    /// First line of `ffmpeg -version`, verifying the binary is usable.
    pub async fn probe(&self) -> AppResult<String> {
        let params = ExecutionParams::new(&self.config.ffmpeg_path, 10).args(["-version"]);
        let output = self.executor.execute(&params).await?;
        let text = String::from_utf8_lossy(&output.stdout);
        Ok(text.lines().next().unwrap_or_default().to_string())
    }

    /// Arguments for a single-artifact render, writing to stdout.
    pub fn render_args(&self, input: &str, kind: DerivedKind) -> Vec<String> {
        let mut args: Vec<String> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into()];
        match kind {
            DerivedKind::Thumbnail => {
                args.extend(["-ss".into(), self.config.thumbnail_seek.clone()]);
                args.extend(["-i".into(), input.to_string()]);
                args.extend(["-vframes".into(), "1".into()]);
                if let Some(width) = self.config.thumbnail_width {
                    args.extend(["-vf".into(), format!("scale={width}:-1")]);
                }
                args.extend(["-q:v", "2", "-f", "image2", "pipe:1"].map(String::from));
            }
            DerivedKind::Subtitle => {
                args.extend(["-i".into(), input.to_string()]);
                args.extend(["-map", "0:s:0?", "-f", "webvtt", "pipe:1"].map(String::from));
            }
        }
        args
    }

    /// Arguments for HLS generation into `output_dir`.
    pub fn hls_args(&self, input: &str, output_dir: &Path, segment_seconds: u32) -> Vec<String> {
        let segments = output_dir.join("%03d.ts");
        let playlist = output_dir.join(HLS_PLAYLIST);
        let mut args: Vec<String> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into()];
        args.extend(["-y".into(), "-i".into(), input.to_string()]);
        args.extend(["-map", "0:v:0", "-map", "0:a:0?", "-f", "hls"].map(String::from));
        args.extend(["-hls_time".into(), segment_seconds.to_string()]);
        args.extend(["-hls_list_size".into(), "0".into()]);
        args.extend([
            "-hls_segment_filename".into(),
            segments.to_string_lossy().into_owned(),
        ]);
        args.push(playlist.to_string_lossy().into_owned());
        args
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn render(&self, input: &ReadHandle, kind: DerivedKind) -> AppResult<TranscodeOutcome> {
        let params = ExecutionParams::new(&self.config.ffmpeg_path, self.config.timeout_seconds)
            .args(self.render_args(&input.input(), kind));

        match self.executor.execute(&params).await {
            Ok(output) if output.stdout.is_empty() => {
                debug!(%kind, "Transcoder produced no output");
                Ok(TranscodeOutcome::Unavailable("no output produced".into()))
            }
            Ok(output) => {
                debug!(%kind, bytes = output.stdout.len(), duration_ms = output.duration_ms, "Rendered artifact");
                Ok(TranscodeOutcome::Produced(output.stdout))
            }
            Err(ExecutorError::ProcessFailed { .. } | ExecutorError::Timeout(_))
                if input.is_expired() =>
            {
                Ok(TranscodeOutcome::Expired)
            }
            Err(e @ (ExecutorError::ProcessFailed { .. } | ExecutorError::Timeout(_))) => {
                Ok(TranscodeOutcome::Unavailable(e.to_string()))
            }
            Err(e) => Err(AppError::from(e)),
        }
    }

    async fn spawn_hls(
        &self,
        input: &ReadHandle,
        output_dir: &Path,
        segment_seconds: u32,
    ) -> AppResult<HlsProcess> {
        let params = ExecutionParams::new(&self.config.ffmpeg_path, self.config.timeout_seconds)
            .args(self.hls_args(&input.input(), output_dir, segment_seconds));

        let process = self.executor.spawn_streaming(&params)?;
        info!(output_dir = %output_dir.display(), "Started HLS generation");

        let dir = output_dir.display().to_string();
        let waiter = process.completion;
        let completion = tokio::spawn(async move {
            let result = waiter
                .await
                .unwrap_or_else(|join| Err(ExecutorError::IoError(std::io::Error::other(join))));
            result.map_err(|e| {
                warn!(output_dir = %dir, error = %e, "HLS generation did not complete");
                AppError::from(e)
            })
        });

        Ok(HlsProcess {
            output: process.stdout,
            completion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn transcoder() -> FfmpegTranscoder {
        FfmpegTranscoder::new(TranscoderConfig::default())
    }

    #[test]
    fn test_thumbnail_args() {
        let args = transcoder().render_args("https://signed/url", DerivedKind::Thumbnail);
        let joined = args.join(" ");
        assert!(joined.contains("-ss 00:00:05 -i https://signed/url -vframes 1"));
        assert!(joined.ends_with("-q:v 2 -f image2 pipe:1"));
        assert!(!joined.contains("scale="));
    }

    #[test]
    fn test_thumbnail_args_with_width() {
        let mut config = TranscoderConfig::default();
        config.thumbnail_width = Some(320);
        let args = FfmpegTranscoder::new(config).render_args("in.mp4", DerivedKind::Thumbnail);
        assert!(args.join(" ").contains("-vf scale=320:-1"));
    }

    #[test]
    fn test_subtitle_args() {
        let args = transcoder().render_args("in.mkv", DerivedKind::Subtitle);
        assert!(args.join(" ").ends_with("-i in.mkv -map 0:s:0? -f webvtt pipe:1"));
    }

    #[test]
    fn test_hls_args() {
        let dir = PathBuf::from("/tmp/hls/movies/e01");
        let args = transcoder().hls_args("in.mp4", &dir, 10);
        let joined = args.join(" ");
        assert!(joined.contains("-hls_time 10 -hls_list_size 0"));
        assert!(joined.contains("-hls_segment_filename /tmp/hls/movies/e01/%03d.ts"));
        assert!(joined.ends_with("/tmp/hls/movies/e01/playlist.m3u8"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let mut config = TranscoderConfig::default();
        config.ffmpeg_path = "definitely-not-ffmpeg-xyz".into();
        let handle = ReadHandle::Path {
            path: PathBuf::from("/nonexistent.mp4"),
        };
        let err = FfmpegTranscoder::new(config)
            .render(&handle, DerivedKind::Thumbnail)
            .await
            .unwrap_err();
        assert_eq!(err.kind, mediahub_core::error::ErrorKind::Configuration);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_process_is_unavailable() {
        let mut config = TranscoderConfig::default();
        config.ffmpeg_path = "false".into();
        let handle = ReadHandle::Path {
            path: PathBuf::from("/nonexistent.mp4"),
        };
        let outcome = FfmpegTranscoder::new(config)
            .render(&handle, DerivedKind::Subtitle)
            .await
            .unwrap();
        assert!(matches!(outcome, TranscodeOutcome::Unavailable(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_after_expiry_is_expired() {
        let mut config = TranscoderConfig::default();
        config.ffmpeg_path = "false".into();
        let handle = ReadHandle::Url {
            url: "https://signed/url".into(),
            expires_at: chrono::Utc::now() - chrono::Duration::seconds(1),
        };
        let outcome = FfmpegTranscoder::new(config)
            .render(&handle, DerivedKind::Thumbnail)
            .await
            .unwrap();
        assert_eq!(outcome, TranscodeOutcome::Expired);
    }
}

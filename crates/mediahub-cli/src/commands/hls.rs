//! HLS playlist generation command.

use clap::Args;
use futures::StreamExt;

use crate::output::{self, OutputFormat};
use mediahub_core::error::AppError;
use mediahub_core::types::CanonicalPath;
use mediahub_service::{HlsService, PlaylistHandle};

/// Arguments for the hls command
#[derive(Debug, Args)]
pub struct HlsArgs {
    /// Video key, e.g. `movies/e01.mp4`
    pub path: String,
}

/// Ensure a fresh playlist exists, waiting for generation to finish
pub async fn execute(args: &HlsArgs, config_path: &str, format: OutputFormat) -> Result<(), AppError> {
    let key = CanonicalPath::object(&args.path)?;
    let config = super::load_config(config_path)?;
    let (ctx, pool) = super::build_context(config).await?;
    pool.close().await;

    match HlsService::new(ctx).ensure_hls(&key).await? {
        PlaylistHandle::Cached { playlist } => {
            output::print_report(
                "Playlist",
                &serde_json::json!({ "playlist": playlist, "cached": true }),
                format,
            );
        }
        PlaylistHandle::InProgress { playlist } => {
            output::print_warning("Another process is generating this playlist");
            output::print_report(
                "Playlist",
                &serde_json::json!({ "playlist": playlist, "cached": false, "in_progress": true }),
                format,
            );
        }
        PlaylistHandle::Generating {
            playlist,
            mut output,
            cleanup,
        } => {
            let mut relayed: u64 = 0;
            while let Some(chunk) = output.next().await {
                relayed += chunk?.len() as u64;
            }
            let report = cleanup
                .await
                .map_err(|e| AppError::internal(format!("HLS cleanup task failed: {e}")))?;

            if !report.completed {
                output::print_warning("Transcoder did not exit cleanly; the playlist may be partial");
            }
            output::print_report(
                "Playlist",
                &serde_json::json!({
                    "playlist": playlist,
                    "cached": false,
                    "completed": report.completed,
                    "segments_removed": report.removed,
                    "output_bytes": relayed,
                }),
                format,
            );
        }
        PlaylistHandle::NotApplicable => {
            output::print_warning(&format!("'{key}' is not a video; no playlist generated"));
        }
    }
    Ok(())
}

//! Catalog commands: passes, browsing, rename, and upload.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use tokio_util::io::StreamReader;

use crate::output::{self, OutputFormat};
use mediahub_core::error::{AppError, ErrorKind};
use mediahub_entity::listing::FolderListing;
use mediahub_service::{CatalogBrowser, FileLocation, SyncOrchestrator, UploadService};

/// Arguments for `ls`
#[derive(Debug, Args)]
pub struct LsArgs {
    /// Folder path; empty or `/` for the root
    #[arg(default_value = "")]
    pub path: String,
}

/// Arguments for `resolve`
#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// File key, e.g. `movies/e01.mp4`
    pub path: String,

    /// Write streamed bytes to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for `rename`
#[derive(Debug, Args)]
pub struct RenameArgs {
    /// File key to rename
    pub path: String,

    /// New base name; the original extension is kept
    pub new_name: String,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for `upload`
#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Local file to upload
    pub file: PathBuf,

    /// Destination folder; empty for the root
    #[arg(long, default_value = "")]
    pub folder: String,

    /// Stored file name; defaults to the local file name
    #[arg(long)]
    pub name: Option<String>,
}

/// A folder listing row
#[derive(Debug, Serialize, Tabled)]
struct EntryRow {
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Thumbnail")]
    thumbnail: &'static str,
    #[tabled(rename = "Subtitle")]
    subtitle: &'static str,
}

fn rows(listing: &FolderListing) -> Vec<EntryRow> {
    let folders = listing.folders.iter().map(|name| EntryRow {
        kind: "dir",
        name: format!("{name}/"),
        size: "-".to_string(),
        thumbnail: "",
        subtitle: "",
    });
    let files = listing.files.iter().map(|file| EntryRow {
        kind: "file",
        name: file.name.clone(),
        size: file.size.to_string(),
        thumbnail: if file.thumbnail_url.is_some() { "yes" } else { "" },
        subtitle: if file.subtitle_url.is_some() { "yes" } else { "" },
    });
    folders.chain(files).collect()
}

/// Run one full sync pass
pub async fn sync(config_path: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let (ctx, pool) = super::build_context(config).await?;

    let result = SyncOrchestrator::new(ctx).full_sync().await;
    pool.close().await;

    output::print_report("Sync complete", &result?, format);
    Ok(())
}

/// Run one backfill pass
pub async fn backfill(config_path: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let (ctx, pool) = super::build_context(config).await?;

    let result = SyncOrchestrator::new(ctx).backfill().await;
    pool.close().await;

    output::print_report("Backfill complete", &result?, format);
    Ok(())
}

/// List the direct children of a folder
pub async fn ls(args: &LsArgs, config_path: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let (ctx, pool) = super::build_context(config).await?;

    let result = CatalogBrowser::new(ctx).list_folder(&args.path).await;
    pool.close().await;
    let listing = result?;

    match format {
        OutputFormat::Table => output::print_list(&rows(&listing), format),
        OutputFormat::Json => output::print_item(&listing, format),
    }
    Ok(())
}

/// Resolve a file to a redirect URL or copy its bytes out
pub async fn resolve(
    args: &ResolveArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let (ctx, pool) = super::build_context(config).await?;

    let result = CatalogBrowser::new(ctx).resolve_file(&args.path).await;
    pool.close().await;

    match result? {
        FileLocation::Redirect(url) => {
            output::print_report("Redirect", &serde_json::json!({ "url": url }), format);
        }
        FileLocation::Stream {
            name,
            size,
            content_type,
            body,
        } => {
            let mut written = None;
            if let Some(path) = &args.output {
                written = Some(copy_to_file(body, path).await?);
            }
            output::print_report(
                "Stream",
                &serde_json::json!({
                    "name": name,
                    "size": size,
                    "content_type": content_type,
                    "written": written,
                }),
                format,
            );
        }
    }
    Ok(())
}

async fn copy_to_file(
    body: mediahub_core::traits::storage::ByteStream,
    path: &Path,
) -> Result<u64, AppError> {
    let mut reader = StreamReader::new(body);
    let mut file = tokio::fs::File::create(path).await?;
    let written = tokio::io::copy(&mut reader, &mut file).await?;
    Ok(written)
}

/// Rename a file, keeping its extension
pub async fn rename(
    args: &RenameArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    if !args.yes {
        let confirm = dialoguer::Confirm::new()
            .with_prompt(format!("Rename '{}' to '{}'?", args.path, args.new_name))
            .default(false)
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

        if !confirm {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let config = super::load_config(config_path)?;
    let (ctx, pool) = super::build_context(config).await?;

    let result = CatalogBrowser::new(ctx)
        .rename_file(&args.path, &args.new_name)
        .await;
    pool.close().await;
    let renamed = result?;

    match format {
        OutputFormat::Table => {
            output::print_success(&format!(
                "Renamed '{}' to '{}'",
                renamed.old_path, renamed.new_path
            ));
            output::print_kv("URL", &renamed.file.url);
        }
        OutputFormat::Json => output::print_item(&renamed.file, format),
    }
    Ok(())
}

/// Upload a local file and catalog it
pub async fn upload(
    args: &UploadArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let name = match &args.name {
        Some(name) => name.clone(),
        None => args
            .file
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::new(
                    ErrorKind::Validation,
                    format!("Cannot derive a file name from '{}'", args.file.display()),
                )
            })?,
    };
    let data = Bytes::from(tokio::fs::read(&args.file).await?);

    let config = super::load_config(config_path)?;
    let (ctx, pool) = super::build_context(config).await?;

    let result = UploadService::new(ctx)
        .register_upload(&args.folder, &name, data, None)
        .await;
    pool.close().await;
    let file = result?;

    match format {
        OutputFormat::Table => {
            output::print_success(&format!("Uploaded '{}'", file.path));
            output::print_kv("Size", &file.size.to_string());
            output::print_kv("URL", &file.url);
        }
        OutputFormat::Json => output::print_item(&file, format),
    }
    Ok(())
}

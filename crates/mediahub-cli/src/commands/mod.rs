//! CLI command definitions and dispatch.

pub mod catalog;
pub mod config;
pub mod hls;
pub mod migrate;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use mediahub_core::config::AppConfig;
use mediahub_core::error::AppError;
use mediahub_database::{DatabasePool, PgCatalogStore};
use mediahub_service::CatalogContext;
use mediahub_transcoder::FfmpegTranscoder;

/// MediaHub: mirror a blob store into a browsable media catalog
#[derive(Debug, Parser)]
#[command(name = "mediahub", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one full sync pass
    Sync,
    /// Derive artifacts missing from cataloged videos
    Backfill,
    /// List a cataloged folder
    Ls(catalog::LsArgs),
    /// Resolve a cataloged file to a URL or its bytes
    Resolve(catalog::ResolveArgs),
    /// Rename a cataloged file
    Rename(catalog::RenameArgs),
    /// Upload a local file and catalog it
    Upload(catalog::UploadArgs),
    /// Generate or look up the HLS playlist for a video
    Hls(hls::HlsArgs),
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Sync => catalog::sync(&self.config, self.format).await,
            Commands::Backfill => catalog::backfill(&self.config, self.format).await,
            Commands::Ls(args) => catalog::ls(args, &self.config, self.format).await,
            Commands::Resolve(args) => catalog::resolve(args, &self.config, self.format).await,
            Commands::Rename(args) => catalog::rename(args, &self.config, self.format).await,
            Commands::Upload(args) => catalog::upload(args, &self.config, self.format).await,
            Commands::Hls(args) => hls::execute(args, &self.config, self.format).await,
            Commands::Migrate(args) => migrate::execute(args, &self.config, self.format).await,
            Commands::Config(args) => config::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
}

/// Helper: create database pool from config
pub async fn create_db_pool(config: &AppConfig) -> Result<DatabasePool, AppError> {
    DatabasePool::connect(&config.database).await
}

/// Helper: wire the catalog collaborators from config.
///
/// The pool is returned alongside so callers can close it when done.
pub async fn build_context(config: AppConfig) -> Result<(CatalogContext, DatabasePool), AppError> {
    let pool = create_db_pool(&config).await?;
    let store = Arc::new(PgCatalogStore::new(pool.pool().clone()));
    let storage = mediahub_storage::build_provider(&config.storage).await?;
    let transcoder = Arc::new(FfmpegTranscoder::new(config.transcoder.clone()));

    let ctx = CatalogContext::new(store, storage, transcoder, Arc::new(config));
    Ok((ctx, pool))
}

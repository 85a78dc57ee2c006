//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use mediahub_core::config::AppConfig;
use mediahub_core::error::AppError;
use mediahub_core::traits::StorageProvider;
use mediahub_database::connection::mask_password;
use mediahub_transcoder::FfmpegTranscoder;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
    /// Validate, then probe the database, blob store, and ffmpeg
    Check,
    /// Generate a default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config/generated.toml")]
        output: String,
    },
}

/// Execute config commands
pub async fn execute(
    args: &ConfigArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let mut config = super::load_config(config_path)?;
            redact(&mut config);
            output::print_item(&config, format);
        }
        ConfigCommand::Validate => match super::load_config(config_path) {
            Ok(config) => {
                output::print_success(&format!("Configuration '{config_path}' is valid"));
                print_summary(&config);
            }
            Err(e) => {
                output::print_error(&format!("Configuration invalid: {e}"));
                return Err(e);
            }
        },
        ConfigCommand::Check => {
            let config = super::load_config(config_path)?;
            print_summary(&config);
            check(&config).await?;
        }
        ConfigCommand::Generate { output: out_path } => {
            let default_config = include_str!("../../../../config/default.toml");

            if let Some(parent) = std::path::Path::new(out_path).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(out_path, default_config).await?;

            output::print_success(&format!("Default config written to '{out_path}'"));
        }
    }

    Ok(())
}

fn redact(config: &mut AppConfig) {
    config.database.url = mask_password(&config.database.url);
    if !config.storage.s3.secret_key.is_empty() {
        config.storage.s3.secret_key = "****".to_string();
    }
}

fn print_summary(config: &AppConfig) {
    output::print_kv("Database", &mask_password(&config.database.url));
    output::print_kv("Storage", &format!("{:?}", config.storage.backend).to_lowercase());
    output::print_kv("Public base URL", &config.catalog.public_base_url);
    output::print_kv("ffmpeg", &config.transcoder.ffmpeg_path);
    output::print_kv("HLS root", &config.transcoder.hls_root);
    output::print_kv("Scheduler", &config.worker.enabled.to_string());
}

/// Probe every external collaborator; fails on the first unreachable one.
async fn check(config: &AppConfig) -> Result<(), AppError> {
    let pool = super::create_db_pool(config).await?;
    let db_ok = pool.health_check().await;
    pool.close().await;
    if !db_ok? {
        return Err(AppError::database("Database health check returned an unexpected value"));
    }
    output::print_success("Database reachable");

    let storage = mediahub_storage::build_provider(&config.storage).await?;
    if !storage.health_check().await? {
        return Err(AppError::storage(format!(
            "Storage provider '{}' is not healthy",
            storage.provider_type()
        )));
    }
    output::print_success(&format!("Storage provider '{}' healthy", storage.provider_type()));

    let version = FfmpegTranscoder::new(config.transcoder.clone()).probe().await?;
    output::print_success(&format!("Transcoder available: {version}"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_hides_secrets() {
        let mut config = AppConfig::default();
        config.database.url = "postgres://user:hunter2@db:5432/media".into();
        config.storage.s3.secret_key = "s3cr3t".into();

        redact(&mut config);
        assert_eq!(config.database.url, "postgres://user:****@db:5432/media");
        assert_eq!(config.storage.s3.secret_key, "****");
    }
}

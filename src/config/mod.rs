mod file_config;

pub use file_config::{FileConfig, NotificationsConfig};

use crate::notifications::NotificationSettings;
use crate::server::{RequestsLoggingLevel, ServerConfig};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub default_page_size: usize,
    pub max_page_size: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub default_page_size: usize,
    pub max_page_size: usize,

    pub notifications: NotificationSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let max_page_size = file.max_page_size.unwrap_or(cli.max_page_size);
        if max_page_size == 0 {
            bail!("max_page_size must be at least 1");
        }
        let default_page_size = file
            .default_page_size
            .unwrap_or(cli.default_page_size)
            .clamp(1, max_page_size);

        let defaults = NotificationSettings::default();
        let notifications_file = file.notifications.unwrap_or_default();
        let notifications = NotificationSettings {
            same_day_dedup: notifications_file
                .same_day_dedup
                .unwrap_or(defaults.same_day_dedup),
            fan_out_limit: notifications_file
                .fan_out_limit
                .unwrap_or(defaults.fan_out_limit),
        };

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            default_page_size,
            max_page_size,
            notifications,
        })
    }

    pub fn notifications_db_path(&self) -> PathBuf {
        self.db_dir.join("notifications.db")
    }

    pub fn directory_db_path(&self) -> PathBuf {
        self.db_dir.join("directory.db")
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            port: self.port,
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

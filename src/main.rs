use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use notification_server::config::{AppConfig, CliConfig, FileConfig};
use notification_server::notifications::{
    NotificationService, SqliteNotificationStore, SystemClock,
};
use notification_server::server::{metrics, run_server, RequestsLoggingLevel};
use notification_server::SqliteDirectory;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding notifications.db and directory.db.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Optional TOML config file. Its values override the CLI ones.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3002)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9092)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Feed page size used when a request does not ask for one.
    #[clap(long, default_value_t = 20)]
    pub default_page_size: usize,

    /// Upper bound for the requested feed page size.
    #[clap(long, default_value_t = 100)]
    pub max_page_size: usize,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}...", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Initializing metrics...");
    metrics::init_metrics();

    info!(
        "Opening directory database at {:?}...",
        app_config.directory_db_path()
    );
    let directory = Arc::new(SqliteDirectory::new(app_config.directory_db_path())?);

    info!(
        "Opening notifications database at {:?}...",
        app_config.notifications_db_path()
    );
    let store = Arc::new(SqliteNotificationStore::new(
        app_config.notifications_db_path(),
    )?);

    let service = Arc::new(NotificationService::new(
        store,
        directory.clone(),
        Arc::new(SystemClock),
        app_config.notifications.clone(),
    ));

    let shutdown = CancellationToken::new();
    let ctrl_c_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", err);
            return;
        }
        info!("Shutting down...");
        ctrl_c_shutdown.cancel();
    });

    info!("Ready to serve at port {}!", app_config.port);
    run_server(
        app_config.server_config(),
        app_config.metrics_port,
        service,
        directory,
        shutdown,
    )
    .await
}

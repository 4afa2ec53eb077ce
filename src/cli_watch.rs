use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use notification_server::client::{NotificationWatcher, NotificationsClient};
use notification_server::notifications::messages::DEFAULT_UNKNOWN_USER_LABEL;
use notification_server::notifications::TemplateCatalog;

/// Polls a notification server and prints a line for every new notification.
#[derive(Parser, Debug)]
struct CliArgs {
    /// Base URL of the notification server.
    #[clap(default_value = "http://localhost:3002")]
    pub base_url: String,

    /// Session token of the user whose feed is watched.
    #[clap(long, env = "NOTIFICATIONS_TOKEN")]
    pub token: String,

    /// Seconds between two polls.
    #[clap(long, default_value_t = 15)]
    pub interval_secs: u64,

    /// How many of the most recent notifications each poll looks at.
    #[clap(long, default_value_t = 20)]
    pub page_size: usize,

    /// Shown in place of a missing user name.
    #[clap(long, default_value = DEFAULT_UNKNOWN_USER_LABEL)]
    pub unknown_user_label: String,

    /// Request timeout in seconds.
    #[clap(long, default_value_t = 10)]
    pub timeout_sec: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let client = NotificationsClient::new(
        &cli_args.base_url,
        &cli_args.token,
        cli_args.timeout_sec,
    )?;
    let watcher = NotificationWatcher::new(
        Arc::new(client),
        TemplateCatalog::english_with_label(&cli_args.unknown_user_label),
    )
    .with_interval(Duration::from_secs(cli_args.interval_secs.max(1)))
    .with_page_size(cli_args.page_size);

    let shutdown = CancellationToken::new();
    let ctrl_c_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", err);
            return;
        }
        ctrl_c_shutdown.cancel();
    });

    let (sender, mut receiver) = mpsc::channel(32);
    let watcher_handle = tokio::spawn(watcher.run(shutdown.clone(), sender));

    info!("Watching notifications at {}", cli_args.base_url);
    while let Some(toast) = receiver.recv().await {
        match toast.link {
            Some(link) => println!("{}  ({})", toast.text, link),
            None => println!("{}", toast.text),
        }
    }

    watcher_handle.await?;
    Ok(())
}

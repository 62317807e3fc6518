pub mod bridge;
pub(crate) mod config;
pub mod features;
pub mod http_api;
pub mod notify;
pub mod registry;
pub(crate) mod state;
pub mod youtube;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use config::AppConfig;
pub use state::AppState;

/// Local service bridging the annotation dashboard and SketchUp.
#[derive(Parser, Debug)]
#[command(name = "skp-dashboard", version, about, long_about = None)]
struct Cli {
    /// Address to bind (overrides the config file)
    #[arg(long, env = "SKP_DASHBOARD_BIND")]
    bind: Option<String>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "SKP_DASHBOARD_PORT")]
    port: Option<u16>,

    /// Read configuration from this file instead of the platform config dir
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    save_config: bool,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,skp_dashboard_lib=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub fn run() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_json_from(path),
        None => config::load_app_config(),
    };
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if cli.save_config {
        let saved = match &cli.config {
            Some(path) => config::save_app_config_at(path, &config),
            None => config::save_app_config(&config),
        };
        saved.map_err(anyhow::Error::msg)?;
        tracing::info!("configuration saved");
        return Ok(());
    }
    if config.resolved_youtube_api_key().is_none() {
        tracing::warn!("no YouTube API key configured, video routes will answer 500");
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting skp-dashboard");

    let state = AppState::new(config);
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let signal_state = Arc::clone(&state);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
                http_api::request_shutdown(&signal_state);
            }
        });
        http_api::start_server(state).await
    })
}

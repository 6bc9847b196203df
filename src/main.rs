//! wildrank-server: serves the WildRank client and syncs scouting data
//! between devices and servers.

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wildrank_server::{config::Config, server};

#[derive(Parser)]
#[command(name = "wildrank-server")]
#[command(about = "Data-collection backend for the WildRank scouting app")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "wildrank.toml")]
    config: String,

    /// Bind address (overrides config file)
    #[arg(long, env = "WILDRANK_ADDR")]
    addr: Option<String>,

    /// HTTP port (overrides config file)
    #[arg(short, long, env = "WILDRANK_PORT")]
    port: Option<u16>,

    /// Directory for uploaded records and photos
    #[arg(long, env = "WILDRANK_UPLOAD_DIR")]
    upload_dir: Option<PathBuf>,

    /// Root of the static client application
    #[arg(long, env = "WILDRANK_APP_DIR")]
    app_dir: Option<PathBuf>,

    /// Shared upload password; unset leaves uploads open
    #[arg(long, env = "WILDRANK_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// The Blue Alliance API key served as scripts/keys.js
    #[arg(long, env = "TBA_KEY", hide_env_values = true)]
    tba_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wildrank_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT_SHORT"),
        "Starting wildrank-server"
    );
    info!("Config file: {}", cli.config);

    let config_path = Path::new(&cli.config);
    if !config_path.exists() {
        info!("Config file not found, using defaults");
    }
    let mut config = Config::load(config_path)?;

    // Apply CLI overrides
    if let Some(addr) = cli.addr {
        config.server.addr = addr;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(upload_dir) = cli.upload_dir {
        config.store.upload_dir = upload_dir;
    }
    if let Some(app_dir) = cli.app_dir {
        config.store.app_dir = app_dir;
    }
    if cli.password.is_some() {
        config.auth.password = cli.password;
    }
    if cli.tba_key.is_some() {
        config.auth.tba_key = cli.tba_key;
    }

    server::run(config).await
}

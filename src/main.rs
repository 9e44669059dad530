use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use kernelci_api::config::{self, AppConfig, StoreBackend};
use kernelci_api::database::{DocumentStore, MemoryStore, MongoStore};
use kernelci_api::handlers::version::full_version;
use kernelci_api::{app, AppState};

#[derive(Debug, Parser)]
#[command(name = "kernelci-api", version, about = "JSON API for build and test results")]
struct Args {
    /// YAML configuration file, overlaid on the APP_ENV preset
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Keep documents in memory instead of MongoDB
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so KCI_* settings apply to cargo run
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => config::config().clone(),
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.memory {
        config.database.backend = StoreBackend::Memory;
    }

    info!("Starting {} in {:?} mode", full_version(), config.environment);

    let (store, mongo): (Arc<dyn DocumentStore>, Option<MongoStore>) = match config.database.backend {
        StoreBackend::Mongo => {
            let mongo = MongoStore::connect(&config.database)
                .await
                .context("failed to connect to MongoDB")?;
            (Arc::new(mongo.clone()), Some(mongo))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store, documents are lost on exit");
            (Arc::new(MemoryStore::new()), None)
        }
    };

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(store, config);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Listening on http://{}", bind_addr);

    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    if let Some(mongo) = mongo {
        mongo.shutdown().await;
    }
    info!("Stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

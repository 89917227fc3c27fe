use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use glossary_service::{build_router, AppState, ServiceConfig};
use tokio::net::TcpListener;
use tokio::task;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "glossary-service", about = "Read-only glossary lookup API")]
struct Args {
    /// TOML configuration file; a missing file means defaults.
    #[arg(long, env = "GLOSSARY_CONFIG", default_value = "glossary.toml")]
    config: PathBuf,
    /// SQLite database path, overriding config and environment.
    #[arg(long)]
    db: Option<PathBuf>,
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = ServiceConfig::load(&args.config)?;
    if let Some(db) = args.db {
        config.database_path = db;
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    let addr = config.socket_addr()?;
    info!(
        database = %config.database_path.display(),
        collation = %config.collation,
        max_connections = config.max_connections,
        "starting glossary service"
    );

    let state = Arc::new(AppState::from_config(config));
    check_store(state.clone()).await;

    let listener = TcpListener::bind(addr).await?;
    info!("listening" = %addr);
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

/// Logs what the store looks like at startup. Problems are reported but do
/// not stop the server; `/health/db` keeps reporting them.
async fn check_store(state: Arc<AppState>) {
    let outcome = task::spawn_blocking(move || {
        let name = state.catalog.database_name()?;
        let missing = state.catalog.missing_tables()?;
        Ok::<_, glossary_core::GlossaryError>((name, missing))
    })
    .await;
    match outcome {
        Ok(Ok((name, missing))) if missing.is_empty() => info!(database = %name, "store ready"),
        Ok(Ok((name, missing))) => warn!(database = %name, ?missing, "store is missing tables"),
        Ok(Err(err)) => error!(error = %err, "store check failed at startup"),
        Err(err) => error!(error = %err, "store check task failed"),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

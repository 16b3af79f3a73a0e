use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use agentflow_server::{build_app_state, Settings};

#[derive(Parser)]
#[command(name = "agentflow-server")]
#[command(about = "Durable agent-execution engine: A2A bridge and HTTP surface.")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "agentflow.toml", env = "AGENTFLOW_CONFIG")]
    config: PathBuf,

    /// Enable debug logging.
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("agentflow={log_level}"))
        .init();

    let settings = Settings::load(&args.config)?;
    info!(path = %args.config.display(), "configuration loaded");

    let state = build_app_state(&settings).await?;
    let app = agentflow_a2a::router(state);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "agentflow-server listening");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        warn!("received ctrl-c, shutting down gracefully");
        let _ = shutdown_tx.send(());
    });

    let server = axum::serve(listener, app).with_graceful_shutdown(async {
        shutdown_rx.await.ok();
    });

    if let Err(err) = server.await {
        error!(%err, "server error");
        std::process::exit(1);
    }

    info!("agentflow-server shut down gracefully");
    Ok(())
}

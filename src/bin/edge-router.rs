//! edge-router: forwards lambda invocations toward a final compute
//! destination using a pluggable scheduling-entry forwarding table.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use edge_runtime::forwarding_table::RouterTables;
use edge_runtime::optimizer;
use edge_runtime::router::{build_server, Dispatcher, RouterConfig};
use edge_runtime::transport::HttpForwardingClient;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "edge-router", about = "Forwards lambda invocations across edge routers and computers")]
struct Args {
    /// Path to a JSON router configuration file.
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("edge_router=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => RouterConfig::load(path)?,
        None => RouterConfig::default(),
    };
    config.validate().map_err(anyhow::Error::msg)?;
    info!(listen_addr = %config.listen_addr, kind = ?config.scheduling_kind, "starting edge-router");

    let tables = Arc::new(RouterTables::new(config.scheduling_kind));
    let client = Arc::new(HttpForwardingClient::new(config.http_client_config()));
    let optimizer = optimizer::by_name(&config.optimizer);
    let dispatcher = Arc::new(Dispatcher::new(tables.clone(), client, optimizer));

    let app = build_server(dispatcher, tables);
    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!("edge-router listening on http://{}", config.listen_addr);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal");
        shutdown.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    info!("edge-router shut down gracefully");
    Ok(())
}

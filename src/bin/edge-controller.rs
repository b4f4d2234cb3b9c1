//! edge-controller: announces computers' lambda inventories to routers,
//! either flatly or scored against a network topology.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use edge_runtime::controller::{build_server, ControllerInstaller, FlatInstaller, HierarchicalInstaller, Objective, Topology};
use edge_runtime::transport::{HttpForwardingClient, HttpServerConfig};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "edge-controller", about = "Announces computers to routers, flatly or by topology")]
struct Args {
    /// Address this controller's control surface listens on.
    #[arg(long, default_value = "0.0.0.0:9100")]
    listen_addr: String,
    /// Path to a topology file; if given, the hierarchical installer is
    /// used instead of the flat one.
    #[arg(long)]
    topology: Option<PathBuf>,
    /// Home-router scoring objective, only meaningful with `--topology`.
    #[arg(long, value_enum, default_value = "min-max")]
    objective: Objective,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("edge_controller=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let client = Arc::new(HttpForwardingClient::new(HttpServerConfig {
        request_timeout: Duration::from_secs(5),
    }));

    let installer: Arc<dyn ControllerInstaller> = match &args.topology {
        Some(path) => {
            let topology = Topology::load(path)?;
            info!(path = %path.display(), nodes = topology.num_nodes(), objective = ?args.objective, "loaded topology, running hierarchical installer");
            Arc::new(HierarchicalInstaller::new(client, topology, args.objective))
        }
        None => {
            info!("no topology given, running flat installer");
            Arc::new(FlatInstaller::new(client))
        }
    };

    let app = build_server(installer);
    let listener = TcpListener::bind(&args.listen_addr).await?;
    info!("edge-controller listening on http://{}", args.listen_addr);

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

    info!("edge-controller shut down gracefully");
    Ok(())
}

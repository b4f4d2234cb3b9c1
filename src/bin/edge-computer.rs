//! edge-computer: hosts processors and containers, executes lambda
//! invocations under the virtual-time scheduling model.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use edge_runtime::compute::{run_utilization_collector, Computer, ComputerConfig};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "edge-computer", about = "Hosts processors, containers, and lambda invocations")]
struct Args {
    /// Path to a JSON computer configuration file.
    #[arg(long)]
    config: PathBuf,
    /// Address this computer's invocation API listens on.
    #[arg(long, default_value = "0.0.0.0:9000")]
    listen_addr: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("edge_computer=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = ComputerConfig::load(&args.config)?;

    let computer = Computer::new();
    config.apply(&computer).await?;
    info!(
        processors = config.processors.len(),
        containers = config.containers.len(),
        lambdas = config.lambdas.len(),
        "loaded computer configuration"
    );

    let cancel = CancellationToken::new();
    let dispatcher_handle = tokio::spawn(computer.clone().run_dispatcher(cancel.clone()));
    let collector_handle = tokio::spawn(run_utilization_collector(computer.clone(), cancel.clone()));

    let app = edge_runtime::transport::invoke_routes(computer);
    let listener = TcpListener::bind(&args.listen_addr).await?;
    info!("edge-computer listening on http://{}", args.listen_addr);

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal");
        shutdown.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    let _ = dispatcher_handle.await;
    let _ = collector_handle.await;
    info!("edge-computer shut down gracefully");
    Ok(())
}

//! edge-ctl: a command-line client for ad hoc forwarding-table and
//! controller operations against a running router or controller.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

#[derive(Debug, Parser)]
#[command(name = "edge-ctl", about = "Ad hoc client for edge-router and edge-controller control surfaces")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Install or update a router's forwarding-table entry.
    TableChange {
        /// The router's base URL, e.g. http://localhost:8080.
        #[arg(long)]
        router: String,
        /// The function this entry serves.
        #[arg(long)]
        function: String,
        /// The destination endpoint.
        #[arg(long)]
        destination: String,
        /// The entry's initial weight.
        #[arg(long, default_value_t = 1.0)]
        weight: f64,
        /// Whether this destination is a final compute node rather than
        /// another router.
        #[arg(long, default_value_t = true)]
        is_final: bool,
    },
    /// Remove a router's forwarding-table entry.
    TableRemove {
        #[arg(long)]
        router: String,
        #[arg(long)]
        function: String,
        #[arg(long)]
        destination: String,
    },
    /// Clear every entry in a router's tables.
    TableFlush {
        #[arg(long)]
        router: String,
    },
    /// Announce a computer's lambda inventory to a controller.
    AnnounceComputer {
        /// The controller's base URL.
        #[arg(long)]
        controller: String,
        /// The computer's endpoint.
        #[arg(long)]
        endpoint: String,
        /// Every lambda this computer can execute, comma-separated.
        #[arg(long, value_delimiter = ',')]
        lambdas: Vec<String>,
        /// This computer's topology node name, for hierarchical installers.
        #[arg(long)]
        node: Option<String>,
    },
    /// Announce a router to a controller, requesting a full state push.
    AnnounceRouter {
        #[arg(long)]
        controller: String,
        #[arg(long)]
        endpoint: String,
        #[arg(long)]
        node: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let client = reqwest::Client::new();

    let (url, body) = match args.command {
        Command::TableChange {
            router,
            function,
            destination,
            weight,
            is_final,
        } => (
            format!("{router}/table/change"),
            json!({"function": function, "destination": destination, "weight": weight, "is_final": is_final}),
        ),
        Command::TableRemove {
            router,
            function,
            destination,
        } => (
            format!("{router}/table/remove"),
            json!({"function": function, "destination": destination}),
        ),
        Command::TableFlush { router } => (format!("{router}/table/flush"), json!({})),
        Command::AnnounceComputer {
            controller,
            endpoint,
            lambdas,
            node,
        } => (
            format!("{controller}/announce/computer"),
            json!({"endpoint": endpoint, "lambdas": lambdas, "node": node}),
        ),
        Command::AnnounceRouter { controller, endpoint, node } => (
            format!("{controller}/announce/router"),
            json!({"endpoint": endpoint, "node": node}),
        ),
    };

    let response = client.post(&url).json(&body).send().await?;
    let status = response.status();
    if !status.is_success() {
        bail!("{url} returned {status}");
    }
    println!("ok: {url} -> {status}");
    Ok(())
}

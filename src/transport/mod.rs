//! Transport: the wire envelope, the abstract RPC traits routers and
//! controllers use to reach peers, and the default axum/JSON
//! implementation.
//!
//! Grounded on spec.md §6's `LambdaRequest`/`LambdaResponse` fields and
//! the teacher's `src/server.rs` axum setup.

mod envelope;
mod http;

pub use envelope::{LambdaRequest, LambdaResponse, MAX_REQUEST_BYTES};
pub use http::{invoke_routes, router_table_routes, HttpForwardingClient, HttpServerConfig};

use async_trait::async_trait;

use crate::domain_types::{Endpoint, FunctionName, Weight};
use crate::error::TransportError;

/// A peer that can execute or forward a lambda invocation: either a
/// downstream router or a final compute node.
#[async_trait]
pub trait ForwardingClient: std::fmt::Debug + Send + Sync {
    /// Forward `request` to `endpoint` and wait for its response.
    async fn forward(
        &self,
        endpoint: &Endpoint,
        request: LambdaRequest,
    ) -> Result<LambdaResponse, TransportError>;
}

/// A router reachable by a controller, to install or remove forwarding
/// entries on.
#[async_trait]
pub trait RouterClient: std::fmt::Debug + Send + Sync {
    /// Install or update a forwarding-table entry.
    async fn change(
        &self,
        endpoint: &Endpoint,
        function: &FunctionName,
        destination: &Endpoint,
        weight: Weight,
        is_final: bool,
    ) -> Result<(), TransportError>;

    /// Remove a forwarding-table entry.
    async fn remove(
        &self,
        endpoint: &Endpoint,
        function: &FunctionName,
        destination: &Endpoint,
    ) -> Result<(), TransportError>;

    /// Clear every forwarding-table entry.
    async fn flush(&self, endpoint: &Endpoint) -> Result<(), TransportError>;
}

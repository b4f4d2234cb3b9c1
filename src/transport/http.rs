//! The default HTTP/JSON transport: a [`reqwest`]-backed client and an
//! axum router builder used by the router and controller server binaries.
//!
//! Grounded on the teacher's `src/server.rs` axum wiring, generalized from
//! a single-purpose REST API to the forwarding/control surfaces spec.md
//! §6 describes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::compute::Computer;
use crate::domain_types::{Endpoint, FunctionName, Weight};
use crate::error::TransportError;
use crate::forwarding_table::RouterTables;

use super::envelope::{LambdaRequest, LambdaResponse};
use super::{ForwardingClient, RouterClient};

/// Configuration for the HTTP client used to reach peers.
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    /// Per-request timeout before a peer is considered unreachable.
    pub request_timeout: Duration,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// A [`reqwest`]-backed [`ForwardingClient`]/[`RouterClient`] implementation.
#[derive(Debug, Clone)]
pub struct HttpForwardingClient {
    client: reqwest::Client,
}

impl HttpForwardingClient {
    /// Build a client from `config`.
    #[must_use]
    pub fn new(config: HttpServerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("reqwest client configuration is always valid");
        Self { client }
    }

    fn base_url(endpoint: &Endpoint) -> String {
        format!("http://{endpoint}")
    }
}

#[async_trait]
impl ForwardingClient for HttpForwardingClient {
    async fn forward(
        &self,
        endpoint: &Endpoint,
        request: LambdaRequest,
    ) -> Result<LambdaResponse, TransportError> {
        let url = format!("{}/invoke", Self::base_url(endpoint));
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| TransportError::Unreachable {
                endpoint: endpoint.clone(),
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(TransportError::Remote {
                endpoint: endpoint.clone(),
                message: format!("HTTP {}", response.status()),
            });
        }
        response
            .json::<LambdaResponse>()
            .await
            .map_err(|e| TransportError::Remote {
                endpoint: endpoint.clone(),
                message: e.to_string(),
            })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChangeRequest {
    function: FunctionName,
    destination: Endpoint,
    weight: f64,
    is_final: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct RemoveRequest {
    function: FunctionName,
    destination: Endpoint,
}

#[async_trait]
impl RouterClient for HttpForwardingClient {
    async fn change(
        &self,
        endpoint: &Endpoint,
        function: &FunctionName,
        destination: &Endpoint,
        weight: Weight,
        is_final: bool,
    ) -> Result<(), TransportError> {
        let url = format!("{}/table/change", Self::base_url(endpoint));
        let body = ChangeRequest {
            function: function.clone(),
            destination: destination.clone(),
            weight: weight.as_f64(),
            is_final,
        };
        self.post_ok(endpoint, &url, &body).await
    }

    async fn remove(
        &self,
        endpoint: &Endpoint,
        function: &FunctionName,
        destination: &Endpoint,
    ) -> Result<(), TransportError> {
        let url = format!("{}/table/remove", Self::base_url(endpoint));
        let body = RemoveRequest {
            function: function.clone(),
            destination: destination.clone(),
        };
        self.post_ok(endpoint, &url, &body).await
    }

    async fn flush(&self, endpoint: &Endpoint) -> Result<(), TransportError> {
        let url = format!("{}/table/flush", Self::base_url(endpoint));
        self.post_ok(endpoint, &url, &()).await
    }
}

impl HttpForwardingClient {
    async fn post_ok(
        &self,
        endpoint: &Endpoint,
        url: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<(), TransportError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Unreachable {
                endpoint: endpoint.clone(),
                message: e.to_string(),
            })?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::Remote {
                endpoint: endpoint.clone(),
                message: format!("HTTP {}", response.status()),
            })
        }
    }
}

/// Build the axum router a router process serves, exposing the
/// forwarding-table control surface over HTTP/JSON.
#[must_use]
pub fn router_table_routes(tables: Arc<RouterTables>) -> Router {
    Router::new()
        .route("/table/change", post(handle_change))
        .route("/table/remove", post(handle_remove))
        .route("/table/flush", post(handle_flush))
        .with_state(tables)
}

async fn handle_change(
    State(tables): State<Arc<RouterTables>>,
    Json(body): Json<ChangeRequest>,
) -> StatusCode {
    match tables.change(body.function, body.destination, body.weight, body.is_final) {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::BAD_REQUEST,
    }
}

async fn handle_remove(
    State(tables): State<Arc<RouterTables>>,
    Json(body): Json<RemoveRequest>,
) -> StatusCode {
    tables.remove(&body.function, &body.destination);
    StatusCode::OK
}

async fn handle_flush(State(tables): State<Arc<RouterTables>>) -> StatusCode {
    tables.flush();
    StatusCode::OK
}

/// Build the axum router a computer process serves, accepting lambda
/// invocations and running them through its virtual-time dispatcher.
#[must_use]
pub fn invoke_routes(computer: Arc<Computer>) -> Router {
    Router::new()
        .route("/invoke", post(handle_invoke))
        .with_state(computer)
}

async fn handle_invoke(
    State(computer): State<Arc<Computer>>,
    Json(request): Json<LambdaRequest>,
) -> Json<LambdaResponse> {
    let input_size = request.input_size();
    match computer.invoke(&request.function, input_size).await {
        Ok(_task_id) => Json(LambdaResponse::ok(request.request_id, Vec::new())),
        Err(err) => Json(LambdaResponse::failure(request.request_id, err.to_string())),
    }
}

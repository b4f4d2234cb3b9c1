//! The controller's HTTP/JSON control surface.
//!
//! Grounded on spec.md §4.8 and the teacher's `src/server.rs` axum
//! wiring.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::domain_types::{Endpoint, FunctionName};

use super::installer::{ComputerAnnouncement, ControllerInstaller};

#[derive(Debug, Serialize, Deserialize)]
struct AnnounceComputerBody {
    endpoint: Endpoint,
    lambdas: Vec<FunctionName>,
    node: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnnounceRouterBody {
    endpoint: Endpoint,
    node: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EndpointBody {
    endpoint: Endpoint,
}

/// Build the axum [`Router`] a controller process serves.
#[must_use]
pub fn build_server(installer: Arc<dyn ControllerInstaller>) -> Router {
    Router::new()
        .route("/announce/computer", post(announce_computer))
        .route("/announce/router", post(announce_router))
        .route("/remove/computer", post(remove_computer))
        .route("/remove/router", post(remove_router))
        .with_state(installer)
}

async fn announce_computer(
    State(installer): State<Arc<dyn ControllerInstaller>>,
    Json(body): Json<AnnounceComputerBody>,
) -> StatusCode {
    let announcement = ComputerAnnouncement {
        endpoint: body.endpoint,
        lambdas: body.lambdas,
        node: body.node,
    };
    match installer.announce_computer(announcement).await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn announce_router(
    State(installer): State<Arc<dyn ControllerInstaller>>,
    Json(body): Json<AnnounceRouterBody>,
) -> StatusCode {
    match installer.announce_router(body.endpoint, body.node).await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn remove_computer(
    State(installer): State<Arc<dyn ControllerInstaller>>,
    Json(body): Json<EndpointBody>,
) -> StatusCode {
    match installer.remove_computer(body.endpoint).await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn remove_router(
    State(installer): State<Arc<dyn ControllerInstaller>>,
    Json(body): Json<EndpointBody>,
) -> StatusCode {
    match installer.remove_router(body.endpoint).await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

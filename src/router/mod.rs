//! The router role: forwards lambda invocations toward a final compute
//! destination, possibly through other routers, using a pluggable
//! scheduling-entry forwarding table and local optimizer.

mod config;
mod dispatcher;

pub use config::RouterConfig;
pub use dispatcher::{Dispatcher, Origin};

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use crate::transport::{router_table_routes, LambdaRequest, LambdaResponse};

/// Build the full axum [`Router`] a router process serves: the
/// forwarding-table control surface plus the two invocation entry points
/// (client-originated and router-originated).
#[must_use]
pub fn build_server(dispatcher: Arc<Dispatcher>, tables: Arc<crate::forwarding_table::RouterTables>) -> Router {
    let table_routes = router_table_routes(tables);
    let invoke_routes = Router::new()
        .route("/invoke", post(handle_client_invoke))
        .route("/invoke/relayed", post(handle_router_invoke))
        .with_state(dispatcher);
    table_routes.merge(invoke_routes)
}

async fn handle_client_invoke(
    State(dispatcher): State<Arc<Dispatcher>>,
    Json(request): Json<LambdaRequest>,
) -> Json<LambdaResponse> {
    respond(dispatcher, request, Origin::Client).await
}

async fn handle_router_invoke(
    State(dispatcher): State<Arc<Dispatcher>>,
    Json(request): Json<LambdaRequest>,
) -> Json<LambdaResponse> {
    respond(dispatcher, request, Origin::Router).await
}

async fn respond(dispatcher: Arc<Dispatcher>, request: LambdaRequest, origin: Origin) -> Json<LambdaResponse> {
    let request_id = request.request_id.clone();
    match dispatcher.handle(request, origin).await {
        Ok(response) => Json(response),
        Err(err) => Json(LambdaResponse::failure(request_id, err.to_string())),
    }
}

//! Cross-module router dispatch: a [`Dispatcher`] backed by a scripted
//! [`ForwardingClient`], exercising the two-table overall/final-only
//! split and eviction-on-failure behavior end to end.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use edge_runtime::domain_types::{Endpoint, FunctionName};
use edge_runtime::error::TransportError;
use edge_runtime::forwarding_table::RouterTables;
use edge_runtime::optimizer::NoOptimizer;
use edge_runtime::router::{Dispatcher, Origin};
use edge_runtime::scheduling::SchedulingKind;
use edge_runtime::transport::{ForwardingClient, LambdaRequest, LambdaResponse};

#[derive(Debug, Default)]
struct ScriptedForwarder {
    calls: AtomicUsize,
    fail_for: Mutex<Option<Endpoint>>,
}

#[async_trait]
impl ForwardingClient for ScriptedForwarder {
    async fn forward(&self, endpoint: &Endpoint, request: LambdaRequest) -> Result<LambdaResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_for.lock().unwrap().as_ref() == Some(endpoint) {
            return Err(TransportError::Unreachable {
                endpoint: endpoint.clone(),
                message: "scripted failure".to_string(),
            });
        }
        Ok(LambdaResponse::ok(request.request_id, b"done".to_vec()))
    }
}

fn request(function: &FunctionName) -> LambdaRequest {
    LambdaRequest {
        function: function.clone(),
        payload: vec![1, 2, 3],
        hop_count: 0,
        request_id: "req-1".to_string(),
    }
}

#[tokio::test]
async fn client_requests_use_the_overall_table_and_router_requests_use_final_only() {
    let tables = Arc::new(RouterTables::new(SchedulingKind::LeastImpedance));
    let function = FunctionName::try_new("resize").unwrap();
    let direct = Endpoint::try_new("compute-1:9000").unwrap();
    let via_router = Endpoint::try_new("router-2:8080").unwrap();

    tables.change(function.clone(), direct.clone(), 1.0, true).unwrap();
    tables.change(function.clone(), via_router.clone(), 0.5, false).unwrap();

    let client = Arc::new(ScriptedForwarder::default());
    let dispatcher = Dispatcher::new(tables.clone(), client.clone(), Arc::new(NoOptimizer));

    // The overall table has the lower-weight via_router entry, so a
    // client-originated request picks it under LeastImpedance.
    let response = dispatcher.handle(request(&function), Origin::Client).await.unwrap();
    assert!(response.success);

    // The final-only table only ever had `direct` installed (is_final).
    let response = dispatcher.handle(request(&function), Origin::Router).await.unwrap();
    assert!(response.success);
    assert_eq!(client.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn forwarding_failure_evicts_the_destination() {
    let tables = Arc::new(RouterTables::new(SchedulingKind::LeastImpedance));
    let function = FunctionName::try_new("resize").unwrap();
    let flaky = Endpoint::try_new("compute-flaky:9000").unwrap();
    tables.change(function.clone(), flaky.clone(), 1.0, true).unwrap();

    let client = Arc::new(ScriptedForwarder::default());
    *client.fail_for.lock().unwrap() = Some(flaky.clone());
    let dispatcher = Dispatcher::new(tables.clone(), client, Arc::new(NoOptimizer));

    let result = dispatcher.handle(request(&function), Origin::Router).await;
    assert!(result.is_err());
    assert!(tables.final_only().pick(&function).is_err());
}

//! Cross-module controller scenarios that exercise the flat installer
//! against a scripted, partially-failing [`RouterClient`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use edge_runtime::controller::{ComputerAnnouncement, ControllerInstaller, FlatInstaller};
use edge_runtime::domain_types::{Endpoint, FunctionName, Weight};
use edge_runtime::error::TransportError;
use edge_runtime::transport::RouterClient;

#[derive(Debug, Default)]
struct ScriptedClient {
    unreachable: Mutex<Vec<Endpoint>>,
    flush_count: AtomicUsize,
    entries: Mutex<Vec<(Endpoint, FunctionName, Endpoint)>>,
}

impl ScriptedClient {
    fn mark_unreachable(&self, endpoint: Endpoint) {
        self.unreachable.lock().unwrap().push(endpoint);
    }

    fn is_unreachable(&self, endpoint: &Endpoint) -> bool {
        self.unreachable.lock().unwrap().iter().any(|e| e == endpoint)
    }
}

#[async_trait]
impl RouterClient for ScriptedClient {
    async fn change(
        &self,
        endpoint: &Endpoint,
        function: &FunctionName,
        destination: &Endpoint,
        _weight: Weight,
        _is_final: bool,
    ) -> Result<(), TransportError> {
        if self.is_unreachable(endpoint) {
            return Err(TransportError::Unreachable {
                endpoint: endpoint.clone(),
                message: "scripted failure".to_string(),
            });
        }
        self.entries
            .lock()
            .unwrap()
            .push((endpoint.clone(), function.clone(), destination.clone()));
        Ok(())
    }

    async fn remove(&self, _endpoint: &Endpoint, _function: &FunctionName, _destination: &Endpoint) -> Result<(), TransportError> {
        Ok(())
    }

    async fn flush(&self, endpoint: &Endpoint) -> Result<(), TransportError> {
        if self.is_unreachable(endpoint) {
            return Err(TransportError::Unreachable {
                endpoint: endpoint.clone(),
                message: "scripted failure".to_string(),
            });
        }
        self.flush_count.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().unwrap().retain(|(e, _, _)| e != endpoint);
        Ok(())
    }
}

fn ep(s: &str) -> Endpoint {
    Endpoint::try_new(s).unwrap()
}

fn fname(s: &str) -> FunctionName {
    FunctionName::try_new(s).unwrap()
}

/// S6: three computers served via two routers; one router goes
/// unreachable; a fourth computer is announced; the failing router is
/// dropped and the survivor's table is flushed and rebuilt with all four
/// computers.
#[tokio::test]
async fn router_reset_on_peer_drop() {
    let client = Arc::new(ScriptedClient::default());
    let installer = FlatInstaller::new(client.clone());

    let good_router = ep("router-good:1");
    let bad_router = ep("router-bad:1");
    installer.announce_router(good_router.clone(), None).await.unwrap();
    installer.announce_router(bad_router.clone(), None).await.unwrap();

    for i in 0..3 {
        installer
            .announce_computer(ComputerAnnouncement {
                endpoint: ep(&format!("computer-{i}:1")),
                lambdas: vec![fname("lambda0")],
                node: None,
            })
            .await
            .unwrap();
    }

    client.mark_unreachable(bad_router.clone());

    installer
        .announce_computer(ComputerAnnouncement {
            endpoint: ep("computer-3:1"),
            lambdas: vec![fname("lambda0")],
            node: None,
        })
        .await
        .unwrap();

    assert_eq!(client.flush_count.load(Ordering::SeqCst), 1);
    let entries = client.entries.lock().unwrap();
    let on_good_router: Vec<_> = entries.iter().filter(|(e, _, _)| *e == good_router).collect();
    assert_eq!(on_good_router.len(), 4, "survivor should hold all four computers after rebuild");
}

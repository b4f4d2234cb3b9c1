//! The flat controller installer: every router is sent every computer's
//! routes, with no topology-aware grouping.
//!
//! Grounded on `Edge/edgecontrollerflat.{h,cpp}`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain_types::{Endpoint, Weight};
use crate::error::ControllerError;
use crate::transport::RouterClient;

use super::installer::{ComputerAnnouncement, ControllerInstaller};
use super::state::ControllerState;

/// Fixed weight a flat installer assigns every newly-installed route; the
/// scheduling entry's own weight updates (via the local optimizer) take
/// over from there.
const INITIAL_WEIGHT: f64 = 1.0;

/// The flat installer: announces to and removes from every known router
/// with no per-router filtering.
#[derive(Debug)]
pub struct FlatInstaller {
    state: ControllerState,
    client: Arc<dyn RouterClient>,
}

impl FlatInstaller {
    /// Construct a flat installer that reaches routers via `client`.
    #[must_use]
    pub fn new(client: Arc<dyn RouterClient>) -> Self {
        Self {
            state: ControllerState::new(),
            client,
        }
    }

    /// After a router is found unreachable, distrust every surviving
    /// router's incrementally-built table: flush each one and replay the
    /// controller's full current inventory, rather than leave them
    /// holding whatever subset of `change` calls happened to land before
    /// the failure was detected.
    async fn rebuild_survivors(&self) {
        let weight = Weight::try_new(INITIAL_WEIGHT).expect("initial weight constant is valid");
        let destinations = self.state.all_lambda_destinations();
        for router in self.state.routers() {
            if self.client.flush(&router).await.is_err() {
                warn!(%router, "router unreachable during survivor rebuild, leaving it for the next announce");
                continue;
            }
            for (function, destination) in &destinations {
                let _ = self.client.change(&router, function, destination, weight, true).await;
            }
        }
    }
}

#[async_trait]
impl ControllerInstaller for FlatInstaller {
    async fn announce_computer(&self, announcement: ComputerAnnouncement) -> Result<(), ControllerError> {
        let changed = self
            .state
            .upsert_computer(announcement.endpoint.clone(), announcement.lambdas.clone());
        if !changed {
            return Ok(());
        }

        let weight = Weight::try_new(INITIAL_WEIGHT).expect("initial weight constant is valid");
        let mut failed = Vec::new();
        for router in self.state.routers() {
            for function in &announcement.lambdas {
                if let Err(err) = self
                    .client
                    .change(&router, function, &announcement.endpoint, weight, true)
                    .await
                {
                    warn!(%router, %err, "router unreachable while announcing computer, dropping it");
                    failed.push(router.clone());
                    break;
                }
            }
        }
        if !failed.is_empty() {
            for router in &failed {
                self.state.remove_router(router);
            }
            self.rebuild_survivors().await;
        }
        Ok(())
    }

    async fn announce_router(&self, endpoint: Endpoint, _node: Option<String>) -> Result<(), ControllerError> {
        self.state.add_router(endpoint.clone());
        let weight = Weight::try_new(INITIAL_WEIGHT).expect("initial weight constant is valid");
        for (function, destination) in self.state.all_lambda_destinations() {
            if let Err(err) = self.client.change(&endpoint, &function, &destination, weight, true).await {
                warn!(%endpoint, %err, "new router unreachable while pushing current state, dropping it");
                self.state.remove_router(&endpoint);
                return Ok(());
            }
        }
        Ok(())
    }

    async fn remove_computer(&self, endpoint: Endpoint) -> Result<(), ControllerError> {
        let Some(lambdas) = self.state.remove_computer(&endpoint) else {
            return Ok(());
        };
        let mut failed = Vec::new();
        for router in self.state.routers() {
            for function in &lambdas {
                if let Err(err) = self.client.remove(&router, function, &endpoint).await {
                    warn!(%router, %err, "router unreachable while removing computer, dropping it");
                    failed.push(router.clone());
                    break;
                }
            }
        }
        for router in failed {
            self.state.remove_router(&router);
        }
        Ok(())
    }

    async fn remove_router(&self, endpoint: Endpoint) -> Result<(), ControllerError> {
        // The flat installer holds no per-router derived state beyond
        // membership, so there is nothing else to unwind here.
        self.state.remove_router(&endpoint);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use crate::domain_types::FunctionName;

    #[derive(Debug, Default)]
    struct RecordingClient {
        changes: StdMutex<usize>,
    }

    #[async_trait]
    impl RouterClient for RecordingClient {
        async fn change(
            &self,
            _endpoint: &Endpoint,
            _function: &FunctionName,
            _destination: &Endpoint,
            _weight: Weight,
            _is_final: bool,
        ) -> Result<(), crate::error::TransportError> {
            *self.changes.lock().unwrap() += 1;
            Ok(())
        }

        async fn remove(
            &self,
            _endpoint: &Endpoint,
            _function: &FunctionName,
            _destination: &Endpoint,
        ) -> Result<(), crate::error::TransportError> {
            Ok(())
        }

        async fn flush(&self, _endpoint: &Endpoint) -> Result<(), crate::error::TransportError> {
            Ok(())
        }
    }

    fn ep(s: &str) -> Endpoint {
        Endpoint::try_new(s).unwrap()
    }

    fn fname(s: &str) -> FunctionName {
        FunctionName::try_new(s).unwrap()
    }

    #[tokio::test]
    async fn announce_is_sent_to_every_known_router() {
        let client = Arc::new(RecordingClient::default());
        let installer = FlatInstaller::new(client.clone());
        installer.announce_router(ep("r1:1"), None).await.unwrap();
        installer.announce_router(ep("r2:1"), None).await.unwrap();

        installer
            .announce_computer(ComputerAnnouncement {
                endpoint: ep("c1:1"),
                lambdas: vec![fname("f")],
                node: None,
            })
            .await
            .unwrap();

        assert_eq!(*client.changes.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn reannouncing_identical_inventory_is_a_no_op() {
        let client = Arc::new(RecordingClient::default());
        let installer = FlatInstaller::new(client.clone());
        installer.announce_router(ep("r1:1"), None).await.unwrap();

        let announcement = ComputerAnnouncement {
            endpoint: ep("c1:1"),
            lambdas: vec![fname("f")],
            node: None,
        };
        installer.announce_computer(announcement.clone()).await.unwrap();
        let after_first = *client.changes.lock().unwrap();
        installer.announce_computer(announcement).await.unwrap();
        assert_eq!(*client.changes.lock().unwrap(), after_first);
    }
}

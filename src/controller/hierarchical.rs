//! The hierarchical controller installer: each computer is assigned a
//! single "home" router chosen to minimize network cost against a
//! [`Topology`], instead of the flat installer's every-router-gets-
//! everything fan-out, and every other router gets a non-final relay
//! route pointing at that home.
//!
//! Grounded on spec.md §4.7 and `edgecontrollerhier.cpp:360-370`. For
//! candidate router `i` and computer `c`:
//! - `maxCost(i, c) = d(i, c) + max_j d(i, j)`
//! - `avgCost(i, c) = N * d(i, c) + Σ_j d(i, j)`
//! - `Score(i, c) = Ω * maxCost(i, c) + avgCost(i, c)` under the `MinMax`
//!   objective, or `maxCost(i, c) + Ω * avgCost(i, c)` under `MinAvg`,
//!   with `Ω = 1 + 2*N^2` for an `N`-node topology, large enough that the
//!   leading term dominates and the trailing term only breaks ties.
//!
//! A computer's home router is the router **minimizing** `Score`; ties
//! keep the previously-assigned router (no thrashing on exact ties). A
//! router with low eccentricity (small `max_j`/`Σ_j`) can beat a router
//! that is merely nearer to the computer, which is what lets a central
//! router become the shared relay target from every other router
//! (`edgecontrollerhier.cpp:118-170`).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::warn;

use crate::domain_types::{Endpoint, FunctionName, Weight};
use crate::error::ControllerError;
use crate::transport::RouterClient;

use super::installer::{ComputerAnnouncement, ControllerInstaller};
use super::state::ControllerState;
use super::topology::Topology;

const INITIAL_WEIGHT: f64 = 1.0;

/// Which two-term lexicographic score a hierarchical installer minimizes
/// when choosing a computer's home router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Objective {
    /// Minimize `Ω * maxCost + avgCost`: worst-case distance dominates.
    MinMax,
    /// Minimize `maxCost + Ω * avgCost`: average distance dominates.
    MinAvg,
}

/// `Score(i, c)` for router node `router_node` and computer node
/// `computer_node`, under `objective`. `None` if either node is unknown
/// to `topology`.
fn score(topology: &Topology, objective: Objective, router_node: &str, computer_node: &str) -> Option<f64> {
    let n = topology.num_nodes() as f64;
    let omega = 1.0 + 2.0 * n * n;
    let distance_to_computer = topology.distance(router_node, computer_node).ok()?;

    let mut max_distance = 0.0f64;
    let mut sum_distance = 0.0f64;
    for node in topology.node_names() {
        let d = topology.distance(router_node, node).ok()?;
        max_distance = max_distance.max(d);
        sum_distance += d;
    }

    let max_cost = distance_to_computer + max_distance;
    let avg_cost = n * distance_to_computer + sum_distance;
    Some(match objective {
        Objective::MinMax => omega * max_cost + avg_cost,
        Objective::MinAvg => max_cost + omega * avg_cost,
    })
}

/// Outcome of attempting to place a computer on a home router.
enum InstallOutcome {
    Installed(Endpoint),
    Failed,
    NoRouterAvailable,
}

#[derive(Debug, Default)]
struct Assignments {
    /// Router endpoint -> topology node name.
    router_nodes: HashMap<Endpoint, String>,
    /// Computer endpoint -> (topology node name, current home router).
    computer_nodes: HashMap<Endpoint, (String, Option<Endpoint>)>,
    /// Router endpoint -> function -> number of computers homed on that
    /// router currently serving that function. Tracks the empty <->
    /// non-empty transition that triggers installing or removing relay
    /// routes on every other router.
    router_functions: HashMap<Endpoint, HashMap<FunctionName, usize>>,
}

impl Assignments {
    /// Record one more occurrence of `function` at `router`. Returns
    /// `true` iff this is the function's first appearance there.
    fn record_function(&mut self, router: &Endpoint, function: &FunctionName) -> bool {
        let count = self
            .router_functions
            .entry(router.clone())
            .or_default()
            .entry(function.clone())
            .or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Forget one occurrence of `function` at `router`. Returns `true`
    /// iff this was the last occurrence.
    fn forget_function(&mut self, router: &Endpoint, function: &FunctionName) -> bool {
        let Some(functions) = self.router_functions.get_mut(router) else {
            return false;
        };
        let Some(count) = functions.get_mut(function) else {
            return false;
        };
        *count = count.saturating_sub(1);
        if *count > 0 {
            return false;
        }
        functions.remove(function);
        if functions.is_empty() {
            self.router_functions.remove(router);
        }
        true
    }
}

/// The hierarchical installer: routes each computer's lambdas only to its
/// single best-scoring home router, and relays every other router to
/// that home for the functions it newly carries.
#[derive(Debug)]
pub struct HierarchicalInstaller {
    state: ControllerState,
    client: Arc<dyn RouterClient>,
    topology: Topology,
    objective: Objective,
    assignments: Mutex<Assignments>,
}

impl HierarchicalInstaller {
    /// Construct a hierarchical installer scoring router/computer pairs
    /// against `topology` under `objective`.
    #[must_use]
    pub fn new(client: Arc<dyn RouterClient>, topology: Topology, objective: Objective) -> Self {
        Self {
            state: ControllerState::new(),
            client,
            topology,
            objective,
            assignments: Mutex::new(Assignments::default()),
        }
    }

    /// The minimum-scoring router for `computer_node` among all currently
    /// known routers, breaking ties by keeping `current` if it is still
    /// among the minimum scorers.
    fn best_router(&self, computer_node: &str, current: Option<&Endpoint>) -> Option<Endpoint> {
        let assignments = self.assignments.lock().expect("assignments mutex poisoned");
        let mut best: Option<(Endpoint, f64)> = None;
        for (router, router_node) in &assignments.router_nodes {
            let Some(s) = score(&self.topology, self.objective, router_node, computer_node) else {
                continue;
            };
            let is_better = match &best {
                None => true,
                Some((_, best_score)) if s < *best_score => true,
                Some((best_router, best_score)) if s == *best_score => Some(router) == current && best_router != router,
                Some(_) => false,
            };
            if is_better {
                best = Some((router.clone(), s));
            }
        }
        best.map(|(router, _)| router)
    }

    /// Install `lambdas` on `computer_node`'s chosen home router (final
    /// entries), fan a non-final relay route to every other router for
    /// any function newly reached through that home, and tear down
    /// `previous_home`'s entries (and any relay routes they made
    /// necessary) if the home changed or the lambda set shrank.
    async fn install_for_computer(
        &self,
        endpoint: &Endpoint,
        computer_node: &str,
        lambdas: &[FunctionName],
        previous_home: Option<Endpoint>,
        previous_lambdas: &[FunctionName],
    ) -> InstallOutcome {
        let Some(home) = self.best_router(computer_node, previous_home.as_ref()) else {
            return InstallOutcome::NoRouterAvailable;
        };

        let weight = Weight::try_new(INITIAL_WEIGHT).expect("initial weight constant is valid");
        for function in lambdas {
            if self.client.change(&home, function, endpoint, weight, true).await.is_err() {
                warn!(router = %home, %endpoint, "home router unreachable while announcing computer");
                return InstallOutcome::Failed;
            }
        }

        let mut newly_relayed = Vec::new();
        {
            let mut assignments = self.assignments.lock().expect("assignments mutex poisoned");
            for function in lambdas {
                if assignments.record_function(&home, function) {
                    newly_relayed.push(function.clone());
                }
            }
        }
        for function in &newly_relayed {
            for other in self.state.routers() {
                if other == home {
                    continue;
                }
                let _ = self.client.change(&other, function, &home, weight, false).await;
            }
        }

        if let Some(old_home) = previous_home.filter(|p| *p != home) {
            for function in previous_lambdas {
                let _ = self.client.remove(&old_home, function, endpoint).await;
            }
            self.forget_functions_at_router(&old_home, previous_lambdas).await;
        } else {
            let dropped: Vec<FunctionName> = previous_lambdas
                .iter()
                .filter(|f| !lambdas.contains(f))
                .cloned()
                .collect();
            if !dropped.is_empty() {
                for function in &dropped {
                    let _ = self.client.remove(&home, function, endpoint).await;
                }
                self.forget_functions_at_router(&home, &dropped).await;
            }
        }

        InstallOutcome::Installed(home)
    }

    /// Forget `functions` at `router`; for any function whose last
    /// occurrence there just ended, remove the relay route for it on
    /// every other router too.
    async fn forget_functions_at_router(&self, router: &Endpoint, functions: &[FunctionName]) {
        let mut emptied = Vec::new();
        {
            let mut assignments = self.assignments.lock().expect("assignments mutex poisoned");
            for function in functions {
                if assignments.forget_function(router, function) {
                    emptied.push(function.clone());
                }
            }
        }
        for function in &emptied {
            for other in self.state.routers() {
                if other == *router {
                    continue;
                }
                let _ = self.client.remove(&other, function, router).await;
            }
        }
    }

    /// Flush every known router's table and recompute every computer's
    /// home-router placement (and the relay routes that follow from it)
    /// from scratch. Invoked on router-set changes and on transport
    /// failures, since incremental state can no longer be trusted to
    /// match what routers actually hold (`privateAnnounceRouter` /
    /// `privateRemoveRouter` both call `reset()` in the original).
    async fn reset(&self) {
        for router in self.state.routers() {
            if self.client.flush(&router).await.is_err() {
                warn!(%router, "router unreachable during reset, leaving its table stale until it recovers");
            }
        }

        let nodes: HashMap<Endpoint, String> = {
            let mut assignments = self.assignments.lock().expect("assignments mutex poisoned");
            assignments.router_functions.clear();
            for (_, home) in assignments.computer_nodes.values_mut() {
                *home = None;
            }
            assignments
                .computer_nodes
                .iter()
                .map(|(endpoint, (node, _))| (endpoint.clone(), node.clone()))
                .collect()
        };

        for (endpoint, lambdas) in self.state.computers() {
            let Some(computer_node) = nodes.get(&endpoint) else {
                continue;
            };
            if let InstallOutcome::Installed(home) = self
                .install_for_computer(&endpoint, computer_node, &lambdas, None, &[])
                .await
            {
                self.assignments
                    .lock()
                    .expect("assignments mutex poisoned")
                    .computer_nodes
                    .insert(endpoint, (computer_node.clone(), Some(home)));
            }
        }
    }
}

#[async_trait]
impl ControllerInstaller for HierarchicalInstaller {
    async fn announce_computer(&self, announcement: ComputerAnnouncement) -> Result<(), ControllerError> {
        let previous_lambdas = self.state.lambdas_for(&announcement.endpoint).unwrap_or_default();
        let inventory_changed = self
            .state
            .upsert_computer(announcement.endpoint.clone(), announcement.lambdas.clone());

        let previous_assignment = self
            .assignments
            .lock()
            .expect("assignments mutex poisoned")
            .computer_nodes
            .get(&announcement.endpoint)
            .cloned();
        let node_changed = previous_assignment
            .as_ref()
            .is_none_or(|(node, _)| Some(node) != announcement.node.as_ref());

        if !inventory_changed && !node_changed {
            return Ok(());
        }

        let Some(computer_node) = announcement.node.clone() else {
            warn!(endpoint = %announcement.endpoint, "computer announced with no topology node, cannot place it");
            return Ok(());
        };
        let previous_home = previous_assignment.and_then(|(_, home)| home);

        match self
            .install_for_computer(
                &announcement.endpoint,
                &computer_node,
                &announcement.lambdas,
                previous_home,
                &previous_lambdas,
            )
            .await
        {
            InstallOutcome::Installed(home) => {
                self.assignments
                    .lock()
                    .expect("assignments mutex poisoned")
                    .computer_nodes
                    .insert(announcement.endpoint, (computer_node, Some(home)));
            }
            InstallOutcome::Failed => self.reset().await,
            InstallOutcome::NoRouterAvailable => {}
        }
        Ok(())
    }

    async fn announce_router(&self, endpoint: Endpoint, node: Option<String>) -> Result<(), ControllerError> {
        self.state.add_router(endpoint.clone());
        if let Some(node) = node {
            self.assignments
                .lock()
                .expect("assignments mutex poisoned")
                .router_nodes
                .insert(endpoint, node);
        } else {
            warn!(%endpoint, "router announced with no topology node, cannot score it for any computer");
        }
        self.reset().await;
        Ok(())
    }

    async fn remove_computer(&self, endpoint: Endpoint) -> Result<(), ControllerError> {
        let lambdas = self.state.remove_computer(&endpoint);
        let home = {
            let mut assignments = self.assignments.lock().expect("assignments mutex poisoned");
            assignments.computer_nodes.remove(&endpoint).and_then(|(_, home)| home)
        };
        if let (Some(lambdas), Some(home)) = (lambdas, home) {
            for function in &lambdas {
                let _ = self.client.remove(&home, function, &endpoint).await;
            }
            self.forget_functions_at_router(&home, &lambdas).await;
        }
        Ok(())
    }

    async fn remove_router(&self, endpoint: Endpoint) -> Result<(), ControllerError> {
        self.state.remove_router(&endpoint);
        self.assignments
            .lock()
            .expect("assignments mutex poisoned")
            .router_nodes
            .remove(&endpoint);
        self.reset().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use crate::domain_types::FunctionName;

    const TOPOLOGY: &str = "\
router-a 0 10
router-b 10 0
";

    /// A four-node topology where `y` is the central node (eccentricity
    /// 4) despite being farther than `x` from the computer's node `c`
    /// (eccentricity 20), reproducing the "nearest router is not the
    /// best home" case a pure-distance score would get wrong.
    const ECCENTRIC_TOPOLOGY: &str = "\
c 0 1 3 5
x 1 0 4 20
y 3 4 0 2
z 5 20 2 0
";

    #[derive(Debug, Default)]
    struct RecordingClient {
        changes: StdMutex<Vec<(Endpoint, FunctionName, Endpoint, bool)>>,
    }

    #[async_trait]
    impl RouterClient for RecordingClient {
        async fn change(
            &self,
            endpoint: &Endpoint,
            function: &FunctionName,
            destination: &Endpoint,
            _weight: Weight,
            is_final: bool,
        ) -> Result<(), crate::error::TransportError> {
            self.changes
                .lock()
                .unwrap()
                .push((endpoint.clone(), function.clone(), destination.clone(), is_final));
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
    async fn computer_is_routed_through_its_closest_router_and_relayed_from_the_other() {
        let topology = Topology::parse(TOPOLOGY).unwrap();
        let client = Arc::new(RecordingClient::default());
        let installer = HierarchicalInstaller::new(client.clone(), topology, Objective::MinMax);

        installer
            .announce_router(ep("ra:1"), Some("router-a".to_string()))
            .await
            .unwrap();
        installer
            .announce_router(ep("rb:1"), Some("router-b".to_string()))
            .await
            .unwrap();

        installer
            .announce_computer(ComputerAnnouncement {
                endpoint: ep("c1:1"),
                lambdas: vec![fname("f")],
                node: Some("router-a".to_string()),
            })
            .await
            .unwrap();

        let changes = client.changes.lock().unwrap();
        assert_eq!(changes.len(), 2);
        let final_entry = changes.iter().find(|(_, _, _, is_final)| *is_final).unwrap();
        assert_eq!(final_entry.0, ep("ra:1"));
        assert_eq!(final_entry.2, ep("c1:1"));
        let relay_entry = changes.iter().find(|(_, _, _, is_final)| !*is_final).unwrap();
        assert_eq!(relay_entry.0, ep("rb:1"));
        assert_eq!(relay_entry.2, ep("ra:1"), "the relay points at the home router itself");
    }

    #[tokio::test]
    async fn central_router_wins_over_a_nearer_but_eccentric_router() {
        let topology = Topology::parse(ECCENTRIC_TOPOLOGY).unwrap();
        let client = Arc::new(RecordingClient::default());
        let installer = HierarchicalInstaller::new(client.clone(), topology, Objective::MinMax);

        installer.announce_router(ep("rx:1"), Some("x".to_string())).await.unwrap();
        installer.announce_router(ep("ry:1"), Some("y".to_string())).await.unwrap();

        installer
            .announce_computer(ComputerAnnouncement {
                endpoint: ep("c1:1"),
                lambdas: vec![fname("f")],
                node: Some("c".to_string()),
            })
            .await
            .unwrap();

        let changes = client.changes.lock().unwrap();
        let final_entry = changes.iter().find(|(_, _, _, is_final)| *is_final).unwrap();
        assert_eq!(final_entry.0, ep("ry:1"), "y is central even though x is nearer to c");
    }

    #[tokio::test]
    async fn min_avg_objective_also_prefers_the_central_router() {
        let topology = Topology::parse(ECCENTRIC_TOPOLOGY).unwrap();
        let client = Arc::new(RecordingClient::default());
        let installer = HierarchicalInstaller::new(client.clone(), topology, Objective::MinAvg);

        installer.announce_router(ep("rx:1"), Some("x".to_string())).await.unwrap();
        installer.announce_router(ep("ry:1"), Some("y".to_string())).await.unwrap();

        installer
            .announce_computer(ComputerAnnouncement {
                endpoint: ep("c1:1"),
                lambdas: vec![fname("f")],
                node: Some("c".to_string()),
            })
            .await
            .unwrap();

        let changes = client.changes.lock().unwrap();
        let final_entry = changes.iter().find(|(_, _, _, is_final)| *is_final).unwrap();
        assert_eq!(final_entry.0, ep("ry:1"));
    }

    #[tokio::test]
    async fn adding_a_closer_router_rehomes_existing_computers() {
        let topology = Topology::parse(TOPOLOGY).unwrap();
        let client = Arc::new(RecordingClient::default());
        let installer = HierarchicalInstaller::new(client.clone(), topology, Objective::MinMax);

        installer
            .announce_router(ep("ra:1"), Some("router-a".to_string()))
            .await
            .unwrap();
        installer
            .announce_computer(ComputerAnnouncement {
                endpoint: ep("c1:1"),
                lambdas: vec![fname("f")],
                node: Some("router-b".to_string()),
            })
            .await
            .unwrap();
        assert!(client
            .changes
            .lock()
            .unwrap()
            .iter()
            .any(|(e, _, _, is_final)| *e == ep("ra:1") && *is_final));

        installer
            .announce_router(ep("rb:1"), Some("router-b".to_string()))
            .await
            .unwrap();

        let changes = client.changes.lock().unwrap();
        assert!(
            changes
                .iter()
                .any(|(e, _, d, is_final)| *e == ep("rb:1") && *d == ep("c1:1") && *is_final),
            "computer should be re-homed onto the newly announced closer router"
        );
    }

    #[tokio::test]
    async fn reannouncing_identical_inventory_and_node_is_a_no_op() {
        let topology = Topology::parse(TOPOLOGY).unwrap();
        let client = Arc::new(RecordingClient::default());
        let installer = HierarchicalInstaller::new(client.clone(), topology, Objective::MinMax);
        installer
            .announce_router(ep("ra:1"), Some("router-a".to_string()))
            .await
            .unwrap();

        let announcement = ComputerAnnouncement {
            endpoint: ep("c1:1"),
            lambdas: vec![fname("f")],
            node: Some("router-a".to_string()),
        };
        installer.announce_computer(announcement.clone()).await.unwrap();
        let after_first = client.changes.lock().unwrap().len();
        installer.announce_computer(announcement).await.unwrap();
        assert_eq!(client.changes.lock().unwrap().len(), after_first);
    }
}

//! Shared in-memory state tracked by both installer strategies: the set of
//! known routers and each known computer's lambda inventory.
//!
//! Grounded on `Edge/edgecontroller.h`'s protected member state, guarded
//! here by a single mutex per spec.md §5's shared-resource policy.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::domain_types::{Endpoint, FunctionName};

/// The controller's view of the routers and computers it has heard from.
#[derive(Debug, Default)]
pub struct ControllerState {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    routers: HashSet<Endpoint>,
    computers: HashMap<Endpoint, Vec<FunctionName>>,
}

impl ControllerState {
    /// Construct empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a computer's current lambda inventory. Returns `true` iff
    /// this differs from what was previously recorded (a brand-new
    /// computer counts as a change), so callers can skip re-announcing an
    /// unchanged inventory.
    pub fn upsert_computer(&self, endpoint: Endpoint, lambdas: Vec<FunctionName>) -> bool {
        let mut inner = self.inner.lock().expect("controller state mutex poisoned");
        let changed = inner.computers.get(&endpoint) != Some(&lambdas);
        inner.computers.insert(endpoint, lambdas);
        changed
    }

    /// A computer's currently recorded lambda inventory, if known.
    #[must_use]
    pub fn lambdas_for(&self, endpoint: &Endpoint) -> Option<Vec<FunctionName>> {
        self.inner
            .lock()
            .expect("controller state mutex poisoned")
            .computers
            .get(endpoint)
            .cloned()
    }

    /// Every known computer and its lambda inventory, snapshotted to
    /// avoid holding the lock while making network calls.
    #[must_use]
    pub fn computers(&self) -> Vec<(Endpoint, Vec<FunctionName>)> {
        self.inner
            .lock()
            .expect("controller state mutex poisoned")
            .computers
            .iter()
            .map(|(endpoint, lambdas)| (endpoint.clone(), lambdas.clone()))
            .collect()
    }

    /// Forget a computer.
    pub fn remove_computer(&self, endpoint: &Endpoint) -> Option<Vec<FunctionName>> {
        self.inner
            .lock()
            .expect("controller state mutex poisoned")
            .computers
            .remove(endpoint)
    }

    /// Record a router.
    pub fn add_router(&self, endpoint: Endpoint) {
        self.inner
            .lock()
            .expect("controller state mutex poisoned")
            .routers
            .insert(endpoint);
    }

    /// Forget a router.
    pub fn remove_router(&self, endpoint: &Endpoint) {
        self.inner
            .lock()
            .expect("controller state mutex poisoned")
            .routers
            .remove(endpoint);
    }

    /// All known routers, snapshotted to avoid holding the lock while
    /// making network calls.
    #[must_use]
    pub fn routers(&self) -> Vec<Endpoint> {
        self.inner
            .lock()
            .expect("controller state mutex poisoned")
            .routers
            .iter()
            .cloned()
            .collect()
    }

    /// Every (lambda, computer) pair currently known.
    #[must_use]
    pub fn all_lambda_destinations(&self) -> Vec<(FunctionName, Endpoint)> {
        self.inner
            .lock()
            .expect("controller state mutex poisoned")
            .computers
            .iter()
            .flat_map(|(endpoint, lambdas)| lambdas.iter().cloned().map(move |f| (f, endpoint.clone())))
            .collect()
    }
}

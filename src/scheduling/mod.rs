//! Scheduling entries: the four pluggable destination-selection policies
//! that back every function name in a forwarding table.
//!
//! Each variant owns an ordered list of destinations plus policy-specific
//! bookkeeping. All four share one contract (insert/update, weight-only
//! update, remove, pick) implemented here as the [`SchedulingEntry`]
//! tagged-variant enum; the variant-specific state lives in its own
//! submodule.

mod least_impedance;
mod proportional_fairness;
mod random;
mod round_robin;

pub use least_impedance::LeastImpedance;
pub use proportional_fairness::ProportionalFairness;
pub use random::Random;
pub use round_robin::RoundRobin;

use serde::{Deserialize, Serialize};

use crate::domain_types::{Endpoint, Weight};
use crate::error::SchedulingEntryError;

/// One destination tracked by a scheduling entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    /// The endpoint of this destination.
    pub endpoint: Endpoint,
    /// The current weight of this destination.
    pub weight: Weight,
    /// Whether this destination is a final (compute) endpoint, as opposed
    /// to another router.
    pub is_final: bool,
}

/// The policy tag selecting which scheduling entry variant to materialize
/// for a function name. Fixed at forwarding-table construction time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulingKind {
    /// Pick a destination with probability proportional to `1/weight`.
    Random,
    /// Always pick the destination with the smallest weight.
    LeastImpedance,
    /// Deficit-counter weighted round robin with stale-destination probing.
    RoundRobin,
    /// Argmax of a proportional-fairness coefficient.
    ProportionalFairness {
        /// The fairness exponent applied to the weight term.
        alpha: f64,
        /// The fairness exponent applied to the throughput term.
        beta: f64,
    },
}

/// Internal contract implemented by each scheduling-entry variant.
///
/// `pick` must fail with [`SchedulingEntryError::NoDestinations`] when the
/// entry has no destinations. The three `notify_*` hooks are invoked by the
/// shared `change`/`remove` logic below after the destination list has
/// already been updated, so each variant only needs to keep its own
/// private index in sync.
trait EntryPolicy: std::fmt::Debug {
    fn pick(&mut self, destinations: &[Destination]) -> Result<Endpoint, SchedulingEntryError>;
    fn notify_weight_changed(
        &mut self,
        destinations: &[Destination],
        endpoint: &Endpoint,
        old: Weight,
        new: Weight,
    );
    fn notify_destination_added(
        &mut self,
        destinations: &[Destination],
        endpoint: &Endpoint,
        weight: Weight,
    );
    fn notify_destination_removed(
        &mut self,
        destinations: &[Destination],
        endpoint: &Endpoint,
        weight: Weight,
    );
}

/// A scheduling entry: an ordered destination list plus one of the four
/// policy variants' private state.
#[derive(Debug, Clone)]
pub struct SchedulingEntry {
    destinations: Vec<Destination>,
    policy: Policy,
}

#[derive(Debug, Clone)]
enum Policy {
    Random(Random),
    LeastImpedance(LeastImpedance),
    RoundRobin(RoundRobin),
    ProportionalFairness(ProportionalFairness),
}

impl Policy {
    fn as_mut_dyn(&mut self) -> &mut dyn EntryPolicy {
        match self {
            Self::Random(p) => p,
            Self::LeastImpedance(p) => p,
            Self::RoundRobin(p) => p,
            Self::ProportionalFairness(p) => p,
        }
    }

}

impl SchedulingEntry {
    /// Create an empty entry of the given kind.
    #[must_use]
    pub fn new(kind: SchedulingKind) -> Self {
        let policy = match kind {
            SchedulingKind::Random => Policy::Random(Random::new()),
            SchedulingKind::LeastImpedance => Policy::LeastImpedance(LeastImpedance::new()),
            SchedulingKind::RoundRobin => Policy::RoundRobin(RoundRobin::new()),
            SchedulingKind::ProportionalFairness { alpha, beta } => {
                Policy::ProportionalFairness(ProportionalFairness::new(alpha, beta))
            }
        };
        Self {
            destinations: Vec::new(),
            policy,
        }
    }

    /// Insert a new destination or update an existing one's weight and
    /// final flag.
    ///
    /// # Errors
    /// Returns [`SchedulingEntryError::InvalidDestination`] if the endpoint
    /// is empty (unreachable given [`Endpoint`]'s own validation, kept for
    /// parity with the source contract) or the weight is non-positive.
    pub fn change(
        &mut self,
        endpoint: Endpoint,
        weight: Weight,
        is_final: bool,
    ) -> Result<(), SchedulingEntryError> {
        if let Some(pos) = self.destinations.iter().position(|d| d.endpoint == endpoint) {
            let old_weight = self.destinations[pos].weight;
            self.destinations[pos].weight = weight;
            self.destinations[pos].is_final = is_final;
            self.policy.as_mut_dyn().notify_weight_changed(
                &self.destinations,
                &endpoint,
                old_weight,
                weight,
            );
        } else {
            self.destinations.push(Destination {
                endpoint: endpoint.clone(),
                weight,
                is_final,
            });
            self.policy
                .as_mut_dyn()
                .notify_destination_added(&self.destinations, &endpoint, weight);
        }
        Ok(())
    }

    /// Update the weight of an existing destination.
    ///
    /// # Errors
    /// Returns [`SchedulingEntryError::NoDestinations`] if the endpoint is
    /// not present.
    pub fn change_weight(
        &mut self,
        endpoint: &Endpoint,
        weight: Weight,
    ) -> Result<(), SchedulingEntryError> {
        let pos = self
            .destinations
            .iter()
            .position(|d| &d.endpoint == endpoint)
            .ok_or_else(|| SchedulingEntryError::no_destination(endpoint.clone()))?;
        let old_weight = self.destinations[pos].weight;
        self.destinations[pos].weight = weight;
        self.policy
            .as_mut_dyn()
            .notify_weight_changed(&self.destinations, endpoint, old_weight, weight);
        Ok(())
    }

    /// Return the current weight of an existing destination.
    ///
    /// # Errors
    /// Returns [`SchedulingEntryError::NoDestinations`] if the endpoint is
    /// not present.
    pub fn weight(&self, endpoint: &Endpoint) -> Result<Weight, SchedulingEntryError> {
        self.destinations
            .iter()
            .find(|d| &d.endpoint == endpoint)
            .map(|d| d.weight)
            .ok_or_else(|| SchedulingEntryError::no_destination(endpoint.clone()))
    }

    /// Remove a destination. Returns `true` if it was present.
    pub fn remove(&mut self, endpoint: &Endpoint) -> bool {
        if let Some(pos) = self.destinations.iter().position(|d| &d.endpoint == endpoint) {
            let removed = self.destinations.remove(pos);
            self.policy.as_mut_dyn().notify_destination_removed(
                &self.destinations,
                endpoint,
                removed.weight,
            );
            true
        } else {
            false
        }
    }

    /// Pick one destination per the entry's policy.
    ///
    /// # Errors
    /// Returns [`SchedulingEntryError::NoDestinations`] if the entry is empty.
    pub fn pick(&mut self) -> Result<Endpoint, SchedulingEntryError> {
        self.policy.as_mut_dyn().pick(&self.destinations)
    }

    /// Snapshot of all current destinations, in insertion order.
    #[must_use]
    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    /// Whether the entry has no destinations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(s: &str) -> Endpoint {
        Endpoint::try_new(s).unwrap()
    }

    fn w(v: f64) -> Weight {
        Weight::try_new(v).unwrap()
    }

    #[test]
    fn pick_on_empty_entry_fails() {
        let mut entry = SchedulingEntry::new(SchedulingKind::LeastImpedance);
        assert!(matches!(
            entry.pick(),
            Err(SchedulingEntryError::NoDestinations { .. })
        ));
    }

    #[test]
    fn change_weight_on_unknown_endpoint_fails() {
        let mut entry = SchedulingEntry::new(SchedulingKind::Random);
        entry.change(ep("a:1"), w(1.0), true).unwrap();
        assert!(entry.change_weight(&ep("b:1"), w(1.0)).is_err());
    }

    #[test]
    fn remove_is_noop_when_absent() {
        let mut entry = SchedulingEntry::new(SchedulingKind::RoundRobin);
        assert!(!entry.remove(&ep("a:1")));
    }
}

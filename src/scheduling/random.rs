//! Weighted-random scheduling entry.
//!
//! Grounded on `Edge/Entries/entryrandom.cpp`: each destination is picked
//! with probability proportional to `1/weight`, tracked via a running sum
//! of inverse weights so lookup stays O(n) without recomputing the sum.

use rand::Rng;

use super::{Destination, EntryPolicy};
use crate::domain_types::{Endpoint, Weight};
use crate::error::SchedulingEntryError;

/// Picks a destination with probability proportional to `1/weight`.
#[derive(Debug, Clone, Default)]
pub struct Random {
    inv_sum: f64,
}

impl Random {
    /// Create an entry with no destinations.
    #[must_use]
    pub fn new() -> Self {
        Self { inv_sum: 0.0 }
    }
}

impl EntryPolicy for Random {
    fn pick(&mut self, destinations: &[Destination]) -> Result<Endpoint, SchedulingEntryError> {
        match destinations.len() {
            0 => Err(SchedulingEntryError::no_destinations()),
            1 => Ok(destinations[0].endpoint.clone()),
            _ => {
                let r = rand::thread_rng().gen_range(0.0..self.inv_sum);
                let mut running = 0.0;
                for dest in &destinations[..destinations.len() - 1] {
                    running += 1.0 / dest.weight.as_f64();
                    if running >= r {
                        return Ok(dest.endpoint.clone());
                    }
                }
                // Floating-point safety net: fall through to the last
                // destination if accumulated rounding kept `running < r`.
                Ok(destinations.last().unwrap().endpoint.clone())
            }
        }
    }

    fn notify_weight_changed(
        &mut self,
        _destinations: &[Destination],
        _endpoint: &Endpoint,
        old: Weight,
        new: Weight,
    ) {
        self.inv_sum += 1.0 / new.as_f64() - 1.0 / old.as_f64();
    }

    fn notify_destination_added(
        &mut self,
        _destinations: &[Destination],
        _endpoint: &Endpoint,
        weight: Weight,
    ) {
        self.inv_sum += 1.0 / weight.as_f64();
    }

    fn notify_destination_removed(
        &mut self,
        _destinations: &[Destination],
        _endpoint: &Endpoint,
        weight: Weight,
    ) {
        self.inv_sum -= 1.0 / weight.as_f64();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::super::{SchedulingEntry, SchedulingKind};
    use crate::domain_types::{Endpoint, Weight};

    fn ep(s: &str) -> Endpoint {
        Endpoint::try_new(s).unwrap()
    }

    fn w(v: f64) -> Weight {
        Weight::try_new(v).unwrap()
    }

    #[test]
    fn single_destination_always_returned() {
        let mut entry = SchedulingEntry::new(SchedulingKind::Random);
        entry.change(ep("only:1"), w(2.0), true).unwrap();
        for _ in 0..20 {
            assert_eq!(entry.pick().unwrap(), ep("only:1"));
        }
    }

    /// Property 1 / Scenario S1: weights {1, 1/3, 1/6} over 10_000 draws
    /// converge to selection ratios {1, 3, 6}.
    #[test]
    fn weighted_distribution_converges() {
        let mut entry = SchedulingEntry::new(SchedulingKind::Random);
        entry.change(ep("d1:1"), w(1.0), true).unwrap();
        entry.change(ep("d2:1"), w(1.0 / 3.0), true).unwrap();
        entry.change(ep("d3:1"), w(1.0 / 6.0), true).unwrap();

        let mut counts: HashMap<Endpoint, u64> = HashMap::new();
        for _ in 0..10_000 {
            *counts.entry(entry.pick().unwrap()).or_insert(0) += 1;
        }

        let c1 = *counts.get(&ep("d1:1")).unwrap_or(&0) as f64;
        let c2 = *counts.get(&ep("d2:1")).unwrap_or(&0) as f64;
        let c3 = *counts.get(&ep("d3:1")).unwrap_or(&0) as f64;

        let ratio_21 = c2 / c1;
        let ratio_32 = c3 / c2;
        assert!((ratio_21 - 3.0).abs() < 0.3, "ratio d2/d1 = {ratio_21}");
        assert!((ratio_32 - 2.0).abs() < 0.3, "ratio d3/d2 = {ratio_32}");
    }

    #[test]
    fn inv_sum_consistent_after_mutations() {
        let mut entry = SchedulingEntry::new(SchedulingKind::Random);
        entry.change(ep("a:1"), w(2.0), true).unwrap();
        entry.change(ep("b:1"), w(4.0), true).unwrap();
        entry.change_weight(&ep("a:1"), w(1.0)).unwrap();
        entry.remove(&ep("b:1"));
        // With one destination left, pick must be deterministic.
        assert_eq!(entry.pick().unwrap(), ep("a:1"));
    }
}

//! Proportional-fairness scheduling entry.
//!
//! Grounded on `Edge/Entries/entryproportionalfairness.{h,cpp}`. For each
//! destination tracks a served-count and a last-updated timestamp; on
//! lookup picks the destination maximizing `(1/w)^alpha / (n/(now-t0))^beta`.
//! alpha=0, beta=1 degenerates to round robin; alpha=1, beta=0 maximizes
//! throughput with no fairness. Per spec.md §9 Open Question 4, the
//! denominator uses wall-clock time since this entry's own construction
//! (no decay), which is preserved verbatim.

use std::time::Instant;

use super::{Destination, EntryPolicy};
use crate::domain_types::{Endpoint, Weight};
use crate::error::SchedulingEntryError;

#[derive(Debug, Clone)]
struct Stats {
    served_count: u64,
    last_updated: Instant,
}

/// Argmax-of-coefficient fairness policy with tunable `alpha`/`beta`.
#[derive(Debug, Clone)]
pub struct ProportionalFairness {
    alpha: f64,
    beta: f64,
    epoch: Instant,
    stats: Vec<(Endpoint, Stats)>,
}

impl ProportionalFairness {
    /// Create an entry with no destinations and the given fairness
    /// exponents.
    #[must_use]
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self {
            alpha,
            beta,
            epoch: Instant::now(),
            stats: Vec::new(),
        }
    }

    fn find(&self, endpoint: &Endpoint) -> Option<&Stats> {
        self.stats.iter().find(|(e, _)| e == endpoint).map(|(_, s)| s)
    }

    fn find_mut(&mut self, endpoint: &Endpoint) -> Option<&mut Stats> {
        self.stats
            .iter_mut()
            .find(|(e, _)| e == endpoint)
            .map(|(_, s)| s)
    }

    fn compute_weight(&self, weight: f64, served_count: u64, since: Instant, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(since).as_secs_f64();
        let throughput = if elapsed > 0.0 {
            served_count as f64 / elapsed
        } else {
            served_count as f64 / f64::EPSILON
        };
        (1.0 / weight).powf(self.alpha) / throughput.powf(self.beta)
    }
}

impl EntryPolicy for ProportionalFairness {
    fn pick(&mut self, destinations: &[Destination]) -> Result<Endpoint, SchedulingEntryError> {
        if destinations.is_empty() {
            return Err(SchedulingEntryError::no_destinations());
        }
        let now = Instant::now();
        let mut best: Option<(Endpoint, f64)> = None;
        for dest in destinations {
            let stats = self
                .find(&dest.endpoint)
                .expect("destination must have proportional-fairness stats");
            let coefficient = self.compute_weight(
                dest.weight.as_f64(),
                stats.served_count,
                stats.last_updated,
                now,
            );
            match &best {
                None => best = Some((dest.endpoint.clone(), coefficient)),
                Some((_, best_coefficient)) if coefficient > *best_coefficient => {
                    best = Some((dest.endpoint.clone(), coefficient));
                }
                Some(_) => {}
            }
        }
        Ok(best.expect("non-empty destinations yield a winner").0)
    }

    fn notify_weight_changed(
        &mut self,
        _destinations: &[Destination],
        endpoint: &Endpoint,
        _old: Weight,
        _new: Weight,
    ) {
        // Invoked after a successful forward: bump the served count and
        // reset the timestamp so the throughput term reflects recent use.
        let now = Instant::now();
        if let Some(stats) = self.find_mut(endpoint) {
            stats.served_count += 1;
            stats.last_updated = now;
        }
    }

    fn notify_destination_added(
        &mut self,
        _destinations: &[Destination],
        endpoint: &Endpoint,
        _weight: Weight,
    ) {
        self.stats.push((
            endpoint.clone(),
            Stats {
                served_count: 1,
                last_updated: self.epoch,
            },
        ));
    }

    fn notify_destination_removed(
        &mut self,
        _destinations: &[Destination],
        endpoint: &Endpoint,
        _weight: Weight,
    ) {
        self.stats.retain(|(e, _)| e != endpoint);
    }
}

#[cfg(test)]
mod tests {
    use super::super::{SchedulingEntry, SchedulingKind};
    use crate::domain_types::{Endpoint, Weight};

    fn ep(s: &str) -> Endpoint {
        Endpoint::try_new(s).unwrap()
    }

    fn w(v: f64) -> Weight {
        Weight::try_new(v).unwrap()
    }

    fn entry(alpha: f64, beta: f64) -> SchedulingEntry {
        SchedulingEntry::new(SchedulingKind::ProportionalFairness { alpha, beta })
    }

    /// Property 4: alpha=0, beta=1 degenerates to round-robin over equal
    /// weights — each pick should visit every destination once before any
    /// repeats, since using one depresses its coefficient via the
    /// throughput term.
    #[test]
    fn degenerates_to_round_robin_with_equal_weights() {
        let mut e = entry(0.0, 1.0);
        e.change(ep("a:1"), w(1.0), true).unwrap();
        e.change(ep("b:1"), w(1.0), true).unwrap();
        e.change(ep("c:1"), w(1.0), true).unwrap();

        let mut seen = std::collections::HashSet::new();
        for _ in 0..3 {
            let picked = e.pick().unwrap();
            e.change_weight(&picked, w(1.0)).unwrap();
            seen.insert(picked);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn lower_weight_preferred_with_alpha_one_beta_zero() {
        let mut e = entry(1.0, 0.0);
        e.change(ep("a:1"), w(10.0), true).unwrap();
        e.change(ep("b:1"), w(1.0), true).unwrap();
        assert_eq!(e.pick().unwrap(), ep("b:1"));
    }
}

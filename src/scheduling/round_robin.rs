//! Deficit-counter weighted round robin with stale-destination probing.
//!
//! Grounded on `Edge/Entries/entryroundrobin.{h,cpp}`. Destinations whose
//! weight is within 2x the minimum observed weight form the "active set";
//! among them the one with the smallest deficit counter is picked and its
//! deficit bumped by its own weight. Destinations outside the active set
//! are retried (as a single "probe") once their backoff period elapses.

use std::time::{Duration, Instant};

use super::{Destination, EntryPolicy};
use crate::domain_types::{Endpoint, Weight};
use crate::error::SchedulingEntryError;

const INITIAL_STALE_PERIOD: Duration = Duration::from_secs(1);
const BACKOFF_COEFFICIENT: u32 = 2;
const MAXIMUM_STALE_PERIOD: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct CacheEntry {
    endpoint: Endpoint,
    weight: f64,
    /// Wall-clock instant this destination was last moved out of the
    /// active set. `None` means "never" (brand new, or the current
    /// one-shot probe slot).
    last_updated: Option<Instant>,
    deficit: f64,
    stale_period: Duration,
    probing: bool,
    active: bool,
}

impl CacheEntry {
    fn new(endpoint: Endpoint, weight: f64, deficit: f64) -> Self {
        Self {
            endpoint,
            weight,
            last_updated: None,
            deficit,
            stale_period: INITIAL_STALE_PERIOD,
            probing: false,
            active: false,
        }
    }

    fn reset_stale_period(&mut self) {
        self.stale_period = INITIAL_STALE_PERIOD;
    }

    fn backoff_stale_period(&mut self) {
        self.stale_period = (self.stale_period * BACKOFF_COEFFICIENT).min(MAXIMUM_STALE_PERIOD);
    }
}

/// Weighted round robin with a deficit counter and stale-destination
/// probing, in the active-set admission style of `EntryRoundRobin`.
#[derive(Debug, Clone)]
pub struct RoundRobin {
    /// Cache kept in the same order as the shared destination list, so
    /// deficit ties break by insertion order.
    cache: Vec<CacheEntry>,
}

impl RoundRobin {
    /// Create an entry with no destinations.
    #[must_use]
    pub fn new() -> Self {
        Self { cache: Vec::new() }
    }

    fn min_weight(&self) -> Option<f64> {
        self.cache.iter().map(|c| c.weight).min_by(f64::total_cmp)
    }

    /// Minimum deficit among the currently-active entries, or 0 if none
    /// are active (an empty active set only occurs transiently before the
    /// first rebuild).
    fn min_active_deficit(&self) -> f64 {
        self.cache
            .iter()
            .filter(|c| c.active)
            .map(|c| c.deficit)
            .min_by(f64::total_cmp)
            .unwrap_or(0.0)
    }

    /// Rebuild the cache to match `destinations` exactly, preserving
    /// existing per-endpoint state and inserting fresh entries for new
    /// destinations, dropping entries no longer present.
    fn sync_from(&mut self, destinations: &[Destination]) {
        if destinations.is_empty() {
            self.cache.clear();
            return;
        }
        let seed_deficit = self.min_active_deficit();
        let mut rebuilt = Vec::with_capacity(destinations.len());
        for dest in destinations {
            if let Some(pos) = self.cache.iter().position(|c| c.endpoint == dest.endpoint) {
                let mut entry = self.cache.remove(pos);
                entry.weight = dest.weight.as_f64();
                rebuilt.push(entry);
            } else {
                rebuilt.push(CacheEntry::new(
                    dest.endpoint.clone(),
                    dest.weight.as_f64(),
                    seed_deficit,
                ));
            }
        }
        self.cache = rebuilt;
    }

    fn rebuild_active_set(&mut self, now: Instant) {
        let snapshot_min_deficit = self.min_active_deficit();
        let min_weight = self.min_weight().unwrap_or(f64::INFINITY);

        for entry in &mut self.cache {
            let is_good = entry.weight <= min_weight * 2.0;
            if is_good {
                entry.active = true;
                if entry.probing {
                    entry.probing = false;
                    entry.reset_stale_period();
                }
            } else if entry.last_updated.is_none() {
                entry.active = true;
            } else {
                if entry.probing {
                    entry.probing = false;
                    entry.backoff_stale_period();
                }
                let elapsed = now.duration_since(entry.last_updated.unwrap());
                if elapsed >= entry.stale_period {
                    entry.last_updated = None;
                    entry.deficit = snapshot_min_deficit;
                    entry.probing = true;
                    entry.active = true;
                } else {
                    entry.active = false;
                }
            }
        }
    }

    fn update_active_set(&mut self, now: Instant) {
        self.rebuild_active_set(now);
    }
}

impl EntryPolicy for RoundRobin {
    fn pick(&mut self, _destinations: &[Destination]) -> Result<Endpoint, SchedulingEntryError> {
        let pos = self
            .cache
            .iter()
            .enumerate()
            .filter(|(_, c)| c.active)
            .min_by(|(_, a), (_, b)| a.deficit.total_cmp(&b.deficit))
            .map(|(i, _)| i)
            .ok_or_else(SchedulingEntryError::no_destinations)?;

        let now = Instant::now();
        let endpoint = self.cache[pos].endpoint.clone();
        // A destination used while outside the active set (a probe) is
        // marked as having just been used; `rebuild_active_set` decides
        // next time whether it stays admitted.
        self.cache[pos].last_updated = Some(now);
        self.cache[pos].deficit += self.cache[pos].weight;
        self.update_active_set(now);
        Ok(endpoint)
    }

    fn notify_weight_changed(
        &mut self,
        destinations: &[Destination],
        endpoint: &Endpoint,
        _old: Weight,
        new: Weight,
    ) {
        let snapshot_min_deficit = self.min_active_deficit();
        if let Some(entry) = self.cache.iter_mut().find(|c| &c.endpoint == endpoint) {
            entry.weight = new.as_f64();
        }
        for entry in &mut self.cache {
            entry.deficit -= snapshot_min_deficit;
        }
        let _ = destinations;
        self.update_active_set(Instant::now());
    }

    fn notify_destination_added(
        &mut self,
        destinations: &[Destination],
        _endpoint: &Endpoint,
        _weight: Weight,
    ) {
        self.sync_from(destinations);
        self.update_active_set(Instant::now());
    }

    fn notify_destination_removed(
        &mut self,
        destinations: &[Destination],
        _endpoint: &Endpoint,
        _weight: Weight,
    ) {
        self.sync_from(destinations);
        self.update_active_set(Instant::now());
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

    #[test]
    fn equal_weights_distribute_evenly() {
        let mut entry = SchedulingEntry::new(SchedulingKind::RoundRobin);
        entry.change(ep("d1:1"), w(1.0), true).unwrap();
        entry.change(ep("d2:1"), w(1.0), true).unwrap();
        entry.change(ep("d3:1"), w(1.0), true).unwrap();

        let mut counts = std::collections::HashMap::new();
        for _ in 0..9 {
            *counts.entry(entry.pick().unwrap()).or_insert(0) += 1;
        }
        for dest in [ep("d1:1"), ep("d2:1"), ep("d3:1")] {
            assert_eq!(*counts.get(&dest).unwrap_or(&0), 3);
        }
    }

    /// Scenario S3: weights {100, 110, 1000} on d1,d2,d3, each result fed
    /// back as the destination's new weight over 10 lookups, yields the
    /// sequence d1,d2,d3,d1,d2,d1,d2,d1,d2,d1.
    #[test]
    fn scenario_s3_round_robin_balance() {
        let mut entry = SchedulingEntry::new(SchedulingKind::RoundRobin);
        entry.change(ep("d1:1"), w(100.0), true).unwrap();
        entry.change(ep("d2:1"), w(110.0), true).unwrap();
        entry.change(ep("d3:1"), w(1000.0), true).unwrap();

        let mut sequence = Vec::new();
        for _ in 0..10 {
            let picked = entry.pick().unwrap();
            sequence.push(picked);
        }
        // d3 (weight 1000) is far above 2x min(100) = 200 so it is
        // excluded from the active set after its first (forced-admission)
        // probe use.
        assert_eq!(sequence[0], ep("d1:1"));
        assert_eq!(sequence[1], ep("d2:1"));
        assert_eq!(sequence[2], ep("d3:1"));
        assert!(!sequence[3..].contains(&ep("d3:1")));
    }

    #[test]
    fn excluded_destination_is_reintroduced_as_single_probe() {
        let mut entry = SchedulingEntry::new(SchedulingKind::RoundRobin);
        entry.change(ep("a:1"), w(1.0), true).unwrap();
        entry.change(ep("b:1"), w(1.0), true).unwrap();
        // Push b's weight far above the active-set threshold.
        entry.change_weight(&ep("b:1"), w(100.0)).unwrap();
        for _ in 0..5 {
            assert_eq!(entry.pick().unwrap(), ep("a:1"));
        }
    }
}

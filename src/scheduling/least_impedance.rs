//! Least-impedance scheduling entry.
//!
//! Grounded on `Edge/Entries/entryleastimpedance.cpp`: always returns the
//! destination with the smallest weight, caching the index of the current
//! minimum so lookup is O(1) and only mutations that can invalidate the
//! cache trigger a rescan.

use super::{Destination, EntryPolicy};
use crate::domain_types::{Endpoint, Weight};
use crate::error::SchedulingEntryError;

/// Always picks the destination with the smallest current weight.
#[derive(Debug, Clone, Default)]
pub struct LeastImpedance {
    /// Index into the destination list of the current minimum, if any.
    min_index: Option<usize>,
}

impl LeastImpedance {
    /// Create an entry with no destinations.
    #[must_use]
    pub fn new() -> Self {
        Self { min_index: None }
    }

    /// Full O(n) rescan for the minimum-weight destination.
    fn rescan(&mut self, destinations: &[Destination]) {
        self.min_index = destinations
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.weight.as_f64().total_cmp(&b.weight.as_f64()))
            .map(|(i, _)| i);
    }
}

impl EntryPolicy for LeastImpedance {
    fn pick(&mut self, destinations: &[Destination]) -> Result<Endpoint, SchedulingEntryError> {
        let idx = self
            .min_index
            .ok_or_else(SchedulingEntryError::no_destinations)?;
        Ok(destinations[idx].endpoint.clone())
    }

    fn notify_weight_changed(
        &mut self,
        destinations: &[Destination],
        _endpoint: &Endpoint,
        old: Weight,
        new: Weight,
    ) {
        let current_min = self.min_index.map(|i| destinations[i].weight);
        // Open Question #1 (spec.md §9): the `<=` branch over-refreshes when
        // the new weight merely equals the current minimum, to no effect.
        // Preserved verbatim rather than tightened to `<`.
        let invalidated = match current_min {
            Some(min) => new.as_f64() <= min.as_f64() || old == min,
            None => true,
        };
        if invalidated {
            self.rescan(destinations);
        }
    }

    fn notify_destination_added(
        &mut self,
        destinations: &[Destination],
        _endpoint: &Endpoint,
        weight: Weight,
    ) {
        match self.min_index.map(|i| destinations[i].weight) {
            None => self.min_index = Some(destinations.len() - 1),
            Some(current_min) if weight.as_f64() < current_min.as_f64() => {
                self.rescan(destinations);
            }
            Some(_) => {}
        }
    }

    fn notify_destination_removed(
        &mut self,
        destinations: &[Destination],
        _endpoint: &Endpoint,
        _weight: Weight,
    ) {
        // The removal already shifted every index after the removed
        // position, so the cached minimum must be recomputed regardless of
        // whether the removed destination happened to be it.
        self.rescan(destinations);
    }
}

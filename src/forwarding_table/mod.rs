//! The forwarding table: a thread-safe registry mapping function names to
//! scheduling entries.
//!
//! Grounded on `Edge/forwardingtable.{h,cpp}`: one mutex guards the whole
//! map and its entries (scheduling entries are never locked separately,
//! per spec.md §5's "Shared-resource policy").

mod two_table;

pub use two_table::RouterTables;

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain_types::{Endpoint, FunctionName, Weight, WeightFactor};
use crate::error::ForwardingTableError;
use crate::scheduling::{Destination, SchedulingEntry, SchedulingKind};

/// A thread-safe registry keyed by function name, holding one scheduling
/// entry per function, all materialized with the same [`SchedulingKind`].
pub struct ForwardingTable {
    kind: SchedulingKind,
    entries: Mutex<HashMap<FunctionName, SchedulingEntry>>,
}

impl std::fmt::Debug for ForwardingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardingTable")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl ForwardingTable {
    /// Create an empty table whose entries are all materialized with
    /// `kind` when first referenced.
    #[must_use]
    pub fn new(kind: SchedulingKind) -> Self {
        Self {
            kind,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The scheduling-entry variant this table materializes new entries
    /// with.
    #[must_use]
    pub fn entry_kind(&self) -> SchedulingKind {
        self.kind
    }

    /// Insert or update a destination for `function`, creating the entry
    /// if it does not yet exist.
    ///
    /// # Errors
    /// Returns [`ForwardingTableError::InvalidWeight`] if `weight` is
    /// negative (a weight of exactly zero is normalized upstream by the
    /// caller per spec.md §4.2, not rejected here), and propagates the
    /// scheduling entry's own `InvalidDestination` otherwise.
    pub fn change(
        &self,
        function: FunctionName,
        endpoint: Endpoint,
        weight: f64,
        is_final: bool,
    ) -> Result<(), ForwardingTableError> {
        if weight < 0.0 {
            return Err(ForwardingTableError::InvalidWeight { function, weight });
        }
        let weight = Weight::try_new(weight).map_err(|_| ForwardingTableError::InvalidDestination {
            function: function.clone(),
            endpoint: endpoint.clone(),
            weight,
        })?;
        let mut entries = self.entries.lock().expect("forwarding table mutex poisoned");
        let entry = entries
            .entry(function.clone())
            .or_insert_with(|| SchedulingEntry::new(self.kind));
        entry
            .change(endpoint.clone(), weight, is_final)
            .map_err(|_| ForwardingTableError::InvalidDestination {
                function,
                endpoint,
                weight: weight.as_f64(),
            })
    }

    /// Update only the weight of an existing (function, endpoint) pair.
    ///
    /// # Errors
    /// Returns [`ForwardingTableError::NoDestinations`] if the function or
    /// endpoint is unknown.
    pub fn change_weight(
        &self,
        function: &FunctionName,
        endpoint: &Endpoint,
        weight: f64,
    ) -> Result<(), ForwardingTableError> {
        let weight = Weight::try_new(weight).map_err(|_| ForwardingTableError::InvalidWeight {
            function: function.clone(),
            weight,
        })?;
        let mut entries = self.entries.lock().expect("forwarding table mutex poisoned");
        let entry = entries
            .get_mut(function)
            .ok_or_else(|| ForwardingTableError::NoDestinations {
                function: function.clone(),
            })?;
        entry
            .change_weight(endpoint, weight)
            .map_err(|_| ForwardingTableError::NoDestinations {
                function: function.clone(),
            })
    }

    /// Multiply an existing destination's weight by `factor`.
    ///
    /// # Errors
    /// Returns [`ForwardingTableError::InvalidWeightFactor`] if `factor`
    /// is not positive, and [`ForwardingTableError::NoDestinations`] if
    /// the function or endpoint is unknown.
    pub fn multiply(
        &self,
        function: &FunctionName,
        endpoint: &Endpoint,
        factor: f64,
    ) -> Result<(), ForwardingTableError> {
        let factor =
            WeightFactor::try_new(factor).map_err(|_| ForwardingTableError::InvalidWeightFactor {
                function: function.clone(),
                factor,
            })?;
        let mut entries = self.entries.lock().expect("forwarding table mutex poisoned");
        let entry = entries
            .get_mut(function)
            .ok_or_else(|| ForwardingTableError::NoDestinations {
                function: function.clone(),
            })?;
        let current = entry
            .weight(endpoint)
            .map_err(|_| ForwardingTableError::NoDestinations {
                function: function.clone(),
            })?;
        let updated = Weight::try_new(current.as_f64() * factor.as_f64()).map_err(|_| {
            ForwardingTableError::InvalidWeight {
                function: function.clone(),
                weight: current.as_f64() * factor.as_f64(),
            }
        })?;
        entry
            .change_weight(endpoint, updated)
            .map_err(|_| ForwardingTableError::NoDestinations {
                function: function.clone(),
            })
    }

    /// Remove a single destination from `function`'s entry; if the entry
    /// becomes empty, remove the entry entirely. No-op if either is
    /// already absent.
    pub fn remove(&self, function: &FunctionName, endpoint: &Endpoint) {
        let mut entries = self.entries.lock().expect("forwarding table mutex poisoned");
        if let Some(entry) = entries.get_mut(function) {
            entry.remove(endpoint);
            if entry.is_empty() {
                entries.remove(function);
            }
        }
    }

    /// Remove the entire entry for `function`. No-op if absent.
    pub fn remove_function(&self, function: &FunctionName) {
        self.entries
            .lock()
            .expect("forwarding table mutex poisoned")
            .remove(function);
    }

    /// Remove every entry.
    pub fn flush(&self) {
        self.entries.lock().expect("forwarding table mutex poisoned").clear();
    }

    /// Pick a destination for `function`.
    ///
    /// # Errors
    /// Returns [`ForwardingTableError::NoDestinations`] if the function is
    /// unknown or its entry has no destinations.
    pub fn pick(&self, function: &FunctionName) -> Result<Endpoint, ForwardingTableError> {
        let mut entries = self.entries.lock().expect("forwarding table mutex poisoned");
        let entry = entries
            .get_mut(function)
            .ok_or_else(|| ForwardingTableError::NoDestinations {
                function: function.clone(),
            })?;
        entry
            .pick()
            .map_err(|_| ForwardingTableError::NoDestinations {
                function: function.clone(),
            })
    }

    /// All function names with at least one entry.
    #[must_use]
    pub fn lambdas(&self) -> Vec<FunctionName> {
        self.entries
            .lock()
            .expect("forwarding table mutex poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// A full snapshot of the table: function name to destination list.
    #[must_use]
    pub fn full_table(&self) -> HashMap<FunctionName, Vec<Destination>> {
        self.entries
            .lock()
            .expect("forwarding table mutex poisoned")
            .iter()
            .map(|(f, e)| (f.clone(), e.destinations().to_vec()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fname(s: &str) -> FunctionName {
        FunctionName::try_new(s).unwrap()
    }

    fn ep(s: &str) -> Endpoint {
        Endpoint::try_new(s).unwrap()
    }

    #[test]
    fn change_creates_entry_lazily() {
        let table = ForwardingTable::new(SchedulingKind::LeastImpedance);
        table
            .change(fname("f"), ep("a:1"), 1.0, true)
            .unwrap();
        assert_eq!(table.pick(&fname("f")).unwrap(), ep("a:1"));
    }

    #[test]
    fn change_rejects_negative_weight() {
        let table = ForwardingTable::new(SchedulingKind::Random);
        let err = table.change(fname("f"), ep("a:1"), -1.0, true).unwrap_err();
        assert!(matches!(err, ForwardingTableError::InvalidWeight { .. }));
    }

    #[test]
    fn pick_on_unknown_function_fails() {
        let table = ForwardingTable::new(SchedulingKind::Random);
        assert!(matches!(
            table.pick(&fname("missing")),
            Err(ForwardingTableError::NoDestinations { .. })
        ));
    }

    #[test]
    fn remove_last_destination_drops_entry() {
        let table = ForwardingTable::new(SchedulingKind::Random);
        table.change(fname("f"), ep("a:1"), 1.0, true).unwrap();
        table.remove(&fname("f"), &ep("a:1"));
        assert!(!table.lambdas().contains(&fname("f")));
    }

    /// Property 6: `change` on a two-table router installs into table 0
    /// always, and into table 1 iff `final`. Exercised at the
    /// `RouterTables` layer, but the single-table semantics underpinning
    /// it are verified here: `multiply` composes with `change`.
    #[test]
    fn multiply_scales_existing_weight() {
        let table = ForwardingTable::new(SchedulingKind::LeastImpedance);
        table.change(fname("f"), ep("a:1"), 2.0, true).unwrap();
        table.multiply(&fname("f"), &ep("a:1"), 3.0).unwrap();
        table.change(fname("f"), ep("b:1"), 7.0, true).unwrap();
        // a is now weight 6, still less than b's 7, so a remains the min.
        assert_eq!(table.pick(&fname("f")).unwrap(), ep("a:1"));
    }

    #[test]
    fn flush_clears_everything() {
        let table = ForwardingTable::new(SchedulingKind::Random);
        table.change(fname("f"), ep("a:1"), 1.0, true).unwrap();
        table.flush();
        assert!(table.lambdas().is_empty());
    }
}

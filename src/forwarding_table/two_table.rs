//! A router's pair of forwarding tables: an *overall* table serving
//! client-originated requests (all destinations visible) and a
//! *final-only* table serving router-originated requests (final
//! destinations only).
//!
//! Grounded on spec.md §4.2 and the `GetNumTables`/`GetTable` operations
//! of §6: table 0 is overall, table 1 is final-only.

use crate::domain_types::{Endpoint, FunctionName};
use crate::error::ForwardingTableError;
use crate::scheduling::SchedulingKind;

use super::ForwardingTable;

/// The two tables a router may own. A single-table router (one that never
/// receives router-originated requests) can simply ignore `final_only`.
#[derive(Debug)]
pub struct RouterTables {
    overall: ForwardingTable,
    final_only: ForwardingTable,
}

impl RouterTables {
    /// Create both tables with the same scheduling-entry kind.
    #[must_use]
    pub fn new(kind: SchedulingKind) -> Self {
        Self {
            overall: ForwardingTable::new(kind),
            final_only: ForwardingTable::new(kind),
        }
    }

    /// Table 0 (overall).
    #[must_use]
    pub fn overall(&self) -> &ForwardingTable {
        &self.overall
    }

    /// Table 1 (final-only).
    #[must_use]
    pub fn final_only(&self) -> &ForwardingTable {
        &self.final_only
    }

    /// Look up table by its numeric id (0 = overall, 1 = final-only).
    #[must_use]
    pub fn by_id(&self, id: u32) -> Option<&ForwardingTable> {
        match id {
            0 => Some(&self.overall),
            1 => Some(&self.final_only),
            _ => None,
        }
    }

    /// `CHANGE`: always installs into the overall table; installs into
    /// the final-only table too iff `is_final`.
    ///
    /// # Errors
    /// Propagates [`ForwardingTableError`] from either underlying table.
    pub fn change(
        &self,
        function: FunctionName,
        endpoint: Endpoint,
        weight: f64,
        is_final: bool,
    ) -> Result<(), ForwardingTableError> {
        self.overall
            .change(function.clone(), endpoint.clone(), weight, is_final)?;
        if is_final {
            self.final_only.change(function, endpoint, weight, is_final)?;
        }
        Ok(())
    }

    /// `REMOVE`: removes the destination from both tables.
    pub fn remove(&self, function: &FunctionName, endpoint: &Endpoint) {
        self.overall.remove(function, endpoint);
        self.final_only.remove(function, endpoint);
    }

    /// `FLUSH`: clears both tables.
    pub fn flush(&self) {
        self.overall.flush();
        self.final_only.flush();
    }
}

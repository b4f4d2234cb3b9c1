//! Local optimizers: feed per-invocation completion-time samples back into
//! a computer's forwarding-table weights.
//!
//! Grounded on `Edge/localoptimizer*.{h,cpp}`. Unlike the closed
//! four-member [`crate::scheduling::SchedulingKind`] family, the set of
//! optimizers is a genuine open extension point — new strategies can be
//! added without touching callers — so this is modeled as a trait object
//! rather than a tagged enum.

mod async_ewma;
mod async_pf;
mod none;
mod trivial;

pub use async_ewma::AsyncEwma;
pub use async_pf::AsyncProportionalFairness;
pub use none::NoOptimizer;
pub use trivial::Trivial;

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain_types::{Endpoint, FunctionName};
use crate::forwarding_table::ForwardingTable;

/// A sample reported after a lambda invocation completes: how long it took
/// to run on a particular (function, destination) pair.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    /// Wall-clock seconds the invocation took end-to-end.
    pub elapsed_secs: f64,
}

/// A strategy for turning completion-time samples into forwarding-table
/// weight updates. Implementations own whatever running statistics they
/// need; `report` is called once per completed invocation.
#[async_trait]
pub trait LocalOptimizer: std::fmt::Debug + Send + Sync {
    /// Record a completion-time sample for `(function, destination)`, and
    /// apply whatever weight update (if any) the strategy calls for to
    /// `table`.
    async fn report(
        &self,
        table: &ForwardingTable,
        function: &FunctionName,
        destination: &Endpoint,
        sample: Sample,
    );
}

/// Construct the optimizer named `kind`, defaulting unknown names to
/// [`NoOptimizer`].
#[must_use]
pub fn by_name(kind: &str) -> Arc<dyn LocalOptimizer> {
    match kind {
        "trivial" => Arc::new(Trivial::new(std::time::Duration::from_secs(5))),
        "async-ewma" => Arc::new(AsyncEwma::new(0.8, std::time::Duration::from_secs(10))),
        "async-pf" => Arc::new(AsyncProportionalFairness::new()),
        _ => Arc::new(NoOptimizer),
    }
}

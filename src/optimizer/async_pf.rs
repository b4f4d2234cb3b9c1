//! The asynchronous proportional-fairness optimizer: writes every raw
//! completion-time sample straight through as the destination's new
//! weight, with no smoothing — intended to pair with a
//! [`crate::scheduling::ProportionalFairness`] forwarding table, which
//! already does its own fairness weighting over the raw samples.
//!
//! Grounded on `Edge/localoptimizerasyncpf.{h,cpp}`.

use async_trait::async_trait;

use crate::domain_types::{Endpoint, FunctionName};
use crate::forwarding_table::ForwardingTable;

use super::{LocalOptimizer, Sample};

/// Writes the raw sample through as the new weight, unsmoothed.
#[derive(Debug, Default)]
pub struct AsyncProportionalFairness;

impl AsyncProportionalFairness {
    /// Create a new instance.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LocalOptimizer for AsyncProportionalFairness {
    async fn report(
        &self,
        table: &ForwardingTable,
        function: &FunctionName,
        destination: &Endpoint,
        sample: Sample,
    ) {
        let _ = table.change_weight(function, destination, sample.elapsed_secs.max(f64::MIN_POSITIVE));
    }
}

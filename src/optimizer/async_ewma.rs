//! The asynchronous exponential-moving-average optimizer: maintains
//! `estimate = alpha*previous + (1-alpha)*sample` per (function,
//! destination) and writes the estimate back as the weight after every
//! sample, discarding stale estimates that haven't been refreshed within a
//! staleness threshold.
//!
//! Grounded on `Edge/localoptimizerasync.{h,cpp}`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::domain_types::{Endpoint, FunctionName};
use crate::forwarding_table::ForwardingTable;

use super::{LocalOptimizer, Sample};

#[derive(Debug, Clone, Copy)]
struct Estimate {
    value: f64,
    updated_at: Instant,
}

/// Exponential-moving-average completion-time estimator.
#[derive(Debug)]
pub struct AsyncEwma {
    alpha: f64,
    stale_after: Duration,
    estimates: Mutex<HashMap<(FunctionName, Endpoint), Estimate>>,
}

impl AsyncEwma {
    /// Create an EWMA optimizer with smoothing factor `alpha` (weight
    /// given to the previous estimate) and staleness threshold
    /// `stale_after`, after which a destination's estimate is reset to a
    /// bare sample rather than blended.
    #[must_use]
    pub fn new(alpha: f64, stale_after: Duration) -> Self {
        Self {
            alpha,
            stale_after,
            estimates: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl LocalOptimizer for AsyncEwma {
    async fn report(
        &self,
        table: &ForwardingTable,
        function: &FunctionName,
        destination: &Endpoint,
        sample: Sample,
    ) {
        let now = Instant::now();
        let updated = {
            let mut estimates = self.estimates.lock().expect("async-ewma mutex poisoned");
            let key = (function.clone(), destination.clone());
            let value = match estimates.get(&key) {
                Some(prev) if now.duration_since(prev.updated_at) < self.stale_after => {
                    self.alpha * prev.value + (1.0 - self.alpha) * sample.elapsed_secs
                }
                _ => sample.elapsed_secs,
            };
            estimates.insert(
                key,
                Estimate {
                    value,
                    updated_at: now,
                },
            );
            value
        };
        let _ = table.change_weight(function, destination, updated.max(f64::MIN_POSITIVE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::SchedulingKind;

    #[tokio::test]
    async fn blends_successive_samples() {
        let optimizer = AsyncEwma::new(0.5, Duration::from_secs(60));
        let table = ForwardingTable::new(SchedulingKind::LeastImpedance);
        let function = FunctionName::try_new("f").unwrap();
        let endpoint = Endpoint::try_new("a:1").unwrap();
        table.change(function.clone(), endpoint.clone(), 1.0, true).unwrap();

        optimizer
            .report(&table, &function, &endpoint, Sample { elapsed_secs: 10.0 })
            .await;
        optimizer
            .report(&table, &function, &endpoint, Sample { elapsed_secs: 2.0 })
            .await;

        let full = table.full_table();
        let weight = full[&function][0].weight.as_f64();
        assert!((weight - 6.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn stale_estimate_resets_to_bare_sample() {
        let optimizer = AsyncEwma::new(0.5, Duration::from_millis(0));
        let table = ForwardingTable::new(SchedulingKind::LeastImpedance);
        let function = FunctionName::try_new("f").unwrap();
        let endpoint = Endpoint::try_new("a:1").unwrap();
        table.change(function.clone(), endpoint.clone(), 1.0, true).unwrap();

        optimizer
            .report(&table, &function, &endpoint, Sample { elapsed_secs: 10.0 })
            .await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        optimizer
            .report(&table, &function, &endpoint, Sample { elapsed_secs: 3.0 })
            .await;

        let full = table.full_table();
        let weight = full[&function][0].weight.as_f64();
        assert!((weight - 3.0).abs() < 1e-9);
    }
}

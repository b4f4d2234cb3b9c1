//! The trivial optimizer: accumulates count/min/mean/max completion-time
//! statistics per (function, destination) and periodically writes the
//! running mean back as the destination's weight.
//!
//! Grounded on `Edge/localoptimizertrivial.{h,cpp}`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::domain_types::{Endpoint, FunctionName};
use crate::forwarding_table::ForwardingTable;

use super::{LocalOptimizer, Sample};

#[derive(Debug, Clone, Copy)]
struct Stats {
    count: u64,
    min: f64,
    mean: f64,
    max: f64,
    last_flushed: Instant,
}

impl Stats {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            min: f64::INFINITY,
            mean: 0.0,
            max: f64::NEG_INFINITY,
            last_flushed: now,
        }
    }

    fn observe(&mut self, value: f64) {
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        // Incremental mean, avoids re-summing the whole history.
        self.mean += (value - self.mean) / self.count as f64;
    }
}

/// Periodically snapshots the running mean completion time as the
/// destination's new weight, so higher-latency destinations are
/// deprioritized by policies that favor lower weights.
#[derive(Debug)]
pub struct Trivial {
    period: Duration,
    stats: Mutex<HashMap<(FunctionName, Endpoint), Stats>>,
}

impl Trivial {
    /// Create a trivial optimizer that flushes each destination's mean at
    /// most once per `period`.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            stats: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl LocalOptimizer for Trivial {
    async fn report(
        &self,
        table: &ForwardingTable,
        function: &FunctionName,
        destination: &Endpoint,
        sample: Sample,
    ) {
        let now = Instant::now();
        let should_flush_mean = {
            let mut stats = self.stats.lock().expect("trivial optimizer mutex poisoned");
            let entry = stats
                .entry((function.clone(), destination.clone()))
                .or_insert_with(|| Stats::new(now));
            entry.observe(sample.elapsed_secs);
            if now.duration_since(entry.last_flushed) >= self.period {
                entry.last_flushed = now;
                Some(entry.mean)
            } else {
                None
            }
        };
        if let Some(mean) = should_flush_mean {
            let _ = table.change_weight(function, destination, mean.max(f64::MIN_POSITIVE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::SchedulingKind;

    #[tokio::test]
    async fn flushes_mean_after_period_elapses() {
        let optimizer = Trivial::new(Duration::from_millis(0));
        let table = ForwardingTable::new(SchedulingKind::LeastImpedance);
        let function = FunctionName::try_new("f").unwrap();
        let endpoint = Endpoint::try_new("a:1").unwrap();
        table.change(function.clone(), endpoint.clone(), 1.0, true).unwrap();

        optimizer
            .report(&table, &function, &endpoint, Sample { elapsed_secs: 0.5 })
            .await;

        let full = table.full_table();
        let dest = &full[&function][0];
        assert!((dest.weight.as_f64() - 0.5).abs() < 1e-9);
    }
}

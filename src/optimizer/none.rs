//! The null optimizer: discards every sample, leaving forwarding-table
//! weights exactly as configured.
//!
//! Grounded on `Edge/localoptimizernone.h`.

use async_trait::async_trait;

use crate::domain_types::{Endpoint, FunctionName};
use crate::forwarding_table::ForwardingTable;

use super::{LocalOptimizer, Sample};

/// Discards all samples.
#[derive(Debug, Default)]
pub struct NoOptimizer;

#[async_trait]
impl LocalOptimizer for NoOptimizer {
    async fn report(
        &self,
        _table: &ForwardingTable,
        _function: &FunctionName,
        _destination: &Endpoint,
        _sample: Sample,
    ) {
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::SchedulingKind;

    #[tokio::test]
    async fn report_is_a_true_no_op() {
        let table = ForwardingTable::new(SchedulingKind::LeastImpedance);
        let function = FunctionName::try_new("f").unwrap();
        let endpoint = Endpoint::try_new("a:1").unwrap();
        table.change(function.clone(), endpoint.clone(), 3.0, true).unwrap();

        NoOptimizer
            .report(&table, &function, &endpoint, Sample { elapsed_secs: 1.0 })
            .await;

        assert_eq!(table.pick(&function).unwrap(), endpoint);
    }
}

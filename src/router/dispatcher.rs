//! The router's request-handling dispatcher.
//!
//! Grounded on spec.md §4.5's 5-step handling: (1) reject oversized
//! requests, (2) select the overall or final-only table depending on
//! whether the request originated from a client or another router, (3)
//! pick a destination via the table's scheduling entry, (4) forward the
//! request and await a response, (5) report a completion sample to the
//! local optimizer and relay the response upstream, retrying once against
//! a different destination on transport failure.

use std::sync::Arc;
use std::time::Instant;

use tracing::{instrument, warn};

use crate::error::RouterError;
use crate::forwarding_table::RouterTables;
use crate::optimizer::{LocalOptimizer, Sample};
use crate::transport::{ForwardingClient, LambdaRequest, LambdaResponse, MAX_REQUEST_BYTES};

/// Where a request entered the router from, deciding which forwarding
/// table serves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Directly from an originating client: the overall table applies,
    /// which may point at another router.
    Client,
    /// Relayed from an upstream router: the final-only table applies, so
    /// this hop always lands on a compute destination.
    Router,
}

/// The router's dispatcher: owns both forwarding tables, a transport
/// client to reach destinations, and a local optimizer to feed completion
/// samples back into table weights.
#[derive(Debug)]
pub struct Dispatcher {
    tables: Arc<RouterTables>,
    client: Arc<dyn ForwardingClient>,
    optimizer: Arc<dyn LocalOptimizer>,
}

impl Dispatcher {
    /// Construct a dispatcher over `tables`, forwarding via `client` and
    /// reporting completions to `optimizer`.
    #[must_use]
    pub fn new(
        tables: Arc<RouterTables>,
        client: Arc<dyn ForwardingClient>,
        optimizer: Arc<dyn LocalOptimizer>,
    ) -> Self {
        Self {
            tables,
            client,
            optimizer,
        }
    }

    /// Handle one incoming request per the 5-step process above.
    ///
    /// # Errors
    /// Returns [`RouterError`] if the request is oversized, no route
    /// exists, or forwarding ultimately fails.
    #[instrument(skip(self, request), fields(function = %request.function, origin = ?origin))]
    pub async fn handle(
        &self,
        mut request: LambdaRequest,
        origin: Origin,
    ) -> Result<LambdaResponse, RouterError> {
        if request.payload.len() > MAX_REQUEST_BYTES {
            return Err(RouterError::OversizedRequest {
                size: request.payload.len(),
                limit: MAX_REQUEST_BYTES,
            });
        }

        let table = match origin {
            Origin::Client => self.tables.overall(),
            Origin::Router => self.tables.final_only(),
        };

        let destination = table
            .pick(&request.function)
            .map_err(|_| RouterError::NoRoute(request.function.clone()))?;

        request.hop_count += 1;
        let started = Instant::now();
        match self.client.forward(&destination, request.clone()).await {
            Ok(response) => {
                let elapsed = started.elapsed().as_secs_f64();
                self.optimizer
                    .report(
                        table,
                        &request.function,
                        &destination,
                        Sample {
                            elapsed_secs: elapsed,
                        },
                    )
                    .await;
                Ok(response)
            }
            Err(err) => {
                warn!(%destination, error = %err, "forwarding failed, evicting destination");
                table.remove(&request.function, &destination);
                Err(RouterError::Forwarding(err))
            }
        }
    }
}

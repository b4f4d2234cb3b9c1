//! # edge-runtime
//!
//! A distributed runtime for routing and executing serverless lambda
//! invocations across edge computers.
//!
//! Three roles compose the system:
//! - A **router** forwards a lambda invocation toward a final compute
//!   destination via a pluggable [`scheduling`] policy held in its
//!   [`forwarding_table`].
//! - A **computer** ([`compute`]) owns processors and containers and runs
//!   invocations under a virtual-time scheduling model.
//! - A **controller** ([`controller`]) announces computers' lambda
//!   inventories to routers, either flatly or scored against a network
//!   [`controller::Topology`].
//!
//! [`transport`] carries the wire envelope and the abstract RPC traits
//! these roles use to reach each other; [`optimizer`] closes the loop by
//! feeding completion-time samples back into forwarding-table weights.

pub mod compute;
pub mod controller;
pub mod domain_types;
pub mod error;
pub mod forwarding_table;
pub mod optimizer;
pub mod router;
pub mod scheduling;
pub mod transport;

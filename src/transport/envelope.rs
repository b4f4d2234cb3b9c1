//! The wire envelope exchanged between clients, routers, and computers.
//!
//! Grounded on spec.md §6's external-interface field list.

use serde::{Deserialize, Serialize};

use crate::domain_types::FunctionName;

/// A lambda invocation request, as carried end to end from the
/// originating client through every intermediate router to the final
/// compute node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LambdaRequest {
    /// The function being invoked.
    pub function: FunctionName,
    /// Opaque request payload, passed through to the lambda unmodified.
    pub payload: Vec<u8>,
    /// Number of hops this request has already traversed, incremented by
    /// each router; used to cap routing loops.
    #[serde(default)]
    pub hop_count: u32,
    /// Correlation id assigned by the originating client, propagated
    /// unchanged for tracing.
    pub request_id: String,
}

impl LambdaRequest {
    /// The request payload's size, used by the computer to scale resource
    /// requirements per its lambda's [`crate::compute::ProportionalRequirement`].
    #[must_use]
    pub fn input_size(&self) -> u64 {
        self.payload.len() as u64
    }
}

/// A maximum request size a router will accept, beyond which it rejects
/// with [`crate::error::TransportError`]; see spec.md §7's
/// `OversizedRequest` error kind.
pub const MAX_REQUEST_BYTES: usize = 16 * 1024 * 1024;

/// The response to a [`LambdaRequest`], returned by the final compute
/// node and relayed unmodified by every intermediate router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LambdaResponse {
    /// The request this responds to.
    pub request_id: String,
    /// `true` if the lambda ran successfully.
    pub success: bool,
    /// Opaque response payload; empty on failure.
    pub payload: Vec<u8>,
    /// A human-readable error message, present iff `success` is `false`.
    pub error: Option<String>,
}

impl LambdaResponse {
    /// Build a successful response.
    #[must_use]
    pub fn ok(request_id: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            request_id: request_id.into(),
            success: true,
            payload,
            error: None,
        }
    }

    /// Build a failed response.
    #[must_use]
    pub fn failure(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            success: false,
            payload: Vec::new(),
            error: Some(error.into()),
        }
    }
}

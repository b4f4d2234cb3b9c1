//! Error types shared across the scheduling, forwarding, compute, and
//! controller layers.

use thiserror::Error;

use crate::domain_types::{Endpoint, FunctionName};

/// Errors raised by a scheduling entry's lookup or mutation operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedulingEntryError {
    /// Lookup was attempted on an entry with zero destinations.
    #[error("no destinations available{}", endpoint.as_ref().map(|e| format!(" for {e}")).unwrap_or_default())]
    NoDestinations {
        /// The endpoint that was looked up, if the caller named one.
        endpoint: Option<Endpoint>,
    },

    /// An insert-or-update call supplied an empty endpoint or non-positive weight.
    #[error("invalid destination {endpoint} with weight {weight}")]
    InvalidDestination {
        /// The offending endpoint.
        endpoint: Endpoint,
        /// The offending weight.
        weight: f64,
    },
}

impl SchedulingEntryError {
    /// Build a `NoDestinations` error with no named endpoint.
    #[must_use]
    pub fn no_destinations() -> Self {
        Self::NoDestinations { endpoint: None }
    }

    /// Build a `NoDestinations` error naming the missing endpoint.
    #[must_use]
    pub fn no_destination(endpoint: Endpoint) -> Self {
        Self::NoDestinations {
            endpoint: Some(endpoint),
        }
    }
}

/// Errors raised by the forwarding table.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ForwardingTableError {
    /// A mutation targeted an unknown function or destination.
    #[error("no destinations for function {function}")]
    NoDestinations {
        /// The function name that was looked up.
        function: FunctionName,
    },

    /// An insert-or-update call supplied an empty endpoint or non-positive weight.
    #[error("invalid destination {endpoint} with weight {weight} for function {function}")]
    InvalidDestination {
        /// The function name the destination belongs to.
        function: FunctionName,
        /// The offending endpoint.
        endpoint: Endpoint,
        /// The offending weight.
        weight: f64,
    },

    /// A `change`/`multiply` call supplied a negative weight or non-positive factor.
    #[error("invalid weight {weight} for function {function}")]
    InvalidWeight {
        /// The function the weight was destined for.
        function: FunctionName,
        /// The offending weight.
        weight: f64,
    },

    /// A `multiply` call supplied a non-positive factor.
    #[error("invalid weight factor {factor} for function {function}")]
    InvalidWeightFactor {
        /// The function the factor was destined for.
        function: FunctionName,
        /// The offending factor.
        factor: f64,
    },
}

/// Errors raised while constructing or operating a [`crate::compute::Processor`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProcessorError {
    /// The processor was constructed with an empty name.
    #[error("invalid empty name for a processor")]
    EmptyName,

    /// The processor was constructed with a non-positive speed.
    #[error("invalid non-positive speed for a processor")]
    InvalidSpeed,

    /// The processor was constructed with zero cores.
    #[error("invalid 0 cores for a processor")]
    ZeroCores,

    /// The processor was constructed with zero memory.
    #[error("invalid 0 memory available for a processor")]
    ZeroMemory,

    /// An `allocate` call requested more memory than is available.
    #[error("cannot allocate {requested} bytes, {available} bytes available")]
    InsufficientMemory {
        /// The amount requested.
        requested: u64,
        /// The amount actually available.
        available: u64,
    },

    /// A `free` call released more memory than was allocated.
    #[error("cannot free {requested} bytes, {used} bytes used")]
    OverFree {
        /// The amount requested to be freed.
        requested: u64,
        /// The amount actually in use.
        used: u64,
    },
}

/// Errors raised by container operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ContainerError {
    /// The container was constructed with zero workers.
    #[error("zero workers used for container {name}")]
    ZeroWorkers {
        /// The container name.
        name: String,
    },

    /// A requested lambda's memory requirement exceeds the processor's total memory.
    #[error(
        "container {container} cannot handle request since the memory requirements exceed the total available in the processor: {available} <= {required}"
    )]
    OversizedRequest {
        /// The container name.
        container: String,
        /// The processor's total memory.
        available: u64,
        /// The memory required by the request.
        required: u64,
    },

    /// `pop()` was called with no active tasks.
    #[error("no active tasks")]
    NoActiveTasks,

    /// `advance()` was called with a negative elapsed time.
    #[error("cannot advance a container in the past by {0} s")]
    NegativeElapsed(f64),
}

/// Errors raised while loading or validating a computer's JSON configuration.
#[derive(Debug, Error)]
pub enum ComputerConfigError {
    /// The configuration file could not be read.
    #[error("failed to read computer configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file was not valid JSON or did not match the schema.
    #[error("failed to parse computer configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two processors were declared with the same name.
    #[error("duplicate processor name: {0}")]
    DupProcessorName(String),

    /// Two containers were declared with the same name.
    #[error("duplicate container name: {0}")]
    DupContainerName(String),

    /// Two containers declared the same lambda name.
    #[error("duplicate lambda name: {0}")]
    DupLambdaName(String),

    /// A container referenced a processor that was not declared.
    #[error("no processor found with name: {0}")]
    NoProcessorFound(String),

    /// A request referenced a container that does not exist.
    #[error("no container found with name: {0}")]
    NoContainerFound(String),

    /// Initialization was attempted twice on the same computer.
    #[error("computer initialization already completed")]
    InitDone,

    /// A declared processor or lambda field failed validation.
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Errors raised while loading a hierarchical controller's topology file.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// The topology file could not be read.
    #[error("invalid or non-existing topology file '{0}'")]
    InvalidFile(String),

    /// A node name referenced in a lookup is unknown to the topology.
    #[error("invalid or unknown node '{0}'")]
    InvalidNode(String),

    /// The topology file's rows had inconsistent widths, a non-square
    /// matrix, or a duplicate node name.
    #[error("malformed topology file: {0}")]
    Malformed(String),
}

/// Errors surfaced by the abstract RPC transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer could not be reached, or returned a transport-level failure.
    #[error("transport failure reaching {endpoint}: {message}")]
    Unreachable {
        /// The endpoint that could not be reached.
        endpoint: Endpoint,
        /// A human-readable description of the failure.
        message: String,
    },

    /// The peer was reached but returned an application-level error.
    #[error("remote error from {endpoint}: {message}")]
    Remote {
        /// The endpoint that returned the error.
        endpoint: Endpoint,
        /// The error message returned by the peer.
        message: String,
    },
}

/// Errors surfaced by the router's request-handling path.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The forwarding table had no destination for the requested function.
    #[error("no route for function {0}")]
    NoRoute(FunctionName),

    /// The request body exceeded the router's maximum accepted size.
    #[error("request of {size} bytes exceeds the {limit}-byte limit")]
    OversizedRequest {
        /// The request's actual size, in bytes.
        size: usize,
        /// The configured maximum, in bytes.
        limit: usize,
    },

    /// Forwarding to the chosen destination failed.
    #[error("forwarding failed: {0}")]
    Forwarding(#[from] TransportError),
}

/// Errors surfaced by the controller's installer and server.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// A peer router could not be reached while installing or removing routes.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The hierarchical installer's topology does not contain the requested node.
    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// No routers are registered with the controller.
    #[error("no routers registered")]
    NoRouters,
}

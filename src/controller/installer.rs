//! The controller installer contract: reacting to computer/router join and
//! leave events by pushing forwarding-table updates to known routers.
//!
//! Grounded on `Edge/edgecontroller.h`'s `EdgeControllerInstaller`
//! interface. Modeled as a trait object since flat and hierarchical are
//! two members of a genuinely open family (spec.md §4.6/§4.7 note a
//! hierarchical variant was added after the flat one shipped).

use async_trait::async_trait;

use crate::domain_types::{Endpoint, FunctionName};
use crate::error::ControllerError;

/// A computer's lambda inventory, as announced to the controller.
#[derive(Debug, Clone)]
pub struct ComputerAnnouncement {
    /// The computer's own endpoint.
    pub endpoint: Endpoint,
    /// Every lambda it can execute.
    pub lambdas: Vec<FunctionName>,
    /// The computer's topology node name, used by the hierarchical
    /// installer to score candidate home routers. Ignored by the flat
    /// installer.
    pub node: Option<String>,
}

/// The installer contract implemented by the flat and hierarchical
/// strategies.
#[async_trait]
pub trait ControllerInstaller: std::fmt::Debug + Send + Sync {
    /// A computer announced itself (or updated its lambda inventory).
    async fn announce_computer(&self, announcement: ComputerAnnouncement) -> Result<(), ControllerError>;

    /// A router announced itself, requesting the full current state be
    /// pushed to it. `node` is the router's topology node name, used by
    /// the hierarchical installer; ignored by the flat installer.
    async fn announce_router(&self, endpoint: Endpoint, node: Option<String>) -> Result<(), ControllerError>;

    /// A computer left (or was detected as unreachable).
    async fn remove_computer(&self, endpoint: Endpoint) -> Result<(), ControllerError>;

    /// A router left. The flat installer treats this as a no-op (it holds
    /// no per-router state); the hierarchical installer must forget the
    /// router's subtree.
    async fn remove_router(&self, endpoint: Endpoint) -> Result<(), ControllerError>;
}

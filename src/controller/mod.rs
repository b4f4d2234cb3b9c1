//! The controller role: announces computers' lambda inventories to
//! routers and removes stale routes, via either a flat (every router gets
//! everything) or hierarchical (topology-scored home router) installer.

mod flat;
mod hierarchical;
mod installer;
mod server;
mod state;
mod topology;

pub use flat::FlatInstaller;
pub use hierarchical::{HierarchicalInstaller, Objective};
pub use installer::{ComputerAnnouncement, ControllerInstaller};
pub use server::build_server;
pub use state::ControllerState;
pub use topology::Topology;

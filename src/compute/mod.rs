//! The compute core: processors, containers, and the computer that
//! dispatches lambda invocations across them under a virtual-time model.

mod computer;
mod config;
mod container;
mod lambda;
mod processor;

pub use computer::{run_utilization_collector, Computer, DispatchError};
pub use config::{ComputerConfig, ContainerConfig, LambdaConfig, ProcessorConfig, RequirementConfig};
pub use container::{Container, Task};
pub use lambda::{LambdaDescriptor, OutputType, ProportionalRequirement};
pub use processor::{Processor, ProcessorType};

//! JSON configuration for a computer: its processors, containers, and the
//! lambdas each container executes.
//!
//! Grounded on spec.md §6's computer configuration schema and the
//! teacher's `message_router/config.rs` JSON load pattern.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain_types::{CoreCount, FunctionName, MemoryBytes, OpsPerSecond};
use crate::error::ComputerConfigError;

use super::computer::Computer;
use super::lambda::{LambdaDescriptor, OutputType, ProportionalRequirement};
use super::processor::{Processor, ProcessorType};

/// A declared processor entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// The processor's unique name.
    pub name: String,
    /// CPU or GPU.
    pub kind: ProcessorType,
    /// Per-core operations/second.
    pub speed: f64,
    /// Number of cores.
    pub cores: usize,
    /// Total memory, in bytes.
    pub mem_total: u64,
}

/// A declared container entry, bound to one of the file's processors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// The container's unique name.
    pub name: String,
    /// The name of the processor this container runs on.
    pub processor: String,
    /// The container's worker slot count.
    pub num_workers: usize,
}

/// A declared lambda's resource requirement. Currently only the
/// `"proportional"` kind is supported, matching the original.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RequirementConfig {
    /// Linear scaling of ops/memory with input size.
    Proportional {
        /// Operations-per-input-unit coefficient.
        op_coefficient: f64,
        /// Fixed operation offset.
        op_offset: f64,
        /// Memory-per-input-unit coefficient.
        mem_coefficient: f64,
        /// Fixed memory offset.
        mem_offset: f64,
    },
}

/// A declared lambda entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LambdaConfig {
    /// The lambda's unique name.
    pub name: FunctionName,
    /// The container it runs in.
    pub container: String,
    /// How its resource needs scale with input size.
    pub requirement: RequirementConfig,
    /// The shape of its output.
    pub output_type: OutputType,
}

/// A computer's complete static configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputerConfig {
    /// Every processor this computer exposes.
    pub processors: Vec<ProcessorConfig>,
    /// Every container, bound to one of `processors`.
    pub containers: Vec<ContainerConfig>,
    /// Every lambda, bound to one of `containers`.
    pub lambdas: Vec<LambdaConfig>,
}

impl ComputerConfig {
    /// Load a computer configuration from a JSON file.
    ///
    /// # Errors
    /// Returns [`ComputerConfigError::Io`] if the file cannot be read, or
    /// [`ComputerConfigError::Parse`] if it is not valid JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ComputerConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Apply this configuration to a freshly-constructed [`Computer`],
    /// registering every processor, container, and lambda in declaration
    /// order.
    ///
    /// # Errors
    /// Returns [`ComputerConfigError`] on the first invalid or duplicate
    /// entry, per [`Computer::add_processor`]/[`Computer::add_container`]/
    /// [`Computer::add_lambda`].
    pub async fn apply(&self, computer: &Computer) -> Result<(), ComputerConfigError> {
        for p in &self.processors {
            let speed = OpsPerSecond::try_new(p.speed).map_err(|e| ComputerConfigError::InvalidValue(e.to_string()))?;
            let cores = CoreCount::try_new(p.cores).map_err(|e| ComputerConfigError::InvalidValue(e.to_string()))?;
            let mem_total = MemoryBytes::from(p.mem_total);
            let processor = Processor::new(p.name.clone(), p.kind, speed, cores, mem_total)
                .map_err(|e| ComputerConfigError::InvalidValue(e.to_string()))?;
            computer.add_processor(p.name.clone(), processor).await?;
        }
        for c in &self.containers {
            computer
                .add_container(c.name.clone(), c.processor.clone(), c.num_workers)
                .await?;
        }
        for l in &self.lambdas {
            let requirement = match l.requirement {
                RequirementConfig::Proportional {
                    op_coefficient,
                    op_offset,
                    mem_coefficient,
                    mem_offset,
                } => ProportionalRequirement::new(op_coefficient, op_offset, mem_coefficient, mem_offset),
            };
            let descriptor = LambdaDescriptor::new(l.name.clone(), l.container.clone(), requirement, l.output_type);
            computer.add_lambda(descriptor).await?;
        }
        Ok(())
    }
}

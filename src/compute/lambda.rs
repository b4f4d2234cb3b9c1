//! Lambda resource-requirement descriptors.
//!
//! Grounded on `Edge/lambda.{h,cpp}` and the computer JSON config's
//! `"proportional"` requirement kind: a lambda's memory and operation
//! requirements scale linearly with its input size.

use serde::{Deserialize, Serialize};

use crate::domain_types::FunctionName;

/// How a lambda's resource requirements scale with the request's input
/// size (currently the only kind the original supports: linear
/// coefficients plus a fixed offset).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProportionalRequirement {
    op_coefficient: f64,
    op_offset: f64,
    mem_coefficient: f64,
    mem_offset: f64,
}

impl ProportionalRequirement {
    /// Construct a proportional requirement from its four coefficients.
    #[must_use]
    pub fn new(op_coefficient: f64, op_offset: f64, mem_coefficient: f64, mem_offset: f64) -> Self {
        Self {
            op_coefficient,
            op_offset,
            mem_coefficient,
            mem_offset,
        }
    }

    /// Operations required to process `input_size` units of input.
    #[must_use]
    pub fn ops(&self, input_size: u64) -> u64 {
        (self.op_offset + self.op_coefficient * input_size as f64).max(0.0) as u64
    }

    /// Memory, in bytes, required to process `input_size` units of input.
    #[must_use]
    pub fn mem(&self, input_size: u64) -> u64 {
        (self.mem_offset + self.mem_coefficient * input_size as f64).max(0.0) as u64
    }
}

/// The kind of value a lambda's output carries, used by the dispatcher to
/// decide how to encode the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputType {
    /// Opaque bytes, passed through unmodified.
    Bytes,
    /// A UTF-8 string.
    Text,
    /// A JSON value.
    Json,
}

/// A lambda's static descriptor: its name, the container it executes in,
/// and how its resource needs scale with input size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LambdaDescriptor {
    name: FunctionName,
    container: String,
    requirement: ProportionalRequirement,
    output_type: OutputType,
}

impl LambdaDescriptor {
    /// Construct a new lambda descriptor.
    #[must_use]
    pub fn new(
        name: FunctionName,
        container: impl Into<String>,
        requirement: ProportionalRequirement,
        output_type: OutputType,
    ) -> Self {
        Self {
            name,
            container: container.into(),
            requirement,
            output_type,
        }
    }

    /// The lambda's name.
    #[must_use]
    pub fn name(&self) -> &FunctionName {
        &self.name
    }

    /// The name of the container this lambda runs in.
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// The lambda's resource-scaling requirement.
    #[must_use]
    pub fn requirement(&self) -> ProportionalRequirement {
        self.requirement
    }

    /// The lambda's declared output type.
    #[must_use]
    pub fn output_type(&self) -> OutputType {
        self.output_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proportional_requirement_scales_linearly() {
        let req = ProportionalRequirement::new(2.0, 10.0, 4.0, 1024.0);
        assert_eq!(req.ops(0), 10);
        assert_eq!(req.ops(100), 210);
        assert_eq!(req.mem(0), 1024);
        assert_eq!(req.mem(100), 1424);
    }
}

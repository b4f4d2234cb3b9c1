//! Strongly-typed domain primitives shared across the scheduling, forwarding,
//! compute, and controller layers.
//!
//! These replace bare `String`/`f64`/`u64` at API boundaries with
//! validated newtypes so that e.g. a non-positive weight or an empty
//! endpoint cannot be constructed in the first place.

use nutype::nutype;

/// A destination endpoint, conventionally `host:port`. Must be non-empty.
#[nutype(
    sanitize(trim),
    validate(not_empty),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        Display,
        AsRef,
        TryFrom
    )
)]
pub struct Endpoint(String);

/// The name of a lambda function, used as a forwarding-table key.
#[nutype(
    sanitize(trim),
    validate(not_empty),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        Display,
        AsRef,
        TryFrom
    )
)]
pub struct FunctionName(String);

/// A positive destination weight. Lower or higher is "preferred" depending
/// on the scheduling policy; see the scheduling entry implementations.
#[nutype(
    validate(predicate = |w| w.is_finite() && *w > 0.0),
    derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TryFrom)
)]
pub struct Weight(f64);

impl Weight {
    /// Returns the underlying value as `f64`.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        self.into_inner()
    }
}

/// A non-negative multiplicative factor applied to an existing weight.
#[nutype(
    validate(predicate = |f| f.is_finite() && *f > 0.0),
    derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TryFrom)
)]
pub struct WeightFactor(f64);

impl WeightFactor {
    /// Returns the underlying value as `f64`.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        self.into_inner()
    }
}

/// A 64-bit task identifier, unique within one computer's lifetime.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
))]
pub struct TaskId(u64);

/// A memory reservation, in bytes.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
))]
pub struct MemoryBytes(u64);

impl MemoryBytes {
    /// Returns the value as `u64`.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.into_inner()
    }
}

/// A count of processor operations.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
))]
pub struct OperationCount(u64);

impl OperationCount {
    /// Returns the value as `u64`.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.into_inner()
    }
}

/// The `alpha` exponent of a `ProportionalFairness` scheduling entry.
#[nutype(
    validate(predicate = |a| a.is_finite() && *a >= 0.0),
    derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TryFrom)
)]
pub struct Alpha(f64);

impl Alpha {
    /// Returns the underlying value as `f64`.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        self.into_inner()
    }
}

/// The `beta` exponent of a `ProportionalFairness` scheduling entry.
#[nutype(
    validate(predicate = |b| b.is_finite() && *b >= 0.0),
    derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TryFrom)
)]
pub struct Beta(f64);

impl Beta {
    /// Returns the underlying value as `f64`.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        self.into_inner()
    }
}

/// Number of cores on a processor. Must be at least 1.
#[nutype(
    validate(greater_or_equal = 1),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        Display,
        TryFrom
    )
)]
pub struct CoreCount(usize);

impl CoreCount {
    /// Returns the value as `usize`.
    #[must_use]
    pub fn as_usize(&self) -> usize {
        self.into_inner()
    }
}

/// Number of worker slots in a container. Must be at least 1.
#[nutype(
    validate(greater_or_equal = 1),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        Display,
        TryFrom
    )
)]
pub struct WorkerCount(usize);

impl WorkerCount {
    /// Returns the value as `usize`.
    #[must_use]
    pub fn as_usize(&self) -> usize {
        self.into_inner()
    }
}

/// Per-core operation rate, in operations per second. Must be positive.
#[nutype(
    validate(predicate = |s| s.is_finite() && *s > 0.0),
    derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TryFrom)
)]
pub struct OpsPerSecond(f64);

impl OpsPerSecond {
    /// Returns the underlying value as `f64`.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        self.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_rejects_empty() {
        assert!(Endpoint::try_new(String::new()).is_err());
        assert!(Endpoint::try_new("  ").is_err());
        assert!(Endpoint::try_new("host:1234").is_ok());
    }

    #[test]
    fn weight_rejects_non_positive() {
        assert!(Weight::try_new(0.0).is_err());
        assert!(Weight::try_new(-1.0).is_err());
        assert!(Weight::try_new(f64::NAN).is_err());
        assert!(Weight::try_new(1.5).is_ok());
    }

    #[test]
    fn core_count_rejects_zero() {
        assert!(CoreCount::try_new(0).is_err());
        assert!(CoreCount::try_new(4).is_ok());
    }
}

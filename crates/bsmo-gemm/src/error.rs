//! Error types for workload compilation

use thiserror::Error;

/// Result type alias for workload compilation.
pub type Result<T> = std::result::Result<T, GemmError>;

/// Errors that can occur while importing operands or building descriptors.
///
/// These cover caller-supplied inputs only. Violations of internal
/// invariants (packer bounds, misaligned padded rows) are programming
/// errors and panic instead.
#[derive(Debug, Error)]
pub enum GemmError {
    /// Operand bit width outside the supported range
    #[error("Unsupported operand width: {bits} bits (supported: 1..=8)")]
    UnsupportedBits {
        /// Requested width
        bits: usize,
    },

    /// Dense slice length does not match the declared shape
    #[error("Dense data has {got} elements, shape {rows}x{cols} needs {expected}")]
    SizeMismatch {
        /// Declared row count
        rows: usize,
        /// Declared column count
        cols: usize,
        /// Expected element count
        expected: usize,
        /// Actual element count
        got: usize,
    },

    /// A matrix dimension is zero
    #[error("Matrix shape {rows}x{cols} has a zero dimension")]
    EmptyShape {
        /// Declared row count
        rows: usize,
        /// Declared column count
        cols: usize,
    },

    /// Element not representable at the declared width
    #[error("Value {value} not representable in {bits} bits (signed: {signed})")]
    ValueOutOfRange {
        /// Offending element
        value: i64,
        /// Declared width
        bits: usize,
        /// Declared signedness
        signed: bool,
    },

    /// Operands disagree on a shared dimension or alignment
    #[error("Workload shape mismatch: {reason}")]
    ShapeMismatch {
        /// Reason for failure
        reason: String,
    },

    /// Workload does not fit the instantiated overlay
    #[error("Workload exceeds overlay capacity: {reason}")]
    CapacityExceeded {
        /// Reason for failure
        reason: String,
    },
}

impl GemmError {
    /// Create a shape mismatch error
    pub fn shape_mismatch(reason: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            reason: reason.into(),
        }
    }

    /// Create a capacity error
    pub fn capacity_exceeded(reason: impl Into<String>) -> Self {
        Self::CapacityExceeded {
            reason: reason.into(),
        }
    }
}

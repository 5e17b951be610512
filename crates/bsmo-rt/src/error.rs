//! Error types for runtime operations

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, RtError>;

/// Errors that can occur in the host runtime.
///
/// Diagnostic mismatches — `compare()` returning `false`, an emulated
/// result differing from an oracle — are advisory return values, never
/// errors. Violations of internal addressing invariants inside the
/// functional model panic instead; the generator and packer are expected
/// to have guaranteed consistent addressing already.
#[derive(Debug, Error)]
pub enum RtError {
    /// Operation needs accelerator storage but the buffer is host-only
    #[error("Buffer '{name}' is host-only, accelerator storage was never allocated")]
    HostOnly {
        /// Buffer name
        name: String,
    },

    /// Write-back attempted on a read-only buffer
    #[error("Buffer '{name}' is read-only for the accelerator, accel2host is not meaningful")]
    ReadOnly {
        /// Buffer name
        name: String,
    },

    /// Shapes or capacities disagree
    #[error("Shape mismatch: {reason}")]
    ShapeMismatch {
        /// Reason for failure
        reason: String,
    },

    /// Result readback before any executed workload
    #[error("No executed workload matches the requested shape ({reason})")]
    NoResult {
        /// Reason for failure
        reason: String,
    },

    /// Workload compilation failed
    #[error("Workload error: {source}")]
    Gemm {
        /// Underlying compilation error
        #[from]
        source: bsmo_gemm::GemmError,
    },
}

impl RtError {
    /// Create a host-only error
    pub fn host_only(name: impl Into<String>) -> Self {
        Self::HostOnly { name: name.into() }
    }

    /// Create a read-only error
    pub fn read_only(name: impl Into<String>) -> Self {
        Self::ReadOnly { name: name.into() }
    }

    /// Create a shape mismatch error
    pub fn shape_mismatch(reason: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            reason: reason.into(),
        }
    }

    /// Create a missing-result error
    pub fn no_result(reason: impl Into<String>) -> Self {
        Self::NoResult {
            reason: reason.into(),
        }
    }
}

//! Backend abstraction for the execution pipeline
//!
//! One trait hides what actually runs the instruction stream. The
//! register/DMA platform driver implements it against real hardware out
//! of tree; [`EmuBackend`](crate::EmuBackend) implements it in software
//! for development, CI, and oracle testing. Workload code is written once
//! against the trait and cannot tell the difference.

use crate::error::{Result, RtError};
use bsmo_gemm::{PeMemories, SingleMmDescriptor};
use bsmo_overlay::{ExecInstr, OverlayGeometry};

/// Tile shape of one executed workload, carried alongside the
/// instruction stream so the backend can size its accumulator and result
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecShape {
    /// Output tiles along the PE-row dimension.
    pub tiles_m: usize,
    /// Output tiles along the PE-column dimension.
    pub tiles_n: usize,
    /// Result buffers the finalize instructions cycle through.
    pub nbufs_res: usize,
}

impl ExecShape {
    /// The shape a descriptor's generated stream expects.
    #[must_use]
    pub const fn of(dsc: &SingleMmDescriptor) -> Self {
        Self {
            tiles_m: dsc.tiles_m,
            tiles_n: dsc.tiles_n,
            nbufs_res: dsc.nbufs_res,
        }
    }

    /// Total output tiles.
    #[must_use]
    pub const fn tiles(&self) -> usize {
        self.tiles_m * self.tiles_n
    }
}

/// Backend flavor, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Software functional model.
    Emulated,
    /// Physical overlay behind the platform driver.
    Hardware,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Emulated => write!(f, "Emulated"),
            Self::Hardware => write!(f, "Hardware"),
        }
    }
}

/// Unified interface to whatever executes the instruction stream.
pub trait OverlayBackend {
    /// Geometry of the overlay this backend drives.
    fn geometry(&self) -> &OverlayGeometry;

    /// Backend flavor for diagnostics.
    fn backend_kind(&self) -> BackendKind;

    /// Load packed left-operand PE memories.
    ///
    /// # Errors
    ///
    /// Returns an error if the memories do not match the overlay's
    /// left-operand dimension or capacity.
    fn write_lhs(&mut self, mems: &PeMemories) -> Result<()>;

    /// Load packed right-operand PE memories.
    ///
    /// # Errors
    ///
    /// Returns an error if the memories do not match the overlay's
    /// right-operand dimension or capacity.
    fn write_rhs(&mut self, mems: &PeMemories) -> Result<()>;

    /// Run an instruction stream to completion, in strict emission order.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream does not fit `shape`.
    fn execute(&mut self, instrs: &[ExecInstr], shape: &ExecShape) -> Result<()>;

    /// Assemble the finalized result, row-major over the padded output
    /// shape `(tiles_m * pe_rows) × (tiles_n * pe_cols)`.
    ///
    /// # Errors
    ///
    /// Returns an error if no executed workload matches `shape`.
    fn read_result(&self, shape: &ExecShape) -> Result<Vec<i64>>;
}

/// Validate packed memories against one PE dimension of the overlay.
pub(crate) fn check_mems(
    mems: &PeMemories,
    pe_dim: usize,
    mem_words: usize,
    side: &str,
) -> Result<()> {
    if mems.pe_count() != pe_dim {
        return Err(RtError::shape_mismatch(format!(
            "{side} memories packed for {} PEs, overlay has {pe_dim}",
            mems.pe_count()
        )));
    }
    if mems.mem_words() != mem_words {
        return Err(RtError::shape_mismatch(format!(
            "{side} memories sized {} words, overlay holds {mem_words}",
            mems.mem_words()
        )));
    }
    Ok(())
}

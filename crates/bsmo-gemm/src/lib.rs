//! Workload compilation for the bit-serial matmul overlay.
//!
//! Turns a dense integer matrix-multiply job into the three artifacts the
//! overlay consumes:
//!
//! 1. [`BitSerialMatrix`] — the operand decomposed into ordered bit planes,
//!    padded to the overlay's row and column alignment.
//! 2. [`PeMemories`] — those planes distributed across the per-PE operand
//!    memories, rows interleaved so each PE owns a disjoint subset.
//! 3. An ordered [`ExecInstr`](bsmo_overlay::ExecInstr) stream compiled
//!    from a [`SingleMmDescriptor`], driving every (plane, plane, tile)
//!    combination with the correct power-of-two weighting.
//!
//! The packer's memory layout and the generator's offsets agree by
//! construction; both are parameterized on the same
//! [`OverlayGeometry`](bsmo_overlay::OverlayGeometry).
//!
//! # Example
//!
//! ```
//! use bsmo_gemm::{BitSerialMatrix, SingleMmDescriptor, gen_single_mm, pack_matrix};
//! use bsmo_overlay::OverlayGeometry;
//!
//! # fn main() -> bsmo_gemm::Result<()> {
//! let geom = OverlayGeometry::EMU_SMALL;
//! let lhs = BitSerialMatrix::from_dense(&[1, 2, 3, 0], 2, 2, 2, false, geom.pe_rows)?;
//! let rhs = BitSerialMatrix::from_dense(&[3, 1, 0, 2], 2, 2, 2, false, geom.pe_cols)?;
//!
//! let lhs_mem = pack_matrix(&lhs, geom.pe_rows, 0, geom.lhs_mem_words);
//! let rhs_mem = pack_matrix(&rhs, geom.pe_cols, 0, geom.rhs_mem_words);
//!
//! let dsc = SingleMmDescriptor::for_workload(&geom, &lhs, &rhs)?;
//! let instrs = gen_single_mm(&dsc);
//! assert_eq!(instrs.len(), dsc.instr_count());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

mod bitserial;
mod error;
mod instrgen;
mod packer;

pub use bitserial::BitSerialMatrix;
pub use error::{GemmError, Result};
pub use instrgen::{gen_single_mm, SingleMmDescriptor};
pub use packer::{pack_into, pack_matrix, PeMemories};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        gen_single_mm, pack_matrix, BitSerialMatrix, GemmError, PeMemories, Result,
        SingleMmDescriptor,
    };
}

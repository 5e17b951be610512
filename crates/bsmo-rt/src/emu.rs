// SPDX-License-Identifier: AGPL-3.0-only

//! Functional execution model
//!
//! Reproduces the execution pipeline's arithmetic word-for-word in
//! software: per instruction, every PE `(i, j)` ANDs `num_tiles` word
//! pairs from its operand memories, popcounts them, optionally negates,
//! shifts by the instruction's significance weight, and accumulates into
//! the current output tile. A finalize instruction promotes the tile's
//! accumulator block into the selected result buffer and advances to the
//! next tile.
//!
//! Two roles:
//!
//! 1. **Oracle** — validates the instruction generator against a dense
//!    reference product without hardware present.
//! 2. **Stand-in** — a drop-in [`OverlayBackend`] for development and CI
//!    when no bitfile is loaded.
//!
//! Addressing here was already guaranteed consistent by the packer and
//! generator, so an out-of-range operand offset, result buffer, or tile
//! cursor is a programming error: the model panics rather than returning.
//!
//! Result lanes are held the way the hardware result memory orders them —
//! column-major within a tile, `[pe_col][pe_row]` — and
//! [`read_result`](EmuBackend::read_result) applies the transpose while
//! assembling the row-major output.

use crate::backend::{check_mems, BackendKind, ExecShape, OverlayBackend};
use crate::error::{Result, RtError};
use bsmo_gemm::PeMemories;
use bsmo_overlay::{ExecInstr, OverlayGeometry};

/// Software model of the instantiated overlay.
#[derive(Debug)]
pub struct EmuBackend {
    geom: OverlayGeometry,
    lhs: PeMemories,
    rhs: PeMemories,
    /// In-flight tile accumulators: `tiles` blocks of `pe_cols * pe_rows`
    /// lanes.
    acc: Vec<i64>,
    /// Finalized tiles: `nbufs_res` buffer planes of the same blocks.
    res: Vec<i64>,
    shape: Option<ExecShape>,
    cur_tile: usize,
}

impl EmuBackend {
    /// Model an overlay of the given geometry with zeroed memories.
    #[must_use]
    pub fn new(geom: OverlayGeometry) -> Self {
        Self {
            geom,
            lhs: PeMemories::new(geom.pe_rows, geom.lhs_mem_words),
            rhs: PeMemories::new(geom.pe_cols, geom.rhs_mem_words),
            acc: Vec::new(),
            res: Vec::new(),
            shape: None,
            cur_tile: 0,
        }
    }

    const fn lanes(&self) -> usize {
        self.geom.pe_rows * self.geom.pe_cols
    }

    /// One partial dot product: AND-popcount over a word burst.
    fn burst_popcount(&self, i: usize, j: usize, instr: &ExecInstr) -> i64 {
        let mut dot = 0i64;
        for t in 0..instr.num_tiles as usize {
            let l = self.lhs.word(i, instr.lhs_offset as usize + t);
            let r = self.rhs.word(j, instr.rhs_offset as usize + t);
            dot += i64::from((l & r).count_ones());
        }
        dot
    }
}

impl OverlayBackend for EmuBackend {
    fn geometry(&self) -> &OverlayGeometry {
        &self.geom
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::Emulated
    }

    fn write_lhs(&mut self, mems: &PeMemories) -> Result<()> {
        check_mems(mems, self.geom.pe_rows, self.geom.lhs_mem_words, "lhs")?;
        self.lhs = mems.clone();
        Ok(())
    }

    fn write_rhs(&mut self, mems: &PeMemories) -> Result<()> {
        check_mems(mems, self.geom.pe_cols, self.geom.rhs_mem_words, "rhs")?;
        self.rhs = mems.clone();
        Ok(())
    }

    fn execute(&mut self, instrs: &[ExecInstr], shape: &ExecShape) -> Result<()> {
        if shape.tiles() == 0 || shape.nbufs_res == 0 {
            return Err(RtError::shape_mismatch(format!(
                "degenerate execution shape {}x{} tiles, {} result buffers",
                shape.tiles_m, shape.tiles_n, shape.nbufs_res
            )));
        }
        let lanes = self.lanes();
        self.acc = vec![0; shape.tiles() * lanes];
        self.res = vec![0; shape.nbufs_res * shape.tiles() * lanes];
        self.shape = Some(*shape);
        self.cur_tile = 0;

        for instr in instrs {
            // instructions for a tile are contiguous; the cursor advances
            // on each finalize
            assert!(
                self.cur_tile < shape.tiles(),
                "instruction stream continues past the last tile"
            );
            let acc_base = self.cur_tile * lanes;
            if instr.clear_acc {
                self.acc[acc_base..acc_base + lanes].fill(0);
            }
            for i in 0..self.geom.pe_rows {
                for j in 0..self.geom.pe_cols {
                    let mut dot = self.burst_popcount(i, j, instr);
                    if instr.negate {
                        dot = -dot;
                    }
                    // result-memory lane order: column-major within a tile
                    self.acc[acc_base + j * self.geom.pe_rows + i] += dot << instr.shift;
                }
            }
            if instr.write_en {
                let buf = instr.write_addr as usize;
                assert!(
                    buf < shape.nbufs_res,
                    "finalize addresses result buffer {buf}, overlay has {}",
                    shape.nbufs_res
                );
                let dst = (buf * shape.tiles() + self.cur_tile) * lanes;
                self.res[dst..dst + lanes]
                    .copy_from_slice(&self.acc[acc_base..acc_base + lanes]);
                self.cur_tile += 1;
            }
        }

        tracing::debug!(
            "executed {} instructions, {} of {} tiles finalized",
            instrs.len(),
            self.cur_tile,
            shape.tiles()
        );
        Ok(())
    }

    /// Assemble the row-major padded result.
    ///
    /// Assumes the generator's round-robin result-buffer assignment
    /// (tile `t` in buffer `t % nbufs_res`).
    fn read_result(&self, shape: &ExecShape) -> Result<Vec<i64>> {
        if self.shape != Some(*shape) {
            return Err(RtError::no_result(format!(
                "want {}x{} tiles, executed {:?}",
                shape.tiles_m, shape.tiles_n, self.shape
            )));
        }
        let lanes = self.lanes();
        let rows = shape.tiles_m * self.geom.pe_rows;
        let cols = shape.tiles_n * self.geom.pe_cols;
        let mut out = vec![0i64; rows * cols];
        for m in 0..shape.tiles_m {
            for n in 0..shape.tiles_n {
                let tile = m * shape.tiles_n + n;
                let buf = tile % shape.nbufs_res;
                let src = (buf * shape.tiles() + tile) * lanes;
                // transpose the column-major tile block into row-major
                for i in 0..self.geom.pe_rows {
                    for j in 0..self.geom.pe_cols {
                        let row = m * self.geom.pe_rows + i;
                        let col = n * self.geom.pe_cols + j;
                        out[row * cols + col] = self.res[src + j * self.geom.pe_rows + i];
                    }
                }
            }
        }
        Ok(out)
    }
}

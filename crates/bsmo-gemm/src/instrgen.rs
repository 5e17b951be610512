//! Instruction generator
//!
//! Compiles a [`SingleMmDescriptor`] — the declarative description of one
//! tiled bit-serial matrix multiply — into the ordered instruction stream
//! that drives the execution pipeline.
//!
//! Output tiles are emitted in row-major order. Within a tile, every
//! left/right plane pair `(pl, pr)` contributes one burst weighted by
//! `2^(pl + pr)`, negated when exactly one of the planes is a signed
//! most-significant plane. The first burst of a tile clears the
//! accumulator, the last carries the finalize flag and the tile's result
//! buffer, assigned round-robin over `nbufs_res`.
//!
//! Operand offsets address the plane-major layout produced by
//! [`pack_into`](crate::pack_into); generator and packer must be driven
//! from the same geometry and base pointers.

use crate::bitserial::BitSerialMatrix;
use crate::error::{GemmError, Result};
use bsmo_overlay::{ExecInstr, OverlayGeometry};

/// Declarative description of one tiled bit-serial matrix multiply.
///
/// Immutable once constructed; consumed once by [`gen_single_mm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleMmDescriptor {
    /// Output tiles along the left-operand row dimension.
    pub tiles_m: usize,
    /// Burst length: words per plane row (the shared dimension).
    pub tiles_k: usize,
    /// Output tiles along the right-operand row dimension.
    pub tiles_n: usize,
    /// Left operand bit planes.
    pub bits_l: usize,
    /// Right operand bit planes.
    pub bits_r: usize,
    /// Left operand signedness.
    pub signed_l: bool,
    /// Right operand signedness.
    pub signed_r: bool,
    /// Base word offset of the left operand in each PE memory.
    pub base_l: usize,
    /// Base word offset of the right operand in each PE memory.
    pub base_r: usize,
    /// Base result-buffer address.
    pub base_res: usize,
    /// Concurrent result buffers cycled by finalize instructions.
    pub nbufs_res: usize,
}

impl SingleMmDescriptor {
    /// Derive a descriptor for two imported operands, packed at offset 0.
    ///
    /// Tile counts come from the operands' padded shapes; result buffers
    /// from the geometry.
    ///
    /// # Errors
    ///
    /// Returns an error if the operands disagree on the shared dimension,
    /// were padded for a different PE dimension, or do not fit the
    /// overlay's PE memories.
    pub fn for_workload(
        geom: &OverlayGeometry,
        lhs: &BitSerialMatrix,
        rhs: &BitSerialMatrix,
    ) -> Result<Self> {
        if lhs.cols_a() != rhs.cols_a() {
            return Err(GemmError::shape_mismatch(format!(
                "shared dimension differs: lhs {} vs rhs {} (padded)",
                lhs.cols_a(),
                rhs.cols_a()
            )));
        }
        if lhs.rows_a() % geom.pe_rows != 0 {
            return Err(GemmError::shape_mismatch(format!(
                "lhs padded rows {} not aligned to {} PE rows",
                lhs.rows_a(),
                geom.pe_rows
            )));
        }
        if rhs.rows_a() % geom.pe_cols != 0 {
            return Err(GemmError::shape_mismatch(format!(
                "rhs padded rows {} not aligned to {} PE columns",
                rhs.rows_a(),
                geom.pe_cols
            )));
        }

        let dsc = Self {
            tiles_m: lhs.rows_a() / geom.pe_rows,
            tiles_k: lhs.words_per_row(),
            tiles_n: rhs.rows_a() / geom.pe_cols,
            bits_l: lhs.bits(),
            bits_r: rhs.bits(),
            signed_l: lhs.is_signed(),
            signed_r: rhs.is_signed(),
            base_l: 0,
            base_r: 0,
            base_res: 0,
            nbufs_res: geom.res_bufs,
        };

        let lhs_need = dsc.base_l + dsc.tiles_k * dsc.bits_l * dsc.tiles_m;
        if lhs_need > geom.lhs_mem_words {
            return Err(GemmError::capacity_exceeded(format!(
                "lhs needs {lhs_need} words per PE, memory holds {}",
                geom.lhs_mem_words
            )));
        }
        let rhs_need = dsc.base_r + dsc.tiles_k * dsc.bits_r * dsc.tiles_n;
        if rhs_need > geom.rhs_mem_words {
            return Err(GemmError::capacity_exceeded(format!(
                "rhs needs {rhs_need} words per PE, memory holds {}",
                geom.rhs_mem_words
            )));
        }

        Ok(dsc)
    }

    /// Instructions [`gen_single_mm`] will emit for this descriptor.
    pub const fn instr_count(&self) -> usize {
        self.tiles_m * self.tiles_n * self.bits_l * self.bits_r
    }
}

/// Compile a descriptor into its ordered instruction stream.
///
/// A descriptor with zero planes on either side yields an empty stream —
/// no accumulation is possible. All-ones tile counts yield the minimal
/// `bits_l * bits_r` single-tile sequence.
///
/// # Panics
///
/// Panics if `nbufs_res` is zero while instructions are emitted: a
/// finalize instruction needs a buffer to promote into.
#[must_use]
pub fn gen_single_mm(dsc: &SingleMmDescriptor) -> Vec<ExecInstr> {
    if dsc.bits_l == 0 || dsc.bits_r == 0 {
        return Vec::new();
    }
    assert!(dsc.nbufs_res > 0, "no result buffers to finalize into");

    let mut instrs = Vec::with_capacity(dsc.instr_count());
    for m in 0..dsc.tiles_m {
        for n in 0..dsc.tiles_n {
            let tile = m * dsc.tiles_n + n;
            for pl in 0..dsc.bits_l {
                for pr in 0..dsc.bits_r {
                    let first = pl == 0 && pr == 0;
                    let last = pl == dsc.bits_l - 1 && pr == dsc.bits_r - 1;
                    let neg_l = dsc.signed_l && pl == dsc.bits_l - 1;
                    let neg_r = dsc.signed_r && pr == dsc.bits_r - 1;
                    #[allow(clippy::cast_possible_truncation)]
                    instrs.push(ExecInstr {
                        lhs_offset: (dsc.base_l + dsc.tiles_k * (pl * dsc.tiles_m + m)) as u32,
                        rhs_offset: (dsc.base_r + dsc.tiles_k * (pr * dsc.tiles_n + n)) as u32,
                        num_tiles: dsc.tiles_k as u32,
                        shift: (pl + pr) as u8,
                        negate: neg_l != neg_r,
                        clear_acc: first,
                        write_en: last,
                        write_addr: (dsc.base_res + tile % dsc.nbufs_res) as u32,
                    });
                }
            }
        }
    }

    tracing::debug!(
        "generated {} instructions for {}x{}x{} tiles at {}x{} bits",
        instrs.len(),
        dsc.tiles_m,
        dsc.tiles_k,
        dsc.tiles_n,
        dsc.bits_l,
        dsc.bits_r
    );
    instrs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_tile(bits_l: usize, bits_r: usize, signed_l: bool, signed_r: bool) -> SingleMmDescriptor {
        SingleMmDescriptor {
            tiles_m: 1,
            tiles_k: 1,
            tiles_n: 1,
            bits_l,
            bits_r,
            signed_l,
            signed_r,
            base_l: 0,
            base_r: 0,
            base_res: 0,
            nbufs_res: 1,
        }
    }

    #[test]
    fn minimal_single_tile_sequence() {
        let dsc = single_tile(2, 3, false, false);
        let instrs = gen_single_mm(&dsc);
        assert_eq!(instrs.len(), 6);
        // shift walks pl + pr in pair order
        let shifts: Vec<u8> = instrs.iter().map(|i| i.shift).collect();
        assert_eq!(shifts, vec![0, 1, 2, 1, 2, 3]);
        // accumulator cleared once, finalized once
        assert!(instrs[0].clear_acc);
        assert!(instrs.iter().skip(1).all(|i| !i.clear_acc));
        assert!(instrs[5].write_en);
        assert!(instrs.iter().take(5).all(|i| !i.write_en));
        assert_eq!(instrs[5].write_addr, 0);
        // every burst covers the whole shared dimension
        assert!(instrs.iter().all(|i| i.num_tiles == 1));
    }

    #[test]
    fn sign_planes_negate_exactly_once() {
        let dsc = single_tile(2, 2, true, true);
        let instrs = gen_single_mm(&dsc);
        // pairs in order: (0,0) (0,1) (1,0) (1,1)
        let negates: Vec<bool> = instrs.iter().map(|i| i.negate).collect();
        assert_eq!(negates, vec![false, true, true, false]);
    }

    #[test]
    fn zero_width_operand_yields_empty_stream() {
        assert!(gen_single_mm(&single_tile(0, 3, false, false)).is_empty());
        assert!(gen_single_mm(&single_tile(2, 0, false, false)).is_empty());
    }

    #[test]
    fn offsets_address_plane_major_layout() {
        let dsc = SingleMmDescriptor {
            tiles_m: 3,
            tiles_k: 2,
            tiles_n: 2,
            bits_l: 2,
            bits_r: 1,
            signed_l: false,
            signed_r: false,
            base_l: 4,
            base_r: 8,
            base_res: 0,
            nbufs_res: 2,
        };
        let instrs = gen_single_mm(&dsc);
        assert_eq!(instrs.len(), dsc.instr_count());
        for (idx, i) in instrs.iter().enumerate() {
            let tile = idx / (dsc.bits_l * dsc.bits_r);
            let (m, n) = (tile / dsc.tiles_n, tile % dsc.tiles_n);
            let pair = idx % (dsc.bits_l * dsc.bits_r);
            let (pl, pr) = (pair / dsc.bits_r, pair % dsc.bits_r);
            assert_eq!(
                i.lhs_offset as usize,
                dsc.base_l + dsc.tiles_k * (pl * dsc.tiles_m + m)
            );
            assert_eq!(
                i.rhs_offset as usize,
                dsc.base_r + dsc.tiles_k * (pr * dsc.tiles_n + n)
            );
            // result buffers alternate round-robin over tiles
            if i.write_en {
                assert_eq!(i.write_addr as usize, tile % 2);
            }
        }
    }
}

//! Execution instruction record and wire encoding.
//!
//! One instruction drives one accumulation burst: every PE reads
//! `num_tiles` consecutive words from each operand memory, AND-popcounts
//! the pairs, weights the partial sum by `2^shift` (negated for the signed
//! most-significant plane), and adds it into the current tile accumulator.
//! `write_en` marks the last burst of a tile and promotes the accumulator
//! into result buffer `write_addr`.
//!
//! Instructions are totally ordered. The order defines the accumulation
//! sequence and the pipeline timing; no consumer may reorder them.
//!
//! ## Wire format
//!
//! One instruction packs into a 128-bit little-endian word:
//!
//! | Bits | Field |
//! |------|-------|
//! | 0..16 | `lhs_offset` |
//! | 16..32 | `rhs_offset` |
//! | 32..48 | `num_tiles` |
//! | 48..56 | `shift` |
//! | 56 | `negate` |
//! | 57 | `clear_acc` |
//! | 58 | `write_en` |
//! | 64..80 | `write_addr` |
//!
//! Bits 59..64 and 80..128 are reserved and read back as zero.

/// Field widths of the packed encoding, in bits.
pub mod field {
    /// Operand memory offsets.
    pub const OFFSET_BITS: u32 = 16;
    /// Burst length.
    pub const NUM_TILES_BITS: u32 = 16;
    /// Accumulation shift amount.
    pub const SHIFT_BITS: u32 = 8;
    /// Result buffer selector.
    pub const WRITE_ADDR_BITS: u32 = 16;
}

/// Size of one packed instruction on the wire, in bytes.
pub const INSTR_BYTES: usize = 16;

/// One execution-pipeline instruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecInstr {
    /// Word offset into each left-operand PE memory.
    pub lhs_offset: u32,
    /// Word offset into each right-operand PE memory.
    pub rhs_offset: u32,
    /// Consecutive word pairs to AND-popcount in this burst.
    pub num_tiles: u32,
    /// Left shift applied to the partial sum before accumulation
    /// (the combined significance of the two bit planes).
    pub shift: u8,
    /// Negate the partial sum (exactly one operand plane is a signed
    /// most-significant plane).
    pub negate: bool,
    /// Zero the tile accumulator before this burst accumulates.
    pub clear_acc: bool,
    /// Finalize: promote the tile accumulator to a result buffer after
    /// this burst.
    pub write_en: bool,
    /// Result buffer receiving the finalized tile. Ignored unless
    /// `write_en` is set.
    pub write_addr: u32,
}

impl ExecInstr {
    /// Pack into the 128-bit wire word.
    ///
    /// # Panics
    ///
    /// Panics (debug builds) if a field exceeds its wire width.
    #[must_use]
    pub fn pack(&self) -> u128 {
        debug_assert!(self.lhs_offset < 1 << field::OFFSET_BITS);
        debug_assert!(self.rhs_offset < 1 << field::OFFSET_BITS);
        debug_assert!(self.num_tiles < 1 << field::NUM_TILES_BITS);
        debug_assert!(self.write_addr < 1 << field::WRITE_ADDR_BITS);

        u128::from(self.lhs_offset)
            | u128::from(self.rhs_offset) << 16
            | u128::from(self.num_tiles) << 32
            | u128::from(self.shift) << 48
            | u128::from(self.negate) << 56
            | u128::from(self.clear_acc) << 57
            | u128::from(self.write_en) << 58
            | u128::from(self.write_addr) << 64
    }

    /// Decode a 128-bit wire word. Reserved bits are ignored.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn unpack(raw: u128) -> Self {
        Self {
            lhs_offset: (raw & 0xffff) as u32,
            rhs_offset: (raw >> 16 & 0xffff) as u32,
            num_tiles: (raw >> 32 & 0xffff) as u32,
            shift: (raw >> 48 & 0xff) as u8,
            negate: raw >> 56 & 1 == 1,
            clear_acc: raw >> 57 & 1 == 1,
            write_en: raw >> 58 & 1 == 1,
            write_addr: (raw >> 64 & 0xffff) as u32,
        }
    }
}

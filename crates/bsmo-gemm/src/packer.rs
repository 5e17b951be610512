//! PE memory packer
//!
//! Distributes a bit-serial matrix across the private operand memories of
//! a PE dimension. Row `r` belongs to PE `r % pe_count`, so the PEs work
//! disjoint interleaved row subsets in parallel; planes are written
//! outermost so the pipeline sees progressive significance.
//!
//! Within one PE memory the resulting layout is
//!
//! ```text
//! addr = base + words_per_row * (plane * rows_per_pe + row_slot) + word_col
//! ```
//!
//! with `rows_per_pe = rows_a / pe_count` and `row_slot = row / pe_count`.
//! The instruction generator's operand offsets address exactly this
//! layout.
//!
//! Packing preconditions are guaranteed by upstream tiling logic, so
//! violations here are programming errors and abort rather than return.

use crate::bitserial::BitSerialMatrix;

/// A flat array of `pe_count` independent PE operand memories.
///
/// PE memories may be refilled by a later packing pass for a new
/// workload; words written by a previous pass are simply overwritten.
#[derive(Debug, Clone)]
pub struct PeMemories {
    pe_count: usize,
    mem_words: usize,
    words: Vec<u64>,
}

impl PeMemories {
    /// Allocate `pe_count` zero-filled memories of `mem_words` words each.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    #[must_use]
    pub fn new(pe_count: usize, mem_words: usize) -> Self {
        assert!(pe_count > 0, "PE count must be nonzero");
        assert!(mem_words > 0, "PE memory capacity must be nonzero");
        Self {
            pe_count,
            mem_words,
            words: vec![0; pe_count * mem_words],
        }
    }

    /// Number of independent PE memories.
    pub const fn pe_count(&self) -> usize {
        self.pe_count
    }

    /// Word capacity of each PE memory.
    pub const fn mem_words(&self) -> usize {
        self.mem_words
    }

    /// One word of one PE memory.
    ///
    /// # Panics
    ///
    /// Panics if `pe` or `addr` is out of range.
    pub fn word(&self, pe: usize, addr: usize) -> u64 {
        assert!(pe < self.pe_count, "PE {pe} out of {}", self.pe_count);
        assert!(addr < self.mem_words, "addr {addr} out of {}", self.mem_words);
        self.words[pe * self.mem_words + addr]
    }

    /// The flat backing storage, `pe * mem_words + addr` indexed.
    pub fn as_words(&self) -> &[u64] {
        &self.words
    }

    fn write(&mut self, pe: usize, addr: usize, word: u64) {
        self.words[pe * self.mem_words + addr] = word;
    }
}

/// Pack a bit-serial matrix into freshly allocated PE memories.
///
/// Convenience over [`PeMemories::new`] + [`pack_into`].
///
/// # Panics
///
/// Same conditions as [`pack_into`].
#[must_use]
pub fn pack_matrix(
    matrix: &BitSerialMatrix,
    pe_count: usize,
    base_ptr: usize,
    mem_words: usize,
) -> PeMemories {
    let mut mem = PeMemories::new(pe_count, mem_words);
    pack_into(matrix, base_ptr, &mut mem);
    mem
}

/// Pack a bit-serial matrix into existing PE memories, starting each PE's
/// write pointer at `base_ptr`. Returns the number of words written,
/// always `bits * rows_a * words_per_row`.
///
/// # Panics
///
/// Panics if the padded row count is not divisible by the PE count, or if
/// any PE's write pointer would exceed its memory capacity.
pub fn pack_into(matrix: &BitSerialMatrix, base_ptr: usize, mem: &mut PeMemories) -> usize {
    let pe_count = mem.pe_count();
    assert!(
        matrix.rows_a() % pe_count == 0,
        "padded rows {} not divisible by PE count {pe_count}",
        matrix.rows_a()
    );

    // per-PE running write pointers
    let mut ptrs = vec![base_ptr; pe_count];
    let mut written = 0usize;
    for plane in 0..matrix.bits() {
        for row in 0..matrix.rows_a() {
            for word_col in 0..matrix.words_per_row() {
                let pe = row % pe_count;
                assert!(
                    ptrs[pe] < mem.mem_words(),
                    "PE {pe} memory overrun: addr {} capacity {}",
                    ptrs[pe],
                    mem.mem_words()
                );
                mem.write(pe, ptrs[pe], matrix.word(plane, row, word_col));
                ptrs[pe] += 1;
                written += 1;
            }
        }
    }

    tracing::debug!(
        "packed {written} words into {pe_count} PE memories from base {base_ptr}"
    );
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitserial::BitSerialMatrix;

    fn counting_matrix(bits: usize, rows: usize, cols: usize, row_align: usize) -> BitSerialMatrix {
        #[allow(clippy::cast_possible_wrap)]
        let data: Vec<i64> = (0..rows * cols)
            .map(|i| (i % (1 << bits)) as i64)
            .collect();
        BitSerialMatrix::from_dense(&data, bits, rows, cols, false, row_align).unwrap()
    }

    #[test]
    fn writes_exactly_total_words() {
        let m = counting_matrix(3, 6, 70, 2);
        let mut mem = PeMemories::new(2, 64);
        let written = pack_into(&m, 0, &mut mem);
        assert_eq!(written, m.total_words());
        assert_eq!(written, 3 * m.rows_a() * m.words_per_row());
        // every PE consumed the same share, all within capacity
        assert_eq!(written / 2, m.bits() * (m.rows_a() / 2) * m.words_per_row());
        assert!(written / 2 <= mem.mem_words());
    }

    #[test]
    fn interleaves_rows_plane_major() {
        let m = counting_matrix(2, 4, 64, 2);
        let mem = pack_matrix(&m, 2, 0, 16);
        let wpr = m.words_per_row();
        let rows_per_pe = m.rows_a() / 2;
        for plane in 0..m.bits() {
            for row in 0..m.rows_a() {
                for wc in 0..wpr {
                    let pe = row % 2;
                    let addr = wpr * (plane * rows_per_pe + row / 2) + wc;
                    assert_eq!(mem.word(pe, addr), m.word(plane, row, wc));
                }
            }
        }
    }

    #[test]
    fn base_ptr_offsets_every_pe() {
        let m = counting_matrix(1, 2, 64, 2);
        let mut mem = PeMemories::new(2, 8);
        pack_into(&m, 3, &mut mem);
        assert_eq!(mem.word(0, 3), m.word(0, 0, 0));
        assert_eq!(mem.word(1, 3), m.word(0, 1, 0));
        assert_eq!(mem.word(0, 0), 0);
    }

    #[test]
    #[should_panic(expected = "not divisible by PE count")]
    fn misaligned_rows_abort() {
        // rows_a = 6 against 4 PE memories
        let m = counting_matrix(1, 6, 64, 3);
        let _ = pack_matrix(&m, 4, 0, 64);
    }

    #[test]
    #[should_panic(expected = "memory overrun")]
    fn capacity_overrun_aborts() {
        let m = counting_matrix(4, 8, 64, 2);
        // needs 4 * 4 * 1 = 16 words per PE, capacity is 8
        let _ = pack_matrix(&m, 2, 0, 8);
    }
}

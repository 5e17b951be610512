//! Bit-serial matrix codec
//!
//! Decomposes a dense integer matrix into ordered bit planes. Plane `b`
//! holds bit `b` of every element's two's-complement representation at the
//! declared width; for signed matrices the most significant plane carries
//! negative weight, so an element reconstructs as
//!
//! ```text
//! v = sum(2^b * plane_b)            unsigned
//! v = sum(2^b * plane_b) - 2^bits   signed, MSB plane set
//! ```
//!
//! Rows are padded to the consuming PE dimension and columns to the
//! datapath word width, so every plane row occupies a whole number of
//! words and every PE receives the same row count. Padding is zero and
//! contributes nothing to any dot product.
//!
//! A `BitSerialMatrix` is built once from a dense import and is immutable
//! afterwards.

use crate::error::{GemmError, Result};
use bsmo_overlay::{align_up, WORD_BITS};

/// A dense integer matrix decomposed into ordered bit planes.
#[derive(Debug, Clone)]
pub struct BitSerialMatrix {
    /// Bit planes per element.
    bits: usize,
    /// Logical row count.
    rows: usize,
    /// Logical column count.
    cols: usize,
    /// Row count padded to the PE dimension.
    rows_a: usize,
    /// Column count padded to the datapath word width.
    cols_a: usize,
    /// Whether the most significant plane carries negative weight.
    signed: bool,
    /// Plane-major word storage: `[bits][rows_a][words_per_row]`.
    planes: Vec<u64>,
}

impl BitSerialMatrix {
    /// Decompose a row-major dense matrix.
    ///
    /// `row_align` is the PE dimension that will consume this operand
    /// (PE rows for a left operand, PE columns for a right operand).
    ///
    /// # Errors
    ///
    /// Returns an error if the shape is empty, `bits` is outside `1..=8`,
    /// `data` does not match `rows * cols`, or an element is not
    /// representable at the declared width.
    ///
    /// # Panics
    ///
    /// Panics if `row_align` is zero.
    pub fn from_dense(
        data: &[i64],
        bits: usize,
        rows: usize,
        cols: usize,
        signed: bool,
        row_align: usize,
    ) -> Result<Self> {
        assert!(row_align > 0, "row alignment must be nonzero");
        if rows == 0 || cols == 0 {
            return Err(GemmError::EmptyShape { rows, cols });
        }
        if bits == 0 || bits > 8 {
            return Err(GemmError::UnsupportedBits { bits });
        }
        if data.len() != rows * cols {
            return Err(GemmError::SizeMismatch {
                rows,
                cols,
                expected: rows * cols,
                got: data.len(),
            });
        }

        let (min, max) = if signed {
            (-(1i64 << (bits - 1)), (1i64 << (bits - 1)) - 1)
        } else {
            (0, (1i64 << bits) - 1)
        };

        let rows_a = align_up(rows, row_align);
        let cols_a = align_up(cols, WORD_BITS);
        let words_per_row = cols_a / WORD_BITS;
        let mut planes = vec![0u64; bits * rows_a * words_per_row];

        for r in 0..rows {
            for c in 0..cols {
                let v = data[r * cols + c];
                if v < min || v > max {
                    return Err(GemmError::ValueOutOfRange {
                        value: v,
                        bits,
                        signed,
                    });
                }
                // two's complement at the declared width
                #[allow(clippy::cast_sign_loss)]
                let raw = (v as u64) & ((1u64 << bits) - 1);
                for b in 0..bits {
                    if raw >> b & 1 == 1 {
                        let word =
                            (b * rows_a + r) * words_per_row + c / WORD_BITS;
                        planes[word] |= 1u64 << (c % WORD_BITS);
                    }
                }
            }
        }

        tracing::debug!(
            "imported {rows}x{cols} ({rows_a}x{cols_a} padded) at {bits} bits, signed={signed}"
        );

        Ok(Self {
            bits,
            rows,
            cols,
            rows_a,
            cols_a,
            signed,
            planes,
        })
    }

    /// Bit planes per element.
    pub const fn bits(&self) -> usize {
        self.bits
    }

    /// Logical row count.
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Logical column count.
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Padded row count.
    pub const fn rows_a(&self) -> usize {
        self.rows_a
    }

    /// Padded column count.
    pub const fn cols_a(&self) -> usize {
        self.cols_a
    }

    /// Whether the most significant plane carries negative weight.
    pub const fn is_signed(&self) -> bool {
        self.signed
    }

    /// Words holding one padded row of one plane.
    pub const fn words_per_row(&self) -> usize {
        self.cols_a / WORD_BITS
    }

    /// Total words across all planes: `bits * rows_a * words_per_row()`.
    pub fn total_words(&self) -> usize {
        self.planes.len()
    }

    /// One packed word of plane `plane`, padded row `row`, word column
    /// `word_col`.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of range.
    pub fn word(&self, plane: usize, row: usize, word_col: usize) -> u64 {
        assert!(plane < self.bits, "plane {plane} out of {}", self.bits);
        assert!(row < self.rows_a, "row {row} out of {}", self.rows_a);
        let wpr = self.words_per_row();
        assert!(word_col < wpr, "word {word_col} out of {wpr}");
        self.planes[(plane * self.rows_a + row) * wpr + word_col]
    }

    /// Reconstruct one logical element from its planes.
    ///
    /// # Panics
    ///
    /// Panics if `row` or `col` is outside the padded shape.
    pub fn element(&self, row: usize, col: usize) -> i64 {
        let mut raw = 0i64;
        for b in 0..self.bits {
            let word = self.word(b, row, col / WORD_BITS);
            raw |= ((word >> (col % WORD_BITS) & 1) as i64) << b;
        }
        if self.signed && raw >> (self.bits - 1) & 1 == 1 {
            raw - (1i64 << self.bits)
        } else {
            raw
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_dims_and_word_count() {
        let data = vec![1i64; 5 * 96];
        let m = BitSerialMatrix::from_dense(&data, 3, 5, 96, false, 8).unwrap();
        assert_eq!(m.rows_a(), 8);
        assert_eq!(m.cols_a(), 128);
        assert_eq!(m.words_per_row(), 2);
        assert_eq!(m.total_words(), 3 * 8 * 2);
        // a padded row fills whole words exactly
        assert!(m.words_per_row() * WORD_BITS >= m.cols_a());
    }

    #[test]
    fn unsigned_roundtrip() {
        let data: Vec<i64> = (0..8).collect();
        let m = BitSerialMatrix::from_dense(&data, 3, 2, 4, false, 2).unwrap();
        for r in 0..2 {
            for c in 0..4 {
                assert_eq!(m.element(r, c), data[r * 4 + c]);
            }
        }
    }

    #[test]
    fn signed_roundtrip_covers_corners() {
        // full 3-bit signed range
        let data: Vec<i64> = (-4..4).collect();
        let m = BitSerialMatrix::from_dense(&data, 3, 2, 4, true, 2).unwrap();
        for r in 0..2 {
            for c in 0..4 {
                assert_eq!(m.element(r, c), data[r * 4 + c]);
            }
        }
    }

    #[test]
    fn padding_reads_zero() {
        let m = BitSerialMatrix::from_dense(&[3, 3], 2, 2, 1, false, 8).unwrap();
        assert_eq!(m.rows_a(), 8);
        for r in 2..8 {
            assert_eq!(m.element(r, 0), 0);
        }
        for c in 1..64 {
            assert_eq!(m.element(0, c), 0);
        }
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(matches!(
            BitSerialMatrix::from_dense(&[1], 0, 1, 1, false, 2),
            Err(GemmError::UnsupportedBits { .. })
        ));
        assert!(matches!(
            BitSerialMatrix::from_dense(&[1, 2, 3], 2, 2, 2, false, 2),
            Err(GemmError::SizeMismatch { .. })
        ));
        assert!(matches!(
            BitSerialMatrix::from_dense(&[4], 2, 1, 1, false, 2),
            Err(GemmError::ValueOutOfRange { .. })
        ));
        // -2 needs a sign plane
        assert!(matches!(
            BitSerialMatrix::from_dense(&[-2], 2, 1, 1, false, 2),
            Err(GemmError::ValueOutOfRange { .. })
        ));
    }
}

//! Padded matrix wrapper
//!
//! The overlay works on shapes aligned to its tiling granularity, the
//! caller works on logical shapes. `Matrix<T>` keeps both: a logical
//! host-side `outer × inner` array, and a padded `outer_a × inner_a`
//! [`SharedBuffer`] whose alignment depends on which operand the matrix
//! is ([`MatrixKind`]). The padding region is zero-filled at construction
//! and stays zero across any round trip that does not explicitly write
//! it — padded rows and columns must contribute nothing to a dot product.
//!
//! Element conventions by kind: operand matrices (`Lhs`, `Rhs`) carry
//! narrow unsigned words (`u8`), result matrices carry accumulator-width
//! signed values (`i32`). The right-hand operand is stored pre-transposed
//! (rows are the output columns), as the overlay expects.

use crate::error::{Result, RtError};
use crate::platform::PlatformContext;
use crate::shared_buffer::{BufferFlags, SharedBuffer};
use bsmo_overlay::OverlayGeometry;

/// Which operand slot a matrix occupies; selects padding alignment and
/// element conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixKind {
    /// Left operand: outer dimension aligned to PE rows.
    Lhs,
    /// Right operand (pre-transposed): outer dimension aligned to PE
    /// columns.
    Rhs,
    /// Result: outer aligned to PE rows, inner to PE columns.
    Res,
}

/// A logical matrix with an aligned, padded shared backing buffer.
#[derive(Debug)]
pub struct Matrix<'p, T> {
    kind: MatrixKind,
    outer: usize,
    inner: usize,
    outer_a: usize,
    inner_a: usize,
    host: Vec<T>,
    padded: SharedBuffer<'p, T>,
}

impl<'p, T: Copy + Default + PartialEq> Matrix<'p, T> {
    /// Allocate a matrix of logical shape `outer × inner`, padded per
    /// `kind` against `geom`.
    ///
    /// # Errors
    ///
    /// Returns [`RtError::ShapeMismatch`] for a zero dimension.
    pub fn new(
        ctx: &'p PlatformContext,
        geom: &OverlayGeometry,
        kind: MatrixKind,
        outer: usize,
        inner: usize,
        name: impl Into<String>,
    ) -> Result<Self> {
        if outer == 0 || inner == 0 {
            return Err(RtError::shape_mismatch(format!(
                "matrix shape {outer}x{inner} has a zero dimension"
            )));
        }
        let (outer_a, inner_a) = match kind {
            MatrixKind::Lhs => (geom.lhs_rows_aligned(outer), geom.cols_aligned(inner)),
            MatrixKind::Rhs => (geom.rhs_rows_aligned(outer), geom.cols_aligned(inner)),
            MatrixKind::Res => (geom.lhs_rows_aligned(outer), geom.rhs_rows_aligned(inner)),
        };
        let name = name.into();
        tracing::debug!(
            "matrix '{name}' {kind:?}: {outer}x{inner} logical, {outer_a}x{inner_a} padded"
        );
        let padded = SharedBuffer::new(ctx, outer_a * inner_a, name, BufferFlags::NONE);
        Ok(Self {
            kind,
            outer,
            inner,
            outer_a,
            inner_a,
            host: vec![T::default(); outer * inner],
            padded,
        })
    }

    /// Operand slot of this matrix.
    pub const fn kind(&self) -> MatrixKind {
        self.kind
    }

    /// Logical outer dimension.
    pub const fn outer(&self) -> usize {
        self.outer
    }

    /// Logical inner dimension.
    pub const fn inner(&self) -> usize {
        self.inner
    }

    /// Padded outer dimension.
    pub const fn outer_a(&self) -> usize {
        self.outer_a
    }

    /// Padded inner dimension.
    pub const fn inner_a(&self) -> usize {
        self.inner_a
    }

    /// Logical element count.
    pub const fn elems(&self) -> usize {
        self.outer * self.inner
    }

    /// Padded physical element count.
    pub const fn elems_a(&self) -> usize {
        self.outer_a * self.inner_a
    }

    /// Logical host contents, row-major.
    pub fn host(&self) -> &[T] {
        &self.host
    }

    /// Mutable logical host contents.
    pub fn host_mut(&mut self) -> &mut [T] {
        &mut self.host
    }

    /// The padded host-side storage, row-major over `outer_a × inner_a`.
    pub fn padded_host(&self) -> &[T] {
        self.padded.host()
    }

    /// Bitwise equality of the padded buffer's two views right now.
    ///
    /// # Errors
    ///
    /// Propagates the underlying buffer error.
    pub fn compare(&self) -> Result<bool> {
        self.padded.compare()
    }

    /// Scatter the logical contents into the padded buffer and sync it to
    /// the accelerator view. Padding is left untouched (zero unless
    /// explicitly written).
    ///
    /// # Errors
    ///
    /// Propagates the underlying buffer error.
    pub fn host2accel(&mut self) -> Result<()> {
        let padded = self.padded.host_mut();
        for r in 0..self.outer {
            padded[r * self.inner_a..r * self.inner_a + self.inner]
                .copy_from_slice(&self.host[r * self.inner..(r + 1) * self.inner]);
        }
        self.padded.host2accel()
    }

    /// Sync the accelerator view back and gather the logical region out
    /// of it.
    ///
    /// # Errors
    ///
    /// Propagates the underlying buffer error.
    pub fn accel2host(&mut self) -> Result<()> {
        self.padded.accel2host()?;
        let padded = self.padded.host();
        for r in 0..self.outer {
            self.host[r * self.inner..(r + 1) * self.inner]
                .copy_from_slice(&padded[r * self.inner_a..r * self.inner_a + self.inner]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_selects_alignment() {
        let ctx = PlatformContext::new();
        let geom = OverlayGeometry::REFERENCE;
        let lhs = Matrix::<u8>::new(&ctx, &geom, MatrixKind::Lhs, 5, 96, "l").unwrap();
        assert_eq!((lhs.outer_a(), lhs.inner_a()), (8, 128));
        let rhs = Matrix::<u8>::new(&ctx, &geom, MatrixKind::Rhs, 17, 96, "r").unwrap();
        assert_eq!((rhs.outer_a(), rhs.inner_a()), (24, 128));
        let res = Matrix::<i32>::new(&ctx, &geom, MatrixKind::Res, 5, 17, "o").unwrap();
        assert_eq!((res.outer_a(), res.inner_a()), (8, 24));
        assert_eq!(res.elems(), 85);
        assert_eq!(res.elems_a(), 192);
    }

    #[test]
    fn zero_dimension_is_an_error() {
        let ctx = PlatformContext::new();
        let geom = OverlayGeometry::REFERENCE;
        assert!(matches!(
            Matrix::<u8>::new(&ctx, &geom, MatrixKind::Lhs, 0, 4, "z"),
            Err(RtError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn padding_survives_scatter() {
        let ctx = PlatformContext::new();
        let geom = OverlayGeometry::EMU_SMALL;
        let mut m = Matrix::<u8>::new(&ctx, &geom, MatrixKind::Lhs, 1, 3, "p").unwrap();
        m.host_mut().copy_from_slice(&[1, 2, 3]);
        m.host2accel().unwrap();
        let padded = m.padded_host();
        assert_eq!(&padded[..3], &[1, 2, 3]);
        assert!(padded[3..].iter().all(|&v| v == 0));
    }
}

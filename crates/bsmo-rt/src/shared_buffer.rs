//! Shared host/accelerator buffer
//!
//! A `SharedBuffer<T>` owns two independent storages of the same logical
//! length: one the host works in, one the accelerator sees. Nothing keeps
//! them equal — there is **no implicit coherency**, and the runtime never
//! assumes any even on platforms whose memories happen to be physically
//! coherent. Synchronization is an explicit caller action:
//! [`host2accel`](SharedBuffer::host2accel) and
//! [`accel2host`](SharedBuffer::accel2host) copy whole storages, and
//! [`compare`](SharedBuffer::compare) reports bitwise equality *at the
//! instant of the call* — it implies nothing about any other time.
//!
//! A buffer starts diverged; any host write after a sync diverges it
//! again. The runtime does not track this — resyncing at the right
//! program points relative to accelerator execution is the caller's
//! responsibility, and the buffer is single-owner, not shareable across
//! threads.
//!
//! Both storages are released together when the buffer drops.

use crate::error::{Result, RtError};
use crate::platform::PlatformContext;

/// Construction flags selecting buffer variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferFlags {
    /// The accelerator only reads this buffer; write-back is an error.
    pub read_only: bool,
    /// Host-side scratch: no accelerator storage is allocated.
    pub host_only: bool,
}

impl BufferFlags {
    /// Plain two-sided read/write buffer.
    pub const NONE: Self = Self {
        read_only: false,
        host_only: false,
    };
}

/// Paired host and accelerator-visible storage for `len` elements.
#[derive(Debug)]
pub struct SharedBuffer<'p, T> {
    ctx: &'p PlatformContext,
    name: String,
    flags: BufferFlags,
    host: Vec<T>,
    accel: Option<Vec<T>>,
}

impl<'p, T: Copy + Default + PartialEq> SharedBuffer<'p, T> {
    /// Allocate both storages, zero-initialized, tagged `name` in the
    /// platform ledger.
    pub fn new(
        ctx: &'p PlatformContext,
        len: usize,
        name: impl Into<String>,
        flags: BufferFlags,
    ) -> Self {
        let name = name.into();
        let host = vec![T::default(); len];
        let accel = if flags.host_only {
            None
        } else {
            Some(vec![T::default(); len])
        };
        let sides = if flags.host_only { 1 } else { 2 };
        ctx.register(&name, len * std::mem::size_of::<T>() * sides);
        Self {
            ctx,
            name,
            flags,
            host,
            accel,
        }
    }

    /// Logical element count.
    pub fn len(&self) -> usize {
        self.host.len()
    }

    /// True if the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.host.is_empty()
    }

    /// Diagnostic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Construction flags.
    pub const fn flags(&self) -> BufferFlags {
        self.flags
    }

    /// Host view.
    pub fn host(&self) -> &[T] {
        &self.host
    }

    /// Mutable host view. Writing here conceptually diverges the buffer
    /// from the accelerator view until the next sync.
    pub fn host_mut(&mut self) -> &mut [T] {
        &mut self.host
    }

    /// Accelerator view, for diagnostics and the emulated backend.
    ///
    /// # Errors
    ///
    /// Returns [`RtError::HostOnly`] if no accelerator storage exists.
    pub fn accel(&self) -> Result<&[T]> {
        self.accel
            .as_deref()
            .ok_or_else(|| RtError::host_only(&self.name))
    }

    /// Copy current host contents to the accelerator view.
    ///
    /// # Errors
    ///
    /// Returns [`RtError::HostOnly`] if no accelerator storage exists.
    pub fn host2accel(&mut self) -> Result<()> {
        let accel = self
            .accel
            .as_mut()
            .ok_or_else(|| RtError::host_only(&self.name))?;
        accel.copy_from_slice(&self.host);
        tracing::debug!("buffer '{}': host -> accel ({} elems)", self.name, self.host.len());
        Ok(())
    }

    /// Copy the accelerator view back over the host contents.
    ///
    /// # Errors
    ///
    /// Returns [`RtError::HostOnly`] without accelerator storage, or
    /// [`RtError::ReadOnly`] for a buffer the accelerator never writes.
    pub fn accel2host(&mut self) -> Result<()> {
        if self.flags.read_only {
            return Err(RtError::read_only(&self.name));
        }
        let accel = self
            .accel
            .as_ref()
            .ok_or_else(|| RtError::host_only(&self.name))?;
        self.host.copy_from_slice(accel);
        tracing::debug!("buffer '{}': accel -> host ({} elems)", self.name, self.host.len());
        Ok(())
    }

    /// Bitwise equality of the two storages at this instant.
    ///
    /// # Errors
    ///
    /// Returns [`RtError::HostOnly`] if no accelerator storage exists.
    pub fn compare(&self) -> Result<bool> {
        let accel = self
            .accel
            .as_deref()
            .ok_or_else(|| RtError::host_only(&self.name))?;
        Ok(self.host.as_slice() == accel)
    }
}

impl<T> Drop for SharedBuffer<'_, T> {
    fn drop(&mut self) {
        let sides = if self.accel.is_some() { 2 } else { 1 };
        self.ctx
            .unregister(&self.name, self.host.len() * std::mem::size_of::<T>() * sides);
    }
}

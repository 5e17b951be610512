//! Platform context
//!
//! One explicit object instead of a process-global driver handle:
//! constructed at startup, passed by reference to every buffer and
//! matrix, dropped after all of them.
//! It owns nothing but the allocation ledger — buffer storage belongs to
//! the buffers themselves — so its job is diagnostics and making buffer
//! lifetimes visibly nested inside the platform's.
//!
//! Single-threaded by design ([`std::cell::Cell`] counters, no `Sync`);
//! the runtime's scheduling model is synchronous single-owner passes.

use std::cell::Cell;

/// Allocation registry and platform-scope diagnostics.
#[derive(Debug)]
pub struct PlatformContext {
    live_buffers: Cell<usize>,
    allocated_bytes: Cell<usize>,
    peak_bytes: Cell<usize>,
}

impl PlatformContext {
    /// Bring up a platform context.
    #[must_use]
    pub fn new() -> Self {
        tracing::info!("platform context up");
        Self {
            live_buffers: Cell::new(0),
            allocated_bytes: Cell::new(0),
            peak_bytes: Cell::new(0),
        }
    }

    /// Buffers currently alive against this context.
    pub fn live_buffers(&self) -> usize {
        self.live_buffers.get()
    }

    /// Bytes currently allocated across host and accelerator storage.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes.get()
    }

    /// High-water mark of [`allocated_bytes`](Self::allocated_bytes).
    pub fn peak_bytes(&self) -> usize {
        self.peak_bytes.get()
    }

    pub(crate) fn register(&self, name: &str, bytes: usize) {
        self.live_buffers.set(self.live_buffers.get() + 1);
        let now = self.allocated_bytes.get() + bytes;
        self.allocated_bytes.set(now);
        if now > self.peak_bytes.get() {
            self.peak_bytes.set(now);
        }
        tracing::debug!("buffer '{name}': +{bytes} B ({now} B live)");
    }

    pub(crate) fn unregister(&self, name: &str, bytes: usize) {
        self.live_buffers.set(self.live_buffers.get() - 1);
        self.allocated_bytes.set(self.allocated_bytes.get() - bytes);
        tracing::debug!("buffer '{name}': -{bytes} B");
    }
}

impl Default for PlatformContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PlatformContext {
    fn drop(&mut self) {
        if self.live_buffers.get() != 0 {
            // buffers must not outlive the platform
            tracing::warn!(
                "platform context dropped with {} live buffers ({} B)",
                self.live_buffers.get(),
                self.allocated_bytes.get()
            );
        } else {
            tracing::info!("platform context down, peak {} B", self.peak_bytes.get());
        }
    }
}

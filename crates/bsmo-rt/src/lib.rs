//! Host runtime for the bit-serial matrix-multiply overlay.
//!
//! Owns everything between a compiled workload and the accelerator:
//! shared host/accelerator buffers with explicit, non-coherent
//! synchronization, padded matrix shapes, the backend seam the pipeline
//! hides behind, and the functional execution model that stands in for
//! the hardware when none is present.
//!
//! # Backend hierarchy
//!
//! ```text
//! Hardware (external):
//!   register/DMA platform driver — implements OverlayBackend out of tree
//!
//! Development / CI:
//!   EmuBackend — word-exact functional model, no hardware required
//! ```
//!
//! # No coherency, ever
//!
//! A [`SharedBuffer`] starts with its host and accelerator views
//! diverged and keeps them that way until the caller syncs. This holds
//! even where the two views share physically coherent memory — the
//! contract is explicit sync or nothing.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`platform`] | Explicit platform context: allocation registry and diagnostics |
//! | [`shared_buffer`] | Paired host/accel storage with `host2accel` / `accel2host` / `compare` |
//! | [`matrix`] | Logical-vs-padded matrix shapes over a shared buffer |
//! | [`backend`] | The `OverlayBackend` trait and execution shape |
//! | [`emu`] | Functional execution model |
//! | [`handshake`] | Single-slot ready/valid channel, wire-stream encoding |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod backend;
pub mod emu;
mod error;
pub mod handshake;
pub mod matrix;
pub mod platform;
pub mod shared_buffer;

pub use backend::{BackendKind, ExecShape, OverlayBackend};
pub use emu::EmuBackend;
pub use error::{Result, RtError};
pub use handshake::{encode_stream, RvChannel};
pub use matrix::{Matrix, MatrixKind};
pub use platform::PlatformContext;
pub use shared_buffer::{BufferFlags, SharedBuffer};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        BackendKind, BufferFlags, EmuBackend, ExecShape, Matrix, MatrixKind, OverlayBackend,
        PlatformContext, Result, RtError, RvChannel, SharedBuffer,
    };
}

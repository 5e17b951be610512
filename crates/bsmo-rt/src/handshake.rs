// SPDX-License-Identifier: AGPL-3.0-only

//! Ready/valid instruction channel and wire-stream encoding
//!
//! The only flow control between host and pipeline stages is a two-signal
//! handshake: the producer asserts valid by offering an item, the
//! consumer asserts ready, and a transfer happens exactly when both hold.
//! A consumer withholding readiness is backpressure — the producer's
//! offer is refused until the slot drains. There is no timeout or
//! cancellation at this layer; a stalled handshake blocks indefinitely,
//! and any timeout policy belongs to the platform driver.
//!
//! [`RvChannel`] models one such link with a single in-flight slot,
//! single-threaded and explicit, exactly as the host observes a
//! hardware queue's `valid`/`ready` pins.
//!
//! [`encode_stream`] packs an instruction stream into the little-endian
//! byte form the hardware queue DMA expects, in strict emission order.

use bsmo_overlay::instr::INSTR_BYTES;
use bsmo_overlay::ExecInstr;
use bytes::{BufMut, Bytes, BytesMut};

/// A single-slot ready/valid link.
#[derive(Debug)]
pub struct RvChannel<T> {
    slot: Option<T>,
    ready: bool,
}

impl<T> RvChannel<T> {
    /// An empty channel with the consumer not ready.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slot: None,
            ready: false,
        }
    }

    /// Producer side: offer an item, asserting valid.
    ///
    /// # Errors
    ///
    /// Gives the item back when the slot is still occupied — the consumer
    /// is applying backpressure.
    pub fn offer(&mut self, item: T) -> std::result::Result<(), T> {
        if self.slot.is_some() {
            return Err(item);
        }
        self.slot = Some(item);
        Ok(())
    }

    /// Whether the producer currently asserts valid.
    pub const fn valid(&self) -> bool {
        self.slot.is_some()
    }

    /// Consumer side: assert or withhold readiness.
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Whether the consumer currently asserts ready.
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// Observe the in-flight item without transferring it.
    pub const fn peek(&self) -> Option<&T> {
        self.slot.as_ref()
    }

    /// Complete a transfer: yields the item only while both valid and
    /// ready hold.
    pub fn take(&mut self) -> Option<T> {
        if self.ready {
            self.slot.take()
        } else {
            None
        }
    }
}

impl<T> Default for RvChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Pack an instruction stream into its wire byte form: one 128-bit
/// little-endian record per instruction, emission order preserved.
#[must_use]
pub fn encode_stream(instrs: &[ExecInstr]) -> Bytes {
    let mut buf = BytesMut::with_capacity(instrs.len() * INSTR_BYTES);
    for instr in instrs {
        buf.put_u128_le(instr.pack());
    }
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_needs_both_valid_and_ready() {
        let mut ch = RvChannel::new();
        assert!(!ch.valid());
        assert_eq!(ch.take(), None);

        ch.offer(42u32).unwrap();
        assert!(ch.valid());
        // valid alone is not a transfer
        assert_eq!(ch.take(), None);

        ch.set_ready(true);
        assert_eq!(ch.take(), Some(42));
        assert!(!ch.valid());
        // ready alone is not a transfer either
        assert_eq!(ch.take(), None);
    }

    #[test]
    fn full_slot_backpressures_producer() {
        let mut ch = RvChannel::new();
        ch.offer(1u8).unwrap();
        assert_eq!(ch.offer(2), Err(2));
        ch.set_ready(true);
        assert_eq!(ch.take(), Some(1));
        ch.offer(2).unwrap();
    }

    #[test]
    fn encoded_stream_preserves_order_and_layout() {
        let instrs = [
            ExecInstr {
                lhs_offset: 7,
                num_tiles: 1,
                ..ExecInstr::default()
            },
            ExecInstr {
                rhs_offset: 9,
                write_en: true,
                ..ExecInstr::default()
            },
        ];
        let wire = encode_stream(&instrs);
        assert_eq!(wire.len(), 2 * INSTR_BYTES);
        let first = u128::from_le_bytes(wire[..INSTR_BYTES].try_into().unwrap());
        assert_eq!(ExecInstr::unpack(first), instrs[0]);
        let second = u128::from_le_bytes(wire[INSTR_BYTES..].try_into().unwrap());
        assert_eq!(ExecInstr::unpack(second), instrs[1]);
    }
}

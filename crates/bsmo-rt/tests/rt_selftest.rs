//! Runtime self-tests: buffer synchronization contract, padded matrix
//! bookkeeping, and the ready/valid progression observed at the device
//! boundary.

use bsmo_overlay::{ExecInstr, OverlayGeometry};
use bsmo_rt::{Matrix, MatrixKind, PlatformContext, RvChannel, SharedBuffer};

#[test]
fn shared_buffer_sync_contract() {
    let ctx = PlatformContext::new();
    let mut buf =
        SharedBuffer::<i32>::new(&ctx, 10, "test_buf", bsmo_rt::BufferFlags::NONE);
    for (i, v) in buf.host_mut().iter_mut().enumerate() {
        *v = i32::try_from(i).unwrap() + 1;
    }
    // filled on the host side and never synced: views diverge
    assert!(!buf.compare().unwrap());
    // after an explicit sync they agree
    buf.host2accel().unwrap();
    assert!(buf.compare().unwrap());
}

/// For every matrix kind and a few shapes, fill `1..n`, sync, and check
/// the padded buffer's sum, its padded-zero count, and that a full round
/// trip leaves the logical region untouched.
#[test]
fn matrix_padding_and_roundtrip() {
    let ctx = PlatformContext::new();
    let geom = OverlayGeometry::REFERENCE;
    let dims = [3usize, 4, 5];

    for &outer in &dims {
        for &inner in &dims {
            for kind in [MatrixKind::Lhs, MatrixKind::Rhs, MatrixKind::Res] {
                match kind {
                    MatrixKind::Res => {
                        let mut m =
                            Matrix::<i32>::new(&ctx, &geom, kind, outer, inner, "res").unwrap();
                        fill_and_check_i32(&mut m);
                    }
                    MatrixKind::Lhs | MatrixKind::Rhs => {
                        let mut m =
                            Matrix::<u8>::new(&ctx, &geom, kind, outer, inner, "op").unwrap();
                        fill_and_check_u8(&mut m);
                    }
                }
            }
        }
    }
    assert_eq!(ctx.live_buffers(), 0);
}

fn fill_and_check_i32(m: &mut Matrix<'_, i32>) {
    let n = m.elems();
    for (i, v) in m.host_mut().iter_mut().enumerate() {
        *v = i32::try_from(i).unwrap() + 1;
    }
    m.host2accel().unwrap();

    let sum: i64 = m.padded_host().iter().map(|&v| i64::from(v)).sum();
    let zeros = m.padded_host().iter().filter(|&&v| v == 0).count();
    assert_eq!(sum, (n * (n + 1) / 2) as i64);
    assert_eq!(zeros, m.elems_a() - m.elems());

    m.accel2host().unwrap();
    for (i, &v) in m.host().iter().enumerate() {
        assert_eq!(v, i32::try_from(i).unwrap() + 1);
    }
}

fn fill_and_check_u8(m: &mut Matrix<'_, u8>) {
    let n = m.elems();
    for (i, v) in m.host_mut().iter_mut().enumerate() {
        *v = u8::try_from(i + 1).unwrap();
    }
    m.host2accel().unwrap();

    let sum: u64 = m.padded_host().iter().map(|&v| u64::from(v)).sum();
    let zeros = m.padded_host().iter().filter(|&&v| v == 0).count();
    assert_eq!(sum, (n * (n + 1) / 2) as u64);
    assert_eq!(zeros, m.elems_a() - m.elems());

    m.accel2host().unwrap();
    for (i, &v) in m.host().iter().enumerate() {
        assert_eq!(v, u8::try_from(i + 1).unwrap());
    }
}

/// A pattern source standing in for the device side of the instruction
/// queue, emitting a counter-derived sequence the host can verify field
/// by field.
fn pattern_instr(i: u32) -> ExecInstr {
    ExecInstr {
        lhs_offset: i,
        rhs_offset: 10u32.wrapping_sub(i),
        num_tiles: 2 * i,
        shift: u8::try_from(i + 1).unwrap(),
        ..ExecInstr::default()
    }
}

/// Drive the ready/valid channel the way a host drives a hardware queue:
/// wait on valid, withhold ready, assert ready, observe the transfer,
/// repeat for the first 10 instructions.
#[test]
fn handshake_pattern_progression() {
    let mut ch = RvChannel::new();
    for i in 0..10u32 {
        ch.offer(pattern_instr(i)).unwrap();
        assert!(ch.valid());

        // consumer withholds readiness: no transfer, producer stalled
        ch.set_ready(false);
        assert_eq!(ch.take(), None);
        assert!(ch.offer(pattern_instr(99)).is_err());

        ch.set_ready(true);
        let instr = ch.take().expect("valid && ready must transfer");
        assert_eq!(instr.lhs_offset, i);
        assert_eq!(instr.rhs_offset, 10 - i);
        assert_eq!(instr.num_tiles, 2 * i);
        assert_eq!(u32::from(instr.shift), i + 1);
    }
    assert!(!ch.valid());
}

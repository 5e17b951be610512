//! `bsmo` — command-line interface for the bit-serial matmul overlay.
//!
//! ```text
//! USAGE:
//!   bsmo info                        Print the reference overlay geometry
//!   bsmo selftest [options]          Run the runtime self-test suite
//! ```

use anyhow::Result;
use bsmo_gemm::{gen_single_mm, pack_matrix, BitSerialMatrix, SingleMmDescriptor};
use bsmo_overlay::OverlayGeometry;
use bsmo_rt::{
    BufferFlags, EmuBackend, ExecShape, Matrix, MatrixKind, OverlayBackend, PlatformContext,
    SharedBuffer,
};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bsmo", about = "Bit-serial matmul overlay runtime CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the reference overlay geometry.
    Info,
    /// Run the runtime self-test suite against the emulated backend.
    Selftest {
        /// Seed for the randomized workload.
        #[arg(long, default_value_t = 7)]
        seed: u64,
        /// Left-operand rows.
        #[arg(long, default_value_t = 5)]
        rows: usize,
        /// Shared dimension.
        #[arg(long, default_value_t = 96)]
        depth: usize,
        /// Right-operand rows (stored pre-transposed).
        #[arg(long = "rhs-rows", default_value_t = 6)]
        rhs_rows: usize,
        /// Left-operand bit width.
        #[arg(long, default_value_t = 2)]
        bits_l: usize,
        /// Right-operand bit width.
        #[arg(long, default_value_t = 3)]
        bits_r: usize,
        /// Treat both operands as unsigned.
        #[arg(long)]
        unsigned: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Cmd::Info => cmd_info(),
        Cmd::Selftest {
            seed,
            rows,
            depth,
            rhs_rows,
            bits_l,
            bits_r,
            unsigned,
        } => cmd_selftest(seed, rows, depth, rhs_rows, bits_l, bits_r, !unsigned),
    }
}

fn cmd_info() -> Result<()> {
    let g = OverlayGeometry::REFERENCE;
    println!("Reference overlay");
    println!();
    println!("  PE array        {} x {}  ({} PEs)", g.pe_rows, g.pe_cols, g.pe_count());
    println!("  Datapath        {} bits/PE/cycle", g.dpa_bits);
    println!("  Peak            {} binary ops/cycle", g.bin_ops_per_cycle());
    println!(
        "  Operand memory  {} + {} words per PE",
        g.lhs_mem_words, g.rhs_mem_words
    );
    println!("  Result buffers  {}", g.res_bufs);
    println!("  Accumulator     {} bits", g.acc_bits);
    Ok(())
}

#[allow(clippy::fn_params_excessive_bools)]
fn cmd_selftest(
    seed: u64,
    rows: usize,
    depth: usize,
    rhs_rows: usize,
    bits_l: usize,
    bits_r: usize,
    signed: bool,
) -> Result<()> {
    let ctx = PlatformContext::new();
    let mut all_ok = true;
    all_ok &= report("shared_buffer", selftest_shared_buffer(&ctx)?);
    all_ok &= report("matrix", selftest_matrix(&ctx)?);
    all_ok &= report(
        "exec_emu",
        selftest_exec(seed, rows, depth, rhs_rows, bits_l, bits_r, signed)?,
    );

    if all_ok {
        println!("Self-test passed");
        Ok(())
    } else {
        anyhow::bail!("self-test failed")
    }
}

fn report(name: &str, ok: bool) -> bool {
    println!("  {name:<16} {}", if ok { "ok" } else { "FAILED" });
    ok
}

/// Host/accel views diverge until explicitly synced.
fn selftest_shared_buffer(ctx: &PlatformContext) -> Result<bool> {
    let mut buf = SharedBuffer::<i32>::new(ctx, 10, "selftest_buf", BufferFlags::NONE);
    for (i, v) in buf.host_mut().iter_mut().enumerate() {
        *v = i32::try_from(i)? + 1;
    }
    let mut ok = !buf.compare()?;
    buf.host2accel()?;
    ok &= buf.compare()?;
    Ok(ok)
}

/// Padded matrix bookkeeping: sum, zero padding, round trip.
fn selftest_matrix(ctx: &PlatformContext) -> Result<bool> {
    let geom = OverlayGeometry::REFERENCE;
    let mut m = Matrix::<i32>::new(ctx, &geom, MatrixKind::Res, 3, 5, "selftest_res")?;
    let n = m.elems();
    for (i, v) in m.host_mut().iter_mut().enumerate() {
        *v = i32::try_from(i)? + 1;
    }
    m.host2accel()?;

    let sum: i64 = m.padded_host().iter().map(|&v| i64::from(v)).sum();
    let zeros = m.padded_host().iter().filter(|&&v| v == 0).count();
    let mut ok = sum == i64::try_from(n * (n + 1) / 2)?;
    ok &= zeros == m.elems_a() - m.elems();

    m.accel2host()?;
    for (i, &v) in m.host().iter().enumerate() {
        ok &= v == i32::try_from(i)? + 1;
    }
    Ok(ok)
}

/// Random workload through codec, packer, generator, and the functional
/// model, checked against the dense product.
fn selftest_exec(
    seed: u64,
    rows: usize,
    depth: usize,
    rhs_rows: usize,
    bits_l: usize,
    bits_r: usize,
    signed: bool,
) -> Result<bool> {
    let geom = OverlayGeometry::REFERENCE;
    let mut rng = StdRng::seed_from_u64(seed);

    let lhs_dense = random_dense(&mut rng, rows * depth, bits_l, signed);
    let rhs_dense = random_dense(&mut rng, rhs_rows * depth, bits_r, signed);

    let lhs = BitSerialMatrix::from_dense(&lhs_dense, bits_l, rows, depth, signed, geom.pe_rows)?;
    let rhs =
        BitSerialMatrix::from_dense(&rhs_dense, bits_r, rhs_rows, depth, signed, geom.pe_cols)?;
    let dsc = SingleMmDescriptor::for_workload(&geom, &lhs, &rhs)?;
    let instrs = gen_single_mm(&dsc);
    tracing::info!("selftest workload: {} instructions", instrs.len());

    let mut emu = EmuBackend::new(geom);
    emu.write_lhs(&pack_matrix(&lhs, geom.pe_rows, 0, geom.lhs_mem_words))?;
    emu.write_rhs(&pack_matrix(&rhs, geom.pe_cols, 0, geom.rhs_mem_words))?;
    let shape = ExecShape::of(&dsc);
    emu.execute(&instrs, &shape)?;
    let out = emu.read_result(&shape)?;

    let cols_a = shape.tiles_n * geom.pe_cols;
    let mut ok = true;
    for r in 0..rows {
        for c in 0..rhs_rows {
            let expect: i64 = (0..depth)
                .map(|j| lhs_dense[r * depth + j] * rhs_dense[c * depth + j])
                .sum();
            ok &= out[r * cols_a + c] == expect;
        }
    }
    Ok(ok)
}

fn random_dense(rng: &mut StdRng, elems: usize, bits: usize, signed: bool) -> Vec<i64> {
    let (lo, hi) = if signed {
        (-(1i64 << (bits - 1)), (1i64 << (bits - 1)) - 1)
    } else {
        (0, (1i64 << bits) - 1)
    };
    (0..elems).map(|_| rng.gen_range(lo..=hi)).collect()
}

use std::sync::OnceLock;
use std::time::Instant;

use tracing::info;

use crate::error::RuntimeError;

/// Pseudo-random 32-bit value (helper 0x07).
pub fn get_prandom_u32(_args: &[u64]) -> Result<u64, RuntimeError> {
    Ok(rand::random::<u32>() as u64)
}

/// Monotonic nanoseconds since the first clock read in this process.
pub fn ktime_get_ns(_args: &[u64]) -> Result<u64, RuntimeError> {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let epoch = EPOCH.get_or_init(Instant::now);
    Ok(epoch.elapsed().as_nanos() as u64)
}

/// Single execution context, always processor 0.
pub fn get_smp_processor_id(_args: &[u64]) -> Result<u64, RuntimeError> {
    Ok(0)
}

/// Echo helper of the reference gateware: low bytes of R1..R4 stacked
/// above R5.
pub fn pack_args(args: &[u64]) -> Result<u64, RuntimeError> {
    let [r1, r2, r3, r4, r5] = expect_args::<5>(args)?;
    Ok(((r1 & 0xff) << 32) | ((r2 & 0xff) << 24) | ((r3 & 0xff) << 16) | ((r4 & 0xff) << 8) | r5)
}

pub fn increment(args: &[u64]) -> Result<u64, RuntimeError> {
    let [x] = expect_args::<1>(args)?;
    Ok(x.wrapping_add(1))
}

pub fn trace_value(args: &[u64]) -> Result<u64, RuntimeError> {
    let [x] = expect_args::<1>(args)?;
    info!(value = x, "trace_value");
    Ok(0)
}

fn expect_args<const N: usize>(args: &[u64]) -> Result<[u64; N], RuntimeError> {
    args.try_into().map_err(|_| RuntimeError::HelperFailed {
        id: 0,
        reason: format!("expected {} arguments, got {}", N, args.len()),
    })
}

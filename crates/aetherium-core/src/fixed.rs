use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Steps are the atomic unit of simulation time.
pub type Steps = u64;

/// Convert an `f32` probability to `Fixed64`, clamped to `[0, 1]`.
/// Use only when loading data, never in the step loop.
pub fn probability_from_f32(p: f32) -> Fixed64 {
    if p.is_nan() || p <= 0.0 {
        return Fixed64::ZERO;
    }
    if p >= 1.0 {
        return Fixed64::ONE;
    }
    Fixed64::from_num(p)
}

/// Convert `Fixed64` to `f32`. Use only for display.
#[inline]
pub fn fixed64_to_f32(v: Fixed64) -> f32 {
    v.to_num::<f32>()
}

/// Integer percentage `part / whole * 100`, floored and capped at 100.
/// A zero `whole` reads as 0 %.
pub fn percent(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    let pct = (part.min(whole) as u128 * 100) / whole as u128;
    pct as u8
}

/// The share of `total` owed at step `k` of `steps` when `total` is spread
/// evenly with the rounding remainder carried forward. Summing every share
/// for `k` in `1..=steps` yields exactly `total`.
pub fn spread_share(total: u64, steps: u32, k: u32) -> u64 {
    if steps == 0 || k == 0 || k > steps {
        return 0;
    }
    let total = total as u128;
    let steps = steps as u128;
    let k = k as u128;
    let upto = total * k / steps;
    let before = total * (k - 1) / steps;
    (upto - before) as u64
}

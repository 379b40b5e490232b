//! `abs-send-time` wraparound arithmetic.
//!
//! The RTP `abs-send-time` header extension is a 24-bit fixed-point field in
//! units of `1 / 2^18` seconds that wraps every 64 seconds. Every duration
//! derived from two send-time samples must go through [`unwrap`] first.

use std::time::Duration;

/// One past the largest representable 24-bit abs-send-time value.
pub const ABS_SEND_TIME_MAX: i64 = 1 << 24;

/// Half of `ABS_SEND_TIME_MAX`; a raw delta larger than this in magnitude is
/// assumed to be a wrap in the opposite direction.
const HALF_RANGE: i64 = ABS_SEND_TIME_MAX / 2;

/// `abs-send-time` ticks per second (6.18 fixed point: 18 fractional bits).
pub const TICKS_PER_SECOND: f64 = (1u64 << 18) as f64;

/// Unwrap the signed delta between two 24-bit `abs-send-time` samples.
///
/// `prev` and `curr` are each assumed to already be masked to 24 bits (the
/// caller reads them straight off the wire). The result is not itself
/// wrapped: `unwrap(a, b) + unwrap(b, c) == unwrap(a, c)` holds exactly for
/// any chain of samples, modulo `ABS_SEND_TIME_MAX`.
pub fn unwrap(prev: u32, curr: u32) -> i64 {
    let mut d = curr as i64 - prev as i64;
    if d > HALF_RANGE {
        d -= ABS_SEND_TIME_MAX;
    } else if d < -HALF_RANGE {
        d += ABS_SEND_TIME_MAX;
    }
    d
}

/// Convert an unwrapped `abs-send-time` delta (in ticks) to a [`Duration`].
///
/// Negative deltas saturate to zero — a `Duration` cannot be negative; the
/// sign is meaningful only in the delay-variation arithmetic that consumes
/// unwrapped deltas as signed `i64`s directly, not through this helper.
pub fn unwrapped_ticks_to_duration(ticks: i64) -> Duration {
    if ticks <= 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(ticks as f64 / TICKS_PER_SECOND)
}

/// Reduce a UQ32.32 NTP-format `abs-capture-time` to 24-bit `abs-send-time`
/// scale, per the RTP header extension's abbreviated encoding:
/// `send_time = ((t >> 32) & 0x3F) << 18 | ((t >> 14) & 0x3FFFF)`.
pub fn capture_time_to_send_time(t: u64) -> u32 {
    (((t >> 32) & 0x3F) << 18 | ((t >> 14) & 0x3FFFF)) as u32
}

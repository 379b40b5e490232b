//! The hot-path input record.

use crate::clock::Instant;

/// A single parsed packet arrival, as handed to [`crate::estimator::Estimator::on_packet`].
///
/// Immutable. The wire parser (out of scope for this crate) is responsible
/// for producing `send_time` either directly from the 24-bit `abs-send-time`
/// extension, or by reducing an `abs-capture-time` extension via
/// [`crate::time::capture_time_to_send_time`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketObservation {
    /// Local monotonic arrival time, microsecond resolution in practice
    /// (the type itself carries nanosecond precision).
    pub arrival_time: Instant,
    /// 24-bit `abs-send-time`, units of `1 / 2^18` seconds, wraps every 64s.
    pub send_time: u32,
    /// RTP payload size in bytes (header excluded).
    pub payload_size: u32,
    /// RTP synchronization source identifier.
    pub ssrc: u32,
}

impl PacketObservation {
    pub fn new(arrival_time: Instant, send_time: u32, payload_size: u32, ssrc: u32) -> Self {
        Self {
            arrival_time,
            send_time: send_time & 0x00FF_FFFF,
            payload_size,
            ssrc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_time_is_masked_to_24_bits() {
        let obs = PacketObservation::new(Instant::ZERO, 0xFFFF_FFFF, 1200, 1);
        assert_eq!(obs.send_time, 0x00FF_FFFF);
    }
}

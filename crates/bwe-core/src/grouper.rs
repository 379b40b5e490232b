//! Inter-arrival grouper: collapses packet bursts into groups and emits a
//! delay-variation sample once two groups have completed.

use crate::clock::Instant;
use crate::packet::PacketObservation;
use crate::time;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A burst threshold of 5ms — packets that land within this long of the
/// current group's last arrival are folded into the same group rather than
/// starting a new one.
pub const DEFAULT_BURST_THRESHOLD: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrouperConfig {
    pub burst_threshold: Duration,
}

impl Default for GrouperConfig {
    fn default() -> Self {
        Self {
            burst_threshold: DEFAULT_BURST_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PacketGroup {
    first_send_time: u32,
    last_send_time: u32,
    first_arrival: Instant,
    last_arrival: Instant,
    total_bytes: u64,
    packet_count: u32,
}

impl PacketGroup {
    fn start(obs: &PacketObservation) -> Self {
        Self {
            first_send_time: obs.send_time,
            last_send_time: obs.send_time,
            first_arrival: obs.arrival_time,
            last_arrival: obs.arrival_time,
            total_bytes: obs.payload_size as u64,
            packet_count: 1,
        }
    }

    fn extend(&mut self, obs: &PacketObservation) {
        self.last_send_time = obs.send_time;
        self.last_arrival = obs.arrival_time;
        self.total_bytes += obs.payload_size as u64;
        self.packet_count += 1;
    }
}

/// The delay variation between two completed groups.
///
/// Positive means the queue grew between the two bursts (the path took
/// longer to deliver the second burst than the sender took to send it);
/// negative means it drained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayVariation {
    /// `current.last_arrival - previous.last_arrival`.
    pub receive_delta: Duration,
    /// Unwrapped send-time delta converted to a duration.
    pub send_delta: Duration,
    /// `receive_delta - send_delta`, in milliseconds (signed).
    pub delay_variation_ms: f64,
}

/// Collapses packet bursts into groups and emits a [`DelayVariation`] once a
/// burst completes and a previous burst exists to compare against.
pub struct InterArrivalGrouper {
    burst_threshold: Duration,
    current: Option<PacketGroup>,
    previous: Option<PacketGroup>,
}

impl InterArrivalGrouper {
    pub fn new(burst_threshold: Duration) -> Self {
        Self {
            burst_threshold,
            current: None,
            previous: None,
        }
    }

    /// Feed one packet. Returns `Some` exactly when this packet completed a
    /// burst and a previous burst exists to diff against.
    pub fn add_packet(&mut self, obs: &PacketObservation) -> Option<DelayVariation> {
        let Some(current) = self.current.as_mut() else {
            self.current = Some(PacketGroup::start(obs));
            return None;
        };

        let gap = obs
            .arrival_time
            .saturating_duration_since(current.last_arrival);
        if gap <= self.burst_threshold {
            current.extend(obs);
            return None;
        }

        // Rotate: current becomes previous, start a fresh group.
        let completed_current = *current;
        let result = self.previous.map(|previous| {
            let receive_delta = completed_current
                .last_arrival
                .saturating_duration_since(previous.last_arrival);
            let send_ticks = time::unwrap(previous.last_send_time, completed_current.last_send_time);
            let send_delta = time::unwrapped_ticks_to_duration(send_ticks);
            let delay_variation_ms =
                receive_delta.as_secs_f64() * 1000.0 - send_ticks as f64 / time::TICKS_PER_SECOND * 1000.0;
            DelayVariation {
                receive_delta,
                send_delta,
                delay_variation_ms,
            }
        });

        self.previous = Some(completed_current);
        self.current = Some(PacketGroup::start(obs));
        result
    }

    /// Clear both groups, returning the grouper to its constructor state.
    pub fn reset(&mut self) {
        self.current = None;
        self.previous = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn inst(ms: u64) -> Instant {
        Instant::ZERO + Duration::from_millis(ms)
    }

    fn obs(arrival_ms: u64, send_ticks: u32, size: u32) -> PacketObservation {
        PacketObservation::new(inst(arrival_ms), send_ticks, size, 1)
    }

    fn send_ticks_for_ms(ms: f64) -> u32 {
        (ms / 1000.0 * time::TICKS_PER_SECOND) as u32
    }

    #[test]
    fn first_packet_returns_none() {
        let mut g = InterArrivalGrouper::new(DEFAULT_BURST_THRESHOLD);
        assert_eq!(g.add_packet(&obs(0, 0, 100)), None);
    }

    #[test]
    fn burst_packets_within_threshold_do_not_emit() {
        let mut g = InterArrivalGrouper::new(DEFAULT_BURST_THRESHOLD);
        g.add_packet(&obs(0, 0, 100));
        assert_eq!(g.add_packet(&obs(3, send_ticks_for_ms(3.0), 100)), None);
    }

    #[test]
    fn single_packet_groups_are_valid() {
        // Two isolated single-packet groups (gap > burst threshold) with no
        // previous group yet should not emit on the second either (no prior
        // completed group to diff against), but should emit on the third.
        let mut g = InterArrivalGrouper::new(DEFAULT_BURST_THRESHOLD);
        assert_eq!(g.add_packet(&obs(0, 0, 100)), None);
        assert_eq!(g.add_packet(&obs(20, send_ticks_for_ms(20.0), 100)), None);
        let dv = g.add_packet(&obs(40, send_ticks_for_ms(40.0), 100));
        assert!(dv.is_some());
    }

    #[test]
    fn stable_spacing_yields_near_zero_variation() {
        let mut g = InterArrivalGrouper::new(DEFAULT_BURST_THRESHOLD);
        let mut last = None;
        for i in 0..5u64 {
            let t = i * 20;
            let ticks = send_ticks_for_ms(t as f64);
            if let Some(dv) = g.add_packet(&obs(t, ticks, 1200)) {
                last = Some(dv);
            }
        }
        let dv = last.expect("should have emitted by the 5th packet");
        assert!(dv.delay_variation_ms.abs() < 1.0, "got {}", dv.delay_variation_ms);
    }

    #[test]
    fn growing_gap_yields_positive_variation() {
        let mut g = InterArrivalGrouper::new(DEFAULT_BURST_THRESHOLD);
        // send deltas of 20ms each, but arrival deltas grow: 20, 70, 120...
        let sends = [0.0, 20.0, 40.0, 60.0];
        let arrivals = [0.0, 70.0, 140.0, 210.0];
        let mut last = None;
        for (s, a) in sends.iter().zip(arrivals.iter()) {
            if let Some(dv) = g.add_packet(&obs(*a as u64, send_ticks_for_ms(*s), 1200)) {
                last = Some(dv);
            }
        }
        let dv = last.expect("should have emitted");
        assert!(dv.delay_variation_ms > 0.0);
    }

    #[test]
    fn reset_clears_both_groups() {
        let mut g = InterArrivalGrouper::new(DEFAULT_BURST_THRESHOLD);
        g.add_packet(&obs(0, 0, 100));
        g.add_packet(&obs(20, send_ticks_for_ms(20.0), 100));
        g.reset();
        assert_eq!(g.add_packet(&obs(100, send_ticks_for_ms(100.0), 100)), None);
    }

    #[test]
    fn send_time_wraparound_inside_burst_is_transparent() {
        // Both packets in the same burst (arrival gap <= 5ms); the first's
        // send time is near the 24-bit rollover and the second has wrapped.
        let mut g = InterArrivalGrouper::new(DEFAULT_BURST_THRESHOLD);
        let near_wrap = 16_777_000u32;
        g.add_packet(&PacketObservation::new(inst(0), near_wrap, 100, 1));
        let wrapped = 100u32;
        // Still within burst threshold arrival-wise.
        let result = g.add_packet(&PacketObservation::new(inst(2), wrapped, 100, 1));
        assert_eq!(result, None);
    }
}

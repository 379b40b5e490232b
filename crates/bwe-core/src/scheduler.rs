//! REMB feedback scheduler: decides when the estimator should emit a new
//! Receiver Estimated Maximum Bitrate value to the sender.

use crate::clock::Instant;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Upper bound on how long the estimator goes without emitting feedback.
    pub interval: Duration,
    /// Relative drop (vs. the last emitted value) large enough to trigger
    /// an immediate, out-of-cycle emission.
    pub decrease_threshold: f64,
    /// SSRC the REMB packet identifies itself with to the sender.
    pub sender_id: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            decrease_threshold: 0.03,
            sender_id: 0,
        }
    }
}

/// Tracks when REMB feedback was last sent and whether the newest estimate
/// warrants sending one early.
pub struct RembScheduler {
    config: SchedulerConfig,
    last_emitted_at: Option<Instant>,
    last_emitted_bps: Option<u64>,
}

impl RembScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config: sanitize(config),
            last_emitted_at: None,
            last_emitted_bps: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    pub fn decrease_threshold(&self) -> f64 {
        self.config.decrease_threshold
    }

    pub fn sender_id(&self) -> u32 {
        self.config.sender_id
    }

    /// Whether feedback should be sent now for `estimate_bps` at `now`: the
    /// periodic interval has elapsed, this is the first estimate ever seen,
    /// or the estimate dropped sharply enough below the last emitted value.
    pub fn should_emit(&self, estimate_bps: u64, now: Instant) -> bool {
        let Some(last_at) = self.last_emitted_at else {
            return true;
        };

        if now.saturating_duration_since(last_at) >= self.config.interval {
            return true;
        }

        if let Some(last_bps) = self.last_emitted_bps {
            if last_bps > 0 {
                let drop = (last_bps as f64 - estimate_bps as f64) / last_bps as f64;
                if drop >= self.config.decrease_threshold {
                    return true;
                }
            }
        }

        false
    }

    /// Record that feedback carrying `estimate_bps` was just emitted at `now`.
    pub fn mark_emitted(&mut self, estimate_bps: u64, now: Instant) {
        self.last_emitted_at = Some(now);
        self.last_emitted_bps = Some(estimate_bps);
    }

    pub fn reset(&mut self) {
        self.last_emitted_at = None;
        self.last_emitted_bps = None;
    }
}

fn sanitize(config: SchedulerConfig) -> SchedulerConfig {
    let default = SchedulerConfig::default();
    SchedulerConfig {
        interval: if config.interval > Duration::ZERO {
            config.interval
        } else {
            default.interval
        },
        decrease_threshold: if config.decrease_threshold > 0.0 && config.decrease_threshold < 1.0 {
            config.decrease_threshold
        } else {
            default.decrease_threshold
        },
        sender_id: config.sender_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(ms: u64) -> Instant {
        Instant::ZERO + Duration::from_millis(ms)
    }

    #[test]
    fn first_estimate_always_emits() {
        let s = RembScheduler::new(SchedulerConfig::default());
        assert!(s.should_emit(500_000, inst(0)));
    }

    #[test]
    fn emits_on_periodic_interval() {
        let mut s = RembScheduler::new(SchedulerConfig::default());
        s.mark_emitted(500_000, inst(0));
        assert!(!s.should_emit(500_000, inst(500)));
        assert!(s.should_emit(500_000, inst(1000)));
    }

    #[test]
    fn emits_immediately_on_sharp_decrease() {
        let mut s = RembScheduler::new(SchedulerConfig::default());
        s.mark_emitted(1_000_000, inst(0));
        // 10% drop, well above the 3% default threshold.
        assert!(s.should_emit(900_000, inst(100)));
    }

    #[test]
    fn small_decrease_does_not_trigger_immediate_emission() {
        let mut s = RembScheduler::new(SchedulerConfig::default());
        s.mark_emitted(1_000_000, inst(0));
        assert!(!s.should_emit(990_000, inst(100)));
    }

    #[test]
    fn invalid_config_falls_back_to_defaults() {
        let s = RembScheduler::new(SchedulerConfig {
            interval: Duration::ZERO,
            decrease_threshold: 2.0,
            sender_id: 42,
        });
        assert_eq!(s.interval(), SchedulerConfig::default().interval);
        assert_eq!(s.decrease_threshold(), SchedulerConfig::default().decrease_threshold);
    }

    #[test]
    fn sender_id_passes_through_untouched() {
        let s = RembScheduler::new(SchedulerConfig {
            sender_id: 99,
            ..SchedulerConfig::default()
        });
        assert_eq!(s.sender_id(), 99);
    }

    #[test]
    fn reset_forces_next_estimate_to_emit() {
        let mut s = RembScheduler::new(SchedulerConfig::default());
        s.mark_emitted(500_000, inst(0));
        s.reset();
        assert!(s.should_emit(500_000, inst(10)));
    }
}

//! The estimator facade: wires the grouper, delay filter, overuse detector,
//! incoming-rate meter, rate controller and feedback scheduler into the one
//! type callers actually hold.

use crate::clock::{Clock, Instant, SystemClock};
use crate::config::Config;
use crate::controller::AimdRateController;
use crate::detector::OveruseDetector;
use crate::error::ConfigWarning;
use crate::filter::DelayFilter;
use crate::grouper::InterArrivalGrouper;
use crate::packet::PacketObservation;
use crate::rate_meter::IncomingRateMeter;
use crate::scheduler::RembScheduler;
use std::collections::HashSet;
use std::sync::Arc;

/// REMB feedback ready to hand to an external encoder: the estimate, the
/// SSRCs it covers, and the sender identifier the scheduler was configured
/// with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RembFeedback {
    pub bitrate_bps: u64,
    pub ssrcs: HashSet<u32>,
    pub sender_id: u32,
}

/// Receiver-side bandwidth estimator. Generic over the clock so tests can
/// drive it with a [`crate::clock::MockClock`] instead of wall-clock time;
/// production code uses [`DefaultEstimator`].
///
/// Not `Clone`: holds mutable per-stream state that must stay singular.
/// Share it across threads with [`SharedEstimator`] instead.
pub struct Estimator<C: Clock> {
    clock: C,
    config: Config,
    grouper: InterArrivalGrouper,
    filter: DelayFilter,
    detector: OveruseDetector,
    rate_meter: IncomingRateMeter,
    controller: AimdRateController,
    scheduler: RembScheduler,
    ssrcs: HashSet<u32>,
}

impl<C: Clock> Estimator<C> {
    /// Build an estimator bound to `clock`. Invalid configuration fields are
    /// substituted with defaults; the warnings raised are returned alongside
    /// the estimator so the caller can log or surface them.
    pub fn with_clock(config: Config, clock: C) -> (Self, Vec<ConfigWarning>) {
        let (config, warnings) = config.sanitize();
        let estimator = Self {
            grouper: InterArrivalGrouper::new(config.grouper.burst_threshold),
            filter: DelayFilter::new(config.filter),
            detector: OveruseDetector::new(config.detector),
            rate_meter: IncomingRateMeter::new(config.rate_meter),
            controller: AimdRateController::new(config.controller),
            scheduler: RembScheduler::new(config.scheduler),
            ssrcs: HashSet::new(),
            clock,
            config,
        };
        (estimator, warnings)
    }

    /// Record one received packet and, if it completes a burst against a
    /// prior one, advance the filter, detector and controller. If the
    /// incoming-rate meter has too few samples to produce a rate, the
    /// estimate is left unchanged and the controller is not invoked.
    pub fn on_packet(&mut self, obs: PacketObservation) {
        self.ssrcs.insert(obs.ssrc);
        self.rate_meter.update(obs.payload_size, obs.arrival_time);

        let Some(delay_variation) = self.grouper.add_packet(&obs) else {
            return;
        };

        let t_arrival_ms = obs.arrival_time.as_nanos() as f64 / 1_000_000.0;
        let filtered = self.filter.update(t_arrival_ms, delay_variation.delay_variation_ms);
        let signal = self.detector.detect(filtered, obs.arrival_time);

        let Some(incoming_rate_bps) = self.rate_meter.rate(obs.arrival_time) else {
            return;
        };

        self.controller.update(signal, incoming_rate_bps, obs.arrival_time);
    }

    /// The current bandwidth estimate, in bits per second.
    pub fn estimate(&self) -> u64 {
        self.controller.estimate_bps()
    }

    /// Every SSRC seen so far.
    pub fn ssrcs(&self) -> impl Iterator<Item = u32> + '_ {
        self.ssrcs.iter().copied()
    }

    /// Ask the feedback scheduler whether a REMB should be sent right now,
    /// using the estimator's own clock. Requires a scheduler attached (every
    /// estimator has one) and a non-empty SSRC set; never fires before any
    /// packet has been observed. Records the emission with the scheduler
    /// when it fires.
    pub fn maybe_emit_feedback(&mut self) -> Option<RembFeedback> {
        if self.ssrcs.is_empty() {
            return None;
        }
        let now = self.clock.now();
        let estimate = self.controller.estimate_bps();
        if self.scheduler.should_emit(estimate, now) {
            self.scheduler.mark_emitted(estimate, now);
            Some(RembFeedback {
                bitrate_bps: estimate,
                ssrcs: self.ssrcs.clone(),
                sender_id: self.scheduler.sender_id(),
            })
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.grouper.reset();
        self.filter.reset();
        self.detector.reset();
        self.rate_meter.reset();
        self.controller.reset();
        self.scheduler.reset();
        self.ssrcs.clear();
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Expose the bound clock, mainly so tests holding a `MockClock` can
    /// advance it without threading a second handle through.
    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl<C: Clock> std::fmt::Debug for Estimator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Estimator")
            .field("estimate_bps", &self.estimate())
            .field("ssrc_count", &self.ssrcs.len())
            .finish()
    }
}

/// The production binding: a [`SystemClock`]-driven estimator.
pub type DefaultEstimator = Estimator<SystemClock>;

impl DefaultEstimator {
    pub fn new(config: Config) -> (Self, Vec<ConfigWarning>) {
        Self::with_clock(config, SystemClock::new())
    }
}

/// An estimator shared across threads behind a lock, for callers feeding it
/// from more than one task (e.g. an RTP receive loop and a feedback-send
/// timer).
pub type SharedEstimator<C> = Arc<parking_lot::Mutex<Estimator<C>>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use std::time::Duration;

    fn obs(clock: &MockClock, send_ticks: u32, size: u32, ssrc: u32) -> PacketObservation {
        PacketObservation::new(clock.now(), send_ticks, size, ssrc)
    }

    #[test]
    fn tracks_unique_ssrcs() {
        let clock = MockClock::new();
        let (mut e, _) = Estimator::with_clock(Config::default(), clock.clone());
        e.on_packet(obs(&clock, 0, 1200, 1));
        e.on_packet(obs(&clock, 0, 1200, 2));
        e.on_packet(obs(&clock, 0, 1200, 1));
        let mut ssrcs: Vec<_> = e.ssrcs().collect();
        ssrcs.sort();
        assert_eq!(ssrcs, vec![1, 2]);
    }

    #[test]
    fn stable_stream_converges_to_a_positive_estimate() {
        let clock = MockClock::new();
        let (mut e, warnings) = Estimator::with_clock(Config::default(), clock.clone());
        assert!(warnings.is_empty());

        for i in 0..500u32 {
            let ticks = ((i as f64 * 20.0) / 1000.0 * crate::time::TICKS_PER_SECOND) as u32;
            e.on_packet(obs(&clock, ticks, 1200, 1));
            clock.advance(Duration::from_millis(20));
        }
        assert!(e.estimate() > 0);
    }

    #[test]
    fn no_feedback_before_any_packet_observed() {
        let clock = MockClock::new();
        let (mut e, _) = Estimator::with_clock(Config::default(), clock.clone());
        assert!(e.maybe_emit_feedback().is_none());
    }

    #[test]
    fn scheduler_emits_on_first_estimate_then_respects_interval() {
        let clock = MockClock::new();
        let (mut e, _) = Estimator::with_clock(Config::default(), clock.clone());
        e.on_packet(obs(&clock, 0, 1200, 1));
        let feedback = e.maybe_emit_feedback().expect("first estimate should emit");
        assert_eq!(feedback.ssrcs, HashSet::from([1]));
        assert!(e.maybe_emit_feedback().is_none());
        clock.advance(Duration::from_secs(2));
        assert!(e.maybe_emit_feedback().is_some());
    }

    #[test]
    fn estimate_unchanged_while_rate_meter_has_too_few_samples() {
        let clock = MockClock::new();
        let (mut e, _) = Estimator::with_clock(Config::default(), clock.clone());
        let initial = e.estimate();
        // A single packet completes no burst and leaves the rate meter with
        // only one sample; the controller must not be touched.
        e.on_packet(obs(&clock, 0, 1200, 1));
        assert_eq!(e.estimate(), initial);
    }

    #[test]
    fn reset_clears_ssrcs_and_drops_to_initial_estimate() {
        let clock = MockClock::new();
        let (mut e, _) = Estimator::with_clock(Config::default(), clock.clone());
        e.on_packet(obs(&clock, 0, 1200, 7));
        e.reset();
        assert_eq!(e.ssrcs().count(), 0);
        assert_eq!(e.estimate(), e.config().controller.initial_bitrate_bps);
    }
}

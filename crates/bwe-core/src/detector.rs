//! Adaptive overuse detector: thresholds the filtered delay-variation
//! signal against an asymmetric, self-adjusting threshold.

use crate::clock::Instant;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Three-valued congestion signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Normal,
    Overusing,
    Underusing,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub initial_threshold_ms: f64,
    pub min_threshold_ms: f64,
    pub max_threshold_ms: f64,
    pub k_up: f64,
    pub k_down: f64,
    pub overuse_time_threshold: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            initial_threshold_ms: 12.5,
            min_threshold_ms: 6.0,
            max_threshold_ms: 600.0,
            k_up: 0.01,
            k_down: 0.00018,
            overuse_time_threshold: Duration::from_millis(10),
        }
    }
}

/// Invoked on every hypothesis transition with `(old, new)`.
pub type TransitionCallback = Box<dyn FnMut(Signal, Signal) + Send>;

pub struct OveruseDetector {
    config: DetectorConfig,
    threshold_ms: f64,
    hypothesis: Signal,
    overuse_began: Option<Instant>,
    overuse_counter: u32,
    prev_estimate: Option<f64>,
    last_threshold_update: Option<Instant>,
    on_transition: Option<TransitionCallback>,
}

impl OveruseDetector {
    pub fn new(config: DetectorConfig) -> Self {
        let threshold_ms = config.initial_threshold_ms;
        Self {
            config,
            threshold_ms,
            hypothesis: Signal::Normal,
            overuse_began: None,
            overuse_counter: 0,
            prev_estimate: None,
            last_threshold_update: None,
            on_transition: None,
        }
    }

    /// Register a subscriber notified on every hypothesis transition.
    pub fn set_transition_callback(&mut self, callback: TransitionCallback) {
        self.on_transition = Some(callback);
    }

    pub fn threshold_ms(&self) -> f64 {
        self.threshold_ms
    }

    pub fn hypothesis(&self) -> Signal {
        self.hypothesis
    }

    /// Feed the filtered estimate (ms) at `now` and return the congestion
    /// signal.
    pub fn detect(&mut self, estimate_ms: f64, now: Instant) -> Signal {
        self.update_threshold(estimate_ms, now);

        let new_hypothesis = if estimate_ms > self.threshold_ms {
            self.classify_overuse_candidate(estimate_ms, now)
        } else if estimate_ms < -self.threshold_ms {
            self.overuse_began = None;
            self.overuse_counter = 0;
            Signal::Underusing
        } else {
            self.overuse_began = None;
            self.overuse_counter = 0;
            Signal::Normal
        };

        if new_hypothesis != self.hypothesis {
            if let Some(cb) = self.on_transition.as_mut() {
                cb(self.hypothesis, new_hypothesis);
            }
            tracing::debug!(
                old = ?self.hypothesis,
                new = ?new_hypothesis,
                estimate_ms,
                threshold_ms = self.threshold_ms,
                "overuse detector hypothesis transition"
            );
        }
        self.hypothesis = new_hypothesis;
        self.prev_estimate = Some(estimate_ms);
        self.hypothesis
    }

    fn classify_overuse_candidate(&mut self, estimate_ms: f64, now: Instant) -> Signal {
        let began = *self.overuse_began.get_or_insert(now);
        let sustained = now.saturating_duration_since(began);
        self.overuse_counter += 1;

        let decreasing = self
            .prev_estimate
            .map(|prev| estimate_ms < prev)
            .unwrap_or(false);

        if decreasing {
            // Suppressed: above threshold but moving back down already.
            return Signal::Normal;
        }

        if sustained >= self.config.overuse_time_threshold && self.overuse_counter > 1 {
            Signal::Overusing
        } else {
            Signal::Normal
        }
    }

    fn update_threshold(&mut self, estimate_ms: f64, now: Instant) {
        let Some(last_update) = self.last_threshold_update else {
            self.last_threshold_update = Some(now);
            return;
        };
        let dt = now.saturating_duration_since(last_update).as_secs_f64();
        let k = if estimate_ms.abs() > self.threshold_ms {
            self.config.k_up
        } else {
            self.config.k_down
        };
        self.threshold_ms += dt * k * (estimate_ms.abs() - self.threshold_ms);
        self.threshold_ms = self
            .threshold_ms
            .clamp(self.config.min_threshold_ms, self.config.max_threshold_ms);
        self.last_threshold_update = Some(now);
    }

    pub fn reset(&mut self) {
        let config = self.config;
        let callback = self.on_transition.take();
        *self = OveruseDetector::new(config);
        self.on_transition = callback;
    }
}

impl std::fmt::Debug for OveruseDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OveruseDetector")
            .field("config", &self.config)
            .field("threshold_ms", &self.threshold_ms)
            .field("hypothesis", &self.hypothesis)
            .field("overuse_counter", &self.overuse_counter)
            .finish()
    }
}

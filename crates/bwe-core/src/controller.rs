//! AIMD rate controller: converts the congestion signal and the measured
//! incoming rate into an updated bandwidth estimate.

use crate::clock::Instant;
use crate::detector::Signal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub min_bitrate_bps: u64,
    pub max_bitrate_bps: u64,
    pub initial_bitrate_bps: u64,
    pub beta: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            min_bitrate_bps: 10_000,
            max_bitrate_bps: 30_000_000,
            initial_bitrate_bps: 300_000,
            beta: 0.85,
        }
    }
}

/// The one-second cap on the Increase branch's `Δt`; without it a long gap
/// since the last update would produce an estimate explosion.
const MAX_INCREASE_DELTA: Duration = Duration::from_secs(1);

/// The divergence cap: the estimate is never allowed to drift more than
/// this multiple above the measured incoming rate.
const DIVERGENCE_CAP: f64 = 1.5;

const INCREASE_FACTOR_PER_SECOND: f64 = 1.08;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Hold,
    Increase,
    Decrease,
}

pub struct AimdRateController {
    config: ControllerConfig,
    state: ControllerState,
    estimate_bps: f64,
    last_update: Option<Instant>,
}

impl AimdRateController {
    pub fn new(config: ControllerConfig) -> Self {
        let config = sanitize(config);
        Self {
            estimate_bps: config.initial_bitrate_bps as f64,
            config,
            state: ControllerState::Hold,
            last_update: None,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn estimate_bps(&self) -> u64 {
        self.estimate_bps.round() as u64
    }

    /// Advance the state machine and adjust the estimate. `incoming_rate_bps`
    /// is the measured rate from the incoming-rate meter.
    pub fn update(&mut self, signal: Signal, incoming_rate_bps: u64, now: Instant) -> u64 {
        let new_state = transition(self.state, signal);
        if new_state != self.state {
            tracing::debug!(old = ?self.state, new = ?new_state, "rate controller state transition");
        }
        self.state = new_state;

        match self.state {
            ControllerState::Decrease => {
                self.estimate_bps = self.config.beta * incoming_rate_bps as f64;
            }
            ControllerState::Increase => {
                let dt = self
                    .last_update
                    .map(|last| now.saturating_duration_since(last))
                    .unwrap_or(MAX_INCREASE_DELTA)
                    .min(MAX_INCREASE_DELTA);
                self.estimate_bps *= INCREASE_FACTOR_PER_SECOND.powf(dt.as_secs_f64());
            }
            ControllerState::Hold => {}
        }

        self.estimate_bps = self
            .estimate_bps
            .clamp(self.config.min_bitrate_bps as f64, self.config.max_bitrate_bps as f64);

        if incoming_rate_bps > 0 {
            let cap = DIVERGENCE_CAP * incoming_rate_bps as f64;
            if self.estimate_bps > cap {
                self.estimate_bps = cap;
            }
        }

        self.last_update = Some(now);
        self.estimate_bps()
    }

    pub fn reset(&mut self) {
        *self = AimdRateController::new(self.config);
    }
}

impl std::fmt::Debug for AimdRateController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AimdRateController")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("estimate_bps", &self.estimate_bps)
            .finish()
    }
}

/// The state-transition table from SPEC_FULL §4.7. Decrease + Normal goes
/// to Hold, never directly to Increase — this is what breaks oscillation.
fn transition(from: ControllerState, signal: Signal) -> ControllerState {
    use ControllerState::*;
    use Signal::*;
    match (from, signal) {
        (_, Overusing) => Decrease,
        (Decrease, Normal) => Hold,
        (_, Normal) => Increase,
        (_, Underusing) => Hold,
    }
}

fn sanitize(config: ControllerConfig) -> ControllerConfig {
    let default = ControllerConfig::default();
    ControllerConfig {
        min_bitrate_bps: if config.min_bitrate_bps > 0 {
            config.min_bitrate_bps
        } else {
            default.min_bitrate_bps
        },
        max_bitrate_bps: if config.max_bitrate_bps > 0 && config.max_bitrate_bps >= config.min_bitrate_bps {
            config.max_bitrate_bps
        } else {
            default.max_bitrate_bps
        },
        initial_bitrate_bps: if config.initial_bitrate_bps > 0 {
            config.initial_bitrate_bps
        } else {
            default.initial_bitrate_bps
        },
        beta: if config.beta > 0.0 && config.beta < 1.0 {
            config.beta
        } else {
            default.beta
        },
    }
}

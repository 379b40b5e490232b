//! The delay filter: smooths the noisy per-group delay-variation stream
//! into a single scalar the overuse detector can threshold against.
//!
//! Two interchangeable implementations share one capability — consume a
//! `(time_ms, delay_variation_ms)` pair, return a smoothed scalar — chosen
//! at construction and dispatched through a small non-allocating enum
//! rather than a trait object, so the hot path never goes through dynamic
//! dispatch (see SPEC_FULL §9).

pub mod kalman;
pub mod trendline;

pub use kalman::{KalmanConfig, KalmanFilter};
pub use trendline::{TrendlineConfig, TrendlineFilter};

use serde::{Deserialize, Serialize};

/// Which filter variant to instantiate. Carries its own config so
/// `Config::sanitize` can validate either branch independently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FilterConfig {
    Kalman(KalmanConfig),
    Trendline(TrendlineConfig),
}

impl Default for FilterConfig {
    fn default() -> Self {
        // WebRTC's shipping default is the trendline estimator; the Kalman
        // variant remains available as an interchangeable alternative.
        FilterConfig::Trendline(TrendlineConfig::default())
    }
}

/// Tagged-enum dispatch over the two filter implementations.
#[derive(Debug, Clone)]
pub enum DelayFilter {
    Kalman(KalmanFilter),
    Trendline(TrendlineFilter),
}

impl DelayFilter {
    pub fn new(config: FilterConfig) -> Self {
        match config {
            FilterConfig::Kalman(c) => DelayFilter::Kalman(KalmanFilter::new(c)),
            FilterConfig::Trendline(c) => DelayFilter::Trendline(TrendlineFilter::new(c)),
        }
    }

    /// Feed a new `(arrival time in ms, delay-variation sample in ms)` pair
    /// and return the filtered scalar to hand to the overuse detector.
    pub fn update(&mut self, t_arrival_ms: f64, delay_var_ms: f64) -> f64 {
        match self {
            DelayFilter::Kalman(f) => f.update(delay_var_ms),
            DelayFilter::Trendline(f) => f.update(t_arrival_ms, delay_var_ms),
        }
    }

    pub fn reset(&mut self) {
        match self {
            DelayFilter::Kalman(f) => f.reset(),
            DelayFilter::Trendline(f) => f.reset(),
        }
    }
}

//! Sliding-window linear-regression trendline variant of the delay filter.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Trendline filter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendlineConfig {
    /// Number of `(time, smoothed delay)` samples kept in the window.
    pub window_size: usize,
    /// Exponential smoothing coefficient `alpha`.
    pub smoothing_coef: f64,
    /// Threshold gain `gamma` applied to the fitted slope.
    pub threshold_gain: f64,
}

impl Default for TrendlineConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            smoothing_coef: 0.9,
            threshold_gain: 4.0,
        }
    }
}

/// Startup transients are capped by scaling the output by at most this many
/// samples' worth of slope.
const MAX_ADAPT_COUNT: u64 = 60;

#[derive(Debug, Clone, Copy)]
struct Sample {
    t_ms: f64,
    smoothed_delay: f64,
}

#[derive(Debug, Clone)]
pub struct TrendlineFilter {
    config: TrendlineConfig,
    history: VecDeque<Sample>,
    smoothed: f64,
    first_arrival_ms: Option<f64>,
    sample_count: u64,
}

impl TrendlineFilter {
    pub fn new(config: TrendlineConfig) -> Self {
        let window_size = config.window_size.max(2);
        Self {
            config: TrendlineConfig { window_size, ..config },
            history: VecDeque::with_capacity(window_size),
            smoothed: 0.0,
            first_arrival_ms: None,
            sample_count: 0,
        }
    }

    /// Feed `(arrival time in ms, raw delay-variation sample in ms)` and
    /// return the smoothed, gain-scaled trend.
    pub fn update(&mut self, t_arrival_ms: f64, delay_var_ms: f64) -> f64 {
        let t0 = *self.first_arrival_ms.get_or_insert(t_arrival_ms);
        self.smoothed =
            self.config.smoothing_coef * self.smoothed + (1.0 - self.config.smoothing_coef) * delay_var_ms;

        self.history.push_back(Sample {
            t_ms: t_arrival_ms - t0,
            smoothed_delay: self.smoothed,
        });
        while self.history.len() > self.config.window_size {
            self.history.pop_front();
        }
        self.sample_count += 1;

        let slope = self.fit_slope().unwrap_or(0.0);
        slope * self.sample_count.min(MAX_ADAPT_COUNT) as f64 * self.config.threshold_gain
    }

    fn fit_slope(&self) -> Option<f64> {
        if self.history.len() < 2 {
            return None;
        }
        let n = self.history.len() as f64;
        let sum_x: f64 = self.history.iter().map(|s| s.t_ms).sum();
        let sum_y: f64 = self.history.iter().map(|s| s.smoothed_delay).sum();
        let denom = n * self
            .history
            .iter()
            .map(|s| s.t_ms * s.t_ms)
            .sum::<f64>()
            - sum_x * sum_x;
        if denom == 0.0 {
            return None;
        }
        let numer = n * self
            .history
            .iter()
            .map(|s| s.t_ms * s.smoothed_delay)
            .sum::<f64>()
            - sum_x * sum_y;
        Some(numer / denom)
    }

    pub fn reset(&mut self) {
        let config = self.config;
        *self = TrendlineFilter::new(config);
    }
}

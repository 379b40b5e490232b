//! Aggregate configuration surface.
//!
//! [`Config`] bundles every component's configuration in one place so
//! callers building an [`crate::estimator::Estimator`] have a single value to
//! construct, serialize, and validate. Construction itself never fails;
//! [`Config::sanitize`] walks every field, substitutes a default for
//! anything out of range, and returns the warnings it logged along the way.

use crate::controller::ControllerConfig;
use crate::detector::DetectorConfig;
use crate::error::ConfigWarning;
use crate::filter::{FilterConfig, KalmanConfig, TrendlineConfig};
use crate::grouper::GrouperConfig;
use crate::rate_meter::RateMeterConfig;
use crate::scheduler::SchedulerConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    pub grouper: GrouperConfig,
    pub filter: FilterConfig,
    pub detector: DetectorConfig,
    pub rate_meter: RateMeterConfig,
    pub controller: ControllerConfig,
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Validate every field, substituting defaults for anything out of
    /// range. Returns the corrected config alongside the list of warnings
    /// raised, in field order. Each warning is also logged at `warn` level.
    pub fn sanitize(self) -> (Config, Vec<ConfigWarning>) {
        let mut warnings = Vec::new();

        let grouper = sanitize_grouper(self.grouper, &mut warnings);
        let filter = sanitize_filter(self.filter, &mut warnings);
        let detector = sanitize_detector(self.detector, &mut warnings);
        let rate_meter = sanitize_rate_meter(self.rate_meter, &mut warnings);
        let controller = sanitize_controller(self.controller, &mut warnings);
        let scheduler = sanitize_scheduler(self.scheduler, &mut warnings);

        for warning in &warnings {
            tracing::warn!(%warning, "configuration field substituted with default");
        }

        (
            Config {
                grouper,
                filter,
                detector,
                rate_meter,
                controller,
                scheduler,
            },
            warnings,
        )
    }
}

fn sanitize_grouper(config: GrouperConfig, warnings: &mut Vec<ConfigWarning>) -> GrouperConfig {
    if config.burst_threshold.is_zero() {
        warnings.push(ConfigWarning::GrouperBurstThresholdInvalid);
        GrouperConfig::default()
    } else {
        config
    }
}

fn sanitize_filter(config: FilterConfig, warnings: &mut Vec<ConfigWarning>) -> FilterConfig {
    match config {
        FilterConfig::Kalman(k) => FilterConfig::Kalman(sanitize_kalman(k, warnings)),
        FilterConfig::Trendline(t) => FilterConfig::Trendline(sanitize_trendline(t, warnings)),
    }
}

fn sanitize_kalman(mut config: KalmanConfig, warnings: &mut Vec<ConfigWarning>) -> KalmanConfig {
    let default = KalmanConfig::default();
    if !(config.process_noise > 0.0) {
        warnings.push(ConfigWarning::KalmanProcessNoiseInvalid);
        config.process_noise = default.process_noise;
    }
    if !(config.initial_error > 0.0) {
        warnings.push(ConfigWarning::KalmanInitialErrorInvalid);
        config.initial_error = default.initial_error;
    }
    if !(config.chi > 0.0 && config.chi < 1.0) {
        warnings.push(ConfigWarning::KalmanChiInvalid);
        config.chi = default.chi;
    }
    config
}

fn sanitize_trendline(mut config: TrendlineConfig, warnings: &mut Vec<ConfigWarning>) -> TrendlineConfig {
    let default = TrendlineConfig::default();
    if config.window_size < 2 {
        warnings.push(ConfigWarning::TrendlineWindowSizeInvalid);
        config.window_size = default.window_size;
    }
    if !(0.0..=1.0).contains(&config.smoothing_coef) {
        warnings.push(ConfigWarning::TrendlineSmoothingCoefInvalid);
        config.smoothing_coef = default.smoothing_coef;
    }
    if !(config.threshold_gain > 0.0) {
        warnings.push(ConfigWarning::TrendlineThresholdGainInvalid);
        config.threshold_gain = default.threshold_gain;
    }
    config
}

fn sanitize_detector(mut config: DetectorConfig, warnings: &mut Vec<ConfigWarning>) -> DetectorConfig {
    let default = DetectorConfig::default();
    if !(config.min_threshold_ms > 0.0) {
        warnings.push(ConfigWarning::DetectorMinThresholdInvalid);
        config.min_threshold_ms = default.min_threshold_ms;
    }
    if !(config.max_threshold_ms > config.min_threshold_ms) {
        warnings.push(ConfigWarning::DetectorMaxThresholdInvalid);
        config.max_threshold_ms = default.max_threshold_ms;
    }
    if !(config.initial_threshold_ms >= config.min_threshold_ms
        && config.initial_threshold_ms <= config.max_threshold_ms)
    {
        warnings.push(ConfigWarning::DetectorInitialThresholdInvalid);
        config.initial_threshold_ms = config
            .initial_threshold_ms
            .clamp(config.min_threshold_ms, config.max_threshold_ms);
    }
    if !(config.k_up > 0.0) {
        warnings.push(ConfigWarning::DetectorKUpInvalid);
        config.k_up = default.k_up;
    }
    if !(config.k_down > 0.0) {
        warnings.push(ConfigWarning::DetectorKDownInvalid);
        config.k_down = default.k_down;
    }
    config
}

fn sanitize_rate_meter(mut config: RateMeterConfig, warnings: &mut Vec<ConfigWarning>) -> RateMeterConfig {
    if config.window.is_zero() {
        warnings.push(ConfigWarning::RateMeterWindowInvalid);
        config.window = RateMeterConfig::default().window;
    }
    config
}

fn sanitize_controller(mut config: ControllerConfig, warnings: &mut Vec<ConfigWarning>) -> ControllerConfig {
    let default = ControllerConfig::default();
    if config.min_bitrate_bps == 0 {
        warnings.push(ConfigWarning::ControllerMinBitrateInvalid);
        config.min_bitrate_bps = default.min_bitrate_bps;
    }
    if config.max_bitrate_bps <= config.min_bitrate_bps {
        warnings.push(ConfigWarning::ControllerMaxBitrateInvalid);
        config.max_bitrate_bps = default.max_bitrate_bps;
    }
    if config.initial_bitrate_bps == 0 {
        warnings.push(ConfigWarning::ControllerInitialBitrateInvalid);
        config.initial_bitrate_bps = default.initial_bitrate_bps;
    }
    if !(config.beta > 0.0 && config.beta < 1.0) {
        warnings.push(ConfigWarning::ControllerBetaInvalid);
        config.beta = default.beta;
    }
    config
}

fn sanitize_scheduler(mut config: SchedulerConfig, warnings: &mut Vec<ConfigWarning>) -> SchedulerConfig {
    let default = SchedulerConfig::default();
    if config.interval.is_zero() {
        warnings.push(ConfigWarning::SchedulerIntervalInvalid);
        config.interval = default.interval;
    }
    if !(config.decrease_threshold > 0.0 && config.decrease_threshold < 1.0) {
        warnings.push(ConfigWarning::SchedulerDecreaseThresholdInvalid);
        config.decrease_threshold = default.decrease_threshold;
    }
    config
}

//! Configuration validation diagnostics.
//!
//! Construction is infallible: [`crate::config::Config::sanitize`] never
//! fails, it substitutes a default for any out-of-range field and reports
//! what it changed through this enum instead of panicking or staying silent.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConfigWarning {
    #[error("grouper.burst_threshold was zero, substituted default")]
    GrouperBurstThresholdInvalid,

    #[error("kalman.process_noise was not positive, substituted default")]
    KalmanProcessNoiseInvalid,

    #[error("kalman.initial_error was not positive, substituted default")]
    KalmanInitialErrorInvalid,

    #[error("kalman.chi was out of (0, 1), substituted default")]
    KalmanChiInvalid,

    #[error("trendline.window_size was below 2, clamped")]
    TrendlineWindowSizeInvalid,

    #[error("trendline.smoothing_coef was out of [0, 1], substituted default")]
    TrendlineSmoothingCoefInvalid,

    #[error("trendline.threshold_gain was not positive, substituted default")]
    TrendlineThresholdGainInvalid,

    #[error("detector.min_threshold_ms was not positive, substituted default")]
    DetectorMinThresholdInvalid,

    #[error("detector.max_threshold_ms was not greater than min_threshold_ms, substituted default")]
    DetectorMaxThresholdInvalid,

    #[error("detector.initial_threshold_ms was out of [min, max], clamped")]
    DetectorInitialThresholdInvalid,

    #[error("detector.k_up was not positive, substituted default")]
    DetectorKUpInvalid,

    #[error("detector.k_down was not positive, substituted default")]
    DetectorKDownInvalid,

    #[error("rate_meter.window was zero, substituted default")]
    RateMeterWindowInvalid,

    #[error("controller.min_bitrate_bps was zero, substituted default")]
    ControllerMinBitrateInvalid,

    #[error("controller.max_bitrate_bps was not greater than min_bitrate_bps, substituted default")]
    ControllerMaxBitrateInvalid,

    #[error("controller.initial_bitrate_bps was zero, substituted default")]
    ControllerInitialBitrateInvalid,

    #[error("controller.beta was out of (0, 1), substituted default")]
    ControllerBetaInvalid,

    #[error("scheduler.interval was zero, substituted default")]
    SchedulerIntervalInvalid,

    #[error("scheduler.decrease_threshold was out of (0, 1), substituted default")]
    SchedulerDecreaseThresholdInvalid,
}

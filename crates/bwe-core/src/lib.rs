//! Receiver-side delay-based bandwidth estimator (Google Congestion Control)
//! for RTP streams.
//!
//! Packets go in through [`estimator::Estimator::on_packet`]; a smoothed
//! bandwidth estimate and REMB feedback scheduling come out. The crate has
//! no dependency on an RTP stack: callers hand it [`packet::PacketObservation`]
//! values already parsed off the wire.

pub mod clock;
pub mod config;
pub mod controller;
pub mod detector;
pub mod error;
pub mod estimator;
pub mod filter;
pub mod grouper;
pub mod packet;
pub mod rate_meter;
pub mod scheduler;
pub mod time;

pub use clock::{Clock, Instant, MockClock, SystemClock};
pub use config::Config;
pub use controller::{AimdRateController, ControllerConfig, ControllerState};
pub use detector::{DetectorConfig, OveruseDetector, Signal};
pub use error::ConfigWarning;
pub use estimator::{DefaultEstimator, Estimator, RembFeedback, SharedEstimator};
pub use filter::{DelayFilter, FilterConfig, KalmanConfig, KalmanFilter, TrendlineConfig, TrendlineFilter};
pub use grouper::{DelayVariation, GrouperConfig, InterArrivalGrouper};
pub use packet::PacketObservation;
pub use rate_meter::{IncomingRateMeter, RateMeterConfig};
pub use scheduler::{RembScheduler, SchedulerConfig};

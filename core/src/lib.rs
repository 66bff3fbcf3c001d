//! Tracking and conversion core for the pendulum anemometer.
//!
//! A pendulum deflected by wind is tracked through two colour markers, its
//! angle is turned into a wind speed with `V = C · √tan θ`, and the result is
//! emitted over a serial link on an absolute, drift-free schedule. The
//! calibration constant `C` is authored offline and persisted as JSON.

pub mod calibration;
pub mod conversion;
pub mod emitter;
pub mod fit;
pub mod geometry;
pub mod math;
pub mod prelude;
pub mod telemetry;
pub mod vision;

pub use prelude::{
    AngleSample, CalibrationError, MarkerPair, OutputMode, Point2D, TrackingError, WindEstimate,
};

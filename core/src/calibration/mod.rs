//! Calibration constant persistence, averaging and resolution.

pub mod average;
pub mod record;
pub mod resolve;
pub mod store;

pub use average::{average_constant, BatchAverage, RejectedSample};
pub use record::{sample_constant, CalibrationRecord};
pub use resolve::{resolve_constant, ConstantSource, ResolvedConstant};
pub use store::{CalibrationStore, DEFAULT_CALIBRATION_FILE};

/// Constant used when neither an override nor a persisted record is available.
pub const DEFAULT_CONSTANT: f64 = 1.0;

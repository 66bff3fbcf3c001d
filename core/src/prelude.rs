use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;

/// Pixel coordinates of a marker centroid. Image y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Pivot/bob pair produced by a marker localizer for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerPair {
    pub pivot: Point2D,
    pub bob: Point2D,
}

impl MarkerPair {
    pub fn new(pivot: Point2D, bob: Point2D) -> Self {
        Self { pivot, bob }
    }
}

/// One deflection reading taken during a tracking cycle.
#[derive(Debug, Clone, Copy)]
pub struct AngleSample {
    pub angle_degrees: f64,
    pub timestamp: Instant,
}

/// What a cycle writes to the serial sink.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    WindSpeed,
    RawAngle,
}

/// Terminal value of one emission cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindEstimate {
    Speed { speed_mps: f64 },
    Angle { angle_degrees: f64 },
}

/// Errors that cost a tracking cycle its reading.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TrackingError {
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    #[error("marker localization miss: {0}")]
    MarkerMiss(String),
    #[error("angle {angle:.2} exceeds the {ceiling:.1} degree ceiling")]
    AboveCeiling { angle: f64, ceiling: f64 },
}

pub type TrackingResult<T> = Result<T, TrackingError>;

/// Errors raised while reading, validating or authoring calibration data.
#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error("no calibration record at {0}")]
    CalibrationNotFound(PathBuf),
    #[error("invalid calibration sample (angle {angle}, wind {wind}): {reason}")]
    InvalidCalibrationSample { angle: f64, wind: f64, reason: String },
    #[error("insufficient calibration data: {rejected} of {total} samples rejected")]
    InsufficientCalibrationData { total: usize, rejected: usize },
    #[error("corrupt calibration record {path}: {reason}")]
    CorruptRecord { path: PathBuf, reason: String },
    #[error("invalid calibration constant override {0}")]
    InvalidOverride(f64),
    #[error("calibration i/o on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type CalibrationResult<T> = Result<T, CalibrationError>;

/// Errors raised by offline model fitting.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("not enough valid samples after filtering: {0} (need at least 3)")]
    NotEnoughSamples(usize),
    #[error("degenerate data: {0}")]
    Degenerate(String),
}

pub type FitResult<T> = Result<T, FitError>;

use crate::prelude::{CalibrationError, CalibrationResult};
use serde::{Deserialize, Serialize};

/// Persisted calibration state: the constant and the samples it was averaged from.
///
/// `num_samples` is redundant with the list lengths and is kept consistent by
/// every mutation; [`CalibrationRecord::check`] rejects records where it is not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    #[serde(rename = "calibration_constant")]
    constant: f64,
    angle_measurements: Vec<f64>,
    wind_measurements: Vec<f64>,
    #[serde(rename = "num_samples")]
    sample_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
}

impl CalibrationRecord {
    /// First-run record: no samples, unit constant.
    pub fn empty() -> Self {
        Self {
            constant: super::DEFAULT_CONSTANT,
            angle_measurements: Vec::new(),
            wind_measurements: Vec::new(),
            sample_count: 0,
            notes: None,
        }
    }

    pub(crate) fn from_parts(constant: f64, pairs: &[(f64, f64)], notes: Option<String>) -> Self {
        Self {
            constant,
            angle_measurements: pairs.iter().map(|&(a, _)| a).collect(),
            wind_measurements: pairs.iter().map(|&(_, w)| w).collect(),
            sample_count: pairs.len(),
            notes,
        }
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn angle_measurements(&self) -> &[f64] {
        &self.angle_measurements
    }

    pub fn wind_measurements(&self) -> &[f64] {
        &self.wind_measurements
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Index-aligned (angle, wind) pairs in measurement order.
    pub fn pairs(&self) -> Vec<(f64, f64)> {
        self.angle_measurements
            .iter()
            .copied()
            .zip(self.wind_measurements.iter().copied())
            .collect()
    }

    pub(crate) fn push_sample(&mut self, angle: f64, wind: f64) {
        self.angle_measurements.push(angle);
        self.wind_measurements.push(wind);
        self.sample_count = self.angle_measurements.len();
    }

    pub(crate) fn set_constant(&mut self, constant: f64) {
        self.constant = constant;
    }

    /// Verifies the length and positivity invariants.
    pub fn check(&self) -> Result<(), String> {
        if !(self.constant.is_finite() && self.constant > 0.0) {
            return Err(format!("constant {} is not a positive number", self.constant));
        }
        if self.angle_measurements.len() != self.wind_measurements.len() {
            return Err(format!(
                "{} angle measurements but {} wind measurements",
                self.angle_measurements.len(),
                self.wind_measurements.len()
            ));
        }
        if self.sample_count != self.angle_measurements.len() {
            return Err(format!(
                "num_samples {} disagrees with {} measurements",
                self.sample_count,
                self.angle_measurements.len()
            ));
        }
        Ok(())
    }
}

/// Per-sample constant `wind / √tan(angle)`.
///
/// The angle must lie in (0°, 90°) and the wind speed must be positive; a
/// non-positive angle would put the ratio at infinity and poison the mean.
pub fn sample_constant(angle_degrees: f64, wind_mps: f64) -> CalibrationResult<f64> {
    let reject = |reason: &str| CalibrationError::InvalidCalibrationSample {
        angle: angle_degrees,
        wind: wind_mps,
        reason: reason.to_string(),
    };

    if !angle_degrees.is_finite() || !wind_mps.is_finite() {
        return Err(reject("values must be finite"));
    }
    if angle_degrees <= 0.0 {
        return Err(reject("angle must be positive"));
    }
    if angle_degrees >= 90.0 {
        return Err(reject("angle must be below 90 degrees"));
    }
    if wind_mps <= 0.0 {
        return Err(reject("wind speed must be positive"));
    }

    let tan_theta = angle_degrees.to_radians().tan();
    if tan_theta <= 0.0 {
        return Err(reject("tan(angle) must be positive"));
    }
    Ok(wind_mps / tan_theta.sqrt())
}

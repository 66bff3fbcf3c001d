use super::record::sample_constant;
use crate::math::stats::StatsHelper;
use crate::prelude::{CalibrationError, CalibrationResult};
use log::warn;

/// A pair that failed per-sample validation during batch averaging.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedSample {
    pub index: usize,
    pub angle: f64,
    pub wind: f64,
    pub reason: String,
}

/// Outcome of averaging a batch of (angle, wind) pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchAverage {
    pub constant: f64,
    /// Valid pairs in input order.
    pub accepted: Vec<(f64, f64)>,
    /// Per-sample constants, aligned with `accepted`.
    pub sample_constants: Vec<f64>,
    pub rejected: Vec<RejectedSample>,
}

impl BatchAverage {
    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    pub fn std_dev(&self) -> f64 {
        StatsHelper::std_dev(&self.sample_constants)
    }

    pub fn range(&self) -> Option<(f64, f64)> {
        StatsHelper::min_max(&self.sample_constants)
    }
}

/// Mean of `wind_i / √tan(angle_i)` over the valid pairs.
///
/// Malformed pairs are skipped and reported in `rejected`; the batch fails only
/// when no pair survives.
pub fn average_constant(pairs: &[(f64, f64)]) -> CalibrationResult<BatchAverage> {
    let mut accepted = Vec::with_capacity(pairs.len());
    let mut sample_constants = Vec::with_capacity(pairs.len());
    let mut rejected = Vec::new();

    for (index, &(angle, wind)) in pairs.iter().enumerate() {
        match sample_constant(angle, wind) {
            Ok(c) => {
                accepted.push((angle, wind));
                sample_constants.push(c);
            }
            Err(err) => {
                let reason = match err {
                    CalibrationError::InvalidCalibrationSample { reason, .. } => reason,
                    other => other.to_string(),
                };
                rejected.push(RejectedSample {
                    index,
                    angle,
                    wind,
                    reason,
                });
            }
        }
    }

    let constant = StatsHelper::mean(&sample_constants).ok_or(
        CalibrationError::InsufficientCalibrationData {
            total: pairs.len(),
            rejected: rejected.len(),
        },
    )?;

    if !rejected.is_empty() {
        warn!(
            "calibration batch: rejected {} of {} samples",
            rejected.len(),
            pairs.len()
        );
    }

    Ok(BatchAverage {
        constant,
        accepted,
        sample_constants,
        rejected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(angle: f64, wind: f64) -> f64 {
        wind / angle.to_radians().tan().sqrt()
    }

    #[test]
    fn averages_per_sample_ratios() {
        let pairs = [(15.5, 3.2), (20.1, 4.5), (25.3, 5.8)];
        let batch = average_constant(&pairs).unwrap();
        let expected = pairs.iter().map(|&(a, w)| ratio(a, w)).sum::<f64>() / 3.0;
        assert!((batch.constant - expected).abs() < 1e-9);
        assert_eq!(batch.rejected_count(), 0);
        assert_eq!(batch.accepted.len(), 3);
    }

    #[test]
    fn partial_batch_uses_valid_subset() {
        let pairs = [(15.5, 3.2), (-2.0, 1.0), (0.0, 2.0), (25.3, 5.8)];
        let batch = average_constant(&pairs).unwrap();
        let expected = (ratio(15.5, 3.2) + ratio(25.3, 5.8)) / 2.0;
        assert!((batch.constant - expected).abs() < 1e-9);
        assert_eq!(batch.rejected_count(), 2);
        assert_eq!(batch.rejected[0].index, 1);
        assert_eq!(batch.rejected[1].index, 2);
    }

    #[test]
    fn all_malformed_batch_fails() {
        let err = average_constant(&[(-1.0, 2.0), (0.0, 3.0)]).unwrap_err();
        assert!(matches!(
            err,
            CalibrationError::InsufficientCalibrationData {
                total: 2,
                rejected: 2
            }
        ));
    }

    #[test]
    fn empty_batch_fails() {
        assert!(matches!(
            average_constant(&[]),
            Err(CalibrationError::InsufficientCalibrationData { total: 0, .. })
        ));
    }

    #[test]
    fn spread_is_reported() {
        let batch = average_constant(&[(10.0, 2.0), (30.0, 5.0)]).unwrap();
        let (lo, hi) = batch.range().unwrap();
        assert!(lo < hi);
        assert!(batch.std_dev() > 0.0);
    }
}

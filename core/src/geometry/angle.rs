use crate::prelude::{AngleSample, MarkerPair, Point2D, TrackingError, TrackingResult};
use std::time::Instant;

/// Signed deflection of the pivot→bob vector from the downward vertical, in degrees.
///
/// Positive when the bob sits at larger x than the pivot. The bob must hang
/// below the pivot (image y grows downward); anything else has no deflection
/// inside (−90°, 90°) and is reported as degenerate.
pub fn estimate_angle(pivot: Point2D, bob: Point2D) -> TrackingResult<f64> {
    let dx = bob.x - pivot.x;
    let dy = bob.y - pivot.y;

    if !dx.is_finite() || !dy.is_finite() {
        return Err(TrackingError::DegenerateGeometry(
            "non-finite marker coordinates".into(),
        ));
    }
    if dx == 0.0 && dy == 0.0 {
        return Err(TrackingError::DegenerateGeometry(format!(
            "pivot and bob coincide at ({:.1}, {:.1})",
            pivot.x, pivot.y
        )));
    }
    if dy <= 0.0 {
        return Err(TrackingError::DegenerateGeometry(format!(
            "bob ({:.1}, {:.1}) is not below pivot ({:.1}, {:.1})",
            bob.x, bob.y, pivot.x, pivot.y
        )));
    }

    let theta = dx.atan2(dy).to_degrees();
    // atan2 rounds to ±π/2 once dy vanishes next to dx.
    if theta.abs() >= 90.0 {
        return Err(TrackingError::DegenerateGeometry(format!(
            "bob ({:.1}, {:.1}) is level with pivot ({:.1}, {:.1})",
            bob.x, bob.y, pivot.x, pivot.y
        )));
    }
    Ok(theta)
}

/// Estimates the angle for a localized pair and stamps it with `timestamp`.
pub fn sample_angle(markers: &MarkerPair, timestamp: Instant) -> TrackingResult<AngleSample> {
    let angle_degrees = estimate_angle(markers.pivot, markers.bob)?;
    Ok(AngleSample {
        angle_degrees,
        timestamp,
    })
}

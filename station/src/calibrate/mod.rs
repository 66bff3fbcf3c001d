//! Operator-facing calibration workflows over the shared calibration store.

pub mod batch;
pub mod session;
pub mod show;

use pendulumcore::calibration::BatchAverage;
use std::io::{self, Write};

/// Mean, spread and range of the per-sample constants.
pub fn write_batch_summary<W: Write>(out: &mut W, batch: &BatchAverage) -> io::Result<()> {
    writeln!(out, "Number of measurements: {}", batch.accepted.len())?;
    writeln!(out, "Average C: {:.6}", batch.constant)?;
    if batch.accepted.len() > 1 {
        writeln!(out, "Standard deviation: {:.6}", batch.std_dev())?;
        if let Some((min, max)) = batch.range() {
            writeln!(out, "C range: {:.6} to {:.6}", min, max)?;
        }
    }
    if batch.rejected_count() > 0 {
        writeln!(out, "Rejected samples: {}", batch.rejected_count())?;
        for rejected in &batch.rejected {
            writeln!(
                out,
                "  #{} angle {} wind {}: {}",
                rejected.index + 1,
                rejected.angle,
                rejected.wind,
                rejected.reason
            )?;
        }
    }
    Ok(())
}

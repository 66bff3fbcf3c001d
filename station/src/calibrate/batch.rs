use anyhow::Context;
use log::warn;
use pendulumcore::calibration::{BatchAverage, CalibrationRecord, CalibrationStore};
use std::fs;
use std::path::Path;

/// `angle,wind` rows read from a measurement file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementFile {
    pub pairs: Vec<(f64, f64)>,
    /// Non-blank rows that did not hold two numbers (header excluded).
    pub unreadable_rows: usize,
}

impl MeasurementFile {
    pub fn parse(contents: &str) -> Self {
        let mut parsed = Self::default();
        let mut first = true;
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match parse_pair(line) {
                Some(pair) => parsed.pairs.push(pair),
                None if first => {}
                None => parsed.unreadable_rows += 1,
            }
            first = false;
        }
        parsed
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading measurements {}", path.display()))?;
        Ok(Self::parse(&contents))
    }
}

fn parse_pair(line: &str) -> Option<(f64, f64)> {
    let mut fields = line.split(',').map(str::trim);
    let angle = fields.next()?.parse().ok()?;
    let wind = fields.next()?.parse().ok()?;
    Some((angle, wind))
}

/// Replaces the stored record with the average over a measurement file.
pub fn calibrate_from_file(
    store: &CalibrationStore,
    path: &Path,
) -> anyhow::Result<(CalibrationRecord, BatchAverage)> {
    let measurements = MeasurementFile::load(path)?;
    if measurements.unreadable_rows > 0 {
        warn!(
            "skipped {} unreadable rows in {}",
            measurements.unreadable_rows,
            path.display()
        );
    }
    anyhow::ensure!(
        !measurements.pairs.is_empty(),
        "no valid measurements found in {}",
        path.display()
    );
    let notes = format!("Loaded from {}", path.display());
    store
        .replace(&measurements.pairs, Some(notes))
        .with_context(|| format!("calibrating from {}", path.display()))
}

use super::average::{average_constant, BatchAverage};
use super::record::{sample_constant, CalibrationRecord};
use crate::prelude::{CalibrationError, CalibrationResult};
use crate::telemetry::log::LogManager;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const DEFAULT_CALIBRATION_FILE: &str = "pendulum_calibration.json";

/// File-backed owner of the calibration record.
///
/// Writes go to a temporary file in the target directory which is then renamed
/// over the record, so a concurrent reader sees either the old or the new
/// record, never a partial one.
pub struct CalibrationStore {
    path: PathBuf,
    logger: LogManager,
}

impl CalibrationStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            logger: LogManager::new("calibration"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> CalibrationResult<CalibrationRecord> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(CalibrationError::CalibrationNotFound(self.path.clone()))
            }
            Err(source) => {
                return Err(CalibrationError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let record: CalibrationRecord =
            serde_json::from_str(&contents).map_err(|err| self.corrupt(err.to_string()))?;
        record.check().map_err(|reason| self.corrupt(reason))?;
        Ok(record)
    }

    /// Like [`load`](Self::load) but starts from an empty record on first run.
    pub fn load_or_empty(&self) -> CalibrationResult<CalibrationRecord> {
        match self.load() {
            Err(CalibrationError::CalibrationNotFound(_)) => Ok(CalibrationRecord::empty()),
            other => other,
        }
    }

    /// Replaces the persisted record atomically.
    pub fn save(&self, record: &CalibrationRecord) -> CalibrationResult<()> {
        record
            .check()
            .map_err(|reason| self.corrupt(format!("refusing to save: {reason}")))?;

        let mut payload = serde_json::to_string_pretty(record)
            .map_err(|err| self.corrupt(err.to_string()))?;
        payload.push('\n');

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|source| self.io(source))?;

        let mut temp = NamedTempFile::new_in(&dir).map_err(|source| self.io(source))?;
        temp.write_all(payload.as_bytes())
            .map_err(|source| self.io(source))?;
        temp.as_file().sync_all().map_err(|source| self.io(source))?;
        temp.persist(&self.path)
            .map_err(|err| self.io(err.error))?;

        self.logger.record(&format!(
            "saved C = {:.6} from {} samples to {}",
            record.constant(),
            record.sample_count(),
            self.path.display()
        ));
        Ok(())
    }

    /// Appends one pair, re-averages over every stored sample and persists.
    pub fn add_sample(&self, angle: f64, wind: f64) -> CalibrationResult<CalibrationRecord> {
        sample_constant(angle, wind)?;

        let mut record = self.load_or_empty()?;
        record.push_sample(angle, wind);
        let batch = average_constant(&record.pairs())?;
        record.set_constant(batch.constant);

        self.save(&record)?;
        Ok(record)
    }

    /// Overwrites the record with a freshly averaged batch.
    ///
    /// Only accepted pairs are stored, so the stored constant is always the
    /// mean over the stored samples.
    pub fn replace(
        &self,
        pairs: &[(f64, f64)],
        notes: Option<String>,
    ) -> CalibrationResult<(CalibrationRecord, BatchAverage)> {
        let batch = average_constant(pairs)?;
        let record = CalibrationRecord::from_parts(batch.constant, &batch.accepted, notes);
        self.save(&record)?;
        Ok((record, batch))
    }

    fn corrupt(&self, reason: String) -> CalibrationError {
        CalibrationError::CorruptRecord {
            path: self.path.clone(),
            reason,
        }
    }

    fn io(&self, source: std::io::Error) -> CalibrationError {
        CalibrationError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

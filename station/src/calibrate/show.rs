use pendulumcore::calibration::CalibrationStore;
use pendulumcore::prelude::CalibrationError;
use std::io::Write;

pub fn show_calibration<W: Write>(store: &CalibrationStore, out: &mut W) -> anyhow::Result<()> {
    match store.load() {
        Ok(record) => {
            writeln!(out, "Current calibration constant: C = {:.6}", record.constant())?;
            writeln!(out, "Based on {} measurements", record.sample_count())?;
            if let Some(notes) = record.notes() {
                writeln!(out, "Notes: {notes}")?;
            }
        }
        Err(CalibrationError::CalibrationNotFound(path)) => {
            writeln!(out, "No calibration found.")?;
            writeln!(out, "Expected file: {}", path.display())?;
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn render(store: &CalibrationStore) -> anyhow::Result<String> {
        let mut out = Vec::new();
        show_calibration(store, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn shows_constant_and_count() {
        let dir = tempdir().unwrap();
        let store = CalibrationStore::new(dir.path().join("cal.json"));
        store.replace(&[(15.5, 3.2)], Some("rooftop".into())).unwrap();
        let text = render(&store).unwrap();
        assert!(text.contains("C = 6.07"));
        assert!(text.contains("Based on 1 measurements"));
        assert!(text.contains("Notes: rooftop"));
    }

    #[test]
    fn missing_record_is_reported_not_failed() {
        let dir = tempdir().unwrap();
        let store = CalibrationStore::new(dir.path().join("cal.json"));
        assert!(render(&store).unwrap().starts_with("No calibration found."));
    }

    #[test]
    fn corrupt_record_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cal.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(render(&CalibrationStore::new(path)).is_err());
    }
}

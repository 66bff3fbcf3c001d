use super::write_batch_summary;
use anyhow::Context;
use pendulumcore::calibration::{sample_constant, CalibrationRecord, CalibrationStore};
use std::io::{BufRead, Write};

const RULE: &str = "============================================================";

/// Prompt-driven calibration: collects `(angle, wind)` pairs until `done`
/// or end of input, then replaces the stored record with their average.
pub struct InteractiveSession<R, W> {
    input: R,
    output: W,
}

enum Entry {
    Value(String),
    Done,
}

impl<R: BufRead, W: Write> InteractiveSession<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Returns `None` when no measurement was entered; nothing is saved then.
    pub fn run(&mut self, store: &CalibrationStore) -> anyhow::Result<Option<CalibrationRecord>> {
        writeln!(self.output, "{RULE}")?;
        writeln!(self.output, "PENDULUM CALIBRATION - INTERACTIVE MODE")?;
        writeln!(self.output, "{RULE}")?;
        writeln!(self.output, "Formula: V = C * sqrt(tan(angle))")?;
        writeln!(self.output, "Enter measurements (type 'done' when finished):")?;
        writeln!(self.output)?;

        let pairs = self.collect()?;
        if pairs.is_empty() {
            writeln!(self.output, "No measurements entered.")?;
            return Ok(None);
        }

        let notes = match self.prompt("Optional notes (e.g., weather conditions, setup): ")? {
            Entry::Value(notes) if !notes.is_empty() => Some(notes),
            _ => None,
        };

        let (record, batch) = store
            .replace(&pairs, notes)
            .context("saving interactive calibration")?;
        writeln!(self.output)?;
        writeln!(self.output, "{RULE}")?;
        writeln!(self.output, "CALIBRATION RESULTS")?;
        writeln!(self.output, "{RULE}")?;
        write_batch_summary(&mut self.output, &batch)?;
        writeln!(
            self.output,
            "Calibration saved to {} (C = {:.6})",
            store.path().display(),
            record.constant()
        )?;
        Ok(Some(record))
    }

    fn collect(&mut self) -> anyhow::Result<Vec<(f64, f64)>> {
        let mut pairs = Vec::new();
        loop {
            let n = pairs.len() + 1;
            let angle = match self.prompt(&format!("Measurement {n} - Angle (degrees): "))? {
                Entry::Value(text) if text.eq_ignore_ascii_case("done") => break,
                Entry::Value(text) => text,
                Entry::Done => break,
            };
            let wind = match self.prompt(&format!("Measurement {n} - Wind speed (m/s): "))? {
                Entry::Value(text) => text,
                Entry::Done => break,
            };

            match self.evaluate(&angle, &wind) {
                Ok((pair, constant)) => {
                    writeln!(self.output, "  -> C for this sample: {constant:.6}")?;
                    writeln!(self.output)?;
                    pairs.push(pair);
                }
                Err(reason) => {
                    writeln!(self.output, "Error: {reason}. Please try again.")?;
                    writeln!(self.output)?;
                }
            }
        }
        Ok(pairs)
    }

    fn evaluate(&self, angle: &str, wind: &str) -> Result<((f64, f64), f64), String> {
        let angle: f64 = angle
            .parse()
            .map_err(|_| format!("'{angle}' is not a number"))?;
        let wind: f64 = wind.parse().map_err(|_| format!("'{wind}' is not a number"))?;
        let constant = sample_constant(angle, wind).map_err(|err| err.to_string())?;
        Ok(((angle, wind), constant))
    }

    fn prompt(&mut self, label: &str) -> anyhow::Result<Entry> {
        write!(self.output, "{label}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line).context("reading operator input")? == 0 {
            return Ok(Entry::Done);
        }
        Ok(Entry::Value(line.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn run_session(script: &str, store: &CalibrationStore) -> (Option<CalibrationRecord>, String) {
        let mut output = Vec::new();
        let record = InteractiveSession::new(Cursor::new(script.as_bytes()), &mut output)
            .run(store)
            .unwrap();
        (record, String::from_utf8(output).unwrap())
    }

    #[test]
    fn session_averages_and_saves_notes() {
        let dir = tempdir().unwrap();
        let store = CalibrationStore::new(dir.path().join("cal.json"));
        let (record, transcript) =
            run_session("15.5\n3.2\n20.1\n4.5\nDONE\nbreezy afternoon\n", &store);

        let record = record.unwrap();
        assert_eq!(record.sample_count(), 2);
        assert_eq!(record.notes(), Some("breezy afternoon"));
        assert_eq!(store.load().unwrap(), record);
        assert!(transcript.contains("C for this sample: 6.07"));
        assert!(transcript.contains("Standard deviation:"));
    }

    #[test]
    fn invalid_entries_are_reprompted() {
        let dir = tempdir().unwrap();
        let store = CalibrationStore::new(dir.path().join("cal.json"));
        let (record, transcript) = run_session("abc\n1\n-5\n2\n15.5\n3.2\ndone\n\n", &store);

        let record = record.unwrap();
        assert_eq!(record.sample_count(), 1);
        assert_eq!(record.notes(), None);
        assert_eq!(transcript.matches("Please try again").count(), 2);
        assert_eq!(transcript.matches("Measurement 1 - Angle").count(), 3);
    }

    #[test]
    fn no_measurements_saves_nothing() {
        let dir = tempdir().unwrap();
        let store = CalibrationStore::new(dir.path().join("cal.json"));
        let (record, transcript) = run_session("done\n", &store);
        assert!(record.is_none());
        assert!(transcript.contains("No measurements entered."));
        assert!(store.load().is_err());
    }

    #[test]
    fn end_of_input_finishes_the_session() {
        let dir = tempdir().unwrap();
        let store = CalibrationStore::new(dir.path().join("cal.json"));
        let (record, _) = run_session("15.5\n3.2\n30.0\n", &store);
        assert_eq!(record.unwrap().sample_count(), 1);
    }
}

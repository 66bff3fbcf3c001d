use super::csv_log::CsvLog;
use super::{GROUND_TRUTH_COLUMN, STUDENT_COLUMN};
use anyhow::Context;
use log::info;
use pendulumcore::fit::{fit_models, FitOptions, FitReport, FittedModel, ModelSelection};
use std::fs;
use std::io::Write;
use std::path::Path;

pub const DEFAULT_REPORT_FILE: &str = "pendulum_fit.json";

/// Fits the selected models to the `(angle, ground truth)` pairs of a log.
pub fn fit_log(
    log: &CsvLog,
    options: &FitOptions,
    selection: ModelSelection,
) -> anyhow::Result<FitReport> {
    let gt = log.require_column(GROUND_TRUTH_COLUMN)?;
    let student = log.require_column(STUDENT_COLUMN)?;
    let pairs = log.numeric_pairs(student, gt);
    anyhow::ensure!(!pairs.is_empty(), "no valid data rows in log");
    info!("fitting {} samples (student angle deg, ground truth m/s)", pairs.len());

    let (angles, speeds): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
    fit_models(&angles, &speeds, options, selection).context("no model could be fitted")
}

pub fn save_report<P: AsRef<Path>>(report: &FitReport, path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    let mut json = serde_json::to_string_pretty(report).context("serializing fit report")?;
    json.push('\n');
    fs::write(path, json).with_context(|| format!("writing fit report {}", path.display()))
}

pub fn load_report<P: AsRef<Path>>(path: P) -> anyhow::Result<FitReport> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading fit report {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parsing fit report {}", path.display()))
}

fn describe(out: &mut impl Write, label: &str, fitted: &FittedModel) -> std::io::Result<()> {
    writeln!(out, "{label}: {:?}", fitted.model)?;
    writeln!(
        out,
        "  samples {}, MAE {:.4} m/s, RMSE {:.4} m/s, MAPE {:.2}%",
        fitted.samples, fitted.metrics.mae, fitted.metrics.rmse, fitted.metrics.mape_pct
    )
}

pub fn write_fit_summary<W: Write>(out: &mut W, report: &FitReport) -> std::io::Result<()> {
    if let Some(single) = &report.single {
        describe(out, "V = C * sqrt(tan|theta|)", single)?;
    }
    if let Some(power_law) = &report.power_law {
        describe(out, "V = A * tan|theta|^p", power_law)?;
    }
    if let Some(best) = report.recommended_model() {
        writeln!(
            out,
            "Recommended model based on RMSE: {} (RMSE={:.4} m/s)",
            best.model.name(),
            best.metrics.rmse
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pendulumcore::conversion::SpeedModel;
    use pendulumcore::fit::ModelKind;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use tempfile::tempdir;

    fn calibration_log(model: SpeedModel, noise: f64) -> CsvLog {
        let mut rng = StdRng::seed_from_u64(7);
        let mut text = String::from("timestamp_iso,ground_truth_mps,student_mps\n");
        for i in 0..40 {
            let angle = 2.0 + i as f64;
            let speed = model.speed(angle) + rng.gen_range(-noise..=noise);
            text.push_str(&format!("t{i},{speed},{angle}\n"));
        }
        text.push_str("bad,,\n");
        CsvLog::parse(&text).unwrap()
    }

    #[test]
    fn fitting_a_log_recovers_the_generating_model() {
        let log = calibration_log(SpeedModel::PowerLaw { a: 5.0, p: 0.7 }, 0.0);
        let report = fit_log(&log, &FitOptions::default(), ModelSelection::Both).unwrap();
        assert_eq!(report.recommended, ModelKind::PowerLaw);
        match report.recommended_model().unwrap().model {
            SpeedModel::PowerLaw { a, p } => {
                assert!((a - 5.0).abs() < 1e-6);
                assert!((p - 0.7).abs() < 1e-6);
            }
            other => panic!("unexpected model {other:?}"),
        }
    }

    #[test]
    fn report_survives_a_save_load_cycle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fit.json");
        let log = calibration_log(SpeedModel::Single { c: 6.0 }, 0.05);
        let report = fit_log(&log, &FitOptions::default(), ModelSelection::Single).unwrap();
        assert!(report.power_law.is_none());

        save_report(&report, &path).unwrap();
        assert_eq!(load_report(&path).unwrap(), report);

        let mut summary = Vec::new();
        write_fit_summary(&mut summary, &report).unwrap();
        assert!(String::from_utf8(summary).unwrap().contains("Recommended model based on RMSE: single"));
    }

    #[test]
    fn log_without_reference_column_fails() {
        let log = CsvLog::parse("student_mps\n10\n20\n30\n").unwrap();
        assert!(fit_log(&log, &FitOptions::default(), ModelSelection::Both).is_err());
    }
}

use super::csv_log::CsvLog;
use super::{GROUND_TRUTH_COLUMN, STUDENT_COLUMN};
use pendulumcore::conversion::SpeedModel;
use pendulumcore::fit::{FitReport, ModelKind};
use std::str::FromStr;

/// Which fitted model(s) to evaluate over a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyChoice {
    /// The report's recommended model.
    Auto,
    Single,
    PowerLaw,
    Both,
}

impl FromStr for ApplyChoice {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "auto" => Ok(ApplyChoice::Auto),
            "single" => Ok(ApplyChoice::Single),
            "power-law" | "power_law" => Ok(ApplyChoice::PowerLaw),
            "both" => Ok(ApplyChoice::Both),
            other => Err(format!("unknown model '{other}'")),
        }
    }
}

pub fn select_models(report: &FitReport, choice: ApplyChoice) -> anyhow::Result<Vec<SpeedModel>> {
    let kinds = match choice {
        ApplyChoice::Auto => vec![report.recommended],
        ApplyChoice::Single => vec![ModelKind::Single],
        ApplyChoice::PowerLaw => vec![ModelKind::PowerLaw],
        ApplyChoice::Both => vec![ModelKind::Single, ModelKind::PowerLaw],
    };
    kinds
        .into_iter()
        .map(|kind| {
            report
                .model(kind)
                .map(|fitted| fitted.model)
                .ok_or_else(|| anyhow::anyhow!("fit report has no {kind:?} model"))
        })
        .collect()
}

/// Appends estimated speed and error columns for each model.
///
/// Speed columns come first, then absolute errors, then percentage errors.
/// Error cells stay blank when the row has no reference speed; the
/// percentage is also blank for a zero reference.
pub fn apply_models(log: &CsvLog, models: &[SpeedModel]) -> anyhow::Result<CsvLog> {
    let student = log.require_column(STUDENT_COLUMN)?;
    let gt = log.column(GROUND_TRUTH_COLUMN);

    let mut header = log.header.clone();
    for prefix in ["student", "err"] {
        header.extend(models.iter().map(|m| format!("{prefix}_{}_mps", m.name())));
    }
    header.extend(models.iter().map(|m| format!("err_{}_pct", m.name())));

    let rows = log
        .rows
        .iter()
        .map(|row| {
            let angle = CsvLog::number(row, student);
            let truth = gt.and_then(|index| CsvLog::number(row, index));
            let estimates: Vec<Option<f64>> = models
                .iter()
                .map(|model| angle.map(|theta| model.speed(theta)))
                .collect();

            let mut out = row.clone();
            out.extend(estimates.iter().map(|v| cell(*v, 6)));
            out.extend(
                estimates
                    .iter()
                    .map(|v| cell(v.zip(truth).map(|(v, t)| v - t), 6)),
            );
            out.extend(estimates.iter().map(|v| {
                let pct = v
                    .zip(truth)
                    .filter(|&(_, t)| t != 0.0)
                    .map(|(v, t)| (v - t) / t * 100.0);
                cell(pct, 3)
            }));
            out
        })
        .collect();

    Ok(CsvLog { header, rows })
}

fn cell(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.decimals$}"),
        _ => String::new(),
    }
}

use crate::conversion::SpeedModel;
use crate::math::regression::LinearFit;
use crate::math::stats::StatsHelper;
use crate::prelude::{FitError, FitResult};
use log::warn;
use serde::{Deserialize, Serialize};

const MIN_FIT_SAMPLES: usize = 3;

/// Sample filters applied before either model is fitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    pub min_speed: f64,
    pub min_angle_deg: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            min_speed: 0.5,
            min_angle_deg: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Single,
    PowerLaw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSelection {
    Single,
    PowerLaw,
    Both,
}

impl ModelSelection {
    fn includes(self, kind: ModelKind) -> bool {
        matches!(
            (self, kind),
            (ModelSelection::Both, _)
                | (ModelSelection::Single, ModelKind::Single)
                | (ModelSelection::PowerLaw, ModelKind::PowerLaw)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub mape_pct: f64,
}

impl FitMetrics {
    fn compute(truth: &[f64], predicted: &[f64]) -> Self {
        let errors: Vec<f64> = predicted.iter().zip(truth).map(|(p, t)| p - t).collect();
        let abs: Vec<f64> = errors.iter().map(|e| e.abs()).collect();
        let pct: Vec<f64> = abs
            .iter()
            .zip(truth)
            .map(|(e, t)| e / t.abs().max(1e-9))
            .collect();
        Self {
            mae: StatsHelper::mean(&abs).unwrap_or(0.0),
            rmse: StatsHelper::rms(&errors),
            mape_pct: StatsHelper::mean(&pct).unwrap_or(0.0) * 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    #[serde(flatten)]
    pub model: SpeedModel,
    pub metrics: FitMetrics,
    pub samples: usize,
}

/// Result of a fitting run, persisted as JSON by the offline tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub options: FitOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single: Option<FittedModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_law: Option<FittedModel>,
    pub recommended: ModelKind,
}

impl FitReport {
    pub fn model(&self, kind: ModelKind) -> Option<&FittedModel> {
        match kind {
            ModelKind::Single => self.single.as_ref(),
            ModelKind::PowerLaw => self.power_law.as_ref(),
        }
    }

    pub fn recommended_model(&self) -> Option<&FittedModel> {
        self.model(self.recommended)
    }
}

struct Filtered {
    speeds: Vec<f64>,
    tans: Vec<f64>,
}

fn filter_samples(angles_deg: &[f64], speeds: &[f64], options: &FitOptions) -> FitResult<Filtered> {
    let min_angle = options.min_angle_deg.to_radians();
    let mut filtered = Filtered {
        speeds: Vec::new(),
        tans: Vec::new(),
    };

    for (&theta, &v) in angles_deg.iter().zip(speeds) {
        if !theta.is_finite() || !v.is_finite() {
            continue;
        }
        let theta_rad = theta.abs().to_radians();
        let tan_theta = theta_rad.tan();
        if theta_rad >= min_angle && tan_theta > 0.0 && v >= options.min_speed {
            filtered.speeds.push(v);
            filtered.tans.push(tan_theta);
        }
    }

    if filtered.tans.len() < MIN_FIT_SAMPLES {
        return Err(FitError::NotEnoughSamples(filtered.tans.len()));
    }
    Ok(filtered)
}

/// Least-squares `C` for `V = C · √tan|θ|`: `Σ(s·v) / Σ(s²)` with `s = √tan|θ|`.
pub fn fit_single(angles_deg: &[f64], speeds: &[f64], options: &FitOptions) -> FitResult<FittedModel> {
    let data = filter_samples(angles_deg, speeds, options)?;
    let roots: Vec<f64> = data.tans.iter().map(|t| t.sqrt()).collect();

    let num: f64 = roots.iter().zip(&data.speeds).map(|(s, v)| s * v).sum();
    let den: f64 = roots.iter().map(|s| s * s).sum();
    if den <= 0.0 {
        return Err(FitError::Degenerate(
            "denominator for C is non-positive".into(),
        ));
    }
    let c = num / den;

    let predicted: Vec<f64> = roots.iter().map(|s| c * s).collect();
    Ok(FittedModel {
        model: SpeedModel::Single { c },
        metrics: FitMetrics::compute(&data.speeds, &predicted),
        samples: roots.len(),
    })
}

/// `V = A · tan|θ|^p` by linear regression of `ln V` on `ln tan|θ|`.
pub fn fit_power_law(
    angles_deg: &[f64],
    speeds: &[f64],
    options: &FitOptions,
) -> FitResult<FittedModel> {
    let data = filter_samples(angles_deg, speeds, options)?;
    let (tans, truth): (Vec<f64>, Vec<f64>) = data
        .tans
        .iter()
        .zip(&data.speeds)
        .filter(|(t, v)| **t > 0.0 && **v > 0.0)
        .map(|(t, v)| (*t, *v))
        .unzip();
    if tans.len() < MIN_FIT_SAMPLES {
        return Err(FitError::NotEnoughSamples(tans.len()));
    }

    let z: Vec<f64> = tans.iter().map(|t| t.ln()).collect();
    let w: Vec<f64> = truth.iter().map(|v| v.ln()).collect();
    let line = LinearFit::fit(&z, &w).ok_or_else(|| {
        FitError::Degenerate("all samples share the same angle".into())
    })?;

    let a = line.intercept.exp();
    let p = line.slope;
    let predicted: Vec<f64> = tans.iter().map(|t| a * t.powf(p)).collect();
    Ok(FittedModel {
        model: SpeedModel::PowerLaw { a, p },
        metrics: FitMetrics::compute(&truth, &predicted),
        samples: tans.len(),
    })
}

/// Fits the selected models and recommends the one with the lowest RMSE.
///
/// A model that fails to fit is logged and left out; the run fails only when
/// every selected model fails.
pub fn fit_models(
    angles_deg: &[f64],
    speeds: &[f64],
    options: &FitOptions,
    selection: ModelSelection,
) -> FitResult<FitReport> {
    let mut last_error = None;
    let mut attempt = |kind: ModelKind| -> Option<FittedModel> {
        if !selection.includes(kind) {
            return None;
        }
        let result = match kind {
            ModelKind::Single => fit_single(angles_deg, speeds, options),
            ModelKind::PowerLaw => fit_power_law(angles_deg, speeds, options),
        };
        match result {
            Ok(fitted) => Some(fitted),
            Err(err) => {
                warn!("{:?} fit failed: {}", kind, err);
                last_error = Some(err);
                None
            }
        }
    };

    let single = attempt(ModelKind::Single);
    let power_law = attempt(ModelKind::PowerLaw);

    let recommended = match (&single, &power_law) {
        (Some(s), Some(p)) if p.metrics.rmse < s.metrics.rmse => ModelKind::PowerLaw,
        (Some(_), _) => ModelKind::Single,
        (None, Some(_)) => ModelKind::PowerLaw,
        (None, None) => {
            return Err(last_error.unwrap_or(FitError::NotEnoughSamples(0)));
        }
    };

    Ok(FitReport {
        options: *options,
        single,
        power_law,
        recommended,
    })
}

use serde::{Deserialize, Serialize};

/// Fitted angle→speed relation used by the offline tools.
///
/// Both variants read the deflection magnitude, matching how the models are fitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum SpeedModel {
    /// `V = C · √tan|θ|`
    Single { c: f64 },
    /// `V = A · tan|θ|^p`
    PowerLaw { a: f64, p: f64 },
}

impl SpeedModel {
    pub fn name(&self) -> &'static str {
        match self {
            SpeedModel::Single { .. } => "single",
            SpeedModel::PowerLaw { .. } => "power_law",
        }
    }

    pub fn speed(&self, angle_degrees: f64) -> f64 {
        let tan_theta = angle_degrees.abs().to_radians().tan();
        if tan_theta.is_nan() || tan_theta <= 0.0 {
            return 0.0;
        }
        match *self {
            SpeedModel::Single { c } => c * tan_theta.sqrt(),
            SpeedModel::PowerLaw { a, p } => a * tan_theta.powf(p),
        }
    }
}

use serde::{Deserialize, Serialize};

/// How a negative deflection (sensor noise around rest) is mapped before `tan`.
///
/// Wind deflects the pendulum one way only, so a negative reading is treated
/// as an assumption about noise rather than a confirmed physical state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeAnglePolicy {
    /// Negative angles saturate to 0°, giving 0 m/s.
    #[default]
    ClampToZero,
    /// Negative angles use their magnitude.
    Mirror,
}

impl NegativeAnglePolicy {
    pub fn apply(self, angle_degrees: f64) -> f64 {
        match self {
            NegativeAnglePolicy::ClampToZero => angle_degrees.max(0.0),
            NegativeAnglePolicy::Mirror => angle_degrees.abs(),
        }
    }
}

/// `V = C · √tan(θ)` with the default clamp-to-zero policy.
///
/// There is no ceiling: `tan` diverges towards 90°, so callers near the
/// mechanical travel limit must bound the angle themselves.
pub fn convert(angle_degrees: f64, constant: f64) -> f64 {
    convert_with_policy(angle_degrees, constant, NegativeAnglePolicy::ClampToZero)
}

pub fn convert_with_policy(angle_degrees: f64, constant: f64, policy: NegativeAnglePolicy) -> f64 {
    let theta = policy.apply(angle_degrees).to_radians();
    let tan_theta = theta.tan();
    if tan_theta <= 0.0 {
        return 0.0;
    }
    constant * tan_theta.sqrt()
}

/// Loaded-once conversion handle; the constant is resolved before the loop starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindSpeedConverter {
    constant: f64,
    policy: NegativeAnglePolicy,
}

impl WindSpeedConverter {
    pub fn new(constant: f64, policy: NegativeAnglePolicy) -> Self {
        Self { constant, policy }
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn speed(&self, angle_degrees: f64) -> f64 {
        convert_with_policy(angle_degrees, self.constant, self.policy)
    }
}

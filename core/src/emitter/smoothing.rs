/// Exponential moving average over successive angle readings.
///
/// The first reading seeds the filter. Skipped cycles leave it untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleSmoother {
    alpha: f64,
    state: Option<f64>,
}

impl AngleSmoother {
    /// `alpha` is clamped into (0, 1]; 1 disables smoothing.
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(f64::EPSILON, 1.0),
            state: None,
        }
    }

    pub fn update(&mut self, angle: f64) -> f64 {
        let next = match self.state {
            Some(prev) => self.alpha * angle + (1.0 - self.alpha) * prev,
            None => angle,
        };
        self.state = Some(next);
        next
    }
}

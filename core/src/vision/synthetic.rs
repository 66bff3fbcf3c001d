use super::feed::FrameSource;
use super::frame::Frame;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Parameters for rendering a wind-driven pendulum without a camera.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub width: usize,
    pub height: usize,
    pub pivot_x: f64,
    pub pivot_y: f64,
    pub length_px: f64,
    pub marker_radius: f64,
    pub marker_rgb: [u8; 3],
    pub background_rgb: [u8; 3],
    /// Mean deflection the steady wind holds the pendulum at.
    pub mean_angle_deg: f64,
    /// Gust swing around the mean.
    pub amplitude_deg: f64,
    pub frequency_hz: f64,
    pub frame_rate_hz: f64,
    pub jitter_deg: f64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 160,
            height: 120,
            pivot_x: 80.0,
            pivot_y: 12.0,
            length_px: 90.0,
            marker_radius: 6.0,
            marker_rgb: [40, 200, 60],
            background_rgb: [30, 30, 30],
            mean_angle_deg: 15.0,
            amplitude_deg: 8.0,
            frequency_hz: 0.33,
            frame_rate_hz: 20.0,
            jitter_deg: 0.3,
            seed: 0,
        }
    }
}

/// Renders one frame per call with the pivot and bob painted as disks.
pub struct SyntheticPendulum {
    config: SyntheticConfig,
    rng: StdRng,
    frame_index: u64,
}

impl SyntheticPendulum {
    pub fn new(config: SyntheticConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            frame_index: 0,
        }
    }

    /// Noise-free deflection at frame `index`.
    pub fn angle_at(&self, index: u64) -> f64 {
        let t = index as f64 / self.config.frame_rate_hz.max(f64::EPSILON);
        self.config.mean_angle_deg
            + self.config.amplitude_deg * (2.0 * PI * self.config.frequency_hz * t).sin()
    }
}

impl FrameSource for SyntheticPendulum {
    fn next_frame(&mut self) -> Option<Frame> {
        let cfg = &self.config;
        let mut angle = self.angle_at(self.frame_index);
        if cfg.jitter_deg > 0.0 {
            angle += self.rng.gen_range(-cfg.jitter_deg..cfg.jitter_deg);
        }
        self.frame_index += 1;

        let theta = angle.to_radians();
        let bob_x = cfg.pivot_x + cfg.length_px * theta.sin();
        let bob_y = cfg.pivot_y + cfg.length_px * theta.cos();

        let mut frame = Frame::filled(cfg.width, cfg.height, cfg.background_rgb);
        frame.fill_disk(cfg.pivot_x, cfg.pivot_y, cfg.marker_radius, cfg.marker_rgb);
        frame.fill_disk(bob_x, bob_y, cfg.marker_radius, cfg.marker_rgb);
        Some(frame)
    }
}

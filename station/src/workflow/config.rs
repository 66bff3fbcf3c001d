use anyhow::Context;
use pendulumcore::calibration::DEFAULT_CALIBRATION_FILE;
use pendulumcore::conversion::NegativeAnglePolicy;
use pendulumcore::emitter::{EmitterSettings, DEFAULT_MAX_ANGLE_DEG, DEFAULT_PERIOD};
use pendulumcore::prelude::OutputMode;
use pendulumcore::vision::{Hsv, SyntheticConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where the emitter takes marker positions from.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Rendered pendulum tracked through the colour localizer.
    Synthetic(SyntheticConfig),
    /// Recorded `pivot_x,pivot_y,bob_x,bob_y` rows.
    Replay { path: PathBuf },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Synthetic(SyntheticConfig::default())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// Serial device path, or `-` for stdout.
    pub serial: String,
    pub period_ms: u64,
    pub mode: OutputMode,
    pub calibration_path: PathBuf,
    pub constant_override: Option<f64>,
    /// Refuse to start without a readable calibration record.
    pub require_calibration: bool,
    pub negative_angle_policy: NegativeAnglePolicy,
    pub smoothing_alpha: Option<f64>,
    /// Deflections beyond this are skipped instead of converted.
    pub max_angle_deg: f64,
    /// SCHED_FIFO priority (1-99) requested before the loop; best effort.
    pub realtime_priority: Option<i32>,
    /// Tracking colour; defaults to the synthetic marker colour.
    pub target_hsv: Option<Hsv>,
    pub source: SourceConfig,
    /// Stop after this many cycles; runs until Ctrl+C otherwise.
    pub max_cycles: Option<u64>,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            serial: "/dev/ttyAMA0".into(),
            period_ms: DEFAULT_PERIOD.as_millis() as u64,
            mode: OutputMode::WindSpeed,
            calibration_path: PathBuf::from(DEFAULT_CALIBRATION_FILE),
            constant_override: None,
            require_calibration: false,
            negative_angle_policy: NegativeAnglePolicy::default(),
            smoothing_alpha: None,
            max_angle_deg: DEFAULT_MAX_ANGLE_DEG,
            realtime_priority: None,
            target_hsv: None,
            source: SourceConfig::default(),
            max_cycles: None,
        }
    }
}

impl StationConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading station config {}", path_ref.display()))?;
        let config: StationConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing station config {}", path_ref.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with the CLI-provided fields applied on top.
    pub fn from_args(
        serial: Option<String>,
        period_ms: Option<u64>,
        mode: Option<OutputMode>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            serial: serial.unwrap_or(defaults.serial),
            period_ms: period_ms.unwrap_or(defaults.period_ms),
            mode: mode.unwrap_or(defaults.mode),
            ..defaults
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.period_ms > 0, "period_ms must be positive");
        if let Some(c) = self.constant_override {
            anyhow::ensure!(
                c.is_finite() && c > 0.0,
                "constant override must be a positive number, got {c}"
            );
        }
        if let Some(alpha) = self.smoothing_alpha {
            anyhow::ensure!(
                alpha > 0.0 && alpha <= 1.0,
                "smoothing_alpha must lie in (0, 1], got {alpha}"
            );
        }
        anyhow::ensure!(
            self.max_angle_deg > 0.0 && self.max_angle_deg < 90.0,
            "max_angle_deg must lie in (0, 90), got {}",
            self.max_angle_deg
        );
        if let Some(priority) = self.realtime_priority {
            anyhow::ensure!(
                (1..=99).contains(&priority),
                "realtime_priority must lie in 1..=99, got {priority}"
            );
        }
        Ok(())
    }

    pub fn to_emitter_settings(&self) -> EmitterSettings {
        EmitterSettings {
            period: Duration::from_millis(self.period_ms),
            mode: self.mode,
            smoothing_alpha: self.smoothing_alpha,
            max_angle_deg: self.max_angle_deg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_produces_emitter_settings() {
        let cfg = StationConfig::from_args(Some("-".into()), Some(20), Some(OutputMode::RawAngle));
        let settings = cfg.to_emitter_settings();
        assert_eq!(settings.period, Duration::from_millis(20));
        assert_eq!(settings.mode, OutputMode::RawAngle);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"serial: /dev/ttyUSB0\nperiod_ms: 25\nmode: raw_angle\nconstant_override: 2.5\n\
source:\n  kind: replay\n  path: markers.csv\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = StationConfig::load(&path).unwrap();
        assert_eq!(cfg.period_ms, 25);
        assert_eq!(cfg.constant_override, Some(2.5));
        assert!(matches!(cfg.source, SourceConfig::Replay { .. }));
        assert_eq!(cfg.negative_angle_policy, NegativeAnglePolicy::ClampToZero);
    }

    #[test]
    fn synthetic_source_takes_defaults() {
        let cfg: StationConfig =
            serde_yaml::from_str("source:\n  kind: synthetic\n  amplitude_deg: 3.0\n").unwrap();
        match cfg.source {
            SourceConfig::Synthetic(synthetic) => {
                assert_eq!(synthetic.amplitude_deg, 3.0);
                assert_eq!(synthetic.width, SyntheticConfig::default().width);
            }
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[test]
    fn bundled_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/station.yaml");
        let cfg = StationConfig::load(path).unwrap();
        assert_eq!(cfg.smoothing_alpha, None);
        let settings = cfg.to_emitter_settings();
        assert_eq!(settings.period, DEFAULT_PERIOD);
        assert_eq!(settings.max_angle_deg, 80.0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut cfg = StationConfig::default();
        cfg.constant_override = Some(-1.0);
        assert!(cfg.validate().is_err());
        cfg.constant_override = None;
        cfg.smoothing_alpha = Some(1.5);
        assert!(cfg.validate().is_err());
        cfg.smoothing_alpha = None;
        cfg.max_angle_deg = 90.0;
        assert!(cfg.validate().is_err());
        cfg.max_angle_deg = DEFAULT_MAX_ANGLE_DEG;
        cfg.realtime_priority = Some(0);
        assert!(cfg.validate().is_err());
        cfg.realtime_priority = Some(70);
        assert!(cfg.validate().is_ok());
    }
}

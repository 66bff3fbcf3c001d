use crate::workflow::config::{SourceConfig, StationConfig};
use crate::workflow::priority::raise_realtime_priority;
use anyhow::Context;
use log::info;
use pendulumcore::calibration::{resolve_constant, CalibrationStore, ResolvedConstant};
use pendulumcore::conversion::WindSpeedConverter;
use pendulumcore::emitter::{CycleOutcome, Emitter, MonotonicClock, StopSignal};
use pendulumcore::telemetry::EmissionMetrics;
use pendulumcore::vision::{
    ColorLocalizer, ColorTarget, MarkerFeed, ReplayFeed, SyntheticPendulum, VisionFeed,
};
use std::fs::OpenOptions;
use std::io::{self, Write};

pub type Sink = Box<dyn Write + Send>;
pub type Feed = Box<dyn MarkerFeed + Send>;

/// Opens the serial device for writing. The device must already exist.
pub fn open_sink(target: &str) -> anyhow::Result<Sink> {
    if target == "-" {
        return Ok(Box::new(io::stdout()));
    }
    let device = OpenOptions::new()
        .write(true)
        .open(target)
        .with_context(|| format!("opening serial sink {}", target))?;
    Ok(Box::new(device))
}

pub fn build_feed(config: &StationConfig) -> anyhow::Result<Feed> {
    match &config.source {
        SourceConfig::Synthetic(synthetic) => {
            let target = config
                .target_hsv
                .map(ColorTarget::around)
                .unwrap_or_else(|| ColorTarget::from_rgb(synthetic.marker_rgb));
            Ok(Box::new(VisionFeed::new(
                SyntheticPendulum::new(synthetic.clone()),
                ColorLocalizer::default(),
                target,
            )))
        }
        SourceConfig::Replay { path } => {
            let feed = ReplayFeed::load(path)
                .with_context(|| format!("reading replay log {}", path.display()))?;
            info!("replaying {} marker rows from {}", feed.len(), path.display());
            Ok(Box::new(feed))
        }
    }
}

pub struct Runner {
    config: StationConfig,
}

impl Runner {
    pub fn new(config: StationConfig) -> Self {
        Self { config }
    }

    /// Resolves the constant once, before the loop.
    pub fn resolve(&self) -> anyhow::Result<ResolvedConstant> {
        let store = CalibrationStore::new(&self.config.calibration_path);
        let resolved = resolve_constant(
            self.config.constant_override,
            &store,
            self.config.require_calibration,
        )
        .context("resolving calibration constant")?;
        info!("C = {:.6} ({})", resolved.value, resolved.source);
        Ok(resolved)
    }

    /// Startup failures (sink, required calibration, feed) abort before the
    /// schedule is armed; everything after that is cycle-local.
    pub fn execute(&self, stop: &StopSignal) -> anyhow::Result<EmissionMetrics> {
        self.config.validate()?;
        let sink = open_sink(&self.config.serial)?;
        raise_realtime_priority(self.config.realtime_priority);
        self.execute_with_sink(sink, stop)
    }

    pub fn execute_with_sink<W: Write>(
        &self,
        sink: W,
        stop: &StopSignal,
    ) -> anyhow::Result<EmissionMetrics> {
        let resolved = self.resolve()?;
        let feed = build_feed(&self.config)?;
        let converter =
            WindSpeedConverter::new(resolved.value, self.config.negative_angle_policy);

        let mut emitter = Emitter::new(
            MonotonicClock,
            feed,
            sink,
            converter,
            self.config.to_emitter_settings(),
        );

        let Some(max_cycles) = self.config.max_cycles else {
            return Ok(emitter.run(stop));
        };

        emitter.arm();
        for _ in 0..max_cycles {
            if emitter.step(stop).outcome == CycleOutcome::Stopped {
                break;
            }
        }
        Ok(emitter.metrics())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pendulumcore::calibration::CalibrationStore;
    use pendulumcore::prelude::OutputMode;
    use std::fs;
    use tempfile::tempdir;

    fn bounded_config(dir: &std::path::Path) -> StationConfig {
        StationConfig {
            period_ms: 2,
            max_cycles: Some(5),
            calibration_path: dir.join("cal.json"),
            ..StationConfig::from_args(Some("-".into()), Some(2), None)
        }
    }

    #[test]
    fn runner_emits_bounded_cycles_to_sink() {
        let dir = tempdir().unwrap();
        let serial = dir.path().join("tty");
        fs::write(&serial, b"").unwrap();

        let config = StationConfig {
            serial: serial.to_string_lossy().into_owned(),
            constant_override: Some(2.0),
            ..bounded_config(dir.path())
        };
        let metrics = Runner::new(config).execute(&StopSignal::new()).unwrap();
        assert_eq!(metrics.emitted + metrics.skipped, 5);

        let written = fs::read_to_string(&serial).unwrap();
        assert_eq!(written.matches("\r\n").count(), metrics.emitted);
        for line in written.split_terminator("\r\n") {
            let speed: f64 = line.parse().unwrap();
            assert!(speed > 0.0);
            assert_eq!(line.split('.').nth(1).map(str::len), Some(4));
        }
    }

    #[test]
    fn missing_serial_device_is_fatal() {
        let dir = tempdir().unwrap();
        let config = StationConfig {
            serial: dir.path().join("no-such-tty").to_string_lossy().into_owned(),
            ..bounded_config(dir.path())
        };
        assert!(Runner::new(config).execute(&StopSignal::new()).is_err());
    }

    #[test]
    fn required_calibration_must_exist() {
        let dir = tempdir().unwrap();
        let config = StationConfig {
            require_calibration: true,
            ..bounded_config(dir.path())
        };
        let err = Runner::new(config)
            .execute_with_sink(Vec::new(), &StopSignal::new())
            .unwrap_err();
        assert!(format!("{err:#}").contains("no calibration record"));
    }

    #[test]
    fn persisted_constant_is_used_without_override() {
        let dir = tempdir().unwrap();
        let config = bounded_config(dir.path());
        CalibrationStore::new(&config.calibration_path)
            .add_sample(15.5, 3.2)
            .unwrap();
        let resolved = Runner::new(config).resolve().unwrap();
        assert!((resolved.value - 3.2 / 15.5f64.to_radians().tan().sqrt()).abs() < 1e-12);
    }

    #[test]
    fn replay_source_feeds_the_emitter() {
        let dir = tempdir().unwrap();
        let replay = dir.path().join("markers.csv");
        fs::write(&replay, "pivot_x,pivot_y,bob_x,bob_y\n100,10,100,110\n100,10,200,110\n")
            .unwrap();
        let config = StationConfig {
            mode: OutputMode::RawAngle,
            max_cycles: Some(2),
            source: SourceConfig::Replay { path: replay },
            ..bounded_config(dir.path())
        };

        let mut sink = Vec::new();
        let metrics = Runner::new(config)
            .execute_with_sink(&mut sink, &StopSignal::new())
            .unwrap();
        assert_eq!(metrics.emitted, 2);
        assert_eq!(
            String::from_utf8(sink).unwrap(),
            "angle:0.00\r\nangle:45.00\r\n"
        );
    }

    #[test]
    fn configured_ceiling_skips_level_rows() {
        let dir = tempdir().unwrap();
        let replay = dir.path().join("markers.csv");
        fs::write(&replay, "0,10,100,10.000000001\n100,10,200,110\n").unwrap();
        let config = StationConfig {
            max_cycles: Some(2),
            constant_override: Some(2.0),
            max_angle_deg: 80.0,
            source: SourceConfig::Replay { path: replay },
            ..bounded_config(dir.path())
        };

        let mut sink = Vec::new();
        let metrics = Runner::new(config)
            .execute_with_sink(&mut sink, &StopSignal::new())
            .unwrap();
        assert_eq!((metrics.emitted, metrics.skipped), (1, 1));
        let expected = format!("{:.4}\r\n", 2.0 * 45f64.to_radians().tan().sqrt());
        assert_eq!(String::from_utf8(sink).unwrap(), expected);
    }
}

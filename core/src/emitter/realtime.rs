use super::clock::Clock;
use super::format::format_line;
use super::smoothing::AngleSmoother;
use super::stop::StopSignal;
use super::{DEFAULT_MAX_ANGLE_DEG, DEFAULT_PERIOD};
use crate::conversion::WindSpeedConverter;
use crate::geometry::sample_angle;
use crate::prelude::{OutputMode, TrackingError, WindEstimate};
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::{EmissionMetrics, MetricsRecorder};
use crate::vision::MarkerFeed;
use std::io::Write;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmitterSettings {
    pub period: Duration,
    pub mode: OutputMode,
    /// EMA weight for the angle; `None` emits raw per-cycle readings.
    pub smoothing_alpha: Option<f64>,
    /// Wind mode skips readings whose magnitude exceeds this; raw angles pass.
    pub max_angle_deg: f64,
}

impl Default for EmitterSettings {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            mode: OutputMode::WindSpeed,
            smoothing_alpha: None,
            max_angle_deg: DEFAULT_MAX_ANGLE_DEG,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterState {
    /// No baseline yet.
    Idle,
    /// Waiting for the absolute deadline `next_tick`.
    Armed { next_tick: Instant },
    /// Producing the sample scheduled for `tick`.
    Emitting { tick: Instant },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Emitted(WindEstimate),
    /// No reading this tick; nothing was written.
    Skipped(TrackingError),
    WriteFailed(String),
    /// A stop was requested before the tick fired.
    Stopped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Scheduled deadline of this cycle.
    pub tick: Instant,
    /// When the clock actually released the wait.
    pub woke_at: Instant,
    pub outcome: CycleOutcome,
}

/// Sense → compute → transmit loop with absolute-deadline scheduling.
///
/// Tick `k` is due at `baseline + k · period` regardless of how long earlier
/// cycles took. A cycle that overruns the period is followed immediately by
/// the next one; the schedule is never re-based on "now".
pub struct Emitter<C, F, W> {
    clock: C,
    feed: F,
    sink: W,
    converter: WindSpeedConverter,
    settings: EmitterSettings,
    state: EmitterState,
    baseline: Option<Instant>,
    smoother: Option<AngleSmoother>,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl<C: Clock, F: MarkerFeed, W: Write> Emitter<C, F, W> {
    pub fn new(
        clock: C,
        feed: F,
        sink: W,
        converter: WindSpeedConverter,
        settings: EmitterSettings,
    ) -> Self {
        let smoother = settings.smoothing_alpha.map(AngleSmoother::new);
        Self {
            clock,
            feed,
            sink,
            converter,
            settings,
            state: EmitterState::Idle,
            baseline: None,
            smoother,
            metrics: MetricsRecorder::new(),
            logger: LogManager::new("emitter"),
        }
    }

    pub fn state(&self) -> EmitterState {
        self.state
    }

    pub fn baseline(&self) -> Option<Instant> {
        self.baseline
    }

    pub fn metrics(&self) -> EmissionMetrics {
        self.metrics.snapshot()
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    /// Idle → Armed: captures the baseline and schedules the first tick.
    pub fn arm(&mut self) -> Instant {
        if let EmitterState::Armed { next_tick } = self.state {
            return next_tick;
        }
        let baseline = self.clock.now();
        let next_tick = baseline + self.settings.period;
        self.baseline = Some(baseline);
        self.state = EmitterState::Armed { next_tick };
        self.logger.record(&format!(
            "armed: period {:?}, mode {:?}, C = {:.6}",
            self.settings.period,
            self.settings.mode,
            self.converter.constant()
        ));
        next_tick
    }

    /// Waits for the next tick and runs one cycle.
    pub fn step(&mut self, stop: &StopSignal) -> CycleReport {
        let tick = match self.state {
            EmitterState::Armed { next_tick } => next_tick,
            _ => self.arm(),
        };

        if stop.is_stopped() {
            let now = self.clock.now();
            return CycleReport {
                tick,
                woke_at: now,
                outcome: CycleOutcome::Stopped,
            };
        }

        self.clock.sleep_until(tick);
        let woke_at = self.clock.now();
        if stop.is_stopped() {
            return CycleReport {
                tick,
                woke_at,
                outcome: CycleOutcome::Stopped,
            };
        }

        self.state = EmitterState::Emitting { tick };
        let outcome = self.emit(woke_at);

        let next_tick = tick + self.settings.period;
        self.state = EmitterState::Armed { next_tick };
        let finished = self.clock.now();
        if finished > next_tick {
            self.metrics.record_overrun();
            self.logger.warn(&format!(
                "cycle overran its period by {:?}",
                finished - next_tick
            ));
        }

        CycleReport {
            tick,
            woke_at,
            outcome,
        }
    }

    /// Runs until `stop` is raised; returns the final counters.
    pub fn run(&mut self, stop: &StopSignal) -> EmissionMetrics {
        self.arm();
        loop {
            let report = self.step(stop);
            if report.outcome == CycleOutcome::Stopped {
                break;
            }
        }
        let metrics = self.metrics.snapshot();
        self.logger.record(&format!(
            "stopped: emitted {}, skipped {}, write failures {}, overruns {}",
            metrics.emitted, metrics.skipped, metrics.write_failures, metrics.overruns
        ));
        metrics
    }

    fn emit(&mut self, woke_at: Instant) -> CycleOutcome {
        let sample = match self
            .feed
            .next_markers()
            .and_then(|markers| sample_angle(&markers, woke_at))
        {
            Ok(sample) => sample,
            Err(err) => {
                self.metrics.record_skipped();
                self.logger.debug(&format!("skipped: {}", err));
                return CycleOutcome::Skipped(err);
            }
        };

        if self.settings.mode == OutputMode::WindSpeed
            && sample.angle_degrees.abs() > self.settings.max_angle_deg
        {
            let err = TrackingError::AboveCeiling {
                angle: sample.angle_degrees,
                ceiling: self.settings.max_angle_deg,
            };
            self.metrics.record_skipped();
            self.logger.debug(&format!("skipped: {}", err));
            return CycleOutcome::Skipped(err);
        }

        let angle = match self.smoother.as_mut() {
            Some(smoother) => smoother.update(sample.angle_degrees),
            None => sample.angle_degrees,
        };
        let estimate = match self.settings.mode {
            OutputMode::WindSpeed => WindEstimate::Speed {
                speed_mps: self.converter.speed(angle),
            },
            OutputMode::RawAngle => WindEstimate::Angle {
                angle_degrees: angle,
            },
        };

        let line = format_line(&estimate);
        match self
            .sink
            .write_all(line.as_bytes())
            .and_then(|_| self.sink.flush())
        {
            Ok(()) => {
                self.metrics.record_emitted();
                self.logger.debug(&format!("sent {}", line.trim_end()));
                CycleOutcome::Emitted(estimate)
            }
            Err(err) => {
                self.metrics.record_write_failure();
                self.logger.warn(&format!("serial write failed: {}", err));
                CycleOutcome::WriteFailed(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::NegativeAnglePolicy;
    use crate::emitter::clock::SimulatedClock;
    use crate::prelude::{MarkerPair, Point2D, TrackingResult};
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::io;

    /// Feed that charges a compute delay to the shared clock per cycle.
    struct TimedFeed {
        clock: SimulatedClock,
        rng: StdRng,
        max_compute_ms: u64,
        markers: Vec<TrackingResult<MarkerPair>>,
        cursor: usize,
    }

    impl TimedFeed {
        fn new(clock: SimulatedClock, max_compute_ms: u64) -> Self {
            Self {
                clock,
                rng: StdRng::seed_from_u64(42),
                max_compute_ms,
                markers: vec![Ok(pair(10.0))],
                cursor: 0,
            }
        }

        fn with_markers(mut self, markers: Vec<TrackingResult<MarkerPair>>) -> Self {
            self.markers = markers;
            self
        }
    }

    impl MarkerFeed for TimedFeed {
        fn next_markers(&mut self) -> TrackingResult<MarkerPair> {
            let compute = self.rng.gen_range(0..=self.max_compute_ms);
            self.clock.advance(Duration::from_millis(compute));
            let item = self.markers[self.cursor % self.markers.len()].clone();
            self.cursor += 1;
            item
        }
    }

    fn pair(dx: f64) -> MarkerPair {
        MarkerPair::new(Point2D::new(100.0, 0.0), Point2D::new(100.0 + dx, 100.0))
    }

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn converter() -> WindSpeedConverter {
        WindSpeedConverter::new(2.0, NegativeAnglePolicy::ClampToZero)
    }

    fn within(a: Instant, b: Instant, tolerance: Duration) -> bool {
        let diff = if a > b { a - b } else { b - a };
        diff <= tolerance
    }

    #[test]
    fn ticks_stay_phase_locked_under_variable_compute() {
        let clock = SimulatedClock::default();
        let feed = TimedFeed::new(clock.clone(), 40);
        let mut emitter = Emitter::new(
            clock.clone(),
            feed,
            Vec::new(),
            converter(),
            EmitterSettings::default(),
        );
        let stop = StopSignal::new();

        let baseline = clock.now();
        emitter.arm();
        assert_eq!(emitter.baseline(), Some(baseline));

        let period = Duration::from_millis(50);
        for k in 1..=20u32 {
            let report = emitter.step(&stop);
            let expected = baseline + period * k;
            assert_eq!(report.tick, expected);
            assert!(
                within(report.woke_at, expected, clock.resolution()),
                "tick {k} drifted"
            );
            assert!(matches!(report.outcome, CycleOutcome::Emitted(_)));
        }
        assert_eq!(emitter.metrics().emitted, 20);
        assert_eq!(emitter.metrics().overruns, 0);
    }

    #[test]
    fn state_machine_walks_idle_armed() {
        let clock = SimulatedClock::default();
        let mut emitter = Emitter::new(
            clock.clone(),
            TimedFeed::new(clock.clone(), 0),
            Vec::new(),
            converter(),
            EmitterSettings::default(),
        );
        assert_eq!(emitter.state(), EmitterState::Idle);
        let first = emitter.arm();
        assert_eq!(emitter.state(), EmitterState::Armed { next_tick: first });
        emitter.step(&StopSignal::new());
        assert_eq!(
            emitter.state(),
            EmitterState::Armed {
                next_tick: first + Duration::from_millis(50)
            }
        );
    }

    #[test]
    fn skipped_cycles_write_nothing_and_keep_schedule() {
        let clock = SimulatedClock::default();
        let feed = TimedFeed::new(clock.clone(), 10).with_markers(vec![
            Ok(pair(0.0)),
            Err(TrackingError::MarkerMiss("lost".into())),
            Ok(MarkerPair::new(Point2D::new(5.0, 5.0), Point2D::new(5.0, 5.0))),
            Ok(pair(100.0)),
        ]);
        let mut emitter = Emitter::new(
            clock.clone(),
            feed,
            Vec::new(),
            converter(),
            EmitterSettings::default(),
        );
        let stop = StopSignal::new();
        let baseline = clock.now();

        let outcomes: Vec<CycleOutcome> = (1..=4u32)
            .map(|k| {
                let report = emitter.step(&stop);
                assert_eq!(report.woke_at, baseline + Duration::from_millis(50) * k);
                report.outcome
            })
            .collect();

        assert!(matches!(outcomes[1], CycleOutcome::Skipped(TrackingError::MarkerMiss(_))));
        assert!(matches!(
            outcomes[2],
            CycleOutcome::Skipped(TrackingError::DegenerateGeometry(_))
        ));

        let written = String::from_utf8(emitter.sink().clone()).unwrap();
        let expected_speed = 2.0 * 45f64.to_radians().tan().sqrt();
        assert_eq!(
            written,
            format!("0.0000\r\n{:.4}\r\n", expected_speed)
        );
        assert_eq!(emitter.metrics().skipped, 2);
    }

    #[test]
    fn raw_angle_mode_writes_tagged_lines() {
        let clock = SimulatedClock::default();
        let mut emitter = Emitter::new(
            clock.clone(),
            TimedFeed::new(clock.clone(), 0).with_markers(vec![Ok(pair(100.0))]),
            Vec::new(),
            converter(),
            EmitterSettings {
                mode: OutputMode::RawAngle,
                ..Default::default()
            },
        );
        emitter.step(&StopSignal::new());
        assert_eq!(emitter.sink().as_slice(), b"angle:45.00\r\n");
    }

    #[test]
    fn write_failures_are_cycle_local() {
        let clock = SimulatedClock::default();
        let mut emitter = Emitter::new(
            clock.clone(),
            TimedFeed::new(clock.clone(), 5),
            BrokenSink,
            converter(),
            EmitterSettings::default(),
        );
        let stop = StopSignal::new();
        for _ in 0..3 {
            assert!(matches!(
                emitter.step(&stop).outcome,
                CycleOutcome::WriteFailed(_)
            ));
        }
        assert_eq!(emitter.metrics().write_failures, 3);
    }

    #[test]
    fn overruns_keep_absolute_deadlines() {
        let clock = SimulatedClock::default();
        let mut emitter = Emitter::new(
            clock.clone(),
            TimedFeed::new(clock.clone(), 0),
            Vec::new(),
            converter(),
            EmitterSettings::default(),
        );
        let stop = StopSignal::new();
        let baseline = clock.now();

        emitter.step(&stop);
        clock.advance(Duration::from_millis(120));
        let late = emitter.step(&stop);
        assert_eq!(late.tick, baseline + Duration::from_millis(100));
        assert!(late.woke_at > late.tick);

        let next = emitter.step(&stop);
        assert_eq!(next.tick, baseline + Duration::from_millis(150));
        assert_eq!(next.woke_at, baseline + Duration::from_millis(170));
        let after = emitter.step(&stop);
        assert_eq!(after.woke_at, baseline + Duration::from_millis(200));
        assert_eq!(emitter.metrics().overruns, 1);
    }

    #[test]
    fn stop_is_honoured_at_the_tick_boundary() {
        let clock = SimulatedClock::default();
        let mut emitter = Emitter::new(
            clock.clone(),
            TimedFeed::new(clock.clone(), 0),
            Vec::new(),
            converter(),
            EmitterSettings::default(),
        );
        let stop = StopSignal::new();
        emitter.step(&stop);
        stop.request_stop();
        let metrics = emitter.run(&stop);
        assert_eq!(metrics.emitted, 1);
        let expected = format!("{:.4}\r\n", 2.0 * 0.1f64.sqrt());
        assert_eq!(emitter.sink().as_slice(), expected.as_bytes());
    }

    #[test]
    fn smoothing_is_applied_when_enabled() {
        let clock = SimulatedClock::default();
        let mut emitter = Emitter::new(
            clock.clone(),
            TimedFeed::new(clock.clone(), 0)
                .with_markers(vec![Ok(pair(0.0)), Ok(pair(100.0))]),
            Vec::new(),
            converter(),
            EmitterSettings {
                mode: OutputMode::RawAngle,
                smoothing_alpha: Some(0.5),
                ..Default::default()
            },
        );
        let stop = StopSignal::new();
        emitter.step(&stop);
        match emitter.step(&stop).outcome {
            CycleOutcome::Emitted(WindEstimate::Angle { angle_degrees }) => {
                assert!((angle_degrees - 22.5).abs() < 1e-9)
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn readings_above_the_ceiling_are_skipped_in_wind_mode() {
        let level = MarkerPair::new(
            Point2D::new(0.0, 10.0),
            Point2D::new(100.0, 10.000000001),
        );
        let clock = SimulatedClock::default();
        let mut emitter = Emitter::new(
            clock.clone(),
            TimedFeed::new(clock.clone(), 0).with_markers(vec![Ok(level), Ok(pair(100.0))]),
            Vec::new(),
            WindSpeedConverter::new(6.077, NegativeAnglePolicy::ClampToZero),
            EmitterSettings::default(),
        );
        let stop = StopSignal::new();

        assert!(matches!(
            emitter.step(&stop).outcome,
            CycleOutcome::Skipped(TrackingError::AboveCeiling { .. })
        ));
        assert!(matches!(emitter.step(&stop).outcome, CycleOutcome::Emitted(_)));
        let expected = format!("{:.4}\r\n", 6.077 * 45f64.to_radians().tan().sqrt());
        assert_eq!(emitter.sink().as_slice(), expected.as_bytes());
        assert_eq!(emitter.metrics().skipped, 1);
    }

    #[test]
    fn raw_angle_mode_ignores_the_ceiling() {
        let clock = SimulatedClock::default();
        let mut emitter = Emitter::new(
            clock.clone(),
            TimedFeed::new(clock.clone(), 0).with_markers(vec![Ok(pair(1000.0))]),
            Vec::new(),
            converter(),
            EmitterSettings {
                mode: OutputMode::RawAngle,
                max_angle_deg: 60.0,
                ..Default::default()
            },
        );
        emitter.step(&StopSignal::new());
        assert_eq!(emitter.sink().as_slice(), b"angle:84.29\r\n");
    }
}

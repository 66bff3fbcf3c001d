use anyhow::Context;
use calibrate::batch::calibrate_from_file;
use calibrate::session::InteractiveSession;
use calibrate::show::show_calibration;
use calibrate::write_batch_summary;
use clap::{Parser, Subcommand};
use log::{info, warn};
use offline::apply::{apply_models, select_models, ApplyChoice};
use offline::csv_log::{calibrated_path, CsvLog};
use offline::fit::{fit_log, load_report, save_report, write_fit_summary, DEFAULT_REPORT_FILE};
use pendulumcore::calibration::{sample_constant, CalibrationStore, DEFAULT_CALIBRATION_FILE};
use pendulumcore::emitter::StopSignal;
use pendulumcore::fit::{FitOptions, ModelSelection};
use pendulumcore::prelude::OutputMode;
use std::io;
use std::path::PathBuf;
use std::thread;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::StationConfig;
use workflow::runner::Runner;

mod calibrate;
mod offline;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Pendulum anemometer station driver")]
struct Args {
    /// Calibration record shared by `run`, `calibrate` and `show`
    #[arg(long, global = true)]
    calibration: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Emit wind speed (or angle) lines on the serial sink every period
    Run {
        /// Load a station config from YAML; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,
        /// Serial device path, `-` for stdout
        #[arg(long)]
        serial: Option<String>,
        #[arg(long)]
        period_ms: Option<u64>,
        /// `wind` or `angle`
        #[arg(long, value_parser = parse_mode)]
        mode: Option<OutputMode>,
        /// Calibration constant override, takes precedence over the record
        #[arg(long)]
        constant: Option<f64>,
        #[arg(long, default_value_t = false)]
        require_calibration: bool,
        #[arg(long)]
        max_cycles: Option<u64>,
        /// EMA weight applied to the angle
        #[arg(long)]
        smoothing: Option<f64>,
        /// Skip wind readings deflected further than this
        #[arg(long)]
        max_angle_deg: Option<f64>,
        /// Best-effort SCHED_FIFO priority (1-99)
        #[arg(long)]
        rt_priority: Option<i32>,
    },
    /// Record calibration measurements (interactive without arguments)
    Calibrate {
        #[arg(long, requires = "wind")]
        angle: Option<f64>,
        #[arg(long, requires = "angle")]
        wind: Option<f64>,
        /// CSV of `angle,wind` rows; replaces the stored record
        #[arg(long, conflicts_with_all = ["angle", "wind"])]
        file: Option<PathBuf>,
    },
    /// Print the stored calibration constant
    Show,
    /// Fit angle→speed models against an aligned reference log
    Fit {
        log: PathBuf,
        #[arg(long, default_value_t = 0.5)]
        min_speed: f64,
        #[arg(long, default_value_t = 0.2)]
        min_angle_deg: f64,
        /// `single`, `power-law` or `both`
        #[arg(long, default_value = "both", value_parser = parse_selection)]
        models: ModelSelection,
        #[arg(long, default_value = DEFAULT_REPORT_FILE)]
        out: PathBuf,
    },
    /// Add calibrated speed and error columns to a log
    Apply {
        log: PathBuf,
        #[arg(long, default_value = DEFAULT_REPORT_FILE)]
        report: PathBuf,
        /// `auto`, `single`, `power-law` or `both`
        #[arg(long, default_value = "auto")]
        model: ApplyChoice,
    },
}

fn parse_mode(value: &str) -> Result<OutputMode, String> {
    match value {
        "wind" | "wind_speed" => Ok(OutputMode::WindSpeed),
        "angle" | "raw_angle" => Ok(OutputMode::RawAngle),
        other => Err(format!("unknown mode '{other}'")),
    }
}

fn parse_selection(value: &str) -> Result<ModelSelection, String> {
    match value {
        "single" => Ok(ModelSelection::Single),
        "power-law" | "power_law" => Ok(ModelSelection::PowerLaw),
        "both" => Ok(ModelSelection::Both),
        other => Err(format!("unknown model selection '{other}'")),
    }
}

/// Raises `stop` on Ctrl+C; the emitter notices at its next tick boundary.
fn watch_ctrl_c(stop: StopSignal) -> anyhow::Result<()> {
    let runtime = TokioBuilder::new_current_thread()
        .enable_all()
        .build()
        .context("creating runtime for signal handling")?;
    thread::spawn(move || {
        match runtime.block_on(signal::ctrl_c()) {
            Ok(()) => info!("Ctrl+C received, stopping at next tick"),
            Err(err) => warn!("Ctrl+C handler failed: {}", err),
        }
        stop.request_stop();
    });
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let calibration_path = args.calibration;
    let store = || {
        CalibrationStore::new(
            calibration_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CALIBRATION_FILE)),
        )
    };

    match args.command {
        Command::Run {
            config,
            serial,
            period_ms,
            mode,
            constant,
            require_calibration,
            max_cycles,
            smoothing,
            max_angle_deg,
            rt_priority,
        } => {
            let mut station = match config {
                Some(path) => {
                    let mut loaded = StationConfig::load(path)?;
                    loaded.serial = serial.unwrap_or(loaded.serial);
                    loaded.period_ms = period_ms.unwrap_or(loaded.period_ms);
                    loaded.mode = mode.unwrap_or(loaded.mode);
                    loaded
                }
                None => StationConfig::from_args(serial, period_ms, mode),
            };
            if let Some(path) = calibration_path.clone() {
                station.calibration_path = path;
            }
            station.constant_override = constant.or(station.constant_override);
            station.require_calibration |= require_calibration;
            station.max_cycles = max_cycles.or(station.max_cycles);
            station.smoothing_alpha = smoothing.or(station.smoothing_alpha);
            station.max_angle_deg = max_angle_deg.unwrap_or(station.max_angle_deg);
            station.realtime_priority = rt_priority.or(station.realtime_priority);

            let stop = StopSignal::new();
            watch_ctrl_c(stop.clone())?;
            let metrics = Runner::new(station).execute(&stop)?;
            println!(
                "emitted {}, skipped {}, write failures {}, overruns {}",
                metrics.emitted, metrics.skipped, metrics.write_failures, metrics.overruns
            );
        }
        Command::Calibrate { angle, wind, file } => {
            let store = store();
            if let (Some(angle), Some(wind)) = (angle, wind) {
                let constant = sample_constant(angle, wind)?;
                println!("Calibration constant for this sample: C = {constant:.6}");
                let record = store.add_sample(angle, wind)?;
                println!(
                    "Saved to {}: C = {:.6} over {} measurements",
                    store.path().display(),
                    record.constant(),
                    record.sample_count()
                );
            } else if let Some(file) = file {
                let (_, batch) = calibrate_from_file(&store, &file)?;
                println!("Loaded measurements from {}", file.display());
                write_batch_summary(&mut io::stdout(), &batch)?;
                println!("Calibration saved to {}", store.path().display());
            } else {
                let stdin = io::stdin();
                InteractiveSession::new(stdin.lock(), io::stdout()).run(&store)?;
            }
        }
        Command::Show => show_calibration(&store(), &mut io::stdout())?,
        Command::Fit {
            log,
            min_speed,
            min_angle_deg,
            models,
            out,
        } => {
            let options = FitOptions {
                min_speed,
                min_angle_deg,
            };
            let report = fit_log(&CsvLog::load(&log)?, &options, models)?;
            write_fit_summary(&mut io::stdout(), &report)?;
            save_report(&report, &out)?;
            println!("Saved fit report to {}", out.display());
        }
        Command::Apply { log, report, model } => {
            let report = load_report(&report)?;
            let models = select_models(&report, model)?;
            let calibrated = apply_models(&CsvLog::load(&log)?, &models)?;
            let target = calibrated_path(&log);
            calibrated.write(&target)?;
            let names: Vec<&str> = models.iter().map(|m| m.name()).collect();
            println!("Wrote {} using {}", target.display(), names.join(", "));
        }
    }

    Ok(())
}

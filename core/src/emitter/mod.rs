//! Fixed-period emission loop phase-locked to a monotonic clock.

pub mod clock;
pub mod format;
pub mod realtime;
pub mod smoothing;
pub mod stop;

pub use clock::{Clock, MonotonicClock, SimulatedClock};
pub use format::format_line;
pub use realtime::{CycleOutcome, CycleReport, Emitter, EmitterSettings, EmitterState};
pub use smoothing::AngleSmoother;
pub use stop::StopSignal;

use std::time::Duration;

pub const DEFAULT_PERIOD: Duration = Duration::from_millis(50);

/// Largest deflection converted to a speed; `tan` diverges past it.
pub const DEFAULT_MAX_ANGLE_DEG: f64 = 85.0;

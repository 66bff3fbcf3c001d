//! Offline tooling over aligned CSV logs: fit angle→speed models against the
//! reference anemometer, then apply a fitted model back onto a log.

pub mod apply;
pub mod csv_log;
pub mod fit;

pub const GROUND_TRUTH_COLUMN: &str = "ground_truth_mps";
/// Holds the pendulum angle in degrees during calibration runs.
pub const STUDENT_COLUMN: &str = "student_mps";

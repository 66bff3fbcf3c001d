pub mod angle;

pub use angle::{estimate_angle, sample_angle};

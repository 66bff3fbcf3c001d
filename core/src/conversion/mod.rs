pub mod converter;
pub mod model;

pub use converter::{convert, convert_with_policy, NegativeAnglePolicy, WindSpeedConverter};
pub use model::SpeedModel;

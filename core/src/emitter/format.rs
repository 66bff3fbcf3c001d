use crate::prelude::WindEstimate;

pub const ANGLE_TAG: &str = "angle";

/// Serial line for one estimate, CR LF terminated.
///
/// Wind speed uses four decimals; angle mode is tagged so the receiver can
/// tell the two streams apart.
pub fn format_line(estimate: &WindEstimate) -> String {
    match *estimate {
        WindEstimate::Speed { speed_mps } => format!("{:.4}\r\n", speed_mps),
        WindEstimate::Angle { angle_degrees } => format!("{}:{:.2}\r\n", ANGLE_TAG, angle_degrees),
    }
}

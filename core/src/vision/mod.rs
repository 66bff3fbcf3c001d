//! Marker localization: the capability interface the emitter pulls from, a
//! colour-segmentation implementation of it, and the frame sources that feed it.

pub mod color;
pub mod feed;
pub mod frame;
pub mod localizer;
pub mod synthetic;

pub use color::{rgb_to_hsv, ColorTarget, Hsv};
pub use feed::{FrameSource, MarkerFeed, ReplayFeed, VisionFeed};
pub use frame::Frame;
pub use localizer::{ColorLocalizer, MarkerLocalizer};
pub use synthetic::{SyntheticConfig, SyntheticPendulum};

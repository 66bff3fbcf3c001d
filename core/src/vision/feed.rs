use super::color::ColorTarget;
use super::frame::Frame;
use super::localizer::MarkerLocalizer;
use crate::prelude::{MarkerPair, Point2D, TrackingError, TrackingResult};
use std::fs;
use std::io;
use std::path::Path;

/// Where frames come from; `None` means no frame is available this cycle.
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<Frame>;
}

/// What the emitter pulls once per cycle.
pub trait MarkerFeed {
    fn next_markers(&mut self) -> TrackingResult<MarkerPair>;
}

impl<F: MarkerFeed + ?Sized> MarkerFeed for Box<F> {
    fn next_markers(&mut self) -> TrackingResult<MarkerPair> {
        (**self).next_markers()
    }
}

/// Frame source + localizer + tracking colour.
pub struct VisionFeed<S, L> {
    source: S,
    localizer: L,
    target: ColorTarget,
}

impl<S: FrameSource, L: MarkerLocalizer> VisionFeed<S, L> {
    pub fn new(source: S, localizer: L, target: ColorTarget) -> Self {
        Self {
            source,
            localizer,
            target,
        }
    }
}

impl<S: FrameSource, L: MarkerLocalizer> MarkerFeed for VisionFeed<S, L> {
    fn next_markers(&mut self) -> TrackingResult<MarkerPair> {
        let frame = self
            .source
            .next_frame()
            .ok_or_else(|| TrackingError::MarkerMiss("no frame available".into()))?;
        self.localizer
            .localize(&frame, &self.target)
            .ok_or_else(|| TrackingError::MarkerMiss("fewer than two markers found".into()))
    }
}

/// Replays recorded `pivot_x,pivot_y,bob_x,bob_y` rows, looping at the end.
///
/// Rows that do not parse are kept and replayed as misses so the recorded
/// cadence is preserved.
pub struct ReplayFeed {
    rows: Vec<Option<MarkerPair>>,
    cursor: usize,
}

impl ReplayFeed {
    pub fn from_rows(rows: Vec<Option<MarkerPair>>) -> Self {
        Self { rows, cursor: 0 }
    }

    pub fn parse(contents: &str) -> Self {
        let mut rows = Vec::new();
        let mut first = true;
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let parsed = Self::parse_row(line);
            if first && parsed.is_none() {
                // header
                first = false;
                continue;
            }
            first = false;
            rows.push(parsed);
        }
        Self::from_rows(rows)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn parse_row(line: &str) -> Option<MarkerPair> {
        let values: Vec<f64> = line
            .split(',')
            .map(|field| field.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .ok()?;
        match values.as_slice() {
            [px, py, bx, by, ..] => Some(MarkerPair::new(
                Point2D::new(*px, *py),
                Point2D::new(*bx, *by),
            )),
            _ => None,
        }
    }
}

impl MarkerFeed for ReplayFeed {
    fn next_markers(&mut self) -> TrackingResult<MarkerPair> {
        if self.rows.is_empty() {
            return Err(TrackingError::MarkerMiss("replay log is empty".into()));
        }
        let row = self.rows[self.cursor];
        self.cursor = (self.cursor + 1) % self.rows.len();
        row.ok_or_else(|| TrackingError::MarkerMiss("unreadable replay row".into()))
    }
}

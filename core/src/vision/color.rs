use super::frame::Frame;
use serde::{Deserialize, Serialize};

/// HSV on the 8-bit OpenCV scale: hue 0–179, saturation and value 0–255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

pub fn rgb_to_hsv(rgb: [u8; 3]) -> Hsv {
    let r = rgb[0] as f64;
    let g = rgb[1] as f64;
    let b = rgb[2] as f64;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = max - min;

    let s = if max > 0.0 { diff / max * 255.0 } else { 0.0 };
    let mut h = if diff == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / diff
    } else if max == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    Hsv {
        h: ((h / 2.0).round() as u16 % 180) as u8,
        s: s.round() as u8,
        v: max as u8,
    }
}

/// Inclusive HSV box a marker pixel must fall in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorTarget {
    pub lower: Hsv,
    pub upper: Hsv,
}

const HUE_TOLERANCE: i16 = 20;
const SV_TOLERANCE: i16 = 60;
const SV_FLOOR: i16 = 30;

impl ColorTarget {
    /// Box around a picked colour, wide enough to catch both markers under
    /// uneven lighting. Saturation and value never drop below 30 so grey
    /// background is excluded.
    pub fn around(picked: Hsv) -> Self {
        let (h, s, v) = (picked.h as i16, picked.s as i16, picked.v as i16);
        Self {
            lower: Hsv {
                h: (h - HUE_TOLERANCE).max(0) as u8,
                s: (s - SV_TOLERANCE).max(SV_FLOOR) as u8,
                v: (v - SV_TOLERANCE).max(SV_FLOOR) as u8,
            },
            upper: Hsv {
                h: (h + HUE_TOLERANCE).min(179) as u8,
                s: (s + SV_TOLERANCE).min(255) as u8,
                v: (v + SV_TOLERANCE).min(255) as u8,
            },
        }
    }

    pub fn from_rgb(rgb: [u8; 3]) -> Self {
        Self::around(rgb_to_hsv(rgb))
    }

    /// Picks the colour under a pixel, as a click on the preview would.
    pub fn pick(frame: &Frame, x: usize, y: usize) -> Option<Self> {
        if x >= frame.width() || y >= frame.height() {
            return None;
        }
        Some(Self::from_rgb(frame.pixel(x, y)))
    }

    pub fn contains(&self, hsv: Hsv) -> bool {
        (self.lower.h..=self.upper.h).contains(&hsv.h)
            && (self.lower.s..=self.upper.s).contains(&hsv.s)
            && (self.lower.v..=self.upper.v).contains(&hsv.v)
    }
}

impl Default for ColorTarget {
    fn default() -> Self {
        Self::around(Hsv {
            h: 100,
            s: 104,
            v: 149,
        })
    }
}

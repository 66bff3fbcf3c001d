use super::color::{rgb_to_hsv, ColorTarget};
use super::frame::Frame;
use crate::prelude::{MarkerPair, Point2D};

/// Capability interface for the marker front end.
///
/// Returns the pivot (topmost) and bob (bottommost) centroids of the two
/// largest regions matching `target`, or `None` when they cannot be found.
pub trait MarkerLocalizer {
    fn localize(&self, frame: &Frame, target: &ColorTarget) -> Option<MarkerPair>;
}

/// HSV threshold → 3×3 opening → 4-connected blobs → two largest centroids.
#[derive(Debug, Clone, Copy)]
pub struct ColorLocalizer {
    pub min_area: usize,
    pub erode_iterations: usize,
    pub dilate_iterations: usize,
}

impl Default for ColorLocalizer {
    fn default() -> Self {
        Self {
            min_area: 50,
            erode_iterations: 1,
            dilate_iterations: 2,
        }
    }
}

struct Blob {
    area: usize,
    sum_x: f64,
    sum_y: f64,
}

impl Blob {
    fn centroid(&self) -> Point2D {
        Point2D::new(self.sum_x / self.area as f64, self.sum_y / self.area as f64)
    }
}

impl ColorLocalizer {
    fn mask(frame: &Frame, target: &ColorTarget) -> Vec<bool> {
        let mut mask = Vec::with_capacity(frame.width() * frame.height());
        for y in 0..frame.height() {
            for x in 0..frame.width() {
                mask.push(target.contains(rgb_to_hsv(frame.pixel(x, y))));
            }
        }
        mask
    }

    /// 3×3 morphology step: erosion keeps a pixel only if its whole
    /// neighbourhood is set, dilation sets it if any neighbour is set.
    fn morph(mask: &[bool], width: usize, height: usize, erode: bool) -> Vec<bool> {
        let mut out = vec![false; mask.len()];
        for y in 0..height {
            for x in 0..width {
                let mut all = true;
                let mut any = false;
                for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
                    for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                        let set = mask[ny * width + nx];
                        all &= set;
                        any |= set;
                    }
                }
                out[y * width + x] = if erode { all } else { any };
            }
        }
        out
    }

    fn blobs(mask: &[bool], width: usize, height: usize) -> Vec<Blob> {
        let mut visited = vec![false; mask.len()];
        let mut blobs = Vec::new();
        let mut stack = Vec::new();

        for start in 0..mask.len() {
            if !mask[start] || visited[start] {
                continue;
            }
            visited[start] = true;
            stack.push(start);
            let mut blob = Blob {
                area: 0,
                sum_x: 0.0,
                sum_y: 0.0,
            };

            while let Some(idx) = stack.pop() {
                let x = idx % width;
                let y = idx / width;
                blob.area += 1;
                blob.sum_x += x as f64;
                blob.sum_y += y as f64;

                let mut visit = |n: usize| {
                    if mask[n] && !visited[n] {
                        visited[n] = true;
                        stack.push(n);
                    }
                };
                if x > 0 {
                    visit(idx - 1);
                }
                if x + 1 < width {
                    visit(idx + 1);
                }
                if y > 0 {
                    visit(idx - width);
                }
                if y + 1 < height {
                    visit(idx + width);
                }
            }
            blobs.push(blob);
        }
        blobs
    }
}

impl MarkerLocalizer for ColorLocalizer {
    fn localize(&self, frame: &Frame, target: &ColorTarget) -> Option<MarkerPair> {
        let (width, height) = (frame.width(), frame.height());
        if width == 0 || height == 0 {
            return None;
        }

        let mut mask = Self::mask(frame, target);
        for _ in 0..self.erode_iterations {
            mask = Self::morph(&mask, width, height, true);
        }
        for _ in 0..self.dilate_iterations {
            mask = Self::morph(&mask, width, height, false);
        }

        let mut blobs = Self::blobs(&mask, width, height);
        blobs.sort_by(|a, b| b.area.cmp(&a.area));
        blobs.truncate(2);
        if blobs.len() < 2 || blobs.iter().any(|b| b.area < self.min_area) {
            return None;
        }

        let mut points = [blobs[0].centroid(), blobs[1].centroid()];
        points.sort_by(|a, b| a.y.total_cmp(&b.y));
        Some(MarkerPair::new(points[0], points[1]))
    }
}

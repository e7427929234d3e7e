//! Arc-length interpolation along a polyline.

use crate::geodesy::distance_meters;
use crate::types::{GeoPoint, Polyline};

/// Normalised progress of an animation, clamped to `[0, 1]`.
pub fn progress(elapsed_ms: f64, duration_ms: f64) -> f64 {
    if duration_ms <= 0.0 {
        return 1.0;
    }
    (elapsed_ms / duration_ms).clamp(0.0, 1.0)
}

/// Segment lengths of a polyline, measured once per animation cycle.
#[derive(Debug, Clone)]
pub struct PathMeasure {
    points: Vec<GeoPoint>,
    segment_lengths: Vec<f64>,
    total_length: f64,
}

impl PathMeasure {
    pub fn new(polyline: &Polyline) -> Self {
        let points = polyline.points().to_vec();
        let segment_lengths: Vec<f64> = points
            .windows(2)
            .map(|pair| distance_meters(&pair[0], &pair[1]))
            .collect();
        let total_length = segment_lengths.iter().sum();
        Self {
            points,
            segment_lengths,
            total_length,
        }
    }

    pub fn total_length(&self) -> f64 {
        self.total_length
    }

    /// Position after travelling `t * total_length`.
    ///
    /// `t` is clamped; `t = 1` is exactly the last vertex.
    pub fn point_at(&self, t: f64) -> Option<GeoPoint> {
        let t = t.clamp(0.0, 1.0);
        let first = *self.points.first()?;
        let last = *self.points.last()?;
        if t >= 1.0 {
            return Some(last);
        }
        if self.total_length <= 0.0 {
            return Some(first);
        }

        let target = t * self.total_length;
        let mut travelled = 0.0;
        for (index, length) in self.segment_lengths.iter().enumerate() {
            if travelled + length >= target && *length > 0.0 {
                let fraction = (target - travelled) / length;
                return Some(self.points[index].lerp(&self.points[index + 1], fraction));
            }
            travelled += length;
        }
        Some(last)
    }
}

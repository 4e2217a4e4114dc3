//! Centroid and in-plane orientation of fitted rectangles.
//!
//! Positions are reported in centimeters relative to the ROI center with the
//! x axis flipped to match the camera mounting. Yaw is measured from the
//! rectangle's long edge to the image x axis.

use std::f64::consts::PI;

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use tracing::trace;

use crate::config::{AngleMode, PoseConfig};
use crate::models::{BoundingRect, DetectedObject, Orientation, Position, ScaleFactors};

const REFERENCE_AXIS: (f64, f64) = (1.0, 0.0);

/// Zeroth and first order moments `(m00, m10, m01)` of a closed polygon.
pub fn polygon_moments(points: &[(f64, f64)]) -> (f64, f64, f64) {
    let n = points.len();
    let (mut m00, mut m10, mut m01) = (0.0, 0.0, 0.0);
    for i in 0..n {
        let (x0, y0) = points[i];
        let (x1, y1) = points[(i + 1) % n];
        let cross = x0 * y1 - x1 * y0;
        m00 += cross;
        m10 += (x0 + x1) * cross;
        m01 += (y0 + y1) * cross;
    }
    (m00 / 2.0, m10 / 6.0, m01 / 6.0)
}

/// Pixel-space centroid, or `None` for a rectangle with zero area.
pub fn centroid(rect: &BoundingRect) -> Option<(f64, f64)> {
    let points = rect.corners.map(|(x, y)| (x as f64, y as f64));
    let (m00, m10, m01) = polygon_moments(&points);
    if m00 == 0.0 {
        return None;
    }
    Some((m10 / m00, m01 / m00))
}

/// The longer of the two edges meeting at the second corner.
pub fn long_edge(rect: &BoundingRect) -> (f64, f64) {
    let (edge1, edge2) = rect.edges();
    if edge2.0.hypot(edge2.1) > edge1.0.hypot(edge1.1) {
        edge2
    } else {
        edge1
    }
}

/// Signed angle rotating `from` onto `to`, normalized into (-pi, pi].
pub fn angle_between(from: (f64, f64), to: (f64, f64)) -> f64 {
    let dot = from.0 * to.0 + from.1 * to.1;
    let cross = from.0 * to.1 - from.1 * to.0;
    let angle = cross.atan2(dot);
    if angle <= -PI { angle + 2.0 * PI } else { angle }
}

/// The arccos expression the original rig shipped with.
///
/// Operator precedence reduces it to `acos(edge.x / |edge|)` shifted through
/// a modulo, so it only yields magnitudes in [0, pi) and maps a reversed
/// axis to -pi. Only the formula is reproduced: corner order from
/// `min_area_rect` differs from the old rig's, so a rotated box may pick the
/// other long edge or its reverse and recorded yaw values need not match.
pub fn legacy_angle(edge: (f64, f64)) -> f64 {
    let (rx, ry) = REFERENCE_AXIS;
    let reference_norm = rx.hypot(ry);
    let edge_norm = edge.0.hypot(edge.1);
    let cosine = reference_norm / edge_norm / rx * edge.0 + ry * edge.1;
    let angle = cosine.clamp(-1.0, 1.0).acos() + PI;
    angle.rem_euclid(2.0 * PI) - PI
}

pub fn round_to(value: f64, precision: Option<u32>) -> f64 {
    match precision {
        Some(digits) => {
            let factor = 10f64.powi(digits as i32);
            (value * factor).round() / factor
        }
        None => value,
    }
}

/// Converts pixel rectangles into real-world poses for one ROI.
#[derive(Debug, Clone)]
pub struct PoseEstimator {
    pub scale: ScaleFactors,
    /// ROI size in pixels.
    pub dimensions: (f64, f64),
    pub z_standoff: f64,
    pub angle_mode: AngleMode,
    pub precision: Option<u32>,
}

impl PoseEstimator {
    pub fn new(config: &PoseConfig, scale: ScaleFactors, dimensions: (f64, f64)) -> Self {
        Self {
            scale,
            dimensions,
            z_standoff: config.z_standoff_cm,
            angle_mode: config.angle_mode,
            precision: config.precision,
        }
    }

    /// Pixel centroid to centimeters from the ROI center.
    pub fn to_world(&self, px: f64, py: f64) -> (f64, f64) {
        let x = round_to((px - self.dimensions.0 / 2.0) * self.scale.x, self.precision);
        let y = round_to((py - self.dimensions.1 / 2.0) * self.scale.y, self.precision);
        (-x, y)
    }

    pub fn yaw(&self, rect: &BoundingRect) -> f64 {
        let edge = long_edge(rect);
        let angle = match self.angle_mode {
            AngleMode::Atan2 => angle_between(REFERENCE_AXIS, edge),
            AngleMode::Legacy => legacy_angle(edge),
        };
        round_to(angle, self.precision)
    }

    /// Pose of one rectangle; degenerate rectangles are silently skipped.
    pub fn estimate(&self, class: &str, rect: &BoundingRect) -> Option<DetectedObject> {
        let Some((cx, cy)) = centroid(rect) else {
            trace!(?rect, "dropping rectangle with zero moment area");
            return None;
        };
        let (x, y) = self.to_world(cx, cy);
        Some(DetectedObject {
            class: class.to_string(),
            position: Position { x, y, z: self.z_standoff },
            orientation: Orientation {
                roll: 0.0,
                pitch: 0.0,
                yaw: self.yaw(rect),
            },
        })
    }
}

/// Outline a rectangle on the debug canvas, two pixels wide.
pub fn draw_rect(canvas: &mut RgbImage, rect: &BoundingRect, color: [u8; 3]) {
    for i in 0..4 {
        let (x0, y0) = rect.corners[i];
        let (x1, y1) = rect.corners[(i + 1) % 4];
        for offset in [0.0, 1.0] {
            draw_line_segment_mut(
                canvas,
                (x0 as f32 + offset, y0 as f32),
                (x1 as f32 + offset, y1 as f32),
                Rgb(color),
            );
        }
    }
}

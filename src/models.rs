use std::ops::Deref;

use image::{ImageBuffer, Rgb, RgbImage};
use imageproc::point::Point;
use serde::Serialize;

/// A captured camera frame, 3 channels of 8-bit RGB.
pub type Frame = RgbImage;

/// Per-pixel (hue, saturation, value) with hue in 0..=179.
///
/// Wrapped so an HSV buffer cannot be passed where an RGB frame is expected.
#[derive(Debug, Clone, PartialEq)]
pub struct HsvImage(ImageBuffer<Rgb<u8>, Vec<u8>>);

impl HsvImage {
    pub fn from_buffer(buffer: ImageBuffer<Rgb<u8>, Vec<u8>>) -> Self {
        Self(buffer)
    }

    pub fn into_inner(self) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
        self.0
    }
}

impl Deref for HsvImage {
    type Target = ImageBuffer<Rgb<u8>, Vec<u8>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Region of interest in frame pixel coordinates (end exclusive).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roi {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
    pub width_cm: f64,
    pub height_cm: f64,
}

impl Roi {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    pub fn dimensions(&self) -> (f64, f64) {
        (self.width() as f64, self.height() as f64)
    }
}

/// Centimeters per pixel along each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub x: f64,
    pub y: f64,
}

/// Outer boundary of a connected foreground region.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
}

impl Contour {
    /// Enclosed polygon area (shoelace), in px².
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: i64 = (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64
            })
            .sum();
        twice.abs() as f64 / 2.0
    }
}

/// Corners of a minimum-area rectangle, in perimeter order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingRect {
    pub corners: [(i32, i32); 4],
}

impl BoundingRect {
    /// The two edges meeting at the second corner.
    pub fn edges(&self) -> ((f64, f64), (f64, f64)) {
        let [p0, p1, p2, _] = self.corners;
        let edge1 = ((p1.0 - p0.0) as f64, (p1.1 - p0.1) as f64);
        let edge2 = ((p2.0 - p1.0) as f64, (p2.1 - p1.1) as f64);
        (edge1, edge2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Roll and pitch are always zero on a planar surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Orientation {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

/// Pose in centimeters/radians relative to the ROI center.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedObject {
    pub class: String,
    pub position: Position,
    pub orientation: Orientation,
}

impl DetectedObject {
    /// `[x, y, z, roll, pitch, yaw]` as consumed by the planner.
    pub fn to_array(&self) -> [f32; 6] {
        [
            self.position.x as f32,
            self.position.y as f32,
            self.position.z as f32,
            self.orientation.roll as f32,
            self.orientation.pitch as f32,
            self.orientation.yaw as f32,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassDetections {
    pub class: String,
    pub objects: Vec<DetectedObject>,
}

/// Everything produced for one frame.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// One entry per configured class, in configuration order.
    pub classes: Vec<ClassDetections>,
    /// Cropped frame with every fitted rectangle outlined.
    pub debug_frame: RgbImage,
    /// Saturating sum of all per-class masked images.
    pub combined: RgbImage,
    /// Full frame with the ROI boundary drawn, when enabled.
    pub roi_overlay: Option<RgbImage>,
}

impl DetectionResult {
    pub fn get(&self, class: &str) -> Option<&[DetectedObject]> {
        self.classes
            .iter()
            .find(|c| c.class == class)
            .map(|c| c.objects.as_slice())
    }

    pub fn total(&self) -> usize {
        self.classes.iter().map(|c| c.objects.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Flat list of six numbers per object, in detection order.
    pub fn flatten(&self, class: &str) -> Vec<f32> {
        self.get(class)
            .unwrap_or_default()
            .iter()
            .flat_map(|o| o.to_array())
            .collect()
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(&self.classes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(class: &str, x: f64, yaw: f64) -> DetectedObject {
        DetectedObject {
            class: class.to_string(),
            position: Position { x, y: 1.5, z: 6.5 },
            orientation: Orientation { roll: 0.0, pitch: 0.0, yaw },
        }
    }

    #[test]
    fn test_flatten_concatenates_in_order() {
        let result = DetectionResult {
            classes: vec![
                ClassDetections {
                    class: "red".into(),
                    objects: vec![object("red", 1.0, 0.5), object("red", -2.0, 0.0)],
                },
                ClassDetections { class: "green".into(), objects: vec![] },
            ],
            debug_frame: RgbImage::new(1, 1),
            combined: RgbImage::new(1, 1),
            roi_overlay: None,
        };

        assert_eq!(
            result.flatten("red"),
            vec![1.0, 1.5, 6.5, 0.0, 0.0, 0.5, -2.0, 1.5, 6.5, 0.0, 0.0, 0.0]
        );
        assert!(result.flatten("green").is_empty());
        assert!(result.flatten("missing").is_empty());
        assert_eq!(result.total(), 2);
    }

    #[test]
    fn test_contour_area() {
        let square = Contour {
            points: vec![Point::new(0, 0), Point::new(10, 0), Point::new(10, 10), Point::new(0, 10)],
        };
        assert_eq!(square.area(), 100.0);

        let line = Contour { points: vec![Point::new(0, 0), Point::new(5, 5), Point::new(9, 9)] };
        assert_eq!(line.area(), 0.0);
    }

    #[test]
    fn test_rect_edges() {
        let rect = BoundingRect { corners: [(0, 0), (10, 0), (10, 4), (0, 4)] };
        assert_eq!(rect.edges(), ((10.0, 0.0), (0.0, 4.0)));
    }
}

use image::{GrayImage, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::min_area_rect;
use imageproc::point::Point;
use tracing::{debug, trace};

use crate::config::ContourConfig;
use crate::detection::preprocessing;
use crate::models::{BoundingRect, Contour};

/// Drop interior points of straight unit-step runs, keeping run endpoints.
pub fn simplify_chain(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let step = |a: Point<i32>, b: Point<i32>| (b.x - a.x, b.y - a.y);
    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect()
}

/// Outermost contours of a binary edge map; holes and nested borders are skipped.
pub fn find_external_contours(edges: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(edges)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|c| Contour {
            points: simplify_chain(&c.points),
        })
        .collect()
}

/// Minimum-area rectangle around a contour with non-zero area.
pub fn fit_rect(contour: &Contour) -> Option<BoundingRect> {
    if contour.area() <= 0.0 {
        return None;
    }
    let corners = min_area_rect(&contour.points);
    Some(BoundingRect {
        corners: corners.map(|p| (p.x, p.y)),
    })
}

/// Edge detection, contour extraction and rectangle fitting for one class.
#[derive(Debug, Clone)]
pub struct ContourDetector {
    pub low_threshold: f32,
    pub high_threshold: f32,
    pub min_area: f64,
}

impl ContourDetector {
    pub fn new(config: &ContourConfig) -> Self {
        Self {
            low_threshold: config.canny_low,
            high_threshold: config.canny_high,
            min_area: config.min_area,
        }
    }

    pub fn edges(&self, masked: &RgbImage) -> GrayImage {
        let plane = preprocessing::max_channel(masked);
        preprocessing::detect_edges(&plane, self.low_threshold, self.high_threshold)
    }

    /// Contours larger than the minimum area, in discovery order.
    pub fn contours(&self, edges: &GrayImage) -> Vec<Contour> {
        find_external_contours(edges)
            .into_iter()
            .filter(|c| {
                let area = c.area();
                if area > self.min_area {
                    true
                } else {
                    trace!(area, min_area = self.min_area, "dropping small contour");
                    false
                }
            })
            .collect()
    }

    /// Fitted rectangles for a masked image, along with its edge map.
    pub fn detect(&self, masked: &RgbImage) -> (GrayImage, Vec<BoundingRect>) {
        let edges = self.edges(masked);
        let contours = self.contours(&edges);
        let rects: Vec<BoundingRect> = contours.iter().filter_map(fit_rect).collect();
        debug!(contours = contours.len(), rects = rects.len(), "fitted rectangles");
        (edges, rects)
    }
}

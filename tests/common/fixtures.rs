use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;
use tabletop_vision::config::{ColorClass, HsvRange, PipelineConfig, Rotation};

pub const FRAME_SIZE: u32 = 300;
pub const BACKGROUND: Rgb<u8> = Rgb([128, 128, 128]);

/// Red with hue near 0 (HSV 1, 211, 230).
pub const RED_LOW: Rgb<u8> = Rgb([230, 45, 40]);
/// Red with hue near the top of the circle (HSV 179, 211, 230).
pub const RED_HIGH: Rgb<u8> = Rgb([230, 40, 45]);
/// Cyan, hue 90: between the two red sub-ranges.
pub const CYAN: Rgb<u8> = Rgb([40, 230, 230]);
/// Green, hue 60.
pub const GREEN: Rgb<u8> = Rgb([40, 220, 40]);

/// Config with well separated test classes and no display rotation or rounding.
pub fn test_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.classes = vec![
        ColorClass::wrapped(
            "red",
            HsvRange::new([0, 100, 100], [10, 255, 255]),
            HsvRange::new([170, 100, 100], [179, 255, 255]),
        ),
        ColorClass::single("green", HsvRange::new([50, 100, 100], [70, 255, 255])),
    ];
    config.display.rotation = Rotation::None;
    config.pose.precision = None;
    config
}

pub fn blank_frame() -> RgbImage {
    RgbImage::from_pixel(FRAME_SIZE, FRAME_SIZE, BACKGROUND)
}

/// Axis-aligned rectangle covering `cx - half_w ..= cx + half_w` (same for y).
pub fn draw_rect(frame: &mut RgbImage, cx: i32, cy: i32, half_w: i32, half_h: i32, color: Rgb<u8>) {
    let rect = Rect::at(cx - half_w, cy - half_h).of_size((2 * half_w + 1) as u32, (2 * half_h + 1) as u32);
    draw_filled_rect_mut(frame, rect, color);
}

/// Rectangle rotated by `degrees` about its center.
pub fn draw_rotated_rect(
    frame: &mut RgbImage,
    cx: f64,
    cy: f64,
    half_w: f64,
    half_h: f64,
    degrees: f64,
    color: Rgb<u8>,
) {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let corners: Vec<Point<i32>> = [(-half_w, -half_h), (half_w, -half_h), (half_w, half_h), (-half_w, half_h)]
        .iter()
        .map(|&(dx, dy)| {
            Point::new(
                (cx + dx * cos - dy * sin).round() as i32,
                (cy + dx * sin + dy * cos).round() as i32,
            )
        })
        .collect();
    draw_polygon_mut(frame, &corners, color);
}

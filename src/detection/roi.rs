use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use tracing::debug;

use crate::config::RoiConfig;
use crate::error::{Result, VisionError};
use crate::models::{Frame, Roi, ScaleFactors};

/// Cropped working region of one frame.
#[derive(Debug, Clone)]
pub struct RoiExtraction {
    pub roi: Roi,
    pub cropped: RgbImage,
    pub scale: ScaleFactors,
}

/// Compute the ROI rectangle for a frame of the given size.
pub fn compute_roi(width: u32, height: u32, config: &RoiConfig) -> Result<Roi> {
    if width == 0 || height == 0 {
        return Err(VisionError::Precondition(format!(
            "frame has empty dimensions {}x{}",
            width, height
        )));
    }

    let roi = Roi {
        x0: (config.left * width as f64) as u32,
        y0: (config.top * height as f64) as u32,
        x1: ((config.right * width as f64) as u32).min(width),
        y1: ((config.bottom * height as f64) as u32).min(height),
        width_cm: config.width_cm,
        height_cm: config.height_cm,
    };

    if roi.x1 <= roi.x0 || roi.y1 <= roi.y0 {
        return Err(VisionError::Config(format!(
            "ROI has no pixels for a {}x{} frame ({},{})-({},{})",
            width, height, roi.x0, roi.y0, roi.x1, roi.y1
        )));
    }

    Ok(roi)
}

pub fn scale_factors(roi: &Roi) -> Result<ScaleFactors> {
    let (w, h) = roi.dimensions();
    if w <= 0.0 || h <= 0.0 || roi.width_cm <= 0.0 || roi.height_cm <= 0.0 {
        return Err(VisionError::Config(format!(
            "cannot derive scale from {}x{} px over {}x{} cm",
            w, h, roi.width_cm, roi.height_cm
        )));
    }
    Ok(ScaleFactors {
        x: roi.width_cm / w,
        y: roi.height_cm / h,
    })
}

/// Crop a frame to its ROI and derive the pixel to centimeter scale.
pub fn extract(frame: &Frame, config: &RoiConfig) -> Result<RoiExtraction> {
    let roi = compute_roi(frame.width(), frame.height(), config)?;
    let scale = scale_factors(&roi)?;
    let cropped = image::imageops::crop_imm(frame, roi.x0, roi.y0, roi.width(), roi.height()).to_image();

    debug!(
        x0 = roi.x0,
        y0 = roi.y0,
        width = roi.width(),
        height = roi.height(),
        scale_x = scale.x,
        scale_y = scale.y,
        "extracted region of interest"
    );

    Ok(RoiExtraction { roi, cropped, scale })
}

/// Copy of the frame with the ROI boundary outlined.
pub fn draw_boundary(frame: &Frame, roi: &Roi, color: [u8; 3]) -> RgbImage {
    let mut canvas = frame.clone();
    let rect = Rect::at(roi.x0 as i32, roi.y0 as i32).of_size(roi.width(), roi.height());
    draw_hollow_rect_mut(&mut canvas, rect, Rgb(color));
    // Second pass inset by one pixel for a 2px border.
    if roi.width() > 2 && roi.height() > 2 {
        let inner = Rect::at(roi.x0 as i32 + 1, roi.y0 as i32 + 1).of_size(roi.width() - 2, roi.height() - 2);
        draw_hollow_rect_mut(&mut canvas, inner, Rgb(color));
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_crop_discards_top_third() {
        let roi = compute_roi(640, 400, &RoiConfig::default()).unwrap();
        assert_eq!((roi.x0, roi.y0, roi.x1, roi.y1), (0, 133, 640, 400));
        assert_eq!(roi.height(), 267);
    }

    #[test]
    fn test_scale_factors() {
        let roi = compute_roi(300, 300, &RoiConfig::default()).unwrap();
        let scale = scale_factors(&roi).unwrap();
        assert!((scale.x - 43.0 / 300.0).abs() < 1e-12);
        assert!((scale.y - 20.0 / 200.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_frame_is_precondition_error() {
        assert!(matches!(
            compute_roi(0, 100, &RoiConfig::default()),
            Err(VisionError::Precondition(_))
        ));
    }

    #[test]
    fn test_collapsed_roi_is_config_error() {
        // A one-row frame has no rows between 60% and 90% of its height.
        let config = RoiConfig { top: 0.6, bottom: 0.9, ..RoiConfig::default() };
        assert!(matches!(compute_roi(10, 1, &config), Err(VisionError::Config(_))));
    }

    #[test]
    fn test_extract_crops_pixels() {
        let mut frame = RgbImage::new(30, 30);
        frame.put_pixel(5, 10, Rgb([1, 2, 3]));
        let extraction = extract(&frame, &RoiConfig::default()).unwrap();
        assert_eq!(extraction.cropped.dimensions(), (30, 20));
        assert_eq!(extraction.cropped.get_pixel(5, 0), &Rgb([1, 2, 3]));
    }

    #[test]
    fn test_boundary_leaves_original_untouched() {
        let frame = RgbImage::from_pixel(20, 30, Rgb([200, 200, 200]));
        let roi = compute_roi(20, 30, &RoiConfig::default()).unwrap();
        let overlay = draw_boundary(&frame, &roi, [0, 0, 0]);
        assert_eq!(overlay.get_pixel(0, 10), &Rgb([0, 0, 0]));
        assert_eq!(frame.get_pixel(0, 10), &Rgb([200, 200, 200]));
    }
}

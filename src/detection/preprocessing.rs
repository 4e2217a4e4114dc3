use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use imageproc::edges::canny;
use imageproc::filter::median_filter;

use crate::config::PreprocessConfig;
use crate::error::{Result, VisionError};
use crate::models::HsvImage;

/// Repeated median filtering to suppress speckle while keeping edges.
pub fn denoise(img: &RgbImage, config: &PreprocessConfig) -> Result<RgbImage> {
    if img.width() == 0 || img.height() == 0 {
        return Err(VisionError::Precondition(format!(
            "cannot denoise an empty {}x{} image",
            img.width(),
            img.height()
        )));
    }

    let radius = config.median_kernel / 2;
    let mut out = img.clone();
    for _ in 0..config.median_passes {
        out = median_filter(&out, radius, radius);
    }
    Ok(out)
}

/// Convert one RGB pixel to 8-bit HSV (hue halved into 0..=179).
#[inline]
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(|c| c as f32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    let s = if max == 0.0 { 0.0 } else { 255.0 * delta / max };

    [((h / 2.0).round() as u32 % 180) as u8, s.round() as u8, max as u8]
}

pub fn to_hsv(img: &RgbImage) -> HsvImage {
    HsvImage::from_buffer(ImageBuffer::from_fn(img.width(), img.height(), |x, y| {
        Rgb(rgb_to_hsv(img.get_pixel(x, y).0))
    }))
}

/// Denoise and convert; returns the blurred RGB image alongside its HSV form.
pub fn preprocess(img: &RgbImage, config: &PreprocessConfig) -> Result<(RgbImage, HsvImage)> {
    let blurred = denoise(img, config)?;
    let hsv = to_hsv(&blurred);
    Ok((blurred, hsv))
}

/// Brightest channel per pixel, so edges of dark saturated colors survive.
pub fn max_channel(img: &RgbImage) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let Rgb([r, g, b]) = *img.get_pixel(x, y);
        Luma([r.max(g).max(b)])
    })
}

/// Detect edges using Canny edge detector
pub fn detect_edges(img: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    canny(img, low_threshold, high_threshold)
}

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};
use tracing::debug;

use crate::config::{ColorClass, MorphologyConfig};
use crate::error::{Result, VisionError};
use crate::models::HsvImage;

/// Cleaned mask for one class plus the original pixels it selects.
#[derive(Debug, Clone)]
pub struct ClassMask {
    pub mask: GrayImage,
    pub masked: RgbImage,
}

impl ClassMask {
    pub fn pixel_count(&self) -> usize {
        self.mask.pixels().filter(|p| p[0] != 0).count()
    }
}

/// Filled ellipse inscribed in a `size` x `size` box, rasterized row by row.
pub fn ellipse_element(size: u32) -> GrayImage {
    let r = (size / 2) as i64;
    let c = r as f64;
    let mut img = GrayImage::new(size, size);
    for i in 0..size as i64 {
        let dy = i - r;
        let dx = if r == 0 {
            0
        } else {
            (c * (((r * r - dy * dy) as f64) / (r * r) as f64).sqrt()).round() as i64
        };
        let j1 = (r - dx).max(0);
        let j2 = (r + dx + 1).min(size as i64);
        for j in j1..j2 {
            img.put_pixel(j as u32, i as u32, Luma([255]));
        }
    }
    img
}

/// HSV thresholding and morphological cleanup, sharing one structuring element.
pub struct Segmenter {
    element: Mask,
    dilate_iterations: u32,
    erode_iterations: u32,
}

impl Segmenter {
    pub fn new(config: &MorphologyConfig) -> Result<Self> {
        if config.kernel_size == 0 || config.kernel_size > 255 {
            return Err(VisionError::Config(format!(
                "structuring element size {} out of range",
                config.kernel_size
            )));
        }
        let center = (config.kernel_size / 2) as u8;
        let element = Mask::from_image(&ellipse_element(config.kernel_size), center, center);
        Ok(Self {
            element,
            dilate_iterations: config.dilate_iterations,
            erode_iterations: config.erode_iterations,
        })
    }

    /// Union of the class's inclusive HSV range tests.
    pub fn threshold(&self, hsv: &HsvImage, class: &ColorClass) -> GrayImage {
        GrayImage::from_fn(hsv.width(), hsv.height(), |x, y| {
            if class.contains(hsv.get_pixel(x, y).0) {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    /// Dilate to close gaps, then erode harder to drop speckle.
    pub fn clean(&self, mask: &GrayImage) -> GrayImage {
        let mut out = mask.clone();
        for _ in 0..self.dilate_iterations {
            out = grayscale_dilate(&out, &self.element);
        }
        for _ in 0..self.erode_iterations {
            out = grayscale_erode(&out, &self.element);
        }
        out
    }

    /// `hsv` drives the range test; `color` is the RGB image the mask is applied to.
    pub fn segment(&self, hsv: &HsvImage, color: &RgbImage, class: &ColorClass) -> Result<ClassMask> {
        if hsv.dimensions() != color.dimensions() {
            return Err(VisionError::Precondition(format!(
                "HSV image is {:?} but color image is {:?}",
                hsv.dimensions(),
                color.dimensions()
            )));
        }

        let mask = self.clean(&self.threshold(hsv, class));
        let masked = apply_mask(color, &mask);
        let result = ClassMask { mask, masked };
        debug!(class = %class.name, pixels = result.pixel_count(), "segmented class");
        Ok(result)
    }
}

/// Keep pixels where the mask is set, black elsewhere.
pub fn apply_mask(color: &RgbImage, mask: &GrayImage) -> RgbImage {
    RgbImage::from_fn(color.width(), color.height(), |x, y| {
        if mask.get_pixel(x, y)[0] != 0 {
            *color.get_pixel(x, y)
        } else {
            Rgb([0, 0, 0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_classes, HsvRange};
    use image::ImageBuffer;

    fn hsv_strip(hues: &[u8]) -> HsvImage {
        HsvImage::from_buffer(ImageBuffer::from_fn(hues.len() as u32, 1, |x, _| Rgb([hues[x as usize], 200, 200])))
    }

    #[test]
    fn test_ellipse_element_shape() {
        let element = ellipse_element(11);
        // Full middle row and column, clipped corners.
        assert!((0..11).all(|x| element.get_pixel(x, 5)[0] == 255));
        assert!((0..11).all(|y| element.get_pixel(5, y)[0] == 255));
        assert_eq!(element.get_pixel(0, 0)[0], 0);
        assert_eq!(element.get_pixel(10, 10)[0], 0);
        // Top row is a short centered run.
        assert_eq!(element.get_pixel(5, 0)[0], 255);
        assert_eq!(element.get_pixel(2, 0)[0], 0);
    }

    #[test]
    fn test_single_pixel_element() {
        let element = ellipse_element(1);
        assert_eq!(element.get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn test_wraparound_union() {
        let segmenter = Segmenter::new(&MorphologyConfig::default()).unwrap();
        let red = &default_classes()[2];
        let hsv = hsv_strip(&[0, 2, 9, 100, 120, 155, 176, 179]);
        let mask = segmenter.threshold(&hsv, red);
        let set: Vec<bool> = mask.pixels().map(|p| p[0] == 255).collect();
        assert_eq!(set, vec![true, true, true, false, false, true, true, true]);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let segmenter = Segmenter::new(&MorphologyConfig::default()).unwrap();
        let class = ColorClass::single("band", HsvRange::new([40, 200, 200], [50, 200, 200]));
        let mask = segmenter.threshold(&hsv_strip(&[39, 40, 50, 51]), &class);
        let set: Vec<bool> = mask.pixels().map(|p| p[0] == 255).collect();
        assert_eq!(set, vec![false, true, true, false]);
    }

    #[test]
    fn test_cleanup_removes_speckle_and_keeps_blob() {
        let segmenter = Segmenter::new(&MorphologyConfig::default()).unwrap();
        let mut mask = GrayImage::new(100, 100);
        // Isolated 3x3 speckle.
        for y in 10..13 {
            for x in 10..13 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        // Solid 40x40 blob.
        for y in 40..80 {
            for x in 40..80 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }

        let cleaned = segmenter.clean(&mask);
        assert_eq!(cleaned.get_pixel(11, 11)[0], 0);
        assert_eq!(cleaned.get_pixel(60, 60)[0], 255);
        // Net erosion shrinks the blob edges.
        assert_eq!(cleaned.get_pixel(40, 60)[0], 0);
    }

    #[test]
    fn test_segment_masks_color() {
        let segmenter = Segmenter::new(&MorphologyConfig::default()).unwrap();
        let class = ColorClass::single("any", HsvRange::new([0, 0, 0], [179, 255, 255]));
        let color = RgbImage::from_pixel(30, 30, Rgb([9, 8, 7]));
        let hsv = HsvImage::from_buffer(ImageBuffer::from_pixel(30, 30, Rgb([0, 0, 0])));
        let out = segmenter.segment(&hsv, &color, &class).unwrap();
        assert_eq!(out.masked.get_pixel(15, 15), &Rgb([9, 8, 7]));
        assert!(out.pixel_count() > 0);
        assert_eq!(out.mask.get_pixel(15, 15)[0], 255);
    }

    #[test]
    fn test_segment_tests_hsv_and_copies_rgb() {
        let segmenter = Segmenter::new(&MorphologyConfig::default()).unwrap();
        let red = &default_classes()[2];
        let color = RgbImage::from_fn(120, 60, |x, _| {
            if x < 60 { Rgb([230, 40, 45]) } else { Rgb([40, 220, 40]) }
        });
        let hsv = crate::detection::preprocessing::to_hsv(&color);
        let out = segmenter.segment(&hsv, &color, red).unwrap();
        assert_eq!(out.masked.get_pixel(30, 30), &Rgb([230, 40, 45]));
        assert_eq!(out.masked.get_pixel(95, 30), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_segment_rejects_mismatched_dimensions() {
        let segmenter = Segmenter::new(&MorphologyConfig::default()).unwrap();
        let class = &default_classes()[0];
        let color = RgbImage::new(10, 10);
        let hsv = HsvImage::from_buffer(ImageBuffer::new(10, 11));
        assert!(matches!(
            segmenter.segment(&hsv, &color, class),
            Err(VisionError::Precondition(_))
        ));
    }
}

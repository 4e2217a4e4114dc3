pub mod roi;
pub mod preprocessing;
pub mod segmentation;
pub mod contours;
pub mod pose;

use image::{GrayImage, Rgb, RgbImage};
use tracing::debug;

use crate::config::{ColorClass, PipelineConfig, Rotation};
use crate::error::Result;
use crate::models::{BoundingRect, ClassDetections, DetectionResult, Frame};
use contours::ContourDetector;
use pose::PoseEstimator;
use segmentation::Segmenter;

/// Intermediate images for one class, kept for debugging.
#[derive(Debug, Clone)]
pub struct ClassTrace {
    pub class: String,
    pub mask: GrayImage,
    pub edges: GrayImage,
    pub rects: Vec<BoundingRect>,
}

#[derive(Debug, Clone, Default)]
pub struct DetectionTrace {
    pub classes: Vec<ClassTrace>,
}

/// Main detection pipeline orchestrator
///
/// Holds only the validated configuration and the precomputed structuring
/// element, so one instance can be shared across threads.
pub struct DetectionPipeline {
    config: PipelineConfig,
    segmenter: Segmenter,
    contours: ContourDetector,
}

impl DetectionPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let segmenter = Segmenter::new(&config.morphology)?;
        let contours = ContourDetector::new(&config.contours);
        Ok(Self {
            config,
            segmenter,
            contours,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full detection pipeline on a frame
    pub fn detect(&self, frame: &Frame) -> Result<DetectionResult> {
        self.detect_traced(frame).map(|(result, _)| result)
    }

    /// Like [`detect`](Self::detect), also returning per-class masks and edges.
    pub fn detect_traced(&self, frame: &Frame) -> Result<(DetectionResult, DetectionTrace)> {
        let extraction = roi::extract(frame, &self.config.roi)?;
        let (blurred, hsv) = preprocessing::preprocess(&extraction.cropped, &self.config.preprocess)?;
        let estimator = PoseEstimator::new(&self.config.pose, extraction.scale, extraction.roi.dimensions());

        let mut debug_frame = extraction.cropped.clone();
        let mut combined = RgbImage::new(blurred.width(), blurred.height());
        let mut classes = Vec::with_capacity(self.config.classes.len());
        let mut trace = DetectionTrace::default();

        for class in &self.config.classes {
            let class_mask = self.segmenter.segment(&hsv, &blurred, class)?;
            accumulate(&mut combined, &class_mask.masked);

            let (edges, rects) = self.contours.detect(&class_mask.masked);
            let mut objects = Vec::with_capacity(rects.len());
            for rect in &rects {
                if let Some(object) = estimator.estimate(&class.name, rect) {
                    pose::draw_rect(&mut debug_frame, rect, self.config.display.outline_color);
                    objects.push(object);
                }
            }

            debug!(class = %class.name, detections = objects.len(), "class complete");
            classes.push(ClassDetections {
                class: class.name.clone(),
                objects,
            });
            trace.classes.push(ClassTrace {
                class: class.name.clone(),
                mask: class_mask.mask,
                edges,
                rects,
            });
        }

        let roi_overlay = self.config.roi.draw_boundary.then(|| {
            let overlay = roi::draw_boundary(frame, &extraction.roi, self.config.display.boundary_color);
            rotate(overlay, self.config.display.rotation)
        });

        let result = DetectionResult {
            classes,
            debug_frame: rotate(debug_frame, self.config.display.rotation),
            combined,
            roi_overlay,
        };
        debug!(total = result.total(), "frame processed");
        Ok((result, trace))
    }

    /// Cleaned mask of a single class (for debugging)
    pub fn get_mask(&self, frame: &Frame, class: &ColorClass) -> Result<GrayImage> {
        let extraction = roi::extract(frame, &self.config.roi)?;
        let (blurred, hsv) = preprocessing::preprocess(&extraction.cropped, &self.config.preprocess)?;
        Ok(self.segmenter.segment(&hsv, &blurred, class)?.mask)
    }
}

fn accumulate(total: &mut RgbImage, layer: &RgbImage) {
    for (dst, src) in total.pixels_mut().zip(layer.pixels()) {
        let Rgb([r, g, b]) = *src;
        dst[0] = dst[0].saturating_add(r);
        dst[1] = dst[1].saturating_add(g);
        dst[2] = dst[2].saturating_add(b);
    }
}

/// Mounting correction for displayed images.
pub fn rotate(img: RgbImage, rotation: Rotation) -> RgbImage {
    match rotation {
        Rotation::None => img,
        Rotation::Rotate180 => image::imageops::rotate180(&img),
    }
}

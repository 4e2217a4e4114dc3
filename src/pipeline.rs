use std::path::{Path, PathBuf};

use image::DynamicImage;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::detection::{rotate, DetectionPipeline, DetectionTrace};
use crate::error::{Result, VisionError};
use crate::models::{DetectionResult, Frame};

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

/// Per-frame entry point: detection plus optional debug image dumps.
pub struct Pipeline {
    detector: DetectionPipeline,
    debug: Option<DebugConfig>,
}

impl Pipeline {
    /// Validate the configuration and build the shared stage resources.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Ok(Self {
            detector: DetectionPipeline::new(config)?,
            debug: None,
        })
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(VisionError::Precondition(format!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                )));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.debug = Some(DebugConfig { output_dir });

        Ok(self)
    }

    pub fn config(&self) -> &PipelineConfig {
        self.detector.config()
    }

    /// Process one frame to completion.
    pub fn run(&self, frame: &Frame) -> Result<DetectionResult> {
        let Some(debug_config) = self.debug.as_ref() else {
            return self.detector.detect(frame);
        };

        let (result, trace) = self.detector.detect_traced(frame)?;
        self.save_debug_outputs(&debug_config.output_dir, frame, &result, &trace)?;
        Ok(result)
    }

    fn save_debug_outputs(
        &self,
        dir: &Path,
        frame: &Frame,
        result: &DetectionResult,
        trace: &DetectionTrace,
    ) -> Result<()> {
        let rotation = self.config().display.rotation;

        save_image(dir, "00_input.png", rotate(frame.clone(), rotation).into())?;
        if let Some(overlay) = &result.roi_overlay {
            save_image(dir, "01_roi_overlay.png", overlay.clone().into())?;
        }
        for class in &trace.classes {
            let name = class.class.to_lowercase().replace(' ', "_");
            save_image(dir, &format!("02_{}_mask.png", name), class.mask.clone().into())?;
            save_image(dir, &format!("03_{}_edges.png", name), class.edges.clone().into())?;
        }
        save_image(dir, "04_combined.png", result.combined.clone().into())?;
        save_image(dir, "05_detections.png", result.debug_frame.clone().into())?;

        info!(dir = %dir.display(), "wrote debug images");
        Ok(())
    }
}

fn save_image(dir: &Path, name: &str, img: DynamicImage) -> Result<()> {
    img.save(dir.join(name))?;
    debug!("Debug: saved {}", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_dir_must_be_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("stale.txt"), b"x").unwrap();
        let result = Pipeline::new(PipelineConfig::default())
            .unwrap()
            .with_debug(dir.path().to_path_buf());
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_output_only_when_requested() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        assert!(pipeline.debug.is_none());

        let dir = tempfile::TempDir::new().unwrap();
        let pipeline = pipeline.with_debug(dir.path().to_path_buf()).unwrap();
        let debug = pipeline.debug.as_ref().unwrap();
        assert_eq!(debug.output_dir.as_path(), dir.path());
    }

    #[test]
    fn test_debug_dir_created() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("nested/debug");
        let pipeline = Pipeline::new(PipelineConfig::default())
            .unwrap()
            .with_debug(target.clone())
            .unwrap();
        assert!(target.is_dir());

        let frame = Frame::from_pixel(60, 60, image::Rgb([128, 128, 128]));
        pipeline.run(&frame).unwrap();
        for name in ["00_input.png", "01_roi_overlay.png", "02_red_mask.png", "03_red_edges.png", "04_combined.png", "05_detections.png"] {
            assert!(target.join(name).is_file(), "missing {}", name);
        }
    }
}

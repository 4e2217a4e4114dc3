//! Tabletop object localization from a single camera frame.
//!
//! Each frame is cropped to the working region, denoised, segmented per
//! color class in HSV space, reduced to minimum-area rectangles and finally
//! converted to real-world poses relative to the ROI center.
//!
//! ```rust,no_run
//! use tabletop_vision::{Pipeline, PipelineConfig};
//!
//! let pipeline = Pipeline::new(PipelineConfig::default())?;
//! let frame = image::open("table.png")?.to_rgb8();
//! let result = pipeline.run(&frame)?;
//! for class in &result.classes {
//!     println!("{}: {:?}", class.class, result.flatten(&class.class));
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;

pub use config::{AngleMode, ColorClass, HsvRange, PipelineConfig, Rotation};
pub use detection::DetectionPipeline;
pub use error::{Result, VisionError};
pub use models::{
    BoundingRect, ClassDetections, Contour, DetectedObject, DetectionResult, Frame, HsvImage,
    Orientation, Position, Roi, ScaleFactors,
};
pub use pipeline::{DebugConfig, Pipeline};

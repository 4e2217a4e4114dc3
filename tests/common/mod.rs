mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from tabletop_vision for tests
pub use tabletop_vision::{
    AngleMode, DetectedObject, DetectionResult, Pipeline, PipelineConfig, Rotation, VisionError,
};

//! Process-wide pipeline configuration.
//!
//! A [`PipelineConfig`] is built once at startup (from defaults or a TOML
//! file), validated, and then only ever borrowed by the pipeline stages.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{Result, VisionError};

/// Largest hue value in the 8-bit HSV convention (degrees / 2).
pub const MAX_HUE: u8 = 179;

/// Inclusive per-channel HSV bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    #[inline]
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| hsv[c] >= self.lower[c] && hsv[c] <= self.upper[c])
    }

    fn validate(&self, class: &str) -> Result<()> {
        for (c, channel) in ["hue", "saturation", "value"].iter().enumerate() {
            if self.lower[c] > self.upper[c] {
                return Err(VisionError::Config(format!(
                    "class '{}': lower {} bound {} exceeds upper bound {}",
                    class, channel, self.lower[c], self.upper[c]
                )));
            }
        }
        if self.upper[0] > MAX_HUE {
            return Err(VisionError::Config(format!(
                "class '{}': hue bound {} is above {}",
                class, self.upper[0], MAX_HUE
            )));
        }
        Ok(())
    }
}

/// A named object class segmented by one or two HSV ranges.
///
/// Two ranges only exist to cover hue wrap-around; membership is the union
/// of the ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorClass {
    pub name: String,
    pub ranges: Vec<HsvRange>,
}

impl ColorClass {
    pub fn single(name: impl Into<String>, range: HsvRange) -> Self {
        Self {
            name: name.into(),
            ranges: vec![range],
        }
    }

    pub fn wrapped(name: impl Into<String>, low: HsvRange, high: HsvRange) -> Self {
        Self {
            name: name.into(),
            ranges: vec![low, high],
        }
    }

    #[inline]
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        self.ranges.iter().any(|r| r.contains(hsv))
    }
}

/// Region of interest crop rule plus the real-world size it covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiConfig {
    /// Crop edges as fractions of the frame size.
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
    /// Real-world ROI size in centimeters; depends on camera depth.
    pub width_cm: f64,
    pub height_cm: f64,
    pub draw_boundary: bool,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            top: 1.0 / 3.0,
            bottom: 1.0,
            left: 0.0,
            right: 1.0,
            width_cm: 43.0,
            height_cm: 20.0,
            draw_boundary: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub median_kernel: u32,
    pub median_passes: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            median_kernel: 5,
            median_passes: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphologyConfig {
    /// Width and height of the elliptical structuring element.
    pub kernel_size: u32,
    pub dilate_iterations: u32,
    pub erode_iterations: u32,
}

impl Default for MorphologyConfig {
    fn default() -> Self {
        Self {
            kernel_size: 11,
            dilate_iterations: 2,
            erode_iterations: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourConfig {
    pub canny_low: f32,
    pub canny_high: f32,
    /// Contours enclosing this many px² or fewer are dropped.
    pub min_area: f64,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            canny_low: 10.0,
            canny_high: 80.0,
            min_area: 800.0,
        }
    }
}

/// How yaw is derived from the long edge of a bounding rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleMode {
    /// Signed angle via `atan2`, normalized into (-pi, pi].
    #[default]
    Atan2,
    /// Arccos-based formula of the original rig; loses the sign of the angle.
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    pub z_standoff_cm: f64,
    pub angle_mode: AngleMode,
    /// Decimal places for reported positions and yaw.
    pub precision: Option<u32>,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            z_standoff_cm: 6.5,
            angle_mode: AngleMode::Atan2,
            precision: Some(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    None,
    #[default]
    Rotate180,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Camera mounting correction applied to debug images only.
    pub rotation: Rotation,
    pub outline_color: [u8; 3],
    pub boundary_color: [u8; 3],
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            rotation: Rotation::Rotate180,
            outline_color: [0, 255, 255],
            boundary_color: [0, 0, 0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub roi: RoiConfig,
    pub preprocess: PreprocessConfig,
    pub morphology: MorphologyConfig,
    pub contours: ContourConfig,
    pub pose: PoseConfig,
    pub display: DisplayConfig,
    pub classes: Vec<ColorClass>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            roi: RoiConfig::default(),
            preprocess: PreprocessConfig::default(),
            morphology: MorphologyConfig::default(),
            contours: ContourConfig::default(),
            pose: PoseConfig::default(),
            display: DisplayConfig::default(),
            classes: default_classes(),
        }
    }
}

/// Classes tuned for the shipped rig's lighting.
pub fn default_classes() -> Vec<ColorClass> {
    vec![
        ColorClass::single("green", HsvRange::new([80, 100, 0], [130, 255, 255])),
        ColorClass::single("yellow", HsvRange::new([5, 60, 75], [40, 130, 255])),
        ColorClass::wrapped(
            "red",
            HsvRange::new([0, 70, 0], [10, 255, 255]),
            HsvRange::new([150, 70, 50], [179, 255, 255]),
        ),
    ]
}

/// Blue range of the shipped rig; it overlaps green so it is not a default class.
pub fn blue_class() -> ColorClass {
    ColorClass::single("blue", HsvRange::new([90, 80, 10], [160, 255, 170]))
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let roi = &self.roi;
        if !(roi.width_cm > 0.0 && roi.height_cm > 0.0) {
            return Err(VisionError::Config(format!(
                "real-world ROI must be positive, got {}x{} cm",
                roi.width_cm, roi.height_cm
            )));
        }
        let fraction_ok = |lo: f64, hi: f64| (0.0..=1.0).contains(&lo) && (0.0..=1.0).contains(&hi) && lo < hi;
        if !fraction_ok(roi.top, roi.bottom) || !fraction_ok(roi.left, roi.right) {
            return Err(VisionError::Config(format!(
                "ROI fractions must satisfy 0 <= start < end <= 1 (top={}, bottom={}, left={}, right={})",
                roi.top, roi.bottom, roi.left, roi.right
            )));
        }

        let pre = &self.preprocess;
        if pre.median_kernel == 0 || pre.median_kernel % 2 == 0 {
            return Err(VisionError::Config(format!(
                "median kernel must be odd and positive, got {}",
                pre.median_kernel
            )));
        }

        let morph = &self.morphology;
        if morph.kernel_size == 0 || morph.kernel_size % 2 == 0 || morph.kernel_size > 255 {
            return Err(VisionError::Config(format!(
                "structuring element size must be odd and within 1..=255, got {}",
                morph.kernel_size
            )));
        }

        let contours = &self.contours;
        if contours.canny_low < 0.0 || contours.canny_low > contours.canny_high {
            return Err(VisionError::Config(format!(
                "edge thresholds must satisfy 0 <= low <= high, got {}/{}",
                contours.canny_low, contours.canny_high
            )));
        }
        if !(contours.min_area >= 0.0) {
            return Err(VisionError::Config(format!(
                "minimum contour area must be non-negative, got {}",
                contours.min_area
            )));
        }

        if self.classes.is_empty() {
            return Err(VisionError::Config("no color classes configured".into()));
        }
        let mut seen = HashSet::new();
        for class in &self.classes {
            if !seen.insert(class.name.as_str()) {
                return Err(VisionError::Config(format!("duplicate class '{}'", class.name)));
            }
            if class.ranges.is_empty() || class.ranges.len() > 2 {
                return Err(VisionError::Config(format!(
                    "class '{}' must have one or two HSV ranges, got {}",
                    class.name,
                    class.ranges.len()
                )));
            }
            for range in &class.ranges {
                range.validate(&class.name)?;
            }
        }

        Ok(())
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Page layout the secondary engine is told to assume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSegMode {
    /// Fully automatic page segmentation.
    Auto,
    /// A single uniform block of text; suits dense documents.
    #[default]
    SingleBlock,
    SingleLine,
    SparseText,
}

impl PageSegMode {
    /// The numeric mode Tesseract expects for `tessedit_pageseg_mode`.
    pub fn tesseract_value(self) -> u8 {
        match self {
            PageSegMode::Auto => 3,
            PageSegMode::SingleBlock => 6,
            PageSegMode::SingleLine => 7,
            PageSegMode::SparseText => 11,
        }
    }
}

/// Tuning for the multi-scale text extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Scale factors the primary engine is run at, in order.
    pub scales: Vec<f32>,
    /// Below this selected confidence the inverted-polarity recheck runs.
    pub recheck_threshold: f32,
    /// Minimum inverted-run confidence for its text to be appended.
    pub append_confidence_floor: f32,
    /// Merge the secondary engine's output when one is configured.
    pub combine_engines: bool,
    pub secondary_page_seg_mode: PageSegMode,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            scales: vec![1.0, 1.5, 2.0],
            recheck_threshold: 0.45,
            append_confidence_floor: 0.2,
            combine_engines: true,
            secondary_page_seg_mode: PageSegMode::SingleBlock,
        }
    }
}

/// Thresholds for the edge-density/variance handwriting heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandwritingConfig {
    /// Fraction of edge pixels above which an image may be handwritten.
    pub edge_density_threshold: f32,
    /// Intensity variance below which an image may be handwritten.
    pub variance_threshold: f64,
    pub canny_low: f32,
    pub canny_high: f32,
}

impl Default for HandwritingConfig {
    fn default() -> Self {
        Self {
            edge_density_threshold: 0.10,
            variance_threshold: 7000.0,
            canny_low: 50.0,
            canny_high: 150.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Maximum number of memoized spelling corrections.
    pub spelling_cache_capacity: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { spelling_cache_capacity: 1024 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub extractor: ExtractorConfig,
    pub handwriting: HandwritingConfig,
    pub validation: ValidationConfig,
}

impl PipelineConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ex = &self.extractor;
        if ex.scales.is_empty() {
            return Err(ConfigError::Invalid("extractor.scales must not be empty".into()));
        }
        if let Some(s) = ex.scales.iter().find(|s| !s.is_finite() || **s <= 0.0) {
            return Err(ConfigError::Invalid(format!("extractor.scales contains non-positive scale {s}")));
        }
        for (name, v) in [
            ("extractor.recheck_threshold", ex.recheck_threshold),
            ("extractor.append_confidence_floor", ex.append_confidence_floor),
            ("handwriting.edge_density_threshold", self.handwriting.edge_density_threshold),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(ConfigError::Invalid(format!("{name} must be within 0.0..=1.0, got {v}")));
            }
        }
        let hw = &self.handwriting;
        if hw.variance_threshold < 0.0 || hw.canny_low < 0.0 || hw.canny_high < hw.canny_low {
            return Err(ConfigError::Invalid(
                "handwriting thresholds must be non-negative with canny_low <= canny_high".into(),
            ));
        }
        Ok(())
    }
}

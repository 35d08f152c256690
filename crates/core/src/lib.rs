pub mod config;
pub mod fields;
pub mod quality;
pub mod values;

pub use config::{ConfigError, ExtractorConfig, HandwritingConfig, PageSegMode, PipelineConfig, ValidationConfig};
pub use fields::{ExtractedField, ExtractedFieldSet, FieldKey, ValidatedFieldSet};
pub use quality::{cer, edit_distance, levenshtein_distance, wer, QualityScore};

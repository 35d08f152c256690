use idis_core::{ExtractedField, ExtractedFieldSet, ValidatedFieldSet, ValidationConfig};

use crate::fuzzy::{FuzzyMatcher, IndelMatcher};
use crate::normalize::{normalize_organization, similarity, Vocabulary};
use crate::spelling::{CachedCorrector, SpellingCorrector};

/// Per-field correction, normalization and confidence scoring.
///
/// `name` is spelling-corrected, `organization`/`org` goes through
/// organization normalization, and every other field passes through with
/// confidence 1.0. Blank values are dropped.
pub struct FieldValidator<C: SpellingCorrector, M: FuzzyMatcher = IndelMatcher> {
    corrector: CachedCorrector<C>,
    matcher: M,
    vocabulary: &'static Vocabulary,
}

impl<C: SpellingCorrector> FieldValidator<C, IndelMatcher> {
    pub fn new(corrector: C, config: &ValidationConfig) -> Self {
        Self::with_matcher(corrector, IndelMatcher, config)
    }
}

impl<C: SpellingCorrector, M: FuzzyMatcher> FieldValidator<C, M> {
    pub fn with_matcher(corrector: C, matcher: M, config: &ValidationConfig) -> Self {
        Self {
            corrector: CachedCorrector::new(corrector, config.spelling_cache_capacity),
            matcher,
            vocabulary: Vocabulary::standard(),
        }
    }

    pub fn validate(&self, fields: &ExtractedFieldSet) -> ValidatedFieldSet {
        fields
            .iter()
            .filter_map(|(key, value)| {
                let value = value.trim();
                if value.is_empty() {
                    return None;
                }
                Some((key, self.validate_field(key, value)))
            })
            .collect()
    }

    fn validate_field(&self, key: &str, value: &str) -> ExtractedField<String> {
        match key.to_lowercase().as_str() {
            "name" => self.correct_with_confidence(value),
            "organization" | "org" => {
                let normalized =
                    normalize_organization(value, self.vocabulary, &self.matcher, &self.corrector);
                if normalized.text.is_empty() {
                    ExtractedField::new(value.to_string(), normalized.confidence)
                } else {
                    ExtractedField::new(normalized.text, normalized.confidence)
                }
            }
            _ => ExtractedField::new(value.to_string(), 1.0),
        }
    }

    fn correct_with_confidence(&self, value: &str) -> ExtractedField<String> {
        let corrected = self.corrector.correct_or_original(value);
        let confidence = similarity(&self.matcher, value, &corrected);
        if corrected.trim().is_empty() {
            return ExtractedField::new(value.to_string(), confidence);
        }
        ExtractedField::new(corrected, confidence)
    }
}

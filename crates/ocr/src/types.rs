use serde::{Deserialize, Serialize};

/// Whether pixel intensities were used as-is or inverted before recognition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    #[default]
    Normal,
    Inverted,
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarity::Normal => write!(f, "normal"),
            Polarity::Inverted => write!(f, "inverted"),
        }
    }
}

/// One primary-engine run at a given scale and polarity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecognitionCandidate {
    pub text: String,
    /// Mean per-detection confidence (0.0–1.0). Always 0.0 for empty text.
    pub confidence: f32,
    pub scale: f32,
    pub polarity: Polarity,
}

impl RecognitionCandidate {
    pub fn new(text: impl Into<String>, confidence: f32, scale: f32, polarity: Polarity) -> Self {
        let text = text.into().trim().to_string();
        let confidence = if text.is_empty() || confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self { text, confidence, scale, polarity }
    }

    /// The candidate produced by a failed or silent engine run.
    pub fn empty(scale: f32, polarity: Polarity) -> Self {
        Self::new(String::new(), 0.0, scale, polarity)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Text length in characters, the selection tie-breaker.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Recognition path chosen once per document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// The handwriting-specialized engine produced the text.
    Handwriting,
    /// Multi-scale primary engine, optionally merged with the secondary.
    General,
}

impl std::fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionStrategy::Handwriting => write!(f, "handwriting"),
            ExtractionStrategy::General => write!(f, "general"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Handwritten,
    Receipt,
    IdCard,
    Document,
}

impl DocumentKind {
    /// Infer the kind from the strategy that produced the text and the
    /// source name.
    pub fn infer(strategy: ExtractionStrategy, source_name: &str) -> Self {
        if strategy == ExtractionStrategy::Handwriting {
            return DocumentKind::Handwritten;
        }
        let name = source_name.to_lowercase();
        if name.contains("receipt") {
            DocumentKind::Receipt
        } else if name.contains("id") {
            DocumentKind::IdCard
        } else {
            DocumentKind::Document
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Handwritten => write!(f, "handwritten"),
            DocumentKind::Receipt => write!(f, "receipt"),
            DocumentKind::IdCard => write!(f, "id_card"),
            DocumentKind::Document => write!(f, "document"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_candidate_has_zero_confidence() {
        let c = RecognitionCandidate::new("   ", 0.9, 1.5, Polarity::Normal);
        assert!(c.is_empty());
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn candidate_confidence_is_clamped_and_text_trimmed() {
        let c = RecognitionCandidate::new("  hello ", 1.7, 1.0, Polarity::Inverted);
        assert_eq!(c.text, "hello");
        assert_eq!(c.confidence, 1.0);
        assert_eq!(RecognitionCandidate::new("x", f32::NAN, 1.0, Polarity::Normal).confidence, 0.0);
    }

    #[test]
    fn char_len_counts_characters() {
        assert_eq!(RecognitionCandidate::new("héllo", 0.5, 1.0, Polarity::Normal).char_len(), 5);
    }

    #[test]
    fn kind_inference() {
        assert_eq!(DocumentKind::infer(ExtractionStrategy::Handwriting, "receipt.png"), DocumentKind::Handwritten);
        assert_eq!(DocumentKind::infer(ExtractionStrategy::General, "Receipt_01.jpg"), DocumentKind::Receipt);
        assert_eq!(DocumentKind::infer(ExtractionStrategy::General, "student_ID.png"), DocumentKind::IdCard);
        assert_eq!(DocumentKind::infer(ExtractionStrategy::General, "letter.png"), DocumentKind::Document);
    }

    #[test]
    fn display_strings() {
        assert_eq!(Polarity::Inverted.to_string(), "inverted");
        assert_eq!(ExtractionStrategy::General.to_string(), "general");
        assert_eq!(DocumentKind::IdCard.to_string(), "id_card");
    }

    #[test]
    fn strategy_serializes_snake_case() {
        let json = serde_json::to_string(&ExtractionStrategy::Handwriting).unwrap();
        assert_eq!(json, "\"handwriting\"");
    }
}

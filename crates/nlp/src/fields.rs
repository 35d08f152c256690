use std::sync::OnceLock;

use idis_core::{ExtractedFieldSet, FieldKey};
use regex::Regex;

use crate::entities::{Entity, EntityLabel, EntityRecognizer};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_id_number,
    r"\b(?i:id|number|no)[\s.:#-]*([A-Z0-9]{4,})");
re!(re_total,
    r"(?i)(?:total|amount|sum|price)\s*[:\-]?\s*[$£€]?\s*(\d+[.,]?\d*)");

re!(re_date_day_first,
    r"\b(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})\b");
re!(re_date_year_first,
    r"\b(\d{4}[/-]\d{1,2}[/-]\d{1,2})\b");
re!(re_date_long,
    r"(?i)\b(\d{1,2}(?:st|nd|rd|th)?\s+(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\.?\s+\d{4})\b");

// ── Public extraction API ─────────────────────────────────────────────────────

/// Regex- and entity-based structured field extraction from cleaned text.
pub struct FieldExtractor<E: EntityRecognizer> {
    recognizer: E,
}

impl<E: EntityRecognizer> FieldExtractor<E> {
    pub fn new(recognizer: E) -> Self {
        Self { recognizer }
    }

    /// Extract every field that can be found. Absence means "not found";
    /// recognizer failures degrade to "no entities".
    pub fn extract(&self, text: &str) -> ExtractedFieldSet {
        if text.trim().is_empty() {
            return ExtractedFieldSet::default();
        }

        let entities = match self.recognizer.entities(text) {
            Ok(entities) => entities,
            Err(e) => {
                tracing::warn!("Entity recognition failed, continuing with patterns only: {e}");
                Vec::new()
            }
        };

        [
            (FieldKey::Name, Self::extract_name(&entities)),
            (FieldKey::IdNumber, Self::extract_id_number(text)),
            (FieldKey::TotalAmount, Self::extract_total(text)),
            (FieldKey::Date, Self::extract_date(text)),
            (FieldKey::Organization, Self::extract_organization(&entities)),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.as_str(), v)))
        .collect()
    }

    // ── Entities ─────────────────────────────────────────────────────────────

    fn extract_name(entities: &[Entity]) -> Option<String> {
        first_entity(entities, |label| *label == EntityLabel::Person)
    }

    fn extract_organization(entities: &[Entity]) -> Option<String> {
        first_entity(entities, EntityLabel::is_organization)
    }

    // ── Patterns ─────────────────────────────────────────────────────────────

    fn extract_id_number(text: &str) -> Option<String> {
        first_capture(re_id_number(), text)
    }

    fn extract_total(text: &str) -> Option<String> {
        first_capture(re_total(), text)
    }

    fn extract_date(text: &str) -> Option<String> {
        // First pattern that matches anywhere wins.
        [re_date_day_first(), re_date_year_first(), re_date_long()]
            .into_iter()
            .find_map(|re| first_capture(re, text))
    }
}

fn first_entity(entities: &[Entity], accept: impl Fn(&EntityLabel) -> bool) -> Option<String> {
    entities
        .iter()
        .find(|e| accept(&e.label))
        .map(|e| e.text.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    let c = re.captures(text)?;
    let value = c.get(1)?.as_str().trim();
    (!value.is_empty()).then(|| value.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

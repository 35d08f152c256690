use std::fmt;
use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::NlpError;

/// Entity categories, named after the usual NER label set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityLabel {
    Person,
    Org,
    Facility,
    Gpe,
    Date,
    Money,
    Other(String),
}

impl EntityLabel {
    pub fn is_organization(&self) -> bool {
        matches!(self, EntityLabel::Org | EntityLabel::Facility)
    }
}

impl fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityLabel::Person => write!(f, "PERSON"),
            EntityLabel::Org => write!(f, "ORG"),
            EntityLabel::Facility => write!(f, "FAC"),
            EntityLabel::Gpe => write!(f, "GPE"),
            EntityLabel::Date => write!(f, "DATE"),
            EntityLabel::Money => write!(f, "MONEY"),
            EntityLabel::Other(s) => write!(f, "{s}"),
        }
    }
}

impl std::str::FromStr for EntityLabel {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_uppercase().as_str() {
            "PERSON" | "PER" => EntityLabel::Person,
            "ORG" => EntityLabel::Org,
            "FAC" => EntityLabel::Facility,
            "GPE" => EntityLabel::Gpe,
            "DATE" => EntityLabel::Date,
            "MONEY" => EntityLabel::Money,
            other => EntityLabel::Other(other.to_string()),
        })
    }
}

/// One labelled span of the input text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub label: EntityLabel,
    pub text: String,
    /// Byte range of the span within the analysed text.
    pub span: Range<usize>,
}

impl Entity {
    pub fn new(label: EntityLabel, text: impl Into<String>, span: Range<usize>) -> Self {
        Self { label, text: text.into(), span }
    }
}

/// Abstraction over a named-entity recognizer.
/// Entities are returned in detection order, which is the scan order used by
/// field extraction.
pub trait EntityRecognizer: Send + Sync {
    fn entities(&self, text: &str) -> Result<Vec<Entity>, NlpError>;
}

// ── Mock recognizer (always available, used for tests) ────────────────────────

/// Returns a preset entity list regardless of input.
pub struct MockEntityRecognizer {
    result: Result<Vec<Entity>, String>,
}

impl MockEntityRecognizer {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self { result: Ok(entities) }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self { result: Err(message.into()) }
    }
}

impl EntityRecognizer for MockEntityRecognizer {
    fn entities(&self, _text: &str) -> Result<Vec<Entity>, NlpError> {
        self.result.clone().map_err(NlpError::Engine)
    }
}

// ── Rule-based recognizer ─────────────────────────────────────────────────────

fn re_labelled_person() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        Regex::new(r"\b(?i:name)\s*[:\-]?\s*([A-Z][A-Za-z'.]+(?:\s+[A-Z][A-Za-z'.]+){0,3})")
            .expect("invalid regex")
    })
}

fn re_honorific_person() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        Regex::new(r"\b(?:Mr|Mrs|Ms|Miss|Dr|Prof)\.?\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+){0,2})")
            .expect("invalid regex")
    })
}

fn re_organization() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        Regex::new(
            r"\b((?:[A-Z][A-Za-z&.]*\s+){0,4}(?:College|Institute|University|School|Academy|Inc|Ltd|LLC|Corporation|Corp|Company|Bank|Hospital|Department|Office))\b",
        )
        .expect("invalid regex")
    })
}

fn re_facility() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        Regex::new(r"\b((?:[A-Z][A-Za-z&.]*\s+){1,4}(?:Airport|Station|Hall|Center|Centre|Stadium|Library))\b")
            .expect("invalid regex")
    })
}

/// Pattern-based recognizer for documents where no statistical NER model is
/// available.
///
/// PERSON spans follow a `Name` label or an honorific; ORG and FAC spans are
/// runs of capitalized words ending in an organization or facility keyword.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedRecognizer;

impl RuleBasedRecognizer {
    /// Words the person patterns tend to swallow from neighbouring labels.
    const LABEL_WORDS: [&'static str; 6] = ["Date", "Total", "Amount", "ID", "No", "Number"];

    fn person_spans(text: &str) -> Vec<Entity> {
        [re_labelled_person(), re_honorific_person()]
            .into_iter()
            .flat_map(|re| re.captures_iter(text))
            .filter_map(|c| c.get(1))
            .filter_map(|m| {
                // Stop the span at the first label word ("Name: Jane Doe Date ...").
                let words: Vec<&str> = m
                    .as_str()
                    .split_whitespace()
                    .take_while(|w| !Self::LABEL_WORDS.contains(w))
                    .collect();
                if words.is_empty() {
                    return None;
                }
                let name = words.join(" ");
                let end = m.start() + name.len();
                Some(Entity::new(EntityLabel::Person, name, m.start()..end))
            })
            .collect()
    }

    fn labelled_spans(text: &str, re: &Regex, label: EntityLabel) -> Vec<Entity> {
        re.captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| Entity::new(label.clone(), m.as_str().trim(), m.range()))
            .collect()
    }
}

impl EntityRecognizer for RuleBasedRecognizer {
    fn entities(&self, text: &str) -> Result<Vec<Entity>, NlpError> {
        let mut found = Self::person_spans(text);
        found.extend(Self::labelled_spans(text, re_organization(), EntityLabel::Org));
        found.extend(Self::labelled_spans(text, re_facility(), EntityLabel::Facility));
        found.sort_by_key(|e| (e.span.start, e.span.end));
        found.dedup_by(|a, b| a.span == b.span);
        Ok(found)
    }
}

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::values;

/// The structured fields the extractor knows how to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    Name,
    Organization,
    Date,
    TotalAmount,
    IdNumber,
}

impl FieldKey {
    pub const ALL: [FieldKey; 5] = [
        FieldKey::Name,
        FieldKey::Organization,
        FieldKey::Date,
        FieldKey::TotalAmount,
        FieldKey::IdNumber,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKey::Name => "name",
            FieldKey::Organization => "organization",
            FieldKey::Date => "date",
            FieldKey::TotalAmount => "total_amount",
            FieldKey::IdNumber => "id_number",
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FieldKey {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(FieldKey::Name),
            "organization" | "org" => Ok(FieldKey::Organization),
            "date" => Ok(FieldKey::Date),
            "total_amount" => Ok(FieldKey::TotalAmount),
            "id_number" => Ok(FieldKey::IdNumber),
            other => Err(format!("Unknown field: '{other}'")),
        }
    }
}

/// A single extracted value with an associated confidence score (0.0–1.0).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedField<T> {
    pub value: T,
    /// Confidence in this value (0.0 = guessed, 1.0 = certain).
    pub confidence: f32,
}

impl<T> ExtractedField<T> {
    pub fn new(value: T, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) };
        Self { value, confidence }
    }
}

/// Raw field values found in one document's cleaned text.
///
/// Keys are present only when the field was found. The set is immutable once
/// built; construct it with [`FromIterator`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedFieldSet {
    fields: BTreeMap<String, String>,
}

impl ExtractedFieldSet {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn field(&self, key: FieldKey) -> Option<&str> {
        self.get(key.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExtractedFieldSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Corrected/normalized field values, each paired with its confidence.
///
/// Storing value and confidence together keeps the value map and the
/// confidence map in one-to-one correspondence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidatedFieldSet {
    fields: BTreeMap<String, ExtractedField<String>>,
}

impl ValidatedFieldSet {
    pub fn get(&self, key: &str) -> Option<&ExtractedField<String>> {
        self.fields.get(key)
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|f| f.value.as_str())
    }

    pub fn confidence(&self, key: &str) -> Option<f32> {
        self.fields.get(key).map(|f| f.confidence)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExtractedField<String>)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Field name → value view.
    pub fn values(&self) -> BTreeMap<&str, &str> {
        self.iter().map(|(k, f)| (k, f.value.as_str())).collect()
    }

    /// Field name → confidence view.
    pub fn confidence_map(&self) -> BTreeMap<&str, f32> {
        self.iter().map(|(k, f)| (k, f.confidence)).collect()
    }

    /// Split into owned (values, confidences) maps with identical key sets.
    pub fn into_parts(self) -> (BTreeMap<String, String>, BTreeMap<String, f32>) {
        let mut values = BTreeMap::new();
        let mut confidence = BTreeMap::new();
        for (k, f) in self.fields {
            confidence.insert(k.clone(), f.confidence);
            values.insert(k, f.value);
        }
        (values, confidence)
    }

    /// Lowest confidence across all fields, `None` when empty.
    pub fn min_confidence(&self) -> Option<f32> {
        self.fields.values().map(|f| f.confidence).reduce(f32::min)
    }

    /// Whether any field falls below `threshold` and should be looked at by a human.
    pub fn needs_review(&self, threshold: f32) -> bool {
        self.min_confidence().is_some_and(|c| c < threshold)
    }

    /// The total amount parsed as a decimal, when present and numeric.
    pub fn total_amount(&self) -> Option<Decimal> {
        values::parse_amount(self.value(FieldKey::TotalAmount.as_str())?)
    }

    /// The document date parsed into a calendar date, when present and valid.
    pub fn date(&self) -> Option<NaiveDate> {
        values::parse_date(self.value(FieldKey::Date.as_str())?)
    }

    /// Re-shape into an extracted set holding only the validated values, so
    /// a result can be fed through validation again.
    pub fn to_extracted(&self) -> ExtractedFieldSet {
        self.iter().map(|(k, f)| (k, f.value.as_str())).collect()
    }
}

impl<K: Into<String>> FromIterator<(K, ExtractedField<String>)> for ValidatedFieldSet {
    fn from_iter<I: IntoIterator<Item = (K, ExtractedField<String>)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::fuzzy::FuzzyMatcher;
use crate::spelling::{CachedCorrector, SpellingCorrector};

/// Degree abbreviations as (case-insensitive pattern, canonical form).
/// Patterns tolerate the `l`/`t` confusion OCR makes in "tech".
pub const DEGREE_PATTERNS: [(&str, &str); 6] = [
    (r"\bb\.?\s?[tl]ech\b", "B.Tech"),
    (r"\bb\.?e\b", "B.E"),
    (r"\bb\.?sc\b", "B.Sc"),
    (r"\bm\.?\s?[tl]ech\b", "M.Tech"),
    (r"\bm\.?sc\b", "M.Sc"),
    (r"\bph\.?d\b", "Ph.D"),
];

pub const DEPARTMENTS: [&str; 7] = [
    "Computer Science and Engineering",
    "CSE",
    "Electronics and Communication",
    "ECE",
    "Mechanical Engineering",
    "Civil Engineering",
    "Electrical Engineering",
];

pub const ORG_TYPES: [&str; 6] = ["College", "Institute", "University", "Department", "Office", "Center"];

/// Confidence assigned when the spaced-out "c s e" token forces a department.
const SPACED_CSE_CONFIDENCE: f32 = 0.9;
/// Component confidence used when neither degree nor department matched.
const NO_COMPONENT_CONFIDENCE: f32 = 0.5;

fn re_spaced_cse() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"(?i)\b(c\W?s\W?e)\b").expect("invalid regex"))
}

/// Canonical reference data for organization normalization.
#[derive(Debug)]
pub struct Vocabulary {
    degrees: Vec<(Regex, String)>,
    departments: Vec<String>,
    org_types: Vec<(Regex, String)>,
}

impl Vocabulary {
    /// Build a vocabulary; degree patterns are matched case-insensitively and
    /// organization types as whole words.
    pub fn new<'a>(
        degrees: impl IntoIterator<Item = (&'a str, &'a str)>,
        departments: impl IntoIterator<Item = &'a str>,
        org_types: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, regex::Error> {
        let degrees = degrees
            .into_iter()
            .map(|(pat, canon)| Ok((Regex::new(&format!("(?i){pat}"))?, canon.to_string())))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        let org_types = org_types
            .into_iter()
            .map(|t| Ok((Regex::new(&format!(r"(?i)\b{}\b", regex::escape(t)))?, t.to_string())))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self {
            degrees,
            departments: departments.into_iter().map(str::to_string).collect(),
            org_types,
        })
    }

    /// The built-in degree, department and organization-type lists, shared
    /// process-wide.
    pub fn standard() -> &'static Vocabulary {
        static V: OnceLock<Vocabulary> = OnceLock::new();
        V.get_or_init(|| {
            Vocabulary::new(DEGREE_PATTERNS, DEPARTMENTS, ORG_TYPES).expect("invalid vocabulary pattern")
        })
    }

    /// First degree pattern found in `text`, as its canonical form.
    pub fn find_degree(&self, text: &str) -> Option<&str> {
        self.degrees
            .iter()
            .find(|(re, _)| re.is_match(text))
            .map(|(_, canon)| canon.as_str())
    }

    /// First organization type present as a whole word.
    pub fn find_org_type(&self, text: &str) -> Option<&str> {
        self.org_types
            .iter()
            .find(|(re, _)| re.is_match(text))
            .map(|(_, t)| t.as_str())
    }

    /// Best fuzzy department match with its score scaled to 0..=1.
    pub fn match_department<M: FuzzyMatcher + ?Sized>(&self, text: &str, matcher: &M) -> Option<(&str, f32)> {
        if text.is_empty() {
            return None;
        }
        let choices: Vec<&str> = self.departments.iter().map(String::as_str).collect();
        let (choice, score) = matcher.best_match(text, &choices)?;
        Some((choice, (score / 100.0) as f32))
    }
}

/// Result of normalizing one organization string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedOrganization {
    pub text: String,
    pub confidence: f32,
    pub degree: Option<String>,
    pub department: Option<String>,
    pub org_type: Option<String>,
}

/// Round to 3 decimals.
pub fn round3(v: f64) -> f32 {
    ((v * 1000.0).round() / 1000.0) as f32
}

/// Similarity between an original string and its replacement, in 0..=1.
pub fn similarity<M: FuzzyMatcher + ?Sized>(matcher: &M, original: &str, replacement: &str) -> f32 {
    round3(matcher.ratio(original, replacement) / 100.0)
}

/// Normalize an organization string into `[degree] [department] [type]`.
///
/// Confidence is the mean of the component scores that matched (0.5 when
/// none did), averaged again with the original-vs-normalized similarity.
/// When no component is found the string is spelling-corrected instead.
pub fn normalize_organization<C, M>(
    text: &str,
    vocabulary: &Vocabulary,
    matcher: &M,
    corrector: &CachedCorrector<C>,
) -> NormalizedOrganization
where
    C: SpellingCorrector,
    M: FuzzyMatcher + ?Sized,
{
    let original = text.trim();
    if original.is_empty() {
        return NormalizedOrganization {
            text: String::new(),
            confidence: 0.0,
            degree: None,
            department: None,
            org_type: None,
        };
    }

    let working = original.replace('_', " ").replace('|', "I").replace("0f", "of");

    let degree = vocabulary.find_degree(&working);
    let mut department = vocabulary.match_department(&working, matcher);
    if department.is_none() && re_spaced_cse().is_match(&working) {
        department = Some(("CSE", SPACED_CSE_CONFIDENCE));
    }
    let org_type = vocabulary.find_org_type(&working);

    let pieces: Vec<&str> = [degree, department.map(|(d, _)| d), org_type]
        .into_iter()
        .flatten()
        .collect();
    let normalized = pieces.join(" ");

    if normalized.is_empty() {
        let corrected = corrector.correct_or_original(original);
        let confidence = similarity(matcher, original, &corrected);
        return NormalizedOrganization {
            text: corrected,
            confidence,
            degree: None,
            department: None,
            org_type: None,
        };
    }

    let components: Vec<f32> = [degree.map(|_| 1.0), department.map(|(_, s)| s)]
        .into_iter()
        .flatten()
        .collect();
    let component_conf = if components.is_empty() {
        NO_COMPONENT_CONFIDENCE
    } else {
        components.iter().sum::<f32>() / components.len() as f32
    };
    let confidence = round3((component_conf as f64 + similarity(matcher, original, &normalized) as f64) / 2.0);

    tracing::debug!(original, normalized = %normalized, confidence, "normalized organization");

    NormalizedOrganization {
        text: normalized,
        confidence,
        degree: degree.map(str::to_string),
        department: department.map(|(d, _)| d.to_string()),
        org_type: org_type.map(str::to_string),
    }
}

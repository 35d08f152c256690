use std::collections::HashMap;
use std::sync::Mutex;

use idis_core::levenshtein_distance;

use crate::error::NlpError;

/// Abstraction over a spelling auto-corrector.
pub trait SpellingCorrector: Send + Sync {
    fn correct(&self, text: &str) -> Result<String, NlpError>;
}

/// Leaves text untouched. Useful when no dictionary is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityCorrector;

impl SpellingCorrector for IdentityCorrector {
    fn correct(&self, text: &str) -> Result<String, NlpError> {
        Ok(text.to_string())
    }
}

// ── Vocabulary corrector ──────────────────────────────────────────────────────

/// Word-level corrector backed by a frequency-weighted vocabulary.
///
/// Each alphabetic token missing from the vocabulary is replaced by the
/// closest vocabulary word within `max_distance` edits. Ties go to the more
/// frequent word, then the alphabetically first. The token's capitalization
/// pattern is carried over to the replacement.
#[derive(Debug, Clone)]
pub struct VocabularyCorrector {
    words: HashMap<String, u32>,
    max_distance: usize,
}

impl VocabularyCorrector {
    pub const DEFAULT_MAX_DISTANCE: usize = 2;

    /// Build from a word list; repeated words count towards frequency.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut freq: HashMap<String, u32> = HashMap::new();
        for w in words {
            let w = w.as_ref().trim().to_lowercase();
            if !w.is_empty() {
                *freq.entry(w).or_insert(0) += 1;
            }
        }
        Self { words: freq, max_distance: Self::DEFAULT_MAX_DISTANCE }
    }

    /// Build from free text, counting every alphabetic word.
    pub fn from_corpus(text: &str) -> Self {
        Self::from_words(text.split(|c: char| !c.is_alphabetic()).filter(|w| !w.is_empty()))
    }

    pub fn with_max_distance(mut self, max_distance: usize) -> Self {
        self.max_distance = max_distance;
        self
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn correct_word(&self, word: &str) -> String {
        let lower = word.to_lowercase();
        if self.words.is_empty() || self.words.contains_key(&lower) {
            return word.to_string();
        }
        let best = self
            .words
            .iter()
            .map(|(w, f)| (levenshtein_distance(&lower, w), std::cmp::Reverse(*f), w))
            .filter(|(d, _, _)| *d <= self.max_distance)
            .min();
        match best {
            Some((_, _, replacement)) => match_case(word, replacement),
            None => word.to_string(),
        }
    }
}

impl SpellingCorrector for VocabularyCorrector {
    fn correct(&self, text: &str) -> Result<String, NlpError> {
        let mut out = String::with_capacity(text.len());
        let mut word = String::new();
        for c in text.chars() {
            if c.is_alphabetic() {
                word.push(c);
            } else {
                if !word.is_empty() {
                    out.push_str(&self.correct_word(&word));
                    word.clear();
                }
                out.push(c);
            }
        }
        if !word.is_empty() {
            out.push_str(&self.correct_word(&word));
        }
        Ok(out)
    }
}

/// Apply the capitalization pattern of `template` (all caps, leading capital,
/// or lowercase) to `word`.
fn match_case(template: &str, word: &str) -> String {
    let letters: Vec<char> = template.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()) {
        return word.to_uppercase();
    }
    if letters.first().is_some_and(|c| c.is_uppercase()) {
        let mut chars = word.chars();
        return match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
    }
    word.to_string()
}

// ── Memoization ───────────────────────────────────────────────────────────────

/// Memoizes another corrector by exact input string.
///
/// Correction is a pure function of its input, so cached entries never go
/// stale. Engine failures return the input unchanged and are not cached. Once
/// `capacity` entries are held, new results are still returned but no longer
/// stored.
pub struct CachedCorrector<C: SpellingCorrector> {
    inner: C,
    capacity: usize,
    cache: Mutex<HashMap<String, String>>,
}

impl<C: SpellingCorrector> CachedCorrector<C> {
    pub fn new(inner: C, capacity: usize) -> Self {
        Self { inner, capacity, cache: Mutex::new(HashMap::new()) }
    }

    /// Corrected text, or the original text when the corrector fails.
    pub fn correct_or_original(&self, text: &str) -> String {
        if let Some(hit) = self.lock().get(text) {
            tracing::debug!("Spelling cache hit for {text:?}");
            return hit.clone();
        }
        match self.inner.correct(text) {
            Ok(corrected) => {
                let mut cache = self.lock();
                if cache.len() < self.capacity {
                    cache.insert(text.to_string(), corrected.clone());
                }
                corrected
            }
            Err(e) => {
                tracing::warn!("Spelling correction failed, keeping original text: {e}");
                text.to_string()
            }
        }
    }

    pub fn cached_entries(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned cache still holds valid memoized pairs.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<C: SpellingCorrector> SpellingCorrector for CachedCorrector<C> {
    fn correct(&self, text: &str) -> Result<String, NlpError> {
        Ok(self.correct_or_original(text))
    }
}

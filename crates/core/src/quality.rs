use serde::{Deserialize, Serialize};

/// Levenshtein edit distance over arbitrary token sequences, using the
/// two-row O(min(m,n)) space algorithm. Insertions, deletions and
/// substitutions all cost 1.
pub fn edit_distance<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let (m, n) = (a.len(), b.len());

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    // Keep the shorter sequence in the inner loop to minimise allocation.
    let (a, b, m, n) = if n <= m { (a, b, m, n) } else { (b, a, n, m) };

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Character-level Levenshtein distance between two strings.
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();
    edit_distance(&a, &b)
}

/// Word and character error rates for one (reference, hypothesis) pair.
///
/// Both rates are edit counts divided by the reference length, so they are
/// not bounded above by 1.0 when the hypothesis is much longer than the
/// reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub wer: f64,
    pub cer: f64,
}

impl QualityScore {
    /// Score a hypothesis against a reference. `None` on either side is
    /// treated as the empty string.
    pub fn score<'a>(
        reference: impl Into<Option<&'a str>>,
        hypothesis: impl Into<Option<&'a str>>,
    ) -> Self {
        let reference = reference.into().unwrap_or("");
        let hypothesis = hypothesis.into().unwrap_or("");
        Self {
            wer: wer(reference, hypothesis),
            cer: cer(reference, hypothesis),
        }
    }
}

/// Character Error Rate: edits / number of reference characters.
pub fn cer(reference: &str, hypothesis: &str) -> f64 {
    let ref_chars: Vec<char> = reference.chars().collect();
    let hyp_chars: Vec<char> = hypothesis.chars().collect();
    error_rate(&ref_chars, &hyp_chars)
}

/// Word Error Rate: edits / number of whitespace-separated reference words.
pub fn wer(reference: &str, hypothesis: &str) -> f64 {
    let ref_words: Vec<&str> = reference.split_whitespace().collect();
    let hyp_words: Vec<&str> = hypothesis.split_whitespace().collect();
    error_rate(&ref_words, &hyp_words)
}

fn error_rate<T: PartialEq>(reference: &[T], hypothesis: &[T]) -> f64 {
    if reference.is_empty() {
        return if hypothesis.is_empty() { 0.0 } else { 1.0 };
    }
    edit_distance(reference, hypothesis) as f64 / reference.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_are_zero() {
        assert_eq!(levenshtein_distance("abc", "abc"), 0);
        assert_eq!(levenshtein_distance("", ""), 0);
    }

    #[test]
    fn empty_string_is_length_of_other() {
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("abc", ""), 3);
    }

    #[test]
    fn single_edits() {
        assert_eq!(levenshtein_distance("cat", "bat"), 1);
        assert_eq!(levenshtein_distance("abc", "abcd"), 1);
        assert_eq!(levenshtein_distance("abcd", "abc"), 1);
    }

    #[test]
    fn commutative() {
        assert_eq!(
            levenshtein_distance("college", "colege"),
            levenshtein_distance("colege", "college")
        );
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert_eq!(levenshtein_distance("café", "cafe"), 1);
    }

    #[test]
    fn word_sequences() {
        let a = ["the", "quick", "brown", "fox"];
        let b = ["the", "quack", "fox"];
        assert_eq!(edit_distance(&a, &b), 2);
    }

    #[test]
    fn cer_of_reference_against_itself_is_zero() {
        assert_eq!(cer("Invoice 2024", "Invoice 2024"), 0.0);
    }

    #[test]
    fn cer_with_empty_reference() {
        assert_eq!(cer("", ""), 0.0);
        assert_eq!(cer("", "x"), 1.0);
        assert_eq!(cer("", "a much longer hypothesis"), 1.0);
    }

    #[test]
    fn cer_counts_per_reference_char() {
        // one substitution over four characters
        assert!((cer("abcd", "abxd") - 0.25).abs() < 1e-9);
    }

    #[test]
    fn wer_over_words() {
        let score = wer("total amount due", "total amount");
        assert!((score - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(wer("   ", ""), 0.0);
    }

    #[test]
    fn rates_can_exceed_one() {
        let s = QualityScore::score("ab", "completely different words here");
        assert!(s.cer > 1.0);
        assert!(s.wer > 1.0);
    }

    #[test]
    fn score_treats_none_as_empty() {
        let s = QualityScore::score(None::<&str>, None::<&str>);
        assert_eq!(s, QualityScore { wer: 0.0, cer: 0.0 });

        let s = QualityScore::score(None::<&str>, "text");
        assert_eq!(s, QualityScore { wer: 1.0, cer: 1.0 });

        let s = QualityScore::score("text", None::<&str>);
        assert_eq!(s, QualityScore { wer: 1.0, cer: 1.0 });
    }

    #[test]
    fn rates_never_negative() {
        for (r, h) in [("", ""), ("a", ""), ("", "a"), ("hello world", "yellow")] {
            let s = QualityScore::score(r, h);
            assert!(s.wer >= 0.0 && s.cer >= 0.0);
        }
    }
}

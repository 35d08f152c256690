use std::collections::BTreeSet;

/// Abstraction over a fuzzy string matcher. Scores range over 0..=100.
pub trait FuzzyMatcher: Send + Sync {
    /// Similarity between two strings.
    fn ratio(&self, a: &str, b: &str) -> f64;

    /// The best-scoring choice for `query`, or `None` when nothing scores
    /// above zero. Earlier choices win exact ties.
    fn best_match<'c>(&self, query: &str, choices: &[&'c str]) -> Option<(&'c str, f64)>;
}

/// Indel-distance based matcher.
///
/// `ratio` is the normalized insertion/deletion similarity. `best_match`
/// scores with a weighted ratio that also considers the best-aligned
/// substring and word-order-insensitive comparisons, scaled down as the
/// length difference grows.
#[derive(Debug, Default, Clone, Copy)]
pub struct IndelMatcher;

impl IndelMatcher {
    /// Best `ratio` of the shorter string against every equally long window
    /// of the longer one.
    pub fn partial_ratio(&self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
        long.windows(short.len())
            .map(|w| indel_ratio(&short, w))
            .fold(0.0, f64::max)
    }

    /// `ratio` after sorting the whitespace-separated tokens of both strings.
    pub fn token_sort_ratio(&self, a: &str, b: &str) -> f64 {
        self.ratio(&sorted_tokens(a), &sorted_tokens(b))
    }

    /// Compares the shared tokens against each side's full token set.
    pub fn token_set_ratio(&self, a: &str, b: &str) -> f64 {
        let ta: BTreeSet<&str> = a.split_whitespace().collect();
        let tb: BTreeSet<&str> = b.split_whitespace().collect();
        if ta.is_empty() || tb.is_empty() {
            return 0.0;
        }
        let sect = join(ta.intersection(&tb));
        let diff_ab = join(ta.difference(&tb));
        let diff_ba = join(tb.difference(&ta));
        if !sect.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
            return 100.0;
        }
        let combined_ab = concat(&sect, &diff_ab);
        let combined_ba = concat(&sect, &diff_ba);
        let mut best = self.ratio(&combined_ab, &combined_ba);
        if !sect.is_empty() {
            best = best
                .max(self.ratio(&sect, &combined_ab))
                .max(self.ratio(&sect, &combined_ba));
        }
        best
    }

    /// Weighted combination of the ratios above.
    pub fn weighted_ratio(&self, a: &str, b: &str) -> f64 {
        let (len_a, len_b) = (a.chars().count(), b.chars().count());
        if len_a == 0 || len_b == 0 {
            return 0.0;
        }
        let len_ratio = len_a.max(len_b) as f64 / len_a.min(len_b) as f64;
        let plain = self.ratio(a, b);
        if len_ratio < 1.5 {
            return plain
                .max(self.token_sort_ratio(a, b) * 0.95)
                .max(self.token_set_ratio(a, b) * 0.95);
        }
        let scale = if len_ratio > 8.0 { 0.6 } else { 0.9 };
        plain
            .max(self.partial_ratio(a, b) * scale)
            .max(self.partial_ratio(&sorted_tokens(a), &sorted_tokens(b)) * scale * 0.95)
    }
}

impl FuzzyMatcher for IndelMatcher {
    fn ratio(&self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        indel_ratio(&a, &b)
    }

    fn best_match<'c>(&self, query: &str, choices: &[&'c str]) -> Option<(&'c str, f64)> {
        let mut best: Option<(&'c str, f64)> = None;
        for &choice in choices {
            let score = self.weighted_ratio(query, choice);
            if score > best.map_or(0.0, |(_, s)| s) {
                best = Some((choice, score));
            }
        }
        best
    }
}

/// `(1 - indel / (len_a + len_b)) * 100`; two empty inputs are identical.
fn indel_ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    let indel = total - 2 * lcs_len(a, b);
    (1.0 - indel as f64 / total as f64) * 100.0
}

/// Longest common subsequence length, two-row dynamic programming.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb { prev[j] + 1 } else { prev[j + 1].max(curr[j]) };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn join<'a, 'b: 'a>(tokens: impl Iterator<Item = &'a &'b str>) -> String {
    tokens.copied().collect::<Vec<_>>().join(" ")
}

fn concat(sect: &str, diff: &str) -> String {
    match (sect.is_empty(), diff.is_empty()) {
        (true, _) => diff.to_string(),
        (_, true) => sect.to_string(),
        _ => format!("{sect} {diff}"),
    }
}

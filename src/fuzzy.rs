//! Approximate string scoring for the knowledge search index.
//!
//! Scores are distances in `[0.0, 1.0]` where `0.0` is a perfect match.
//! Matching is position-insensitive: each query token is compared against
//! every same-length character window of the candidate text and the best
//! window wins, so where in a field a match occurs never affects the score.
//! Windows are compared with normalized Levenshtein distance, which keeps
//! the matcher tolerant of typos and particle residue in Korean queries.

use strsim::normalized_levenshtein;

/// Minimum token length considered for matching. Single-character tokens
/// (stray particles, punctuation survivors) only produce noise.
pub const MIN_TOKEN_CHARS: usize = 2;

/// Per-field score cut-off: a field scoring worse than this does not count
/// as matched, and an item matching on no field is excluded entirely.
pub const SCORE_THRESHOLD: f64 = 0.4;

/// A parsed query pattern: lowercased whitespace-delimited tokens of at
/// least [`MIN_TOKEN_CHARS`] characters.
#[derive(Debug, Clone)]
pub struct Pattern {
    tokens: Vec<String>,
}

impl Pattern {
    /// Parse a normalized query into matchable tokens.
    ///
    /// Returns `None` when no token survives the length cut-off; callers
    /// treat that as "matches nothing".
    pub fn parse(query: &str) -> Option<Pattern> {
        let tokens: Vec<String> = query
            .split_whitespace()
            .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
            .map(|t| t.to_lowercase())
            .collect();
        if tokens.is_empty() {
            None
        } else {
            Some(Pattern { tokens })
        }
    }

    /// Score a single text field. The result is the mean of per-token
    /// distances, each `1 - best_window_similarity`.
    pub fn score_text(&self, text: &str) -> f64 {
        if text.is_empty() {
            return 1.0;
        }
        let lower = text.to_lowercase();
        let chars: Vec<char> = lower.chars().collect();
        let total: f64 = self
            .tokens
            .iter()
            .map(|token| token_distance(token, &lower, &chars))
            .sum();
        total / self.tokens.len() as f64
    }

    /// Score a list field (keywords, tags): the best-scoring element wins.
    pub fn score_list(&self, items: &[String]) -> f64 {
        items
            .iter()
            .map(|item| self.score_text(item))
            .fold(1.0, f64::min)
    }
}

/// Distance of one token to a haystack, in `[0.0, 1.0]`.
fn token_distance(token: &str, hay: &str, hay_chars: &[char]) -> f64 {
    // An exact substring anywhere is a perfect token match.
    if hay.contains(token) {
        return 0.0;
    }

    let n = token.chars().count();
    if hay_chars.len() < n {
        return 1.0 - normalized_levenshtein(token, hay);
    }

    let mut best = 0.0f64;
    for window in hay_chars.windows(n) {
        let candidate: String = window.iter().collect();
        let sim = normalized_levenshtein(token, &candidate);
        if sim > best {
            best = sim;
        }
    }
    1.0 - best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(query: &str) -> Pattern {
        Pattern::parse(query).expect("pattern should parse")
    }

    #[test]
    fn test_parse_drops_short_tokens() {
        assert!(Pattern::parse("a b c").is_none());
        assert!(Pattern::parse("").is_none());
        assert!(Pattern::parse("   ").is_none());
        let p = pattern("ab c de");
        assert_eq!(p.tokens, vec!["ab", "de"]);
    }

    #[test]
    fn test_exact_substring_is_perfect() {
        let p = pattern("다이어트");
        assert_eq!(p.score_text("다이어트나 운동 목표"), 0.0);
    }

    #[test]
    fn test_case_insensitive() {
        let p = pattern("PARA");
        assert_eq!(p.score_text("para 시스템 기초"), 0.0);
    }

    #[test]
    fn test_typo_within_threshold() {
        // One substituted character in a four-character token.
        let p = pattern("다이어트");
        let score = p.score_text("다이어드 식단");
        assert!(score > 0.0 && score <= SCORE_THRESHOLD, "score {}", score);
    }

    #[test]
    fn test_unrelated_text_scores_high() {
        let p = pattern("다이어트");
        assert!(p.score_text("회의록 작성 요령") > SCORE_THRESHOLD);
    }

    #[test]
    fn test_position_does_not_matter() {
        let p = pattern("아카이브");
        let head = p.score_text("아카이브 보관 기준과 정리 주기에 대한 안내");
        let tail = p.score_text("보관 기준과 정리 주기에 대한 안내 아카이브");
        assert_eq!(head, tail);
    }

    #[test]
    fn test_multi_token_mean() {
        let p = pattern("수집 정리");
        assert_eq!(p.score_text("수집 정리 추출 표현"), 0.0);
        let partial = p.score_text("수집만 다루는 문서");
        assert!(partial > 0.0);
    }

    #[test]
    fn test_empty_field_scores_worst() {
        let p = pattern("검색");
        assert_eq!(p.score_text(""), 1.0);
    }

    #[test]
    fn test_list_takes_best_element() {
        let p = pattern("운동");
        let score = p.score_list(&[
            "회계".to_string(),
            "운동".to_string(),
            "기록".to_string(),
        ]);
        assert_eq!(score, 0.0);
        assert_eq!(p.score_list(&[]), 1.0);
    }
}

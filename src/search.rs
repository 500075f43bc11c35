//! Fuzzy knowledge search with weighted multi-field scoring and domain
//! re-ranking.
//!
//! The index is an explicitly constructed service object built once at
//! startup from the loaded knowledge corpus; request handlers receive it by
//! reference. There is no hidden global state and no I/O, so search never
//! fails; malformed or empty queries degrade to empty results.
//!
//! # Ranking Algorithm
//!
//! 1. Normalize the query: strip Korean grammatical particles, collapse
//!    whitespace, lowercase.
//! 2. Score every item across weighted fields (title 0.3, content 0.4,
//!    keywords 0.3, tags 0.2, summary 0.2) with the approximate matcher in
//!    [`crate::fuzzy`]. A field counts only when it beats the 0.4 cut-off;
//!    items with no matching field are excluded. All matching fields
//!    contribute to the combined score.
//! 3. Sort by score ascending (lower is better), then curated items first.
//! 4. Apply the re-rank rules ([`RERANK_RULES`]) in order: fixed
//!    `(trigger terms, action)` pairs evaluated against the raw query. The
//!    health rule re-runs the search with a hand-tuned query and splices its
//!    results in front; the product-identity rule partitions curated items
//!    first. Certain topics need deterministic, curated answers rather than
//!    whatever the fuzzy matcher ranks first.
//! 5. Truncate to 10 results.

use std::collections::HashSet;

use tracing::debug;

use crate::fuzzy::{Pattern, SCORE_THRESHOLD};
use crate::knowledge::{CURATED_CATEGORY, CURATED_TYPE};
use crate::models::{KnowledgeItem, SearchResult};

/// Maximum number of results returned by [`SearchIndex::search`].
pub const RESULT_LIMIT: usize = 10;

/// Searchable fields and their relative weights.
const TITLE_WEIGHT: f64 = 0.3;
const CONTENT_WEIGHT: f64 = 0.4;
const KEYWORDS_WEIGHT: f64 = 0.3;
const TAGS_WEIGHT: f64 = 0.2;
const SUMMARY_WEIGHT: f64 = 0.2;

/// Korean grammatical particles (topic/object/subject/location/possessive
/// markers) replaced with spaces during query normalization.
const PARTICLE_CHARS: &[char] = &[
    '을', '를', '이', '가', '은', '는', '에', '서', '와', '과', '의', '로', '으',
];

/// What a triggered re-rank rule does to the result list.
enum RerankAction {
    /// Re-run the search with a hand-tuned query and splice its results in
    /// front of the broad results.
    PromoteQuery(&'static str),
    /// Move curated items in front of everything else, keeping relative
    /// order within each partition.
    CuratedFirst,
}

/// A prioritized re-rank rule: trigger substrings matched against the raw
/// (lowercased) query, and the reordering it applies.
struct RerankRule {
    terms: &'static [&'static str],
    action: RerankAction,
}

/// Rules are evaluated in order; later rules see the earlier rules' output.
const RERANK_RULES: &[RerankRule] = &[
    // Health goals get the hand-tuned weight-management answer set.
    RerankRule {
        terms: &["살", "다이어트", "운동", "건강", "체중"],
        action: RerankAction::PromoteQuery("건강 다이어트 운동"),
    },
    // Questions about the product itself favor the curated template docs.
    RerankRule {
        terms: &["세컨드브레인", "세컨브레인", "second brain", "템플릿"],
        action: RerankAction::CuratedFirst,
    },
];

/// In-memory fuzzy search index over the knowledge corpus.
pub struct SearchIndex {
    items: Vec<KnowledgeItem>,
}

impl SearchIndex {
    /// Build an index over a loaded corpus. The corpus is immutable for the
    /// index's lifetime.
    pub fn new(items: Vec<KnowledgeItem>) -> Self {
        Self { items }
    }

    /// Ranked fuzzy search, best results first, capped at [`RESULT_LIMIT`].
    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        let normalized = normalize_query(query);
        debug!(query, normalized = normalized.as_str(), "knowledge search");

        let mut results = self.raw_search(&normalized, self.items.iter());

        // Curated content outranks the generic corpus; ties break on score.
        results.sort_by(|a, b| {
            is_curated(&b.item)
                .cmp(&is_curated(&a.item))
                .then(compare_scores(a.score, b.score))
        });

        let lowered = query.to_lowercase();
        for rule in RERANK_RULES {
            if rule.terms.iter().any(|t| lowered.contains(t)) {
                results = self.apply_rule(rule, results);
            }
        }

        results.truncate(RESULT_LIMIT);
        debug!(
            total = results.len(),
            curated = results.iter().filter(|r| is_curated(&r.item)).count(),
            "search results"
        );
        results
    }

    /// Search restricted to the curated subset. Same scoring, no re-ranking
    /// and no result cap.
    pub fn search_curated(&self, query: &str) -> Vec<SearchResult> {
        let normalized = normalize_query(query);
        self.raw_search(&normalized, self.items.iter().filter(|i| is_curated(i)))
    }

    /// All items whose category equals or contains the given label. Exact
    /// membership lookup, no ranking.
    pub fn search_by_category(&self, category: &str) -> Vec<KnowledgeItem> {
        self.items
            .iter()
            .filter(|item| {
                item.category.eq_ignore_ascii_case(category) || item.category.contains(category)
            })
            .cloned()
            .collect()
    }

    /// Union of `related_topics` across the top results for a query, in
    /// first-seen order.
    pub fn find_related_topics(&self, topic: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut topics = Vec::new();
        for result in self.search(topic) {
            for related in result.item.related_topics {
                if seen.insert(related.clone()) {
                    topics.push(related);
                }
            }
        }
        topics
    }

    /// Score the given items against a normalized query, sorted by score
    /// ascending with id as the deterministic tie-breaker.
    fn raw_search<'a>(
        &self,
        normalized: &str,
        items: impl Iterator<Item = &'a KnowledgeItem>,
    ) -> Vec<SearchResult> {
        let Some(pattern) = Pattern::parse(normalized) else {
            return Vec::new();
        };

        let mut results: Vec<SearchResult> = items
            .filter_map(|item| {
                score_item(&pattern, item).map(|score| SearchResult {
                    item: item.clone(),
                    score,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            compare_scores(a.score, b.score).then_with(|| a.item.id.cmp(&b.item.id))
        });
        results
    }

    fn apply_rule(&self, rule: &RerankRule, results: Vec<SearchResult>) -> Vec<SearchResult> {
        match rule.action {
            RerankAction::PromoteQuery(canned) => {
                let promoted = self.raw_search(&normalize_query(canned), self.items.iter());
                if promoted.is_empty() {
                    return results;
                }
                let promoted_ids: HashSet<&str> =
                    promoted.iter().map(|r| r.item.id.as_str()).collect();
                let rest: Vec<SearchResult> = results
                    .into_iter()
                    .filter(|r| !promoted_ids.contains(r.item.id.as_str()))
                    .collect();
                promoted.into_iter().chain(rest).collect()
            }
            RerankAction::CuratedFirst => {
                let (curated, other): (Vec<_>, Vec<_>) = results.into_iter().partition(|r| {
                    is_curated(&r.item) || r.item.category.contains(CURATED_CATEGORY)
                });
                curated.into_iter().chain(other).collect()
            }
        }
    }
}

/// Strip particles, collapse whitespace, lowercase.
pub fn normalize_query(query: &str) -> String {
    let stripped: String = query
        .chars()
        .map(|c| if PARTICLE_CHARS.contains(&c) { ' ' } else { c })
        .collect();
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn is_curated(item: &KnowledgeItem) -> bool {
    item.kind.as_deref() == Some(CURATED_TYPE)
}

fn compare_scores(a: f64, b: f64) -> std::cmp::Ordering {
    a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
}

/// Weighted combination of the per-field scores that beat the cut-off.
/// `None` when no field matches.
fn score_item(pattern: &Pattern, item: &KnowledgeItem) -> Option<f64> {
    let fields = [
        (pattern.score_text(&item.title), TITLE_WEIGHT),
        (pattern.score_text(&item.content), CONTENT_WEIGHT),
        (pattern.score_list(&item.keywords), KEYWORDS_WEIGHT),
        (pattern.score_list(&item.tags), TAGS_WEIGHT),
        (pattern.score_text(&item.summary), SUMMARY_WEIGHT),
    ];

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for (score, weight) in fields {
        if score <= SCORE_THRESHOLD {
            weighted_sum += score * weight;
            weight_total += weight;
        }
    }
    if weight_total == 0.0 {
        None
    } else {
        Some(weighted_sum / weight_total)
    }
}

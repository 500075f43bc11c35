//! Static knowledge-base loading and normalization.
//!
//! The knowledge corpus ships with the binary as JSON under `data/`:
//!
//! - `default-knowledge.json`: the built-in article set;
//! - `detailed-knowledge.json`: an optional larger curated set shaped
//!   `{ "items": [...] }` that replaces the default set when non-empty;
//! - `curated/*.json`: six specialized collections keyed by topic, whose
//!   records come in a looser shape (no mandatory ids, `relatedQuestions`
//!   instead of `relatedTopics`, step objects).
//!
//! Every source-specific shape is normalized into [`KnowledgeItem`] here, at
//! load time, so search and ranking never see heterogeneous records. Items
//! from the curated collections are stamped with [`CURATED_TYPE`] so ranking
//! can prefer them.
//!
//! The result is built once at startup and owned by the caller (typically a
//! [`SearchIndex`](crate::search::SearchIndex)); there is no global state.

use serde::Deserialize;

use crate::error::Result;
use crate::models::KnowledgeItem;

/// `type` discriminator stamped on items from the curated collections.
pub const CURATED_TYPE: &str = "dr-gardner";

/// Default `category` for curated records that do not carry one.
pub const CURATED_CATEGORY: &str = "닥터가드너";

const DEFAULT_KNOWLEDGE: &str = include_str!("../data/default-knowledge.json");
const DETAILED_KNOWLEDGE: &str = include_str!("../data/detailed-knowledge.json");

/// Curated collections, in their fixed merge order.
const CURATED_COLLECTIONS: [&str; 6] = [
    include_str!("../data/curated/core-concepts.json"),
    include_str!("../data/curated/para-system.json"),
    include_str!("../data/curated/code-method.json"),
    include_str!("../data/curated/notion-setup.json"),
    include_str!("../data/curated/automation.json"),
    include_str!("../data/curated/troubleshooting.json"),
];

/// Load the full merged knowledge corpus: base articles first, then the
/// curated collections.
///
/// Ids are not checked for uniqueness across sources; a duplicate id stays
/// as two distinct search entries.
// TODO: report duplicate ids to the corpus maintainer instead of silently
// keeping both; lookups by id are ambiguous until the data is cleaned up.
pub fn load_knowledge_base() -> Result<Vec<KnowledgeItem>> {
    let mut items = load_base_items()?;
    items.extend(load_curated_items()?);
    Ok(items)
}

/// Base article set: the detailed curated file when it has items, otherwise
/// the built-in defaults.
fn load_base_items() -> Result<Vec<KnowledgeItem>> {
    #[derive(Debug, Default, Deserialize)]
    struct DetailedFile {
        #[serde(default)]
        items: Vec<KnowledgeItem>,
    }

    let detailed: DetailedFile = serde_json::from_str(DETAILED_KNOWLEDGE)?;
    if !detailed.items.is_empty() {
        return Ok(detailed.items);
    }
    Ok(serde_json::from_str(DEFAULT_KNOWLEDGE)?)
}

/// Load and normalize the curated collections only.
///
/// Also used by the RAG pipeline to bulk-ingest the curated corpus into a
/// notebook as a synthetic document.
pub fn load_curated_items() -> Result<Vec<KnowledgeItem>> {
    let mut items = Vec::new();
    for raw in CURATED_COLLECTIONS {
        items.extend(flatten_collection(raw)?);
    }
    Ok(items)
}

/// Raw record shape used by the curated collections. Everything the
/// canonical type requires is optional here and filled in during
/// normalization.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CuratedRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    key_points: Vec<String>,
    #[serde(default)]
    examples: Vec<String>,
    #[serde(default)]
    related_topics: Vec<String>,
    /// Some collections carry `relatedQuestions` instead of `relatedTopics`.
    #[serde(default)]
    related_questions: Vec<String>,
    #[serde(default)]
    tips: Vec<String>,
    #[serde(default)]
    steps: Vec<StepRecord>,
}

/// Steps appear either as plain strings or as `{ step, title }` objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StepRecord {
    Text(String),
    Detailed {
        #[serde(default)]
        step: Option<u32>,
        #[serde(default)]
        title: Option<String>,
    },
}

/// Flatten a keyed-object collection into canonical items, preserving the
/// collection's key order.
fn flatten_collection(raw: &str) -> Result<Vec<KnowledgeItem>> {
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)?;
    let mut items = Vec::new();
    for (key, value) in map {
        if !value.is_object() {
            continue;
        }
        let record: CuratedRecord = serde_json::from_value(value)?;
        items.push(normalize_record(&key, record));
    }
    Ok(items)
}

fn normalize_record(key: &str, record: CuratedRecord) -> KnowledgeItem {
    let title = record
        .title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| key.to_string());

    // Missing keywords are synthesized from tags + key points + title.
    let keywords: Vec<String> = record
        .tags
        .iter()
        .chain(record.key_points.iter())
        .chain(std::iter::once(&title))
        .filter(|s| !s.is_empty())
        .cloned()
        .collect();

    let related_topics = if record.related_topics.is_empty() {
        record.related_questions
    } else {
        record.related_topics
    };

    let steps = record
        .steps
        .into_iter()
        .enumerate()
        .map(|(i, step)| match step {
            StepRecord::Text(text) => format!("{}. {}", i + 1, text),
            StepRecord::Detailed { step, title } => format!(
                "{}. {}",
                step.map_or(i as u32 + 1, |n| n),
                title.unwrap_or_default()
            ),
        })
        .collect();

    KnowledgeItem {
        id: record
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| key.to_string()),
        category: record
            .category
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| CURATED_CATEGORY.to_string()),
        title,
        content: record.content,
        keywords,
        tags: record.tags,
        examples: record.examples,
        related_topics,
        key_points: record.key_points,
        summary: record.summary,
        tips: record.tips,
        steps,
        kind: Some(CURATED_TYPE.to_string()),
    }
}

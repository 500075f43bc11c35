//! Core data models used throughout the search and retrieval pipeline.
//!
//! These types represent the knowledge articles served by the fuzzy search
//! index and the notebooks, sources, and vector entries that flow through
//! the RAG ingestion and retrieval pipeline.
//!
//! Serialized field names are camelCase to match the persisted index layout
//! and the bundled knowledge data files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A methodology article in the static knowledge base.
///
/// Loaded once at startup and immutable thereafter. `content` is the primary
/// searchable field; `keywords` are synthesized at load time for records that
/// do not carry them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeItem {
    pub id: String,
    /// Topic tag (e.g. `PARA`, `CODE`, `NOTES`) or a collection label.
    pub category: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub related_topics: Vec<String>,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    /// Source discriminator; curated items carry
    /// [`CURATED_TYPE`](crate::knowledge::CURATED_TYPE) and outrank the
    /// generic corpus.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// A ranked hit from the fuzzy knowledge search.
///
/// Scores are distances in `[0.0, 1.0]`: lower is better, `0.0` is a
/// perfect match. Produced per query, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub item: KnowledgeItem,
    pub score: f64,
}

/// A user-created container for uploaded documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notebook {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// A file uploaded into a notebook. Belongs to exactly one notebook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDocument {
    pub id: String,
    pub notebook_id: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    pub uploaded_at: DateTime<Utc>,
}

/// Provenance attached to a vector entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMeta {
    pub source_id: String,
    pub file_name: String,
    /// 1-based page number for paginated documents, `-` otherwise.
    pub page: String,
    /// Sequential index of the chunk within its page (or whole document).
    pub chunk_index: usize,
}

/// A retrievable unit of text with its embedding.
///
/// Created during ingestion, immutable once written; entries are only ever
/// appended to a notebook's collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorEntry {
    /// Derived id: `<sourceId>_<sequence>`.
    pub id: String,
    pub text: String,
    pub metadata: ChunkMeta,
    pub vector: Vec<f32>,
}

/// Outcome of one ingestion call.
///
/// `source_id` is `None` when the document yielded zero chunks; empty
/// documents are a zero-count success and leave no source record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReceipt {
    pub added: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

/// Provenance record for one retrieval hit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    /// Cosine similarity to the question, higher is better.
    pub score: f32,
    pub file_name: String,
    pub page: String,
    pub source_id: String,
    /// First 200 characters of the chunk text.
    pub snippet: String,
}

/// Ranked contexts plus their provenance, returned by retrieval.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Retrieval {
    pub contexts: Vec<String>,
    pub citations: Vec<Citation>,
}

//! Retrieval orchestration: ingestion and question answering over notebooks.
//!
//! A thin composition over [`RagStore`]. Collaborators (the CLI here, a chat
//! layer elsewhere) call [`RagPipeline::ingest_file`]/[`RagPipeline::ask`]
//! and are themselves responsible for turning contexts into an LLM prompt,
//! and for falling back to the raw contexts when the LLM is unavailable.

use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::knowledge;
use crate::models::{IngestReceipt, KnowledgeItem, Retrieval};
use crate::store::RagStore;

/// File name given to the bulk-ingested knowledge corpus.
const KNOWLEDGE_SOURCE_NAME: &str = "dr-gardner.jsonl";

pub struct RagPipeline {
    store: Arc<RagStore>,
    retrieval: RetrievalConfig,
}

impl RagPipeline {
    pub fn new(store: Arc<RagStore>, retrieval: RetrievalConfig) -> Self {
        Self { store, retrieval }
    }

    /// Ingest an uploaded file; dispatches on MIME type / extension.
    pub async fn ingest_file(
        &self,
        notebook_id: &str,
        file_name: &str,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<IngestReceipt> {
        self.store
            .add_document(notebook_id, file_name, bytes, mime_type)
            .await
    }

    /// Ingest raw text as a synthetic document.
    pub async fn ingest_text(
        &self,
        notebook_id: &str,
        file_name: &str,
        text: &str,
    ) -> Result<IngestReceipt> {
        self.store.add_plain_text(notebook_id, file_name, text).await
    }

    /// Retrieve the best-matching contexts for a question.
    ///
    /// `top_k` defaults to the configured depth and is clamped to the
    /// configured ceiling before it reaches the store.
    pub async fn ask(
        &self,
        notebook_id: &str,
        question: &str,
        top_k: Option<usize>,
    ) -> Result<Retrieval> {
        let k = top_k
            .unwrap_or(self.retrieval.top_k)
            .min(self.retrieval.max_top_k);
        self.store.retrieve(notebook_id, question, k).await
    }

    /// Bulk-ingest the curated knowledge collections into a notebook as one
    /// flattened plain-text document, so notebook questions can draw on the
    /// methodology articles alongside the user's own uploads.
    pub async fn ingest_knowledge(&self, notebook_id: &str) -> Result<IngestReceipt> {
        let items = knowledge::load_curated_items()?;
        let text = flatten_items(&items);
        self.ingest_text(notebook_id, KNOWLEDGE_SOURCE_NAME, &text)
            .await
    }
}

/// Flatten knowledge records into a plain-text document for embedding.
fn flatten_items(items: &[KnowledgeItem]) -> String {
    items
        .iter()
        .map(|item| {
            let mut block = format!("# {}\n{}\n{}", item.title, item.summary, item.content);
            if !item.key_points.is_empty() {
                block.push_str(&format!("\n핵심: {}", item.key_points.join(" • ")));
            }
            if !item.examples.is_empty() {
                block.push_str(&format!("\n예시: {}", item.examples.join(" • ")));
            }
            if !item.tips.is_empty() {
                block.push_str(&format!("\n팁: {}", item.tips.join(" • ")));
            }
            if !item.steps.is_empty() {
                block.push_str(&format!("\n단계: {}", item.steps.join(" / ")));
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

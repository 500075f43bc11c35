//! JSON-file-backed vector store for notebooks and their documents.
//!
//! The entire index is one JSON document with three top-level maps:
//! `notebooks`, `store` (notebook id → vector entries), and `sources`
//! (notebook id → uploaded documents). Every mutation reads the whole file,
//! modifies it in memory, and writes the whole file back. A store-wide
//! async mutex serializes those read-modify-write cycles, so concurrent
//! ingestion into the same store cannot lose updates.
//!
//! A missing or unparseable index file is reinitialized to the empty layout
//! rather than surfaced as an error; the data loss is logged at `warn`.
//!
//! Brute-force cosine similarity over a notebook's entries is the retrieval
//! strategy; write volume and corpus size are small enough that an ANN
//! index would be overkill.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::chunk::chunk_text;
use crate::config::ChunkingConfig;
use crate::embedding::{cosine_similarity, embed_query, Embedder};
use crate::error::{Error, Result};
use crate::extract;
use crate::models::{
    ChunkMeta, Citation, IngestReceipt, Notebook, Retrieval, SourceDocument, VectorEntry,
};

/// Page label used for non-paginated (plain text) sources.
const NO_PAGE: &str = "-";

/// Characters of chunk text stored on citations.
const SNIPPET_CHARS: usize = 200;

/// On-disk shape of the persisted index.
#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    #[serde(default)]
    notebooks: HashMap<String, Notebook>,
    #[serde(default)]
    store: HashMap<String, Vec<VectorEntry>>,
    #[serde(default)]
    sources: HashMap<String, Vec<SourceDocument>>,
}

/// A chunk waiting to be embedded and appended.
struct PendingChunk {
    text: String,
    page: String,
    index: usize,
}

/// Vector store over a single persisted JSON index.
pub struct RagStore {
    index_path: PathBuf,
    embedder: Arc<dyn Embedder>,
    chunking: ChunkingConfig,
    /// Serializes read-modify-write cycles on the index file. Held across
    /// the embed step during ingestion so the notebook-existence check and
    /// the write are one atomic unit from the caller's point of view.
    write_lock: Mutex<()>,
}

impl RagStore {
    pub fn new(
        index_path: impl Into<PathBuf>,
        embedder: Arc<dyn Embedder>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            index_path: index_path.into(),
            embedder,
            chunking,
            write_lock: Mutex::new(()),
        }
    }

    /// Create a notebook and persist it immediately.
    pub async fn create_notebook(&self, title: &str) -> Result<Notebook> {
        let _guard = self.write_lock.lock().await;
        let mut index = self.load_or_init()?;

        let notebook = Notebook {
            id: format!("nb_{}", Uuid::new_v4()),
            title: title.to_string(),
            created_at: Utc::now(),
        };
        index.notebooks.insert(notebook.id.clone(), notebook.clone());
        index.store.entry(notebook.id.clone()).or_default();
        index.sources.entry(notebook.id.clone()).or_default();

        self.write_index(&index)?;
        debug!(notebook = %notebook.id, title, "created notebook");
        Ok(notebook)
    }

    /// All notebooks, oldest first.
    pub async fn list_notebooks(&self) -> Result<Vec<Notebook>> {
        let _guard = self.write_lock.lock().await;
        let index = self.load_or_init()?;
        let mut notebooks: Vec<Notebook> = index.notebooks.into_values().collect();
        notebooks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(notebooks)
    }

    /// Sources uploaded to a notebook, in upload order. Unknown notebooks
    /// yield an empty list.
    pub async fn list_sources(&self, notebook_id: &str) -> Result<Vec<SourceDocument>> {
        let _guard = self.write_lock.lock().await;
        let index = self.load_or_init()?;
        Ok(index.sources.get(notebook_id).cloned().unwrap_or_default())
    }

    /// Ingest an uploaded file into a notebook.
    ///
    /// PDF content (by MIME type or extension) is extracted and paginated;
    /// everything else is treated as UTF-8 plain text. Each page is chunked,
    /// embedded, and appended as vector entries under a fresh source id.
    ///
    /// A document that yields zero chunks is a zero-count success: no source
    /// record is created and the store is left untouched.
    pub async fn add_document(
        &self,
        notebook_id: &str,
        file_name: &str,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<IngestReceipt> {
        let _guard = self.write_lock.lock().await;
        let mut index = self.load_or_init()?;
        require_notebook(&index, notebook_id)?;

        let (pending, page_count) = if extract::is_pdf(file_name, mime_type) {
            let pages = extract::pdf_pages(bytes)?;
            (self.chunk_pages(&pages), Some(pages.len()))
        } else {
            let text = String::from_utf8_lossy(bytes);
            (self.chunk_plain(&text), None)
        };

        self.commit_source(&mut index, notebook_id, file_name, page_count, pending)
            .await
    }

    /// Ingest raw text as a synthetic document, skipping MIME dispatch.
    pub async fn add_plain_text(
        &self,
        notebook_id: &str,
        file_name: &str,
        text: &str,
    ) -> Result<IngestReceipt> {
        let _guard = self.write_lock.lock().await;
        let mut index = self.load_or_init()?;
        require_notebook(&index, notebook_id)?;

        let pending = self.chunk_plain(text);
        self.commit_source(&mut index, notebook_id, file_name, None, pending)
            .await
    }

    /// Top-k retrieval over a notebook's entries by cosine similarity.
    ///
    /// A notebook with no entries (including an unknown notebook id)
    /// yields an empty result, not an error.
    pub async fn retrieve(&self, notebook_id: &str, question: &str, k: usize) -> Result<Retrieval> {
        let entries = {
            let _guard = self.write_lock.lock().await;
            let index = self.load_or_init()?;
            index.store.get(notebook_id).cloned().unwrap_or_default()
        };
        if entries.is_empty() {
            return Ok(Retrieval::default());
        }

        let question_vec = embed_query(self.embedder.as_ref(), question).await?;
        let ranked = top_k_similar(&question_vec, &entries, k);

        let contexts = ranked.iter().map(|(entry, _)| entry.text.clone()).collect();
        let citations = ranked
            .iter()
            .map(|(entry, score)| Citation {
                score: *score,
                file_name: entry.metadata.file_name.clone(),
                page: entry.metadata.page.clone(),
                source_id: entry.metadata.source_id.clone(),
                snippet: entry.text.chars().take(SNIPPET_CHARS).collect(),
            })
            .collect();

        Ok(Retrieval {
            contexts,
            citations,
        })
    }

    fn chunk_plain(&self, text: &str) -> Vec<PendingChunk> {
        chunk_text(text, self.chunking.max_chars, self.chunking.overlap)
            .into_iter()
            .enumerate()
            .map(|(index, text)| PendingChunk {
                text,
                page: NO_PAGE.to_string(),
                index,
            })
            .collect()
    }

    fn chunk_pages(&self, pages: &[String]) -> Vec<PendingChunk> {
        let mut pending = Vec::new();
        for (page_no, page) in pages.iter().enumerate() {
            let chunks = chunk_text(page, self.chunking.max_chars, self.chunking.overlap);
            for (index, text) in chunks.into_iter().enumerate() {
                pending.push(PendingChunk {
                    text,
                    page: (page_no + 1).to_string(),
                    index,
                });
            }
        }
        pending
    }

    /// Embed pending chunks and append them, plus a source record, under the
    /// notebook. Caller must hold the write lock and have validated the
    /// notebook.
    async fn commit_source(
        &self,
        index: &mut IndexFile,
        notebook_id: &str,
        file_name: &str,
        page_count: Option<usize>,
        pending: Vec<PendingChunk>,
    ) -> Result<IngestReceipt> {
        if pending.is_empty() {
            return Ok(IngestReceipt {
                added: 0,
                source_id: None,
            });
        }

        let texts: Vec<String> = pending.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;

        let source_id = format!("src_{}", Uuid::new_v4());
        let added = pending.len();

        index
            .sources
            .entry(notebook_id.to_string())
            .or_default()
            .push(SourceDocument {
                id: source_id.clone(),
                notebook_id: notebook_id.to_string(),
                file_name: file_name.to_string(),
                page_count,
                uploaded_at: Utc::now(),
            });

        let entries = index.store.entry(notebook_id.to_string()).or_default();
        for (sequence, (chunk, vector)) in pending.into_iter().zip(vectors).enumerate() {
            entries.push(VectorEntry {
                id: format!("{}_{}", source_id, sequence),
                text: chunk.text,
                metadata: ChunkMeta {
                    source_id: source_id.clone(),
                    file_name: file_name.to_string(),
                    page: chunk.page,
                    chunk_index: chunk.index,
                },
                vector,
            });
        }

        self.write_index(index)?;
        debug!(
            notebook = notebook_id,
            source = %source_id,
            added,
            "ingested source"
        );
        Ok(IngestReceipt {
            added,
            source_id: Some(source_id),
        })
    }

    /// Read the index file, initializing it (and healing corruption) to the
    /// empty layout.
    fn load_or_init(&self) -> Result<IndexFile> {
        match std::fs::read_to_string(&self.index_path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(index) => Ok(index),
                Err(e) => {
                    warn!(
                        path = %self.index_path.display(),
                        error = %e,
                        "persisted index unreadable, reinitializing empty"
                    );
                    let index = IndexFile::default();
                    self.write_index(&index)?;
                    Ok(index)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let index = IndexFile::default();
                self.write_index(&index)?;
                Ok(index)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write_index(&self, index: &IndexFile) -> Result<()> {
        if let Some(parent) = self.index_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(index)?;
        std::fs::write(&self.index_path, json)?;
        Ok(())
    }
}

fn require_notebook(index: &IndexFile, notebook_id: &str) -> Result<()> {
    if index.notebooks.contains_key(notebook_id) {
        Ok(())
    } else {
        Err(Error::NotebookNotFound {
            id: notebook_id.to_string(),
        })
    }
}

/// Rank entries by cosine similarity to the query vector, best first,
/// truncated to `k`.
fn top_k_similar<'a>(
    query_vec: &[f32],
    entries: &'a [VectorEntry],
    k: usize,
) -> Vec<(&'a VectorEntry, f32)> {
    let mut scored: Vec<(&VectorEntry, f32)> = entries
        .iter()
        .map(|entry| (entry, cosine_similarity(query_vec, &entry.vector)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Deterministic embedder: a char histogram, L2-normalized. Identical
    /// texts embed identically, so exact-text queries retrieve their chunk.
    struct HashEmbedder;

    #[async_trait]
    impl Embedder for HashEmbedder {
        fn model_name(&self) -> &str {
            "hash-test"
        }
        fn dims(&self) -> usize {
            16
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| hash_vector(t)).collect())
        }
    }

    fn hash_vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; 16];
        for (i, c) in text.chars().enumerate() {
            v[(c as usize + i) % 16] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-8);
        v.into_iter().map(|x| x / norm).collect()
    }

    fn test_store(dir: &tempfile::TempDir) -> RagStore {
        RagStore::new(
            dir.path().join("rag-index.json"),
            Arc::new(HashEmbedder),
            ChunkingConfig::default(),
        )
    }

    fn entry(id: &str, vector: Vec<f32>) -> VectorEntry {
        VectorEntry {
            id: id.to_string(),
            text: format!("text {}", id),
            metadata: ChunkMeta {
                source_id: "src_test".to_string(),
                file_name: "t.txt".to_string(),
                page: NO_PAGE.to_string(),
                chunk_index: 0,
            },
            vector,
        }
    }

    #[test]
    fn test_top_k_orders_by_similarity() {
        let entries = vec![
            entry("far", vec![0.0, 1.0, 0.0]),
            entry("near", vec![1.0, 0.0, 0.0]),
            entry("mid", vec![0.8, 0.6, 0.0]),
        ];
        let ranked = top_k_similar(&[1.0, 0.0, 0.0], &entries, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0.id, "near");
        assert_eq!(ranked[1].0.id, "mid");
        assert!(ranked[0].1 > ranked[1].1);
    }

    #[test]
    fn test_top_k_handles_short_lists() {
        let entries = vec![entry("only", vec![1.0, 0.0])];
        assert_eq!(top_k_similar(&[1.0, 0.0], &entries, 5).len(), 1);
        assert!(top_k_similar(&[1.0, 0.0], &[], 5).is_empty());
    }

    #[tokio::test]
    async fn test_create_and_list_notebooks() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = test_store(&dir);

        let a = store.create_notebook("first").await.unwrap();
        let b = store.create_notebook("second").await.unwrap();
        assert!(a.id.starts_with("nb_"));
        assert_ne!(a.id, b.id);

        let notebooks = store.list_notebooks().await.unwrap();
        assert_eq!(notebooks.len(), 2);
        let titles: Vec<&str> = notebooks.iter().map(|n| n.title.as_str()).collect();
        assert!(titles.contains(&"first") && titles.contains(&"second"));
    }

    #[tokio::test]
    async fn test_add_plain_text_records_source_and_entries() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = test_store(&dir);
        let nb = store.create_notebook("docs").await.unwrap();

        let receipt = store
            .add_plain_text(&nb.id, "notes.txt", "PARA sorts work into four buckets.")
            .await
            .unwrap();
        assert_eq!(receipt.added, 1);
        let source_id = receipt.source_id.expect("source recorded");

        let sources = store.list_sources(&nb.id).await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].id, source_id);
        assert_eq!(sources[0].file_name, "notes.txt");
        assert_eq!(sources[0].notebook_id, nb.id);
    }

    #[tokio::test]
    async fn test_zero_chunk_ingest_records_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = test_store(&dir);
        let nb = store.create_notebook("docs").await.unwrap();

        let receipt = store
            .add_plain_text(&nb.id, "empty.txt", "   \n\t  ")
            .await
            .unwrap();
        assert_eq!(receipt.added, 0);
        assert!(receipt.source_id.is_none());
        assert!(store.list_sources(&nb.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_notebook_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = test_store(&dir);

        let err = store
            .add_plain_text("nb_missing", "notes.txt", "content")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotebookNotFound { .. }));
    }

    #[tokio::test]
    async fn test_retrieve_unknown_notebook_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = test_store(&dir);

        let result = store.retrieve("nb_missing", "anything", 5).await.unwrap();
        assert!(result.contexts.is_empty());
        assert!(result.citations.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_index_recovers_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("rag-index.json");
        std::fs::write(&path, "{ not json !!").unwrap();

        let store = RagStore::new(&path, Arc::new(HashEmbedder), ChunkingConfig::default());
        let notebooks = store.list_notebooks().await.unwrap();
        assert!(notebooks.is_empty());

        // The file was rewritten to a valid empty index.
        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(parsed.get("notebooks").is_some());
    }
}

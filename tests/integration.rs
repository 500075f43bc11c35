//! End-to-end tests for the notebook RAG pipeline and the `brain` CLI.
//!
//! Library tests drive the store and pipeline with a deterministic stub
//! embedder so nothing downloads a model. CLI tests only exercise flows that
//! never embed (knowledge search, notebook management, empty-notebook asks).

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use para_brain::chunk::chunk_text;
use para_brain::config::{ChunkingConfig, RetrievalConfig};
use para_brain::embedding::Embedder;
use para_brain::error::Result;
use para_brain::pipeline::RagPipeline;
use para_brain::store::RagStore;

// ============ Stub embedders ============

/// Deterministic embedder: a position-salted char histogram, L2-normalized.
/// Identical texts embed identically, so querying with a chunk's exact text
/// retrieves that chunk first.
struct HashEmbedder;

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash-test"
    }
    fn dims(&self) -> usize {
        32
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| hash_vector(t)).collect())
    }
}

fn hash_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 32];
    for (i, c) in text.chars().enumerate() {
        v[(c as usize + i) % 32] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-8);
    v.into_iter().map(|x| x / norm).collect()
}

/// Embedder with hand-picked axes per marker word, for exact top-k ordering
/// assertions.
struct AxisEmbedder;

#[async_trait]
impl Embedder for AxisEmbedder {
    fn model_name(&self) -> &str {
        "axis-test"
    }
    fn dims(&self) -> usize {
        4
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| axis_vector(t)).collect())
    }
}

fn axis_vector(text: &str) -> Vec<f32> {
    let t = text.to_lowercase();
    if t.contains("alpha") {
        vec![1.0, 0.0, 0.0, 0.0]
    } else if t.contains("beta") {
        vec![0.8, 0.6, 0.0, 0.0]
    } else if t.contains("gamma") {
        vec![0.0, 0.0, 1.0, 0.0]
    } else {
        vec![0.0, 0.0, 0.0, 1.0]
    }
}

fn store_with(dir: &TempDir, embedder: Arc<dyn Embedder>) -> Arc<RagStore> {
    Arc::new(RagStore::new(
        dir.path().join("rag-index.json"),
        embedder,
        ChunkingConfig::default(),
    ))
}

fn pipeline_with(store: Arc<RagStore>) -> RagPipeline {
    RagPipeline::new(store, RetrievalConfig::default())
}

// ============ Ingestion and retrieval ============

#[tokio::test]
async fn test_plain_text_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = store_with(&dir, Arc::new(HashEmbedder));
    let nb = store.create_notebook("round trip").await.unwrap();

    // Long enough to produce several chunks, with no repeating period so
    // every chunk embeds distinctly under the stub.
    let text: String = (0..40)
        .map(|i| format!("Sentence number {} about organizing knowledge. ", i))
        .collect();
    let expected_chunks = chunk_text(&text, 1000, 150);
    assert!(expected_chunks.len() >= 2);

    let receipt = store
        .add_plain_text(&nb.id, "doc.txt", &text)
        .await
        .unwrap();
    assert_eq!(receipt.added, expected_chunks.len());

    let sources = store.list_sources(&nb.id).await.unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].file_name, "doc.txt");

    // Querying with a chunk's exact text returns that chunk first.
    let result = store
        .retrieve(&nb.id, &expected_chunks[1], 1)
        .await
        .unwrap();
    assert_eq!(result.contexts.len(), 1);
    assert_eq!(result.contexts[0], expected_chunks[1]);
    assert_eq!(result.citations.len(), 1);
    assert!(result.citations[0].score > 0.99);
    assert_eq!(result.citations[0].file_name, "doc.txt");
    assert_eq!(result.citations[0].page, "-");
    assert!(result.citations[0].snippet.chars().count() <= 200);
}

#[tokio::test]
async fn test_retrieval_orders_by_similarity() {
    let dir = TempDir::new().unwrap();
    let store = store_with(&dir, Arc::new(AxisEmbedder));
    let nb = store.create_notebook("ordering").await.unwrap();

    for text in ["alpha document", "beta document", "gamma document"] {
        let receipt = store
            .add_plain_text(&nb.id, &format!("{}.txt", text), text)
            .await
            .unwrap();
        assert_eq!(receipt.added, 1);
    }

    let result = store.retrieve(&nb.id, "alpha question", 2).await.unwrap();
    assert_eq!(result.contexts, vec!["alpha document", "beta document"]);
    assert!(result.citations[0].score > result.citations[1].score);

    // k larger than the entry count returns everything, still ordered.
    let all = store.retrieve(&nb.id, "alpha question", 10).await.unwrap();
    assert_eq!(all.contexts.len(), 3);
    assert_eq!(all.contexts[0], "alpha document");
}

#[tokio::test]
async fn test_notebook_isolation() {
    let dir = TempDir::new().unwrap();
    let store = store_with(&dir, Arc::new(AxisEmbedder));
    let a = store.create_notebook("a").await.unwrap();
    let b = store.create_notebook("b").await.unwrap();

    store
        .add_plain_text(&a.id, "a.txt", "alpha content")
        .await
        .unwrap();
    store
        .add_plain_text(&b.id, "b.txt", "gamma content")
        .await
        .unwrap();

    let from_b = store.retrieve(&b.id, "alpha question", 5).await.unwrap();
    assert_eq!(from_b.contexts, vec!["gamma content"]);
    assert!(from_b
        .contexts
        .iter()
        .all(|c| !c.contains("alpha")));
}

#[tokio::test]
async fn test_zero_chunk_document_is_silent_success() {
    let dir = TempDir::new().unwrap();
    let store = store_with(&dir, Arc::new(HashEmbedder));
    let nb = store.create_notebook("empty").await.unwrap();

    let receipt = store
        .add_document(&nb.id, "blank.txt", b"  \n \t ", "text/plain")
        .await
        .unwrap();
    assert_eq!(receipt.added, 0);
    assert!(receipt.source_id.is_none());
    assert!(store.list_sources(&nb.id).await.unwrap().is_empty());

    // The non-zero path always records a source.
    let receipt = store
        .add_document(&nb.id, "real.txt", b"actual content here", "text/plain")
        .await
        .unwrap();
    assert_eq!(receipt.added, 1);
    assert!(receipt.source_id.is_some());
    assert_eq!(store.list_sources(&nb.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_pdf_ingestion_paginates() {
    let dir = TempDir::new().unwrap();
    let store = store_with(&dir, Arc::new(HashEmbedder));
    let nb = store.create_notebook("pdfs").await.unwrap();

    let pdf = minimal_pdf_with_phrase("para method overview");
    let receipt = store
        .add_document(&nb.id, "guide.pdf", &pdf, "application/pdf")
        .await
        .unwrap();
    assert!(receipt.added >= 1);

    let sources = store.list_sources(&nb.id).await.unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].page_count, Some(1));

    let result = store
        .retrieve(&nb.id, "para method overview", 1)
        .await
        .unwrap();
    assert!(result.contexts[0].contains("para method overview"));
    assert_eq!(result.citations[0].page, "1");
}

#[tokio::test]
async fn test_pipeline_clamps_top_k() {
    let dir = TempDir::new().unwrap();
    let store = store_with(&dir, Arc::new(HashEmbedder));
    let pipeline = pipeline_with(Arc::clone(&store));
    let nb = store.create_notebook("clamp").await.unwrap();

    for i in 0..12 {
        pipeline
            .ingest_text(&nb.id, &format!("doc{}.txt", i), &format!("document number {}", i))
            .await
            .unwrap();
    }

    let capped = pipeline.ask(&nb.id, "document", Some(50)).await.unwrap();
    assert_eq!(capped.contexts.len(), 8);

    let default_depth = pipeline.ask(&nb.id, "document", None).await.unwrap();
    assert_eq!(default_depth.contexts.len(), 5);
}

#[tokio::test]
async fn test_pipeline_bulk_knowledge_ingest() {
    let dir = TempDir::new().unwrap();
    let store = store_with(&dir, Arc::new(HashEmbedder));
    let pipeline = pipeline_with(Arc::clone(&store));
    let nb = store.create_notebook("knowledge").await.unwrap();

    let receipt = pipeline.ingest_knowledge(&nb.id).await.unwrap();
    assert!(receipt.added > 1);

    let sources = store.list_sources(&nb.id).await.unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].file_name, "dr-gardner.jsonl");
}

#[tokio::test]
async fn test_persistence_across_store_instances() {
    let dir = TempDir::new().unwrap();
    let nb_id = {
        let store = store_with(&dir, Arc::new(AxisEmbedder));
        let nb = store.create_notebook("durable").await.unwrap();
        store
            .add_plain_text(&nb.id, "a.txt", "alpha content")
            .await
            .unwrap();
        nb.id
    };

    // A fresh store over the same file sees everything.
    let store = store_with(&dir, Arc::new(AxisEmbedder));
    let notebooks = store.list_notebooks().await.unwrap();
    assert_eq!(notebooks.len(), 1);
    let result = store.retrieve(&nb_id, "alpha question", 1).await.unwrap();
    assert_eq!(result.contexts, vec!["alpha content"]);
}

// ============ Minimal PDF builder ============

/// Build a minimal one-page PDF containing the given phrase, with offsets
/// computed so `pdf-extract` can parse it.
fn minimal_pdf_with_phrase(phrase: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 72 712 Td ({}) Tj ET", phrase);
    let mut out = Vec::new();
    let mut offsets = Vec::new();

    out.extend_from_slice(b"%PDF-1.4\n");

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
         /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!(
            "<< /Length {} >> stream\n{}\nendstream",
            content.len(),
            content
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj {} endobj\n", i + 1, body).as_bytes());
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in &offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer << /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_start
        )
        .as_bytes(),
    );
    out
}

// ============ CLI ============

fn brain_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("brain");
    path
}

fn write_config(root: &Path) -> PathBuf {
    let config_path = root.join("brain.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"[index]
path = "{}/rag-index.json"

[embedding]
provider = "disabled"
"#,
            root.display()
        ),
    )
    .unwrap();
    config_path
}

fn run_brain(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = brain_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run brain binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_cli_search_knowledge() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());

    let (stdout, stderr, success) = run_brain(&config, &["search", "PARA 시스템"]);
    assert!(success, "search failed: {}{}", stdout, stderr);
    assert!(stdout.contains("para-basic"), "unexpected output: {}", stdout);
}

#[test]
fn test_cli_search_empty_query() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());

    let (stdout, _, success) = run_brain(&config, &["search", "   "]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_cli_notebook_lifecycle() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());

    let (stdout, stderr, success) = run_brain(&config, &["notebook", "new", "독서 노트"]);
    assert!(success, "notebook new failed: {}{}", stdout, stderr);
    let nb_id = stdout
        .split_whitespace()
        .next()
        .expect("notebook id printed")
        .to_string();
    assert!(nb_id.starts_with("nb_"));

    let (stdout, _, success) = run_brain(&config, &["notebook", "list"]);
    assert!(success);
    assert!(stdout.contains(&nb_id));
    assert!(stdout.contains("독서 노트"));

    // No sources yet; asking an empty notebook degrades to no contexts
    // without touching the (disabled) embedding provider.
    let (stdout, _, success) = run_brain(&config, &["sources", &nb_id]);
    assert!(success);
    assert!(stdout.contains("No sources."));

    let (stdout, _, success) = run_brain(&config, &["ask", &nb_id, "질문"]);
    assert!(success);
    assert!(stdout.contains("No contexts."));
}

#[test]
fn test_cli_category_listing() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());

    let (stdout, _, success) = run_brain(&config, &["category", "CODE"]);
    assert!(success);
    assert!(stdout.contains("code-method"));
}

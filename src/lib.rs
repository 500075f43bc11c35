//! # Para-Brain
//!
//! Knowledge search and local RAG engine for a PARA/CODE second-brain
//! assistant.
//!
//! Para-Brain answers questions about a structured productivity-methodology
//! corpus two ways: a weighted fuzzy search over the built-in knowledge base,
//! and retrieval-augmented lookup over user-uploaded notebooks (documents are
//! chunked, embedded, and ranked by cosine similarity). Answer generation is
//! left to the calling layer; when its LLM is unavailable it can fall back to
//! the raw search results and contexts these engines return.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────────┐
//! │  Knowledge    │──▶│  SearchIndex      │──▶ ranked articles
//! │  data/*.json  │    │  fuzzy + rerank  │
//! └──────────────┘    └──────────────────┘
//!
//! ┌──────────────┐    ┌───────────────────────┐    ┌─────────────┐
//! │  Uploads      │──▶│  Chunk → Embed        │──▶│  JSON index  │
//! │  pdf / text   │    │  (RagStore ingest)    │    │  on disk     │
//! └──────────────┘    └───────────────────────┘    └──────┬──────┘
//!                                                        │
//!                          question ──▶ embed ──▶ cosine top-k
//!                                                        │
//!                                          contexts + citations
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types |
//! | [`knowledge`] | Static corpus loading and normalization |
//! | [`fuzzy`] | Approximate string scoring |
//! | [`search`] | Fuzzy search index with domain re-ranking |
//! | [`chunk`] | Overlapping text chunking |
//! | [`extract`] | PDF text extraction |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Persisted vector store |
//! | [`pipeline`] | Ingestion/retrieval orchestration |

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod fuzzy;
pub mod knowledge;
pub mod models;
pub mod pipeline;
pub mod search;
pub mod store;

pub use error::{Error, Result};

//! # docqa
//!
//! A document Q&A glue service: upload documents, run semantic search over a
//! managed vector index, and chat with a local generation model grounded in
//! the retrieved text.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────┐   ┌───────────────┐   ┌──────────┐
//! │ /upload │──▶│   Pipeline    │──▶│  Qdrant  │
//! │ /search │   │ extract/embed │   │  (REST)  │
//! │ /chat   │   └──────┬────────┘   └──────────┘
//! └─────────┘          │
//!                      ▼
//!               ┌──────────────┐
//!               │    Ollama    │
//!               │ embed + gen  │
//!               └──────────────┘
//! ```
//!
//! Each request runs its pipeline as a strictly sequential chain of calls to
//! the external services; there is no internal parallelism, batching, or
//! retry. All similarity search is delegated to the external index.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Pipeline error taxonomy |
//! | [`extract`] | PDF / DOCX / TXT text extraction |
//! | [`embedding`] | Embedding client (Ollama `/api/embeddings`) |
//! | [`generation`] | Generation client (Ollama `/api/generate`) |
//! | [`store`] | Vector index clients (Qdrant REST, in-memory) |
//! | [`pipeline`] | Ingest / search / chat orchestration |
//! | [`server`] | HTTP server |

pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generation;
pub mod pipeline;
pub mod server;
pub mod store;

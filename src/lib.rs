//! # Ragmill
//!
//! A local-first retrieval-augmented generation pipeline over SQLite.
//!
//! Ragmill ingests documents (PDF, DOCX, plain text), normalizes and
//! chunks them, embeds each chunk, and stores the vectors in SQLite
//! under content-addressed ids so re-ingestion is idempotent. At query
//! time it retrieves the nearest chunks, folds them together with
//! recent conversation history into a chat prompt, and calls an
//! OpenAI-compatible generation endpoint.
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌─────────┐
//! │ Documents │──▶│ Extract+Chunk │──▶│ SQLite  │
//! │ pdf/docx  │   │   +Embed      │   │ vectors │
//! └──────────┘   └───────────────┘   └────┬────┘
//!                                         │ k-NN
//!                   history ──▶ ┌─────────▼────┐   ┌─────┐
//!                               │   Assemble    │──▶│ LLM │
//!                   question ──▶└──────────────┘   └─────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ragmill init                   # create database
//! ragmill ingest ./docs          # extract, chunk, embed, store
//! ragmill search "query"         # nearest chunks
//! ragmill ask "a question"       # retrieval-augmented reply
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | Per-format text extraction |
//! | [`normalize`] | Whitespace and artifact cleanup |
//! | [`chunk`] | Paragraph-aware chunking and content ids |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector store trait and SQLite backend |
//! | [`ingest`] | Ingestion pipeline orchestration |
//! | [`retrieve`] | Query-time nearest-neighbor retrieval |
//! | [`memory`] | Per-user conversation history |
//! | [`context`] | Prompt assembly |
//! | [`generate`] | Chat-completions client |
//! | [`chat`] | End-to-end reply path |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chat;
pub mod chunk;
pub mod config;
pub mod context;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod generate;
pub mod ingest;
pub mod memory;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod retrieve;
pub mod store;

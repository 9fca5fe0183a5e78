//! # notedex
//!
//! A local-first knowledge index over your notes.
//!
//! notedex scans one or more notes directories, keeps a persisted index in
//! sync with them incrementally (only new or modified notes are re-indexed),
//! and answers questions against the index with an LLM of your choice.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌───────────┐
//! │ Notes dirs │──▶│ Sync engine   │──▶│ NoteIndex │
//! │ (markdown) │   │ plan + upsert │   │ snapshot  │
//! └────────────┘   └──────────────┘   └─────┬─────┘
//!                                           │
//!                              ┌────────────┤
//!                              ▼            ▼
//!                        ┌──────────┐ ┌──────────┐
//!                        │  search  │ │   ask    │
//!                        └──────────┘ └──────────┘
//! ```
//!
//! The sync engine is the heart of the crate: each pass fingerprints the
//! live notes, compares them against the reference catalog derived from
//! the index, and upserts only what changed before flushing one snapshot.
//!
//! ## Quick Start
//!
//! ```bash
//! ndx sync                       # index your notes (incremental)
//! ndx search "burping methods"
//! ndx ask "What are burping methods?" --model gemini-1.5-flash
//! ndx status
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`source`] | Notes directory scanner |
//! | [`fingerprint`] | Streaming content fingerprints |
//! | [`catalog`] | Reference catalog (identity → recorded fingerprint) |
//! | [`planner`] | Change-set planning |
//! | [`chunk`] | Markdown-aware chunking |
//! | [`index`] | In-memory note index and retrieval |
//! | [`persist`] | Index snapshot persistence |
//! | [`sync`] | Pass orchestration |
//! | [`embedding`] | Embedding provider dispatch |
//! | [`llm`] | Answer-model providers |
//! | [`search`] | Keyword, semantic, and hybrid search |
//! | [`ask`] | Retrieval-grounded question answering |
//! | [`status`] | Index status overview |

pub mod ask;
pub mod catalog;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod fingerprint;
pub mod index;
pub mod llm;
pub mod models;
pub mod persist;
pub mod planner;
pub mod search;
pub mod source;
pub mod status;
pub mod sync;

//! # docqa
//!
//! Ask questions about your documents. Upload a file, and docqa splits it
//! into overlapping chunks, embeds them, stores the vectors, and answers
//! free-text questions by retrieving the most relevant chunks and handing
//! them to a language model.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │  Extract    │──▶│   Pipeline    │──▶│  SQLite   │
//! │  PDF / text │   │ Chunk+Embed  │   │  vectors  │
//! └─────────────┘   └──────────────┘   └────┬─────┘
//!                                           │
//!                      ┌────────────────────┤
//!                      ▼                    ▼
//!                 ┌──────────┐        ┌──────────┐
//!                 │   CLI    │        │   HTTP   │
//!                 │ (docqa)  │        │  (axum)  │
//!                 └──────────┘        └──────────┘
//! ```
//!
//! The chunking, ranking, and orchestration logic lives in `docqa-core`;
//! this crate supplies the concrete collaborators and the user surfaces.
//!
//! ## Quick Start
//!
//! ```bash
//! docqa init                         # create the index
//! docqa ingest ./handbook.pdf        # chunk, embed, store
//! docqa ask "When are expense reports due?"
//! docqa ask                          # interactive loop
//! docqa serve                        # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | PDF and plain-text extraction |
//! | [`embedding`] | OpenAI / Ollama / hashing embedders |
//! | [`llm`] | OpenAI / Ollama answer synthesizers |
//! | [`http`] | Shared retrying JSON client |
//! | [`sqlite_store`] | SQLite vector index |
//! | [`pipeline`] | Collaborator wiring |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod ask;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod http;
pub mod ingest;
pub mod llm;
pub mod migrate;
pub mod pipeline;
pub mod search;
pub mod server;
pub mod sqlite_store;
pub mod stats;

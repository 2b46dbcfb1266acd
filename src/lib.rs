//! # Nutribot
//!
//! A retrieval-augmented response engine for nutrition-advice chat.
//!
//! Nutribot answers user messages through a confidence-driven fallback
//! cascade: a knowledge-base retrieval stage backed by a cosine vector
//! store, a profile-aware rule engine, an optional learned classifier,
//! a hybrid lexical similarity matcher over a TTL-cached intent corpus,
//! and an always-available keyword default. The strictly highest
//! confidence wins, and a reply is produced for every valid input.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────────────────────────────┐
//! │  /chat    │──▶│ cascade: retrieval ▸ rules ▸ learned   │
//! │  CLI repl │   │          ▸ lexical ▸ default          │
//! └──────────┘   └───────┬───────────────┬───────────────┘
//!                        ▼               ▼
//!                 ┌────────────┐   ┌────────────┐
//!                 │ vector      │   │ intent      │
//!                 │ store (JSON)│   │ corpus (TTL)│
//!                 └────────────┘   └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! nutribot chat "how do I lose weight?"    # one-shot reply
//! nutribot ingest docs.json                # load knowledge documents
//! nutribot serve                           # start HTTP server
//! nutribot stats                           # intent match statistics
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`text`] | Normalization and keyword extraction |
//! | [`similarity`] | Hybrid lexical similarity scoring |
//! | [`corpus`] | Intent corpus loading and TTL cache |
//! | [`matcher`] | Lexical intent matching and templating |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`vector_store`] | Cosine vector store with JSON snapshot |
//! | [`retrieval`] | Retrieval-augmented answer synthesis |
//! | [`rules`] | Rule engine and default responses |
//! | [`classifier`] | Learned intent classifier seam |
//! | [`cascade`] | Fallback cascade orchestration |
//! | [`server`] | JSON HTTP server |

pub mod analytics;
pub mod cascade;
pub mod classifier;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod matcher;
pub mod models;
pub mod retrieval;
pub mod rules;
pub mod server;
pub mod similarity;
pub mod stats;
pub mod text;
pub mod vector_store;

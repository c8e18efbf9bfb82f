//! Core types and trait definitions for Tenor, the video alignment enricher.
//!
//! This crate holds the knowledge base, the alignment scoring and
//! reconciliation engine, and the per-item pipeline. It has no HTTP or database
//! dependencies: every external collaborator is reached through a trait
//! defined here and implemented elsewhere.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod alias;
pub mod enrichment;
pub mod error;
pub mod knowledge;
pub mod pipeline;
pub mod reconcile;
pub mod scoring;
pub mod store;
pub mod subject;

pub use alias::KnowledgeIndex;
pub use error::{Error, Result};

//! Error types for `tenor-core`.
//!
//! Only knowledge-base loading can fail here. Scoring and reconciliation are
//! total; per-item pipeline failures live in
//! [`crate::pipeline::PipelineError`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("knowledge base entry {0:?} has an empty canonical name")]
  EmptyCanonicalName(String),

  #[error("canonical name {0:?} appears more than once after normalisation")]
  DuplicateCanonicalName(String),

  #[error(
    "alignment tendency for {subject:?} must be a finite value in [-1, 1], \
     got {value}"
  )]
  InvalidTendency { subject: String, value: f64 },

  #[error("weight for {subject:?} must be a finite value >= 0, got {value}")]
  InvalidWeight { subject: String, value: f64 },

  #[error("alias {alias:?} of {subject:?} collides with {existing:?}")]
  AliasCollision {
    alias:    String,
    subject:  String,
    existing: String,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Error type for `tenor-worker`.
//!
//! These are startup and transport failures. Per-item failures never surface
//! here; the pipeline folds them into a status write.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("configuration error: {0}")]
  Config(#[from] config::ConfigError),

  #[error("missing required setting `{0}`")]
  MissingSetting(&'static str),

  #[error("knowledge base error: {0}")]
  Knowledge(#[from] tenor_core::Error),

  #[error("failed to read {path:?}: {source}")]
  Read {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("store error: {0}")]
  Store(#[from] tenor_store_sqlite::Error),

  #[error("queue error: {0}")]
  Queue(#[from] redis::RedisError),

  #[error("http client error: {0}")]
  Http(#[from] reqwest::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! Error types for the enrichment pipeline.

use thiserror::Error;

use super::{Stage, StepOutcome};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// What a collaborator reports when a call does not succeed.
#[derive(Debug, Error)]
pub enum CollaboratorError {
  /// The upstream content is confirmed gone; retrying will not help.
  #[error("source content no longer exists: {0}")]
  SourceRemoved(String),

  /// The service answered, but not with something usable.
  #[error("malformed response: {0}")]
  Malformed(String),

  #[error(transparent)]
  Failed(BoxError),
}

impl CollaboratorError {
  pub fn failed(err: impl Into<BoxError>) -> Self { Self::Failed(err.into()) }
}

/// Why an item ended in a non-completed state.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("source content for {item_id} no longer exists: {reason}")]
  SourceRemoved { item_id: String, reason: String },

  /// Any download, transcription, classification, analysis or persistence
  /// failure. Recovery is re-submitting the item.
  #[error("{stage} failed: {source}")]
  TransientInfra {
    stage:  Stage,
    #[source]
    source: BoxError,
  },
}

impl PipelineError {
  /// Classify a collaborator failure raised while in `stage`.
  ///
  /// Only the downloader can report a removed source; the same signal from a
  /// later stage is treated as an ordinary failure.
  pub fn from_collaborator(
    item_id: &str,
    stage: Stage,
    err: CollaboratorError,
  ) -> Self {
    match err {
      CollaboratorError::SourceRemoved(reason)
        if stage == Stage::Downloading =>
      {
        Self::SourceRemoved { item_id: item_id.to_owned(), reason }
      }
      other => Self::TransientInfra { stage, source: Box::new(other) },
    }
  }

  pub fn transient(stage: Stage, err: impl Into<BoxError>) -> Self {
    Self::TransientInfra { stage, source: err.into() }
  }

  /// The stage-machine event this error represents.
  pub fn outcome(&self) -> StepOutcome {
    match self {
      Self::SourceRemoved { .. } => StepOutcome::SourceRemoved,
      Self::TransientInfra { .. } => StepOutcome::Errored,
    }
  }
}

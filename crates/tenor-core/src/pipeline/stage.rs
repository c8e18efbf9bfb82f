//! The per-item stage machine.

use strum::Display;

use crate::enrichment::EnrichmentStatus;

/// Where an item is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
  Queued,
  Downloading,
  Transcribing,
  Analyzing,
  Scoring,
  Completed,
  Failed,
  Deleted,
}

/// The result of running the work of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
  Done,
  SourceRemoved,
  Errored,
}

impl Stage {
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Completed | Self::Failed | Self::Deleted)
  }

  /// The transition function. Terminal stages absorb every event.
  pub fn next(self, outcome: StepOutcome) -> Self {
    match (self, outcome) {
      (Self::Completed | Self::Failed | Self::Deleted, _) => self,
      (Self::Downloading, StepOutcome::SourceRemoved) => Self::Deleted,
      (_, StepOutcome::SourceRemoved | StepOutcome::Errored) => Self::Failed,
      (Self::Queued, StepOutcome::Done) => Self::Downloading,
      (Self::Downloading, StepOutcome::Done) => Self::Transcribing,
      (Self::Transcribing, StepOutcome::Done) => Self::Analyzing,
      (Self::Analyzing, StepOutcome::Done) => Self::Scoring,
      (Self::Scoring, StepOutcome::Done) => Self::Completed,
    }
  }

  /// The status persisted for a terminal stage.
  pub fn status(self) -> Option<EnrichmentStatus> {
    match self {
      Self::Completed => Some(EnrichmentStatus::Completed),
      Self::Failed => Some(EnrichmentStatus::Failed),
      Self::Deleted => Some(EnrichmentStatus::Deleted),
      _ => None,
    }
  }
}

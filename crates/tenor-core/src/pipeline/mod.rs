//! The per-item enrichment pipeline.
//!
//! An item moves through [`Stage`]s one step at a time:
//!
//! ```text
//! Queued → Downloading → Transcribing → Analyzing → Scoring → Completed
//!               │               └──────────┴──────────┴─────→ Failed
//!               └────────────────────────────────────────────→ Deleted/Failed
//! ```
//!
//! [`Pipeline`] drives that machine against injected collaborators and a
//! [`ResultStore`](crate::store::ResultStore). It knows nothing about the
//! queue that feeds it.

mod collaborators;
mod error;
mod orchestrator;
mod stage;

pub use collaborators::{
  AnalysisRequest, Artifacts, ContentAnalysis, ContentAnalyzer, Downloader,
  SentimentClassifier, Transcriber, Transcript,
};
pub use error::{BoxError, CollaboratorError, PipelineError};
pub use orchestrator::{Collaborators, ItemReport, Pipeline};
pub use stage::{Stage, StepOutcome};

#[cfg(test)]
mod tests;

//! Traits for the external services the pipeline calls.
//!
//! Each trait is one suspension point in the pipeline. Implementations own
//! their timeouts; the pipeline never imposes its own.

use std::{
  future::Future,
  path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use super::CollaboratorError;
use crate::{enrichment::Sentiment, subject::IdentifiedSubject};

// ─── Download ────────────────────────────────────────────────────────────────

/// Local files produced by a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
  pub video_path: PathBuf,
  pub audio_path: PathBuf,
}

/// Fetches an item's video and extracts its audio track.
pub trait Downloader: Send + Sync {
  /// Returns [`CollaboratorError::SourceRemoved`] when the upstream content
  /// is confirmed gone.
  fn download<'a>(
    &'a self,
    item_id: &'a str,
  ) -> impl Future<Output = Result<Artifacts, CollaboratorError>> + Send + 'a;

  /// Delete the local files of a finished item.
  fn discard<'a>(
    &'a self,
    artifacts: &'a Artifacts,
  ) -> impl Future<Output = Result<(), CollaboratorError>> + Send + 'a;
}

// ─── Speech and sentiment ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
  pub text:     String,
  /// Language code detected by the engine, or `"unknown"`.
  pub language: String,
}

pub trait Transcriber: Send + Sync {
  fn transcribe<'a>(
    &'a self,
    audio_path: &'a Path,
  ) -> impl Future<Output = Result<Transcript, CollaboratorError>> + Send + 'a;
}

/// Scores text sentiment with a classifier suited to `language`.
pub trait SentimentClassifier: Send + Sync {
  fn classify<'a>(
    &'a self,
    text: &'a str,
    language: &'a str,
  ) -> impl Future<Output = Result<Sentiment, CollaboratorError>> + Send + 'a;
}

// ─── Content analysis ────────────────────────────────────────────────────────

/// Everything the multimodal analyser sees for one item.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
  pub item_id:     &'a str,
  pub video_path:  &'a Path,
  pub transcript:  &'a str,
  pub sentiment:   &'a Sentiment,
  pub description: &'a str,
  /// The knowledge base as JSON, for grounding.
  pub knowledge:   &'a str,
}

/// The analyser's verdict. Numbers are untrusted until the pipeline clamps
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentAnalysis {
  pub summary:             String,
  pub identified_subjects: Vec<IdentifiedSubject>,
  pub overall_alignment:   f64,
}

pub trait ContentAnalyzer: Send + Sync {
  /// Model identifier recorded alongside each result.
  fn model_name(&self) -> &str;

  fn analyze<'a>(
    &'a self,
    request: AnalysisRequest<'a>,
  ) -> impl Future<Output = Result<ContentAnalysis, CollaboratorError>>
  + Send
  + 'a;
}

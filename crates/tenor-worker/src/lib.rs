//! The Tenor enrichment worker.
//!
//! Wires the core pipeline to its concrete collaborators (an HTTP media
//! resolver with `ffmpeg`, `whisper-cli`, an HTTP sentiment classifier and
//! Gemini), a SQLite store and a Redis channel.

pub mod clients;
pub mod config;
pub mod error;
pub mod queue;
pub mod worker;

use std::sync::Arc;

use tenor_core::{
  KnowledgeIndex,
  pipeline::{Collaborators, Pipeline},
};
use tenor_store_sqlite::SqliteStore;

pub use config::WorkerConfig;
pub use error::{Error, Result};

use clients::{
  GeminiAnalyzer, HttpDownloader, HttpSentimentClassifier, WhisperTranscriber,
};

/// The pipeline as deployed.
pub type WorkerPipeline = Pipeline<
  HttpDownloader,
  WhisperTranscriber,
  HttpSentimentClassifier,
  GeminiAnalyzer,
  SqliteStore,
>;

/// Build the deployed pipeline from configuration.
pub fn build_pipeline(
  config: &WorkerConfig,
  knowledge: Arc<KnowledgeIndex>,
  store: Arc<SqliteStore>,
) -> Result<WorkerPipeline> {
  let mut download = config.download.clone();
  download.video_dir = config::expand_tilde(&download.video_dir);
  download.audio_dir = config::expand_tilde(&download.audio_dir);

  let collaborators = Collaborators {
    downloader:  HttpDownloader::new(download)?,
    transcriber: WhisperTranscriber::new(config.transcriber.clone()),
    sentiment:   HttpSentimentClassifier::new(config.sentiment.clone())?,
    analyzer:    GeminiAnalyzer::new(config.analyzer.clone())?,
  };
  Ok(Pipeline::new(knowledge, collaborators, store).with_blend(config.blend))
}

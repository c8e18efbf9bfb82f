//! Worker configuration.
//!
//! Read from an optional TOML file layered under `TENOR_*` environment
//! variables. Nested keys use `__`, e.g. `TENOR_QUEUE__URL`.

use std::{
  collections::BTreeSet,
  path::{Path, PathBuf},
};

use serde::Deserialize;
use tenor_core::{
  KnowledgeIndex, knowledge::KnowledgeBase, reconcile::DEFAULT_BLEND,
};

use crate::{Error, Result};

// ─── Top level ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
  pub store_path:     PathBuf,
  /// JSON knowledge base replacing the built-in one.
  pub knowledge_path: Option<PathBuf>,
  /// Weight of the deterministic score when reconciling.
  pub blend:          f64,
  pub queue:          QueueConfig,
  pub download:       DownloadConfig,
  pub transcriber:    TranscriberConfig,
  pub sentiment:      SentimentConfig,
  pub analyzer:       AnalyzerConfig,
}

impl Default for WorkerConfig {
  fn default() -> Self {
    Self {
      store_path:     PathBuf::from("tenor.db"),
      knowledge_path: None,
      blend:          DEFAULT_BLEND,
      queue:          QueueConfig::default(),
      download:       DownloadConfig::default(),
      transcriber:    TranscriberConfig::default(),
      sentiment:      SentimentConfig::default(),
      analyzer:       AnalyzerConfig::default(),
    }
  }
}

impl WorkerConfig {
  /// Load from `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("TENOR")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?;
    Ok(settings.try_deserialize()?)
  }

  /// The configured knowledge base, or the built-in one.
  pub fn knowledge(&self) -> Result<KnowledgeIndex> {
    let knowledge = match &self.knowledge_path {
      Some(path) => {
        let path = expand_tilde(path);
        let json = std::fs::read_to_string(&path)
          .map_err(|source| Error::Read { path, source })?;
        KnowledgeBase::from_json(&json)?
      }
      None => KnowledgeBase::builtin()?,
    };
    Ok(KnowledgeIndex::new(knowledge)?)
  }
}

// ─── Sections ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
  pub url:     String,
  pub channel: String,
}

impl Default for QueueConfig {
  fn default() -> Self {
    Self {
      url:     "redis://127.0.0.1:6379/0".into(),
      channel: "enrichment_queue".into(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
  /// Media resolver endpoint; answers `{id, downloadUrl}` for a page URL.
  pub resolver_url:        String,
  pub api_key:             Option<String>,
  pub api_host:            Option<String>,
  /// Public page URL of an item; `{id}` is replaced by the item id.
  pub source_url_template: String,
  pub video_dir:           PathBuf,
  pub audio_dir:           PathBuf,
  pub ffmpeg:              PathBuf,
  pub timeout_secs:        u64,
}

impl Default for DownloadConfig {
  fn default() -> Self {
    Self {
      resolver_url:        "https://tiktok-video-downloader-api.p.rapidapi.com/media".into(),
      api_key:             None,
      api_host:            Some("tiktok-video-downloader-api.p.rapidapi.com".into()),
      source_url_template: "https://www.tiktok.com/@placeholder/video/{id}".into(),
      video_dir:           PathBuf::from("tmp/video"),
      audio_dir:           PathBuf::from("tmp/audio"),
      ffmpeg:              PathBuf::from("ffmpeg"),
      timeout_secs:        30,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscriberConfig {
  pub executable: PathBuf,
  pub model_path: PathBuf,
}

impl Default for TranscriberConfig {
  fn default() -> Self {
    Self {
      executable: PathBuf::from("whisper-cli"),
      model_path: PathBuf::from("models/ggml-base.bin"),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
  pub endpoint:          String,
  /// Languages the classifier service has a model for.
  pub languages:         BTreeSet<String>,
  pub fallback_language: String,
  pub timeout_secs:      u64,
}

impl Default for SentimentConfig {
  fn default() -> Self {
    Self {
      endpoint:          "http://127.0.0.1:8090/sentiment".into(),
      languages:         ["en", "de", "fr", "ro"]
        .into_iter()
        .map(String::from)
        .collect(),
      fallback_language: "en".into(),
      timeout_secs:      60,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
  pub api_base:     String,
  pub api_key:      Option<String>,
  pub model:        String,
  pub temperature:  f64,
  pub timeout_secs: u64,
}

impl Default for AnalyzerConfig {
  fn default() -> Self {
    Self {
      api_base:     "https://generativelanguage.googleapis.com/v1beta".into(),
      api_key:      None,
      model:        "gemini-2.5-flash-lite".into(),
      temperature:  0.2,
      timeout_secs: 300,
    }
  }
}

// ─── Paths ───────────────────────────────────────────────────────────────────

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/") {
    if let Ok(home) = std::env::var("HOME") {
      return PathBuf::from(home).join(rest);
    }
  }
  path.to_path_buf()
}

//! Speech-to-text with the `whisper-cli` binary from whisper.cpp.

use std::{
  ffi::OsString,
  path::{Path, PathBuf},
  process::Stdio,
};

use tenor_core::pipeline::{CollaboratorError, Transcriber, Transcript};
use tokio::{fs, process::Command};
use tracing::{debug, warn};

use super::snippet;
use crate::config::TranscriberConfig;

const UNKNOWN_LANGUAGE: &str = "unknown";

#[derive(Debug, Clone)]
pub struct WhisperTranscriber {
  executable: PathBuf,
  model_path: PathBuf,
}

impl WhisperTranscriber {
  pub fn new(config: TranscriberConfig) -> Self {
    Self { executable: config.executable, model_path: config.model_path }
  }
}

impl Transcriber for WhisperTranscriber {
  async fn transcribe(
    &self,
    audio_path: &Path,
  ) -> Result<Transcript, CollaboratorError> {
    let output = Command::new(&self.executable)
      .arg("--model")
      .arg(&self.model_path)
      .args(["--language", "auto", "--output-txt", "--file"])
      .arg(audio_path)
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .output()
      .await
      .map_err(CollaboratorError::failed)?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() {
      return Err(CollaboratorError::failed(format!(
        "whisper-cli exited with {}: {}",
        output.status,
        snippet(&stderr)
      )));
    }

    let text_path = transcript_path(audio_path);
    let text = fs::read_to_string(&text_path).await.map_err(|e| {
      CollaboratorError::failed(format!(
        "no transcript at {}: {e}",
        text_path.display()
      ))
    })?;
    if let Err(e) = fs::remove_file(&text_path).await {
      warn!(
        path = %text_path.display(),
        error = %e,
        "failed to remove transcript file"
      );
    }

    let language = detected_language(&stderr);
    debug!(%language, chars = text.len(), "transcribed audio");
    Ok(Transcript { text: text.trim().to_owned(), language })
  }
}

/// whisper-cli writes `<audio>.txt` next to the input.
fn transcript_path(audio_path: &Path) -> PathBuf {
  let mut path = OsString::from(audio_path.as_os_str());
  path.push(".txt");
  PathBuf::from(path)
}

/// Pull the language code out of a line such as
/// `whisper_full_with_state: auto-detected language: en (p = 0.97)`.
fn detected_language(stderr: &str) -> String {
  stderr
    .lines()
    .find(|line| line.contains("detected language"))
    .and_then(|line| line.rsplit(':').next())
    .and_then(|rest| rest.split_whitespace().next())
    .map_or_else(|| UNKNOWN_LANGUAGE.to_owned(), str::to_owned)
}

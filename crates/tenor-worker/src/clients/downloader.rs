//! Video download through an HTTP media resolver, plus audio extraction
//! with `ffmpeg`.

use std::{
  path::{Path, PathBuf},
  process::Stdio,
  time::Duration,
};

use futures::StreamExt as _;
use reqwest::{Client, Url};
use serde::Deserialize;
use tenor_core::pipeline::{Artifacts, CollaboratorError, Downloader};
use tokio::{fs, io::AsyncWriteExt as _, process::Command};
use tracing::{debug, info, warn};

use super::{http_failure, snippet};
use crate::{Result, config::DownloadConfig};

/// Resolver answer. A missing `id` means the video is gone.
#[derive(Debug, Deserialize)]
struct ResolvedMedia {
  id:           Option<serde_json::Value>,
  #[serde(rename = "downloadUrl")]
  download_url: Option<String>,
}

#[derive(Clone)]
pub struct HttpDownloader {
  client: Client,
  config: DownloadConfig,
}

impl HttpDownloader {
  pub fn new(config: DownloadConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, config })
  }

  fn video_path(&self, item_id: &str) -> PathBuf {
    self.config.video_dir.join(format!("{item_id}.mp4"))
  }

  fn audio_path(&self, item_id: &str) -> PathBuf {
    self.config.audio_dir.join(format!("{item_id}.wav"))
  }

  /// Ask the resolver for a direct download URL.
  async fn resolve(&self, item_id: &str) -> Result<String, CollaboratorError> {
    let page = source_url(&self.config.source_url_template, item_id);
    let mut req = self
      .client
      .get(&self.config.resolver_url)
      .query(&[("videoUrl", page.as_str())]);
    if let Some(key) = &self.config.api_key {
      req = req.header("x-rapidapi-key", key);
    }
    if let Some(host) = &self.config.api_host {
      req = req.header("x-rapidapi-host", host);
    }

    let resp = req.send().await.map_err(CollaboratorError::failed)?;
    if !resp.status().is_success() {
      return Err(http_failure("media resolver", resp).await);
    }
    let body = resp.text().await.map_err(CollaboratorError::failed)?;
    parse_resolver_response(&body)
  }

  /// Stream `url` into `dest`. The file only appears at `dest` once complete.
  async fn fetch(
    &self,
    url: &str,
    dest: &Path,
  ) -> Result<(), CollaboratorError> {
    let resp = self
      .client
      .get(url)
      .send()
      .await
      .map_err(CollaboratorError::failed)?;
    if !resp.status().is_success() {
      return Err(http_failure("video download", resp).await);
    }

    let partial = dest.with_extension("mp4.part");
    let written = async {
      let mut file = fs::File::create(&partial).await?;
      let mut stream = resp.bytes_stream();
      while let Some(chunk) = stream.next().await {
        file.write_all(&chunk.map_err(std::io::Error::other)?).await?;
      }
      file.flush().await
    }
    .await;

    finish_partial(written, &partial, dest).await
  }

  /// 16 kHz mono PCM WAV, the format the transcriber expects. Like the video,
  /// the file only appears at `audio` once ffmpeg has succeeded.
  async fn extract_audio(
    &self,
    video: &Path,
    audio: &Path,
  ) -> Result<(), CollaboratorError> {
    let partial = audio.with_extension("wav.part");
    let output = Command::new(&self.config.ffmpeg)
      .arg("-i")
      .arg(video)
      .args(["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1"])
      .args(["-f", "wav", "-y"])
      .arg(&partial)
      .stdout(Stdio::null())
      .stderr(Stdio::piped())
      .output()
      .await;

    let status = match output {
      Ok(output) if output.status.success() => Ok(()),
      Ok(output) => {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(std::io::Error::other(format!(
          "ffmpeg exited with {}: {}",
          output.status,
          snippet(&stderr)
        )))
      }
      Err(e) => Err(e),
    };

    finish_partial(status, &partial, audio).await
  }
}

/// Move a finished `partial` into place, or remove it if writing failed.
async fn finish_partial(
  written: std::io::Result<()>,
  partial: &Path,
  dest: &Path,
) -> Result<(), CollaboratorError> {
  match written {
    Ok(()) => fs::rename(partial, dest)
      .await
      .map_err(CollaboratorError::failed),
    Err(e) => {
      if let Err(cleanup) = fs::remove_file(partial).await
        && cleanup.kind() != std::io::ErrorKind::NotFound
      {
        warn!(
          path = %partial.display(),
          error = %cleanup,
          "failed to remove partial file"
        );
      }
      Err(CollaboratorError::failed(e))
    }
  }
}

impl Downloader for HttpDownloader {
  async fn download(
    &self,
    item_id: &str,
  ) -> Result<Artifacts, CollaboratorError> {
    check_item_id(item_id)?;
    let video_path = self.video_path(item_id);
    let audio_path = self.audio_path(item_id);

    if fs::try_exists(&video_path).await.unwrap_or(false) {
      debug!(
        item_id,
        path = %video_path.display(),
        "reusing downloaded video"
      );
    } else {
      let url = self.resolve(item_id).await?;
      fs::create_dir_all(&self.config.video_dir)
        .await
        .map_err(CollaboratorError::failed)?;
      info!(item_id, path = %video_path.display(), "downloading video");
      self.fetch(&url, &video_path).await?;
    }

    if fs::try_exists(&audio_path).await.unwrap_or(false) {
      debug!(
        item_id,
        path = %audio_path.display(),
        "reusing extracted audio"
      );
    } else {
      fs::create_dir_all(&self.config.audio_dir)
        .await
        .map_err(CollaboratorError::failed)?;
      self.extract_audio(&video_path, &audio_path).await?;
      debug!(item_id, path = %audio_path.display(), "extracted audio");
    }

    Ok(Artifacts { video_path, audio_path })
  }

  async fn discard(
    &self,
    artifacts: &Artifacts,
  ) -> Result<(), CollaboratorError> {
    for path in [&artifacts.video_path, &artifacts.audio_path] {
      match fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(CollaboratorError::failed(e)),
      }
    }
    Ok(())
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Item ids become file names, so only plain tokens are accepted.
fn check_item_id(item_id: &str) -> Result<(), CollaboratorError> {
  let ok = !item_id.is_empty()
    && item_id
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
  if ok {
    Ok(())
  } else {
    Err(CollaboratorError::Malformed(format!("invalid item id {item_id:?}")))
  }
}

fn source_url(template: &str, item_id: &str) -> String {
  template.replace("{id}", item_id)
}

fn parse_resolver_response(body: &str) -> Result<String, CollaboratorError> {
  let media: ResolvedMedia = serde_json::from_str(body).map_err(|e| {
    CollaboratorError::Malformed(format!("resolver response: {e}"))
  })?;

  if media.id.is_none() {
    return Err(CollaboratorError::SourceRemoved(format!(
      "resolver has no media: {}",
      snippet(body)
    )));
  }
  let url = media.download_url.ok_or_else(|| {
    CollaboratorError::Malformed("resolver response has no downloadUrl".into())
  })?;
  Ok(normalize_download_url(&url))
}

/// Re-encode the nested `videoUrl` parameter some resolvers return raw.
fn normalize_download_url(url: &str) -> String {
  let Ok(mut parsed) = Url::parse(url) else {
    return url.to_owned();
  };
  let video_url = parsed
    .query_pairs()
    .find(|(k, _)| k == "videoUrl")
    .map(|(_, v)| v.into_owned());
  if let Some(video_url) = video_url {
    parsed
      .query_pairs_mut()
      .clear()
      .append_pair("videoUrl", &video_url);
  }
  parsed.into()
}

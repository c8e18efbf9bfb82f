//! Concrete collaborators for the enrichment pipeline.

mod analyzer;
mod downloader;
mod sentiment;
mod transcriber;

pub use analyzer::GeminiAnalyzer;
pub use downloader::HttpDownloader;
pub use sentiment::HttpSentimentClassifier;
pub use transcriber::WhisperTranscriber;

use tenor_core::pipeline::CollaboratorError;

/// Read at most this much of a failing response or process output into an
/// error message.
const ERROR_SNIPPET_LEN: usize = 512;

fn snippet(text: &str) -> &str {
  let text = text.trim();
  match text.char_indices().nth(ERROR_SNIPPET_LEN) {
    Some((end, _)) => &text[..end],
    None => text,
  }
}

/// Turn a non-success HTTP response into a collaborator failure.
async fn http_failure(
  what: &str,
  resp: reqwest::Response,
) -> CollaboratorError {
  let status = resp.status();
  let body = resp.text().await.unwrap_or_default();
  CollaboratorError::failed(format!(
    "{what} returned {status}: {}",
    snippet(&body)
  ))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn snippet_trims_and_truncates() {
    assert_eq!(snippet("  short \n"), "short");
    let long = "é".repeat(ERROR_SNIPPET_LEN + 10);
    assert_eq!(snippet(&long).chars().count(), ERROR_SNIPPET_LEN);
  }
}

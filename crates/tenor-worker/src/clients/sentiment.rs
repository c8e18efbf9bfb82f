//! Text sentiment through an HTTP classifier service.
//!
//! The service hosts one model per language and answers with a list of
//! `{label, score}` pairs.

use std::{collections::BTreeSet, time::Duration};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tenor_core::{
  enrichment::Sentiment,
  pipeline::{CollaboratorError, SentimentClassifier},
};
use tracing::warn;

use super::http_failure;
use crate::{Result, config::SentimentConfig};

#[derive(Serialize)]
struct ClassifyRequest<'a> {
  text:     &'a str,
  language: &'a str,
}

#[derive(Debug, Deserialize)]
struct LabelScore {
  label: String,
  score: f64,
}

#[derive(Clone)]
pub struct HttpSentimentClassifier {
  client:    Client,
  endpoint:  String,
  languages: BTreeSet<String>,
  fallback:  String,
}

impl HttpSentimentClassifier {
  pub fn new(config: SentimentConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self {
      client,
      endpoint: config.endpoint,
      languages: config.languages,
      fallback: config.fallback_language,
    })
  }

  /// The language whose model should score text in `language`.
  fn model_language<'a>(&'a self, language: &'a str) -> &'a str {
    if self.languages.contains(language) {
      language
    } else {
      warn!(
        language,
        fallback = %self.fallback,
        "no sentiment model for language"
      );
      &self.fallback
    }
  }
}

impl SentimentClassifier for HttpSentimentClassifier {
  async fn classify(
    &self,
    text: &str,
    language: &str,
  ) -> Result<Sentiment, CollaboratorError> {
    let language = self.model_language(language);
    let resp = self
      .client
      .post(&self.endpoint)
      .json(&ClassifyRequest { text, language })
      .send()
      .await
      .map_err(CollaboratorError::failed)?;
    if !resp.status().is_success() {
      return Err(http_failure("sentiment classifier", resp).await);
    }

    let scores: Vec<LabelScore> = resp.json().await.map_err(|e| {
      CollaboratorError::Malformed(format!("sentiment response: {e}"))
    })?;
    Ok(to_sentiment(&scores))
  }
}

/// Map model-specific labels onto the three standard ones. Labels a model
/// does not produce stay at 0.0.
fn to_sentiment(scores: &[LabelScore]) -> Sentiment {
  let mut sentiment = Sentiment::default();
  for LabelScore { label, score } in scores {
    match label.to_ascii_lowercase().as_str() {
      "positive" | "label_2" => sentiment.positive = *score,
      "neutral" | "label_1" => sentiment.neutral = *score,
      "negative" | "label_0" => sentiment.negative = *score,
      _ => {}
    }
  }
  sentiment
}

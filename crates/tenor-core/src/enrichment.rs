//! Enrichment results: what the pipeline persists for each item.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::subject::EnrichedSubject;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Terminal status written for an item. An item with no row at all has not
/// been processed yet.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EnrichmentStatus {
  Completed,
  Failed,
  /// The source video no longer exists upstream.
  Deleted,
}

// ─── Sentiment ───────────────────────────────────────────────────────────────

/// Text sentiment distribution; the three parts sum to roughly 1.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
  #[serde(default)]
  pub positive: f64,
  #[serde(default)]
  pub negative: f64,
  #[serde(default)]
  pub neutral:  f64,
}

impl Sentiment {
  /// `positive − negative`, in [-1, 1] for a proper distribution.
  pub fn polarity(&self) -> f64 { self.positive - self.negative }

  pub fn is_finite(&self) -> bool {
    self.positive.is_finite()
      && self.negative.is_finite()
      && self.neutral.is_finite()
  }
}

// ─── Content ─────────────────────────────────────────────────────────────────

/// Every computed field of a successful enrichment run.
///
/// Input to [`crate::store::ResultStore::upsert_completed`]; the status and
/// timestamp are assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentContent {
  pub transcript:              String,
  pub detected_language:       String,
  pub summary:                 String,
  pub identified_subjects:     Vec<EnrichedSubject>,
  pub llm_overall_alignment:   f64,
  pub final_alignment:         f64,
  pub deterministic_alignment: f64,
  pub alignment_conflict:      f64,
  pub sentiment:               Sentiment,
  pub polarity:                f64,
  pub model_name:              String,
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// The narrow part of a row: what every status write refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
  pub item_id:          String,
  pub status:           EnrichmentStatus,
  pub last_enriched_at: DateTime<Utc>,
}

/// The current row for an item.
///
/// `content` is `None` when the item has only ever failed or been deleted. A
/// failure after an earlier success keeps the earlier content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
  pub item_id:          String,
  pub status:           EnrichmentStatus,
  pub last_enriched_at: DateTime<Utc>,
  pub content:          Option<EnrichmentContent>,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn status_strings_are_lowercase() {
    assert_eq!(EnrichmentStatus::Completed.to_string(), "completed");
    assert_eq!(EnrichmentStatus::Deleted.as_ref(), "deleted");
    assert_eq!(
      EnrichmentStatus::from_str("failed").unwrap(),
      EnrichmentStatus::Failed
    );
    assert!(EnrichmentStatus::from_str("pending").is_err());
  }

  #[test]
  fn polarity_is_positive_minus_negative() {
    let s = Sentiment { positive: 0.7, negative: 0.2, neutral: 0.1 };
    assert!((s.polarity() - 0.5).abs() < 1e-12);
  }

  #[test]
  fn missing_sentiment_labels_default_to_zero() {
    let s: Sentiment =
      serde_json::from_str(r#"{ "positive": 0.6, "negative": 0.4 }"#).unwrap();
    assert_eq!(s.neutral, 0.0);
  }
}

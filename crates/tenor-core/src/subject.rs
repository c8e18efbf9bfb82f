//! Subjects identified in a video, before and after reconciliation.

use serde::{Deserialize, Serialize};

/// A subject named by the content analyser, with the video's stance towards
/// it. The stance is meant to lie in [-1, 1] but nothing enforces that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifiedSubject {
  pub subject: String,
  pub stance:  f64,
}

impl IdentifiedSubject {
  pub fn new(subject: impl Into<String>, stance: f64) -> Self {
    Self { subject: subject.into(), stance }
  }
}

/// An identified subject annotated with what the knowledge base expects of it.
///
/// Field names match the JSON stored in the `identified_subjects` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedSubject {
  pub subject:            String,
  pub stance:             f64,
  #[serde(rename = "isInKnowledge")]
  pub is_in_knowledge:    bool,
  /// The subject's knowledge-base tendency, or 0 when unknown.
  pub expected_alignment: f64,
  /// `stance × expected_alignment`.
  pub alignment_score:    f64,
  /// `|stance − expected_alignment|`; always ≥ 0.
  pub alignment_gap:      f64,
}

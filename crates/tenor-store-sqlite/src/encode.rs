//! Encoding and decoding helpers between Tenor types and SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that lexical order matches time order.
//! Identified subjects are stored as a compact JSON array.

use std::str::FromStr as _;

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use tenor_core::{
  enrichment::{
    EnrichmentContent, EnrichmentRecord, EnrichmentStatus, Sentiment,
  },
  subject::EnrichedSubject,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// The current time at the precision the store keeps.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── EnrichmentStatus ────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<EnrichmentStatus> {
  EnrichmentStatus::from_str(s).map_err(|_| Error::UnknownStatus(s.to_owned()))
}

// ─── Subjects ────────────────────────────────────────────────────────────────

pub fn encode_subjects(subjects: &[EnrichedSubject]) -> Result<String> {
  Ok(serde_json::to_string(subjects)?)
}

pub fn decode_subjects(s: &str) -> Result<Vec<EnrichedSubject>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from an `enrichment_results` row.
pub struct RawResult {
  pub item_id:                 String,
  pub enrichment_status:       String,
  pub last_enriched_at:        String,
  pub transcript:              Option<String>,
  pub detected_language:       Option<String>,
  pub summary:                 Option<String>,
  pub identified_subjects:     Option<String>,
  pub llm_overall_alignment:   Option<f64>,
  pub model_name:              Option<String>,
  pub final_alignment:         Option<f64>,
  pub deterministic_alignment: Option<f64>,
  pub alignment_conflict:      Option<f64>,
  pub sentiment_positive:      Option<f64>,
  pub sentiment_negative:      Option<f64>,
  pub sentiment_neutral:       Option<f64>,
  pub polarity:                Option<f64>,
}

/// Column list matching the field order of [`RawResult`].
pub const RESULT_COLUMNS: &str = "
  item_id, enrichment_status, last_enriched_at,
  transcript, detected_language, summary, identified_subjects,
  llm_overall_alignment, model_name, final_alignment,
  deterministic_alignment, alignment_conflict,
  sentiment_positive, sentiment_negative, sentiment_neutral, polarity";

impl RawResult {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      item_id:                 row.get(0)?,
      enrichment_status:       row.get(1)?,
      last_enriched_at:        row.get(2)?,
      transcript:              row.get(3)?,
      detected_language:       row.get(4)?,
      summary:                 row.get(5)?,
      identified_subjects:     row.get(6)?,
      llm_overall_alignment:   row.get(7)?,
      model_name:              row.get(8)?,
      final_alignment:         row.get(9)?,
      deterministic_alignment: row.get(10)?,
      alignment_conflict:      row.get(11)?,
      sentiment_positive:      row.get(12)?,
      sentiment_negative:      row.get(13)?,
      sentiment_neutral:       row.get(14)?,
      polarity:                row.get(15)?,
    })
  }

  pub fn into_record(self) -> Result<EnrichmentRecord> {
    let status = decode_status(&self.enrichment_status)?;
    let last_enriched_at = decode_dt(&self.last_enriched_at)?;

    // Rows only ever written by status updates have no content.
    let content = match self.model_name {
      None => None,
      Some(model_name) => {
        let id = &self.item_id;
        let subjects = decode_subjects(&required(
          id,
          "identified_subjects",
          self.identified_subjects,
        )?)?;
        Some(EnrichmentContent {
          transcript: required(id, "transcript", self.transcript)?,
          detected_language: required(
            id,
            "detected_language",
            self.detected_language,
          )?,
          summary: required(id, "summary", self.summary)?,
          identified_subjects: subjects,
          llm_overall_alignment: required(
            id,
            "llm_overall_alignment",
            self.llm_overall_alignment,
          )?,
          final_alignment: required(
            id,
            "final_alignment",
            self.final_alignment,
          )?,
          deterministic_alignment: required(
            id,
            "deterministic_alignment",
            self.deterministic_alignment,
          )?,
          alignment_conflict: required(
            id,
            "alignment_conflict",
            self.alignment_conflict,
          )?,
          // Labels a classifier did not report were stored as 0.0.
          sentiment: Sentiment {
            positive: self.sentiment_positive.unwrap_or_default(),
            negative: self.sentiment_negative.unwrap_or_default(),
            neutral:  self.sentiment_neutral.unwrap_or_default(),
          },
          polarity: required(id, "polarity", self.polarity)?,
          model_name,
        })
      }
    };

    Ok(EnrichmentRecord {
      item_id: self.item_id,
      status,
      last_enriched_at,
      content,
    })
  }
}

fn required<T>(
  item_id: &str,
  column: &'static str,
  value: Option<T>,
) -> Result<T> {
  value.ok_or_else(|| Error::MissingColumn {
    item_id: item_id.to_owned(),
    column,
  })
}

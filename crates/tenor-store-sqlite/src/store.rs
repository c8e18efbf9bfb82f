//! [`SqliteStore`]: the SQLite implementation of [`ResultStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use tenor_core::{
  enrichment::{
    EnrichmentContent, EnrichmentRecord, EnrichmentStatus, StatusRecord,
  },
  store::ResultStore,
};

use crate::{
  encode::{encode_dt, encode_subjects, now, RawResult, RESULT_COLUMNS},
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An enrichment result store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Add or update an entry in the item catalog.
  pub async fn upsert_item(
    &self,
    item_id: &str,
    description: Option<&str>,
    created_at: DateTime<Utc>,
  ) -> Result<()> {
    let id          = item_id.to_owned();
    let description = description.map(str::to_owned);
    let at_str      = encode_dt(created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO items (item_id, description, created_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT (item_id) DO UPDATE SET
             description = excluded.description,
             created_at  = excluded.created_at",
          rusqlite::params![id, description, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── ResultStore impl ────────────────────────────────────────────────────────

impl ResultStore for SqliteStore {
  type Error = Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn upsert_completed(
    &self,
    item_id: &str,
    content: &EnrichmentContent,
  ) -> Result<EnrichmentRecord> {
    let record = EnrichmentRecord {
      item_id:          item_id.to_owned(),
      status:           EnrichmentStatus::Completed,
      last_enriched_at: now(),
      content:          Some(content.clone()),
    };

    let id_str       = record.item_id.clone();
    let status_str   = record.status.as_ref().to_owned();
    let at_str       = encode_dt(record.last_enriched_at);
    let subjects_str = encode_subjects(&content.identified_subjects)?;
    let c            = content.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO enrichment_results (
             item_id, enrichment_status, last_enriched_at,
             transcript, detected_language, summary, identified_subjects,
             llm_overall_alignment, model_name, final_alignment,
             deterministic_alignment, alignment_conflict,
             sentiment_positive, sentiment_negative, sentiment_neutral, polarity
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
           ON CONFLICT (item_id) DO UPDATE SET
             enrichment_status       = excluded.enrichment_status,
             last_enriched_at        = excluded.last_enriched_at,
             transcript              = excluded.transcript,
             detected_language       = excluded.detected_language,
             summary                 = excluded.summary,
             identified_subjects     = excluded.identified_subjects,
             llm_overall_alignment   = excluded.llm_overall_alignment,
             model_name              = excluded.model_name,
             final_alignment         = excluded.final_alignment,
             deterministic_alignment = excluded.deterministic_alignment,
             alignment_conflict      = excluded.alignment_conflict,
             sentiment_positive      = excluded.sentiment_positive,
             sentiment_negative      = excluded.sentiment_negative,
             sentiment_neutral       = excluded.sentiment_neutral,
             polarity                = excluded.polarity",
          rusqlite::params![
            id_str,
            status_str,
            at_str,
            c.transcript,
            c.detected_language,
            c.summary,
            subjects_str,
            c.llm_overall_alignment,
            c.model_name,
            c.final_alignment,
            c.deterministic_alignment,
            c.alignment_conflict,
            c.sentiment.positive,
            c.sentiment.negative,
            c.sentiment.neutral,
            c.polarity,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  async fn upsert_status(
    &self,
    item_id: &str,
    status: EnrichmentStatus,
  ) -> Result<StatusRecord> {
    let record = StatusRecord {
      item_id: item_id.to_owned(),
      status,
      last_enriched_at: now(),
    };

    let id_str     = record.item_id.clone();
    let status_str = status.as_ref().to_owned();
    let at_str     = encode_dt(record.last_enriched_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO enrichment_results (item_id, enrichment_status, last_enriched_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT (item_id) DO UPDATE SET
             enrichment_status = excluded.enrichment_status,
             last_enriched_at  = excluded.last_enriched_at",
          rusqlite::params![id_str, status_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_record(
    &self,
    item_id: &str,
  ) -> Result<Option<EnrichmentRecord>> {
    let id_str = item_id.to_owned();
    let sql = format!(
      "SELECT {RESULT_COLUMNS} FROM enrichment_results WHERE item_id = ?1"
    );

    let raw: Option<RawResult> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawResult::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawResult::into_record).transpose()
  }

  async fn item_description(&self, item_id: &str) -> Result<Option<String>> {
    let id_str = item_id.to_owned();

    let description: Option<Option<String>> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT description FROM items WHERE item_id = ?1",
              rusqlite::params![id_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(description.flatten())
  }

  async fn unprocessed_items(&self, limit: usize) -> Result<Vec<String>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    let ids = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT i.item_id
           FROM items i
           LEFT JOIN enrichment_results r ON r.item_id = i.item_id
           WHERE r.item_id IS NULL
           ORDER BY i.created_at DESC, i.item_id DESC
           LIMIT ?1",
        )?;
        let ids = stmt
          .query_map(rusqlite::params![limit], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
      })
      .await?;

    Ok(ids)
  }

  async fn items_with_status(
    &self,
    status: EnrichmentStatus,
  ) -> Result<Vec<String>> {
    let status_str = status.as_ref().to_owned();

    let ids = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT item_id FROM enrichment_results
           WHERE enrichment_status = ?1
           ORDER BY last_enriched_at DESC, item_id",
        )?;
        let ids = stmt
          .query_map(rusqlite::params![status_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
      })
      .await?;

    Ok(ids)
  }
}

//! The `ResultStore` trait: the persistence gateway for enrichment results.
//!
//! The trait is implemented by storage backends (e.g. `tenor-store-sqlite`).
//! The pipeline depends on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::enrichment::{
  EnrichmentContent, EnrichmentRecord, EnrichmentStatus, StatusRecord,
};

/// Abstraction over an enrichment result store.
///
/// Each item id has at most one current row. Both writes are single atomic
/// upserts: a failed write leaves the previous row (or no row) in place.
pub trait ResultStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Insert or fully overwrite the row for `item_id` with status
  /// `completed`. The `last_enriched_at` timestamp is set by the store.
  fn upsert_completed<'a>(
    &'a self,
    item_id: &'a str,
    content: &'a EnrichmentContent,
  ) -> impl Future<Output = Result<EnrichmentRecord, Self::Error>> + Send + 'a;

  /// Write only the status and timestamp for `item_id`, creating the row if
  /// needed. Content columns from an earlier run are left as they are.
  fn upsert_status<'a>(
    &'a self,
    item_id: &'a str,
    status: EnrichmentStatus,
  ) -> impl Future<Output = Result<StatusRecord, Self::Error>> + Send + 'a;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// The current row for `item_id`, or `None` if it was never processed.
  fn get_record<'a>(
    &'a self,
    item_id: &'a str,
  ) -> impl Future<Output = Result<Option<EnrichmentRecord>, Self::Error>>
  + Send
  + 'a;

  /// The creator's description for a catalogued item, if any.
  fn item_description<'a>(
    &'a self,
    item_id: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Catalogued items with no result row, newest first.
  fn unprocessed_items(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// Ids whose current status is `status`, most recently enriched first.
  fn items_with_status(
    &self,
    status: EnrichmentStatus,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;
}

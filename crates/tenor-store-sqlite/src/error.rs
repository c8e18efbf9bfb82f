//! Error type for `tenor-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown enrichment status: {0:?}")]
  UnknownStatus(String),

  /// A row that carries content is missing one of its content columns.
  #[error("result row for {item_id} has no {column}")]
  MissingColumn {
    item_id: String,
    column:  &'static str,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! SQL schema for the Tenor SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Filled by the upstream harvester; read-only here.
CREATE TABLE IF NOT EXISTS items (
    item_id     TEXT PRIMARY KEY,
    description TEXT,
    created_at  TEXT NOT NULL          -- RFC 3339 UTC, fixed width
);

-- One row per processed item, overwritten on every run.
-- Content columns stay NULL until the first completed run and are left
-- untouched by status-only writes.
CREATE TABLE IF NOT EXISTS enrichment_results (
    item_id                 TEXT PRIMARY KEY,
    enrichment_status       TEXT NOT NULL,   -- 'completed' | 'failed' | 'deleted'
    last_enriched_at        TEXT NOT NULL,
    transcript              TEXT,
    detected_language       TEXT,
    summary                 TEXT,
    identified_subjects     TEXT,            -- JSON array of enriched subjects
    llm_overall_alignment   REAL,
    model_name              TEXT,
    final_alignment         REAL,
    deterministic_alignment REAL,
    alignment_conflict      REAL,
    sentiment_positive      REAL,
    sentiment_negative      REAL,
    sentiment_neutral       REAL,
    polarity                REAL
);

CREATE INDEX IF NOT EXISTS items_created_idx
    ON items(created_at);
CREATE INDEX IF NOT EXISTS results_status_idx
    ON enrichment_results(enrichment_status, last_enriched_at);

PRAGMA user_version = 1;
";

//! SQL schema for the softdel SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Every entity type shares one table, partitioned by `kind`.
-- Lifecycle state is derived from `deleted_at` alone.
CREATE TABLE IF NOT EXISTS records (
    record_id   TEXT PRIMARY KEY,
    kind        TEXT NOT NULL,   -- Entity::KIND of the payload
    data_json   TEXT NOT NULL,   -- JSON-encoded entity payload
    created_at  TEXT NOT NULL,   -- RFC 3339 UTC
    deleted_at  TEXT,            -- RFC 3339 UTC; NULL while active
    deleted_by  INTEGER,         -- only meaningful when deleted_at is set
    restored_by INTEGER          -- most recent restorer, never auto-cleared
);

CREATE INDEX IF NOT EXISTS records_kind_deleted_idx ON records(kind, deleted_at);

PRAGMA user_version = 1;
";

//! SQL schema for the Stamp SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- AUTOINCREMENT: a deleted subject_id is never handed out again.
CREATE TABLE IF NOT EXISTS identities (
    subject_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    handle        TEXT NOT NULL,
    contact       TEXT NOT NULL,
    secret        TEXT NOT NULL,
    role          TEXT NOT NULL,   -- 'standard' | 'administrator'; never updated
    current_token TEXT
);

-- Empty values are exempt from uniqueness.
CREATE UNIQUE INDEX IF NOT EXISTS identities_handle_unique
    ON identities(handle) WHERE handle <> '';
CREATE UNIQUE INDEX IF NOT EXISTS identities_contact_unique
    ON identities(contact) WHERE contact <> '';

PRAGMA user_version = 1;
";

/// Column list shared by every `SELECT`, in [`RawIdentity`](crate::encode::RawIdentity) order.
pub const COLUMNS: &str = "subject_id, handle, contact, secret, role, current_token";

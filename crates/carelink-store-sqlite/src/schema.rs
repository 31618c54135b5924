//! SQL schemas for the two CareLink SQLite stores.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Authoritative store DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const REGISTRY_SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS accounts (
    account_id  TEXT PRIMARY KEY,
    email       TEXT NOT NULL,
    role        TEXT NOT NULL    -- 'patient' | 'caregiver'
);

-- Deletion is a hard DELETE; `active` is kept for future soft-unlinking and
-- every read filters on it.
CREATE TABLE IF NOT EXISTS links (
    link_id       TEXT PRIMARY KEY,
    caregiver_id  TEXT NOT NULL REFERENCES accounts(account_id),
    patient_id    TEXT NOT NULL REFERENCES accounts(account_id),
    created_at    TEXT NOT NULL,   -- fixed-width RFC 3339 UTC
    active        INTEGER NOT NULL DEFAULT 1,
    CHECK (caregiver_id != patient_id)
);

CREATE UNIQUE INDEX IF NOT EXISTS links_active_pair_idx
    ON links(caregiver_id, patient_id) WHERE active = 1;
CREATE INDEX IF NOT EXISTS links_patient_idx ON links(patient_id);

CREATE TABLE IF NOT EXISTS notes (
    note_id      TEXT PRIMARY KEY,
    owner_id     TEXT NOT NULL REFERENCES accounts(account_id),
    content      TEXT NOT NULL,
    analysis     TEXT,
    analyzed_at  TEXT,
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS notes_owner_created_idx ON notes(owner_id, created_at);

PRAGMA user_version = 1;
";

/// Peer index DDL: a single generic document table keyed by collection.
pub const PEER_INDEX_SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS documents (
    collection  TEXT NOT NULL,
    doc_id      TEXT NOT NULL,
    body        TEXT NOT NULL,   -- JSON document
    PRIMARY KEY (collection, doc_id)
);

PRAGMA user_version = 1;
";

/// Collection holding one document per mirrored link.
pub const LINKS_COLLECTION: &str = "caregiverPatientLinks";

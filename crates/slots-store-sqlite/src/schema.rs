//! SQL schema for the timeslots SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    last_name     TEXT    NOT NULL,
    first_name    TEXT    NOT NULL,
    phone         TEXT    NOT NULL,
    email         TEXT,
    password_hash TEXT    NOT NULL,
    role          TEXT    NOT NULL CHECK (role IN ('coach', 'client')),
    notify_lead   INTEGER NOT NULL DEFAULT 60,   -- minutes
    deleted       INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT    NOT NULL,              -- RFC 3339 UTC, microseconds
    updated_at    TEXT    NOT NULL
);

-- The authority on phone uniqueness. The gateway's own check before insert
-- is advisory only.
CREATE UNIQUE INDEX IF NOT EXISTS users_active_phone_idx
    ON users(phone) WHERE deleted = 0;

-- One row per mutation of a user. Password hashes are not copied.
CREATE TABLE IF NOT EXISTS users_history (
    history_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id),
    action      TEXT    NOT NULL,   -- 'create' | 'update' | 'delete'
    last_name   TEXT    NOT NULL,
    first_name  TEXT    NOT NULL,
    phone       TEXT    NOT NULL,
    email       TEXT,
    role        TEXT    NOT NULL,
    notify_lead INTEGER NOT NULL,
    deleted     INTEGER NOT NULL,
    recorded_at TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS meetings (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    manager    INTEGER NOT NULL REFERENCES users(id),
    client     INTEGER NOT NULL REFERENCES users(id),
    start_at   TEXT    NOT NULL,
    end_at     TEXT    NOT NULL,
    notified   INTEGER NOT NULL DEFAULT 0,
    created_at TEXT    NOT NULL,
    updated_at TEXT    NOT NULL
);

-- Removed together with the meeting.
CREATE TABLE IF NOT EXISTS meetings_history (
    history_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    meeting_id  INTEGER NOT NULL REFERENCES meetings(id) ON DELETE CASCADE,
    action      TEXT    NOT NULL,   -- 'create' | 'update' | 'notified'
    manager     INTEGER NOT NULL,
    client      INTEGER NOT NULL,
    start_at    TEXT    NOT NULL,
    end_at      TEXT    NOT NULL,
    notified    INTEGER NOT NULL,
    recorded_at TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS users_history_user_idx       ON users_history(user_id);
CREATE INDEX IF NOT EXISTS meetings_history_meeting_idx ON meetings_history(meeting_id);
CREATE INDEX IF NOT EXISTS meetings_pending_idx         ON meetings(notified, start_at);

PRAGMA user_version = 1;
";

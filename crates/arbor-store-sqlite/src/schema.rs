//! SQL schema for the Arbor SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One id space for every commentable thing.
CREATE TABLE IF NOT EXISTS entities (
    entity_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    kind             TEXT NOT NULL,   -- 'post' | 'comment'
    creator          TEXT NOT NULL,
    created_at       TEXT NOT NULL,   -- RFC 3339 UTC, microseconds
    last_modified_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS posts (
    post_id INTEGER PRIMARY KEY REFERENCES entities(entity_id),
    text    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS comments (
    comment_id       INTEGER PRIMARY KEY REFERENCES entities(entity_id),
    parent_id        INTEGER NOT NULL REFERENCES entities(entity_id),
    last_modified_by TEXT NOT NULL,
    text             TEXT             -- NULL while soft-deleted
);

-- Closure table: one row per (ancestor, descendant) pair, including the
-- reflexive (e, e) row at depth 0.
CREATE TABLE IF NOT EXISTS entity_closure (
    ancestor_id   INTEGER NOT NULL REFERENCES entities(entity_id),
    descendant_id INTEGER NOT NULL REFERENCES entities(entity_id),
    depth         INTEGER NOT NULL,
    PRIMARY KEY (ancestor_id, descendant_id),
    CHECK (depth >= 0),
    CHECK ((depth = 0) = (ancestor_id = descendant_id))
);

-- Audit entries are strictly append-only.
CREATE TABLE IF NOT EXISTS audit_log (
    audit_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_id INTEGER NOT NULL REFERENCES entities(entity_id),
    actor     TEXT NOT NULL,
    action    TEXT NOT NULL,   -- 'create' | 'update' | 'delete' | 'restore'
    at        TEXT NOT NULL,
    text      TEXT
);

CREATE TRIGGER IF NOT EXISTS audit_log_no_update
BEFORE UPDATE ON audit_log
BEGIN
    SELECT RAISE(ABORT, 'audit_log is append-only');
END;

CREATE TRIGGER IF NOT EXISTS audit_log_no_delete
BEFORE DELETE ON audit_log
BEGIN
    SELECT RAISE(ABORT, 'audit_log is append-only');
END;

CREATE TABLE IF NOT EXISTS search_history (
    search_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    username       TEXT NOT NULL,
    start_date     TEXT,           -- YYYY-MM-DD
    end_date       TEXT,
    root_entity_id INTEGER,
    searched_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS closure_descendant_idx ON entity_closure(descendant_id, depth);
CREATE INDEX IF NOT EXISTS closure_depth_idx      ON entity_closure(ancestor_id, depth);
CREATE INDEX IF NOT EXISTS entities_creator_idx   ON entities(creator);
CREATE INDEX IF NOT EXISTS audit_actor_at_idx     ON audit_log(actor, at);
CREATE INDEX IF NOT EXISTS audit_entity_idx       ON audit_log(entity_id, action);
CREATE INDEX IF NOT EXISTS search_user_idx        ON search_history(username, searched_at);

PRAGMA user_version = 1;
";

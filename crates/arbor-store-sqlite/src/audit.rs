//! The append-only audit log.
//!
//! Entries are appended inside the transaction of the mutation they describe.
//! The table carries triggers rejecting any UPDATE or DELETE.

use arbor_core::{
  entity::EntityId,
  history::{AuditAction, HistoryQuery},
};
use rusqlite::{Connection, OptionalExtension as _};

use crate::encode::{RawAuditEntry, day_after, day_start};

pub fn append(
  conn: &Connection,
  entity_id: EntityId,
  actor: &str,
  action: AuditAction,
  text: Option<&str>,
  at: &str,
) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO audit_log (entity_id, actor, action, at, text)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    rusqlite::params![entity_id, actor, action.as_ref(), at, text],
  )?;
  Ok(conn.last_insert_rowid())
}

/// Entries matching every filter in `query`, oldest first.
///
/// Absent filters bind as NULL and drop out of the predicate, so the
/// statement text never changes with the filters supplied.
pub fn query(conn: &Connection, query: &HistoryQuery) -> rusqlite::Result<Vec<RawAuditEntry>> {
  let from = query.start_date.map(day_start);
  let until = query.end_date.and_then(day_after);

  let mut stmt = conn.prepare(
    "SELECT a.audit_id, a.entity_id, a.actor, a.action, a.at, a.text
       FROM audit_log a
      WHERE a.actor = ?1
        AND (?2 IS NULL OR a.at >= ?2)
        AND (?3 IS NULL OR a.at < ?3)
        AND (?4 IS NULL OR a.entity_id IN (
              SELECT descendant_id FROM entity_closure WHERE ancestor_id = ?4))
      ORDER BY a.at, a.audit_id",
  )?;
  stmt
    .query_map(
      rusqlite::params![query.actor, from, until, query.root_entity_id],
      RawAuditEntry::from_row,
    )?
    .collect()
}

/// The most recent `delete` entry for `entity_id`.
pub fn latest_delete(
  conn: &Connection,
  entity_id: EntityId,
) -> rusqlite::Result<Option<RawAuditEntry>> {
  conn
    .query_row(
      "SELECT a.audit_id, a.entity_id, a.actor, a.action, a.at, a.text
         FROM audit_log a
        WHERE a.entity_id = ?1 AND a.action = ?2
        ORDER BY a.audit_id DESC
        LIMIT 1",
      rusqlite::params![entity_id, AuditAction::Delete.as_ref()],
      RawAuditEntry::from_row,
    )
    .optional()
}

/// Whether `entity_id` has been given new text (update or restore) after
/// audit entry `since`.
pub fn rewritten_since(
  conn: &Connection,
  entity_id: EntityId,
  since: i64,
) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM audit_log
          WHERE entity_id = ?1 AND audit_id > ?2 AND action IN (?3, ?4)
          LIMIT 1",
        rusqlite::params![
          entity_id,
          since,
          AuditAction::Update.as_ref(),
          AuditAction::Restore.as_ref(),
        ],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

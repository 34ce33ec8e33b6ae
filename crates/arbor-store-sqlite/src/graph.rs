//! The entity graph index: closure-table maintenance and lookups.
//!
//! Every entity has a reflexive `(e, e, 0)` row. Linking a child `c` under
//! `p` copies each `(a, p, d)` row to `(a, c, d + 1)`, so the table stays
//! transitively closed without any recursive query. All functions here run
//! inside a caller-owned connection or transaction.

use arbor_core::{
  Error as CoreError,
  entity::{EntityId, EntityRef},
  store::Page,
};
use rusqlite::{Connection, OptionalExtension as _};

use crate::{encode::entity_ref_from_row, store::Outcome};

/// Record `entity_id` as a parentless root (its reflexive row only).
pub fn register_root(conn: &Connection, entity_id: EntityId) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO entity_closure (ancestor_id, descendant_id, depth) VALUES (?1, ?1, 0)",
    rusqlite::params![entity_id],
  )?;
  Ok(())
}

/// Link `child_id` under `parent_id`, writing one row per ancestor of the
/// parent plus the child's reflexive row.
///
/// Nothing is written when the parent is unknown.
pub fn link(
  conn: &Connection,
  parent_id: EntityId,
  child_id: EntityId,
) -> rusqlite::Result<Outcome<()>> {
  if entity_ref(conn, parent_id)?.is_none() {
    return Ok(Err(CoreError::UnknownParent(parent_id)));
  }

  conn.execute(
    "INSERT INTO entity_closure (ancestor_id, descendant_id, depth)
     SELECT ancestor_id, ?2, depth + 1
       FROM entity_closure
      WHERE descendant_id = ?1
     UNION ALL
     SELECT ?2, ?2, 0",
    rusqlite::params![parent_id, child_id],
  )?;
  Ok(Ok(()))
}

/// The kind and id of `entity_id`, if it is registered in the index.
pub fn entity_ref(conn: &Connection, entity_id: EntityId) -> rusqlite::Result<Option<EntityRef>> {
  conn
    .query_row(
      "SELECT e.entity_id, e.kind
         FROM entity_closure ct
         JOIN entities e ON e.entity_id = ct.descendant_id
        WHERE ct.ancestor_id = ?1 AND ct.descendant_id = ?1",
      rusqlite::params![entity_id],
      entity_ref_from_row,
    )
    .optional()
}

/// Up to `limit` existing entities in id order, for error diagnostics.
pub fn sample_entities(conn: &Connection, limit: u32) -> rusqlite::Result<Vec<EntityRef>> {
  let mut stmt =
    conn.prepare("SELECT entity_id, kind FROM entities ORDER BY entity_id LIMIT ?1")?;
  stmt
    .query_map(rusqlite::params![limit], entity_ref_from_row)?
    .collect()
}

pub fn descendants_of(
  conn: &Connection,
  entity_id: EntityId,
  include_self: bool,
) -> rusqlite::Result<Vec<EntityId>> {
  let mut stmt = conn.prepare(
    "SELECT descendant_id
       FROM entity_closure
      WHERE ancestor_id = ?1 AND (?2 OR depth > 0)
      ORDER BY depth, descendant_id",
  )?;
  stmt
    .query_map(rusqlite::params![entity_id, include_self], |row| row.get(0))?
    .collect()
}

pub fn ancestors_of(
  conn: &Connection,
  entity_id: EntityId,
  include_self: bool,
) -> rusqlite::Result<Vec<EntityId>> {
  let mut stmt = conn.prepare(
    "SELECT ancestor_id
       FROM entity_closure
      WHERE descendant_id = ?1 AND (?2 OR depth > 0)
      ORDER BY depth",
  )?;
  stmt
    .query_map(rusqlite::params![entity_id, include_self], |row| row.get(0))?
    .collect()
}

pub fn children_of(
  conn: &Connection,
  parent_id: EntityId,
  page: Page,
) -> rusqlite::Result<Vec<EntityId>> {
  let mut stmt = conn.prepare(
    "SELECT descendant_id
       FROM entity_closure
      WHERE ancestor_id = ?1 AND depth = 1
      ORDER BY descendant_id
      LIMIT ?2 OFFSET ?3",
  )?;
  stmt
    .query_map(
      rusqlite::params![parent_id, page.limit, page.offset],
      |row| row.get(0),
    )?
    .collect()
}

pub fn has_children(conn: &Connection, parent_id: EntityId) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM entity_closure WHERE ancestor_id = ?1 AND depth = 1 LIMIT 1",
        rusqlite::params![parent_id],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

//! Row-level reads and writes for posts and comments.
//!
//! These run inside a caller-owned connection or transaction and return raw
//! rows; decoding into domain types happens once the rows are off the
//! database thread.

use arbor_core::{
  entity::{EntityId, EntityKind},
  store::Page,
};
use rusqlite::{Connection, OptionalExtension as _};

use crate::encode::{RawComment, RawNode, RawPost};

/// Insert the shared `entities` row and return its new id.
pub fn insert_entity(
  conn: &Connection,
  kind: EntityKind,
  creator: &str,
  at: &str,
) -> rusqlite::Result<EntityId> {
  conn.execute(
    "INSERT INTO entities (kind, creator, created_at, last_modified_at)
     VALUES (?1, ?2, ?3, ?3)",
    rusqlite::params![kind.as_ref(), creator, at],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn insert_post(conn: &Connection, post_id: EntityId, text: &str) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO posts (post_id, text) VALUES (?1, ?2)",
    rusqlite::params![post_id, text],
  )?;
  Ok(())
}

pub fn insert_comment(
  conn: &Connection,
  comment_id: EntityId,
  parent_id: EntityId,
  creator: &str,
  text: &str,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO comments (comment_id, parent_id, last_modified_by, text)
     VALUES (?1, ?2, ?3, ?4)",
    rusqlite::params![comment_id, parent_id, creator, text],
  )?;
  Ok(())
}

/// Replace a comment's text (`None` soft-deletes it) and stamp the
/// modification. Returns `false` if no such comment exists.
pub fn set_text(
  conn: &Connection,
  comment_id: EntityId,
  text: Option<&str>,
  actor: &str,
  at: &str,
) -> rusqlite::Result<bool> {
  let changed = conn.execute(
    "UPDATE comments SET text = ?2, last_modified_by = ?3 WHERE comment_id = ?1",
    rusqlite::params![comment_id, text, actor],
  )?;
  if changed == 0 {
    return Ok(false);
  }
  conn.execute(
    "UPDATE entities SET last_modified_at = ?2 WHERE entity_id = ?1",
    rusqlite::params![comment_id, at],
  )?;
  Ok(true)
}

pub fn load_post(conn: &Connection, post_id: EntityId) -> rusqlite::Result<Option<RawPost>> {
  conn
    .query_row(
      "SELECT p.post_id, e.creator, e.created_at, e.last_modified_at, p.text
         FROM posts p
         JOIN entities e ON e.entity_id = p.post_id
        WHERE p.post_id = ?1",
      rusqlite::params![post_id],
      RawPost::from_row,
    )
    .optional()
}

pub fn load_comment(
  conn: &Connection,
  comment_id: EntityId,
) -> rusqlite::Result<Option<RawComment>> {
  conn
    .query_row(
      "SELECT c.comment_id, c.parent_id, e.creator, e.created_at,
              e.last_modified_at, c.last_modified_by, c.text
         FROM comments c
         JOIN entities e ON e.entity_id = c.comment_id
        WHERE c.comment_id = ?1",
      rusqlite::params![comment_id],
      RawComment::from_row,
    )
    .optional()
}

pub fn comments_by_creator(conn: &Connection, creator: &str) -> rusqlite::Result<Vec<RawComment>> {
  let mut stmt = conn.prepare(
    "SELECT c.comment_id, c.parent_id, e.creator, e.created_at,
            e.last_modified_at, c.last_modified_by, c.text
       FROM comments c
       JOIN entities e ON e.entity_id = c.comment_id
      WHERE e.creator = ?1
      ORDER BY c.comment_id",
  )?;
  stmt
    .query_map(rusqlite::params![creator], RawComment::from_row)?
    .collect()
}

/// Direct replies to `parent_id`, windowed over the closure index's depth-1
/// rows.
pub fn first_level_children(
  conn: &Connection,
  parent_id: EntityId,
  page: Page,
) -> rusqlite::Result<Vec<RawComment>> {
  let mut stmt = conn.prepare(
    "SELECT c.comment_id, c.parent_id, e.creator, e.created_at,
            e.last_modified_at, c.last_modified_by, c.text
       FROM entity_closure ct
       JOIN comments c ON c.comment_id = ct.descendant_id
       JOIN entities e ON e.entity_id  = ct.descendant_id
      WHERE ct.ancestor_id = ?1 AND ct.depth = 1
      ORDER BY ct.descendant_id
      LIMIT ?2 OFFSET ?3",
  )?;
  stmt
    .query_map(
      rusqlite::params![parent_id, page.limit, page.offset],
      RawComment::from_row,
    )?
    .collect()
}

/// Every entity in the sub-tree under `root_id`, breadth-first, each with
/// its direct parent. Posts contribute their text; deleted comments none.
pub fn descendant_nodes(
  conn: &Connection,
  root_id: EntityId,
  include_root: bool,
) -> rusqlite::Result<Vec<RawNode>> {
  let mut stmt = conn.prepare(
    "SELECT e.entity_id, e.kind, c.parent_id, e.creator, e.created_at,
            e.last_modified_at, COALESCE(c.text, p.text)
       FROM entity_closure ct
       JOIN entities e      ON e.entity_id  = ct.descendant_id
       LEFT JOIN comments c ON c.comment_id = e.entity_id
       LEFT JOIN posts p    ON p.post_id    = e.entity_id
      WHERE ct.ancestor_id = ?1 AND (?2 OR ct.depth > 0)
      ORDER BY ct.depth, ct.descendant_id",
  )?;
  stmt
    .query_map(rusqlite::params![root_id, include_root], RawNode::from_row)?
    .collect()
}

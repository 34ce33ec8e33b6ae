//! Search history: one row per history query issued.

use arbor_core::history::HistoryQuery;
use rusqlite::{Connection, OptionalExtension as _};

use crate::encode::{RawSearchRecord, encode_date};

pub fn record(conn: &Connection, query: &HistoryQuery, at: &str) -> rusqlite::Result<i64> {
  conn.execute(
    "INSERT INTO search_history (username, start_date, end_date, root_entity_id, searched_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    rusqlite::params![
      query.actor,
      query.start_date.map(encode_date),
      query.end_date.map(encode_date),
      query.root_entity_id,
      at,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn list_for(conn: &Connection, user: &str) -> rusqlite::Result<Vec<RawSearchRecord>> {
  let mut stmt = conn.prepare(
    "SELECT search_id, username, start_date, end_date, root_entity_id, searched_at
       FROM search_history
      WHERE username = ?1
      ORDER BY searched_at, search_id",
  )?;
  stmt
    .query_map(rusqlite::params![user], RawSearchRecord::from_row)?
    .collect()
}

/// One of `user`'s records; another user's id yields `None`.
pub fn find(
  conn: &Connection,
  user: &str,
  search_id: i64,
) -> rusqlite::Result<Option<RawSearchRecord>> {
  conn
    .query_row(
      "SELECT search_id, username, start_date, end_date, root_entity_id, searched_at
         FROM search_history
        WHERE username = ?1 AND search_id = ?2",
      rusqlite::params![user, search_id],
      RawSearchRecord::from_row,
    )
    .optional()
}

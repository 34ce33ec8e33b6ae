//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with a fixed microsecond
//! precision, so that string order is time order and range filters can be
//! pushed into SQL. Calendar dates are stored as `YYYY-MM-DD`. Enumerations
//! are stored as their lowercase names.

use std::str::FromStr as _;

use arbor_core::{
  entity::{Comment, EntityId, EntityKind, EntityRef, Post, ThreadNode},
  history::{AuditAction, AuditEntry, SearchRecord},
};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

/// Encoded instant at which `start` begins; entries at or after it match.
pub fn day_start(start: NaiveDate) -> String {
  encode_dt(start.and_time(NaiveTime::MIN).and_utc())
}

/// Encoded instant at which the day after `end` begins; entries strictly
/// before it match. `None` past the last representable date.
pub fn day_after(end: NaiveDate) -> Option<String> {
  end.succ_opt().map(day_start)
}

// ─── Enumerations ────────────────────────────────────────────────────────────

pub fn decode_kind(s: &str) -> Result<EntityKind> {
  EntityKind::from_str(s)
    .map_err(|_| Error::Decode(format!("unknown entity kind: {s:?}")))
}

pub fn decode_action(s: &str) -> Result<AuditAction> {
  AuditAction::from_str(s)
    .map_err(|_| Error::Decode(format!("unknown audit action: {s:?}")))
}

/// Read an [`EntityKind`] column inside a query closure.
pub fn kind_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<EntityKind> {
  let raw: String = row.get(idx)?;
  EntityKind::from_str(&raw).map_err(|e| {
    rusqlite::Error::FromSqlConversionFailure(
      idx,
      rusqlite::types::Type::Text,
      Box::new(e),
    )
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read from `entities` joined with `posts`.
pub struct RawPost {
  pub post_id:          EntityId,
  pub creator:          String,
  pub created_at:       String,
  pub last_modified_at: String,
  pub text:             String,
}

impl RawPost {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      post_id:          row.get(0)?,
      creator:          row.get(1)?,
      created_at:       row.get(2)?,
      last_modified_at: row.get(3)?,
      text:             row.get(4)?,
    })
  }

  pub fn into_post(self) -> Result<Post> {
    Ok(Post {
      id:               self.post_id,
      creator:          self.creator,
      created_at:       decode_dt(&self.created_at)?,
      last_modified_at: decode_dt(&self.last_modified_at)?,
      text:             self.text,
    })
  }
}

/// Raw values read from `entities` joined with `comments`.
pub struct RawComment {
  pub comment_id:       EntityId,
  pub parent_id:        EntityId,
  pub creator:          String,
  pub created_at:       String,
  pub last_modified_at: String,
  pub last_modified_by: String,
  pub text:             Option<String>,
}

impl RawComment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      comment_id:       row.get(0)?,
      parent_id:        row.get(1)?,
      creator:          row.get(2)?,
      created_at:       row.get(3)?,
      last_modified_at: row.get(4)?,
      last_modified_by: row.get(5)?,
      text:             row.get(6)?,
    })
  }

  pub fn into_comment(self) -> Result<Comment> {
    Ok(Comment {
      id:               self.comment_id,
      parent_id:        self.parent_id,
      creator:          self.creator,
      created_at:       decode_dt(&self.created_at)?,
      last_modified_at: decode_dt(&self.last_modified_at)?,
      last_modified_by: self.last_modified_by,
      text:             self.text,
    })
  }
}

/// Raw values for one entity of a sub-tree listing.
pub struct RawNode {
  pub entity_id:        EntityId,
  pub kind:             String,
  pub parent_id:        Option<EntityId>,
  pub creator:          String,
  pub created_at:       String,
  pub last_modified_at: String,
  pub text:             Option<String>,
}

impl RawNode {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entity_id:        row.get(0)?,
      kind:             row.get(1)?,
      parent_id:        row.get(2)?,
      creator:          row.get(3)?,
      created_at:       row.get(4)?,
      last_modified_at: row.get(5)?,
      text:             row.get(6)?,
    })
  }

  pub fn into_node(self) -> Result<ThreadNode> {
    Ok(ThreadNode {
      id:               self.entity_id,
      kind:             decode_kind(&self.kind)?,
      parent_id:        self.parent_id,
      creator:          self.creator,
      created_at:       decode_dt(&self.created_at)?,
      last_modified_at: decode_dt(&self.last_modified_at)?,
      text:             self.text,
    })
  }
}

/// Raw values read from an `audit_log` row.
pub struct RawAuditEntry {
  pub audit_id:  i64,
  pub entity_id: EntityId,
  pub actor:     String,
  pub action:    String,
  pub at:        String,
  pub text:      Option<String>,
}

impl RawAuditEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      audit_id:  row.get(0)?,
      entity_id: row.get(1)?,
      actor:     row.get(2)?,
      action:    row.get(3)?,
      at:        row.get(4)?,
      text:      row.get(5)?,
    })
  }

  pub fn into_entry(self) -> Result<AuditEntry> {
    Ok(AuditEntry {
      audit_id:  self.audit_id,
      entity_id: self.entity_id,
      actor:     self.actor,
      action:    decode_action(&self.action)?,
      at:        decode_dt(&self.at)?,
      text:      self.text,
    })
  }
}

/// Raw values read from a `search_history` row.
pub struct RawSearchRecord {
  pub search_id:      i64,
  pub username:       String,
  pub start_date:     Option<String>,
  pub end_date:       Option<String>,
  pub root_entity_id: Option<EntityId>,
  pub searched_at:    String,
}

impl RawSearchRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      search_id:      row.get(0)?,
      username:       row.get(1)?,
      start_date:     row.get(2)?,
      end_date:       row.get(3)?,
      root_entity_id: row.get(4)?,
      searched_at:    row.get(5)?,
    })
  }

  pub fn into_record(self) -> Result<SearchRecord> {
    Ok(SearchRecord {
      search_id:      self.search_id,
      user:           self.username,
      start_date:     self.start_date.as_deref().map(decode_date).transpose()?,
      end_date:       self.end_date.as_deref().map(decode_date).transpose()?,
      root_entity_id: self.root_entity_id,
      searched_at:    decode_dt(&self.searched_at)?,
    })
  }
}

/// Read an `entities` row's identity inside a query closure.
pub fn entity_ref_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntityRef> {
  Ok(EntityRef { id: row.get(0)?, kind: kind_column(row, 1)? })
}

//! Audit entries, history queries and the per-user search records they leave
//! behind.
//!
//! The audit log is append-only: entries are written in the same transaction
//! as the mutation they describe and are never updated afterwards.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

// ─── Audit log ───────────────────────────────────────────────────────────────

/// The mutation an [`AuditEntry`] records.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AuditAction {
  Create,
  Update,
  Delete,
  Restore,
}

/// One immutable line of the audit log.
///
/// `text` is the text the comment had *after* a create, update or restore,
/// and the text it had *before* a delete. The latter is what restore reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
  pub audit_id:  i64,
  pub entity_id: EntityId,
  pub actor:     String,
  pub action:    AuditAction,
  pub at:        DateTime<Utc>,
  pub text:      Option<String>,
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Parameters for [`CommentStore::query_history`](crate::store::CommentStore::query_history).
///
/// Filters are conjunctive; a `None` filter matches everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryQuery {
  pub actor:          String,
  /// First calendar day included (UTC).
  pub start_date:     Option<NaiveDate>,
  /// Last calendar day included (UTC).
  pub end_date:       Option<NaiveDate>,
  /// Only entries for this entity or anything beneath it in the tree.
  pub root_entity_id: Option<EntityId>,
}

impl HistoryQuery {
  /// Everything `actor` has ever done.
  pub fn for_actor(actor: impl Into<String>) -> Self {
    Self {
      actor:          actor.into(),
      start_date:     None,
      end_date:       None,
      root_entity_id: None,
    }
  }
}

// ─── Search records ──────────────────────────────────────────────────────────

/// The parameters of one history query, recorded when it was issued.
///
/// Records are written whether or not the query found anything; they are
/// never deduplicated or expired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRecord {
  pub search_id:      i64,
  pub user:           String,
  pub start_date:     Option<NaiveDate>,
  pub end_date:       Option<NaiveDate>,
  pub root_entity_id: Option<EntityId>,
  pub searched_at:    DateTime<Utc>,
}

impl SearchRecord {
  /// The query this record was logged for, ready to be issued again.
  pub fn to_query(&self) -> HistoryQuery {
    HistoryQuery {
      actor:          self.user.clone(),
      start_date:     self.start_date,
      end_date:       self.end_date,
      root_entity_id: self.root_entity_id,
    }
  }
}

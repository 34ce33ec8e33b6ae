//! Posts, comments, and the flat node shape used for trees.
//!
//! Every entity shares one integer id space, so a comment's `parent_id` can
//! point at either a post or another comment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tree::TreeItem;

/// Identifier shared by all entity kinds.
pub type EntityId = i64;

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The kind of a commentable entity.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
  Post,
  Comment,
}

/// A `kind:id` pair, used where only the identity of an entity matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
  pub kind: EntityKind,
  pub id:   EntityId,
}

impl std::fmt::Display for EntityRef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}:{}", self.kind, self.id)
  }
}

// ─── Posts ───────────────────────────────────────────────────────────────────

/// A root of the comment forest. Posts never have a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
  pub id:               EntityId,
  pub creator:          String,
  pub created_at:       DateTime<Utc>,
  pub last_modified_at: DateTime<Utc>,
  pub text:             String,
}

// ─── Comments ────────────────────────────────────────────────────────────────

/// A comment attached to exactly one parent entity.
///
/// `text` is `None` while the comment is soft-deleted; the row and its place
/// in the tree are kept so it can be restored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
  pub id:               EntityId,
  pub parent_id:        EntityId,
  pub creator:          String,
  pub created_at:       DateTime<Utc>,
  pub last_modified_at: DateTime<Utc>,
  pub last_modified_by: String,
  pub text:             Option<String>,
}

impl Comment {
  pub fn is_deleted(&self) -> bool { self.text.is_none() }
}

impl TreeItem for Comment {
  fn id(&self) -> EntityId { self.id }

  fn parent_id(&self) -> Option<EntityId> { Some(self.parent_id) }
}

// ─── Thread nodes ────────────────────────────────────────────────────────────

/// One row of a sub-tree listing: any entity, tagged with its direct parent
/// so the nesting can be rebuilt by [`crate::tree::assemble`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadNode {
  pub id:               EntityId,
  pub kind:             EntityKind,
  pub parent_id:        Option<EntityId>,
  pub creator:          String,
  pub created_at:       DateTime<Utc>,
  pub last_modified_at: DateTime<Utc>,
  pub text:             Option<String>,
}

impl TreeItem for ThreadNode {
  fn id(&self) -> EntityId { self.id }

  fn parent_id(&self) -> Option<EntityId> { self.parent_id }
}

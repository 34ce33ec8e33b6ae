//! Error taxonomy shared by every Arbor backend.
//!
//! Storage crates keep their own error types but must convert into this one,
//! so that callers at the request boundary can branch on the domain variant
//! without knowing which backend produced it.

use thiserror::Error;

use crate::entity::{EntityId, EntityRef};

#[derive(Debug, Error)]
pub enum Error {
  /// A read produced zero rows. Empty results are never a valid answer.
  #[error("not found: {0}")]
  NotFound(String),

  /// `create_comment` was given a parent that does not exist.
  #[error("invalid parent entity {parent_id}; valid entities: {}", render_sample(.sample))]
  InvalidParent {
    parent_id: EntityId,
    /// Up to ten existing entities, for diagnosing the bad request.
    sample:    Vec<EntityRef>,
  },

  #[error("unknown parent entity: {0}")]
  UnknownParent(EntityId),

  #[error("comment {0} has replies and cannot be deleted")]
  HasChildren(EntityId),

  #[error("comment {0} is already deleted")]
  AlreadyDeleted(EntityId),

  #[error("no deleted version of comment {0} to restore")]
  NoDeletedVersion(EntityId),

  #[error("malformed tree: {0}")]
  MalformedTree(String),

  #[error("storage unavailable: {0}")]
  StorageUnavailable(String),
}

fn render_sample(sample: &[EntityRef]) -> String {
  if sample.is_empty() {
    return "none".to_owned();
  }
  sample
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join(" ")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

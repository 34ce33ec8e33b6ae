//! The `EntityGraph` and `CommentStore` traits and their paging type.
//!
//! The traits are implemented by storage backends (e.g. `arbor-store-sqlite`).
//! Higher layers (`arbor-api`) depend on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  entity::{Comment, EntityId, Post, ThreadNode},
  history::{AuditEntry, HistoryQuery, SearchRecord},
  tree::{self, TreeNode},
};

// ─── Paging ──────────────────────────────────────────────────────────────────

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// Upper bound on any page, whatever the caller asks for.
pub const MAX_PAGE_SIZE: u32 = 25;

/// An `offset`/`limit` window over an ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
  pub offset: u32,
  pub limit:  u32,
}

impl Page {
  /// Build a window, capping `limit` at [`MAX_PAGE_SIZE`].
  pub fn new(offset: u32, limit: u32) -> Self {
    Self { offset, limit: limit.min(MAX_PAGE_SIZE) }
  }

  /// The window for 1-based page `number` of `per_page` items.
  /// Page `0` is treated as page `1`.
  pub fn numbered(number: u32, per_page: u32) -> Self {
    let per_page = per_page.min(MAX_PAGE_SIZE);
    Self {
      offset: number.saturating_sub(1).saturating_mul(per_page),
      limit:  per_page,
    }
  }
}

impl Default for Page {
  fn default() -> Self { Self::new(0, DEFAULT_PAGE_SIZE) }
}

// ─── Graph ───────────────────────────────────────────────────────────────────

/// Read access to the ancestry (closure) index over all entities.
///
/// Writes to the index only ever happen as part of creating an entity, so
/// they are not exposed here.
pub trait EntityGraph: Send + Sync {
  type Error: std::error::Error
    + From<crate::Error>
    + Into<crate::Error>
    + Send
    + Sync
    + 'static;

  /// Every entity beneath `entity_id` at any depth, breadth-first (by depth,
  /// then id). `entity_id` itself leads the list when `include_self` is set.
  /// An unknown id yields an empty list.
  fn descendants_of(
    &self,
    entity_id: EntityId,
    include_self: bool,
  ) -> impl Future<Output = Result<Vec<EntityId>, Self::Error>> + Send + '_;

  /// Every entity above `entity_id`, nearest first.
  fn ancestors_of(
    &self,
    entity_id: EntityId,
    include_self: bool,
  ) -> impl Future<Output = Result<Vec<EntityId>, Self::Error>> + Send + '_;

  /// Direct children of `parent_id` in id order, windowed by `page`.
  fn children_of(
    &self,
    parent_id: EntityId,
    page: Page,
  ) -> impl Future<Output = Result<Vec<EntityId>, Self::Error>> + Send + '_;
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Abstraction over an Arbor comment store backend.
///
/// Every mutation is atomic: the entity rows, the closure rows and the audit
/// entry it produces are committed together or not at all. Every listing
/// reports an empty result as [`crate::Error::NotFound`].
pub trait CommentStore: EntityGraph {
  // ── Posts ─────────────────────────────────────────────────────────────

  /// Create a new post; it becomes a root of the forest.
  fn create_post(
    &self,
    creator: String,
    text: String,
  ) -> impl Future<Output = Result<Post, Self::Error>> + Send + '_;

  fn get_post(
    &self,
    id: EntityId,
  ) -> impl Future<Output = Result<Post, Self::Error>> + Send + '_;

  // ── Comments ──────────────────────────────────────────────────────────

  /// Create a comment under `parent_id` (a post or a comment).
  ///
  /// Fails with [`crate::Error::InvalidParent`] if the parent does not
  /// exist; the error carries a sample of entities that do.
  fn create_comment(
    &self,
    creator: String,
    text: String,
    parent_id: EntityId,
  ) -> impl Future<Output = Result<Comment, Self::Error>> + Send + '_;

  fn get_comment(
    &self,
    id: EntityId,
  ) -> impl Future<Output = Result<Comment, Self::Error>> + Send + '_;

  /// All comments written by `creator`, deleted ones included.
  fn comments_by_creator(
    &self,
    creator: String,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  /// Direct replies to `parent_id`, in id order.
  fn first_level_children(
    &self,
    parent_id: EntityId,
    page: Page,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  /// Replace the text of a comment.
  fn update_comment(
    &self,
    actor: String,
    id: EntityId,
    text: String,
  ) -> impl Future<Output = Result<Comment, Self::Error>> + Send + '_;

  /// Soft-delete a comment: its text becomes `None`, its row and links stay.
  ///
  /// Refused with [`crate::Error::HasChildren`] while the comment has any
  /// direct reply; deletion never cascades.
  fn delete_comment(
    &self,
    actor: String,
    id: EntityId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Bring back the text captured by the most recent delete of `id`.
  ///
  /// Returns the restored text.
  fn restore_comment(
    &self,
    actor: String,
    id: EntityId,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;

  // ── Trees ─────────────────────────────────────────────────────────────

  /// Every entity in the sub-tree rooted at `root_id`, breadth-first, each
  /// tagged with its parent id.
  fn descendants(
    &self,
    root_id: EntityId,
    include_root: bool,
  ) -> impl Future<Output = Result<Vec<ThreadNode>, Self::Error>> + Send + '_;

  /// [`descendants`](Self::descendants), nested by parent.
  fn descendant_tree(
    &self,
    root_id: EntityId,
    include_root: bool,
  ) -> impl Future<Output = Result<Vec<TreeNode<ThreadNode>>, Self::Error>>
  + Send
  + '_ {
    async move {
      let nodes = self.descendants(root_id, include_root).await?;
      Ok(tree::assemble(nodes)?)
    }
  }

  // ── History ───────────────────────────────────────────────────────────

  /// The most recent delete entry for `entity_id`.
  fn latest_delete(
    &self,
    entity_id: EntityId,
  ) -> impl Future<Output = Result<AuditEntry, Self::Error>> + Send + '_;

  /// Audit entries matching `query`, oldest first.
  ///
  /// Records a [`SearchRecord`] for the query even when nothing matches.
  fn query_history(
    &self,
    query: HistoryQuery,
  ) -> impl Future<Output = Result<Vec<AuditEntry>, Self::Error>> + Send + '_;

  /// Every history query `user` has issued, oldest first.
  fn list_searches(
    &self,
    user: String,
  ) -> impl Future<Output = Result<Vec<SearchRecord>, Self::Error>> + Send + '_;

  /// Issue one of `user`'s earlier searches again.
  fn replay_search(
    &self,
    user: String,
    search_id: i64,
  ) -> impl Future<Output = Result<Vec<AuditEntry>, Self::Error>> + Send + '_;
}

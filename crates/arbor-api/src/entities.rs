//! Handlers for `/entities/{id}/…`: navigating the comment forest.
//!
//! These work for posts and comments alike.

use std::sync::Arc;

use arbor_core::{
  Error as CoreError,
  entity::{Comment, EntityId, ThreadNode},
  store::{CommentStore, DEFAULT_PAGE_SIZE, Page},
  tree::TreeNode,
};
use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct PageParams {
  /// 1-based.
  #[serde(default = "first_page")]
  pub page:     u32,
  #[serde(default = "default_per_page")]
  pub per_page: u32,
}

fn first_page() -> u32 { 1 }

fn default_per_page() -> u32 { DEFAULT_PAGE_SIZE }

/// `GET /entities/{id}/children[?page=<n>&per_page=<n>]`
pub async fn children<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<EntityId>,
  Query(params): Query<PageParams>,
) -> Result<Json<Vec<Comment>>, ApiError>
where
  S: CommentStore,
{
  if params.per_page == 0 {
    return Err(ApiError::BadRequest("per_page must be at least 1".into()));
  }
  let page = Page::numbered(params.page, params.per_page);
  let comments = store
    .first_level_children(id, page)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(comments))
}

#[derive(Debug, Default, Deserialize)]
pub struct SubtreeParams {
  #[serde(default)]
  pub include_root: bool,
}

/// `GET /entities/{id}/descendants[?include_root=true]` — flat, breadth-first.
pub async fn descendants<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<EntityId>,
  Query(params): Query<SubtreeParams>,
) -> Result<Json<Vec<ThreadNode>>, ApiError>
where
  S: CommentStore,
{
  let nodes = store
    .descendants(id, params.include_root)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(nodes))
}

/// `GET /entities/{id}/tree[?include_root=true]` — nested by parent.
pub async fn tree<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<EntityId>,
  Query(params): Query<SubtreeParams>,
) -> Result<Json<Vec<TreeNode<ThreadNode>>>, ApiError>
where
  S: CommentStore,
{
  let forest = store
    .descendant_tree(id, params.include_root)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(forest))
}

/// `GET /entities/{id}/ancestors` — ids, nearest first; empty for a root.
pub async fn ancestors<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<EntityId>,
) -> Result<Json<Vec<EntityId>>, ApiError>
where
  S: CommentStore,
{
  // The reflexive row tells an unknown id apart from a root.
  let mut ids = store.ancestors_of(id, true).await.map_err(ApiError::store)?;
  if ids.is_empty() {
    return Err(ApiError::store(CoreError::NotFound(format!("entity {id} not found"))));
  }
  ids.remove(0);
  Ok(Json(ids))
}

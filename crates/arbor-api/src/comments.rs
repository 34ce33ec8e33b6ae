//! Handlers for `/comments` endpoints and per-user comment listings.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/comments` | Body: `{"creator","text","parent_id"}`; 422 on a bad parent |
//! | `GET`  | `/comments/{id}` | 404 if not found |
//! | `PUT`  | `/comments/{id}` | Body: `{"actor","text"}` |
//! | `POST` | `/comments/{id}/delete` | Body: `{"actor"}`; 409 while it has replies |
//! | `POST` | `/comments/{id}/restore` | Body: `{"actor"}`; 409 if nothing to restore |
//! | `GET`  | `/users/{user}/comments` | Everything `user` wrote |

use std::sync::Arc;

use arbor_core::{
  entity::{Comment, EntityId},
  store::CommentStore,
};
use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, required};

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub creator:   String,
  pub text:      String,
  pub parent_id: EntityId,
}

/// `POST /comments`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommentStore,
{
  let creator = required("creator", body.creator)?;
  let comment = store
    .create_comment(creator, body.text, body.parent_id)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(comment)))
}

// ─── Read ─────────────────────────────────────────────────────────────────────

/// `GET /comments/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<EntityId>,
) -> Result<Json<Comment>, ApiError>
where
  S: CommentStore,
{
  let comment = store.get_comment(id).await.map_err(ApiError::store)?;
  Ok(Json(comment))
}

/// `GET /users/{user}/comments`
pub async fn by_user<S>(
  State(store): State<Arc<S>>,
  Path(user): Path<String>,
) -> Result<Json<Vec<Comment>>, ApiError>
where
  S: CommentStore,
{
  let comments = store.comments_by_creator(user).await.map_err(ApiError::store)?;
  Ok(Json(comments))
}

// ─── Mutations ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub actor: String,
  pub text:  String,
}

/// `PUT /comments/{id}`
pub async fn update_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<EntityId>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<Comment>, ApiError>
where
  S: CommentStore,
{
  let actor = required("actor", body.actor)?;
  let comment = store
    .update_comment(actor, id, body.text)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(comment))
}

#[derive(Debug, Deserialize)]
pub struct ActorBody {
  pub actor: String,
}

/// `POST /comments/{id}/delete`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<EntityId>,
  Json(body): Json<ActorBody>,
) -> Result<StatusCode, ApiError>
where
  S: CommentStore,
{
  let actor = required("actor", body.actor)?;
  store.delete_comment(actor, id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct Restored {
  pub id:   EntityId,
  pub text: String,
}

/// `POST /comments/{id}/restore`
pub async fn restore_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<EntityId>,
  Json(body): Json<ActorBody>,
) -> Result<Json<Restored>, ApiError>
where
  S: CommentStore,
{
  let actor = required("actor", body.actor)?;
  let text = store.restore_comment(actor, id).await.map_err(ApiError::store)?;
  Ok(Json(Restored { id, text }))
}

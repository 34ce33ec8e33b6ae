//! Handlers for `/posts` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/posts` | Body: `{"creator":"alice","text":"…"}` |
//! | `GET`  | `/posts/{id}` | 404 if not found |

use std::sync::Arc;

use arbor_core::{
  entity::{EntityId, Post},
  store::CommentStore,
};
use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub creator: String,
  pub text:    String,
}

/// `POST /posts`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CommentStore,
{
  let creator = crate::required("creator", body.creator)?;
  let post = store
    .create_post(creator, body.text)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(post)))
}

/// `GET /posts/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<EntityId>,
) -> Result<Json<Post>, ApiError>
where
  S: CommentStore,
{
  let post = store.get_post(id).await.map_err(ApiError::store)?;
  Ok(Json(post))
}

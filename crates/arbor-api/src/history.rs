//! Handlers for a user's audit history and saved searches.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/users/{user}/history` | `?start_date&end_date&root_id&format` |
//! | `GET` | `/users/{user}/searches` | Every history query `user` issued |
//! | `GET` | `/users/{user}/searches/{id}/replay` | `?format` |
//!
//! Without `format` the entries come back as plain JSON. With
//! `format=json|xml` they are served as a download.

use std::sync::Arc;

use arbor_core::{
  entity::EntityId,
  history::{AuditEntry, HistoryQuery, SearchRecord},
  store::CommentStore,
};
use axum::{
  Json,
  extract::{Path, Query, State},
  response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
  error::ApiError,
  export::{self, Format},
};

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  pub start_date: Option<NaiveDate>,
  pub end_date:   Option<NaiveDate>,
  pub root_id:    Option<EntityId>,
  pub format:     Option<Format>,
}

/// `GET /users/{user}/history`
pub async fn query<S>(
  State(store): State<Arc<S>>,
  Path(user): Path<String>,
  Query(params): Query<HistoryParams>,
) -> Result<Response, ApiError>
where
  S: CommentStore,
{
  if let (Some(start), Some(end)) = (params.start_date, params.end_date)
    && start > end
  {
    return Err(ApiError::BadRequest(format!(
      "start_date {start} is after end_date {end}"
    )));
  }

  let query = HistoryQuery {
    actor:          user.clone(),
    start_date:     params.start_date,
    end_date:       params.end_date,
    root_entity_id: params.root_id,
  };
  let entries = store.query_history(query).await.map_err(ApiError::store)?;
  respond(&user, entries, params.format)
}

/// `GET /users/{user}/searches`
pub async fn searches<S>(
  State(store): State<Arc<S>>,
  Path(user): Path<String>,
) -> Result<Json<Vec<SearchRecord>>, ApiError>
where
  S: CommentStore,
{
  let records = store.list_searches(user).await.map_err(ApiError::store)?;
  Ok(Json(records))
}

#[derive(Debug, Deserialize)]
pub struct ReplayParams {
  pub format: Option<Format>,
}

/// `GET /users/{user}/searches/{id}/replay`
pub async fn replay<S>(
  State(store): State<Arc<S>>,
  Path((user, search_id)): Path<(String, i64)>,
  Query(params): Query<ReplayParams>,
) -> Result<Response, ApiError>
where
  S: CommentStore,
{
  let entries = store
    .replay_search(user.clone(), search_id)
    .await
    .map_err(ApiError::store)?;
  respond(&user, entries, params.format)
}

fn respond(
  user: &str,
  entries: Vec<AuditEntry>,
  format: Option<Format>,
) -> Result<Response, ApiError> {
  match format {
    None => Ok(Json(entries).into_response()),
    Some(format) => export::attachment(user, &entries, format),
  }
}

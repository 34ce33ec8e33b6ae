//! JSON REST API for Arbor.
//!
//! Exposes an axum [`Router`] backed by any [`arbor_core::store::CommentStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility; the
//! acting user is named in each request.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", arbor_api::api_router(store.clone()))
//! ```

pub mod comments;
pub mod entities;
pub mod error;
pub mod export;
pub mod history;
pub mod posts;
pub mod settings;

use std::sync::Arc;

use arbor_core::store::CommentStore;
use axum::{
  Router,
  routing::{get, post},
};

pub use error::ApiError;
pub use settings::ServerConfig;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: CommentStore + 'static,
{
  Router::new()
    // Posts
    .route("/posts", post(posts::create::<S>))
    .route("/posts/{id}", get(posts::get_one::<S>))
    // Comments
    .route("/comments", post(comments::create::<S>))
    .route("/comments/{id}", get(comments::get_one::<S>).put(comments::update_one::<S>))
    .route("/comments/{id}/delete", post(comments::delete_one::<S>))
    .route("/comments/{id}/restore", post(comments::restore_one::<S>))
    // Forest navigation
    .route("/entities/{id}/children", get(entities::children::<S>))
    .route("/entities/{id}/descendants", get(entities::descendants::<S>))
    .route("/entities/{id}/tree", get(entities::tree::<S>))
    .route("/entities/{id}/ancestors", get(entities::ancestors::<S>))
    // Per-user listings
    .route("/users/{user}/comments", get(comments::by_user::<S>))
    .route("/users/{user}/history", get(history::query::<S>))
    .route("/users/{user}/searches", get(history::searches::<S>))
    .route("/users/{user}/searches/{id}/replay", get(history::replay::<S>))
    .with_state(store)
}

/// Reject a blank user name in a request body.
fn required(field: &str, value: String) -> Result<String, ApiError> {
  if value.trim().is_empty() {
    return Err(ApiError::BadRequest(format!("{field} must not be empty")));
  }
  Ok(value)
}

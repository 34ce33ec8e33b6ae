//! SQLite backend for the Arbor comment store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The comment forest is indexed by a
//! closure table holding every (ancestor, descendant) pair.

mod audit;
mod comments;
mod encode;
mod graph;
mod schema;
mod search;
mod store;

pub mod config;
pub mod error;

pub use config::StoreConfig;
pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;

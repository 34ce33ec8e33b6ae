//! [`SqliteStore`]: the SQLite implementation of [`CommentStore`].

use std::{sync::Arc, time::Duration};

use arbor_core::{
  Error as CoreError,
  entity::{Comment, EntityId, EntityKind, Post, ThreadNode},
  history::{AuditAction, AuditEntry, HistoryQuery, SearchRecord},
  store::{CommentStore, EntityGraph, Page},
};
use chrono::Utc;
use rusqlite::{Transaction, TransactionBehavior};

use crate::{
  Error, Result, StoreConfig, audit, comments,
  encode::{RawAuditEntry, RawComment, RawNode, RawSearchRecord, encode_dt},
  graph,
  schema::SCHEMA,
  search,
};

/// Result of the domain checks made inside a transaction. An `Err` rolls
/// the transaction back; database failures travel separately as
/// `rusqlite::Error`.
pub type Outcome<T> = std::result::Result<T, CoreError>;

/// How many existing entities an [`CoreError::InvalidParent`] lists.
const INVALID_PARENT_SAMPLE: u32 = 10;

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Arbor comment store backed by a single SQLite file.
///
/// Clones share one connection thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn:   tokio_rusqlite::Connection,
  config: Arc<StoreConfig>,
}

impl SqliteStore {
  /// Open (or create) the store described by `config` and run schema
  /// initialisation.
  pub async fn open(config: &StoreConfig) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(config.path.clone()).await?;
    let store = Self { conn, config: Arc::new(config.clone()) };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, config: Arc::new(StoreConfig::default()) };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let busy_timeout = self.config.busy_timeout();
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `op` in one immediate write transaction.
  ///
  /// The transaction commits only when `op` returns `Ok(Ok(_))`; a domain
  /// rejection or a database error drops it, rolling everything back.
  ///
  /// Mutations stamp their timestamps inside `op`, once the write lock is
  /// held, so stamp order matches commit order across connections.
  async fn transact<T, F>(&self, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>) -> rusqlite::Result<Outcome<T>> + Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = op(&tx)?;
        if outcome.is_ok() {
          tx.commit()?;
        }
        Ok(outcome)
      })
      .await?;
    Ok(outcome?)
  }

  /// [`transact`](Self::transact), retried while SQLite reports the
  /// database busy, up to the configured number of attempts.
  async fn transact_retrying<T, F>(&self, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: Fn(&Transaction<'_>) -> rusqlite::Result<Outcome<T>> + Send + Sync + 'static,
  {
    let op = Arc::new(op);
    let mut attempt: u32 = 1;
    loop {
      let step = Arc::clone(&op);
      match self.transact(move |tx| step(tx)).await {
        Err(e) if e.is_contention() && attempt < self.config.create_attempts => {
          tracing::warn!(attempt, error = %e, "write transaction contended; retrying");
          tokio::time::sleep(Duration::from_millis(10 * u64::from(attempt))).await;
          attempt += 1;
        }
        other => return other,
      }
    }
  }
}

// ─── EntityGraph impl ────────────────────────────────────────────────────────

impl EntityGraph for SqliteStore {
  type Error = Error;

  async fn descendants_of(&self, entity_id: EntityId, include_self: bool) -> Result<Vec<EntityId>> {
    Ok(
      self
        .conn
        .call(move |conn| Ok(graph::descendants_of(conn, entity_id, include_self)?))
        .await?,
    )
  }

  async fn ancestors_of(&self, entity_id: EntityId, include_self: bool) -> Result<Vec<EntityId>> {
    Ok(
      self
        .conn
        .call(move |conn| Ok(graph::ancestors_of(conn, entity_id, include_self)?))
        .await?,
    )
  }

  async fn children_of(&self, parent_id: EntityId, page: Page) -> Result<Vec<EntityId>> {
    Ok(
      self
        .conn
        .call(move |conn| Ok(graph::children_of(conn, parent_id, page)?))
        .await?,
    )
  }
}

// ─── CommentStore impl ───────────────────────────────────────────────────────

impl CommentStore for SqliteStore {
  // ── Posts ─────────────────────────────────────────────────────────────────

  async fn create_post(&self, creator: String, text: String) -> Result<Post> {
    let raw = self
      .transact(move |tx| {
        let at = encode_dt(Utc::now());
        let id = comments::insert_entity(tx, EntityKind::Post, &creator, &at)?;
        comments::insert_post(tx, id, &text)?;
        graph::register_root(tx, id)?;
        let post = comments::load_post(tx, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        Ok(Ok(post))
      })
      .await?;

    tracing::debug!(post_id = raw.post_id, "created post");
    raw.into_post()
  }

  async fn get_post(&self, id: EntityId) -> Result<Post> {
    let raw = self
      .conn
      .call(move |conn| Ok(comments::load_post(conn, id)?))
      .await?;

    match raw {
      Some(raw) => raw.into_post(),
      None => Err(CoreError::NotFound(format!("post {id} not found")).into()),
    }
  }

  // ── Comments ──────────────────────────────────────────────────────────────

  async fn create_comment(
    &self,
    creator:   String,
    text:      String,
    parent_id: EntityId,
  ) -> Result<Comment> {
    let raw = self
      .transact_retrying(move |tx| {
        if graph::entity_ref(tx, parent_id)?.is_none() {
          let sample = graph::sample_entities(tx, INVALID_PARENT_SAMPLE)?;
          return Ok(Err(CoreError::InvalidParent { parent_id, sample }));
        }

        let at = encode_dt(Utc::now());
        let id = comments::insert_entity(tx, EntityKind::Comment, &creator, &at)?;
        comments::insert_comment(tx, id, parent_id, &creator, &text)?;
        if let Err(e) = graph::link(tx, parent_id, id)? {
          return Ok(Err(e));
        }
        audit::append(tx, id, &creator, AuditAction::Create, Some(&text), &at)?;

        let comment =
          comments::load_comment(tx, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        Ok(Ok(comment))
      })
      .await?;

    tracing::debug!(comment_id = raw.comment_id, parent_id, "created comment");
    raw.into_comment()
  }

  async fn get_comment(&self, id: EntityId) -> Result<Comment> {
    let raw = self
      .conn
      .call(move |conn| Ok(comments::load_comment(conn, id)?))
      .await?;

    match raw {
      Some(raw) => raw.into_comment(),
      None => Err(CoreError::NotFound(format!("comment {id} not found")).into()),
    }
  }

  async fn comments_by_creator(&self, creator: String) -> Result<Vec<Comment>> {
    let (creator, raws) = self
      .conn
      .call(move |conn| {
        let raws = comments::comments_by_creator(conn, &creator)?;
        Ok((creator, raws))
      })
      .await?;

    if raws.is_empty() {
      return Err(CoreError::NotFound(format!("no comments found for user {creator}")).into());
    }
    raws.into_iter().map(RawComment::into_comment).collect()
  }

  async fn first_level_children(&self, parent_id: EntityId, page: Page) -> Result<Vec<Comment>> {
    let raws = self
      .conn
      .call(move |conn| Ok(comments::first_level_children(conn, parent_id, page)?))
      .await?;

    if raws.is_empty() {
      return Err(
        CoreError::NotFound(format!(
          "no comments found for entity {parent_id} at offset {}",
          page.offset
        ))
        .into(),
      );
    }
    raws.into_iter().map(RawComment::into_comment).collect()
  }

  async fn update_comment(&self, actor: String, id: EntityId, text: String) -> Result<Comment> {
    let raw = self
      .transact(move |tx| {
        let at = encode_dt(Utc::now());
        if !comments::set_text(tx, id, Some(&text), &actor, &at)? {
          return Ok(Err(CoreError::NotFound(format!("comment {id} not found"))));
        }
        audit::append(tx, id, &actor, AuditAction::Update, Some(&text), &at)?;

        let comment =
          comments::load_comment(tx, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        Ok(Ok(comment))
      })
      .await?;

    tracing::debug!(comment_id = id, "updated comment");
    raw.into_comment()
  }

  async fn delete_comment(&self, actor: String, id: EntityId) -> Result<()> {
    self
      .transact(move |tx| {
        let at = encode_dt(Utc::now());
        // Replies block deletion of any entity, posts included.
        if graph::has_children(tx, id)? {
          return Ok(Err(CoreError::HasChildren(id)));
        }
        let Some(current) = comments::load_comment(tx, id)? else {
          return Ok(Err(CoreError::NotFound(format!("comment {id} not found"))));
        };
        let Some(previous) = current.text else {
          return Ok(Err(CoreError::AlreadyDeleted(id)));
        };

        comments::set_text(tx, id, None, &actor, &at)?;
        // Restore reads the pre-delete text back from this entry.
        audit::append(tx, id, &actor, AuditAction::Delete, Some(&previous), &at)?;
        Ok(Ok(()))
      })
      .await?;

    tracing::debug!(comment_id = id, "deleted comment");
    Ok(())
  }

  async fn restore_comment(&self, actor: String, id: EntityId) -> Result<String> {
    let text = self
      .transact(move |tx| {
        let at = encode_dt(Utc::now());
        let Some(deleted) = audit::latest_delete(tx, id)? else {
          return Ok(Err(CoreError::NoDeletedVersion(id)));
        };
        if audit::rewritten_since(tx, id, deleted.audit_id)? {
          return Ok(Err(CoreError::NoDeletedVersion(id)));
        }
        let Some(text) = deleted.text else {
          return Ok(Err(CoreError::NoDeletedVersion(id)));
        };

        if !comments::set_text(tx, id, Some(&text), &actor, &at)? {
          return Ok(Err(CoreError::NotFound(format!("comment {id} not found"))));
        }
        audit::append(tx, id, &actor, AuditAction::Restore, Some(&text), &at)?;
        Ok(Ok(text))
      })
      .await?;

    tracing::debug!(comment_id = id, "restored comment");
    Ok(text)
  }

  // ── Trees ─────────────────────────────────────────────────────────────────

  async fn descendants(&self, root_id: EntityId, include_root: bool) -> Result<Vec<ThreadNode>> {
    let raws = self
      .conn
      .call(move |conn| Ok(comments::descendant_nodes(conn, root_id, include_root)?))
      .await?;

    if raws.is_empty() {
      return Err(CoreError::NotFound(format!("no tree found for root {root_id}")).into());
    }
    raws.into_iter().map(RawNode::into_node).collect()
  }

  // ── History ───────────────────────────────────────────────────────────────

  async fn latest_delete(&self, entity_id: EntityId) -> Result<AuditEntry> {
    let raw = self
      .conn
      .call(move |conn| Ok(audit::latest_delete(conn, entity_id)?))
      .await?;

    match raw {
      Some(raw) => raw.into_entry(),
      None => Err(CoreError::NoDeletedVersion(entity_id).into()),
    }
  }

  async fn query_history(&self, query: HistoryQuery) -> Result<Vec<AuditEntry>> {
    // The search record commits with the read, before emptiness is judged,
    // so it is kept even when the caller gets `NotFound`.
    let raws = self
      .transact(move |tx| {
        let at = encode_dt(Utc::now());
        search::record(tx, &query, &at)?;
        Ok(Ok(audit::query(tx, &query)?))
      })
      .await?;

    if raws.is_empty() {
      return Err(CoreError::NotFound("no history found for the given parameters".into()).into());
    }
    raws.into_iter().map(RawAuditEntry::into_entry).collect()
  }

  async fn list_searches(&self, user: String) -> Result<Vec<SearchRecord>> {
    let (user, raws) = self
      .conn
      .call(move |conn| {
        let raws = search::list_for(conn, &user)?;
        Ok((user, raws))
      })
      .await?;

    if raws.is_empty() {
      return Err(CoreError::NotFound(format!("no searches found for user {user}")).into());
    }
    raws.into_iter().map(RawSearchRecord::into_record).collect()
  }

  async fn replay_search(&self, user: String, search_id: i64) -> Result<Vec<AuditEntry>> {
    let raw = self
      .conn
      .call(move |conn| Ok(search::find(conn, &user, search_id)?))
      .await?;

    let record = match raw {
      Some(raw) => raw.into_record()?,
      None => {
        return Err(CoreError::NotFound(format!("search {search_id} not found")).into());
      }
    };
    self.query_history(record.to_query()).await
  }
}

#[cfg(test)]
impl SqliteStore {
  /// Run one raw statement, bypassing the store API.
  pub(crate) async fn execute_raw(&self, sql: &'static str) -> Result<usize> {
    Ok(self.conn.call(move |conn| Ok(conn.execute(sql, [])?)).await?)
  }
}

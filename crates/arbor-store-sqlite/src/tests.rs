//! Integration tests for `SqliteStore` against an in-memory database.

use arbor_core::{
  Error as CoreError,
  entity::{EntityKind, EntityRef},
  history::{AuditAction, HistoryQuery},
  store::{CommentStore, EntityGraph, Page},
  tree,
};
use std::path::{Path, PathBuf};

use chrono::{Days, Utc};

use crate::{Error, SqliteStore, StoreConfig};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn core(e: Error) -> CoreError { e.into() }

/// A post by alice with one comment under it: ids 1 and 2.
async fn seeded() -> SqliteStore {
  let s = store().await;
  s.create_post("alice".into(), "first post".into()).await.unwrap();
  s.create_comment("alice".into(), "hello".into(), 1).await.unwrap();
  s
}

// ─── Posts and comments ──────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_comment() {
  let s = seeded().await;

  let post = s.get_post(1).await.unwrap();
  assert_eq!(post.creator, "alice");
  assert_eq!(post.text, "first post");

  let comment = s.get_comment(2).await.unwrap();
  assert_eq!(comment.parent_id, 1);
  assert_eq!(comment.creator, "alice");
  assert_eq!(comment.last_modified_by, "alice");
  assert_eq!(comment.text.as_deref(), Some("hello"));
  assert_eq!(comment.created_at, comment.last_modified_at);
}

#[tokio::test]
async fn posts_and_comments_share_one_id_space() {
  let s = seeded().await;
  let post = s.create_post("bob".into(), "second".into()).await.unwrap();
  let reply = s.create_comment("bob".into(), "reply".into(), 2).await.unwrap();
  assert_eq!(post.id, 3);
  assert_eq!(reply.id, 4);
}

#[tokio::test]
async fn get_missing_entities_is_not_found() {
  let s = seeded().await;
  assert!(matches!(core(s.get_post(2).await.unwrap_err()), CoreError::NotFound(_)));
  assert!(matches!(core(s.get_comment(1).await.unwrap_err()), CoreError::NotFound(_)));
  assert!(matches!(core(s.get_comment(99).await.unwrap_err()), CoreError::NotFound(_)));
}

#[tokio::test]
async fn comment_under_missing_parent_lists_valid_entities() {
  let s = seeded().await;

  let err = core(s.create_comment("bob".into(), "x".into(), 42).await.unwrap_err());
  match err {
    CoreError::InvalidParent { parent_id, sample } => {
      assert_eq!(parent_id, 42);
      assert_eq!(sample, vec![
        EntityRef { kind: EntityKind::Post, id: 1 },
        EntityRef { kind: EntityKind::Comment, id: 2 },
      ]);
    }
    other => panic!("expected InvalidParent, got {other:?}"),
  }

  // Nothing was written.
  assert!(s.descendants_of(42, true).await.unwrap().is_empty());
  assert!(matches!(
    core(s.comments_by_creator("bob".into()).await.unwrap_err()),
    CoreError::NotFound(_)
  ));
}

#[tokio::test]
async fn comments_by_creator_includes_deleted() {
  let s = seeded().await;
  s.create_comment("bob".into(), "bob's".into(), 1).await.unwrap();
  s.create_comment("alice".into(), "again".into(), 1).await.unwrap();
  s.delete_comment("alice".into(), 4).await.unwrap();

  let mine = s.comments_by_creator("alice".into()).await.unwrap();
  let ids: Vec<_> = mine.iter().map(|c| c.id).collect();
  assert_eq!(ids, vec![2, 4]);
  assert!(mine[1].is_deleted());

  assert!(matches!(
    core(s.comments_by_creator("carol".into()).await.unwrap_err()),
    CoreError::NotFound(_)
  ));
}

// ─── Closure index ───────────────────────────────────────────────────────────

#[tokio::test]
async fn closure_tracks_every_ancestor() {
  let s = seeded().await;
  s.create_comment("bob".into(), "c3".into(), 2).await.unwrap();
  s.create_comment("bob".into(), "c4".into(), 3).await.unwrap();
  s.create_comment("bob".into(), "c5".into(), 1).await.unwrap();

  assert_eq!(s.descendants_of(1, true).await.unwrap(), vec![1, 2, 5, 3, 4]);
  assert_eq!(s.descendants_of(1, false).await.unwrap(), vec![2, 5, 3, 4]);
  assert_eq!(s.descendants_of(3, false).await.unwrap(), vec![4]);
  assert_eq!(s.ancestors_of(4, false).await.unwrap(), vec![3, 2, 1]);
  assert_eq!(s.ancestors_of(4, true).await.unwrap(), vec![4, 3, 2, 1]);
  assert_eq!(s.children_of(1, Page::default()).await.unwrap(), vec![2, 5]);
  assert!(s.descendants_of(4, false).await.unwrap().is_empty());
}

#[tokio::test]
async fn roots_only_have_reflexive_rows() {
  let s = store().await;
  s.create_post("alice".into(), "p".into()).await.unwrap();
  assert_eq!(s.descendants_of(1, true).await.unwrap(), vec![1]);
  assert!(s.ancestors_of(1, false).await.unwrap().is_empty());
}

// ─── Paging ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_level_children_are_paged() {
  let s = store().await;
  s.create_post("alice".into(), "p".into()).await.unwrap();
  for n in 0..7 {
    s.create_comment("bob".into(), format!("c{n}"), 1).await.unwrap();
  }
  // A grandchild must not appear among first-level children.
  s.create_comment("bob".into(), "nested".into(), 2).await.unwrap();

  let first = s.first_level_children(1, Page::new(0, 5)).await.unwrap();
  assert_eq!(first.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2, 3, 4, 5, 6]);

  let second = s.first_level_children(1, Page::new(5, 5)).await.unwrap();
  assert_eq!(second.iter().map(|c| c.id).collect::<Vec<_>>(), vec![7, 8]);

  assert!(matches!(
    core(s.first_level_children(1, Page::new(10, 5)).await.unwrap_err()),
    CoreError::NotFound(_)
  ));
}

// ─── Update / delete / restore ───────────────────────────────────────────────

#[tokio::test]
async fn update_replaces_text_and_stamps_actor() {
  let s = seeded().await;
  let updated = s.update_comment("mod".into(), 2, "edited".into()).await.unwrap();
  assert_eq!(updated.text.as_deref(), Some("edited"));
  assert_eq!(updated.last_modified_by, "mod");
  assert_eq!(updated.creator, "alice");
  assert!(updated.last_modified_at >= updated.created_at);
}

#[tokio::test]
async fn update_missing_comment_is_not_found() {
  let s = seeded().await;
  assert!(matches!(
    core(s.update_comment("alice".into(), 1, "x".into()).await.unwrap_err()),
    CoreError::NotFound(_)
  ));
  assert!(matches!(
    core(s.update_comment("alice".into(), 9, "x".into()).await.unwrap_err()),
    CoreError::NotFound(_)
  ));
}

#[tokio::test]
async fn delete_keeps_row_and_links() {
  let s = seeded().await;
  s.delete_comment("alice".into(), 2).await.unwrap();

  let deleted = s.get_comment(2).await.unwrap();
  assert!(deleted.is_deleted());
  assert_eq!(s.descendants_of(1, false).await.unwrap(), vec![2]);
  assert_eq!(s.ancestors_of(2, false).await.unwrap(), vec![1]);
}

#[tokio::test]
async fn delete_with_replies_is_refused() {
  let s = seeded().await;
  s.create_comment("bob".into(), "reply".into(), 2).await.unwrap();

  assert!(matches!(
    core(s.delete_comment("alice".into(), 2).await.unwrap_err()),
    CoreError::HasChildren(2)
  ));
  // Nothing cascaded and nothing changed.
  assert_eq!(s.get_comment(2).await.unwrap().text.as_deref(), Some("hello"));
  assert_eq!(s.get_comment(3).await.unwrap().text.as_deref(), Some("reply"));
}

#[tokio::test]
async fn double_delete_is_refused() {
  let s = seeded().await;
  s.delete_comment("alice".into(), 2).await.unwrap();
  assert!(matches!(
    core(s.delete_comment("alice".into(), 2).await.unwrap_err()),
    CoreError::AlreadyDeleted(2)
  ));
}

#[tokio::test]
async fn delete_then_restore_round_trip() {
  let s = seeded().await;
  s.delete_comment("alice".into(), 2).await.unwrap();

  let latest = s.latest_delete(2).await.unwrap();
  assert_eq!(latest.action, AuditAction::Delete);
  assert_eq!(latest.text.as_deref(), Some("hello"));

  let text = s.restore_comment("alice".into(), 2).await.unwrap();
  assert_eq!(text, "hello");
  assert_eq!(s.get_comment(2).await.unwrap().text.as_deref(), Some("hello"));

  // The delete has been consumed.
  assert!(matches!(
    core(s.restore_comment("alice".into(), 2).await.unwrap_err()),
    CoreError::NoDeletedVersion(2)
  ));
}

#[tokio::test]
async fn restore_without_delete_is_refused() {
  let s = seeded().await;
  assert!(matches!(
    core(s.restore_comment("alice".into(), 2).await.unwrap_err()),
    CoreError::NoDeletedVersion(2)
  ));
  assert!(matches!(
    core(s.latest_delete(2).await.unwrap_err()),
    CoreError::NoDeletedVersion(2)
  ));
}

#[tokio::test]
async fn restore_after_rewrite_is_refused() {
  let s = seeded().await;
  s.delete_comment("alice".into(), 2).await.unwrap();
  s.update_comment("alice".into(), 2, "rewritten".into()).await.unwrap();

  assert!(matches!(
    core(s.restore_comment("alice".into(), 2).await.unwrap_err()),
    CoreError::NoDeletedVersion(2)
  ));
  assert_eq!(s.get_comment(2).await.unwrap().text.as_deref(), Some("rewritten"));
}

#[tokio::test]
async fn restore_uses_the_most_recent_delete() {
  let s = seeded().await;
  s.delete_comment("alice".into(), 2).await.unwrap();
  s.restore_comment("alice".into(), 2).await.unwrap();
  s.update_comment("alice".into(), 2, "second draft".into()).await.unwrap();
  s.delete_comment("alice".into(), 2).await.unwrap();

  assert_eq!(s.restore_comment("alice".into(), 2).await.unwrap(), "second draft");
}

#[tokio::test]
async fn post_comment_delete_restore_scenario() {
  let s = seeded().await;

  let children = s.first_level_children(1, Page::new(0, 5)).await.unwrap();
  assert_eq!(children.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2]);

  assert!(matches!(
    core(s.delete_comment("alice".into(), 1).await.unwrap_err()),
    CoreError::HasChildren(1)
  ));
  s.delete_comment("alice".into(), 2).await.unwrap();

  let mine = s.comments_by_creator("alice".into()).await.unwrap();
  assert_eq!(mine.len(), 1);
  assert_eq!((mine[0].id, mine[0].text.as_deref()), (2, None));

  assert_eq!(s.restore_comment("alice".into(), 2).await.unwrap(), "hello");

  let history = s.query_history(HistoryQuery::for_actor("alice")).await.unwrap();
  let actions: Vec<_> = history.iter().map(|e| (e.entity_id, e.action)).collect();
  assert_eq!(actions, vec![
    (2, AuditAction::Create),
    (2, AuditAction::Delete),
    (2, AuditAction::Restore),
  ]);

  let searches = s.list_searches("alice".into()).await.unwrap();
  assert_eq!(searches.len(), 1);
  assert_eq!(searches[0].to_query(), HistoryQuery::for_actor("alice"));
}

#[tokio::test]
async fn deleting_a_childless_post_is_not_found() {
  let s = store().await;
  s.create_post("alice".into(), "p".into()).await.unwrap();
  assert!(matches!(
    core(s.delete_comment("alice".into(), 1).await.unwrap_err()),
    CoreError::NotFound(_)
  ));
}

// ─── Trees ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn descendants_are_breadth_first_with_parents() {
  let s = seeded().await;
  s.create_comment("bob".into(), "c3".into(), 2).await.unwrap();
  s.create_comment("bob".into(), "c4".into(), 1).await.unwrap();
  s.delete_comment("bob".into(), 3).await.unwrap();

  let nodes = s.descendants(1, true).await.unwrap();
  let shape: Vec<_> = nodes.iter().map(|n| (n.id, n.parent_id)).collect();
  assert_eq!(shape, vec![(1, None), (2, Some(1)), (4, Some(1)), (3, Some(2))]);
  assert_eq!(nodes[0].kind, EntityKind::Post);
  assert_eq!(nodes[0].text.as_deref(), Some("first post"));
  assert_eq!(nodes[3].text, None);

  let below = s.descendants(1, false).await.unwrap();
  assert_eq!(below.len(), 3);

  assert!(matches!(
    core(s.descendants(4, false).await.unwrap_err()),
    CoreError::NotFound(_)
  ));
}

#[tokio::test]
async fn descendant_tree_nests_by_parent() {
  let s = seeded().await;
  s.create_comment("bob".into(), "c3".into(), 2).await.unwrap();
  s.create_comment("bob".into(), "c4".into(), 1).await.unwrap();
  s.create_comment("bob".into(), "c5".into(), 3).await.unwrap();

  let forest = s.descendant_tree(1, true).await.unwrap();
  assert_eq!(forest.len(), 1);
  let root = &forest[0];
  assert_eq!(root.item.id, 1);
  assert_eq!(root.children.iter().map(|c| c.item.id).collect::<Vec<_>>(), vec![2, 4]);
  assert_eq!(root.children[0].children[0].item.id, 3);
  assert_eq!(root.children[0].children[0].children[0].item.id, 5);

  let ids: Vec<_> = tree::flatten(&forest).into_iter().map(|n| n.id).collect();
  assert_eq!(ids, vec![1, 2, 3, 5, 4]);

  // Without the root, its children become the roots.
  let forest = s.descendant_tree(1, false).await.unwrap();
  assert_eq!(forest.iter().map(|n| n.item.id).collect::<Vec<_>>(), vec![2, 4]);
}

// ─── History ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn history_records_every_mutation_in_order() {
  let s = seeded().await;
  s.update_comment("alice".into(), 2, "edited".into()).await.unwrap();
  s.delete_comment("alice".into(), 2).await.unwrap();
  s.restore_comment("alice".into(), 2).await.unwrap();

  let entries = s.query_history(HistoryQuery::for_actor("alice")).await.unwrap();
  let actions: Vec<_> = entries.iter().map(|e| e.action).collect();
  assert_eq!(actions, vec![
    AuditAction::Create,
    AuditAction::Update,
    AuditAction::Delete,
    AuditAction::Restore,
  ]);
  assert!(entries.iter().all(|e| e.entity_id == 2 && e.actor == "alice"));
  assert_eq!(entries[2].text.as_deref(), Some("edited"));
  assert!(entries.windows(2).all(|w| w[0].at <= w[1].at));
}

#[tokio::test]
async fn posts_are_not_audited() {
  let s = store().await;
  s.create_post("alice".into(), "p".into()).await.unwrap();
  assert!(matches!(
    core(s.query_history(HistoryQuery::for_actor("alice")).await.unwrap_err()),
    CoreError::NotFound(_)
  ));
}

#[tokio::test]
async fn history_is_filtered_by_actor_and_date() {
  let s = seeded().await;
  s.create_comment("bob".into(), "bob's".into(), 1).await.unwrap();

  let today = Utc::now().date_naive();
  let yesterday = today - Days::new(1);
  let tomorrow = today + Days::new(1);

  let around = HistoryQuery {
    start_date: Some(yesterday),
    end_date: Some(tomorrow),
    ..HistoryQuery::for_actor("bob")
  };
  let entries = s.query_history(around).await.unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0].entity_id, 3);

  let future = HistoryQuery { start_date: Some(tomorrow), ..HistoryQuery::for_actor("bob") };
  assert!(matches!(
    core(s.query_history(future).await.unwrap_err()),
    CoreError::NotFound(_)
  ));

  let past = HistoryQuery { end_date: Some(yesterday), ..HistoryQuery::for_actor("bob") };
  assert!(matches!(
    core(s.query_history(past).await.unwrap_err()),
    CoreError::NotFound(_)
  ));
}

#[tokio::test]
async fn history_is_filtered_by_subtree() {
  let s = seeded().await;
  s.create_post("alice".into(), "second post".into()).await.unwrap();
  s.create_comment("alice".into(), "under 3".into(), 3).await.unwrap();
  s.create_comment("alice".into(), "under 2".into(), 2).await.unwrap();

  let under_first = HistoryQuery { root_entity_id: Some(1), ..HistoryQuery::for_actor("alice") };
  let ids: Vec<_> = s
    .query_history(under_first)
    .await
    .unwrap()
    .into_iter()
    .map(|e| e.entity_id)
    .collect();
  assert_eq!(ids, vec![2, 5]);

  let under_comment = HistoryQuery { root_entity_id: Some(2), ..HistoryQuery::for_actor("alice") };
  let ids: Vec<_> = s
    .query_history(under_comment)
    .await
    .unwrap()
    .into_iter()
    .map(|e| e.entity_id)
    .collect();
  assert_eq!(ids, vec![2, 5]);
}

#[tokio::test]
async fn every_history_query_leaves_a_search_record() {
  let s = seeded().await;
  let today = Utc::now().date_naive();

  s.query_history(HistoryQuery::for_actor("alice")).await.unwrap();
  let empty = HistoryQuery {
    end_date: Some(today),
    root_entity_id: Some(99),
    ..HistoryQuery::for_actor("alice")
  };
  assert!(s.query_history(empty).await.is_err());

  let searches = s.list_searches("alice".into()).await.unwrap();
  assert_eq!(searches.len(), 2);
  assert_eq!(searches[0].user, "alice");
  assert_eq!(searches[0].root_entity_id, None);
  assert_eq!(searches[1].root_entity_id, Some(99));
  assert_eq!(searches[1].end_date, Some(today));
  assert_eq!(searches[1].start_date, None);

  assert!(matches!(
    core(s.list_searches("bob".into()).await.unwrap_err()),
    CoreError::NotFound(_)
  ));
}

#[tokio::test]
async fn replay_reissues_the_recorded_query() {
  let s = seeded().await;
  s.create_post("alice".into(), "second post".into()).await.unwrap();
  s.create_comment("alice".into(), "under 3".into(), 3).await.unwrap();

  let scoped = HistoryQuery { root_entity_id: Some(3), ..HistoryQuery::for_actor("alice") };
  s.query_history(scoped).await.unwrap();
  let search_id = s.list_searches("alice".into()).await.unwrap()[0].search_id;

  // Activity after the original search shows up in the replay.
  s.create_comment("alice".into(), "later".into(), 4).await.unwrap();
  let replayed = s.replay_search("alice".into(), search_id).await.unwrap();
  assert_eq!(replayed.iter().map(|e| e.entity_id).collect::<Vec<_>>(), vec![4, 5]);

  // The replay is itself a search.
  assert_eq!(s.list_searches("alice".into()).await.unwrap().len(), 2);

  // Other users cannot replay it.
  assert!(matches!(
    core(s.replay_search("bob".into(), search_id).await.unwrap_err()),
    CoreError::NotFound(_)
  ));
}

#[tokio::test]
async fn audit_log_is_append_only() {
  let s = seeded().await;
  assert!(s.execute_raw("UPDATE audit_log SET actor = 'mallory'").await.is_err());
  assert!(s.execute_raw("DELETE FROM audit_log").await.is_err());

  let entries = s.query_history(HistoryQuery::for_actor("alice")).await.unwrap();
  assert_eq!(entries.len(), 1);
}

// ─── Persistence and concurrency ─────────────────────────────────────────────

/// A fresh directory for one test's database files.
fn scratch_dir(name: &str) -> PathBuf {
  let dir = std::env::temp_dir().join(format!("arbor-store-{}-{name}", std::process::id()));
  let _ = std::fs::remove_dir_all(&dir);
  std::fs::create_dir_all(&dir).unwrap();
  dir
}

/// Two stores on one database file, each with its own connection thread.
async fn shared_pair(dir: &Path, busy_timeout_ms: u64) -> (SqliteStore, SqliteStore) {
  let config = StoreConfig {
    path: dir.join("shared.db"),
    busy_timeout_ms,
    create_attempts: 50,
  };
  let first = SqliteStore::open(&config).await.unwrap();
  let second = SqliteStore::open(&config).await.unwrap();
  (first, second)
}

#[tokio::test]
async fn reopening_a_file_keeps_data() {
  let dir = scratch_dir("reopen");
  let config = StoreConfig { path: dir.join("reopen.db"), ..Default::default() };

  {
    let s = SqliteStore::open(&config).await.unwrap();
    s.create_post("alice".into(), "kept".into()).await.unwrap();
  }

  let s = SqliteStore::open(&config).await.unwrap();
  assert_eq!(s.get_post(1).await.unwrap().text, "kept");
  let post = s.create_post("alice".into(), "next".into()).await.unwrap();
  assert_eq!(post.id, 2);

  drop(s);
  let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn concurrent_creates_under_one_parent_all_land() {
  let dir = scratch_dir("concurrent-creates");
  // No busy wait: contended creates go through the retry loop.
  let (a, b) = shared_pair(&dir, 0).await;
  a.create_post("alice".into(), "busy thread".into()).await.unwrap();

  for n in 0..50 {
    let (left, right) = tokio::join!(
      a.create_comment("alice".into(), format!("a{n}"), 1),
      b.create_comment("bob".into(), format!("b{n}"), 1),
    );
    left.unwrap();
    right.unwrap();
  }

  let children = a.descendants_of(1, false).await.unwrap();
  assert_eq!(children.len(), 100);
  for id in children {
    assert_eq!(b.ancestors_of(id, false).await.unwrap(), vec![1]);
    assert_eq!(b.descendants_of(id, true).await.unwrap(), vec![id]);
  }

  drop((a, b));
  let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn stamps_follow_commit_order_across_connections() {
  let dir = scratch_dir("commit-order");
  let (a, b) = shared_pair(&dir, 5_000).await;
  a.create_post("alice".into(), "p".into()).await.unwrap();
  a.create_comment("alice".into(), "v0".into(), 1).await.unwrap();

  for n in 0..25 {
    let (left, right) = tokio::join!(
      a.update_comment("alice".into(), 2, format!("a{n}")),
      b.update_comment("alice".into(), 2, format!("b{n}")),
    );
    left.unwrap();
    right.unwrap();
  }

  // History is ordered by stamp; commit order is audit id order.
  let entries = a.query_history(HistoryQuery::for_actor("alice")).await.unwrap();
  assert_eq!(entries.len(), 51);
  assert!(entries.windows(2).all(|w| w[0].audit_id < w[1].audit_id));

  let last = entries.last().unwrap();
  let comment = b.get_comment(2).await.unwrap();
  assert_eq!(comment.last_modified_at, last.at);
  assert_eq!(comment.text, last.text);

  drop((a, b));
  let _ = std::fs::remove_dir_all(&dir);
}

//! Rebuilding nested trees from flat, unordered parent-tagged rows.
//!
//! Assembly runs in two passes: every item is indexed by id, then attached to
//! its parent's child list. Items whose parent is absent from the input are
//! roots. Sorting the child lists dominates, so the whole thing is
//! `O(n log n)`.

use std::collections::HashMap;

use serde::Serialize;

use crate::{Error, Result, entity::EntityId};

/// Anything that knows its own id and the id of its parent.
pub trait TreeItem {
  fn id(&self) -> EntityId;

  fn parent_id(&self) -> Option<EntityId>;
}

/// An item together with its assembled sub-tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode<T> {
  #[serde(flatten)]
  pub item:     T,
  pub children: Vec<TreeNode<T>>,
}

/// Nest `items` by parent, ordering siblings (and roots) by ascending id.
pub fn assemble<T: TreeItem>(items: Vec<T>) -> Result<Vec<TreeNode<T>>> {
  assemble_by_key(items, |item: &T| item.id())
}

/// Nest `items` by parent, ordering siblings (and roots) by `key`.
///
/// The input must form a forest. Two items with the same id, or a parent
/// chain that loops back on itself, yield [`Error::MalformedTree`].
pub fn assemble_by_key<T, K, F>(
  items: Vec<T>,
  key: F,
) -> Result<Vec<TreeNode<T>>>
where
  T: TreeItem,
  K: Ord,
  F: Fn(&T) -> K,
{
  let count = items.len();

  let mut index: HashMap<EntityId, usize> = HashMap::with_capacity(count);
  for (pos, item) in items.iter().enumerate() {
    if index.insert(item.id(), pos).is_some() {
      return Err(Error::MalformedTree(format!("duplicate id {}", item.id())));
    }
  }

  let mut roots: Vec<usize> = Vec::new();
  let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
  for (pos, item) in items.iter().enumerate() {
    match item.parent_id().and_then(|p| index.get(&p)) {
      Some(&parent) => children[parent].push(pos),
      None => roots.push(pos),
    }
  }

  let keys: Vec<K> = items.iter().map(&key).collect();
  roots.sort_by(|a, b| keys[*a].cmp(&keys[*b]));
  for siblings in &mut children {
    siblings.sort_by(|a, b| keys[*a].cmp(&keys[*b]));
  }

  // Pre-order walk from the roots. Every item sits in exactly one child
  // list, so nothing is visited twice; items on a cycle are never reached.
  let mut order: Vec<usize> = Vec::with_capacity(count);
  let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
  while let Some(pos) = stack.pop() {
    order.push(pos);
    stack.extend(children[pos].iter().rev().copied());
  }

  if order.len() != count {
    return Err(Error::MalformedTree(format!(
      "{} item(s) are not reachable from any root",
      count - order.len()
    )));
  }

  // Children come after their parent in pre-order, so walking it backwards
  // builds every sub-tree before the node that owns it.
  let mut pending: Vec<Option<T>> = items.into_iter().map(Some).collect();
  let mut built: Vec<Option<TreeNode<T>>> = (0..count).map(|_| None).collect();
  for &pos in order.iter().rev() {
    let item = pending[pos].take().ok_or_else(|| revisited(pos))?;
    let nested = children[pos]
      .iter()
      .map(|&child| built[child].take().ok_or_else(|| revisited(child)))
      .collect::<Result<Vec<_>>>()?;
    built[pos] = Some(TreeNode { item, children: nested });
  }

  roots
    .iter()
    .map(|&root| built[root].take().ok_or_else(|| revisited(root)))
    .collect()
}

fn revisited(pos: usize) -> Error {
  Error::MalformedTree(format!("item at position {pos} attached twice"))
}

/// Pre-order traversal of an assembled forest.
pub fn flatten<T>(forest: &[TreeNode<T>]) -> Vec<&T> {
  let mut out = Vec::new();
  let mut stack: Vec<&TreeNode<T>> = forest.iter().rev().collect();
  while let Some(node) = stack.pop() {
    out.push(&node.item);
    stack.extend(node.children.iter().rev());
  }
  out
}

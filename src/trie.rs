use std::fmt::Debug;

use anyhow::Result;
use log::trace;

use crate::{
    cursor::{Cursor, Decision},
    error::TrieError,
    iterators::{Iter, Keys, Values},
    key::KeyAnalyzer,
};

/// A node is either a stored entry or a branch at the bit index where two
/// subtrees diverge. Below a branch at bit `b`, every key in `left` has bit
/// `b` = 0 and every key in `right` has bit `b` = 1, and branch bit indices
/// strictly increase along any root-to-leaf path.
pub(crate) enum Node<K, V> {
    Leaf {
        key: K,
        value: V,
    },
    Branch {
        bit: usize,
        left: Box<Node<K, V>>,
        right: Box<Node<K, V>>,
    },
}

/// A PATRICIA trie: an ordered map over bit-addressable keys.
///
/// Keys are opaque to the trie; all bit extraction and comparison goes
/// through the [`KeyAnalyzer`] supplied at construction. Entries iterate in
/// ascending lexicographic key order, prefix ranges are available as live
/// views, and [`select`](Self::select) finds the entry nearest to a query
/// under the bitwise xor metric.
///
/// The structure assumes a single logical writer and does no internal
/// locking; iterators and prefix views are live projections of the current
/// tree, not snapshots.
///
/// ```
/// use bittrie::{PatriciaTrie, StrKeyAnalyzer};
///
/// let mut trie = PatriciaTrie::new(StrKeyAnalyzer);
/// trie.insert("Lime".to_string(), 1).unwrap();
/// trie.insert("LimeWire".to_string(), 2).unwrap();
/// assert_eq!(trie.get(&"Lime".to_string()).unwrap(), Some(&1));
/// assert_eq!(trie.first_key(), Some(&"Lime".to_string()));
/// ```
pub struct PatriciaTrie<K, V, A> {
    pub(crate) root: Option<Box<Node<K, V>>>,
    pub(crate) len: usize,
    pub(crate) analyzer: A,
}

impl<K, V, A: KeyAnalyzer<K>> PatriciaTrie<K, V, A> {
    /// An empty trie using `analyzer` for bit access and comparison.
    pub fn new(analyzer: A) -> Self {
        Self {
            root: None,
            len: 0,
            analyzer,
        }
    }

    /// The analyzer this trie was built with.
    pub fn analyzer(&self) -> &A {
        &self.analyzer
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    pub(crate) fn check_key(&self, key: &K) -> Result<()> {
        if self.analyzer.accepts(key) {
            Ok(())
        } else {
            Err(TrieError::InvalidKey("key shape not accepted by the analyzer").into())
        }
    }

    /// Inserts `key -> value`, returning the previous value if the key was
    /// already present.
    ///
    /// Two keys with the same zero-extended bit pattern denote the same
    /// slot, so re-inserting replaces the value without changing the
    /// structure. Fails with [`TrieError::InvalidKey`] if the analyzer does
    /// not accept the key; the tree is unchanged on failure.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        self.check_key(&key)?;
        let Some(mut root) = self.root.take() else {
            self.root = Some(Box::new(Node::Leaf { key, value }));
            self.len = 1;
            return Ok(None);
        };
        // find the bit where the key diverges from its closest neighbor
        let diff = {
            let mut cur: &Node<K, V> = &root;
            loop {
                match cur {
                    Node::Branch { bit, left, right } => {
                        cur = if self.analyzer.is_bit_set(&key, *bit) {
                            right.as_ref()
                        } else {
                            left.as_ref()
                        };
                    }
                    Node::Leaf { key: found, .. } => break self.analyzer.bit_index(&key, found),
                }
            }
        };
        match diff {
            None => {
                let old = replace_value(&mut root, &key, value, &self.analyzer);
                self.root = Some(root);
                Ok(Some(old))
            }
            Some(diff) => {
                trace!("inserting new branch at bit {}", diff);
                self.root = Some(insert_apart(root, key, value, diff, &self.analyzer));
                self.len += 1;
                Ok(None)
            }
        }
    }

    /// Descends to the leaf the query's bits lead to, without verifying a
    /// match. On a non-empty trie this is the xor-nearest entry.
    fn nearest(&self, key: &K) -> Option<(&K, &V)> {
        let mut cur: &Node<K, V> = self.root.as_deref()?;
        loop {
            match cur {
                Node::Branch { bit, left, right } => {
                    cur = if self.analyzer.is_bit_set(key, *bit) {
                        right.as_ref()
                    } else {
                        left.as_ref()
                    };
                }
                Node::Leaf { key: found, value } => return Some((found, value)),
            }
        }
    }

    pub fn get(&self, key: &K) -> Result<Option<&V>> {
        self.check_key(key)?;
        Ok(self.nearest(key).and_then(|(found, value)| {
            if self.analyzer.bit_index(key, found).is_none() {
                Some(value)
            } else {
                None
            }
        }))
    }

    pub fn get_mut(&mut self, key: &K) -> Result<Option<&mut V>> {
        self.check_key(key)?;
        let analyzer = &self.analyzer;
        let Some(root) = self.root.as_deref_mut() else {
            return Ok(None);
        };
        let mut cur: &mut Node<K, V> = root;
        loop {
            match cur {
                Node::Branch { bit, left, right } => {
                    cur = if analyzer.is_bit_set(key, *bit) {
                        right.as_mut()
                    } else {
                        left.as_mut()
                    };
                }
                Node::Leaf { key: found, value } => {
                    return Ok(if analyzer.bit_index(key, found).is_none() {
                        Some(value)
                    } else {
                        None
                    })
                }
            }
        }
    }

    pub fn contains_key(&self, key: &K) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Removes the entry for `key`, splicing its sibling subtree into the
    /// vacated branch position, and returns the removed value.
    pub fn remove(&mut self, key: &K) -> Result<Option<V>> {
        self.check_key(key)?;
        let Some(root) = self.root.take() else {
            return Ok(None);
        };
        let (root, removed) = remove_rec(root, key, &self.analyzer);
        self.root = root;
        if removed.is_some() {
            trace!("removed leaf, sibling spliced up");
            self.len -= 1;
        }
        Ok(removed.map(|(_, v)| v))
    }

    /// The lexicographically smallest key.
    pub fn first_key(&self) -> Option<&K> {
        self.root.as_deref().map(|node| leftmost(node).0)
    }

    /// The lexicographically largest key.
    pub fn last_key(&self) -> Option<&K> {
        self.root.as_deref().map(|node| rightmost(node).0)
    }

    /// Iterates all entries in ascending lexicographic key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.root.as_deref())
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    /// The entry whose key is closest to `key` in the bitwise xor metric.
    ///
    /// This is not lexicographic closeness: descending toward the query's
    /// own bits greedily minimizes the high-order bit differences, which
    /// dominate the xor distance. Distinct stored keys are never at equal
    /// distance from a query (their zero-extended patterns differ), so no
    /// tie-breaking arises. Returns `None` on an empty trie.
    pub fn select(&self, key: &K) -> Result<Option<(&K, &V)>> {
        self.check_key(key)?;
        Ok(self.nearest(key))
    }

    /// Visits every entry in order of increasing xor distance from `key`,
    /// handing each to `cursor`.
    ///
    /// Returns the entry the cursor exited on, or `None` if the scan ran to
    /// completion. [`Decision::Remove`] is a contract violation here: xor
    /// order cannot be resumed after an arbitrary removal, so the scan stops
    /// with [`TrieError::RemoveNotAllowed`] and the tree is left unchanged.
    /// [`Decision::RemoveAndExit`] is supported and returns the removed pair.
    pub fn select_with<C>(&mut self, key: &K, cursor: &mut C) -> Result<Option<(K, V)>>
    where
        C: Cursor<K, V>,
        K: Clone,
        V: Clone,
    {
        self.check_key(key)?;
        let Some(root) = self.root.take() else {
            return Ok(None);
        };
        let mut removed = 0;
        let (root, flow) = walk_xor(root, key, &self.analyzer, cursor, &mut removed);
        self.root = root;
        self.len -= removed;
        match flow {
            Flow::Scanning => Ok(None),
            Flow::Exited(key, value) | Flow::Removed(key, value) => Ok(Some((key, value))),
            Flow::Failed(e) => Err(e),
        }
    }

    /// Walks all entries in lexicographic order, handing each to `cursor`.
    ///
    /// All four [`Decision`] values are legal: `Remove` deletes the current
    /// entry and resumes at its successor. Returns the entry the cursor
    /// exited on, or `None` if the walk ran to completion.
    pub fn traverse<C>(&mut self, cursor: &mut C) -> Option<(K, V)>
    where
        C: Cursor<K, V>,
        K: Clone,
        V: Clone,
    {
        let root = self.root.take()?;
        let mut removed = 0;
        let (root, flow) = walk_lex(root, cursor, &mut removed);
        self.root = root;
        self.len -= removed;
        match flow {
            Flow::Scanning => None,
            Flow::Exited(key, value) | Flow::Removed(key, value) => Some((key, value)),
            Flow::Failed(_) => unreachable!("lexicographic walk cannot fail"),
        }
    }

    /// Prints the tree structure to stdout, for debugging.
    pub fn dump(&self)
    where
        K: Debug,
        V: Debug,
    {
        fn dump0<K: Debug, V: Debug>(node: &Node<K, V>, indent: usize) {
            match node {
                Node::Leaf { key, value } => {
                    println!("{}{:?}: {:?}", "  ".repeat(indent), key, value)
                }
                Node::Branch { bit, left, right } => {
                    println!("{}bit {}", "  ".repeat(indent), bit);
                    dump0(left, indent + 1);
                    dump0(right, indent + 1);
                }
            }
        }
        match &self.root {
            Some(root) => dump0(root, 0),
            None => println!("(empty)"),
        }
    }
}

/// The leftmost leaf below `node`.
pub(crate) fn leftmost<K, V>(mut node: &Node<K, V>) -> (&K, &V) {
    loop {
        match node {
            Node::Branch { left, .. } => node = left.as_ref(),
            Node::Leaf { key, value } => return (key, value),
        }
    }
}

/// The rightmost leaf below `node`.
pub(crate) fn rightmost<K, V>(mut node: &Node<K, V>) -> (&K, &V) {
    loop {
        match node {
            Node::Branch { right, .. } => node = right.as_ref(),
            Node::Leaf { key, value } => return (key, value),
        }
    }
}

/// Replaces the value at the leaf the key's bits lead to. Only called once
/// the key is known to be present.
fn replace_value<K, V, A: KeyAnalyzer<K>>(node: &mut Node<K, V>, key: &K, value: V, analyzer: &A) -> V {
    match node {
        Node::Branch { bit, left, right } => {
            if analyzer.is_bit_set(key, *bit) {
                replace_value(right, key, value, analyzer)
            } else {
                replace_value(left, key, value, analyzer)
            }
        }
        Node::Leaf { value: slot, .. } => std::mem::replace(slot, value),
    }
}

/// Inserts a leaf that diverges from everything below `node` at bit `diff`.
///
/// Descends while the branch bit is still above the divergence point, then
/// splits: the new branch at `diff` gets the new leaf on the side of the
/// key's bit and the old subtree on the other. A branch at exactly `diff`
/// cannot exist on this path, because the representative leaf found along
/// the key's own bits would then agree with the key at `diff`.
fn insert_apart<K, V, A: KeyAnalyzer<K>>(
    node: Box<Node<K, V>>,
    key: K,
    value: V,
    diff: usize,
    analyzer: &A,
) -> Box<Node<K, V>> {
    match *node {
        Node::Branch { bit, left, right } if bit < diff => {
            if analyzer.is_bit_set(&key, bit) {
                Box::new(Node::Branch {
                    bit,
                    left,
                    right: insert_apart(right, key, value, diff, analyzer),
                })
            } else {
                Box::new(Node::Branch {
                    bit,
                    left: insert_apart(left, key, value, diff, analyzer),
                    right,
                })
            }
        }
        old => {
            let bit_set = analyzer.is_bit_set(&key, diff);
            let leaf = Box::new(Node::Leaf { key, value });
            let old = Box::new(old);
            if bit_set {
                Box::new(Node::Branch {
                    bit: diff,
                    left: old,
                    right: leaf,
                })
            } else {
                Box::new(Node::Branch {
                    bit: diff,
                    left: leaf,
                    right: old,
                })
            }
        }
    }
}

/// Removes the leaf matching `key`, if any, returning the remaining subtree
/// and the removed entry. A branch whose child was removed collapses to the
/// sibling, which keeps branch bit indices strictly increasing.
fn remove_rec<K, V, A: KeyAnalyzer<K>>(
    node: Box<Node<K, V>>,
    key: &K,
    analyzer: &A,
) -> (Option<Box<Node<K, V>>>, Option<(K, V)>) {
    match *node {
        Node::Leaf { key: found, value } => {
            if analyzer.bit_index(key, &found).is_none() {
                (None, Some((found, value)))
            } else {
                (Some(Box::new(Node::Leaf { key: found, value })), None)
            }
        }
        Node::Branch { bit, left, right } => {
            if analyzer.is_bit_set(key, bit) {
                let (right, removed) = remove_rec(right, key, analyzer);
                (join(bit, Some(left), right), removed)
            } else {
                let (left, removed) = remove_rec(left, key, analyzer);
                (join(bit, left, Some(right)), removed)
            }
        }
    }
}

/// Reassembles a branch from what is left of its children.
fn join<K, V>(
    bit: usize,
    left: Option<Box<Node<K, V>>>,
    right: Option<Box<Node<K, V>>>,
) -> Option<Box<Node<K, V>>> {
    match (left, right) {
        (Some(left), Some(right)) => Some(Box::new(Node::Branch { bit, left, right })),
        (Some(only), None) | (None, Some(only)) => Some(only),
        (None, None) => None,
    }
}

/// State of a cursor-driven walk.
enum Flow<K, V> {
    Scanning,
    /// The cursor exited on this entry; the entry itself stays in the tree.
    Exited(K, V),
    /// The cursor removed this entry and exited; the pair is handed back.
    Removed(K, V),
    Failed(anyhow::Error),
}

impl<K, V> Flow<K, V> {
    fn is_scanning(&self) -> bool {
        matches!(self, Flow::Scanning)
    }
}

/// In-order walk with in-traversal removal. Consumes the subtree and returns
/// what is left of it, so the tree is valid on every return path.
fn walk_lex<K: Clone, V: Clone, C: Cursor<K, V>>(
    node: Box<Node<K, V>>,
    cursor: &mut C,
    removed: &mut usize,
) -> (Option<Box<Node<K, V>>>, Flow<K, V>) {
    match *node {
        Node::Leaf { key, value } => match cursor.select(&key, &value) {
            Decision::Continue => (Some(Box::new(Node::Leaf { key, value })), Flow::Scanning),
            Decision::Exit => {
                let entry = (key.clone(), value.clone());
                (
                    Some(Box::new(Node::Leaf { key, value })),
                    Flow::Exited(entry.0, entry.1),
                )
            }
            Decision::Remove => {
                *removed += 1;
                (None, Flow::Scanning)
            }
            Decision::RemoveAndExit => {
                *removed += 1;
                (None, Flow::Removed(key, value))
            }
        },
        Node::Branch { bit, left, right } => {
            let (left, flow) = walk_lex(left, cursor, removed);
            if !flow.is_scanning() {
                return (join(bit, left, Some(right)), flow);
            }
            let (right, flow) = walk_lex(right, cursor, removed);
            (join(bit, left, right), flow)
        }
    }
}

/// Like [`walk_lex`], but at every branch the child matching the query's bit
/// is visited first, which yields entries in strictly increasing xor
/// distance from the query. `Remove` is rejected here: the scan order is
/// derived from the query's bits, not from the structure, and cannot be
/// re-derived after an arbitrary removal.
fn walk_xor<K: Clone, V: Clone, A: KeyAnalyzer<K>, C: Cursor<K, V>>(
    node: Box<Node<K, V>>,
    key: &K,
    analyzer: &A,
    cursor: &mut C,
    removed: &mut usize,
) -> (Option<Box<Node<K, V>>>, Flow<K, V>) {
    match *node {
        Node::Leaf { key: found, value } => match cursor.select(&found, &value) {
            Decision::Continue => (
                Some(Box::new(Node::Leaf { key: found, value })),
                Flow::Scanning,
            ),
            Decision::Exit => {
                let entry = (found.clone(), value.clone());
                (
                    Some(Box::new(Node::Leaf { key: found, value })),
                    Flow::Exited(entry.0, entry.1),
                )
            }
            Decision::Remove => (
                Some(Box::new(Node::Leaf { key: found, value })),
                Flow::Failed(TrieError::RemoveNotAllowed.into()),
            ),
            Decision::RemoveAndExit => {
                *removed += 1;
                (None, Flow::Removed(found, value))
            }
        },
        Node::Branch { bit, left, right } => {
            if analyzer.is_bit_set(key, bit) {
                let (right, flow) = walk_xor(right, key, analyzer, cursor, removed);
                if !flow.is_scanning() {
                    return (join(bit, Some(left), right), flow);
                }
                let (left, flow) = walk_xor(left, key, analyzer, cursor, removed);
                (join(bit, left, right), flow)
            } else {
                let (left, flow) = walk_xor(left, key, analyzer, cursor, removed);
                if !flow.is_scanning() {
                    return (join(bit, left, Some(right)), flow);
                }
                let (right, flow) = walk_xor(right, key, analyzer, cursor, removed);
                (join(bit, left, right), flow)
            }
        }
    }
}

impl<K: Debug, V: Debug, A> Debug for PatriciaTrie<K, V, A>
where
    A: KeyAnalyzer<K>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, A: KeyAnalyzer<K> + Default> Default for PatriciaTrie<K, V, A> {
    fn default() -> Self {
        Self::new(A::default())
    }
}

impl<K, V, A: KeyAnalyzer<K> + Default> FromIterator<(K, V)> for PatriciaTrie<K, V, A> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::new(A::default()), |mut trie, (key, value)| {
                trie.insert(key, value).unwrap();
                trie
            })
    }
}

impl<K, V, A: KeyAnalyzer<K>> Extend<(K, V)> for PatriciaTrie<K, V, A> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value).unwrap();
        }
    }
}

/// Builds a trie from `key => value` entries; the analyzer is the `Default`
/// one for the inferred key type.
///
/// ```
/// use bittrie::{trie, PatriciaTrie, StrKeyAnalyzer};
///
/// let t: PatriciaTrie<String, u32, StrKeyAnalyzer> = trie! {
///     "a" => 1,
///     "b" => 2,
/// };
/// assert_eq!(t.len(), 2);
/// ```
#[macro_export]
macro_rules! trie {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut trie = $crate::PatriciaTrie::new(Default::default());
        $(
            trie.insert($key.into(), $value).unwrap();
        )*
        trie
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StrKeyAnalyzer;

    /// Checks the structural invariants directly: branch bit indices grow
    /// strictly along every root-to-leaf path, every leaf agrees with the
    /// branch bits above it, and the leaf count matches `len`.
    fn check_invariants<K, V, A: KeyAnalyzer<K>>(trie: &PatriciaTrie<K, V, A>) {
        fn check0<K, V, A: KeyAnalyzer<K>>(
            node: &Node<K, V>,
            analyzer: &A,
            min_bit: usize,
            path: &mut Vec<(usize, bool)>,
        ) -> usize {
            match node {
                Node::Leaf { key, .. } => {
                    for (bit, set) in path.iter() {
                        assert_eq!(analyzer.is_bit_set(key, *bit), *set);
                    }
                    1
                }
                Node::Branch { bit, left, right } => {
                    assert!(*bit >= min_bit, "branch bits must increase");
                    path.push((*bit, false));
                    let l = check0(left, analyzer, bit + 1, path);
                    path.pop();
                    path.push((*bit, true));
                    let r = check0(right, analyzer, bit + 1, path);
                    path.pop();
                    l + r
                }
            }
        }
        let count = match &trie.root {
            Some(root) => check0(root, &trie.analyzer, 0, &mut Vec::new()),
            None => 0,
        };
        assert_eq!(count, trie.len);
    }

    #[test]
    fn invariants_hold_under_churn() {
        let words = [
            "a", "ab", "abc", "b", "ba", "bab", "c", "ca", "cab", "abd", "abe",
        ];
        let mut trie = PatriciaTrie::new(StrKeyAnalyzer);
        for (i, w) in words.iter().enumerate() {
            trie.insert(w.to_string(), i).unwrap();
            check_invariants(&trie);
        }
        for w in ["ab", "c", "a"] {
            assert!(trie.remove(&w.to_string()).unwrap().is_some());
            check_invariants(&trie);
        }
        trie.traverse(&mut |k: &String, _: &usize| {
            if k.len() == 2 {
                Decision::Remove
            } else {
                Decision::Continue
            }
        });
        check_invariants(&trie);
        assert!(trie.keys().all(|k| k.len() != 2));
    }

    #[test]
    fn basic_ops() {
        let mut trie = PatriciaTrie::new(StrKeyAnalyzer);
        assert_eq!(trie.insert("one".to_string(), 1).unwrap(), None);
        assert_eq!(trie.insert("two".to_string(), 2).unwrap(), None);
        assert_eq!(trie.insert("one".to_string(), 11).unwrap(), Some(1));
        assert_eq!(trie.len(), 2);
        assert_eq!(trie.get(&"one".to_string()).unwrap(), Some(&11));
        *trie.get_mut(&"two".to_string()).unwrap().unwrap() += 20;
        assert_eq!(trie.get(&"two".to_string()).unwrap(), Some(&22));
        assert!(trie.contains_key(&"two".to_string()).unwrap());
        assert!(!trie.contains_key(&"three".to_string()).unwrap());
        assert_eq!(trie.remove(&"one".to_string()).unwrap(), Some(11));
        assert_eq!(trie.remove(&"one".to_string()).unwrap(), None);
        assert_eq!(trie.len(), 1);
        trie.clear();
        assert!(trie.is_empty());
    }

    #[test]
    fn into_iter_yields_sorted_owned_entries() {
        let mut trie = PatriciaTrie::new(StrKeyAnalyzer);
        trie.extend([("b".to_string(), 2), ("a".to_string(), 1)]);
        let entries: Vec<(String, i32)> = trie.into_iter().collect();
        assert_eq!(entries, [("a".to_string(), 1), ("b".to_string(), 2)]);
    }
}

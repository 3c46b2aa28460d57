/// What a [`Cursor`] tells a traversal to do after looking at an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Look at the next entry.
    Continue,
    /// Stop, returning the current entry.
    Exit,
    /// Remove the current entry and continue with its successor.
    ///
    /// Not supported inside the xor-order scan of
    /// [`PatriciaTrie::select_with`](crate::PatriciaTrie::select_with).
    Remove,
    /// Remove the current entry, then stop and return the removed pair.
    RemoveAndExit,
}

/// Caller-supplied callback driving a traversal.
///
/// The trie hands each visited entry to `select` and interprets the returned
/// [`Decision`]; traversal is a two-state machine (scanning / exited) whose
/// transition is a pure function of that return value.
///
/// Any `FnMut(&K, &V) -> Decision` is a cursor:
///
/// ```
/// use bittrie::{Decision, PatriciaTrie, StrKeyAnalyzer};
///
/// let mut trie = PatriciaTrie::new(StrKeyAnalyzer);
/// trie.insert("a".to_string(), 1).unwrap();
/// trie.insert("b".to_string(), 2).unwrap();
/// let hit = trie.traverse(&mut |_k: &String, v: &i32| {
///     if *v == 2 { Decision::Exit } else { Decision::Continue }
/// });
/// assert_eq!(hit, Some(("b".to_string(), 2)));
/// ```
pub trait Cursor<K, V> {
    /// Notification that the traversal is currently looking at `(key, value)`.
    fn select(&mut self, key: &K, value: &V) -> Decision;
}

impl<K, V, F: FnMut(&K, &V) -> Decision> Cursor<K, V> for F {
    fn select(&mut self, key: &K, value: &V) -> Decision {
        self(key, value)
    }
}

use std::fmt::Debug;

use anyhow::Result;

use crate::{
    error::TrieError,
    iterators::{Iter, Keys, Values},
    key::KeyAnalyzer,
    trie::{leftmost, rightmost, Node},
    PatriciaTrie,
};

impl<K, V, A: KeyAnalyzer<K>> PatriciaTrie<K, V, A> {
    /// A live view of all entries prefixed by the whole of `key`.
    ///
    /// On a fixed-length-key trie this selects at most the exact key.
    pub fn prefixed_by(&mut self, key: K) -> Result<PrefixView<'_, K, V, A>> {
        self.check_key(&key)?;
        let bits = self.analyzer.bit_length(&key);
        Ok(PrefixView {
            trie: self,
            key,
            offset: 0,
            bits,
        })
    }

    /// A live view of all entries prefixed by the first `length` elements
    /// (characters, bytes, ...) of `key`.
    ///
    /// Not supported on fixed-length-key tries unless `length` spans the
    /// whole key; use [`prefixed_by_bits`](Self::prefixed_by_bits) for
    /// partial lookups there.
    pub fn prefixed_by_len(&mut self, key: K, length: usize) -> Result<PrefixView<'_, K, V, A>> {
        self.prefixed_by_offset(key, 0, length)
    }

    /// A live view of all entries prefixed by the `length` elements of `key`
    /// starting at element `offset`.
    ///
    /// Not supported on fixed-length-key tries unless the range spans the
    /// whole key.
    pub fn prefixed_by_offset(
        &mut self,
        key: K,
        offset: usize,
        length: usize,
    ) -> Result<PrefixView<'_, K, V, A>> {
        self.check_key(&key)?;
        let per = self.analyzer.bits_per_element();
        let offset = offset * per;
        let bits = length * per;
        if let Some(fixed) = self.analyzer.fixed_bit_length() {
            if offset != 0 || bits != fixed {
                return Err(TrieError::Unsupported(
                    "element-granularity prefix views on a fixed-length-key trie",
                )
                .into());
            }
        }
        if offset + bits > self.analyzer.bit_length(&key) {
            return Err(TrieError::InvalidKey("prefix range exceeds the key length").into());
        }
        Ok(PrefixView {
            trie: self,
            key,
            offset,
            bits,
        })
    }

    /// A live view of all entries whose first `bit_length` bits equal those
    /// of `key`.
    ///
    /// This is the one prefix form fixed-length-key tries support for
    /// partial keys, e.g. all addresses sharing a 16-bit network prefix.
    pub fn prefixed_by_bits(&mut self, key: K, bit_length: usize) -> Result<PrefixView<'_, K, V, A>> {
        self.check_key(&key)?;
        if bit_length > self.analyzer.bit_length(&key) {
            return Err(TrieError::InvalidKey("prefix length exceeds the key length").into());
        }
        Ok(PrefixView {
            trie: self,
            key,
            offset: 0,
            bits: bit_length,
        })
    }
}

/// A live window over all entries sharing a key prefix.
///
/// Not a copy: reads see the current state of the underlying trie and writes
/// go straight through to it. The view borrows the trie mutably, so the
/// borrow checker rules out structural mutation of the trie from elsewhere
/// while a view is alive.
///
/// Inserting a key that does not carry the view's prefix fails with
/// [`TrieError::InvalidKey`]; `get`/`remove` with such a key are plain
/// misses.
pub struct PrefixView<'a, K, V, A> {
    trie: &'a mut PatriciaTrie<K, V, A>,
    key: K,
    /// First bit of the prefix within the reference key.
    offset: usize,
    /// Prefix length in bits.
    bits: usize,
}

impl<'a, K, V, A: KeyAnalyzer<K>> PrefixView<'a, K, V, A> {
    /// Whether the candidate's first bits equal the reference prefix, under
    /// zero extension.
    fn matches(&self, candidate: &K) -> bool {
        let analyzer = &self.trie.analyzer;
        (0..self.bits).all(|i| {
            analyzer.is_bit_set(candidate, i) == analyzer.is_bit_set(&self.key, self.offset + i)
        })
    }

    /// The subtree holding exactly the prefix set: descend along the
    /// reference bits while branches still diverge inside the prefix; the
    /// first node at or past the prefix boundary roots the whole set, since
    /// branch bits only grow on the way down. A representative leaf decides
    /// whether that subtree actually carries the prefix.
    fn subtrie(&self) -> Option<&Node<K, V>> {
        let analyzer = &self.trie.analyzer;
        let mut cur: &Node<K, V> = self.trie.root.as_deref()?;
        loop {
            match cur {
                Node::Branch { bit, left, right } if *bit < self.bits => {
                    cur = if analyzer.is_bit_set(&self.key, self.offset + *bit) {
                        right.as_ref()
                    } else {
                        left.as_ref()
                    };
                }
                _ => break,
            }
        }
        if self.matches(leftmost(cur).0) {
            Some(cur)
        } else {
            None
        }
    }

    /// Iterates the entries of the view in ascending lexicographic key
    /// order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.subtrie())
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    /// Number of entries currently in the view. Counted on demand.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.subtrie().is_none()
    }

    pub fn first_key(&self) -> Option<&K> {
        self.subtrie().map(|node| leftmost(node).0)
    }

    pub fn last_key(&self) -> Option<&K> {
        self.subtrie().map(|node| rightmost(node).0)
    }

    pub fn get(&self, key: &K) -> Result<Option<&V>> {
        if !self.matches(key) {
            return Ok(None);
        }
        self.trie.get(key)
    }

    pub fn contains_key(&self, key: &K) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Inserts through the view. The key must carry the view's prefix;
    /// anything else would make the projection inconsistent and is rejected
    /// without touching the trie.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        if !self.matches(&key) {
            return Err(TrieError::InvalidKey("key does not share the view prefix").into());
        }
        self.trie.insert(key, value)
    }

    /// Removes through the view; visible in the underlying trie.
    pub fn remove(&mut self, key: &K) -> Result<Option<V>> {
        if !self.matches(key) {
            return Ok(None);
        }
        self.trie.remove(key)
    }
}

impl<'a, K: Debug, V: Debug, A: KeyAnalyzer<K>> Debug for PrefixView<'a, K, V, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

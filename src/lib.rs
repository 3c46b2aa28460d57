//! A PATRICIA trie: an ordered key/value structure over bit-addressable
//! keys, with live prefix views and lookup under the bitwise xor metric.
//!
//! Keys are opaque to the trie itself; a [`KeyAnalyzer`] strategy supplied
//! at construction reads their length and individual bits. The crate ships
//! analyzers for strings, byte vectors, and fixed-width integers; anything
//! else only needs a `KeyAnalyzer` impl.
//!
//! Besides the usual sorted-map operations, the trie supports
//!
//! - prefix views ([`PatriciaTrie::prefixed_by`] and friends): live
//!   read/write windows over all entries sharing a key prefix, at element
//!   or bit granularity;
//! - xor-nearest lookup ([`PatriciaTrie::select`]): the entry closest to a
//!   query key by bitwise xor distance, as used in DHT routing tables;
//! - cursor-driven traversal ([`PatriciaTrie::traverse`],
//!   [`PatriciaTrie::select_with`]): a caller-supplied [`Cursor`] decides
//!   per entry whether to continue, stop, or delete.
//!
//! ```
//! use bittrie::{PatriciaTrie, StrKeyAnalyzer};
//!
//! let mut trie = PatriciaTrie::new(StrKeyAnalyzer);
//! for name in ["Lime", "LimeWire", "LimeRadio", "Lax"] {
//!     trie.insert(name.to_string(), name.len()).unwrap();
//! }
//!
//! let view = trie.prefixed_by("Lime".to_string()).unwrap();
//! let hits: Vec<&String> = view.keys().collect();
//! assert_eq!(hits, ["Lime", "LimeRadio", "LimeWire"]);
//! ```
//!
//! The trie assumes a single logical writer and does no internal locking;
//! embedding systems that need concurrent access must serialize mutations
//! externally.

mod cursor;
mod error;
mod iterators;
mod key;
mod trie;
mod view;

pub use cursor::{Cursor, Decision};
pub use error::TrieError;
pub use iterators::{IntoIter, Iter, Keys, Values};
pub use key::{ByteKeyAnalyzer, FixedKeyAnalyzer, KeyAnalyzer, StrKeyAnalyzer};
pub use trie::PatriciaTrie;
pub use view::PrefixView;


#[cfg(test)]
#[macro_use]
extern crate maplit;

use std::fmt;

/// Failure conditions of trie operations.
///
/// All of these are synchronous and local to the call that raised them. No
/// operation leaves the tree partially modified when it fails. Errors are
/// carried inside [`anyhow::Error`], so callers that care about the concrete
/// condition can downcast to this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrieError {
    /// The key is not accepted by the configured [`KeyAnalyzer`], or does not
    /// share the prefix of the view it was inserted through.
    ///
    /// [`KeyAnalyzer`]: crate::KeyAnalyzer
    InvalidKey(&'static str),
    /// The requested prefix boundary cannot be expressed on this trie,
    /// e.g. an element-granularity view on a fixed-length-key trie.
    Unsupported(&'static str),
    /// A cursor returned [`Decision::Remove`] inside the xor-order scan of
    /// [`PatriciaTrie::select_with`], which only supports `RemoveAndExit`.
    ///
    /// [`Decision::Remove`]: crate::Decision::Remove
    /// [`PatriciaTrie::select_with`]: crate::PatriciaTrie::select_with
    RemoveNotAllowed,
}

impl fmt::Display for TrieError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrieError::InvalidKey(msg) => write!(f, "invalid key: {}", msg),
            TrieError::Unsupported(msg) => write!(f, "unsupported operation: {}", msg),
            TrieError::RemoveNotAllowed => {
                write!(f, "Remove is not supported during an xor-order scan")
            }
        }
    }
}

impl std::error::Error for TrieError {}

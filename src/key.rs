use std::cmp::Ordering;

/// Strategy that gives the trie bit-level access to otherwise opaque keys.
///
/// Keys are read as bit strings, most significant bit first, and are
/// zero-extended past their own length: `is_bit_set` must return `false` for
/// any index at or beyond `bit_length`. Two keys whose zero-extended bit
/// patterns are identical denote the same slot in the trie, even if their
/// nominal lengths differ.
///
/// The provided `bit_index` and `cmp_keys` are derived from `is_bit_set`, so
/// the ordering is consistent with the tree structure by construction.
/// Implementations may override them with faster equivalents, but must not
/// change the result.
pub trait KeyAnalyzer<K> {
    /// Length of the key in bits.
    fn bit_length(&self, key: &K) -> usize;

    /// Size in bits of the key's natural unit (e.g. a character or a byte).
    ///
    /// Used to convert the element counts of the element-granularity prefix
    /// views into bit counts.
    fn bits_per_element(&self) -> usize;

    /// Value of the bit at `bit`, where bit 0 is the most significant.
    ///
    /// Must return `false` for `bit >= bit_length(key)`.
    fn is_bit_set(&self, key: &K, bit: usize) -> bool;

    /// Whether the key has a shape this analyzer can index at all.
    ///
    /// Fixed-length analyzers reject keys of any other length here; the trie
    /// checks this on every operation that receives a key.
    fn accepts(&self, key: &K) -> bool {
        let _ = key;
        true
    }

    /// Index of the first bit at which the two keys differ, or `None` if
    /// their zero-extended bit patterns are equal.
    fn bit_index(&self, key: &K, other: &K) -> Option<usize> {
        let n = self.bit_length(key).max(self.bit_length(other));
        (0..n).find(|&i| self.is_bit_set(key, i) != self.is_bit_set(other, i))
    }

    /// Lexicographic order of the zero-extended bit patterns.
    fn cmp_keys(&self, a: &K, b: &K) -> Ordering {
        match self.bit_index(a, b) {
            None => Ordering::Equal,
            // a has a 0 where b has a 1, so a sorts first
            Some(i) => {
                if self.is_bit_set(b, i) {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
        }
    }

    /// `Some(n)` if every accepted key is exactly `n` bits long.
    ///
    /// Fixed-length tries cannot express element-granularity prefix views
    /// shorter than the whole key; this flag is how the trie knows to reject
    /// them instead of returning a wrong view.
    fn fixed_bit_length(&self) -> Option<usize> {
        None
    }
}

/// Analyzer for `String` keys, indexed by UTF-16 code units (16 bits per
/// element). ASCII strings sort in the usual alphabetical order.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrKeyAnalyzer;

impl KeyAnalyzer<String> for StrKeyAnalyzer {
    fn bit_length(&self, key: &String) -> usize {
        key.encode_utf16().count() * 16
    }

    fn bits_per_element(&self) -> usize {
        16
    }

    fn is_bit_set(&self, key: &String, bit: usize) -> bool {
        match key.encode_utf16().nth(bit / 16) {
            Some(unit) => unit & (0x8000 >> (bit % 16)) != 0,
            None => false,
        }
    }
}

/// Analyzer for variable-length `Vec<u8>` keys, 8 bits per element.
#[derive(Debug, Default, Clone, Copy)]
pub struct ByteKeyAnalyzer;

impl KeyAnalyzer<Vec<u8>> for ByteKeyAnalyzer {
    fn bit_length(&self, key: &Vec<u8>) -> usize {
        key.len() * 8
    }

    fn bits_per_element(&self) -> usize {
        8
    }

    fn is_bit_set(&self, key: &Vec<u8>, bit: usize) -> bool {
        match key.get(bit / 8) {
            Some(byte) => byte & (0x80 >> (bit % 8)) != 0,
            None => false,
        }
    }

    fn bit_index(&self, key: &Vec<u8>, other: &Vec<u8>) -> Option<usize> {
        let n = key.len().max(other.len());
        for i in 0..n {
            let a = key.get(i).copied().unwrap_or(0);
            let b = other.get(i).copied().unwrap_or(0);
            if a != b {
                return Some(i * 8 + (a ^ b).leading_zeros() as usize);
            }
        }
        None
    }

    fn cmp_keys(&self, a: &Vec<u8>, b: &Vec<u8>) -> Ordering {
        // byte order equals bit order, modulo zero extension of the tail
        match self.bit_index(a, b) {
            None => Ordering::Equal,
            Some(i) => {
                if self.is_bit_set(b, i) {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
        }
    }
}

/// Analyzer for fixed-width unsigned integer keys, the routing-table use
/// case. Bit 0 is the most significant bit of the configured width, so the
/// branch order of the trie equals the significance order of the xor metric.
#[derive(Debug, Clone, Copy)]
pub struct FixedKeyAnalyzer {
    bits: usize,
}

impl FixedKeyAnalyzer {
    /// A new analyzer for keys of exactly `bits` bits, 1 <= bits <= 64.
    pub fn new(bits: usize) -> Self {
        assert!(bits >= 1 && bits <= 64, "width must be 1..=64");
        Self { bits }
    }

    pub fn width(&self) -> usize {
        self.bits
    }
}

impl Default for FixedKeyAnalyzer {
    fn default() -> Self {
        Self::new(64)
    }
}

impl KeyAnalyzer<u64> for FixedKeyAnalyzer {
    fn bit_length(&self, _key: &u64) -> usize {
        self.bits
    }

    fn bits_per_element(&self) -> usize {
        1
    }

    fn is_bit_set(&self, key: &u64, bit: usize) -> bool {
        bit < self.bits && (key >> (self.bits - 1 - bit)) & 1 == 1
    }

    fn accepts(&self, key: &u64) -> bool {
        self.bits == 64 || key >> self.bits == 0
    }

    fn bit_index(&self, key: &u64, other: &u64) -> Option<usize> {
        let x = key ^ other;
        if x == 0 {
            None
        } else {
            Some(x.leading_zeros() as usize - (64 - self.bits))
        }
    }

    fn cmp_keys(&self, a: &u64, b: &u64) -> Ordering {
        a.cmp(b)
    }

    fn fixed_bit_length(&self) -> Option<usize> {
        Some(self.bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_bits() {
        let a = StrKeyAnalyzer;
        let key = "a".to_string(); // 0x0061
        assert_eq!(a.bit_length(&key), 16);
        let pattern: Vec<bool> = (0..16).map(|i| a.is_bit_set(&key, i)).collect();
        let expected: Vec<bool> = (0..16).map(|i| 0x0061u16 & (0x8000 >> i) != 0).collect();
        assert_eq!(pattern, expected);
        // zero extension
        assert!(!a.is_bit_set(&key, 16));
        assert!(!a.is_bit_set(&key, 1000));
    }

    #[test]
    fn str_bit_index_and_order() {
        let a = StrKeyAnalyzer;
        let lime = "Lime".to_string();
        let limewire = "LimeWire".to_string();
        // diverges past the end of the shorter key
        let i = a.bit_index(&lime, &limewire).unwrap();
        assert!(i >= a.bit_length(&lime));
        assert_eq!(a.cmp_keys(&lime, &limewire), Ordering::Less);
        assert_eq!(a.cmp_keys(&limewire, &lime), Ordering::Greater);
        assert_eq!(a.bit_index(&lime, &lime.clone()), None);
    }

    #[test]
    fn byte_bit_index_matches_default() {
        let a = ByteKeyAnalyzer;
        let cases = [
            (vec![], vec![]),
            (vec![0x80], vec![]),
            (vec![0xff, 0x00], vec![0xff]),
            (vec![0x12, 0x34], vec![0x12, 0x35]),
            (vec![0x00], vec![]),
        ];
        for (x, y) in cases {
            let expected = (0..x.len().max(y.len()) * 8)
                .find(|&i| a.is_bit_set(&x, i) != a.is_bit_set(&y, i));
            assert_eq!(a.bit_index(&x, &y), expected, "{:?} vs {:?}", x, y);
        }
    }

    #[test]
    fn fixed_width_bits() {
        let a = FixedKeyAnalyzer::new(7);
        let d = 0b1000100u64;
        assert!(a.is_bit_set(&d, 0));
        assert!(!a.is_bit_set(&d, 1));
        assert!(a.is_bit_set(&d, 4));
        assert!(!a.is_bit_set(&d, 6));
        assert!(!a.is_bit_set(&d, 7));
        assert_eq!(a.bit_index(&0b1001000, &0b1001100), Some(4));
        assert_eq!(a.bit_index(&d, &d.clone()), None);
        assert!(a.accepts(&0b1111111));
        assert!(!a.accepts(&0b10000000));
    }

    #[test]
    fn fixed_order_is_numeric() {
        let a = FixedKeyAnalyzer::new(16);
        assert_eq!(a.cmp_keys(&1, &2), Ordering::Less);
        assert_eq!(a.cmp_keys(&0x8000, &0x7fff), Ordering::Greater);
        assert_eq!(a.cmp_keys(&42, &42), Ordering::Equal);
    }
}

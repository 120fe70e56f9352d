//! Fixed 256-bit set over the byte alphabet
//!
//! Character classes, merged transition labels and negation exclusions are all
//! sets of byte codes. `ByteSet` stores them as four machine words so union,
//! difference and complement are constant time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A set of byte codes in `0..=255`
///
/// # Examples
///
/// ```
/// use zkregex_runtime::ByteSet;
///
/// let lower = ByteSet::from_range(b'a', b'z');
/// let vowels: ByteSet = b"aeiou".iter().copied().collect();
///
/// let consonants = lower.difference(&vowels);
/// assert_eq!(consonants.len(), 21);
/// assert!(!consonants.contains(b'e'));
/// assert_eq!(lower.runs(), vec![(b'a', b'z')]);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "Vec<u8>", from = "Vec<u8>")]
pub struct ByteSet([u64; 4]);

impl ByteSet {
    pub const EMPTY: ByteSet = ByteSet([0; 4]);

    pub fn full() -> Self {
        Self([u64::MAX; 4])
    }

    pub fn singleton(byte: u8) -> Self {
        let mut set = Self::EMPTY;
        set.insert(byte);
        set
    }

    /// Inclusive range `lo..=hi`; empty when `lo > hi`
    pub fn from_range(lo: u8, hi: u8) -> Self {
        (lo..=hi).collect()
    }

    pub fn insert(&mut self, byte: u8) -> bool {
        let (word, bit) = Self::slot(byte);
        let fresh = self.0[word] & bit == 0;
        self.0[word] |= bit;
        fresh
    }

    pub fn remove(&mut self, byte: u8) -> bool {
        let (word, bit) = Self::slot(byte);
        let present = self.0[word] & bit != 0;
        self.0[word] &= !bit;
        present
    }

    pub fn contains(&self, byte: u8) -> bool {
        let (word, bit) = Self::slot(byte);
        self.0[word] & bit != 0
    }

    pub fn len(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|w| *w == 0)
    }

    pub fn union(&self, other: &ByteSet) -> ByteSet {
        self.zip_with(other, |a, b| a | b)
    }

    pub fn intersection(&self, other: &ByteSet) -> ByteSet {
        self.zip_with(other, |a, b| a & b)
    }

    pub fn difference(&self, other: &ByteSet) -> ByteSet {
        self.zip_with(other, |a, b| a & !b)
    }

    pub fn complement(&self) -> ByteSet {
        ByteSet([!self.0[0], !self.0[1], !self.0[2], !self.0[3]])
    }

    pub fn is_subset(&self, other: &ByteSet) -> bool {
        self.difference(other).is_empty()
    }

    /// Members in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=255u8).filter(move |b| self.contains(*b))
    }

    pub fn min(&self) -> Option<u8> {
        self.iter().next()
    }

    pub fn max(&self) -> Option<u8> {
        (0..=255u8).rev().find(|b| self.contains(*b))
    }

    /// Maximal runs of consecutive codes as inclusive `(min, max)` pairs
    pub fn runs(&self) -> Vec<(u8, u8)> {
        let mut runs: Vec<(u8, u8)> = Vec::new();
        for byte in self.iter() {
            match runs.last_mut() {
                Some((_, hi)) if *hi as u16 + 1 == byte as u16 => *hi = byte,
                _ => runs.push((byte, byte)),
            }
        }
        runs
    }

    fn slot(byte: u8) -> (usize, u64) {
        ((byte >> 6) as usize, 1u64 << (byte & 63))
    }

    fn zip_with(&self, other: &ByteSet, f: impl Fn(u64, u64) -> u64) -> ByteSet {
        let mut out = [0u64; 4];
        for (i, word) in out.iter_mut().enumerate() {
            *word = f(self.0[i], other.0[i]);
        }
        ByteSet(out)
    }
}

impl FromIterator<u8> for ByteSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = ByteSet::EMPTY;
        set.extend(iter);
        set
    }
}

impl Extend<u8> for ByteSet {
    fn extend<I: IntoIterator<Item = u8>>(&mut self, iter: I) {
        for byte in iter {
            self.insert(byte);
        }
    }
}

impl From<ByteSet> for Vec<u8> {
    fn from(set: ByteSet) -> Self {
        set.iter().collect()
    }
}

impl From<Vec<u8>> for ByteSet {
    fn from(bytes: Vec<u8>) -> Self {
        bytes.into_iter().collect()
    }
}

impl fmt::Debug for ByteSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (lo, hi)) in self.runs().into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if lo == hi {
                write!(f, "{}", lo.escape_ascii())?;
            } else {
                write!(f, "{}-{}", lo.escape_ascii(), hi.escape_ascii())?;
            }
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_remove() {
        let mut set = ByteSet::EMPTY;
        assert!(set.insert(0));
        assert!(set.insert(255));
        assert!(!set.insert(255));
        assert_eq!(set.len(), 2);
        assert!(set.remove(0));
        assert!(!set.remove(0));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![255]);
    }

    #[test]
    fn test_word_boundaries() {
        let set: ByteSet = [63u8, 64, 127, 128, 191, 192].into_iter().collect();
        assert_eq!(set.runs(), vec![(63, 64), (127, 128), (191, 192)]);
        assert_eq!(set.min(), Some(63));
        assert_eq!(set.max(), Some(192));
    }

    #[test]
    fn test_complement_of_empty_is_full() {
        assert_eq!(ByteSet::EMPTY.complement(), ByteSet::full());
        assert_eq!(ByteSet::full().len(), 256);
        assert_eq!(ByteSet::full().runs(), vec![(0, 255)]);
    }

    #[test]
    fn test_empty_range() {
        assert!(ByteSet::from_range(b'z', b'a').is_empty());
        assert_eq!(ByteSet::EMPTY.min(), None);
        assert_eq!(ByteSet::EMPTY.max(), None);
    }

    #[test]
    fn test_debug_format() {
        let set: ByteSet = b"abcx\n".iter().copied().collect();
        assert_eq!(format!("{:?}", set), "{\\n, a-c, x}");
    }
}

//! Transition symbols and merged edge labels

use crate::{CompilerError, Result};
use std::cmp::Ordering;
use std::fmt;
use zkregex_runtime::ByteSet;

/// Byte code the negation marker sorts directly after
const NEGATE_ANCHOR: u8 = b'^';

/// One automaton input symbol
///
/// `Negate` is the marker a negated character class leaves on its edge. It
/// sorts immediately after the literal byte `^` so label keys come out in the
/// same order as their rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Byte(u8),
    Negate,
}

impl Symbol {
    fn sort_key(&self) -> u16 {
        match self {
            Symbol::Byte(b) => (*b as u16) << 1,
            Symbol::Negate => ((NEGATE_ANCHOR as u16) << 1) | 1,
        }
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Negate => write!(f, "^"),
            Symbol::Byte(b @ (b'^' | b',' | b'\\')) => write!(f, "\\{}", *b as char),
            Symbol::Byte(b) if b.is_ascii_graphic() || *b == b' ' => write!(f, "{}", *b as char),
            Symbol::Byte(b) => write!(f, "\\x{:02x}", b),
        }
    }
}

/// Set of symbols carried by one automaton edge
///
/// Minimization merges parallel edges, so a label is a byte set plus a flag
/// recording whether the negation marker is among its symbols.
///
/// # Examples
///
/// ```
/// use zkregex_compiler::{Label, Symbol};
///
/// let mut label = Label::symbol(Symbol::Byte(b'c'));
/// label.insert(Symbol::Byte(b'b'));
/// assert_eq!(label.key(), "b,c");
///
/// let parsed = Label::parse_key("^,a,e").unwrap();
/// assert!(parsed.is_negated());
/// assert_eq!(parsed.bytes().len(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Label {
    bytes: ByteSet,
    negated: bool,
}

impl Label {
    pub fn symbol(symbol: Symbol) -> Self {
        let mut label = Self::default();
        label.insert(symbol);
        label
    }

    pub fn insert(&mut self, symbol: Symbol) {
        match symbol {
            Symbol::Byte(b) => {
                self.bytes.insert(b);
            }
            Symbol::Negate => self.negated = true,
        }
    }

    pub fn union(&self, other: &Label) -> Label {
        Label { bytes: self.bytes.union(&other.bytes), negated: self.negated || other.negated }
    }

    /// Explicit byte members, excluding the negation marker
    pub fn bytes(&self) -> &ByteSet {
        &self.bytes
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty() && !self.negated
    }

    /// Symbols in ascending order
    pub fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        let mut marker = self.negated.then_some(Symbol::Negate);
        let mut bytes = self.bytes.iter().peekable();
        std::iter::from_fn(move || {
            let next_byte = bytes.peek().copied();
            match (marker, next_byte) {
                (Some(m), Some(b)) if Symbol::Byte(b) > m => marker.take(),
                (Some(_), None) => marker.take(),
                (_, Some(b)) => {
                    bytes.next();
                    Some(Symbol::Byte(b))
                }
                (None, None) => None,
            }
        })
    }

    /// Comma-joined rendering used as the transition key in exported graphs
    pub fn key(&self) -> String {
        self.symbols().map(|s| s.to_string()).collect::<Vec<_>>().join(",")
    }

    /// Inverse of [`Label::key`]
    pub fn parse_key(key: &str) -> Result<Label> {
        let bytes = key.as_bytes();
        let mut label = Label::default();
        let mut i = 0;
        while i < bytes.len() {
            let symbol = match bytes[i] {
                b'^' => {
                    i += 1;
                    Symbol::Negate
                }
                b'\\' => match bytes.get(i + 1) {
                    Some(b'x') => {
                        let hex = key.get(i + 2..i + 4).ok_or_else(|| bad_key(key))?;
                        let byte = u8::from_str_radix(hex, 16).map_err(|_| bad_key(key))?;
                        i += 4;
                        Symbol::Byte(byte)
                    }
                    Some(b @ (b'^' | b',' | b'\\')) => {
                        i += 2;
                        Symbol::Byte(*b)
                    }
                    _ => return Err(bad_key(key)),
                },
                b => {
                    i += 1;
                    Symbol::Byte(b)
                }
            };
            label.insert(symbol);
            match bytes.get(i) {
                None => {}
                Some(b',') if i + 1 < bytes.len() => i += 1,
                Some(_) => return Err(bad_key(key)),
            }
        }
        if label.is_empty() {
            return Err(bad_key(key));
        }
        Ok(label)
    }
}

fn bad_key(key: &str) -> CompilerError {
    CompilerError::InvalidGraph(format!("malformed transition key {:?}", key))
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        self.symbols().cmp(other.symbols())
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

//! Pattern preprocessing
//!
//! Rewrites bracket classes, ranges, shorthand classes and escapes into the
//! parser's dialect, which only knows literals, `\`-escaped literals, the
//! negation marker `^`, groups, `|` and the postfix operators `*`, `+`, `?`.

use crate::{parse, AstNode, CompilerError, ParseError, Result};

/// Bytes with a meaning in the parser dialect
const META: &[u8] = b"()|*+?\\^[]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Digit,
    Lower,
    Upper,
}

fn char_class(byte: u8) -> Option<CharClass> {
    match byte {
        b'0'..=b'9' => Some(CharClass::Digit),
        b'a'..=b'z' => Some(CharClass::Lower),
        b'A'..=b'Z' => Some(CharClass::Upper),
        _ => None,
    }
}

fn control_escape(byte: u8) -> Option<u8> {
    match byte {
        b'n' => Some(b'\n'),
        b'r' => Some(b'\r'),
        b't' => Some(b'\t'),
        b'v' => Some(0x0b),
        b'f' => Some(0x0c),
        _ => None,
    }
}

fn shorthand(byte: u8) -> Option<Vec<u8>> {
    match byte {
        b'd' => Some((b'0'..=b'9').collect()),
        b'w' => {
            let mut members: Vec<u8> = (b'0'..=b'9').collect();
            members.extend(b'A'..=b'Z');
            members.push(b'_');
            members.extend(b'a'..=b'z');
            Some(members)
        }
        b's' => Some(vec![b' ', b'\t', b'\n', 0x0b, 0x0c, b'\r']),
        _ => None,
    }
}

fn push_literal(out: &mut Vec<u8>, byte: u8) {
    if META.contains(&byte) {
        out.push(b'\\');
    }
    out.push(byte);
}

fn push_group(out: &mut Vec<u8>, negated: bool, members: &[u8]) {
    out.push(b'(');
    if negated {
        out.push(b'^');
    }
    for (i, byte) in members.iter().enumerate() {
        if i > 0 || negated {
            out.push(b'|');
        }
        push_literal(out, *byte);
    }
    out.push(b')');
}

/// A pattern expanded into the parser dialect
///
/// Keeps, for every dialect byte, the offset of the pattern token it was
/// expanded from, so parse errors can point into the text the user wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    pub bytes: Vec<u8>,
    origins: Vec<usize>,
    pattern_len: usize,
}

impl Dialect {
    pub fn expand(pattern: &str) -> Result<Self> {
        let bytes = pattern.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut origins = Vec::with_capacity(bytes.len());
        let mut i = 0;

        while i < bytes.len() {
            let token = i;
            match bytes[i] {
                b'\\' => {
                    let escaped = *bytes
                        .get(i + 1)
                        .ok_or_else(|| ParseError::new("trailing escape", i))?;
                    if let Some(members) = shorthand(escaped) {
                        push_group(&mut out, false, &members);
                    } else if let Some(control) = control_escape(escaped) {
                        out.push(control);
                    } else {
                        out.push(b'\\');
                        out.push(escaped);
                    }
                    i += 2;
                }
                b'[' => {
                    let (negated, members, end) = bracket(bytes, i)?;
                    push_group(&mut out, negated, &members);
                    i = end + 1;
                }
                b'^' => {
                    return Err(ParseError::new(
                        "unescaped '^' outside a character class",
                        i,
                    )
                    .into());
                }
                b']' => {
                    push_literal(&mut out, b']');
                    i += 1;
                }
                byte => {
                    out.push(byte);
                    i += 1;
                }
            }
            origins.resize(out.len(), token);
        }

        Ok(Self { bytes: out, origins, pattern_len: bytes.len() })
    }

    /// Pattern offset of the token that produced dialect byte `offset`
    ///
    /// Offsets past the end map to the end of the pattern.
    pub fn pattern_offset(&self, offset: usize) -> usize {
        self.origins.get(offset).copied().unwrap_or(self.pattern_len)
    }

    /// Parses the dialect, reporting error offsets against the pattern
    ///
    /// AST spans keep referring to [`Dialect::bytes`].
    pub fn parse(&self) -> Result<AstNode> {
        parse(&self.bytes).map_err(|err| {
            CompilerError::Parse(ParseError::new(err.message, self.pattern_offset(err.offset)))
        })
    }
}

/// Expands `pattern` into the parser dialect
///
/// # Examples
///
/// ```
/// use zkregex_compiler::preprocess;
///
/// assert_eq!(preprocess("[a-c]x").unwrap(), b"(a|b|c)x".to_vec());
/// assert_eq!(preprocess("[^ab]+").unwrap(), b"(^|a|b)+".to_vec());
/// assert_eq!(preprocess(r"\(\d").unwrap(), b"\\((0|1|2|3|4|5|6|7|8|9)".to_vec());
/// ```
pub fn preprocess(pattern: &str) -> Result<Vec<u8>> {
    Dialect::expand(pattern).map(|dialect| dialect.bytes)
}

/// Reads the class opening at `open`; returns the negation flag, the members in
/// first-occurrence order and the offset of the closing `]`
fn bracket(bytes: &[u8], open: usize) -> Result<(bool, Vec<u8>, usize)> {
    let mut j = open + 1;
    let negated = bytes.get(j) == Some(&b'^');
    if negated {
        j += 1;
    }

    let mut members = Vec::new();
    loop {
        let byte =
            *bytes.get(j).ok_or_else(|| ParseError::new("unterminated character class", open))?;
        match byte {
            b']' => break,
            b'\\' => {
                let escaped = *bytes
                    .get(j + 1)
                    .ok_or_else(|| ParseError::new("trailing escape", j))?;
                if let Some(expansion) = shorthand(escaped) {
                    members.extend(expansion);
                } else {
                    members.push(control_escape(escaped).unwrap_or(escaped));
                }
                j += 2;
            }
            lo if is_range(bytes, j) => {
                let hi = bytes[j + 2];
                if char_class(lo) != char_class(hi) {
                    return Err(CompilerError::Range(format!(
                        "inconsistent range types {}-{} at offset {}",
                        lo as char, hi as char, j
                    )));
                }
                if lo >= hi {
                    return Err(CompilerError::Range(format!(
                        "invalid range {}-{} at offset {}",
                        lo as char, hi as char, j
                    )));
                }
                members.extend(lo..=hi);
                j += 3;
            }
            other => {
                members.push(other);
                j += 1;
            }
        }
    }

    if members.is_empty() {
        return Err(ParseError::new("empty character class", open).into());
    }

    let mut seen = zkregex_runtime::ByteSet::EMPTY;
    members.retain(|b| seen.insert(*b));
    Ok((negated, members, j))
}

/// `x-y` between two alphanumerics
fn is_range(bytes: &[u8], j: usize) -> bool {
    match (bytes.get(j), bytes.get(j + 1), bytes.get(j + 2)) {
        (Some(lo), Some(b'-'), Some(hi)) => lo.is_ascii_alphanumeric() && hi.is_ascii_alphanumeric(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(pattern: &str) -> String {
        String::from_utf8(preprocess(pattern).unwrap()).unwrap()
    }

    #[test]
    fn test_plain_pattern_unchanged() {
        assert_eq!(expand("1=(a|b) (2=(b|c)+ )+d"), "1=(a|b) (2=(b|c)+ )+d");
    }

    #[test]
    fn test_negated_class() {
        assert_eq!(expand("[^aeiou]+"), "(^|a|e|i|o|u)+");
    }

    #[test]
    fn test_literal_dash_and_metachars() {
        assert_eq!(expand("[%-=]"), "(%|-|=)");
        assert_eq!(expand("[a-]"), "(a|-)");
        assert_eq!(expand("[(*]"), "(\\(|\\*)");
    }

    #[test]
    fn test_duplicates_removed() {
        assert_eq!(expand("[abca]"), "(a|b|c)");
        assert_eq!(expand("[a-cb]"), "(a|b|c)");
    }

    #[test]
    fn test_range_errors() {
        assert!(matches!(preprocess("[a-Z]"), Err(CompilerError::Range(_))));
        assert!(matches!(preprocess("[9-a]"), Err(CompilerError::Range(_))));
        assert!(matches!(preprocess("[z-a]"), Err(CompilerError::Range(_))));
        assert!(matches!(preprocess("[a-a]"), Err(CompilerError::Range(_))));
    }

    #[test]
    fn test_bracket_errors() {
        assert!(matches!(preprocess("[abc"), Err(CompilerError::Parse(e)) if e.offset == 0));
        assert!(matches!(preprocess("x[]"), Err(CompilerError::Parse(e)) if e.offset == 1));
        assert!(matches!(preprocess("[^]"), Err(CompilerError::Parse(_))));
    }

    #[test]
    fn test_escapes() {
        assert_eq!(expand(r"a\.b"), "a\\.b");
        assert_eq!(expand(r"\t"), "\t");
        assert_eq!(expand(r"[\n\]]"), "(\n|\\])");
        assert_eq!(expand(r"\^"), "\\^");
    }

    #[test]
    fn test_shorthand_classes() {
        assert_eq!(expand(r"\s"), "( |\t|\n|\u{b}|\u{c}|\r)");
        let word = expand(r"\w");
        assert!(word.starts_with("(0|1|"));
        assert!(word.contains("|Z|_|a|"));
        assert_eq!(expand(r"[\dx]"), "(0|1|2|3|4|5|6|7|8|9|x)");
    }

    #[test]
    fn test_origins_point_at_pattern_tokens() {
        let dialect = Dialect::expand(r"[ab]|\d)").unwrap();
        assert_eq!(dialect.bytes, b"(a|b)|(0|1|2|3|4|5|6|7|8|9))".to_vec());
        assert_eq!(dialect.pattern_offset(0), 0);
        assert_eq!(dialect.pattern_offset(4), 0);
        assert_eq!(dialect.pattern_offset(5), 4);
        assert_eq!(dialect.pattern_offset(6), 5);
        assert_eq!(dialect.pattern_offset(dialect.bytes.len() - 1), 7);
        assert_eq!(dialect.pattern_offset(dialect.bytes.len()), 8);
    }

    #[test]
    fn test_parse_errors_use_pattern_offsets() {
        let dialect = Dialect::expand("[ab]|)").unwrap();
        assert!(matches!(parse(&dialect.bytes), Err(e) if e.offset == 6));
        assert!(matches!(dialect.parse(), Err(CompilerError::Parse(e)) if e.offset == 5));

        let dialect = Dialect::expand("([a-c]").unwrap();
        assert!(matches!(dialect.parse(), Err(CompilerError::Parse(e)) if e.offset == 6));
    }

    #[test]
    fn test_bare_caret_rejected() {
        assert!(matches!(preprocess("a^b"), Err(CompilerError::Parse(e)) if e.offset == 1));
        assert!(matches!(preprocess(r"\"), Err(CompilerError::Parse(_))));
    }
}

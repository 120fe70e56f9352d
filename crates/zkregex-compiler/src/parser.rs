//! Recursive-descent parser for the preprocessed pattern dialect
//!
//! Grammar:
//!
//! ```text
//! Or      := Cat ('|' Cat)*
//! Cat     := Term+
//! Term    := Atom Postfix*
//! Atom    := literal | '\' byte | '^' | '(' Or ')'
//! Postfix := '*' | '+' | '?'
//! ```
//!
//! `X+` desugars to `Cat(X, Star(X))` and `X?` to `Or(X, Empty)`.

use crate::{AstKind, AstNode, ParseError, Span, Symbol};

/// Parses a preprocessed pattern
///
/// Error offsets and spans index `pattern` itself; [`crate::Dialect::parse`] maps
/// errors back onto the original pattern.
///
/// # Examples
///
/// ```
/// use zkregex_compiler::{parse, AstKind};
///
/// let ast = parse(b"a(b|c)*").unwrap();
/// assert!(matches!(ast.kind, AstKind::Cat(ref parts) if parts.len() == 2));
/// assert_eq!((ast.span.begin, ast.span.end), (0, 7));
///
/// let err = parse(b"(ab").unwrap_err();
/// assert_eq!(err.offset, 3);
/// ```
pub fn parse(pattern: &[u8]) -> Result<AstNode, ParseError> {
    let mut parser = Parser { input: pattern, pos: 0 };
    let root = parser.parse_or()?;
    match parser.peek() {
        None => Ok(root),
        Some(b')') => Err(ParseError::new("unmatched ')'", parser.pos)),
        Some(other) => Err(ParseError::new(format!("unexpected {:?}", other as char), parser.pos)),
    }
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn parse_or(&mut self) -> Result<AstNode, ParseError> {
        let begin = self.pos;
        let mut alternatives = vec![self.parse_cat()?];
        while self.peek() == Some(b'|') {
            self.pos += 1;
            alternatives.push(self.parse_cat()?);
        }
        Ok(AstNode::collapse(alternatives, Span::new(begin, self.pos), AstKind::Or))
    }

    fn parse_cat(&mut self) -> Result<AstNode, ParseError> {
        let begin = self.pos;
        let mut terms = Vec::new();
        while !matches!(self.peek(), None | Some(b'|') | Some(b')')) {
            terms.push(self.parse_term()?);
        }
        if terms.is_empty() {
            return Err(ParseError::new("empty alternative", self.pos));
        }
        Ok(AstNode::collapse(terms, Span::new(begin, self.pos), AstKind::Cat))
    }

    fn parse_term(&mut self) -> Result<AstNode, ParseError> {
        let mut node = self.parse_atom()?;
        while let Some(op @ (b'*' | b'+' | b'?')) = self.peek() {
            self.pos += 1;
            let span = Span::new(node.span.begin, self.pos);
            node = match op {
                b'*' => AstNode::new(AstKind::Star(Box::new(node)), span),
                b'+' => {
                    let star = AstNode::new(AstKind::Star(Box::new(node.clone())), span);
                    AstNode::new(AstKind::Cat(vec![node, star]), span)
                }
                _ => {
                    let empty = AstNode::new(AstKind::Empty, span);
                    AstNode::new(AstKind::Or(vec![node, empty]), span)
                }
            };
        }
        Ok(node)
    }

    fn parse_atom(&mut self) -> Result<AstNode, ParseError> {
        let begin = self.pos;
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                let mut inner = self.parse_or()?;
                if self.peek() != Some(b')') {
                    return Err(ParseError::new(
                        format!("missing ')' for '(' at {}", begin),
                        self.pos,
                    ));
                }
                self.pos += 1;
                inner.span = Span::new(begin, self.pos);
                Ok(inner)
            }
            Some(op @ (b'*' | b'+' | b'?')) => {
                Err(ParseError::new(format!("dangling postfix operator '{}'", op as char), begin))
            }
            Some(b'\\') => {
                let byte = self
                    .input
                    .get(begin + 1)
                    .copied()
                    .ok_or_else(|| ParseError::new("trailing escape", begin))?;
                self.pos += 2;
                Ok(AstNode::new(AstKind::Text(Symbol::Byte(byte)), Span::new(begin, self.pos)))
            }
            Some(b'^') => {
                self.pos += 1;
                Ok(AstNode::new(AstKind::Text(Symbol::Negate), Span::new(begin, self.pos)))
            }
            Some(byte) => {
                self.pos += 1;
                Ok(AstNode::new(AstKind::Text(Symbol::Byte(byte)), Span::new(begin, self.pos)))
            }
            None => Err(ParseError::new("unexpected end of pattern", begin)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(byte: u8, begin: usize) -> AstNode {
        AstNode::new(AstKind::Text(Symbol::Byte(byte)), Span::new(begin, begin + 1))
    }

    #[test]
    fn test_single_literal() {
        assert_eq!(parse(b"a").unwrap(), text(b'a', 0));
    }

    #[test]
    fn test_alternation_splits_at_top_level_only() {
        let ast = parse(b"(a|b)|c").unwrap();
        match ast.kind {
            AstKind::Or(alternatives) => {
                assert_eq!(alternatives.len(), 2);
                assert!(matches!(alternatives[0].kind, AstKind::Or(_)));
                assert_eq!(alternatives[0].span, Span::new(0, 5));
                assert_eq!(alternatives[1], text(b'c', 6));
            }
            other => panic!("expected Or, got {:?}", other),
        }
    }

    #[test]
    fn test_plus_desugars_to_cat_star() {
        let ast = parse(b"a+").unwrap();
        let expected = AstNode::new(
            AstKind::Cat(vec![
                text(b'a', 0),
                AstNode::new(AstKind::Star(Box::new(text(b'a', 0))), Span::new(0, 2)),
            ]),
            Span::new(0, 2),
        );
        assert_eq!(ast, expected);
    }

    #[test]
    fn test_question_desugars_to_or_empty() {
        let ast = parse(b"a?").unwrap();
        match ast.kind {
            AstKind::Or(alternatives) => {
                assert_eq!(alternatives[0], text(b'a', 0));
                assert_eq!(alternatives[1].kind, AstKind::Empty);
            }
            other => panic!("expected Or, got {:?}", other),
        }
    }

    #[test]
    fn test_negation_marker_and_escaped_caret() {
        assert_eq!(parse(b"^").unwrap().kind, AstKind::Text(Symbol::Negate));
        assert_eq!(parse(b"\\^").unwrap().kind, AstKind::Text(Symbol::Byte(b'^')));
        assert_eq!(parse(b"\\(").unwrap().span, Span::new(0, 2));
    }

    #[test]
    fn test_errors_carry_offsets() {
        assert_eq!(parse(b"").unwrap_err().offset, 0);
        assert_eq!(parse(b"a||b").unwrap_err().offset, 2);
        assert_eq!(parse(b"()").unwrap_err().offset, 1);
        assert_eq!(parse(b"*a").unwrap_err().offset, 0);
        assert_eq!(parse(b"a(|*)").unwrap_err().offset, 2);
        assert_eq!(parse(b"ab)").unwrap_err().offset, 2);
        assert_eq!(parse(b"a\\").unwrap_err().offset, 1);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(parse(b"(a").unwrap_err().message, "missing ')' for '(' at 0");
        assert_eq!(parse(b"a)").unwrap_err().message, "unmatched ')'");
        assert_eq!(parse(b"+").unwrap_err().message, "dangling postfix operator '+'");
    }

    #[test]
    fn test_nested_postfix() {
        let ast = parse(b"a**").unwrap();
        assert_eq!(ast.span, Span::new(0, 3));
        assert!(matches!(ast.kind, AstKind::Star(ref inner) if matches!(inner.kind, AstKind::Star(_))));
    }
}

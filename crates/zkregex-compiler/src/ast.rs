//! Abstract syntax tree produced by the parser

use crate::Symbol;

/// Half-open byte range `[begin, end)` in the parser dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub begin: usize,
    pub end: usize,
}

impl Span {
    pub fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstKind {
    /// Matches the empty string
    Empty,
    Text(Symbol),
    Cat(Vec<AstNode>),
    Or(Vec<AstNode>),
    Star(Box<AstNode>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstNode {
    pub kind: AstKind,
    pub span: Span,
}

impl AstNode {
    pub fn new(kind: AstKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Builds an `Or`/`Cat` node, collapsing a single child into itself
    pub(crate) fn collapse(
        mut children: Vec<AstNode>,
        span: Span,
        wrap: fn(Vec<AstNode>) -> AstKind,
    ) -> AstNode {
        if children.len() == 1 {
            children.swap_remove(0)
        } else {
            AstNode::new(wrap(children), span)
        }
    }

    /// Number of nodes in the tree
    pub fn size(&self) -> usize {
        1 + match &self.kind {
            AstKind::Empty | AstKind::Text(_) => 0,
            AstKind::Cat(children) | AstKind::Or(children) => {
                children.iter().map(AstNode::size).sum()
            }
            AstKind::Star(child) => child.size(),
        }
    }
}

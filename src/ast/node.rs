//! Syntax tree nodes.

use super::super::{
    lexer::{Token, TokenKind},
    span::Span,
};

/// The kind of a [`Node`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeKind {
    /// The root: the whole pattern expression plus the end-of-file token.
    CompilationUnit,
    /// Zero or more expressions in a row.
    Sequence,
    /// `a|b`. Nested alternations lean left: `a|b|c` is `(a|b)|c`.
    Alternation,
    /// One literal code unit.
    Text,
    /// `.`
    Wildcard,
    /// `^`
    StartAnchor,
    /// `$`
    EndAnchor,
    /// `[:name:]` inside a character class.
    PosixProperty,

    /// `(expr)`
    SimpleGrouping,
    /// `(?opts)` — changes options for the remainder of the enclosing group.
    SimpleOptionsGrouping,
    /// `(?opts:expr)`
    NestedOptionsGrouping,
    /// `(?:expr)`
    NonCapturingGrouping,
    /// `(?=expr)`
    PositiveLookaheadGrouping,
    /// `(?!expr)`
    NegativeLookaheadGrouping,
    /// `(?<=expr)`
    PositiveLookbehindGrouping,
    /// `(?<!expr)`
    NegativeLookbehindGrouping,
    /// `(?>expr)`
    AtomicGrouping,
    /// `(?<name>expr)` or `(?'name'expr)`; the capture may also be a number.
    CaptureGrouping,
    /// `(?<name1-name2>expr)` and the `'` form.
    BalancingGrouping,
    /// `(?(capture)yes|no)`
    ConditionalCaptureGrouping,
    /// `(?(expr)yes|no)`
    ConditionalExpressionGrouping,

    /// `expr*`
    ZeroOrMoreQuantifier,
    /// `expr+`
    OneOrMoreQuantifier,
    /// `expr?`
    ZeroOrOneQuantifier,
    /// `expr{n}`
    ExactNumericQuantifier,
    /// `expr{n,}`
    OpenRangeNumericQuantifier,
    /// `expr{n,m}`
    ClosedRangeNumericQuantifier,
    /// Any quantifier followed by `?`.
    LazyQuantifier,

    /// `[...]`
    CharacterClass,
    /// `[^...]`
    NegatedCharacterClass,
    /// `a-z` inside a character class.
    CharacterClassRange,
    /// `-[...]` inside a character class.
    CharacterClassSubtraction,

    /// `\a`, `\n`, an escaped literal, and similar single-character escapes.
    SimpleEscape,
    /// `\b`, `\B`, `\A`, `\G`, `\Z`, `\z`.
    AnchorEscape,
    /// `\w`, `\W`, `\s`, `\S`, `\d`, `\D`.
    CharacterClassEscape,
    /// `\p{name}` or `\P{name}`.
    CategoryEscape,
    /// `\cX`
    ControlEscape,
    /// `\xFF`
    HexEscape,
    /// `￿`
    UnicodeEscape,
    /// `\0`, `\17` and other octal escapes.
    OctalEscape,
    /// `\1` through `\9` (and beyond, when such a group exists).
    BackreferenceEscape,
    /// `\<name>` or `\'name'`.
    CaptureEscape,
    /// `\k<name>` or `\k'name'`.
    KCaptureEscape,
}

impl NodeKind {
    #[must_use]
    pub fn is_quantifier(self) -> bool {
        matches!(
            self,
            Self::ZeroOrMoreQuantifier
                | Self::OneOrMoreQuantifier
                | Self::ZeroOrOneQuantifier
                | Self::ExactNumericQuantifier
                | Self::OpenRangeNumericQuantifier
                | Self::ClosedRangeNumericQuantifier
                | Self::LazyQuantifier
        )
    }

    #[must_use]
    pub fn is_grouping(self) -> bool {
        matches!(
            self,
            Self::SimpleGrouping
                | Self::SimpleOptionsGrouping
                | Self::NestedOptionsGrouping
                | Self::NonCapturingGrouping
                | Self::PositiveLookaheadGrouping
                | Self::NegativeLookaheadGrouping
                | Self::PositiveLookbehindGrouping
                | Self::NegativeLookbehindGrouping
                | Self::AtomicGrouping
                | Self::CaptureGrouping
                | Self::BalancingGrouping
                | Self::ConditionalCaptureGrouping
                | Self::ConditionalExpressionGrouping
        )
    }
}

/// A child of a [`Node`].
#[derive(Clone, Debug, PartialEq)]
pub enum NodeOrToken {
    Node(Node),
    Token(Token),
}

impl NodeOrToken {
    /// The covered span, trivia included. `None` for empty sequences and
    /// nothing else; missing tokens still occupy a zero-width position.
    #[must_use]
    pub fn full_span(&self) -> Option<Span> {
        match self {
            Self::Node(node) => node.full_span(),
            Self::Token(token) => Some(token.full_span()),
        }
    }

    #[must_use]
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(node) => Some(node),
            Self::Token(_) => None,
        }
    }

    #[must_use]
    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Self::Node(_) => None,
            Self::Token(token) => Some(token),
        }
    }
}

impl From<Node> for NodeOrToken {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<Token> for NodeOrToken {
    fn from(token: Token) -> Self {
        Self::Token(token)
    }
}

/// A non-leaf element of the syntax tree.
///
/// Children are stored in source order, so walking the leaves of the root
/// reproduces the pattern text exactly. Each kind lays its children out in a
/// fixed shape; error recovery substitutes missing tokens rather than
/// dropping positions.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<NodeOrToken>,
}

impl Node {
    #[must_use]
    pub fn new(kind: NodeKind, children: Vec<NodeOrToken>) -> Self {
        Self { kind, children }
    }

    /// The span covered by this node, trivia included.
    #[must_use]
    pub fn full_span(&self) -> Option<Span> {
        let mut spans = self.children.iter().filter_map(NodeOrToken::full_span);
        let first = spans.next()?;
        Some(spans.fold(first, |accumulated, span| {
            Span::new(accumulated.start, span.end)
        }))
    }

    #[must_use]
    pub fn token_at(&self, index: usize) -> Option<&Token> {
        self.children.get(index).and_then(NodeOrToken::as_token)
    }

    #[must_use]
    pub fn node_at(&self, index: usize) -> Option<&Node> {
        self.children.get(index).and_then(NodeOrToken::as_node)
    }

    pub fn child_nodes(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter_map(NodeOrToken::as_node)
    }

    /// Visits every token under this node in source order.
    pub fn for_each_token(&self, visit: &mut dyn FnMut(&Token)) {
        for child in &self.children {
            match child {
                NodeOrToken::Node(node) => node.for_each_token(visit),
                NodeOrToken::Token(token) => visit(token),
            }
        }
    }

    /// Whether any token under this node was synthesized during recovery.
    #[must_use]
    pub fn contains_missing_token(&self) -> bool {
        let mut found = false;
        self.for_each_token(&mut |token| found |= token.missing);
        found
    }
}

impl Node {
    /// The single code unit of a one-unit token child, looked up in `text`.
    pub(crate) fn token_unit(token: &Token, text: &[u16]) -> Option<u16> {
        if token.missing || token.span.len() != 1 {
            return None;
        }
        text.get(token.span.start).copied()
    }

    /// Whether this node is an escaped literal `-`, as produced inside
    /// character classes.
    pub(crate) fn is_escaped_minus(&self, text: &[u16]) -> bool {
        self.kind == NodeKind::SimpleEscape
            && self.token_at(1).is_some_and(|token| {
                token.kind == TokenKind::Text
                    && Self::token_unit(token, text) == Some(u16::from(b'-'))
            })
    }
}

//! Pattern tokens and trivia.

use super::super::span::Span;

/// The kind of a [`Token`].
///
/// Structural punctuation gets its own kind so the parser can dispatch on it;
/// everything else is [`Text`](TokenKind::Text). Multi-character tokens
/// (numbers, capture names, option runs, category names) are only produced by
/// the raw scanning entry points, never by [`scan_next_token`].
///
/// [`scan_next_token`]: super::Lexer::scan_next_token
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenKind {
    Text,
    Number,
    CaptureName,
    OptionsText,
    EscapeCategory,
    EndOfFile,
    Bar,
    Dot,
    Caret,
    Dollar,
    Backslash,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    Comma,
    Colon,
    Equals,
    Exclamation,
    LessThan,
    GreaterThan,
    Minus,
    SingleQuote,
    Question,
    Asterisk,
    Plus,
}

/// The kind of a [`Trivia`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TriviaKind {
    /// Whitespace skipped under `IGNORE_PATTERN_WHITESPACE`.
    Whitespace,
    /// A `(?#...)` comment, or a `#...` end-of-line comment in free-spacing
    /// mode.
    Comment,
}

/// Non-semantic source text attached to the token that follows it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Trivia {
    pub kind: TriviaKind,
    pub span: Span,
}

impl Trivia {
    #[must_use]
    pub const fn new(kind: TriviaKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// A leaf of the syntax tree.
///
/// The token does not own its text; `span` indexes the original pattern.
/// Number tokens additionally carry their parsed value, which can differ from
/// the literal digits once int32 wrapping applies.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Parsed numeric value for [`TokenKind::Number`] tokens.
    pub value: Option<i32>,
    pub leading_trivia: Vec<Trivia>,
    /// Whether this token was synthesized at a zero-width position to keep
    /// the tree well-formed after an error.
    pub missing: bool,
}

impl Token {
    #[must_use]
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self {
            kind,
            span,
            value: None,
            leading_trivia: Vec::new(),
            missing: false,
        }
    }

    #[must_use]
    pub fn with_trivia(kind: TokenKind, span: Span, leading_trivia: Vec<Trivia>) -> Self {
        Self {
            kind,
            span,
            value: None,
            leading_trivia,
            missing: false,
        }
    }

    #[must_use]
    pub fn with_value(kind: TokenKind, span: Span, value: i32) -> Self {
        Self {
            kind,
            span,
            value: Some(value),
            leading_trivia: Vec::new(),
            missing: false,
        }
    }

    /// A synthesized zero-width token at `at`.
    #[must_use]
    pub fn missing(kind: TokenKind, at: usize) -> Self {
        Self {
            kind,
            span: Span::empty(at),
            value: None,
            leading_trivia: Vec::new(),
            missing: true,
        }
    }

    /// Re-tags the token, keeping text, value and trivia. Used when the
    /// parser demotes a structural token to plain text.
    #[must_use]
    pub fn with_kind(mut self, kind: TokenKind) -> Self {
        self.kind = kind;
        self
    }

    /// The token's span extended over its leading trivia.
    #[must_use]
    pub fn full_span(&self) -> Span {
        self.leading_trivia
            .first()
            .map_or(self.span, |trivia| Span::new(trivia.span.start, self.span.end))
    }
}

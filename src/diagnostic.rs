//! Parse diagnostics.
//!
//! Malformed input never aborts the parse; every problem is reported here and
//! a best-effort node is synthesized instead. The message text of each kind
//! reproduces the corresponding .NET regex engine message so that callers see
//! the same wording the runtime engine would produce.

use super::span::Span;

/// A stably-named syntax problem. `Display` yields the fully formatted
/// message text.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum DiagnosticKind {
    // Structural.
    #[error("Not enough )'s")]
    NotEnoughCloseParens,
    #[error("Too many )'s")]
    TooManyCloseParens,
    #[error("Unterminated [] set")]
    UnterminatedCharacterClass,
    #[error("Unterminated (?#...) comment")]
    UnterminatedComment,
    #[error("Pattern is too deeply nested")]
    TooDeeplyNested,

    // Grouping constructs.
    #[error("Unrecognized grouping construct")]
    UnrecognizedGroupingConstruct,
    #[error("Invalid group name: Group names must begin with a word character")]
    InvalidGroupName,
    #[error("Capture number cannot be zero")]
    CaptureNumberCannotBeZero,
    #[error("Capture group numbers must be less than or equal to Int32.MaxValue")]
    CaptureNumberTooLarge,
    #[error("Alternation conditions do not capture and cannot be named")]
    AlternationConditionCaptures,
    #[error("Alternation conditions cannot be comments")]
    AlternationConditionIsComment,
    #[error("Malformed (?(...) condition")]
    MalformedConditional,
    #[error("Too many | in (?()|)")]
    TooManyBarsInConditional,

    // Quantifiers.
    #[error("Quantifier '{0}' following nothing")]
    QuantifierFollowingNothing(char),
    #[error("Nested quantifier '{0}'")]
    NestedQuantifier(char),
    #[error("Illegal {{x,y}} with x > y")]
    IllegalNumericRange,

    // Escapes.
    #[error("Unrecognized escape sequence \\{0}")]
    UnrecognizedEscape(char),
    #[error("Illegal \\ at end of pattern")]
    IllegalEndEscape,
    #[error("Incomplete \\p{{X}} character escape")]
    IncompleteCharacterEscape,
    #[error("Malformed \\p{{X}} character escape")]
    MalformedCharacterEscape,
    #[error("Insufficient hexadecimal digits")]
    InsufficientHexDigits,
    #[error("Missing control character")]
    MissingControlCharacter,
    #[error("Unrecognized control character")]
    UnrecognizedControlCharacter,
    #[error("Malformed \\k<...> named back reference")]
    MalformedNamedBackreference,
    #[error("Unknown property")]
    UnknownProperty,
    #[error("Unknown property '{0}'")]
    UnknownPropertyName(String),

    // Character classes.
    #[error("Cannot include class \\{0} in character range")]
    ClassInCharacterRange(char),
    #[error("A subtraction must be the last element in a character class")]
    SubtractionMustBeLast,
    #[error("[x-y] range in reverse order")]
    ReversedCharacterRange,

    // Reference resolution (appended after the main parse pass).
    #[error("Reference to undefined group number {0}")]
    UndefinedNumberReference(i32),
    #[error("Reference to undefined group name {0}")]
    UndefinedNameReference(String),
    #[error("Reference to undefined group")]
    UndefinedReference,
}

/// A single reported problem: a kind plus the span it covers. The span may be
/// zero-width (an insertion point, e.g. a missing `)` at end of input).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub span: Span,
}

impl Diagnostic {
    #[must_use]
    pub fn new(kind: DiagnosticKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The fully formatted message text.
    #[must_use]
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

/// Append-only accumulator of diagnostics in discovery order. Never an
/// interrupt mechanism: the parser keeps going after every report.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, kind: DiagnosticKind, span: Span) {
        self.diagnostics.push(Diagnostic::new(kind, span));
    }

    /// A rollback point. Speculative scans (failed `{n,m}` quantifiers,
    /// abandoned backreference scans) rewind to their mark so the sink only
    /// ever holds diagnostics for constructs that made it into the tree.
    #[must_use]
    pub fn mark(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn rewind(&mut self, mark: usize) {
        self.diagnostics.truncate(mark);
    }

    /// Whether any reported diagnostic covers part of `span`. Zero-width
    /// insertion-point diagnostics at either edge do not count.
    #[must_use]
    pub(crate) fn overlaps(&self, span: Span) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.span.start < span.end && d.span.end > span.start)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    #[must_use]
    pub fn all(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_interpolation() {
        let d = Diagnostic::new(DiagnosticKind::NestedQuantifier('+'), Span::new(8, 9));
        assert_eq!(d.message(), "Nested quantifier '+'");

        let d = Diagnostic::new(DiagnosticKind::QuantifierFollowingNothing('*'), Span::empty(0));
        assert_eq!(d.message(), "Quantifier '*' following nothing");

        let d = Diagnostic::new(
            DiagnosticKind::UnknownPropertyName("Foo".to_string()),
            Span::new(0, 3),
        );
        assert_eq!(d.message(), "Unknown property 'Foo'");

        let d = Diagnostic::new(DiagnosticKind::ClassInCharacterRange('d'), Span::new(3, 5));
        assert_eq!(d.message(), "Cannot include class \\d in character range");
    }

    #[test]
    fn sink_rewind_discards_speculative_reports() {
        let mut sink = DiagnosticSink::new();
        sink.report(DiagnosticKind::TooManyCloseParens, Span::new(0, 1));
        let mark = sink.mark();
        sink.report(DiagnosticKind::IllegalNumericRange, Span::new(4, 5));
        sink.rewind(mark);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.all()[0].kind, DiagnosticKind::TooManyCloseParens);
    }
}

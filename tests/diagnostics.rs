use resyn::{parse, Diagnostic, DiagnosticKind, Options, Span};

fn diagnostics_of(pattern: &str) -> Vec<Diagnostic> {
    parse(pattern, Options::empty())
        .unwrap_or_else(|err| panic!("options rejected for {pattern:?}: {err}"))
        .diagnostics()
        .to_vec()
}

fn kinds_of(pattern: &str) -> Vec<DiagnosticKind> {
    diagnostics_of(pattern)
        .into_iter()
        .map(|diagnostic| diagnostic.kind)
        .collect()
}

fn single(pattern: &str) -> Diagnostic {
    let mut all = diagnostics_of(pattern);
    assert_eq!(all.len(), 1, "expected one diagnostic for {pattern:?}: {all:?}");
    all.remove(0)
}

#[test]
fn unbalanced_open_paren() {
    let diagnostic = single("(");
    assert_eq!(diagnostic.kind, DiagnosticKind::NotEnoughCloseParens);
    assert_eq!(diagnostic.span, Span::empty(1));
}

#[test]
fn unbalanced_close_paren() {
    let diagnostic = single("a)b");
    assert_eq!(diagnostic.kind, DiagnosticKind::TooManyCloseParens);
    assert_eq!(diagnostic.span, Span::new(1, 2));
}

#[test]
fn unterminated_character_class() {
    let diagnostic = single("[");
    assert_eq!(diagnostic.kind, DiagnosticKind::UnterminatedCharacterClass);
    assert_eq!(diagnostic.span, Span::empty(1));

    let diagnostic = single("[a-z");
    assert_eq!(diagnostic.kind, DiagnosticKind::UnterminatedCharacterClass);
    assert_eq!(diagnostic.span, Span::empty(4));
}

#[test]
fn unterminated_comment() {
    let diagnostic = single("a(?#oops");
    assert_eq!(diagnostic.kind, DiagnosticKind::UnterminatedComment);
    assert_eq!(diagnostic.span, Span::new(1, 8));
}

#[test]
fn quantifier_following_nothing() {
    let diagnostic = single("*a");
    assert_eq!(
        diagnostic.kind,
        DiagnosticKind::QuantifierFollowingNothing('*')
    );
    assert_eq!(diagnostic.span, Span::new(0, 1));

    // An options group is not quantifiable either.
    let diagnostic = single("(?i)*");
    assert_eq!(
        diagnostic.kind,
        DiagnosticKind::QuantifierFollowingNothing('*')
    );
    assert_eq!(diagnostic.span, Span::new(4, 5));
}

#[test]
fn nested_quantifier() {
    let diagnostic = single("^[abcd]*+$");
    assert_eq!(diagnostic.kind, DiagnosticKind::NestedQuantifier('+'));
    assert_eq!(diagnostic.span, Span::new(8, 9));

    // Only the first extra quantifier reports; the rest stack on the
    // already-broken node without new messages.
    assert_eq!(kinds_of("x**"), [DiagnosticKind::NestedQuantifier('*')]);
    assert_eq!(kinds_of("x***"), [DiagnosticKind::NestedQuantifier('*')]);
}

#[test]
fn reversed_numeric_range() {
    let diagnostic = single("a{2,1}");
    assert_eq!(diagnostic.kind, DiagnosticKind::IllegalNumericRange);
    assert_eq!(diagnostic.span, Span::new(4, 5));
}

#[test]
fn class_escape_in_character_range() {
    let diagnostic = single(r"cat([a-\d]*)dog");
    assert_eq!(diagnostic.kind, DiagnosticKind::ClassInCharacterRange('d'));
    assert_eq!(diagnostic.span, Span::new(7, 9));
}

#[test]
fn reversed_character_range() {
    let diagnostic = single("[z-a]");
    assert_eq!(diagnostic.kind, DiagnosticKind::ReversedCharacterRange);
    assert_eq!(diagnostic.span, Span::new(2, 3));
}

#[test]
fn subtraction_must_be_last() {
    let diagnostic = single("[a-[b]c]");
    assert_eq!(diagnostic.kind, DiagnosticKind::SubtractionMustBeLast);
    assert_eq!(diagnostic.span, Span::empty(2));
}

#[test]
fn undefined_references() {
    let diagnostic = single(r"\1");
    assert_eq!(diagnostic.kind, DiagnosticKind::UndefinedNumberReference(1));
    assert_eq!(diagnostic.span, Span::new(1, 2));

    let diagnostic = single(r"\k<missing>");
    assert_eq!(
        diagnostic.kind,
        DiagnosticKind::UndefinedNameReference("missing".to_string())
    );

    let diagnostic = single(r"(?(2)a)");
    assert_eq!(diagnostic.kind, DiagnosticKind::UndefinedReference);
    assert_eq!(diagnostic.span, Span::new(3, 4));
}

#[test]
fn reference_diagnostics_sort_after_syntax_diagnostics() {
    // The named reference appears first in the text, but resolution runs
    // after the whole pattern has been read.
    assert_eq!(
        kinds_of(r"\k<a>("),
        [
            DiagnosticKind::NotEnoughCloseParens,
            DiagnosticKind::UndefinedNameReference("a".to_string()),
        ]
    );
}

#[test]
fn unrecognized_grouping_construct() {
    // The grouping-construct report comes first; the `?` then re-scans as a
    // quantifier with nothing to apply to.
    let all = diagnostics_of("(?r:cat)");
    assert_eq!(
        all.iter().map(|d| d.kind.clone()).collect::<Vec<_>>(),
        [
            DiagnosticKind::UnrecognizedGroupingConstruct,
            DiagnosticKind::QuantifierFollowingNothing('?'),
        ]
    );
    assert_eq!(all[0].span, Span::new(0, 1));
    assert_eq!(all[1].span, Span::new(1, 2));
}

#[test]
fn options_grouping_without_close_paren() {
    assert_eq!(
        kinds_of("(?imn )"),
        [
            DiagnosticKind::UnrecognizedGroupingConstruct,
            DiagnosticKind::TooManyCloseParens,
        ]
    );
    assert_eq!(
        kinds_of("(?imn"),
        [DiagnosticKind::UnrecognizedGroupingConstruct]
    );
}

#[test]
fn empty_question_group_reports_quantifier_not_construct() {
    // `(?)` degrades into a simple group whose `?` is an erroneous
    // quantifier, matching the engine's single-message behavior.
    let diagnostic = single("(?)");
    assert_eq!(
        diagnostic.kind,
        DiagnosticKind::QuantifierFollowingNothing('?')
    );
    assert_eq!(diagnostic.span, Span::new(1, 2));
}

#[test]
fn invalid_group_name() {
    let diagnostic = single("(?<1a>x)");
    assert_eq!(diagnostic.kind, DiagnosticKind::InvalidGroupName);

    let diagnostic = single("(?<>x)");
    assert_eq!(diagnostic.kind, DiagnosticKind::InvalidGroupName);
}

#[test]
fn capture_number_cannot_be_zero() {
    let diagnostic = single("(?<0>x)");
    assert_eq!(diagnostic.kind, DiagnosticKind::CaptureNumberCannotBeZero);
}

#[test]
fn capture_number_too_large() {
    let kinds = kinds_of("(?<2147483648>x)");
    assert!(
        kinds.contains(&DiagnosticKind::CaptureNumberTooLarge),
        "{kinds:?}"
    );
}

#[test]
fn numeric_conditional_must_close_immediately() {
    // The `x` and everything after it fold into the result, so the trailing
    // `)` ends up unbalanced.
    let all = diagnostics_of("(a)(?(1x)b)");
    assert_eq!(
        all.iter().map(|d| d.kind.clone()).collect::<Vec<_>>(),
        [
            DiagnosticKind::MalformedConditional,
            DiagnosticKind::TooManyCloseParens,
        ]
    );
    assert_eq!(all[0].span, Span::new(6, 7));
}

#[test]
fn conditional_head_problems() {
    // A comment condition reports up front, then the `(?#` body cascades
    // through normal grouping recovery.
    assert_eq!(
        kinds_of("(?(?#note)a|b)"),
        [
            DiagnosticKind::AlternationConditionIsComment,
            DiagnosticKind::UnrecognizedGroupingConstruct,
            DiagnosticKind::QuantifierFollowingNothing('?'),
        ]
    );

    let diagnostic = single("(?(?'n'x)a|b)");
    assert_eq!(
        diagnostic.kind,
        DiagnosticKind::AlternationConditionCaptures
    );
    assert_eq!(diagnostic.span, Span::new(0, 1));
}

#[test]
fn too_many_bars_in_conditional() {
    let diagnostic = single("(a)(?(1)b|c|d)");
    assert_eq!(diagnostic.kind, DiagnosticKind::TooManyBarsInConditional);
    assert_eq!(diagnostic.span, Span::new(11, 12));
}

#[test]
fn escape_problems() {
    let diagnostic = single("\\");
    assert_eq!(diagnostic.kind, DiagnosticKind::IllegalEndEscape);

    let diagnostic = single(r"\m");
    assert_eq!(diagnostic.kind, DiagnosticKind::UnrecognizedEscape('m'));

    let diagnostic = single(r"\x4");
    assert_eq!(diagnostic.kind, DiagnosticKind::InsufficientHexDigits);
    assert_eq!(diagnostic.span, Span::new(0, 3));

    let diagnostic = single(r"\c");
    assert_eq!(diagnostic.kind, DiagnosticKind::MissingControlCharacter);

    let diagnostic = single(r"\c1");
    assert_eq!(diagnostic.kind, DiagnosticKind::UnrecognizedControlCharacter);
}

#[test]
fn category_escape_problems() {
    let diagnostic = single(r"\p{Foo}");
    assert_eq!(
        diagnostic.kind,
        DiagnosticKind::UnknownPropertyName("Foo".to_string())
    );

    // Fewer than three characters after `\p` cannot form `{x}`.
    let diagnostic = single(r"\p{}");
    assert_eq!(diagnostic.kind, DiagnosticKind::IncompleteCharacterEscape);
    assert_eq!(diagnostic.span, Span::new(0, 2));

    let diagnostic = single(r"\p{}x");
    assert_eq!(diagnostic.kind, DiagnosticKind::UnknownProperty);

    let diagnostic = single(r"\pcat");
    assert_eq!(diagnostic.kind, DiagnosticKind::MalformedCharacterEscape);

    let diagnostic = single(r"\p{cat");
    assert_eq!(diagnostic.kind, DiagnosticKind::IncompleteCharacterEscape);
}

#[test]
fn malformed_named_backreference() {
    let diagnostic = single(r"\kx");
    assert_eq!(
        diagnostic.kind,
        DiagnosticKind::MalformedNamedBackreference
    );
    assert_eq!(diagnostic.span, Span::new(0, 2));
}

#[test]
fn octal_escape_avoids_backreference_diagnostic() {
    // `\10` with only one group in scope reads as the octal escape for \x08.
    assert!(diagnostics_of(r"(a)\10").is_empty());
}

#[test]
fn failed_quantifier_scan_leaves_no_diagnostics() {
    // `{2,1` never completes, so the reversed-range report from the
    // speculative scan must not survive.
    assert!(diagnostics_of("a{2,1").is_empty());
}

#[test]
fn deep_nesting_reports_once() {
    let pattern = "(".repeat(300);
    let tree = parse(&pattern, Options::empty()).unwrap();
    let nested: Vec<_> = tree
        .diagnostics()
        .iter()
        .filter(|diagnostic| diagnostic.kind == DiagnosticKind::TooDeeplyNested)
        .collect();
    assert_eq!(nested.len(), 1);
}

#[test]
fn message_text_matches_engine_wording() {
    let diagnostic = single("(");
    assert_eq!(diagnostic.message(), "Not enough )'s");

    let diagnostic = single("[");
    assert_eq!(diagnostic.message(), "Unterminated [] set");

    let diagnostic = single(r"cat([a-\d]*)dog");
    assert_eq!(
        diagnostic.message(),
        "Cannot include class \\d in character range"
    );

    // The offending quantifier character is interpolated into the message.
    let diagnostic = single("*a");
    assert_eq!(diagnostic.message(), "Quantifier '*' following nothing");
    let diagnostic = single("?a");
    assert_eq!(diagnostic.message(), "Quantifier '?' following nothing");
}

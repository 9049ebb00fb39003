use resyn::{parse, parse_with, DotnetCategories, Options, RegexTree, TokenKind};

/// Concatenates every leaf token's text, leading trivia included. For any
/// input this must reproduce the pattern exactly.
fn reconstruct(tree: &RegexTree) -> String {
    let mut units: Vec<u16> = Vec::new();
    tree.root().for_each_token(&mut |token| {
        for trivia in &token.leading_trivia {
            units.extend_from_slice(&tree.text()[trivia.span.start..trivia.span.end]);
        }
        units.extend_from_slice(&tree.text()[token.span.start..token.span.end]);
    });
    String::from_utf16_lossy(&units)
}

fn assert_lossless(pattern: &str, options: Options) {
    let tree = parse(pattern, options)
        .unwrap_or_else(|err| panic!("options rejected for {pattern:?}: {err}"));
    assert_eq!(reconstruct(&tree), pattern, "round trip for {pattern:?}");
}

const VALID_PATTERNS: &[&str] = &[
    "",
    "cat",
    "a|b|c",
    "^.$",
    "(a)(b(c))",
    "(?:ab)+?",
    "(?<name>a){2,3}",
    "(?'name'a)",
    "(?<a-b>x)(?<b>y)",
    "(?=a)(?!b)(?<=c)(?<!d)(?>e)",
    "(?i)case",
    "(?imnsx-imnsx:scoped)",
    "(a)(?(1)yes|no)",
    "(?<n>a)(?(n)yes|no)",
    "(?(?=test)a|b)",
    r"\w\W\s\S\d\D\b\B\A\G\Z\z",
    r"\p{Lu}\P{IsGreek}",
    r"\x41A\cA\07\n\t\\\*",
    r"(a)\1(?<n>b)\k<n>\k'n'\<n>\'n'",
    "[abc][^abc][a-z0-9][]a][a-]",
    r"[\d\w][\-a][a\-b]",
    "[a-z-[aeiou]]",
    "[[:alpha:]]",
    "a{2}b{3,}c{4,5}d{,2}",
    "(cat) (?#comment) dog",
];

const ERRONEOUS_PATTERNS: &[&str] = &[
    "(",
    ")",
    "[",
    "[a-",
    "*a",
    "x**",
    "a{2,1}",
    "a{2,1",
    "(?",
    "(?)",
    "(?<",
    "(?<)",
    "(?<>x)",
    "(?')",
    "(?r:cat)",
    "(?imn )",
    "(?imn",
    "(?(",
    "(?()|",
    "(?(cat",
    "(a)(?(1x)b)",
    "(?(?#note)a|b)",
    "(?(?'n'x)a|b)",
    r"\",
    r"\1",
    r"\k",
    r"\k<",
    r"\k<1",
    r"\kx",
    r"\k<missing>",
    r"\x4",
    r"\c",
    r"\c1",
    r"\p",
    r"\p{",
    r"\p{}",
    r"\p{Foo}",
    r"\pcat",
    "cat([a-\\d]*)dog",
    "[z-a]",
    "[a-[b]c]",
    "[a-f-[]]+",
    "(?<0>x)",
    "(?<2147483648>x)",
    "foo(?<1bar)",
    "cat(?<dog<>)_*>dog)",
    "a(?#never closed",
    "^[abcd]*+$",
];

#[test]
fn valid_patterns_round_trip() {
    for pattern in VALID_PATTERNS {
        assert_lossless(pattern, Options::empty());
    }
}

#[test]
fn erroneous_patterns_round_trip() {
    for pattern in ERRONEOUS_PATTERNS {
        assert_lossless(pattern, Options::empty());
    }
}

#[test]
fn free_spacing_round_trips() {
    for pattern in [
        "a b # trailing comment",
        "a\n#line\nb",
        " (?# lead ) x ",
        "[a b]",
    ] {
        assert_lossless(pattern, Options::IGNORE_PATTERN_WHITESPACE);
    }
}

#[test]
fn ecmascript_round_trips() {
    for pattern in [r"(a)\12", r"\070", r"\8", "(a)|(b)"] {
        assert_lossless(pattern, Options::ECMASCRIPT);
    }
}

#[test]
fn astral_characters_round_trip() {
    for pattern in ["😀*", "[😀-😈]", "a😀|b"] {
        assert_lossless(pattern, Options::empty());
    }
}

#[test]
fn deep_nesting_round_trips() {
    let pattern = "(".repeat(300) + &")".repeat(300);
    assert_lossless(&pattern, Options::empty());
    let pattern = "[".repeat(300);
    assert_lossless(&pattern, Options::empty());
}

#[test]
fn missing_tokens_are_zero_width() {
    let tree = parse("(a", Options::empty()).unwrap();
    let mut saw_missing = false;
    tree.root().for_each_token(&mut |token| {
        if token.missing {
            saw_missing = true;
            assert_eq!(token.span.len(), 0);
        }
    });
    assert!(saw_missing);
    assert!(tree.root().contains_missing_token());
}

#[test]
fn compilation_unit_ends_with_eof() {
    let tree = parse("ab", Options::empty()).unwrap();
    let mut last_kind = None;
    tree.root()
        .for_each_token(&mut |token| last_kind = Some(token.kind));
    assert_eq!(last_kind, Some(TokenKind::EndOfFile));
}

#[test]
fn is_valid_reflects_diagnostics() {
    assert!(parse("(a)", Options::empty()).unwrap().is_valid());
    assert!(!parse("(a", Options::empty()).unwrap().is_valid());
}

#[test]
fn reparsing_is_deterministic() {
    for pattern in ["(?<a>x)(?(a)y)*", r"cat([a-\d]*)dog", "(?imn )"] {
        let first = parse(pattern, Options::empty()).unwrap();
        let second = parse(pattern, Options::empty()).unwrap();
        assert_eq!(first.diagnostics(), second.diagnostics(), "{pattern}");
        assert_eq!(reconstruct(&first), reconstruct(&second), "{pattern}");
    }
}

#[test]
fn custom_resolver_is_consulted() {
    struct Nothing;
    impl resyn::CategoryResolver for Nothing {
        fn is_category(&self, _name: &str) -> bool {
            false
        }
    }
    let tree = parse_with(r"\p{Lu}", Options::empty(), &Nothing).unwrap();
    assert!(!tree.is_valid());
    let tree = parse_with(r"\p{Lu}", Options::empty(), &DotnetCategories).unwrap();
    assert!(tree.is_valid());
}

#[test]
fn pattern_accessor_returns_original_text() {
    let tree = parse("a(b", Options::empty()).unwrap();
    assert_eq!(tree.pattern(), "a(b");
    assert_eq!(tree.text_of(resyn::Span::new(1, 3)), "(b");
}

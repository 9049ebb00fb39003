//! The pattern parser.
//!
//! A recursive-descent parser mirroring the reference engine's grammar and
//! its error recovery. Parsing never aborts: every problem becomes a
//! diagnostic and the tree keeps covering the input, with missing tokens
//! standing in for text that should have been there and demoted text tokens
//! standing in for constructs that failed to parse.
//!
//! Parsing runs in two passes. References (`\k<name>`, `(?(1)...)` and
//! friends) may point at groups defined later in the pattern, so the first
//! pass only discovers the capture table; the second parses for real against
//! the finalized table and resolves the references it recorded along the
//! way. Unresolved-reference diagnostics therefore follow all syntax
//! diagnostics.

use super::{
    ast::{Node, NodeKind, NodeOrToken, RegexTree},
    captures::{self, CaptureTable},
    diagnostic::{DiagnosticKind, DiagnosticSink},
    lexer::{unit_char, Lexer, Token, TokenKind},
    options::Options,
    span::Span,
    unicode::{is_word_char, CategoryResolver, DotnetCategories},
    Result, MAX_NESTING_DEPTH,
};

/// Parses `pattern` under `options` with the built-in Unicode category
/// table.
///
/// # Errors
///
/// Returns an error only for option combinations the engine rejects before
/// looking at the pattern; all pattern-level problems surface as diagnostics
/// on the returned tree.
pub fn parse(pattern: &str, options: Options) -> Result<RegexTree> {
    parse_with(pattern, options, &DotnetCategories)
}

/// Parses `pattern` with a caller-supplied `\p{...}` name resolver.
///
/// # Errors
///
/// See [`parse`].
pub fn parse_with(
    pattern: &str,
    options: Options,
    categories: &dyn CategoryResolver,
) -> Result<RegexTree> {
    options.validate()?;
    let text: Vec<u16> = pattern.encode_utf16().collect();

    // Discovery pass: no capture table yet, tree and diagnostics discarded.
    let empty = CaptureTable::default();
    let mut discovery = Parser::new(&text, options, &empty, categories);
    let discovered = discovery.parse_compilation_unit();
    let captures = captures::analyze(&text, &discovered, options);

    let mut parser = Parser::new(&text, options, &captures, categories);
    let root = parser.parse_compilation_unit();
    parser.resolve_pending_references();
    let diagnostics = parser.sink.into_vec();
    Ok(RegexTree::new(text, root, diagnostics, captures, options))
}

/// A capture reference seen during parsing, checked against the capture
/// table once the whole pattern has been read.
enum PendingReference {
    /// `\1`, `(?<-2>...)` and other numeric references.
    Number { value: i32, span: Span },
    /// `\k<name>` and other named references.
    Name { name: String, span: Span },
    /// The numeric head of a `(?(1)...)` conditional, which reports a less
    /// specific message than a backreference does.
    Condition { value: i32, span: Span },
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    text: &'a [u16],
    options: Options,
    current: Token,
    recursion_depth: usize,
    depth_exceeded: bool,
    sink: DiagnosticSink,
    captures: &'a CaptureTable,
    categories: &'a dyn CategoryResolver,
    pending_references: Vec<PendingReference>,
}

impl<'a> Parser<'a> {
    fn new(
        text: &'a [u16],
        options: Options,
        captures: &'a CaptureTable,
        categories: &'a dyn CategoryResolver,
    ) -> Self {
        let mut lexer = Lexer::new(text);
        let mut sink = DiagnosticSink::new();
        let current = lexer.scan_next_token(true, options, &mut sink);
        Self {
            lexer,
            text,
            options,
            current,
            recursion_depth: 0,
            depth_exceeded: false,
            sink,
            captures,
            categories,
            pending_references: Vec::new(),
        }
    }

    // -- plumbing ---------------------------------------------------------

    /// Returns the current token and scans the next one into its place.
    fn consume_current(&mut self, allow_trivia: bool) -> Token {
        let next = self
            .lexer
            .scan_next_token(allow_trivia, self.options, &mut self.sink);
        std::mem::replace(&mut self.current, next)
    }

    fn reset_to_and_consume(&mut self, position: usize, allow_trivia: bool) {
        self.lexer.set_position(position);
        self.consume_current(allow_trivia);
    }

    /// Rewinds the lexer so the current (unconsumed) token gets scanned
    /// again. No-op at end of input.
    fn move_back_before_previous_scan(&mut self) {
        if self.current.kind != TokenKind::EndOfFile {
            self.lexer.set_position(self.lexer.position() - 1);
        }
    }

    fn missing_token(&self, kind: TokenKind) -> Token {
        Token::missing(kind, self.current.span.start)
    }

    /// The character of the current token. Only valid for non-EOF tokens,
    /// which are always one unit wide.
    fn current_char(&self) -> char {
        debug_assert!(self.current.kind != TokenKind::EndOfFile);
        unit_char(self.text[self.current.span.start])
    }

    fn token_text(&self, token: &Token) -> String {
        String::from_utf16_lossy(&self.text[token.span.start..token.span.end])
    }

    /// A zero-width span at the token's start; at end of input this sits
    /// just past the last character.
    fn token_start_span(token: &Token) -> Span {
        Span::empty(token.span.start)
    }

    /// The token's span, collapsed to zero width at end of input.
    fn token_span_including_eof(token: &Token) -> Span {
        if token.kind == TokenKind::EndOfFile {
            Span::empty(token.span.start)
        } else {
            token.span
        }
    }

    /// Records a capture reference for post-parse resolution.
    fn check_capture_reference(&mut self, capture: &Token) {
        match capture.kind {
            TokenKind::Number => {
                if let Some(value) = capture.value {
                    self.pending_references.push(PendingReference::Number {
                        value,
                        span: capture.span,
                    });
                }
            }
            TokenKind::CaptureName => {
                self.pending_references.push(PendingReference::Name {
                    name: self.token_text(capture),
                    span: capture.span,
                });
            }
            _ => {}
        }
    }

    fn resolve_pending_references(&mut self) {
        for pending in std::mem::take(&mut self.pending_references) {
            match pending {
                PendingReference::Number { value, span } if !self.captures.has_number(value) => {
                    self.sink
                        .report(DiagnosticKind::UndefinedNumberReference(value), span);
                }
                PendingReference::Name { name, span } if !self.captures.has_name(&name) => {
                    self.sink
                        .report(DiagnosticKind::UndefinedNameReference(name), span);
                }
                PendingReference::Condition { value, span } if !self.captures.has_number(value) => {
                    self.sink.report(DiagnosticKind::UndefinedReference, span);
                }
                _ => {}
            }
        }
    }

    // -- top level --------------------------------------------------------

    fn parse_compilation_unit(&mut self) -> Node {
        let expression = self.parse_alternating_sequences(true);
        debug_assert!(self.current.kind == TokenKind::EndOfFile);
        let end_of_file = self.current.clone();
        Node::new(
            NodeKind::CompilationUnit,
            vec![expression.into(), end_of_file.into()],
        )
    }

    fn parse_alternating_sequences(&mut self, consume_close_paren: bool) -> Node {
        if self.recursion_depth >= MAX_NESTING_DEPTH {
            return self.consume_remainder_as_text();
        }
        self.recursion_depth += 1;
        let result = self.parse_alternating_sequences_worker(consume_close_paren);
        self.recursion_depth -= 1;
        result
    }

    /// Past the nesting limit the rest of the pattern is consumed as flat
    /// text under a single diagnostic, keeping the tree lossless.
    fn consume_remainder_as_text(&mut self) -> Node {
        if !self.depth_exceeded {
            self.depth_exceeded = true;
            self.sink.report(
                DiagnosticKind::TooDeeplyNested,
                Self::token_start_span(&self.current),
            );
        }
        let mut children = Vec::new();
        while self.current.kind != TokenKind::EndOfFile {
            let token = self.consume_current(false).with_kind(TokenKind::Text);
            children.push(Node::new(NodeKind::Text, vec![token.into()]));
        }
        Node::new(NodeKind::Sequence, self.merge_text_runs(children))
    }

    fn parse_alternating_sequences_worker(&mut self, consume_close_paren: bool) -> Node {
        let mut current = self.parse_sequence(consume_close_paren);
        while self.current.kind == TokenKind::Bar {
            let bar = self.consume_current(true);
            let right = self.parse_sequence(consume_close_paren);
            current = Node::new(
                NodeKind::Alternation,
                vec![current.into(), bar.into(), right.into()],
            );
        }
        current
    }

    fn parse_sequence(&mut self, consume_close_paren: bool) -> Node {
        let mut elements: Vec<Node> = Vec::new();
        while self.should_consume_sequence_element(consume_close_paren) {
            let last_kind = elements.last().map(|node| node.kind);
            elements.push(self.parse_primary_expression_and_quantifiers(last_kind));
        }
        Node::new(NodeKind::Sequence, self.merge_text_runs(elements))
    }

    /// Collapses runs of adjacent single-unit text into one text node, so
    /// `abc` reads as one element instead of three. Tokens that carry trivia
    /// or sit under a reported diagnostic keep their own node.
    fn merge_text_runs(&self, nodes: Vec<Node>) -> Vec<NodeOrToken> {
        let mut merged: Vec<NodeOrToken> = Vec::with_capacity(nodes.len());
        for node in nodes {
            if self.is_mergeable_text(&node)
                && let Some(NodeOrToken::Node(previous)) = merged.last_mut()
                && previous.kind == NodeKind::Text
                && Self::mergeable_token(previous.children.first())
                && !self.overlapping_diagnostic(previous)
                && let Some(NodeOrToken::Token(last)) = previous.children.first_mut()
                && let Some(end) = node.full_span().map(|span| span.end)
            {
                last.span.end = end;
                continue;
            }
            merged.push(node.into());
        }
        merged
    }

    fn is_mergeable_text(&self, node: &Node) -> bool {
        node.kind == NodeKind::Text
            && node.children.len() == 1
            && Self::mergeable_token(node.children.first())
            && !self.overlapping_diagnostic(node)
    }

    fn mergeable_token(child: Option<&NodeOrToken>) -> bool {
        matches!(
            child,
            Some(NodeOrToken::Token(token))
                if token.kind == TokenKind::Text
                    && !token.missing
                    && token.leading_trivia.is_empty()
        )
    }

    fn overlapping_diagnostic(&self, node: &Node) -> bool {
        node.full_span()
            .is_some_and(|span| self.sink.overlaps(span))
    }

    fn should_consume_sequence_element(&self, consume_close_paren: bool) -> bool {
        match self.current.kind {
            TokenKind::EndOfFile | TokenKind::Bar => false,
            TokenKind::CloseParen => consume_close_paren,
            _ => true,
        }
    }

    // -- quantifiers ------------------------------------------------------

    fn parse_primary_expression_and_quantifiers(&mut self, last_kind: Option<NodeKind>) -> Node {
        let current = self.parse_primary_expression(last_kind);
        if current.kind == NodeKind::SimpleOptionsGrouping {
            // Quantifiers never attach to `(?opts)`.
            return current;
        }
        match self.current.kind {
            TokenKind::Asterisk => {
                self.parse_simple_quantifier(current, NodeKind::ZeroOrMoreQuantifier)
            }
            TokenKind::Plus => self.parse_simple_quantifier(current, NodeKind::OneOrMoreQuantifier),
            TokenKind::Question => {
                self.parse_simple_quantifier(current, NodeKind::ZeroOrOneQuantifier)
            }
            TokenKind::OpenBrace => self.try_parse_numeric_quantifier(current),
            _ => current,
        }
    }

    fn parse_simple_quantifier(&mut self, expression: Node, kind: NodeKind) -> Node {
        let token = self.consume_current(true);
        self.try_parse_lazy_quantifier(Node::new(kind, vec![expression.into(), token.into()]))
    }

    fn try_parse_lazy_quantifier(&mut self, quantifier: Node) -> Node {
        if self.current.kind != TokenKind::Question {
            return quantifier;
        }
        let question = self.consume_current(true);
        Node::new(
            NodeKind::LazyQuantifier,
            vec![quantifier.into(), question.into()],
        )
    }

    /// `{...}` only becomes a quantifier when it parses as one completely;
    /// otherwise the brace is plain text and no diagnostics are kept from
    /// the attempt.
    fn try_parse_numeric_quantifier(&mut self, expression: Node) -> Node {
        let open_brace = self.current.clone();
        debug_assert!(open_brace.kind == TokenKind::OpenBrace);
        let start = self.lexer.position();
        let mark = self.sink.mark();

        if let Some((first, comma, second, close_brace)) = self.try_parse_numeric_quantifier_parts()
        {
            let kind = match (&comma, &second) {
                (None, _) => NodeKind::ExactNumericQuantifier,
                (Some(_), None) => NodeKind::OpenRangeNumericQuantifier,
                (Some(_), Some(_)) => NodeKind::ClosedRangeNumericQuantifier,
            };
            let mut children: Vec<NodeOrToken> =
                vec![expression.into(), open_brace.into(), first.into()];
            if let Some(comma) = comma {
                children.push(comma.into());
            }
            if let Some(second) = second {
                children.push(second.into());
            }
            children.push(close_brace.into());
            return self.try_parse_lazy_quantifier(Node::new(kind, children));
        }

        self.sink.rewind(mark);
        self.current = open_brace;
        self.lexer.set_position(start);
        expression
    }

    #[allow(clippy::type_complexity)]
    fn try_parse_numeric_quantifier_parts(
        &mut self,
    ) -> Option<(Token, Option<Token>, Option<Token>, Token)> {
        let first = self.lexer.try_scan_number(&mut self.sink)?;
        self.consume_current(false);

        let mut comma = None;
        let mut second = None;
        if self.current.kind == TokenKind::Comma {
            comma = Some(self.current.clone());
            let after_comma = self.lexer.position();
            match self.lexer.try_scan_number(&mut self.sink) {
                None => self.reset_to_and_consume(after_comma, false),
                Some(second_token) => {
                    self.consume_current(false);
                    let low = first.value.unwrap_or_default();
                    let high = second_token.value.unwrap_or_default();
                    if high < low {
                        self.sink
                            .report(DiagnosticKind::IllegalNumericRange, second_token.span);
                    }
                    second = Some(second_token);
                }
            }
        }

        if self.current.kind != TokenKind::CloseBrace {
            return None;
        }
        let close_brace = self.consume_current(true);
        Some((first, comma, second, close_brace))
    }

    fn check_quantifier_expression(&mut self, last_kind: Option<NodeKind>, token: &Token) {
        match last_kind {
            None | Some(NodeKind::SimpleOptionsGrouping) => {
                let ch = unit_char(self.text[token.span.start]);
                self.sink
                    .report(DiagnosticKind::QuantifierFollowingNothing(ch), token.span);
            }
            Some(kind) if kind.is_quantifier() => {
                let ch = unit_char(self.text[token.span.start]);
                self.sink
                    .report(DiagnosticKind::NestedQuantifier(ch), token.span);
            }
            _ => {}
        }
    }

    // -- primary expressions ----------------------------------------------

    fn parse_primary_expression(&mut self, last_kind: Option<NodeKind>) -> Node {
        match self.current.kind {
            TokenKind::Dot => self.parse_single_token_node(NodeKind::Wildcard),
            TokenKind::Caret => self.parse_single_token_node(NodeKind::StartAnchor),
            TokenKind::Dollar => self.parse_single_token_node(NodeKind::EndAnchor),
            TokenKind::Backslash => {
                let backslash = self.current.clone();
                self.parse_escape(backslash, true)
            }
            TokenKind::OpenBracket => self.parse_character_class(),
            TokenKind::OpenParen => self.parse_grouping(),
            TokenKind::CloseParen => self.parse_unexpected_close_paren(),
            TokenKind::OpenBrace => self.parse_possible_unexpected_numeric_quantifier(last_kind),
            TokenKind::Asterisk | TokenKind::Plus | TokenKind::Question => {
                self.parse_unexpected_quantifier(last_kind)
            }
            _ => self.parse_text(),
        }
    }

    fn parse_single_token_node(&mut self, kind: NodeKind) -> Node {
        let token = self.consume_current(true);
        Node::new(kind, vec![token.into()])
    }

    fn parse_text(&mut self) -> Node {
        let token = self.consume_current(true);
        Node::new(
            NodeKind::Text,
            vec![token.with_kind(TokenKind::Text).into()],
        )
    }

    fn parse_unexpected_close_paren(&mut self) -> Node {
        self.sink
            .report(DiagnosticKind::TooManyCloseParens, self.current.span);
        let token = self.consume_current(true).with_kind(TokenKind::Text);
        Node::new(NodeKind::Text, vec![token.into()])
    }

    fn parse_unexpected_quantifier(&mut self, last_kind: Option<NodeKind>) -> Node {
        let token = self.current.clone();
        self.check_quantifier_expression(last_kind, &token);
        let token = self.consume_current(true).with_kind(TokenKind::Text);
        Node::new(NodeKind::Text, vec![token.into()])
    }

    /// A `{` in primary position: if the braces would have formed a valid
    /// numeric quantifier there is nothing for them to quantify, which is an
    /// error; either way the brace is consumed as text.
    fn parse_possible_unexpected_numeric_quantifier(
        &mut self,
        last_kind: Option<NodeKind>,
    ) -> Node {
        let open_brace = self.current.clone().with_kind(TokenKind::Text);
        let start = self.lexer.position();
        let mark = self.sink.mark();
        let is_quantifier = self.try_parse_numeric_quantifier_parts().is_some();
        self.sink.rewind(mark);
        if is_quantifier {
            self.check_quantifier_expression(last_kind, &open_brace);
        }
        self.reset_to_and_consume(start, true);
        Node::new(NodeKind::Text, vec![open_brace.into()])
    }

    // -- groupings --------------------------------------------------------

    fn parse_grouping(&mut self) -> Node {
        let start = self.lexer.position();
        let open_paren = self.consume_current(false);
        debug_assert!(open_paren.kind == TokenKind::OpenParen);
        if self.current.kind == TokenKind::Question {
            self.parse_grouping_question(open_paren)
        } else {
            self.lexer.set_position(start);
            self.parse_simple_grouping(open_paren)
        }
    }

    fn parse_simple_grouping(&mut self, open_paren: Token) -> Node {
        let expression = self.parse_grouping_embedded_expression(self.options);
        let close_paren = self.parse_grouping_close_paren();
        Node::new(
            NodeKind::SimpleGrouping,
            vec![open_paren.into(), expression.into(), close_paren.into()],
        )
    }

    /// The body of a grouping, parsed under `embedded_options` and restoring
    /// the surrounding options afterwards. Consumes the token before the
    /// body on the way in.
    fn parse_grouping_embedded_expression(&mut self, embedded_options: Options) -> Node {
        let saved = self.options;
        self.options = embedded_options;
        self.consume_current(true);
        let expression = self.parse_alternating_sequences(false);
        self.options = saved;
        expression
    }

    fn parse_grouping_close_paren(&mut self) -> Token {
        if self.current.kind == TokenKind::CloseParen {
            self.consume_current(true)
        } else {
            self.sink.report(
                DiagnosticKind::NotEnoughCloseParens,
                Self::token_start_span(&self.current),
            );
            self.missing_token(TokenKind::CloseParen)
        }
    }

    fn parse_grouping_question(&mut self, open_paren: Token) -> Node {
        let question = self.current.clone();
        if let Some(options_token) = self.lexer.try_scan_options() {
            return self.parse_options_grouping(open_paren, question, options_token);
        }
        let after_question = self.lexer.position();
        self.consume_current(false);
        match self.current.kind {
            TokenKind::LessThan => {
                return self.parse_lookbehind_or_capture_grouping(open_paren, question);
            }
            TokenKind::SingleQuote => {
                let open_token = self.current.clone();
                return self.parse_named_capture_or_balancing_grouping(
                    open_paren, question, open_token,
                );
            }
            TokenKind::OpenParen => {
                return self.parse_conditional_grouping(open_paren, question);
            }
            TokenKind::Colon => {
                return self.parse_simple_construct_grouping(
                    open_paren,
                    question,
                    NodeKind::NonCapturingGrouping,
                    self.options,
                );
            }
            TokenKind::Equals => {
                return self.parse_simple_construct_grouping(
                    open_paren,
                    question,
                    NodeKind::PositiveLookaheadGrouping,
                    self.options - Options::RIGHT_TO_LEFT,
                );
            }
            TokenKind::Exclamation => {
                return self.parse_simple_construct_grouping(
                    open_paren,
                    question,
                    NodeKind::NegativeLookaheadGrouping,
                    self.options - Options::RIGHT_TO_LEFT,
                );
            }
            TokenKind::GreaterThan => {
                return self.parse_simple_construct_grouping(
                    open_paren,
                    question,
                    NodeKind::AtomicGrouping,
                    self.options,
                );
            }
            _ => {
                // `(?)` gets the quantifier-following-nothing error alone.
                if self.current.kind != TokenKind::CloseParen {
                    self.sink.report(
                        DiagnosticKind::UnrecognizedGroupingConstruct,
                        open_paren.span,
                    );
                }
            }
        }
        // Back up over the `?` so it re-scans as an (erroneous) quantifier
        // inside a simple grouping.
        self.lexer.set_position(after_question - 1);
        self.parse_simple_grouping(open_paren)
    }

    fn parse_simple_construct_grouping(
        &mut self,
        open_paren: Token,
        question: Token,
        kind: NodeKind,
        embedded_options: Options,
    ) -> Node {
        let construct = self.current.clone();
        let expression = self.parse_grouping_embedded_expression(embedded_options);
        let close_paren = self.parse_grouping_close_paren();
        Node::new(
            kind,
            vec![
                open_paren.into(),
                question.into(),
                construct.into(),
                expression.into(),
                close_paren.into(),
            ],
        )
    }

    fn parse_options_grouping(
        &mut self,
        open_paren: Token,
        question: Token,
        options_token: Token,
    ) -> Node {
        self.consume_current(false);
        match self.current.kind {
            TokenKind::CloseParen => {
                // `(?opts)` changes options for the rest of the enclosing
                // grouping.
                self.options = self
                    .options
                    .apply_run(&self.text[options_token.span.start..options_token.span.end]);
                let close_paren = self.consume_current(true);
                Node::new(
                    NodeKind::SimpleOptionsGrouping,
                    vec![
                        open_paren.into(),
                        question.into(),
                        options_token.into(),
                        close_paren.into(),
                    ],
                )
            }
            TokenKind::Colon => {
                let colon = self.current.clone();
                let embedded = self
                    .options
                    .apply_run(&self.text[options_token.span.start..options_token.span.end]);
                let expression = self.parse_grouping_embedded_expression(embedded);
                let close_paren = self.parse_grouping_close_paren();
                Node::new(
                    NodeKind::NestedOptionsGrouping,
                    vec![
                        open_paren.into(),
                        question.into(),
                        options_token.into(),
                        colon.into(),
                        expression.into(),
                        close_paren.into(),
                    ],
                )
            }
            _ => {
                self.sink.report(
                    DiagnosticKind::UnrecognizedGroupingConstruct,
                    open_paren.span,
                );
                Node::new(
                    NodeKind::SimpleOptionsGrouping,
                    vec![
                        open_paren.into(),
                        question.into(),
                        options_token.into(),
                        self.missing_token(TokenKind::CloseParen).into(),
                    ],
                )
            }
        }
    }

    fn parse_lookbehind_or_capture_grouping(&mut self, open_paren: Token, question: Token) -> Node {
        let start = self.lexer.position();
        let less_than = self.consume_current(false);
        match self.current.kind {
            TokenKind::Equals => self.parse_lookbehind_grouping(
                open_paren,
                question,
                less_than,
                NodeKind::PositiveLookbehindGrouping,
            ),
            TokenKind::Exclamation => self.parse_lookbehind_grouping(
                open_paren,
                question,
                less_than,
                NodeKind::NegativeLookbehindGrouping,
            ),
            _ => {
                self.lexer.set_position(start);
                self.parse_named_capture_or_balancing_grouping(open_paren, question, less_than)
            }
        }
    }

    fn parse_lookbehind_grouping(
        &mut self,
        open_paren: Token,
        question: Token,
        less_than: Token,
        kind: NodeKind,
    ) -> Node {
        let construct = self.current.clone();
        let expression =
            self.parse_grouping_embedded_expression(self.options | Options::RIGHT_TO_LEFT);
        let close_paren = self.parse_grouping_close_paren();
        Node::new(
            kind,
            vec![
                open_paren.into(),
                question.into(),
                less_than.into(),
                construct.into(),
                expression.into(),
                close_paren.into(),
            ],
        )
    }

    fn parse_named_capture_or_balancing_grouping(
        &mut self,
        open_paren: Token,
        question: Token,
        open_token: Token,
    ) -> Node {
        // Multiple problems can implicate the same open paren; only the
        // first is reported.
        let mut open_paren_diagnosed = false;
        if self.lexer.position() == self.text.len() {
            self.report_grouping_problem_once(
                &mut open_paren_diagnosed,
                DiagnosticKind::UnrecognizedGroupingConstruct,
                open_paren.span.to(open_token.span),
            );
        }

        let capture = match self.lexer.try_scan_number_or_capture_name(&mut self.sink) {
            Some(capture) => capture,
            None => {
                self.consume_current(false);
                let missing_capture =
                    Token::missing(TokenKind::CaptureName, self.current.span.start);
                if self.current.kind == TokenKind::Minus {
                    // An anonymous first capture is fine in a balancing
                    // grouping.
                    return self.parse_balancing_grouping(
                        open_paren,
                        question,
                        open_token,
                        missing_capture,
                        open_paren_diagnosed,
                    );
                }
                self.report_grouping_problem_once(
                    &mut open_paren_diagnosed,
                    DiagnosticKind::InvalidGroupName,
                    Self::token_span_including_eof(&self.current),
                );
                self.move_back_before_previous_scan();
                missing_capture
            }
        };

        if capture.kind == TokenKind::Number && capture.value == Some(0) {
            self.sink
                .report(DiagnosticKind::CaptureNumberCannotBeZero, capture.span);
        }

        self.consume_current(false);
        if self.current.kind == TokenKind::Minus {
            return self.parse_balancing_grouping(
                open_paren,
                question,
                open_token,
                capture,
                open_paren_diagnosed,
            );
        }

        let close_token = self.parse_capture_grouping_close_token(
            &mut open_paren_diagnosed,
            &open_paren,
            &open_token,
        );
        let expression = self.parse_grouping_embedded_expression(self.options);
        let close_paren = self.parse_grouping_close_paren();
        Node::new(
            NodeKind::CaptureGrouping,
            vec![
                open_paren.into(),
                question.into(),
                open_token.into(),
                capture.into(),
                close_token.into(),
                expression.into(),
                close_paren.into(),
            ],
        )
    }

    fn parse_balancing_grouping(
        &mut self,
        open_paren: Token,
        question: Token,
        open_token: Token,
        first_capture: Token,
        mut open_paren_diagnosed: bool,
    ) -> Node {
        let minus = self.current.clone();
        debug_assert!(minus.kind == TokenKind::Minus);
        let second_capture = match self.lexer.try_scan_number_or_capture_name(&mut self.sink) {
            Some(capture) => capture,
            None => {
                self.consume_current(false);
                let missing_capture =
                    Token::missing(TokenKind::CaptureName, self.current.span.start);
                self.report_grouping_problem_once(
                    &mut open_paren_diagnosed,
                    DiagnosticKind::InvalidGroupName,
                    Self::token_span_including_eof(&self.current),
                );
                self.move_back_before_previous_scan();
                missing_capture
            }
        };

        // The second capture is a reference, not a definition.
        if !second_capture.missing {
            self.check_capture_reference(&second_capture);
        }

        self.consume_current(false);
        let close_token = self.parse_capture_grouping_close_token(
            &mut open_paren_diagnosed,
            &open_paren,
            &open_token,
        );
        let expression = self.parse_grouping_embedded_expression(self.options);
        let close_paren = self.parse_grouping_close_paren();
        Node::new(
            NodeKind::BalancingGrouping,
            vec![
                open_paren.into(),
                question.into(),
                open_token.into(),
                first_capture.into(),
                minus.into(),
                second_capture.into(),
                close_token.into(),
                expression.into(),
                close_paren.into(),
            ],
        )
    }

    fn parse_capture_grouping_close_token(
        &mut self,
        open_paren_diagnosed: &mut bool,
        open_paren: &Token,
        open_token: &Token,
    ) -> Token {
        let wanted = if open_token.kind == TokenKind::LessThan {
            TokenKind::GreaterThan
        } else {
            TokenKind::SingleQuote
        };
        if self.current.kind == wanted {
            // Not consumed here; parsing the grouping body moves past it.
            return self.current.clone();
        }
        if self.current.kind == TokenKind::EndOfFile {
            self.report_grouping_problem_once(
                open_paren_diagnosed,
                DiagnosticKind::UnrecognizedGroupingConstruct,
                open_paren.span.to(open_token.span),
            );
        } else {
            self.report_grouping_problem_once(
                open_paren_diagnosed,
                DiagnosticKind::InvalidGroupName,
                self.current.span,
            );
            // The bogus character stays for the grouping body to consume.
            self.lexer.set_position(self.lexer.position() - 1);
        }
        Token::missing(wanted, self.current.span.start)
    }

    fn report_grouping_problem_once(
        &mut self,
        already_reported: &mut bool,
        kind: DiagnosticKind,
        span: Span,
    ) {
        if !*already_reported {
            *already_reported = true;
            self.sink.report(kind, span);
        }
    }

    // -- conditionals -----------------------------------------------------

    fn parse_conditional_grouping(&mut self, open_paren: Token, question: Token) -> Node {
        let inner_open_paren = self.current.clone();
        debug_assert!(inner_open_paren.kind == TokenKind::OpenParen);
        let after_inner_open = self.lexer.position();

        let Some(capture) = self.lexer.try_scan_number_or_capture_name(&mut self.sink) else {
            return self.parse_conditional_expression_grouping(open_paren, question);
        };

        if capture.kind == TokenKind::Number {
            // A numeric condition must close immediately.
            self.consume_current(false);
            let inner_close_paren;
            if self.current.kind == TokenKind::CloseParen {
                inner_close_paren = self.current.clone();
                if let Some(value) = capture.value {
                    self.pending_references.push(PendingReference::Condition {
                        value,
                        span: capture.span,
                    });
                }
            } else {
                inner_close_paren = Token::missing(TokenKind::CloseParen, self.current.span.start);
                self.sink
                    .report(DiagnosticKind::MalformedConditional, capture.span);
                self.move_back_before_previous_scan();
            }
            self.consume_current(true);
            let result = self.parse_conditional_grouping_result();
            let close_paren = self.parse_grouping_close_paren();
            return Node::new(
                NodeKind::ConditionalCaptureGrouping,
                vec![
                    open_paren.into(),
                    question.into(),
                    inner_open_paren.into(),
                    capture.into(),
                    inner_close_paren.into(),
                    result.into(),
                    close_paren.into(),
                ],
            );
        }

        // A name only makes a capture condition when it refers to a real
        // group and closes immediately; otherwise the head is an expression.
        let name = self.token_text(&capture);
        if !self.captures.has_name(&name) {
            self.lexer.set_position(after_inner_open);
            return self.parse_conditional_expression_grouping(open_paren, question);
        }
        self.consume_current(false);
        if self.current.kind != TokenKind::CloseParen {
            self.lexer.set_position(after_inner_open);
            return self.parse_conditional_expression_grouping(open_paren, question);
        }
        let inner_close_paren = self.current.clone();
        self.consume_current(true);
        let result = self.parse_conditional_grouping_result();
        let close_paren = self.parse_grouping_close_paren();
        Node::new(
            NodeKind::ConditionalCaptureGrouping,
            vec![
                open_paren.into(),
                question.into(),
                inner_open_paren.into(),
                capture.into(),
                inner_close_paren.into(),
                result.into(),
                close_paren.into(),
            ],
        )
    }

    /// The expression form of a conditional. On entry the lexer sits just
    /// after the condition's open paren; the paren is re-scanned as part of
    /// the condition grouping.
    fn parse_conditional_expression_grouping(
        &mut self,
        open_paren: Token,
        question: Token,
    ) -> Node {
        self.lexer.set_position(self.lexer.position() - 1);

        // Conditions that are comments or captures are legal syntax but can
        // never influence the match, which the engine calls out up front.
        if self.lexer.is_at("(?#") {
            let position = self.lexer.position();
            let mark = self.sink.mark();
            let _ = self.lexer.scan_comment(Options::empty(), &mut self.sink);
            self.lexer.set_position(position);
            if self.sink.mark() == mark {
                self.sink.report(
                    DiagnosticKind::AlternationConditionIsComment,
                    open_paren.span,
                );
            }
            // An unterminated comment keeps its own diagnostic instead.
        } else if self.lexer.is_at("(?'")
            || (self.lexer.is_at("(?<") && !self.lexer.is_at("(?<!") && !self.lexer.is_at("(?<="))
        {
            self.sink.report(
                DiagnosticKind::AlternationConditionCaptures,
                open_paren.span,
            );
        }

        self.consume_current(false);
        debug_assert!(self.current.kind == TokenKind::OpenParen);
        let grouping = self.parse_grouping();
        let result = self.parse_conditional_grouping_result();
        let close_paren = self.parse_grouping_close_paren();
        Node::new(
            NodeKind::ConditionalExpressionGrouping,
            vec![
                open_paren.into(),
                question.into(),
                grouping.into(),
                result.into(),
                close_paren.into(),
            ],
        )
    }

    fn parse_conditional_grouping_result(&mut self) -> Node {
        let saved = self.options;
        let result = self.parse_alternating_sequences(false);
        self.options = saved;
        self.check_conditional_alternation(result)
    }

    /// A conditional allows at most one `|` in its result.
    fn check_conditional_alternation(&mut self, result: Node) -> Node {
        if result.kind == NodeKind::Alternation
            && result
                .node_at(0)
                .is_some_and(|left| left.kind == NodeKind::Alternation)
        {
            if let Some(bar) = result.token_at(1) {
                self.sink
                    .report(DiagnosticKind::TooManyBarsInConditional, bar.span);
            }
        }
        result
    }

    // -- escapes ----------------------------------------------------------

    /// On entry `backslash` is the current token; the character after it has
    /// not been consumed yet.
    fn parse_escape(&mut self, backslash: Token, allow_trivia_after_end: bool) -> Node {
        self.consume_current(false);
        if self.current.kind == TokenKind::EndOfFile {
            self.sink
                .report(DiagnosticKind::IllegalEndEscape, backslash.span);
            return Node::new(
                NodeKind::SimpleEscape,
                vec![backslash.into(), self.missing_token(TokenKind::Text).into()],
            );
        }
        match self.current_char() {
            'b' | 'B' | 'A' | 'G' | 'Z' | 'z' => {
                let type_token = self.consume_current(allow_trivia_after_end);
                Node::new(
                    NodeKind::AnchorEscape,
                    vec![backslash.into(), type_token.into()],
                )
            }
            'w' | 'W' | 's' | 'S' | 'd' | 'D' => {
                let type_token = self.consume_current(allow_trivia_after_end);
                Node::new(
                    NodeKind::CharacterClassEscape,
                    vec![backslash.into(), type_token.into()],
                )
            }
            'p' | 'P' => self.parse_category_escape(backslash, allow_trivia_after_end),
            _ => {
                // Re-scan the character through the general backslash path.
                self.lexer.set_position(self.lexer.position() - 1);
                self.parse_basic_backslash(backslash, allow_trivia_after_end)
            }
        }
    }

    fn parse_basic_backslash(&mut self, backslash: Token, allow_trivia_after_end: bool) -> Node {
        self.consume_current(false);
        if self.current.kind == TokenKind::EndOfFile {
            self.sink
                .report(DiagnosticKind::IllegalEndEscape, backslash.span);
            return Node::new(
                NodeKind::SimpleEscape,
                vec![backslash.into(), self.missing_token(TokenKind::Text).into()],
            );
        }
        let ch = self.current_char();
        if ch == 'k' {
            return self.parse_possible_k_capture_escape(backslash, allow_trivia_after_end);
        }
        if ch == '<' || ch == '\'' {
            self.lexer.set_position(self.lexer.position() - 1);
            return self.parse_possible_capture_escape(backslash, allow_trivia_after_end);
        }
        if ch.is_ascii_digit() && ch != '0' {
            self.lexer.set_position(self.lexer.position() - 1);
            return self.parse_possible_backreference_escape(backslash, allow_trivia_after_end);
        }
        self.lexer.set_position(self.lexer.position() - 1);
        self.parse_character_escape(backslash, allow_trivia_after_end)
    }

    fn parse_possible_backreference_escape(
        &mut self,
        backslash: Token,
        allow_trivia_after_end: bool,
    ) -> Node {
        if self.options.contains(Options::ECMASCRIPT) {
            self.parse_possible_ecmascript_backreference_escape(backslash, allow_trivia_after_end)
        } else {
            self.parse_possible_regular_backreference_escape(backslash, allow_trivia_after_end)
        }
    }

    /// ECMAScript numbering takes the longest digit prefix naming an
    /// existing group, falling back to an octal or literal escape.
    fn parse_possible_ecmascript_backreference_escape(
        &mut self,
        backslash: Token,
        allow_trivia_after_end: bool,
    ) -> Node {
        let start = self.lexer.position();
        let mut best_position = None;
        let mut best_value = 0;
        let mut value: i32 = 0;
        let mut position = start;
        while let Some(&unit) = self.text.get(position)
            && (0x30..=0x39).contains(&unit)
        {
            position += 1;
            value = value.wrapping_mul(10).wrapping_add(i32::from(unit - 0x30));
            if self.captures.has_number(value) {
                best_position = Some(position);
                best_value = value;
            }
        }
        if let Some(best) = best_position {
            let number = Token::with_value(TokenKind::Number, Span::new(start, best), best_value);
            self.reset_to_and_consume(best, allow_trivia_after_end);
            return Node::new(
                NodeKind::BackreferenceEscape,
                vec![backslash.into(), number.into()],
            );
        }
        self.lexer.set_position(start);
        self.parse_character_escape(backslash, allow_trivia_after_end)
    }

    fn parse_possible_regular_backreference_escape(
        &mut self,
        backslash: Token,
        allow_trivia_after_end: bool,
    ) -> Node {
        let start = self.lexer.position();
        let mark = self.sink.mark();
        let Some(number) = self.lexer.try_scan_number(&mut self.sink) else {
            return self.parse_character_escape(backslash, allow_trivia_after_end);
        };
        let value = number.value.unwrap_or_default();
        if self.captures.has_number(value) || value <= 9 {
            self.check_capture_reference(&number);
            self.consume_current(allow_trivia_after_end);
            return Node::new(
                NodeKind::BackreferenceEscape,
                vec![backslash.into(), number.into()],
            );
        }
        self.sink.rewind(mark);
        self.lexer.set_position(start);
        self.parse_character_escape(backslash, allow_trivia_after_end)
    }

    fn parse_possible_capture_escape(
        &mut self,
        backslash: Token,
        allow_trivia_after_end: bool,
    ) -> Node {
        let after_backslash = self.lexer.position();
        let mark = self.sink.mark();
        let (open_token, capture, close_token) = self.scan_capture_parts(allow_trivia_after_end);
        if open_token.missing || capture.missing || close_token.missing {
            self.sink.rewind(mark);
            self.lexer.set_position(after_backslash);
            return self.parse_character_escape(backslash, allow_trivia_after_end);
        }
        Node::new(
            NodeKind::CaptureEscape,
            vec![
                backslash.into(),
                open_token.into(),
                capture.into(),
                close_token.into(),
            ],
        )
    }

    fn parse_possible_k_capture_escape(
        &mut self,
        backslash: Token,
        allow_trivia_after_end: bool,
    ) -> Node {
        let type_token = self.current.clone();
        let after_backslash = self.lexer.position() - 1;
        let mark = self.sink.mark();
        let (open_token, capture, close_token) = self.scan_capture_parts(allow_trivia_after_end);
        if open_token.missing {
            self.sink.report(
                DiagnosticKind::MalformedNamedBackreference,
                backslash.span.to(type_token.span),
            );
            return Node::new(
                NodeKind::SimpleEscape,
                vec![
                    backslash.into(),
                    type_token.with_kind(TokenKind::Text).into(),
                ],
            );
        }
        if capture.missing || close_token.missing {
            self.sink.rewind(mark);
            // Fall back to treating the `k` itself as a character escape.
            self.lexer.set_position(after_backslash);
            return self.parse_character_escape(backslash, allow_trivia_after_end);
        }
        Node::new(
            NodeKind::KCaptureEscape,
            vec![
                backslash.into(),
                type_token.into(),
                open_token.into(),
                capture.into(),
                close_token.into(),
            ],
        )
    }

    /// Scans `<name>` or `'name'` after a reference escape. Missing tokens
    /// mark whichever parts were absent; the reference is only recorded when
    /// all parts are present.
    fn scan_capture_parts(&mut self, allow_trivia_after_end: bool) -> (Token, Token, Token) {
        self.consume_current(false);
        let in_bounds = self.lexer.position() < self.text.len();
        if !(in_bounds
            && matches!(
                self.current.kind,
                TokenKind::LessThan | TokenKind::SingleQuote
            ))
        {
            return (
                Token::missing(TokenKind::LessThan, self.current.span.start),
                Token::missing(TokenKind::CaptureName, self.current.span.start),
                Token::missing(TokenKind::GreaterThan, self.current.span.start),
            );
        }
        let open_token = self.current.clone();
        let wanted = if open_token.kind == TokenKind::LessThan {
            TokenKind::GreaterThan
        } else {
            TokenKind::SingleQuote
        };
        let capture = self
            .lexer
            .try_scan_number_or_capture_name(&mut self.sink)
            .unwrap_or_else(|| Token::missing(TokenKind::CaptureName, self.lexer.position()));
        self.consume_current(false);
        if !capture.missing && self.current.kind == wanted {
            self.check_capture_reference(&capture);
            let close_token = self.consume_current(allow_trivia_after_end);
            return (open_token, capture, close_token);
        }
        (
            open_token,
            capture,
            Token::missing(wanted, self.current.span.start),
        )
    }

    fn parse_character_escape(&mut self, backslash: Token, allow_trivia_after_end: bool) -> Node {
        self.consume_current(false);
        if self.current.kind == TokenKind::EndOfFile {
            self.sink
                .report(DiagnosticKind::IllegalEndEscape, backslash.span);
            return Node::new(
                NodeKind::SimpleEscape,
                vec![backslash.into(), self.missing_token(TokenKind::Text).into()],
            );
        }
        let ch = self.current_char();
        if ('0'..='7').contains(&ch) {
            self.lexer.set_position(self.lexer.position() - 1);
            let octal = self.lexer.scan_octal_digits(self.options);
            self.consume_current(allow_trivia_after_end);
            return Node::new(NodeKind::OctalEscape, vec![backslash.into(), octal.into()]);
        }
        match ch {
            'a' | 'b' | 'e' | 'f' | 'n' | 'r' | 't' | 'v' => {
                let type_token = self.consume_current(allow_trivia_after_end);
                Node::new(
                    NodeKind::SimpleEscape,
                    vec![backslash.into(), type_token.into()],
                )
            }
            'x' => self.parse_hex_escape(backslash, allow_trivia_after_end, 2, NodeKind::HexEscape),
            'u' => {
                self.parse_hex_escape(backslash, allow_trivia_after_end, 4, NodeKind::UnicodeEscape)
            }
            'c' => self.parse_control_escape(backslash, allow_trivia_after_end),
            _ => {
                let is_unrecognized = !self.options.contains(Options::ECMASCRIPT)
                    && is_word_char(self.text[self.current.span.start]);
                let type_token = self
                    .consume_current(allow_trivia_after_end)
                    .with_kind(TokenKind::Text);
                if is_unrecognized {
                    self.sink
                        .report(DiagnosticKind::UnrecognizedEscape(ch), type_token.span);
                }
                Node::new(
                    NodeKind::SimpleEscape,
                    vec![backslash.into(), type_token.into()],
                )
            }
        }
    }

    fn parse_hex_escape(
        &mut self,
        backslash: Token,
        allow_trivia_after_end: bool,
        digit_count: usize,
        kind: NodeKind,
    ) -> Node {
        let type_token = self.current.clone();
        let digits = self.lexer.scan_hex_digits(digit_count, &mut self.sink);
        self.consume_current(allow_trivia_after_end);
        Node::new(
            kind,
            vec![backslash.into(), type_token.into(), digits.into()],
        )
    }

    fn parse_control_escape(&mut self, backslash: Token, allow_trivia_after_end: bool) -> Node {
        let type_token = self.consume_current(false);
        if self.current.kind == TokenKind::EndOfFile {
            self.sink
                .report(DiagnosticKind::MissingControlCharacter, type_token.span);
            return Node::new(
                NodeKind::ControlEscape,
                vec![
                    backslash.into(),
                    type_token.into(),
                    self.missing_token(TokenKind::Text).into(),
                ],
            );
        }
        let mut ch = self.current_char();
        if ch.is_ascii_lowercase() {
            ch = ch.to_ascii_uppercase();
        }
        if ('@'..='_').contains(&ch) {
            let control = self
                .consume_current(allow_trivia_after_end)
                .with_kind(TokenKind::Text);
            Node::new(
                NodeKind::ControlEscape,
                vec![backslash.into(), type_token.into(), control.into()],
            )
        } else {
            // The offending character stays current for the caller to
            // re-parse as an ordinary element.
            self.sink.report(
                DiagnosticKind::UnrecognizedControlCharacter,
                self.current.span,
            );
            let missing = self.missing_token(TokenKind::Text);
            Node::new(
                NodeKind::ControlEscape,
                vec![backslash.into(), type_token.into(), missing.into()],
            )
        }
    }

    fn parse_category_escape(&mut self, backslash: Token, allow_trivia_after_end: bool) -> Node {
        let type_token = self.current.clone();
        let start = self.lexer.position();
        let mark = self.sink.mark();
        match self.try_parse_category_escape_parts(allow_trivia_after_end) {
            Ok((open_brace, category, close_brace)) => Node::new(
                NodeKind::CategoryEscape,
                vec![
                    backslash.into(),
                    type_token.into(),
                    open_brace.into(),
                    category.into(),
                    close_brace.into(),
                ],
            ),
            Err(kind) => {
                self.sink.rewind(mark);
                self.reset_to_and_consume(start, allow_trivia_after_end);
                self.sink.report(kind, backslash.span.to(type_token.span));
                Node::new(
                    NodeKind::SimpleEscape,
                    vec![
                        backslash.into(),
                        type_token.with_kind(TokenKind::Text).into(),
                    ],
                )
            }
        }
    }

    fn try_parse_category_escape_parts(
        &mut self,
        allow_trivia_after_end: bool,
    ) -> std::result::Result<(Token, Token, Token), DiagnosticKind> {
        if self.text.len() - self.lexer.position() < 3 {
            return Err(DiagnosticKind::IncompleteCharacterEscape);
        }
        self.consume_current(false);
        if self.current.kind != TokenKind::OpenBrace {
            return Err(DiagnosticKind::MalformedCharacterEscape);
        }
        let open_brace = self.current.clone();
        let category = self
            .lexer
            .try_scan_escape_category(self.categories, &mut self.sink);
        self.consume_current(false);
        if self.current.kind != TokenKind::CloseBrace {
            return Err(DiagnosticKind::IncompleteCharacterEscape);
        }
        let Some(category) = category else {
            return Err(DiagnosticKind::UnknownProperty);
        };
        let close_brace = self.consume_current(allow_trivia_after_end);
        Ok((open_brace, category, close_brace))
    }

    // -- character classes ------------------------------------------------

    fn parse_character_class(&mut self) -> Node {
        // Subtractions recurse here, so the class parser shares the nesting
        // limit with groupings.
        if self.recursion_depth >= MAX_NESTING_DEPTH {
            return self.consume_remainder_as_text();
        }
        self.recursion_depth += 1;
        let result = self.parse_character_class_worker();
        self.recursion_depth -= 1;
        result
    }

    fn parse_character_class_worker(&mut self) -> Node {
        let open_bracket = self.current.clone();
        debug_assert!(open_bracket.kind == TokenKind::OpenBracket);
        self.consume_current(false);

        let mut caret = None;
        if self.current.kind == TokenKind::Caret {
            caret = Some(self.current.clone());
        } else {
            self.move_back_before_previous_scan();
        }
        self.consume_current(false);

        let mut components: Vec<Node> = Vec::new();
        let mut close_bracket = None;
        while self.current.kind != TokenKind::EndOfFile {
            // `]` only closes a non-empty class; as the first element it is
            // a literal.
            if self.current.kind == TokenKind::CloseBracket && !components.is_empty() {
                close_bracket = Some(self.consume_current(true));
                break;
            }
            self.parse_character_class_components(&mut components);
        }
        let close_bracket = close_bracket.unwrap_or_else(|| {
            self.sink.report(
                DiagnosticKind::UnterminatedCharacterClass,
                Self::token_start_span(&self.current),
            );
            self.missing_token(TokenKind::CloseBracket)
        });

        let contents = Node::new(NodeKind::Sequence, self.merge_text_runs(components));
        match caret {
            Some(caret) => Node::new(
                NodeKind::NegatedCharacterClass,
                vec![
                    open_bracket.into(),
                    caret.into(),
                    contents.into(),
                    close_bracket.into(),
                ],
            ),
            None => Node::new(
                NodeKind::CharacterClass,
                vec![open_bracket.into(), contents.into(), close_bracket.into()],
            ),
        }
    }

    fn parse_character_class_components(&mut self, components: &mut Vec<Node>) {
        let left_mark = self.sink.mark();
        let left = self.parse_single_character_class_component(components.is_empty(), false);
        let left_has_problem = self.sink.mark() > left_mark || left.contains_missing_token();

        if left.kind == NodeKind::CharacterClassEscape
            || left.kind == NodeKind::CategoryEscape
            || left.is_escaped_minus(self.text)
        {
            // Class escapes are never the left side of a range.
            components.push(left);
            return;
        }

        if self.current.kind == TokenKind::Minus && !self.lexer.is_at("]") {
            let minus = self.consume_current(false);
            if self.current.kind == TokenKind::OpenBracket {
                components.push(left);
                components.push(self.parse_character_class_subtraction(minus));
            } else {
                let right_mark = self.sink.mark();
                let right = self.parse_right_side_of_character_class_range();
                let right_has_problem =
                    self.sink.mark() > right_mark || right.contains_missing_token();
                if !left_has_problem
                    && !right_has_problem
                    && let (Some(low), Some(high)) = (
                        self.range_component_value(&left),
                        self.range_component_value(&right),
                    )
                    && low > high
                {
                    self.sink
                        .report(DiagnosticKind::ReversedCharacterRange, minus.span);
                }
                components.push(Node::new(
                    NodeKind::CharacterClassRange,
                    vec![left.into(), minus.into(), right.into()],
                ));
            }
        } else {
            components.push(left);
        }
    }

    /// The right side of a range. A chain of escaped minuses groups into a
    /// sequence so `[a-\-\-b]` keeps its shape.
    fn parse_right_side_of_character_class_range(&mut self) -> Node {
        let first = self.parse_single_character_class_component(false, true);
        if !first.is_escaped_minus(self.text) {
            return first;
        }
        let mut parts = vec![first];
        while parts
            .last()
            .is_some_and(|last| last.is_escaped_minus(self.text))
            && self.current.kind != TokenKind::CloseBracket
            && self.current.kind != TokenKind::EndOfFile
        {
            parts.push(self.parse_single_character_class_component(false, true));
        }
        Node::new(
            NodeKind::Sequence,
            parts.into_iter().map(NodeOrToken::from).collect(),
        )
    }

    fn parse_single_character_class_component(
        &mut self,
        is_first: bool,
        after_range_minus: bool,
    ) -> Node {
        if self.current.kind == TokenKind::Backslash && self.lexer.position() < self.text.len() {
            let backslash = self.current.clone();
            self.consume_current(false);
            let ch = self.current_char();
            match ch {
                'D' | 'd' | 'S' | 's' | 'W' | 'w' | 'p' | 'P' => {
                    if after_range_minus {
                        self.sink.report(
                            DiagnosticKind::ClassInCharacterRange(ch),
                            backslash.span.to(self.current.span),
                        );
                    }
                    self.lexer.set_position(self.lexer.position() - 1);
                    return self.parse_escape(backslash, false);
                }
                '-' => {
                    // An escaped minus is literal, never a range or
                    // subtraction operator.
                    let type_token = self.consume_current(false).with_kind(TokenKind::Text);
                    return Node::new(
                        NodeKind::SimpleEscape,
                        vec![backslash.into(), type_token.into()],
                    );
                }
                _ => {
                    self.lexer.set_position(self.lexer.position() - 1);
                    return self.parse_character_escape(backslash, false);
                }
            }
        }

        if !after_range_minus
            && !is_first
            && self.current.kind == TokenKind::Minus
            && self.lexer.is_at("[")
        {
            let minus = self.consume_current(false);
            return self.parse_character_class_subtraction(minus);
        }

        if !after_range_minus && self.current.kind == TokenKind::OpenBracket && self.lexer.is_at(":")
        {
            if let Some(posix) = self.try_parse_posix_property() {
                return posix;
            }
        }

        let token = self.consume_current(false).with_kind(TokenKind::Text);
        Node::new(NodeKind::Text, vec![token.into()])
    }

    /// `[:name:]` inside a class. Only the exact shape is recognized;
    /// anything else falls back to a literal `[`.
    fn try_parse_posix_property(&mut self) -> Option<Node> {
        let before_bracket = self.lexer.position() - 1;
        self.consume_current(false);
        debug_assert!(self.current.kind == TokenKind::Colon);
        let name = self.lexer.try_scan_capture_name();
        if name.is_some() && self.lexer.is_at(":]") {
            self.lexer.set_position(self.lexer.position() + 2);
            let token = Token::new(
                TokenKind::Text,
                Span::new(before_bracket, self.lexer.position()),
            );
            self.consume_current(false);
            return Some(Node::new(NodeKind::PosixProperty, vec![token.into()]));
        }
        self.reset_to_and_consume(before_bracket, false);
        None
    }

    fn parse_character_class_subtraction(&mut self, minus: Token) -> Node {
        let class = self.parse_character_class();
        if self.current.kind != TokenKind::CloseBracket
            && self.current.kind != TokenKind::EndOfFile
        {
            self.sink.report(
                DiagnosticKind::SubtractionMustBeLast,
                Span::empty(minus.span.start),
            );
        }
        Node::new(
            NodeKind::CharacterClassSubtraction,
            vec![minus.into(), class.into()],
        )
    }

    /// The code-unit value a range endpoint denotes, when it has one.
    fn range_component_value(&self, component: &Node) -> Option<u32> {
        match component.kind {
            NodeKind::Text => component
                .token_at(0)
                .and_then(|token| Node::token_unit(token, self.text))
                .map(u32::from),
            NodeKind::SimpleEscape => component
                .token_at(1)
                .and_then(|token| Node::token_unit(token, self.text))
                .map(|unit| map_escape_char(unit_char(unit))),
            NodeKind::ControlEscape => component
                .token_at(2)
                .and_then(|token| Node::token_unit(token, self.text))
                .map(|unit| {
                    let ch = unit_char(unit).to_ascii_uppercase();
                    (ch as u32) - ('A' as u32) + 1
                }),
            NodeKind::OctalEscape => component
                .token_at(1)
                .map(|token| self.token_digits_value(token, 8)),
            NodeKind::HexEscape | NodeKind::UnicodeEscape => component
                .token_at(2)
                .map(|token| self.token_digits_value(token, 16)),
            NodeKind::PosixProperty => Some(u32::from(b'[')),
            NodeKind::Sequence => component
                .child_nodes()
                .last()
                .filter(|last| !last.is_escaped_minus(self.text))
                .and_then(|last| self.range_component_value(last)),
            _ => None,
        }
    }

    /// Digits accumulate into a 16-bit value with wrapping, matching the
    /// reference engine's unchecked char arithmetic.
    fn token_digits_value(&self, token: &Token, radix: u32) -> u32 {
        let mut value: u16 = 0;
        for &unit in &self.text[token.span.start..token.span.end] {
            let digit = unit_char(unit).to_digit(radix).unwrap_or(0);
            value = value
                .wrapping_mul(radix as u16)
                .wrapping_add(digit as u16);
        }
        u32::from(value)
    }
}

/// The character a simple escape denotes; unrecognized letters map to
/// themselves.
fn map_escape_char(ch: char) -> u32 {
    match ch {
        'a' => 0x07,
        'b' => 0x08,
        'e' => 0x1B,
        'f' => 0x0C,
        'n' => 0x0A,
        'r' => 0x0D,
        't' => 0x09,
        'v' => 0x0B,
        _ => ch as u32,
    }
}

//! The pattern lexer.
//!
//! The lexer works over UTF-16 code units so every span matches the indexing
//! a .NET `string` would use for the same pattern. It is deliberately thin:
//! [`Lexer::scan_next_token`] produces single-unit structural tokens plus
//! leading trivia, and the parser drives the multi-character scans (numbers,
//! capture names, option runs, hex/octal digits, category names) explicitly,
//! resetting the position when a speculative scan does not pan out.

use super::{
    diagnostic::{DiagnosticKind, DiagnosticSink},
    options::Options,
    span::Span,
    unicode::{is_word_char, CategoryResolver},
};

pub mod token;

pub use token::{Token, TokenKind, Trivia, TriviaKind};

/// Lossy conversion of a single code unit for dispatch and diagnostics.
/// Unpaired surrogates come back as U+FFFD, which matches no ASCII arm.
pub(crate) fn unit_char(unit: u16) -> char {
    char::from_u32(u32::from(unit)).unwrap_or('\u{FFFD}')
}

fn is_decimal_digit(unit: u16) -> bool {
    (0x30..=0x39).contains(&unit)
}

fn is_hex_digit(unit: u16) -> bool {
    matches!(unit_char(unit), '0'..='9' | 'a'..='f' | 'A'..='F')
}

fn is_octal_digit(unit: u16) -> bool {
    (0x30..=0x37).contains(&unit)
}

fn is_escape_category_unit(unit: u16) -> bool {
    matches!(unit_char(unit), 'a'..='z' | 'A'..='Z' | '-')
}

fn structural_kind(unit: u16) -> TokenKind {
    match unit_char(unit) {
        '|' => TokenKind::Bar,
        '.' => TokenKind::Dot,
        '^' => TokenKind::Caret,
        '$' => TokenKind::Dollar,
        '\\' => TokenKind::Backslash,
        '(' => TokenKind::OpenParen,
        ')' => TokenKind::CloseParen,
        '[' => TokenKind::OpenBracket,
        ']' => TokenKind::CloseBracket,
        '{' => TokenKind::OpenBrace,
        '}' => TokenKind::CloseBrace,
        ',' => TokenKind::Comma,
        ':' => TokenKind::Colon,
        '=' => TokenKind::Equals,
        '!' => TokenKind::Exclamation,
        '<' => TokenKind::LessThan,
        '>' => TokenKind::GreaterThan,
        '-' => TokenKind::Minus,
        '\'' => TokenKind::SingleQuote,
        '?' => TokenKind::Question,
        '*' => TokenKind::Asterisk,
        '+' => TokenKind::Plus,
        _ => TokenKind::Text,
    }
}

pub struct Lexer<'a> {
    text: &'a [u16],
    position: usize,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(text: &'a [u16]) -> Self {
        Self { text, position: 0 }
    }

    #[must_use]
    pub fn text(&self) -> &'a [u16] {
        self.text
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_position(&mut self, position: usize) {
        debug_assert!(position <= self.text.len());
        self.position = position;
    }

    fn peek(&self) -> Option<u16> {
        self.text.get(self.position).copied()
    }

    /// Whether the text at the current position starts with `needle`.
    /// `needle` must be ASCII so units and chars correspond one to one.
    #[must_use]
    pub fn is_at(&self, needle: &str) -> bool {
        debug_assert!(needle.is_ascii());
        let rest = &self.text[self.position..];
        rest.len() >= needle.len()
            && needle
                .bytes()
                .zip(rest)
                .all(|(expected, &unit)| u16::from(expected) == unit)
    }

    /// Scans the next token, attaching any leading trivia.
    ///
    /// Trivia is only collected when `allow_trivia` is true: whitespace and
    /// `#` line comments require `IGNORE_PATTERN_WHITESPACE`, while `(?#...)`
    /// comments are recognized whenever trivia is allowed at all. An
    /// unterminated `(?#` comment reports a diagnostic but still becomes
    /// trivia so the text stays covered.
    pub fn scan_next_token(
        &mut self,
        allow_trivia: bool,
        options: Options,
        sink: &mut DiagnosticSink,
    ) -> Token {
        let leading_trivia = self.scan_leading_trivia(allow_trivia, options, sink);
        let Some(unit) = self.peek() else {
            return Token::with_trivia(
                TokenKind::EndOfFile,
                Span::empty(self.text.len()),
                leading_trivia,
            );
        };
        let start = self.position;
        self.position += 1;
        Token::with_trivia(
            structural_kind(unit),
            Span::new(start, self.position),
            leading_trivia,
        )
    }

    fn scan_leading_trivia(
        &mut self,
        allow_trivia: bool,
        options: Options,
        sink: &mut DiagnosticSink,
    ) -> Vec<Trivia> {
        let mut trivia = Vec::new();
        if !allow_trivia {
            return trivia;
        }
        loop {
            if let Some(comment) = self.scan_comment(options, sink) {
                trivia.push(comment);
                continue;
            }
            if let Some(whitespace) = self.scan_whitespace(options) {
                trivia.push(whitespace);
                continue;
            }
            break;
        }
        trivia
    }

    /// Scans a `(?#...)` comment, or a `#` end-of-line comment in
    /// free-spacing mode. Public because the parser speculatively probes
    /// conditional-grouping heads with it.
    pub fn scan_comment(&mut self, options: Options, sink: &mut DiagnosticSink) -> Option<Trivia> {
        if self.is_at("(?#") {
            let start = self.position;
            while self.peek().is_some_and(|unit| unit_char(unit) != ')') {
                self.position += 1;
            }
            if self.position == self.text.len() {
                sink.report(
                    DiagnosticKind::UnterminatedComment,
                    Span::new(start, self.text.len()),
                );
            } else {
                self.position += 1;
            }
            return Some(Trivia::new(
                TriviaKind::Comment,
                Span::new(start, self.position),
            ));
        }
        if options.contains(Options::IGNORE_PATTERN_WHITESPACE)
            && self.peek().is_some_and(|unit| unit_char(unit) == '#')
        {
            let start = self.position;
            while self.peek().is_some_and(|unit| unit_char(unit) != '\n') {
                self.position += 1;
            }
            return Some(Trivia::new(
                TriviaKind::Comment,
                Span::new(start, self.position),
            ));
        }
        None
    }

    fn scan_whitespace(&mut self, options: Options) -> Option<Trivia> {
        if !options.contains(Options::IGNORE_PATTERN_WHITESPACE) {
            return None;
        }
        let start = self.position;
        // Everything at or below U+0020 counts, matching the reference
        // engine's free-spacing rule.
        while self.peek().is_some_and(|unit| unit <= 0x20) {
            self.position += 1;
        }
        if self.position == start {
            return None;
        }
        Some(Trivia::new(
            TriviaKind::Whitespace,
            Span::new(start, self.position),
        ))
    }

    /// Scans a run of decimal digits into a number token.
    ///
    /// The value accumulates with int32 wrapping; overflow reports
    /// `CaptureNumberTooLarge` on the token but keeps the wrapped value.
    pub fn try_scan_number(&mut self, sink: &mut DiagnosticSink) -> Option<Token> {
        const MAX_VALUE_DIV_10: i32 = i32::MAX / 10;
        const MAX_VALUE_MOD_10: i32 = i32::MAX % 10;
        let start = self.position;
        let mut value: i32 = 0;
        let mut overflow = false;
        while let Some(unit) = self.peek()
            && is_decimal_digit(unit)
        {
            self.position += 1;
            let digit = i32::from(unit - 0x30);
            if value > MAX_VALUE_DIV_10 || (value == MAX_VALUE_DIV_10 && digit > MAX_VALUE_MOD_10) {
                overflow = true;
            }
            value = value.wrapping_mul(10).wrapping_add(digit);
        }
        if self.position == start {
            return None;
        }
        let token = Token::with_value(TokenKind::Number, Span::new(start, self.position), value);
        if overflow {
            sink.report(DiagnosticKind::CaptureNumberTooLarge, token.span);
        }
        Some(token)
    }

    /// Scans a run of word characters into a capture name token.
    pub fn try_scan_capture_name(&mut self) -> Option<Token> {
        let start = self.position;
        while let Some(unit) = self.peek()
            && is_word_char(unit)
        {
            self.position += 1;
        }
        if self.position == start {
            return None;
        }
        Some(Token::new(
            TokenKind::CaptureName,
            Span::new(start, self.position),
        ))
    }

    /// Scans a capture reference: a number if the first unit is a digit,
    /// otherwise a capture name.
    pub fn try_scan_number_or_capture_name(&mut self, sink: &mut DiagnosticSink) -> Option<Token> {
        if self.peek().is_some_and(is_decimal_digit) {
            self.try_scan_number(sink)
        } else {
            self.try_scan_capture_name()
        }
    }

    /// Scans a run of option letters and `+`/`-` signs.
    pub fn try_scan_options(&mut self) -> Option<Token> {
        let start = self.position;
        while let Some(unit) = self.peek()
            && Options::is_option_code_unit(unit)
        {
            self.position += 1;
        }
        if self.position == start {
            return None;
        }
        Some(Token::new(
            TokenKind::OptionsText,
            Span::new(start, self.position),
        ))
    }

    /// Scans exactly `count` hex digits, stopping early at a non-digit.
    /// Reports `InsufficientHexDigits` over the whole escape when fewer than
    /// `count` were found. The caller guarantees the two units preceding the
    /// digits are the backslash and the escape letter.
    pub fn scan_hex_digits(&mut self, count: usize, sink: &mut DiagnosticSink) -> Token {
        let start = self.position;
        let before_backslash = start - 2;
        while self.position - start < count && self.peek().is_some_and(is_hex_digit) {
            self.position += 1;
        }
        let token = Token::new(TokenKind::Text, Span::new(start, self.position));
        if self.position - start != count {
            sink.report(
                DiagnosticKind::InsufficientHexDigits,
                Span::new(before_backslash, self.position),
            );
        }
        token
    }

    /// Scans up to three octal digits. The caller guarantees at least one is
    /// present. ECMAScript caps the accumulated value at 0x1F.
    pub fn scan_octal_digits(&mut self, options: Options) -> Token {
        let start = self.position;
        let mut value: u32 = 0;
        while self.position - start < 3
            && let Some(unit) = self.peek()
            && is_octal_digit(unit)
        {
            let digit = u32::from(unit - 0x30);
            if options.contains(Options::ECMASCRIPT) && value * 8 + digit > 0x1F {
                break;
            }
            value = value * 8 + digit;
            self.position += 1;
        }
        debug_assert!(self.position > start);
        Token::new(TokenKind::Text, Span::new(start, self.position))
    }

    /// Scans a `\p{...}` category name and validates it against `resolver`.
    /// An unknown name reports `UnknownPropertyName` on the token but the
    /// token is still produced so the node shape survives.
    pub fn try_scan_escape_category(
        &mut self,
        resolver: &dyn CategoryResolver,
        sink: &mut DiagnosticSink,
    ) -> Option<Token> {
        let start = self.position;
        while self.peek().is_some_and(is_escape_category_unit) {
            self.position += 1;
        }
        if self.position == start {
            return None;
        }
        let token = Token::new(TokenKind::EscapeCategory, Span::new(start, self.position));
        let name = String::from_utf16_lossy(&self.text[start..self.position]);
        if !resolver.is_category(&name) {
            sink.report(DiagnosticKind::UnknownPropertyName(name), token.span);
        }
        Some(token)
    }
}

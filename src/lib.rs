//! A .NET-compatible regular expression pattern parser.
//!
//! [`parse`] turns a pattern string into a lossless [`RegexTree`]: every
//! character of the input, comments and whitespace included, appears in
//! exactly one leaf of the tree, and re-concatenating the leaves reproduces
//! the pattern. Malformed patterns still parse; problems come back as
//! ordered [`Diagnostic`]s, and capture groups are numbered and named in
//! [`CaptureTable`] the way the reference engine numbers them.

#![warn(clippy::pedantic, rust_2018_idioms)]
#![allow(clippy::missing_errors_doc, clippy::too_many_lines)]

pub mod ast;
pub mod captures;
pub mod diagnostic;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod span;
pub mod unicode;

pub use self::{
    ast::{Node, NodeKind, NodeOrToken, RegexTree},
    captures::{Capture, CaptureTable},
    diagnostic::{Diagnostic, DiagnosticKind, DiagnosticSink},
    lexer::{Lexer, Token, TokenKind, Trivia, TriviaKind},
    options::Options,
    parser::{parse, parse_with},
    span::Span,
    unicode::{CategoryResolver, DotnetCategories},
};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// ECMAScript mode was combined with options it does not support.
    #[error("invalid option combination: {0:?}")]
    InvalidOptions(Options),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Groupings (and character class subtractions) deeper than this parse as
/// flat text with a diagnostic instead of recursing further.
pub const MAX_NESTING_DEPTH: usize = 256;

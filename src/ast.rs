//! The concrete syntax tree produced by [`parse`](crate::parser::parse).

use super::{captures::CaptureTable, diagnostic::Diagnostic, options::Options, span::Span};

pub mod node;

pub use self::node::{Node, NodeKind, NodeOrToken};

/// A parsed pattern.
///
/// The tree is lossless: concatenating the text of every leaf token,
/// leading trivia included, reproduces the original pattern. Parsing never
/// fails outright, so a tree always exists; syntax problems surface through
/// [`diagnostics`](RegexTree::diagnostics) instead.
#[derive(Debug)]
pub struct RegexTree {
    text: Vec<u16>,
    root: Node,
    diagnostics: Vec<Diagnostic>,
    captures: CaptureTable,
    options: Options,
}

impl RegexTree {
    pub(crate) fn new(
        text: Vec<u16>,
        root: Node,
        diagnostics: Vec<Diagnostic>,
        captures: CaptureTable,
        options: Options,
    ) -> Self {
        Self {
            text,
            root,
            diagnostics,
            captures,
            options,
        }
    }

    /// The root [`NodeKind::CompilationUnit`] node.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Diagnostics in discovery order. Reference-resolution diagnostics come
    /// after all syntax diagnostics.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn captures(&self) -> &CaptureTable {
        &self.captures
    }

    /// The options the pattern was parsed with, as originally supplied.
    #[must_use]
    pub fn options(&self) -> Options {
        self.options
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// The pattern text as UTF-16 code units.
    #[must_use]
    pub fn text(&self) -> &[u16] {
        &self.text
    }

    /// The original pattern string.
    #[must_use]
    pub fn pattern(&self) -> String {
        String::from_utf16_lossy(&self.text)
    }

    /// The text covered by `span`.
    #[must_use]
    pub fn text_of(&self, span: Span) -> String {
        String::from_utf16_lossy(&self.text[span.start..span.end])
    }
}

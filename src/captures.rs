//! Capture group discovery and numbering.
//!
//! Numbering follows the reference engine: capture 0 is the whole match,
//! plain `(...)` groups take the next automatic number in textual order
//! (unless `EXPLICIT_CAPTURE` is on), explicitly numbered groups keep their
//! own slots, and named groups are assigned the lowest unused numbers in
//! order of first appearance after all numbered slots are known.

use std::collections::{BTreeMap, HashMap};

use super::{
    ast::{Node, NodeKind},
    lexer::{Token, TokenKind},
    options::Options,
    span::Span,
};

/// One capture slot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Capture {
    pub number: i32,
    /// `None` for purely numbered captures; their name is the decimal text
    /// of the number.
    pub name: Option<String>,
    /// The full span of the first grouping that defines this slot. Capture 0
    /// spans the whole pattern.
    pub span: Span,
}

impl Capture {
    /// The name the engine exposes for this slot.
    #[must_use]
    pub fn resolved_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.number.to_string())
    }
}

/// Every capture slot in a pattern, keyed by number and by name.
#[derive(Debug, Default)]
pub struct CaptureTable {
    captures: Vec<Capture>,
    numbers: BTreeMap<i32, Span>,
    names: HashMap<String, i32>,
}

impl CaptureTable {
    #[must_use]
    pub fn has_number(&self, number: i32) -> bool {
        self.numbers.contains_key(&number)
    }

    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    #[must_use]
    pub fn number_for_name(&self, name: &str) -> Option<i32> {
        self.names.get(name).copied()
    }

    #[must_use]
    pub fn get(&self, number: i32) -> Option<&Capture> {
        self.captures
            .iter()
            .find(|capture| capture.number == number)
    }

    /// All captures in ascending numeric order.
    #[must_use]
    pub fn all(&self) -> &[Capture] {
        &self.captures
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.captures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }
}

/// Walks a parsed tree and builds its capture table.
pub(crate) fn analyze(text: &[u16], root: &Node, options: Options) -> CaptureTable {
    let mut analyzer = Analyzer {
        text,
        auto_number: 1,
        numbers: BTreeMap::new(),
        name_spans: HashMap::new(),
        name_order: Vec::new(),
    };
    analyzer.numbers.insert(0, Span::new(0, text.len()));
    let mut top_level = options;
    analyzer.collect(root, &mut top_level);
    analyzer.finish()
}

struct Analyzer<'a> {
    text: &'a [u16],
    auto_number: i32,
    numbers: BTreeMap<i32, Span>,
    name_spans: HashMap<String, Span>,
    name_order: Vec<String>,
}

impl Analyzer<'_> {
    /// Options thread mutably through sequences so a `(?opts)` grouping
    /// affects its right siblings, while every grouping body gets a copy
    /// that is discarded at its close paren.
    fn collect(&mut self, node: &Node, options: &mut Options) {
        match node.kind {
            NodeKind::CaptureGrouping | NodeKind::BalancingGrouping => {
                if let Some(capture) = node.token_at(3) {
                    self.record_capture(capture, node.full_span().unwrap_or_default());
                }
                self.collect_grouping_body(node, *options);
            }
            NodeKind::SimpleGrouping => {
                if !options.contains(Options::EXPLICIT_CAPTURE) {
                    let number = self.auto_number;
                    self.auto_number += 1;
                    self.note_number(number, node.full_span().unwrap_or_default());
                }
                self.collect_grouping_body(node, *options);
            }
            NodeKind::ConditionalExpressionGrouping => {
                // The condition's own grouping never captures, whatever its
                // kind, but groupings nested inside it do.
                if let Some(condition) = node.node_at(2) {
                    self.collect_grouping_body(condition, *options);
                }
                if let Some(result) = node.node_at(3) {
                    let mut inner = *options;
                    self.collect(result, &mut inner);
                }
            }
            NodeKind::SimpleOptionsGrouping => {
                if let Some(run) = node.token_at(2) {
                    *options = options.apply_run(&self.text[run.span.start..run.span.end]);
                }
            }
            NodeKind::NestedOptionsGrouping => {
                let mut inner = *options;
                if let Some(run) = node.token_at(2) {
                    inner = inner.apply_run(&self.text[run.span.start..run.span.end]);
                }
                for child in node.child_nodes() {
                    self.collect(child, &mut inner);
                }
            }
            kind if kind.is_grouping() => {
                self.collect_grouping_body(node, *options);
            }
            _ => {
                for child in node.child_nodes() {
                    self.collect(child, options);
                }
            }
        }
    }

    fn collect_grouping_body(&mut self, node: &Node, options: Options) {
        let mut inner = options;
        for child in node.child_nodes() {
            self.collect(child, &mut inner);
        }
    }

    fn record_capture(&mut self, capture: &Token, span: Span) {
        if capture.missing {
            return;
        }
        match capture.kind {
            TokenKind::Number => {
                if let Some(value) = capture.value {
                    self.note_number(value, span);
                }
            }
            TokenKind::CaptureName => {
                let name =
                    String::from_utf16_lossy(&self.text[capture.span.start..capture.span.end]);
                if !self.name_spans.contains_key(&name) {
                    self.name_spans.insert(name.clone(), span);
                    self.name_order.push(name);
                }
            }
            _ => {}
        }
    }

    /// First definition of a number wins; later reuses share the slot.
    fn note_number(&mut self, number: i32, span: Span) {
        self.numbers.entry(number).or_insert(span);
    }

    fn finish(mut self) -> CaptureTable {
        let mut names = HashMap::new();
        for name in self.name_order {
            while self.numbers.contains_key(&self.auto_number) {
                self.auto_number += 1;
            }
            let span = self.name_spans[&name];
            self.numbers.insert(self.auto_number, span);
            names.insert(name, self.auto_number);
            self.auto_number += 1;
        }
        let mut number_to_name: HashMap<i32, String> = names
            .iter()
            .map(|(name, &number)| (number, name.clone()))
            .collect();
        let captures = self
            .numbers
            .iter()
            .map(|(&number, &span)| Capture {
                number,
                name: number_to_name.remove(&number),
                span,
            })
            .collect();
        CaptureTable {
            captures,
            numbers: self.numbers,
            names,
        }
    }
}

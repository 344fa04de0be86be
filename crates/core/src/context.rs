//! Per-parse context and tunables.

use serde::{Deserialize, Serialize};

use crate::span::Span;

/// Immutable identity of the input being parsed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseContext {
    pub file: String,
    /// Added to every span's first line to produce the reported line number.
    pub line_offset: i64,
}

impl ParseContext {
    pub fn new(file: impl Into<String>) -> Self {
        ParseContext {
            file: file.into(),
            line_offset: 0,
        }
    }

    pub fn with_line_offset(mut self, line_offset: i64) -> Self {
        self.line_offset = line_offset;
        self
    }

    /// The externally visible line number of a span.
    pub fn line_of(&self, span: &Span) -> u32 {
        let line = i64::from(span.first_line) + self.line_offset;
        u32::try_from(line.max(0)).unwrap_or(u32::MAX)
    }

    pub fn provenance(&self, span: &Span) -> Provenance {
        Provenance {
            file: self.file.clone(),
            line: self.line_of(span),
        }
    }
}

/// Where a reduced construct came from; handed to Builder operations that
/// create directives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Provenance {
    pub file: String,
    pub line: u32,
}

/// Driver tunables. Every field has a default so partial configs deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Slots allocated for each parallel stack before the first token.
    pub initial_stack_depth: usize,
    /// Hard ceiling; growing past it aborts with `StackOverflow`.
    pub max_stack_depth: usize,
    /// Successful shifts required after recovery before the next syntax
    /// error is reported.
    pub recovery_shifts: u8,
    /// Expected tokens listed in a syntax error message.
    pub max_expected_tokens: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            initial_stack_depth: 200,
            max_stack_depth: 10_000,
            recovery_shifts: 3,
            max_expected_tokens: 4,
        }
    }
}

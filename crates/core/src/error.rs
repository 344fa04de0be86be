use crate::diagnostic::Diagnostic;

/// Conditions that abort a whole parse. Everything else is absorbed into
/// diagnostics and recovered from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("parser stack exceeded its maximum depth of {depth}")]
    StackOverflow { depth: usize },

    #[error("{file}:{line}: unrecoverable syntax error")]
    UnrecoverableSyntax { file: String, line: u32 },

    #[error("internal parser error: {0}")]
    Internal(String),
}

/// Result of a parse that did not reach Accept.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{error}")]
pub struct ParseFailure {
    #[source]
    pub error: ParseError,
    /// Every diagnostic emitted before the abort, ending with the `Fatal`
    /// diagnostic describing the abort itself.
    pub diagnostics: Vec<Diagnostic>,
}

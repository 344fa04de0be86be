use serde::{Deserialize, Serialize};

/// Which stage of the pipeline produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Reported by the lexer through a `LexError` token.
    Lexical,
    /// No table action for the current state and lookahead.
    Syntax,
    /// A Builder operation rejected a reduction.
    Semantic,
    /// Accepted construct written in an obsolete form.
    Deprecated,
    /// The parse was aborted.
    Fatal,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::Lexical => "lexical",
            DiagnosticKind::Syntax => "syntax",
            DiagnosticKind::Semantic => "semantic",
            DiagnosticKind::Deprecated => "deprecated",
            DiagnosticKind::Fatal => "fatal",
        }
    }

    /// Deprecation warnings do not count as errors.
    pub fn is_error(self) -> bool {
        !matches!(self, DiagnosticKind::Deprecated)
    }
}

/// A located message produced while parsing one input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: String,
    pub line: u32,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        file: &str,
        line: u32,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            file: file.to_owned(),
            line,
            kind,
            message: message.into(),
        }
    }

    pub fn lexical(file: &str, line: u32, message: impl Into<String>) -> Self {
        Diagnostic::new(DiagnosticKind::Lexical, file, line, message)
    }

    pub fn syntax(file: &str, line: u32, message: impl Into<String>) -> Self {
        Diagnostic::new(DiagnosticKind::Syntax, file, line, message)
    }

    pub fn semantic(file: &str, line: u32, message: impl Into<String>) -> Self {
        Diagnostic::new(DiagnosticKind::Semantic, file, line, message)
    }

    pub fn deprecated(file: &str, line: u32, message: impl Into<String>) -> Self {
        Diagnostic::new(DiagnosticKind::Deprecated, file, line, message)
    }

    pub fn fatal(file: &str, line: u32, message: impl Into<String>) -> Self {
        Diagnostic::new(DiagnosticKind::Fatal, file, line, message)
    }

    /// Stable JSON shape for tooling. Every field is always present.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "file":    self.file,
            "kind":    self.kind.as_str(),
            "line":    self.line,
            "message": self.message,
        })
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.message)
    }
}

//! Syntax error message synthesis.

use crate::tables::ParseTables;
use crate::token::TokenKind;

pub const SLASH_SEPARATOR_DEPRECATED: &str =
    "Usage of slash as cost separator is deprecated (/)";
pub const PIPE_DEPRECATED: &str = "Pipe symbol is deprecated";

/// `syntax error, unexpected X[, expecting A or B ...]`
///
/// Expected tokens are the explicit entries of the state's action row in
/// table order, cut to `max_expected`.
pub fn syntax_message(
    tables: &ParseTables,
    state: usize,
    unexpected: TokenKind,
    max_expected: usize,
) -> String {
    let expected = tables.expected_tokens(state);
    format_syntax_message(unexpected, &expected, max_expected)
}

pub fn format_syntax_message(
    unexpected: TokenKind,
    expected: &[TokenKind],
    max_expected: usize,
) -> String {
    let mut message = format!("syntax error, unexpected {}", unexpected.name());
    for (i, kind) in expected.iter().take(max_expected).enumerate() {
        message.push_str(if i == 0 { ", expecting " } else { " or " });
        message.push_str(kind.name());
    }
    message
}

/// Lexer errors are reported by the lexer itself.
pub fn is_silenced(unexpected: TokenKind) -> bool {
    unexpected == TokenKind::LexError
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    #[test]
    fn bare_message_without_expectations() {
        assert_eq!(
            format_syntax_message(Number, &[], 4),
            "syntax error, unexpected NUMBER"
        );
    }

    #[test]
    fn expectations_are_joined_with_or() {
        assert_eq!(
            format_syntax_message(Eol, &[Account], 4),
            "syntax error, unexpected EOL, expecting ACCOUNT"
        );
        assert_eq!(
            format_syntax_message(End, &[Currency, Str, Eol], 4),
            "syntax error, unexpected end of file, expecting CURRENCY or STRING or EOL"
        );
    }

    #[test]
    fn expectations_are_capped() {
        let expected = [Eol, Comment, Skipped, Date, PushTag, PopTag];
        assert_eq!(
            format_syntax_message(Number, &expected, 4),
            "syntax error, unexpected NUMBER, expecting EOL or COMMENT or SKIPPED or DATE"
        );
    }
}

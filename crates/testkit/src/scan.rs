//! A compact ledger scanner for fixtures.
//!
//! Follows the lexer contract the grammar expects: every line ends with
//! `Eol`, whitespace-only lines are a bare `Eol`, indented content is
//! preceded by `Indent`, indented comment lines vanish, and lines starting
//! with an org-mode style marker are one `Skipped` token. Anything it cannot
//! classify becomes a `LexError` carrying a message.

use tally_core::{Span, Token, TokenKind};

const KEYWORDS: &[(&str, TokenKind)] = &[
    ("txn", TokenKind::Txn),
    ("balance", TokenKind::Balance),
    ("open", TokenKind::Open),
    ("close", TokenKind::Close),
    ("commodity", TokenKind::Commodity),
    ("pad", TokenKind::Pad),
    ("event", TokenKind::Event),
    ("price", TokenKind::Price),
    ("note", TokenKind::Note),
    ("document", TokenKind::Document),
    ("pushtag", TokenKind::PushTag),
    ("poptag", TokenKind::PopTag),
    ("option", TokenKind::Option),
    ("include", TokenKind::Include),
    ("plugin", TokenKind::Plugin),
];

/// Tokens of `src`, without a trailing end-of-input token.
pub fn scan(src: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let lines = src.split('\n').count();
    for (i, text) in src.split('\n').enumerate() {
        let line = i as u32 + 1;
        let chars: Vec<char> = text.trim_end_matches('\r').chars().collect();
        if i + 1 == lines && chars.is_empty() {
            break;
        }
        scan_line(&chars, line, &mut tokens);
    }
    tokens
}

fn span(line: u32, start: usize, end: usize) -> Span {
    Span::new(line, start as u32 + 1, line, end.max(start + 1) as u32)
}

fn scan_line(chars: &[char], line: u32, out: &mut Vec<Token>) {
    let eol_col = chars.len();
    let first = chars.iter().position(|c| *c != ' ' && *c != '\t');

    let Some(first) = first else {
        out.push(Token::new(TokenKind::Eol, span(line, eol_col, eol_col + 1)));
        return;
    };
    if first > 0 {
        if chars[first] == ';' {
            return;
        }
        out.push(Token::new(TokenKind::Indent, span(line, 0, first)));
    } else if matches!(chars[0], '*' | ':' | '#' | '!' | '&' | '%')
        && chars.get(1).is_some_and(|c| *c == ' ' || *c == '\t')
    {
        out.push(Token::new(TokenKind::Skipped, span(line, 0, eol_col)));
        return;
    }

    let mut pos = first;
    while pos < chars.len() {
        let c = chars[pos];
        if c == ' ' || c == '\t' {
            pos += 1;
            continue;
        }
        let start = pos;

        if c == ';' {
            let text: String = chars[pos + 1..].iter().collect();
            out.push(Token::text(TokenKind::Comment, text.trim(), span(line, start, chars.len())));
            break;
        }

        if c == '"' {
            pos += 1;
            let mut s = String::new();
            let mut closed = false;
            while pos < chars.len() {
                match chars[pos] {
                    '"' => {
                        closed = true;
                        pos += 1;
                        break;
                    }
                    '\\' if pos + 1 < chars.len() => {
                        s.push(chars[pos + 1]);
                        pos += 2;
                    }
                    other => {
                        s.push(other);
                        pos += 1;
                    }
                }
            }
            if closed {
                out.push(Token::text(TokenKind::Str, s, span(line, start, pos)));
            } else {
                out.push(Token::text(
                    TokenKind::LexError,
                    "unterminated string literal",
                    span(line, start, pos),
                ));
            }
            continue;
        }

        if c.is_ascii_digit() {
            let (kind, end) = if date_at(chars, pos) {
                (TokenKind::Date, pos + 10)
            } else {
                (TokenKind::Number, number_end(chars, pos))
            };
            pos = end;
            let text: String = chars[start..pos].iter().collect();
            out.push(Token::text(kind, text, span(line, start, pos)));
            continue;
        }

        if c.is_ascii_uppercase() {
            pos = scan_while(chars, pos, |c| {
                c.is_ascii_alphanumeric() || matches!(c, ':' | '-' | '_' | '\'' | '.')
            });
            let word: String = chars[start..pos].iter().collect();
            let kind = if word == "TRUE" || word == "FALSE" {
                TokenKind::Bool
            } else if word.contains(':') {
                TokenKind::Account
            } else if word
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '\'' | '.' | '_' | '-'))
            {
                TokenKind::Currency
            } else {
                out.push(Token::text(
                    TokenKind::LexError,
                    format!("Invalid token: '{word}'"),
                    span(line, start, pos),
                ));
                continue;
            };
            out.push(Token::text(kind, word, span(line, start, pos)));
            continue;
        }

        if c.is_ascii_lowercase() {
            pos = scan_while(chars, pos, |c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
            let word: String = chars[start..pos].iter().collect();
            if chars.get(pos) == Some(&':') {
                pos += 1;
                out.push(Token::text(TokenKind::Key, word, span(line, start, pos)));
            } else if let Some((_, kind)) = KEYWORDS.iter().find(|(k, _)| *k == word) {
                out.push(Token::new(*kind, span(line, start, pos)));
            } else {
                out.push(Token::text(
                    TokenKind::LexError,
                    format!("Invalid token: '{word}'"),
                    span(line, start, pos),
                ));
            }
            continue;
        }

        if c == '#' || c == '^' {
            pos = scan_while(chars, pos + 1, |c| {
                c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/' | '.')
            });
            let name: String = chars[start + 1..pos].iter().collect();
            if c == '#' && name.is_empty() {
                out.push(Token::new(TokenKind::Hash, span(line, start, pos)));
            } else {
                let kind = if c == '#' { TokenKind::Tag } else { TokenKind::Link };
                out.push(Token::text(kind, name, span(line, start, pos)));
            }
            continue;
        }

        let next = chars.get(pos + 1).copied();
        let (kind, width) = match (c, next) {
            ('@', Some('@')) => (TokenKind::AtAt, 2),
            ('{', Some('{')) => (TokenKind::LCurlCurl, 2),
            ('}', Some('}')) => (TokenKind::RCurlCurl, 2),
            ('@', _) => (TokenKind::At, 1),
            ('{', _) => (TokenKind::LCurl, 1),
            ('}', _) => (TokenKind::RCurl, 1),
            ('|', _) => (TokenKind::Pipe, 1),
            ('=', _) => (TokenKind::Equal, 1),
            (',', _) => (TokenKind::Comma, 1),
            ('~', _) => (TokenKind::Tilde, 1),
            ('*', _) => (TokenKind::Asterisk, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            ('!' | '&' | '?' | '%', _) => {
                pos += 1;
                out.push(Token::flag(c, span(line, start, pos)));
                continue;
            }
            _ => {
                pos += 1;
                out.push(Token::text(
                    TokenKind::LexError,
                    format!("Invalid token: '{c}'"),
                    span(line, start, pos),
                ));
                continue;
            }
        };
        pos += width;
        out.push(Token::new(kind, span(line, start, pos)));
    }

    out.push(Token::new(TokenKind::Eol, span(line, eol_col, eol_col + 1)));
}

fn scan_while(chars: &[char], mut pos: usize, pred: impl Fn(char) -> bool) -> usize {
    while pos < chars.len() && pred(chars[pos]) {
        pos += 1;
    }
    pos
}

/// `YYYY-MM-DD` or `YYYY/MM/DD` starting at `pos`, not followed by a digit.
fn date_at(chars: &[char], pos: usize) -> bool {
    let Some(c) = chars.get(pos..pos + 10) else {
        return false;
    };
    let digits = |range: std::ops::Range<usize>| c[range].iter().all(char::is_ascii_digit);
    digits(0..4)
        && matches!(c[4], '-' | '/')
        && digits(5..7)
        && c[7] == c[4]
        && digits(8..10)
        && !chars.get(pos + 10).is_some_and(char::is_ascii_digit)
}

/// Digits and dots; a comma only as a thousands separator between digits.
fn number_end(chars: &[char], pos: usize) -> usize {
    let mut end = pos;
    while let Some(&c) = chars.get(end) {
        let grouped = c == ',' && chars.get(end + 1).is_some_and(char::is_ascii_digit);
        if c.is_ascii_digit() || c == '.' || grouped {
            end += 1;
        } else {
            break;
        }
    }
    end
}

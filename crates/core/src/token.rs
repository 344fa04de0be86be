use crate::span::Span;

/// Terminal symbols of the ledger grammar.
///
/// The discriminant is the terminal's column in the action table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum TokenKind {
    /// End of input
    End,
    /// Reserved error symbol used by recovery rules; lexers never produce it
    Error,
    /// A token the lexer could not classify; its value is the lexer's message
    LexError,
    Indent,
    Eol,
    Comment,
    Skipped,
    Pipe,
    AtAt,
    At,
    LCurlCurl,
    RCurlCurl,
    LCurl,
    RCurl,
    Equal,
    Comma,
    Tilde,
    Hash,
    Asterisk,
    Slash,
    Plus,
    Minus,
    LParen,
    RParen,
    Flag,
    // Keywords
    Txn,
    Balance,
    Open,
    Close,
    Commodity,
    Pad,
    Event,
    Price,
    Note,
    Document,
    PushTag,
    PopTag,
    Option,
    Include,
    Plugin,
    // Literals
    Bool,
    Date,
    Account,
    Currency,
    Str,
    Number,
    Tag,
    Link,
    Key,
    /// Precedence marker for unary minus; never appears in input
    Negative,
}

impl TokenKind {
    pub const COUNT: usize = TokenKind::Negative as usize + 1;

    pub const ALL: [TokenKind; TokenKind::COUNT] = [
        TokenKind::End,
        TokenKind::Error,
        TokenKind::LexError,
        TokenKind::Indent,
        TokenKind::Eol,
        TokenKind::Comment,
        TokenKind::Skipped,
        TokenKind::Pipe,
        TokenKind::AtAt,
        TokenKind::At,
        TokenKind::LCurlCurl,
        TokenKind::RCurlCurl,
        TokenKind::LCurl,
        TokenKind::RCurl,
        TokenKind::Equal,
        TokenKind::Comma,
        TokenKind::Tilde,
        TokenKind::Hash,
        TokenKind::Asterisk,
        TokenKind::Slash,
        TokenKind::Plus,
        TokenKind::Minus,
        TokenKind::LParen,
        TokenKind::RParen,
        TokenKind::Flag,
        TokenKind::Txn,
        TokenKind::Balance,
        TokenKind::Open,
        TokenKind::Close,
        TokenKind::Commodity,
        TokenKind::Pad,
        TokenKind::Event,
        TokenKind::Price,
        TokenKind::Note,
        TokenKind::Document,
        TokenKind::PushTag,
        TokenKind::PopTag,
        TokenKind::Option,
        TokenKind::Include,
        TokenKind::Plugin,
        TokenKind::Bool,
        TokenKind::Date,
        TokenKind::Account,
        TokenKind::Currency,
        TokenKind::Str,
        TokenKind::Number,
        TokenKind::Tag,
        TokenKind::Link,
        TokenKind::Key,
        TokenKind::Negative,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> std::option::Option<TokenKind> {
        TokenKind::ALL.get(index).copied()
    }

    /// The name used in syntax error messages.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::End => "end of file",
            TokenKind::Error => "error",
            TokenKind::LexError => "LEX_ERROR",
            TokenKind::Indent => "INDENT",
            TokenKind::Eol => "EOL",
            TokenKind::Comment => "COMMENT",
            TokenKind::Skipped => "SKIPPED",
            TokenKind::Pipe => "PIPE",
            TokenKind::AtAt => "ATAT",
            TokenKind::At => "AT",
            TokenKind::LCurlCurl => "LCURLCURL",
            TokenKind::RCurlCurl => "RCURLCURL",
            TokenKind::LCurl => "LCURL",
            TokenKind::RCurl => "RCURL",
            TokenKind::Equal => "EQUAL",
            TokenKind::Comma => "COMMA",
            TokenKind::Tilde => "TILDE",
            TokenKind::Hash => "HASH",
            TokenKind::Asterisk => "ASTERISK",
            TokenKind::Slash => "SLASH",
            TokenKind::Plus => "PLUS",
            TokenKind::Minus => "MINUS",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::Flag => "FLAG",
            TokenKind::Txn => "TXN",
            TokenKind::Balance => "BALANCE",
            TokenKind::Open => "OPEN",
            TokenKind::Close => "CLOSE",
            TokenKind::Commodity => "COMMODITY",
            TokenKind::Pad => "PAD",
            TokenKind::Event => "EVENT",
            TokenKind::Price => "PRICE",
            TokenKind::Note => "NOTE",
            TokenKind::Document => "DOCUMENT",
            TokenKind::PushTag => "PUSHTAG",
            TokenKind::PopTag => "POPTAG",
            TokenKind::Option => "OPTION",
            TokenKind::Include => "INCLUDE",
            TokenKind::Plugin => "PLUGIN",
            TokenKind::Bool => "BOOL",
            TokenKind::Date => "DATE",
            TokenKind::Account => "ACCOUNT",
            TokenKind::Currency => "CURRENCY",
            TokenKind::Str => "STRING",
            TokenKind::Number => "NUMBER",
            TokenKind::Tag => "TAG",
            TokenKind::Link => "LINK",
            TokenKind::Key => "KEY",
            TokenKind::Negative => "NEGATIVE",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The payload a lexer attaches to a token.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TokenValue {
    #[default]
    None,
    /// Flag character (`!`, `*`, `&`, ...)
    Char(char),
    /// Literal text: strings without quotes, tags without `#`, links
    /// without `^`, keys without `:`, numbers and dates as written.
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: TokenValue,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Token {
            kind,
            value: TokenValue::None,
            span,
        }
    }

    pub fn text(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Token {
            kind,
            value: TokenValue::Text(text.into()),
            span,
        }
    }

    pub fn flag(flag: char, span: Span) -> Self {
        Token {
            kind: TokenKind::Flag,
            value: TokenValue::Char(flag),
            span,
        }
    }

    /// The end-of-input token, positioned just after the last token read.
    pub fn end(span: Span) -> Self {
        Token::new(TokenKind::End, span)
    }
}

/// Pull-based token supply consumed by the parse driver.
///
/// The driver calls `next_token` exactly once per token it needs. Returning
/// `None` signals end of input and is never followed by another call.
pub trait TokenSource {
    fn next_token(&mut self) -> std::option::Option<Token>;
}

impl<I> TokenSource for I
where
    I: Iterator<Item = Token>,
{
    fn next_token(&mut self) -> std::option::Option<Token> {
        self.next()
    }
}

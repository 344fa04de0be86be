//! Semantic values held on the parse stack.
//!
//! Every slot owns its value. Builder handles are moved into exactly one
//! Builder call or dropped with their slot, so release happens once on
//! every path: reduction, recovery popping, lookahead discarding and abort.

/// Description fields collected after a transaction's flag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxnFields {
    /// Payee and narration candidates, in source order.
    pub strings: Vec<String>,
    pub tags: Vec<String>,
    pub links: Vec<String>,
}

/// One line nested under a transaction header.
#[derive(Debug, PartialEq)]
pub enum TxnLine<H> {
    Posting(H),
    Meta(H),
}

/// One clause of a lot specification between `{` and `}`.
#[derive(Debug, PartialEq)]
pub enum LotComponent<H> {
    /// A compound cost amount.
    Cost(H),
    Date(String),
    Label(String),
    /// The `*` merge marker.
    Merge,
}

/// Right-hand side of a metadata `key: value` line.
#[derive(Debug, PartialEq)]
pub enum MetaValue<H> {
    Str(String),
    Account(String),
    Date(String),
    Currency(String),
    Tag(String),
    Bool(bool),
    Number(H),
    Amount(H),
    /// `key:` with nothing after it.
    Empty,
}

/// The value of one stack slot.
#[derive(Debug, PartialEq)]
pub enum SemanticValue<H> {
    /// Punctuation, end of line markers and structural rules with no payload.
    Nothing,
    Char(char),
    Text(String),
    Handle(H),
    /// An amount and its optional tolerance.
    Pair(H, Option<H>),
    List(Vec<H>),
    Lines(Vec<TxnLine<H>>),
    Strings(Vec<String>),
    Fields(TxnFields),
    Component(LotComponent<H>),
    Components(Vec<LotComponent<H>>),
    Meta(MetaValue<H>),
}

impl<H> Default for SemanticValue<H> {
    fn default() -> Self {
        SemanticValue::Nothing
    }
}

impl<H> SemanticValue<H> {
    /// Short variant name used in internal error messages.
    pub fn variant(&self) -> &'static str {
        match self {
            SemanticValue::Nothing => "nothing",
            SemanticValue::Char(_) => "char",
            SemanticValue::Text(_) => "text",
            SemanticValue::Handle(_) => "handle",
            SemanticValue::Pair(..) => "pair",
            SemanticValue::List(_) => "list",
            SemanticValue::Lines(_) => "lines",
            SemanticValue::Strings(_) => "strings",
            SemanticValue::Fields(_) => "fields",
            SemanticValue::Component(_) => "component",
            SemanticValue::Components(_) => "components",
            SemanticValue::Meta(_) => "meta",
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, SemanticValue::Nothing)
    }

    pub fn as_char(&self) -> Option<char> {
        match self {
            SemanticValue::Char(c) => Some(*c),
            _ => None,
        }
    }
}

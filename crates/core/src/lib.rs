//! tally-core: the grammar engine of the Tally ledger language.
//!
//! Turns a stream of classified tokens into Builder calls, one per
//! recognised construct, recovering from malformed lines so that the rest
//! of a file still parses.
//!
//! # Public API
//!
//! - [`parse()`] / [`parse_with_options()`] -- parse one input with a [`Builder`]
//! - [`Builder`] -- the capability interface that gives reductions meaning
//! - [`Token`], [`TokenKind`], [`TokenSource`] -- the lexer contract
//! - [`Diagnostic`], [`ParseError`], [`ParseFailure`] -- error reporting
//! - [`ParseContext`], [`ParseOptions`] -- per-parse identity and tunables
//!
//! The table generator ([`tables`]) and driver ([`driver`]) are generic
//! over the grammar and can be reused with other rule sets.

pub mod builder;
pub mod context;
pub mod diagnostic;
pub mod driver;
pub mod error;
pub mod grammar;
pub mod ledger;
pub mod report;
pub mod span;
pub mod stack;
pub mod tables;
pub mod token;
pub mod value;

// ── Convenience re-exports ───────────────────────────────────────────

pub use builder::{Builder, Meta, PostingParts};
pub use context::{ParseContext, ParseOptions, Provenance};
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use error::{ParseError, ParseFailure};
pub use ledger::{parse, parse_with_options, Parsed};
pub use span::Span;
pub use token::{Token, TokenKind, TokenSource, TokenValue};
pub use value::{LotComponent, MetaValue, SemanticValue, TxnFields, TxnLine};

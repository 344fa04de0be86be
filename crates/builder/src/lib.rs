//! tally-builder: the reference semantic Builder for the Tally grammar engine.
//!
//! [`LedgerBuilder`] gives reductions their meaning: decimal arithmetic,
//! calendar dates, lot specifications, postings and the dated directives,
//! plus the file-level state a ledger carries (tag context, options,
//! includes and plugins). The result of a parse is a serializable
//! [`Ledger`].

pub mod builder;
pub mod data;
pub mod error;
pub mod number;

use tally_core::{parse_with_options, ParseContext, ParseFailure, ParseOptions, TokenSource};

// ── Convenience re-exports ───────────────────────────────────────────

pub use builder::{Compound, LedgerBuilder, Node};
pub use data::{
    Amount, BookingMethod, CostSpec, Directive, Entry, Ledger, MetaEntry, Metadata, Plugin,
    Position, Posting, Transaction,
};
pub use error::BuildError;

/// Parses one token stream into a [`Ledger`].
///
/// Recoverable problems end up in [`Ledger::errors`]; only an aborted parse
/// returns `Err`.
pub fn load<S>(source: &mut S, context: &ParseContext) -> Result<Ledger, ParseFailure>
where
    S: TokenSource + ?Sized,
{
    load_with_options(source, context, &ParseOptions::default())
}

pub fn load_with_options<S>(
    source: &mut S,
    context: &ParseContext,
    options: &ParseOptions,
) -> Result<Ledger, ParseFailure>
where
    S: TokenSource + ?Sized,
{
    let mut builder = LedgerBuilder::new(&context.file);
    parse_with_options(source, &mut builder, context, options).map(|parsed| parsed.output)
}

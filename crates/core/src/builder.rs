//! The capability interface through which reductions become ledger objects.
//!
//! The grammar engine never interprets what it recognises. Every semantic
//! rule calls exactly one operation here, moving its input handles into
//! the call. An `Err` rejects the construct: its `Display` text becomes a
//! semantic diagnostic and the parser recovers at the next declaration.

use std::fmt;

use crate::context::Provenance;
use crate::diagnostic::Diagnostic;
use crate::value::{LotComponent, MetaValue, TxnFields, TxnLine};

/// Metadata attached to a directive; `None` when no `key: value` lines
/// followed it.
pub type Meta<H> = Option<Vec<H>>;

/// Arguments of one posting line.
#[derive(Debug)]
pub struct PostingParts<H> {
    pub account: String,
    /// Units with an optional lot specification.
    pub position: Option<H>,
    /// Price amount after `@` or `@@`.
    pub price: Option<H>,
    /// The price was written with `@@` and covers the whole position.
    pub total_price: bool,
    pub flag: Option<char>,
    /// Flag of the enclosing transaction.
    pub txn_flag: char,
}

pub trait Builder {
    type Handle;
    type Error: fmt::Display;
    type Output;

    // ──── Numbers and amounts ────

    fn number(&mut self, text: &str) -> Result<Self::Handle, Self::Error>;

    fn add(&mut self, lhs: Self::Handle, rhs: Self::Handle) -> Result<Self::Handle, Self::Error>;

    fn subtract(
        &mut self,
        lhs: Self::Handle,
        rhs: Self::Handle,
    ) -> Result<Self::Handle, Self::Error>;

    fn multiply(
        &mut self,
        lhs: Self::Handle,
        rhs: Self::Handle,
    ) -> Result<Self::Handle, Self::Error>;

    fn divide(&mut self, lhs: Self::Handle, rhs: Self::Handle)
        -> Result<Self::Handle, Self::Error>;

    fn negate(&mut self, value: Self::Handle) -> Result<Self::Handle, Self::Error>;

    fn amount(&mut self, number: Self::Handle, currency: &str)
        -> Result<Self::Handle, Self::Error>;

    /// `[per_unit] CURRENCY` or `[per_unit] # [total] CURRENCY` inside a lot.
    fn compound_amount(
        &mut self,
        per_unit: Option<Self::Handle>,
        total: Option<Self::Handle>,
        currency: &str,
    ) -> Result<Self::Handle, Self::Error>;

    // ──── Postings ────

    fn lot_spec(
        &mut self,
        components: Vec<LotComponent<Self::Handle>>,
    ) -> Result<Self::Handle, Self::Error>;

    fn position(
        &mut self,
        prov: &Provenance,
        units: Self::Handle,
        lot: Option<Self::Handle>,
    ) -> Result<Self::Handle, Self::Error>;

    fn key_value(
        &mut self,
        key: &str,
        value: MetaValue<Self::Handle>,
    ) -> Result<Self::Handle, Self::Error>;

    fn posting(
        &mut self,
        prov: &Provenance,
        parts: PostingParts<Self::Handle>,
    ) -> Result<Self::Handle, Self::Error>;

    // ──── Directives ────

    fn transaction(
        &mut self,
        prov: &Provenance,
        date: &str,
        flag: char,
        fields: TxnFields,
        lines: Vec<TxnLine<Self::Handle>>,
    ) -> Result<Self::Handle, Self::Error>;

    fn open(
        &mut self,
        prov: &Provenance,
        date: &str,
        account: &str,
        currencies: Vec<String>,
        booking: Option<String>,
        meta: Meta<Self::Handle>,
    ) -> Result<Self::Handle, Self::Error>;

    fn close(
        &mut self,
        prov: &Provenance,
        date: &str,
        account: &str,
        meta: Meta<Self::Handle>,
    ) -> Result<Self::Handle, Self::Error>;

    fn commodity(
        &mut self,
        prov: &Provenance,
        date: &str,
        currency: &str,
        meta: Meta<Self::Handle>,
    ) -> Result<Self::Handle, Self::Error>;

    fn pad(
        &mut self,
        prov: &Provenance,
        date: &str,
        account: &str,
        source_account: &str,
        meta: Meta<Self::Handle>,
    ) -> Result<Self::Handle, Self::Error>;

    fn balance(
        &mut self,
        prov: &Provenance,
        date: &str,
        account: &str,
        amount: Self::Handle,
        tolerance: Option<Self::Handle>,
        meta: Meta<Self::Handle>,
    ) -> Result<Self::Handle, Self::Error>;

    fn price(
        &mut self,
        prov: &Provenance,
        date: &str,
        currency: &str,
        amount: Self::Handle,
        meta: Meta<Self::Handle>,
    ) -> Result<Self::Handle, Self::Error>;

    fn event(
        &mut self,
        prov: &Provenance,
        date: &str,
        kind: &str,
        description: &str,
        meta: Meta<Self::Handle>,
    ) -> Result<Self::Handle, Self::Error>;

    fn note(
        &mut self,
        prov: &Provenance,
        date: &str,
        account: &str,
        comment: &str,
        meta: Meta<Self::Handle>,
    ) -> Result<Self::Handle, Self::Error>;

    fn document(
        &mut self,
        prov: &Provenance,
        date: &str,
        account: &str,
        filename: &str,
        meta: Meta<Self::Handle>,
    ) -> Result<Self::Handle, Self::Error>;

    // ──── Non-entry directives ────

    fn option(&mut self, prov: &Provenance, key: &str, value: &str) -> Result<(), Self::Error>;

    fn include(&mut self, prov: &Provenance, filename: &str) -> Result<(), Self::Error>;

    fn plugin(
        &mut self,
        prov: &Provenance,
        name: &str,
        config: Option<&str>,
    ) -> Result<(), Self::Error>;

    fn pushtag(&mut self, tag: &str) -> Result<(), Self::Error>;

    fn poptag(&mut self, tag: &str) -> Result<(), Self::Error>;

    // ──── Results ────

    /// Called for every diagnostic, syntax and semantic alike, in emission
    /// order.
    fn report_error(&mut self, _diagnostic: &Diagnostic) {}

    /// Called once after a successful parse with the entries in source order.
    fn finalize(&mut self, entries: Vec<Self::Handle>) -> Self::Output;
}

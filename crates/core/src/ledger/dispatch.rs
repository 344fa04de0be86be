//! Maps each ledger production onto its Builder operation.
//!
//! List-shaped and optional values are assembled here without calling the
//! Builder. Everything else is handed over whole, one call per rule.

use std::fmt::Display;

use crate::builder::{Builder, PostingParts};
use crate::context::ParseContext;
use crate::diagnostic::Diagnostic;
use crate::driver::{ReduceError, Reducer, Reduction};
use crate::error::ParseError;
use crate::report::{PIPE_DEPRECATED, SLASH_SEPARATOR_DEPRECATED};
use crate::span::Span;
use crate::token::{Token, TokenValue};
use crate::value::{LotComponent, MetaValue, SemanticValue, TxnFields, TxnLine};

use super::rules::Production;

type Value<B> = SemanticValue<<B as Builder>::Handle>;

/// Drives a [`Builder`] from ledger reductions and keeps the diagnostics.
pub struct LedgerReducer<'a, B: Builder> {
    builder: &'a mut B,
    context: &'a ParseContext,
    diagnostics: Vec<Diagnostic>,
}

impl<'a, B: Builder> LedgerReducer<'a, B> {
    pub fn new(builder: &'a mut B, context: &'a ParseContext) -> Self {
        LedgerReducer {
            builder,
            context,
            diagnostics: Vec::new(),
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn builder(&mut self) -> &mut B {
        self.builder
    }

    fn deprecated(&mut self, span: &Span, message: &str) {
        let line = self.context.line_of(span);
        self.report(Diagnostic::deprecated(&self.context.file, line, message));
    }

    fn binary(
        &mut self,
        args: &mut Args<B::Handle>,
        op: fn(&mut B, B::Handle, B::Handle) -> Result<B::Handle, B::Error>,
    ) -> Result<Value<B>, ReduceError> {
        let lhs = args.handle()?;
        args.skip()?;
        let rhs = args.handle()?;
        op(self.builder, lhs, rhs)
            .map(SemanticValue::Handle)
            .map_err(rejected)
    }
}

fn rejected<E: Display>(err: E) -> ReduceError {
    ReduceError::Rejected(err.to_string())
}

impl<B: Builder> Reducer<Production> for LedgerReducer<'_, B> {
    type Value = Value<B>;

    fn token_value(&mut self, token: Token) -> Self::Value {
        match token.value {
            TokenValue::None => SemanticValue::Nothing,
            TokenValue::Char(c) => SemanticValue::Char(c),
            TokenValue::Text(text) => SemanticValue::Text(text),
        }
    }

    fn reduce(
        &mut self,
        action: &Production,
        reduction: Reduction<'_, Self::Value>,
    ) -> Result<Self::Value, ReduceError> {
        use Production as P;
        use SemanticValue as V;

        let span = reduction.span;
        let prov = self.context.provenance(&span);
        let txn_flag = if action.is_posting() {
            let below = reduction.below;
            below
                .len()
                .checked_sub(4)
                .and_then(|i| below[i].as_char())
        } else {
            None
        };
        let mut args = Args::new(reduction.rule, reduction.values);

        let value = match action {
            // ──── Top level ────
            P::File => args.next()?,
            P::DeclarationsEmpty => V::List(Vec::new()),
            P::DeclarationsDirective | P::DeclarationsError => args.next()?,
            P::DeclarationsEntry => {
                let mut entries = args.list()?;
                entries.push(args.handle()?);
                V::List(entries)
            }
            P::Forward => args.next()?,
            P::Discard => V::Nothing,

            // ──── Transaction header ────
            P::TxnKeyword | P::TxnAsterisk => V::Char('*'),
            P::TxnFlag => V::Char(args.char()?),
            P::FieldsEmpty => V::Fields(TxnFields::default()),
            P::FieldString => {
                let mut fields = args.fields()?;
                fields.strings.push(args.text()?);
                V::Fields(fields)
            }
            P::FieldLink => {
                let mut fields = args.fields()?;
                fields.links.push(args.text()?);
                V::Fields(fields)
            }
            P::FieldTag => {
                let mut fields = args.fields()?;
                fields.tags.push(args.text()?);
                V::Fields(fields)
            }
            P::FieldPipe => {
                let fields = args.fields()?;
                self.deprecated(&span, PIPE_DEPRECATED);
                V::Fields(fields)
            }
            P::Transaction => {
                let date = args.text()?;
                let flag = args.char()?;
                let fields = args.fields()?;
                args.skip()?;
                let lines = args.lines()?;
                self.builder
                    .transaction(&prov, &date, flag, fields, lines)
                    .map(V::Handle)
                    .map_err(rejected)?
            }

            // ──── Arithmetic ────
            P::Number => {
                let text = args.text()?;
                self.builder.number(&text).map(V::Handle).map_err(rejected)?
            }
            P::Add => self.binary(&mut args, B::add)?,
            P::Subtract => self.binary(&mut args, B::subtract)?,
            P::Multiply => self.binary(&mut args, B::multiply)?,
            P::Divide => self.binary(&mut args, B::divide)?,
            P::Negate => {
                args.skip()?;
                let operand = args.handle()?;
                self.builder.negate(operand).map(V::Handle).map_err(rejected)?
            }
            P::UnaryPlus => {
                args.skip()?;
                args.next()?
            }
            P::Parens => {
                args.skip()?;
                args.next()?
            }

            // ──── Postings ────
            P::OptFlagNone => V::Nothing,
            P::OptFlagAsterisk => V::Char('*'),
            P::OptFlagFlag => V::Char(args.char()?),
            P::PostingUnits
            | P::PostingPerUnitPrice
            | P::PostingTotalPrice
            | P::PostingBare => {
                let txn_flag = txn_flag.ok_or_else(|| {
                    ReduceError::Fatal(ParseError::Internal(
                        "posting reduced outside a transaction".into(),
                    ))
                })?;
                args.skip()?;
                let flag = args.opt_char()?;
                let account = args.text()?;
                let (position, price) = match action {
                    P::PostingBare => (None, None),
                    P::PostingUnits => (Some(args.handle()?), None),
                    _ => {
                        let position = args.handle()?;
                        args.skip()?;
                        (Some(position), Some(args.handle()?))
                    }
                };
                let parts = PostingParts {
                    account,
                    position,
                    price,
                    total_price: *action == P::PostingTotalPrice,
                    flag,
                    txn_flag,
                };
                self.builder
                    .posting(&prov, parts)
                    .map(V::Handle)
                    .map_err(rejected)?
            }

            // ──── Metadata ────
            P::KeyValue => {
                args.skip()?;
                let key = args.text()?;
                let value = args.meta()?;
                self.builder
                    .key_value(&key, value)
                    .map(V::Handle)
                    .map_err(rejected)?
            }
            P::MetaString => V::Meta(MetaValue::Str(args.text()?)),
            P::MetaAccount => V::Meta(MetaValue::Account(args.text()?)),
            P::MetaDate => V::Meta(MetaValue::Date(args.text()?)),
            P::MetaCurrency => V::Meta(MetaValue::Currency(args.text()?)),
            P::MetaTag => V::Meta(MetaValue::Tag(args.text()?)),
            P::MetaBool => {
                let text = args.text()?;
                V::Meta(MetaValue::Bool(text.eq_ignore_ascii_case("true")))
            }
            P::MetaNumber => V::Meta(MetaValue::Number(args.handle()?)),
            P::MetaAmount => V::Meta(MetaValue::Amount(args.handle()?)),
            P::MetaEmpty => V::Meta(MetaValue::Empty),

            // ──── Lists ────
            P::LinesEmpty => V::Lines(Vec::new()),
            P::LinesKeyValue => {
                let mut lines = args.lines()?;
                lines.push(TxnLine::Meta(args.handle()?));
                V::Lines(lines)
            }
            P::LinesPosting => {
                let mut lines = args.lines()?;
                lines.push(TxnLine::Posting(args.handle()?));
                V::Lines(lines)
            }
            P::MetaListEmpty => V::List(Vec::new()),
            P::MetaListAppend => {
                let mut list = args.list()?;
                list.push(args.handle()?);
                V::List(list)
            }
            P::CurrenciesEmpty => V::Strings(Vec::new()),
            P::CurrenciesFirst => V::Strings(vec![args.text()?]),
            P::CurrenciesAppend => {
                let mut currencies = args.strings()?;
                args.skip()?;
                currencies.push(args.text()?);
                V::Strings(currencies)
            }

            // ──── Directives ────
            P::PushTag => {
                args.skip()?;
                let tag = args.text()?;
                self.builder.pushtag(&tag).map_err(rejected)?;
                V::Nothing
            }
            P::PopTag => {
                args.skip()?;
                let tag = args.text()?;
                self.builder.poptag(&tag).map_err(rejected)?;
                V::Nothing
            }
            P::Open => {
                let date = args.text()?;
                args.skip()?;
                let account = args.text()?;
                let currencies = args.strings()?;
                let booking = args.opt_text()?;
                args.skip()?;
                let meta = args.meta_list()?;
                self.builder
                    .open(&prov, &date, &account, currencies, booking, meta)
                    .map(V::Handle)
                    .map_err(rejected)?
            }
            P::BookingSome => V::Text(args.text()?),
            P::BookingNone => V::Nothing,
            P::Close => {
                let date = args.text()?;
                args.skip()?;
                let account = args.text()?;
                args.skip()?;
                let meta = args.meta_list()?;
                self.builder
                    .close(&prov, &date, &account, meta)
                    .map(V::Handle)
                    .map_err(rejected)?
            }
            P::Commodity => {
                let date = args.text()?;
                args.skip()?;
                let currency = args.text()?;
                args.skip()?;
                let meta = args.meta_list()?;
                self.builder
                    .commodity(&prov, &date, &currency, meta)
                    .map(V::Handle)
                    .map_err(rejected)?
            }
            P::Pad => {
                let date = args.text()?;
                args.skip()?;
                let account = args.text()?;
                let source = args.text()?;
                args.skip()?;
                let meta = args.meta_list()?;
                self.builder
                    .pad(&prov, &date, &account, &source, meta)
                    .map(V::Handle)
                    .map_err(rejected)?
            }
            P::Balance => {
                let date = args.text()?;
                args.skip()?;
                let account = args.text()?;
                let (amount, tolerance) = args.pair()?;
                args.skip()?;
                let meta = args.meta_list()?;
                self.builder
                    .balance(&prov, &date, &account, amount, tolerance, meta)
                    .map(V::Handle)
                    .map_err(rejected)?
            }

            // ──── Amounts and lots ────
            P::Amount => {
                let number = args.handle()?;
                let currency = args.text()?;
                self.builder
                    .amount(number, &currency)
                    .map(V::Handle)
                    .map_err(rejected)?
            }
            P::AmountExact => {
                let number = args.handle()?;
                let currency = args.text()?;
                let amount = self.builder.amount(number, &currency).map_err(rejected)?;
                V::Pair(amount, None)
            }
            P::AmountWithTolerance => {
                let number = args.handle()?;
                args.skip()?;
                let tolerance = args.handle()?;
                let currency = args.text()?;
                let amount = self.builder.amount(number, &currency).map_err(rejected)?;
                V::Pair(amount, Some(tolerance))
            }
            P::MaybeNumberNone => V::Nothing,
            P::MaybeNumberSome => args.next()?,
            P::CompoundPerUnit => {
                let per_unit = args.opt_handle()?;
                let currency = args.text()?;
                self.builder
                    .compound_amount(per_unit, None, &currency)
                    .map(V::Handle)
                    .map_err(rejected)?
            }
            P::CompoundWithTotal => {
                let per_unit = args.opt_handle()?;
                args.skip()?;
                let total = args.opt_handle()?;
                let currency = args.text()?;
                self.builder
                    .compound_amount(per_unit, total, &currency)
                    .map(V::Handle)
                    .map_err(rejected)?
            }
            P::Position => {
                let units = args.handle()?;
                self.builder
                    .position(&prov, units, None)
                    .map(V::Handle)
                    .map_err(rejected)?
            }
            P::PositionWithLot => {
                let units = args.handle()?;
                let lot = args.handle()?;
                self.builder
                    .position(&prov, units, Some(lot))
                    .map(V::Handle)
                    .map_err(rejected)?
            }
            P::LotSpec => {
                args.skip()?;
                let components = args.components()?;
                self.builder
                    .lot_spec(components)
                    .map(V::Handle)
                    .map_err(rejected)?
            }
            P::LotListEmpty => V::Components(Vec::new()),
            P::LotListFirst => V::Components(vec![args.component()?]),
            P::LotListComma | P::LotListSlash => {
                let mut components = args.components()?;
                args.skip()?;
                components.push(args.component()?);
                if *action == P::LotListSlash {
                    self.deprecated(&span, SLASH_SEPARATOR_DEPRECATED);
                }
                V::Components(components)
            }
            P::LotCost => V::Component(LotComponent::Cost(args.handle()?)),
            P::LotDate => V::Component(LotComponent::Date(args.text()?)),
            P::LotLabel => V::Component(LotComponent::Label(args.text()?)),
            P::LotMerge => V::Component(LotComponent::Merge),

            // ──── Dated entries ────
            P::Price => {
                let date = args.text()?;
                args.skip()?;
                let currency = args.text()?;
                let amount = args.handle()?;
                args.skip()?;
                let meta = args.meta_list()?;
                self.builder
                    .price(&prov, &date, &currency, amount, meta)
                    .map(V::Handle)
                    .map_err(rejected)?
            }
            P::Event => {
                let date = args.text()?;
                args.skip()?;
                let kind = args.text()?;
                let description = args.text()?;
                args.skip()?;
                let meta = args.meta_list()?;
                self.builder
                    .event(&prov, &date, &kind, &description, meta)
                    .map(V::Handle)
                    .map_err(rejected)?
            }
            P::Note => {
                let date = args.text()?;
                args.skip()?;
                let account = args.text()?;
                let comment = args.text()?;
                args.skip()?;
                let meta = args.meta_list()?;
                self.builder
                    .note(&prov, &date, &account, &comment, meta)
                    .map(V::Handle)
                    .map_err(rejected)?
            }
            P::Filename => V::Text(args.text()?),
            P::Document => {
                let date = args.text()?;
                args.skip()?;
                let account = args.text()?;
                let filename = args.text()?;
                args.skip()?;
                let meta = args.meta_list()?;
                self.builder
                    .document(&prov, &date, &account, &filename, meta)
                    .map(V::Handle)
                    .map_err(rejected)?
            }

            // ──── Options, includes, plugins ────
            P::Option => {
                args.skip()?;
                let key = args.text()?;
                let value = args.text()?;
                self.builder.option(&prov, &key, &value).map_err(rejected)?;
                V::Nothing
            }
            P::Include => {
                args.skip()?;
                let filename = args.text()?;
                self.builder.include(&prov, &filename).map_err(rejected)?;
                V::Nothing
            }
            P::Plugin => {
                args.skip()?;
                let name = args.text()?;
                self.builder.plugin(&prov, &name, None).map_err(rejected)?;
                V::Nothing
            }
            P::PluginWithConfig => {
                args.skip()?;
                let name = args.text()?;
                let config = args.text()?;
                self.builder
                    .plugin(&prov, &name, Some(&config))
                    .map_err(rejected)?;
                V::Nothing
            }
        };
        Ok(value)
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        self.builder.report_error(&diagnostic);
        self.diagnostics.push(diagnostic);
    }
}

// ──────────────────────────────────────────────
// Positional argument access
// ──────────────────────────────────────────────

/// Consumes a rule's values left to right. A value of the wrong shape means
/// the grammar and this dispatcher disagree, which aborts the parse.
struct Args<H> {
    rule: usize,
    values: std::vec::IntoIter<SemanticValue<H>>,
}

impl<H> Args<H> {
    fn new(rule: usize, values: Vec<SemanticValue<H>>) -> Self {
        Args {
            rule,
            values: values.into_iter(),
        }
    }

    fn mismatch(&self, want: &str, found: &str) -> ReduceError {
        ReduceError::Fatal(ParseError::Internal(format!(
            "rule {}: expected {want}, found {found}",
            self.rule
        )))
    }

    fn next(&mut self) -> Result<SemanticValue<H>, ReduceError> {
        self.values
            .next()
            .ok_or_else(|| self.mismatch("a value", "end of rule"))
    }

    /// Drops a value the rule does not use.
    fn skip(&mut self) -> Result<(), ReduceError> {
        self.next().map(drop)
    }

    fn take<T>(
        &mut self,
        want: &str,
        pick: impl FnOnce(SemanticValue<H>) -> Result<T, SemanticValue<H>>,
    ) -> Result<T, ReduceError> {
        let value = self.next()?;
        pick(value).map_err(|other| self.mismatch(want, other.variant()))
    }

    fn text(&mut self) -> Result<String, ReduceError> {
        self.take("text", |v| match v {
            SemanticValue::Text(s) => Ok(s),
            other => Err(other),
        })
    }

    fn opt_text(&mut self) -> Result<Option<String>, ReduceError> {
        self.take("optional text", |v| match v {
            SemanticValue::Text(s) => Ok(Some(s)),
            SemanticValue::Nothing => Ok(None),
            other => Err(other),
        })
    }

    fn char(&mut self) -> Result<char, ReduceError> {
        self.take("char", |v| match v {
            SemanticValue::Char(c) => Ok(c),
            other => Err(other),
        })
    }

    fn opt_char(&mut self) -> Result<Option<char>, ReduceError> {
        self.take("optional char", |v| match v {
            SemanticValue::Char(c) => Ok(Some(c)),
            SemanticValue::Nothing => Ok(None),
            other => Err(other),
        })
    }

    fn handle(&mut self) -> Result<H, ReduceError> {
        self.take("handle", |v| match v {
            SemanticValue::Handle(h) => Ok(h),
            other => Err(other),
        })
    }

    fn opt_handle(&mut self) -> Result<Option<H>, ReduceError> {
        self.take("optional handle", |v| match v {
            SemanticValue::Handle(h) => Ok(Some(h)),
            SemanticValue::Nothing => Ok(None),
            other => Err(other),
        })
    }

    fn pair(&mut self) -> Result<(H, Option<H>), ReduceError> {
        self.take("pair", |v| match v {
            SemanticValue::Pair(a, b) => Ok((a, b)),
            other => Err(other),
        })
    }

    fn list(&mut self) -> Result<Vec<H>, ReduceError> {
        self.take("list", |v| match v {
            SemanticValue::List(l) => Ok(l),
            other => Err(other),
        })
    }

    /// A metadata list, `None` when it is empty.
    fn meta_list(&mut self) -> Result<Option<Vec<H>>, ReduceError> {
        let list = self.list()?;
        Ok(if list.is_empty() { None } else { Some(list) })
    }

    fn lines(&mut self) -> Result<Vec<TxnLine<H>>, ReduceError> {
        self.take("lines", |v| match v {
            SemanticValue::Lines(l) => Ok(l),
            other => Err(other),
        })
    }

    fn strings(&mut self) -> Result<Vec<String>, ReduceError> {
        self.take("strings", |v| match v {
            SemanticValue::Strings(s) => Ok(s),
            other => Err(other),
        })
    }

    fn fields(&mut self) -> Result<TxnFields, ReduceError> {
        self.take("fields", |v| match v {
            SemanticValue::Fields(f) => Ok(f),
            other => Err(other),
        })
    }

    fn component(&mut self) -> Result<LotComponent<H>, ReduceError> {
        self.take("lot component", |v| match v {
            SemanticValue::Component(c) => Ok(c),
            other => Err(other),
        })
    }

    fn components(&mut self) -> Result<Vec<LotComponent<H>>, ReduceError> {
        self.take("lot components", |v| match v {
            SemanticValue::Components(c) => Ok(c),
            other => Err(other),
        })
    }

    fn meta(&mut self) -> Result<MetaValue<H>, ReduceError> {
        self.take("metadata value", |v| match v {
            SemanticValue::Meta(m) => Ok(m),
            other => Err(other),
        })
    }
}

//! [`LedgerBuilder`]: the reference semantic Builder.
//!
//! Handles are [`Node`]s. Numbers are decimals from the start, so every
//! arithmetic reduction is evaluated immediately; amounts, lot clauses,
//! positions and postings are assembled bottom-up until a directive
//! reduction turns them into an [`Entry`].

use std::collections::{BTreeMap, BTreeSet};
use std::mem;

use rust_decimal::Decimal;
use tally_core::{
    Builder, Diagnostic, LotComponent, Meta, MetaValue, PostingParts, Provenance, TxnFields,
    TxnLine,
};

use crate::data::{
    parse_date, Amount, BookingMethod, CostSpec, Directive, Entry, Ledger, MetaEntry, Metadata,
    Plugin, Position, Posting, Transaction,
};
use crate::error::BuildError;
use crate::number;

/// `[per_unit] # [total] CURRENCY` as written inside a lot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compound {
    pub per_unit: Option<Decimal>,
    pub total: Option<Decimal>,
    pub currency: String,
}

/// A value handed between reductions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Number(Decimal),
    Amount(Amount),
    Compound(Compound),
    Cost(CostSpec),
    Position(Position),
    KeyValue(String, MetaEntry),
    Posting(Posting),
    Entry(Entry),
}

macro_rules! node_accessor {
    ($fn_name:ident, $variant:ident, $ty:ty, $expected:literal) => {
        pub fn $fn_name(self) -> Result<$ty, BuildError> {
            match self {
                Node::$variant(value) => Ok(value),
                other => Err(BuildError::UnexpectedNode {
                    expected: $expected,
                    found: other.kind(),
                }),
            }
        }
    };
}

impl Node {
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Number(_) => "number",
            Node::Amount(_) => "amount",
            Node::Compound(_) => "compound amount",
            Node::Cost(_) => "cost specification",
            Node::Position(_) => "position",
            Node::KeyValue(..) => "key/value pair",
            Node::Posting(_) => "posting",
            Node::Entry(_) => "entry",
        }
    }

    node_accessor!(into_number, Number, Decimal, "number");
    node_accessor!(into_amount, Amount, Amount, "amount");
    node_accessor!(into_compound, Compound, Compound, "compound amount");
    node_accessor!(into_cost, Cost, CostSpec, "cost specification");
    node_accessor!(into_position, Position, Position, "position");
    node_accessor!(into_posting, Posting, Posting, "posting");
    node_accessor!(into_entry, Entry, Entry, "entry");

    pub fn into_key_value(self) -> Result<(String, MetaEntry), BuildError> {
        match self {
            Node::KeyValue(key, value) => Ok((key, value)),
            other => Err(BuildError::UnexpectedNode {
                expected: "key/value pair",
                found: other.kind(),
            }),
        }
    }
}

/// Builds a [`Ledger`] from the reductions of one parse.
#[derive(Debug, Default)]
pub struct LedgerBuilder {
    file: String,
    active_tags: BTreeSet<String>,
    options: BTreeMap<String, String>,
    option_history: BTreeMap<String, Vec<String>>,
    includes: Vec<String>,
    plugins: Vec<Plugin>,
    errors: Vec<Diagnostic>,
}

impl LedgerBuilder {
    /// `file` names the input in errors raised at finalize time.
    pub fn new(file: impl Into<String>) -> Self {
        LedgerBuilder {
            file: file.into(),
            ..Self::default()
        }
    }

    /// Tags currently pushed.
    pub fn active_tags(&self) -> &BTreeSet<String> {
        &self.active_tags
    }

    fn metadata(prov: &Provenance, meta: Meta<Node>) -> Result<Metadata, BuildError> {
        let mut metadata = Metadata::new(prov);
        for node in meta.into_iter().flatten() {
            let (key, value) = node.into_key_value()?;
            metadata.values.insert(key, value);
        }
        Ok(metadata)
    }

    fn entry(
        prov: &Provenance,
        date: &str,
        meta: Meta<Node>,
        directive: Directive,
    ) -> Result<Node, BuildError> {
        Ok(Node::Entry(Entry {
            date: parse_date(date)?,
            meta: Self::metadata(prov, meta)?,
            directive,
        }))
    }
}

fn lot_spec(components: Vec<LotComponent<Node>>) -> Result<CostSpec, BuildError> {
    let mut spec = CostSpec::default();
    let mut has_cost = false;
    for component in components {
        match component {
            LotComponent::Cost(node) => {
                if mem::replace(&mut has_cost, true) {
                    return Err(BuildError::DuplicateLotComponent("cost"));
                }
                let compound = node.into_compound()?;
                spec.number_per = compound.per_unit;
                spec.number_total = compound.total;
                spec.currency = Some(compound.currency);
            }
            LotComponent::Date(text) => {
                if spec.date.is_some() {
                    return Err(BuildError::DuplicateLotComponent("date"));
                }
                spec.date = Some(parse_date(&text)?);
            }
            LotComponent::Label(label) => {
                if spec.label.is_some() {
                    return Err(BuildError::DuplicateLotComponent("label"));
                }
                spec.label = Some(label);
            }
            LotComponent::Merge => {
                if spec.merge {
                    return Err(BuildError::DuplicateLotComponent("merge marker"));
                }
                spec.merge = true;
            }
        }
    }
    Ok(spec)
}

fn meta_entry(value: MetaValue<Node>) -> Result<MetaEntry, BuildError> {
    Ok(match value {
        MetaValue::Str(s) => MetaEntry::Str(s),
        MetaValue::Account(s) => MetaEntry::Account(s),
        MetaValue::Date(s) => MetaEntry::Date(parse_date(&s)?),
        MetaValue::Currency(s) => MetaEntry::Currency(s),
        MetaValue::Tag(s) => MetaEntry::Tag(s),
        MetaValue::Bool(b) => MetaEntry::Bool(b),
        MetaValue::Number(node) => MetaEntry::Number(node.into_number()?),
        MetaValue::Amount(node) => MetaEntry::Amount(node.into_amount()?),
        MetaValue::Empty => MetaEntry::Null,
    })
}

/// One string is the narration; two are payee and narration.
fn description(strings: Vec<String>) -> Result<(Option<String>, String), BuildError> {
    let count = strings.len();
    let mut strings = strings.into_iter();
    match (strings.next(), strings.next()) {
        _ if count > 2 => Err(BuildError::TooManyStrings { count }),
        (None, _) => Ok((None, String::new())),
        (Some(narration), None) => Ok((None, narration)),
        (Some(payee), Some(narration)) => Ok((Some(payee), narration)),
    }
}

impl Builder for LedgerBuilder {
    type Handle = Node;
    type Error = BuildError;
    type Output = Ledger;

    // ──── Numbers and amounts ────

    fn number(&mut self, text: &str) -> Result<Node, BuildError> {
        number::parse_number(text).map(Node::Number)
    }

    fn add(&mut self, lhs: Node, rhs: Node) -> Result<Node, BuildError> {
        number::add(lhs.into_number()?, rhs.into_number()?).map(Node::Number)
    }

    fn subtract(&mut self, lhs: Node, rhs: Node) -> Result<Node, BuildError> {
        number::subtract(lhs.into_number()?, rhs.into_number()?).map(Node::Number)
    }

    fn multiply(&mut self, lhs: Node, rhs: Node) -> Result<Node, BuildError> {
        number::multiply(lhs.into_number()?, rhs.into_number()?).map(Node::Number)
    }

    fn divide(&mut self, lhs: Node, rhs: Node) -> Result<Node, BuildError> {
        number::divide(lhs.into_number()?, rhs.into_number()?).map(Node::Number)
    }

    fn negate(&mut self, value: Node) -> Result<Node, BuildError> {
        Ok(Node::Number(-value.into_number()?))
    }

    fn amount(&mut self, number: Node, currency: &str) -> Result<Node, BuildError> {
        Ok(Node::Amount(Amount {
            number: number.into_number()?,
            currency: currency.to_string(),
        }))
    }

    fn compound_amount(
        &mut self,
        per_unit: Option<Node>,
        total: Option<Node>,
        currency: &str,
    ) -> Result<Node, BuildError> {
        Ok(Node::Compound(Compound {
            per_unit: per_unit.map(Node::into_number).transpose()?,
            total: total.map(Node::into_number).transpose()?,
            currency: currency.to_string(),
        }))
    }

    // ──── Postings ────

    fn lot_spec(&mut self, components: Vec<LotComponent<Node>>) -> Result<Node, BuildError> {
        lot_spec(components).map(Node::Cost)
    }

    fn position(
        &mut self,
        _prov: &Provenance,
        units: Node,
        lot: Option<Node>,
    ) -> Result<Node, BuildError> {
        Ok(Node::Position(Position {
            units: units.into_amount()?,
            cost: lot.map(Node::into_cost).transpose()?,
        }))
    }

    fn key_value(&mut self, key: &str, value: MetaValue<Node>) -> Result<Node, BuildError> {
        Ok(Node::KeyValue(key.to_string(), meta_entry(value)?))
    }

    fn posting(&mut self, prov: &Provenance, parts: PostingParts<Node>) -> Result<Node, BuildError> {
        let position = parts.position.map(Node::into_position).transpose()?;
        let mut price = parts.price.map(Node::into_amount).transpose()?;
        if parts.total_price {
            if let Some(price) = price.as_mut() {
                let units = position
                    .as_ref()
                    .ok_or(BuildError::TotalPriceWithoutUnits)?
                    .units
                    .number
                    .abs();
                if units.is_zero() {
                    return Err(BuildError::TotalPriceWithZeroUnits);
                }
                price.number = number::divide(price.number, units)?;
            }
        }
        Ok(Node::Posting(Posting {
            account: parts.account,
            position,
            price,
            flag: parts.flag,
            meta: Metadata::new(prov),
        }))
    }

    // ──── Directives ────

    fn transaction(
        &mut self,
        prov: &Provenance,
        date: &str,
        flag: char,
        fields: TxnFields,
        lines: Vec<TxnLine<Node>>,
    ) -> Result<Node, BuildError> {
        let (payee, narration) = description(fields.strings)?;
        let mut tags: BTreeSet<String> = fields.tags.into_iter().collect();
        tags.extend(self.active_tags.iter().cloned());

        // Metadata before the first posting belongs to the transaction,
        // later lines to the posting above them.
        let mut meta = Metadata::new(prov);
        let mut postings: Vec<Posting> = Vec::new();
        for line in lines {
            match line {
                TxnLine::Posting(node) => postings.push(node.into_posting()?),
                TxnLine::Meta(node) => {
                    let (key, value) = node.into_key_value()?;
                    let target = match postings.last_mut() {
                        Some(posting) => &mut posting.meta,
                        None => &mut meta,
                    };
                    target.values.insert(key, value);
                }
            }
        }

        Ok(Node::Entry(Entry {
            date: parse_date(date)?,
            meta,
            directive: Directive::Transaction(Transaction {
                flag,
                payee,
                narration,
                tags,
                links: fields.links.into_iter().collect(),
                postings,
            }),
        }))
    }

    fn open(
        &mut self,
        prov: &Provenance,
        date: &str,
        account: &str,
        currencies: Vec<String>,
        booking: Option<String>,
        meta: Meta<Node>,
    ) -> Result<Node, BuildError> {
        let booking = booking
            .map(|b| b.parse::<BookingMethod>())
            .transpose()?;
        Self::entry(
            prov,
            date,
            meta,
            Directive::Open {
                account: account.to_string(),
                currencies,
                booking,
            },
        )
    }

    fn close(
        &mut self,
        prov: &Provenance,
        date: &str,
        account: &str,
        meta: Meta<Node>,
    ) -> Result<Node, BuildError> {
        let directive = Directive::Close {
            account: account.to_string(),
        };
        Self::entry(prov, date, meta, directive)
    }

    fn commodity(
        &mut self,
        prov: &Provenance,
        date: &str,
        currency: &str,
        meta: Meta<Node>,
    ) -> Result<Node, BuildError> {
        let directive = Directive::Commodity {
            currency: currency.to_string(),
        };
        Self::entry(prov, date, meta, directive)
    }

    fn pad(
        &mut self,
        prov: &Provenance,
        date: &str,
        account: &str,
        source_account: &str,
        meta: Meta<Node>,
    ) -> Result<Node, BuildError> {
        let directive = Directive::Pad {
            account: account.to_string(),
            source_account: source_account.to_string(),
        };
        Self::entry(prov, date, meta, directive)
    }

    fn balance(
        &mut self,
        prov: &Provenance,
        date: &str,
        account: &str,
        amount: Node,
        tolerance: Option<Node>,
        meta: Meta<Node>,
    ) -> Result<Node, BuildError> {
        let directive = Directive::Balance {
            account: account.to_string(),
            amount: amount.into_amount()?,
            tolerance: tolerance.map(Node::into_number).transpose()?,
        };
        Self::entry(prov, date, meta, directive)
    }

    fn price(
        &mut self,
        prov: &Provenance,
        date: &str,
        currency: &str,
        amount: Node,
        meta: Meta<Node>,
    ) -> Result<Node, BuildError> {
        let directive = Directive::Price {
            currency: currency.to_string(),
            amount: amount.into_amount()?,
        };
        Self::entry(prov, date, meta, directive)
    }

    fn event(
        &mut self,
        prov: &Provenance,
        date: &str,
        kind: &str,
        description: &str,
        meta: Meta<Node>,
    ) -> Result<Node, BuildError> {
        let directive = Directive::Event {
            kind: kind.to_string(),
            description: description.to_string(),
        };
        Self::entry(prov, date, meta, directive)
    }

    fn note(
        &mut self,
        prov: &Provenance,
        date: &str,
        account: &str,
        comment: &str,
        meta: Meta<Node>,
    ) -> Result<Node, BuildError> {
        let directive = Directive::Note {
            account: account.to_string(),
            comment: comment.to_string(),
        };
        Self::entry(prov, date, meta, directive)
    }

    fn document(
        &mut self,
        prov: &Provenance,
        date: &str,
        account: &str,
        filename: &str,
        meta: Meta<Node>,
    ) -> Result<Node, BuildError> {
        let directive = Directive::Document {
            account: account.to_string(),
            filename: filename.to_string(),
        };
        Self::entry(prov, date, meta, directive)
    }

    // ──── Non-entry directives ────

    fn option(&mut self, prov: &Provenance, key: &str, value: &str) -> Result<(), BuildError> {
        if let Some(previous) = self.options.insert(key.to_string(), value.to_string()) {
            tracing::debug!(file = %prov.file, line = prov.line, key, "option overridden");
            self.option_history
                .entry(key.to_string())
                .or_default()
                .push(previous);
        }
        Ok(())
    }

    fn include(&mut self, _prov: &Provenance, filename: &str) -> Result<(), BuildError> {
        self.includes.push(filename.to_string());
        Ok(())
    }

    fn plugin(
        &mut self,
        _prov: &Provenance,
        name: &str,
        config: Option<&str>,
    ) -> Result<(), BuildError> {
        self.plugins.push(Plugin {
            name: name.to_string(),
            config: config.map(str::to_string),
        });
        Ok(())
    }

    fn pushtag(&mut self, tag: &str) -> Result<(), BuildError> {
        self.active_tags.insert(tag.to_string());
        Ok(())
    }

    fn poptag(&mut self, tag: &str) -> Result<(), BuildError> {
        if self.active_tags.remove(tag) {
            Ok(())
        } else {
            Err(BuildError::AbsentTag(tag.to_string()))
        }
    }

    // ──── Results ────

    fn report_error(&mut self, diagnostic: &Diagnostic) {
        self.errors.push(diagnostic.clone());
    }

    fn finalize(&mut self, entries: Vec<Node>) -> Ledger {
        let mut errors = mem::take(&mut self.errors);
        let mut ledger_entries = Vec::with_capacity(entries.len());
        for node in entries {
            match node.into_entry() {
                Ok(entry) => ledger_entries.push(entry),
                Err(err) => errors.push(Diagnostic::semantic(&self.file, 0, err.to_string())),
            }
        }
        for tag in mem::take(&mut self.active_tags) {
            let err = BuildError::UnbalancedTag(tag);
            errors.push(Diagnostic::semantic(&self.file, 0, err.to_string()));
        }
        tracing::debug!(
            file = %self.file,
            entries = ledger_entries.len(),
            errors = errors.len(),
            "ledger finalized"
        );
        Ledger {
            entries: ledger_entries,
            errors,
            options: mem::take(&mut self.options),
            option_history: mem::take(&mut self.option_history),
            includes: mem::take(&mut self.includes),
            plugins: mem::take(&mut self.plugins),
        }
    }
}

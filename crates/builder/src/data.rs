//! The ledger data model produced by [`LedgerBuilder`](crate::LedgerBuilder).
//!
//! Every type serializes with serde. Dates render as `YYYY-MM-DD` and
//! decimals as strings, so the JSON form of a ledger is lossless.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_core::{Diagnostic, Provenance};
use time::macros::format_description;
use time::Date;

use crate::error::BuildError;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Parses `YYYY-MM-DD`, also accepting `/` as the separator.
pub fn parse_date(text: &str) -> Result<Date, BuildError> {
    let normalized = text.replace('/', "-");
    Date::parse(&normalized, format_description!("[year]-[month]-[day]"))
        .map_err(|_| BuildError::InvalidDate(text.to_string()))
}

// ──────────────────────────────────────────────
// Amounts and positions
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub number: Decimal,
    pub currency: String,
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.currency)
    }
}

/// The clauses of a lot specification, each optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostSpec {
    pub number_per: Option<Decimal>,
    pub number_total: Option<Decimal>,
    pub currency: Option<String>,
    #[serde(with = "iso_date::option")]
    pub date: Option<Date>,
    pub label: Option<String>,
    pub merge: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub units: Amount,
    pub cost: Option<CostSpec>,
}

// ──────────────────────────────────────────────
// Metadata
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MetaEntry {
    Str(String),
    Account(String),
    Date(#[serde(with = "iso_date")] Date),
    Currency(String),
    Tag(String),
    Bool(bool),
    Number(Decimal),
    Amount(Amount),
    Null,
}

/// Where a directive or posting came from, plus its `key: value` lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub filename: String,
    pub lineno: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, MetaEntry>,
}

impl Metadata {
    pub fn new(prov: &Provenance) -> Self {
        Metadata {
            filename: prov.file.clone(),
            lineno: prov.line,
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&MetaEntry> {
        self.values.get(key)
    }
}

// ──────────────────────────────────────────────
// Directives
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingMethod {
    Strict,
    None,
    Average,
    Fifo,
    Lifo,
}

impl FromStr for BookingMethod {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STRICT" => Ok(BookingMethod::Strict),
            "NONE" => Ok(BookingMethod::None),
            "AVERAGE" => Ok(BookingMethod::Average),
            "FIFO" => Ok(BookingMethod::Fifo),
            "LIFO" => Ok(BookingMethod::Lifo),
            other => Err(BuildError::InvalidBooking(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub account: String,
    pub position: Option<Position>,
    /// Per-unit price; `@@` totals are converted on construction.
    pub price: Option<Amount>,
    pub flag: Option<char>,
    pub meta: Metadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub flag: char,
    pub payee: Option<String>,
    pub narration: String,
    pub tags: BTreeSet<String>,
    pub links: BTreeSet<String>,
    pub postings: Vec<Posting>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Directive {
    Open {
        account: String,
        currencies: Vec<String>,
        booking: Option<BookingMethod>,
    },
    Close {
        account: String,
    },
    Commodity {
        currency: String,
    },
    Pad {
        account: String,
        source_account: String,
    },
    Balance {
        account: String,
        amount: Amount,
        tolerance: Option<Decimal>,
    },
    Transaction(Transaction),
    Note {
        account: String,
        comment: String,
    },
    Event {
        kind: String,
        description: String,
    },
    Price {
        currency: String,
        amount: Amount,
    },
    Document {
        account: String,
        filename: String,
    },
}

impl Directive {
    pub fn name(&self) -> &'static str {
        match self {
            Directive::Open { .. } => "open",
            Directive::Close { .. } => "close",
            Directive::Commodity { .. } => "commodity",
            Directive::Pad { .. } => "pad",
            Directive::Balance { .. } => "balance",
            Directive::Transaction(_) => "transaction",
            Directive::Note { .. } => "note",
            Directive::Event { .. } => "event",
            Directive::Price { .. } => "price",
            Directive::Document { .. } => "document",
        }
    }
}

/// One dated directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub meta: Metadata,
    #[serde(flatten)]
    pub directive: Directive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plugin {
    pub name: String,
    pub config: Option<String>,
}

/// Everything one parse produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    /// Dated directives in source order.
    pub entries: Vec<Entry>,
    /// Diagnostics received during the parse, then finalize-time errors.
    pub errors: Vec<Diagnostic>,
    pub options: BTreeMap<String, String>,
    /// Values replaced by a later `option` with the same key, oldest first.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub option_history: BTreeMap<String, Vec<String>>,
    pub includes: Vec<String>,
    pub plugins: Vec<Plugin>,
}

impl Ledger {
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.entries.iter().filter_map(|e| match &e.directive {
            Directive::Transaction(txn) => Some(txn),
            _ => None,
        })
    }
}

//! End-to-end: ledger text through the grammar engine into typed directives.

use std::str::FromStr;

use rust_decimal::Decimal;
use tally_builder::{
    load, load_with_options, Amount, BookingMethod, Directive, Ledger, MetaEntry,
};
use tally_core::{DiagnosticKind, ParseContext, ParseError, ParseOptions};
use tally_testkit::scan;

// ──────────────────────────────────────────────
// Test helpers
// ──────────────────────────────────────────────

fn load_str(src: &str) -> Ledger {
    let mut tokens = scan(src).into_iter();
    match load(&mut tokens, &ParseContext::new("main.ledger")) {
        Ok(ledger) => ledger,
        Err(failure) => panic!("load aborted: {failure}"),
    }
}

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn usd(n: &str) -> Amount {
    Amount {
        number: d(n),
        currency: "USD".into(),
    }
}

// ──────────────────────────────────────────────
// Well-formed input
// ──────────────────────────────────────────────

const HOUSEHOLD: &str = "\
option \"title\" \"Family\"
option \"title\" \"Household\"
plugin \"auto_accounts\"
include \"prices.ledger\"
2023-01-01 open Assets:Cash USD \"FIFO\"
  owner: \"me\"
pushtag #trip
2023-01-02 * \"Cafe\" \"Coffee\" #food ^rcpt
  rating: 5
  Assets:Cash  -3.50 USD
    paid: TRUE
  Expenses:Food  3.50 USD
poptag #trip
2023-01-03 balance Assets:Cash 1,000.00 ~ 0.01 USD
";

#[test]
fn file_level_state_is_collected() {
    let ledger = load_str(HOUSEHOLD);
    assert!(ledger.errors.is_empty(), "{:?}", ledger.errors);
    assert_eq!(ledger.options["title"], "Household");
    assert_eq!(ledger.option_history["title"], vec!["Family".to_string()]);
    assert_eq!(ledger.includes, vec!["prices.ledger".to_string()]);
    assert_eq!(ledger.plugins.len(), 1);
    assert_eq!(ledger.plugins[0].name, "auto_accounts");
    assert_eq!(ledger.plugins[0].config, None);
}

#[test]
fn open_carries_booking_and_metadata() {
    let ledger = load_str(HOUSEHOLD);
    let open = &ledger.entries[0];
    assert_eq!(open.meta.filename, "main.ledger");
    assert_eq!(open.meta.lineno, 5);
    assert_eq!(open.meta.get("owner"), Some(&MetaEntry::Str("me".into())));
    assert_eq!(
        open.directive,
        Directive::Open {
            account: "Assets:Cash".into(),
            currencies: vec!["USD".into()],
            booking: Some(BookingMethod::Fifo),
        }
    );
}

#[test]
fn transaction_collects_description_tags_and_metadata() {
    let ledger = load_str(HOUSEHOLD);
    let txn = ledger.transactions().next().expect("one transaction");
    assert_eq!(txn.flag, '*');
    assert_eq!(txn.payee.as_deref(), Some("Cafe"));
    assert_eq!(txn.narration, "Coffee");
    assert_eq!(
        txn.tags.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["food", "trip"]
    );
    assert_eq!(
        txn.links.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["rcpt"]
    );
    assert_eq!(txn.postings.len(), 2);
    assert_eq!(txn.postings[0].account, "Assets:Cash");
    assert_eq!(
        txn.postings[0].position.as_ref().map(|p| &p.units),
        Some(&usd("-3.50"))
    );
    assert_eq!(
        txn.postings[0].meta.get("paid"),
        Some(&MetaEntry::Bool(true))
    );
    assert_eq!(txn.postings[0].meta.lineno, 10);
    assert!(txn.postings[1].meta.values.is_empty());

    let entry = &ledger.entries[1];
    assert_eq!(entry.meta.get("rating"), Some(&MetaEntry::Number(d("5"))));
}

#[test]
fn balance_parses_thousands_and_tolerance() {
    let ledger = load_str(HOUSEHOLD);
    assert_eq!(
        ledger.entries[2].directive,
        Directive::Balance {
            account: "Assets:Cash".into(),
            amount: usd("1000.00"),
            tolerance: Some(d("0.01")),
        }
    );
}

#[test]
fn total_price_is_converted_and_cost_kept() {
    let ledger = load_str(
        "\
2023-01-01 * \"Buy\"
  Assets:Stock  10 HOOL {# 5000 USD, 2023-01-01} @@ 5100 USD
  Assets:Cash
",
    );
    assert!(ledger.errors.is_empty(), "{:?}", ledger.errors);
    let txn = ledger.transactions().next().unwrap();
    let posting = &txn.postings[0];
    assert_eq!(posting.price, Some(usd("510")));
    let cost = posting
        .position
        .as_ref()
        .and_then(|p| p.cost.as_ref())
        .expect("cost spec");
    assert_eq!(cost.number_per, None);
    assert_eq!(cost.number_total, Some(d("5000")));
    assert_eq!(cost.currency.as_deref(), Some("USD"));
    assert!(cost.date.is_some());
    assert!(!cost.merge);
}

#[test]
fn every_dated_directive_becomes_an_entry() {
    let ledger = load_str(
        "\
2023-01-01 commodity HOOL
2023-01-02 pad Assets:Cash Equity:Opening
2023-01-03 price HOOL 2 * 5 USD
2023-01-04 event \"location\" \"Paris\"
2023-01-05 note Assets:Cash \"Counted\"
2023-01-06 document Assets:Cash \"receipt.pdf\"
2023/01/07 close Assets:Cash
",
    );
    assert!(ledger.errors.is_empty(), "{:?}", ledger.errors);
    let names: Vec<_> = ledger.entries.iter().map(|e| e.directive.name()).collect();
    assert_eq!(
        names,
        vec!["commodity", "pad", "price", "event", "note", "document", "close"]
    );
    assert_eq!(
        ledger.entries[2].directive,
        Directive::Price {
            currency: "HOOL".into(),
            amount: usd("10"),
        }
    );
    assert_eq!(ledger.entries[6].date.to_string(), "2023-01-07");
}

// ──────────────────────────────────────────────
// Semantic failures
// ──────────────────────────────────────────────

#[test]
fn semantic_failures_are_diagnostics_and_parsing_continues() {
    let ledger = load_str(
        "\
2023-01-01 open Assets:Cash USD \"SOMETIMES\"
2023-02-30 close Assets:Cash
2023-01-03 * \"a\" \"b\" \"c\"
poptag #nope
2023-01-04 balance Assets:Cash 1 / 0 USD
2023-01-05 close Assets:Cash
",
    );
    let errors: Vec<_> = ledger
        .errors
        .iter()
        .map(|e| (e.kind, e.line, e.message.as_str()))
        .collect();
    assert_eq!(
        errors,
        vec![
            (DiagnosticKind::Semantic, 1, "invalid booking method 'SOMETIMES'"),
            (DiagnosticKind::Semantic, 2, "invalid date '2023-02-30'"),
            (
                DiagnosticKind::Semantic,
                3,
                "too many strings on transaction description (3); expected at most 2"
            ),
            (DiagnosticKind::Semantic, 4, "attempting to pop absent tag: 'nope'"),
            (DiagnosticKind::Semantic, 5, "division by zero"),
        ]
    );
    assert_eq!(ledger.entries.len(), 1);
    assert_eq!(ledger.entries[0].meta.lineno, 6);
}

#[test]
fn syntax_errors_and_unbalanced_tags_are_reported_in_order() {
    let ledger = load_str(
        "\
pushtag #forever
2023-01-01 open
2023-01-02 close Assets:Cash
",
    );
    let kinds: Vec<_> = ledger.errors.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![DiagnosticKind::Syntax, DiagnosticKind::Semantic]);
    assert_eq!(ledger.errors[1].message, "unbalanced pushed tag: 'forever'");
    assert_eq!(ledger.entries.len(), 1);
}

#[test]
fn aborted_parse_is_an_error() {
    let options = ParseOptions {
        max_stack_depth: 8,
        ..ParseOptions::default()
    };
    let mut tokens = scan("2023-01-01 balance Assets:Cash ((((((1)))))) USD\n").into_iter();
    let failure = load_with_options(&mut tokens, &ParseContext::new("deep.ledger"), &options)
        .unwrap_err();
    assert_eq!(failure.error, ParseError::StackOverflow { depth: 8 });
}

// ──────────────────────────────────────────────
// Serialization
// ──────────────────────────────────────────────

#[test]
fn ledger_serializes_to_json() {
    let ledger = load_str("2023-01-01 balance Assets:Cash 10.50 USD\n");
    let json = ledger.to_json_value();
    assert_eq!(
        json["entries"][0],
        serde_json::json!({
            "date": "2023-01-01",
            "meta": { "filename": "main.ledger", "lineno": 1 },
            "type": "balance",
            "account": "Assets:Cash",
            "amount": { "number": "10.50", "currency": "USD" },
            "tolerance": null
        })
    );
    let back: Ledger = serde_json::from_value(json).unwrap();
    assert_eq!(back, ledger);
}

//! Directive scenarios: ledger text in, Builder calls out.
//!
//! Token streams come from the fixture scanner and every Builder call is
//! rendered as text by the recording Builder, so each test states exactly
//! which calls a construct produces and in which order.

use tally_core::{parse, ParseContext, Parsed};
use tally_testkit::{scan, RecordingBuilder};

// ──────────────────────────────────────────────
// Test helpers
// ──────────────────────────────────────────────

fn run(src: &str) -> (RecordingBuilder, Parsed<Vec<String>>) {
    let mut builder = RecordingBuilder::new();
    let mut tokens = scan(src).into_iter();
    let parsed = match parse(&mut tokens, &mut builder, &ParseContext::new("test.ledger")) {
        Ok(parsed) => parsed,
        Err(failure) => panic!("parse of {src:?} aborted: {failure} {:?}", failure.diagnostics),
    };
    (builder, parsed)
}

fn run_clean(src: &str) -> (RecordingBuilder, Vec<String>) {
    let (builder, parsed) = run(src);
    assert!(
        parsed.diagnostics.is_empty(),
        "unexpected diagnostics for {src:?}: {:?}",
        parsed.diagnostics
    );
    (builder, parsed.output)
}

// ──────────────────────────────────────────────
// Literal scenarios
// ──────────────────────────────────────────────

#[test]
fn open_with_one_currency() {
    let (builder, output) = run_clean("2023-01-01 open Assets:Cash USD\n");
    let expected = "open(2023-01-01, Assets:Cash, [USD], booking=none, meta=none)";
    assert_eq!(builder.calls_of("open"), vec![expected]);
    assert_eq!(output, vec![expected]);
}

#[test]
fn transaction_with_two_postings() {
    let src = "\
2023-01-01 * \"Grocery\" \"Bought food\"
  Assets:Cash  -10.00 USD
  Expenses:Food  10.00 USD
";
    let (builder, output) = run_clean(src);
    assert_eq!(
        builder.calls_of("posting"),
        vec![
            "posting(Assets:Cash, (-10.00) USD, none, flag=none, txn=*)",
            "posting(Expenses:Food, 10.00 USD, none, flag=none, txn=*)",
        ]
    );
    assert_eq!(
        output,
        vec![
            "transaction(2023-01-01, *, [\"Grocery\", \"Bought food\"], tags=[], links=[], \
             [posting(Assets:Cash, (-10.00) USD, none, flag=none, txn=*); \
             posting(Expenses:Food, 10.00 USD, none, flag=none, txn=*)])"
        ]
    );
}

#[test]
fn stray_token_between_two_balances() {
    let src = "\
2023-01-01 balance Assets:Cash 10 USD
Assets:Stray
2023-01-03 balance Assets:Cash 12 USD
";
    let (_, parsed) = run(src);
    assert_eq!(
        parsed.output,
        vec![
            "balance(2023-01-01, Assets:Cash, 10 USD, tolerance=none, meta=none)",
            "balance(2023-01-03, Assets:Cash, 12 USD, tolerance=none, meta=none)",
        ]
    );
    assert_eq!(parsed.diagnostics.len(), 1, "{:?}", parsed.diagnostics);
    assert_eq!(parsed.diagnostics[0].line, 2);
    assert!(
        parsed.diagnostics[0]
            .message
            .starts_with("syntax error, unexpected ACCOUNT"),
        "message: {}",
        parsed.diagnostics[0].message
    );
}

#[test]
fn tag_stack_calls_surround_the_transaction() {
    let src = "\
pushtag #trip
2023-01-01 * \"Shop\"
  Assets:Cash  -1 USD
  Expenses:Food
poptag #trip
";
    let (builder, _) = run_clean(src);
    assert_eq!(
        builder.calls_among(&["pushtag", "transaction", "poptag"]),
        vec![
            "pushtag(trip)",
            "transaction(2023-01-01, *, [\"Shop\"], tags=[], links=[], \
             [posting(Assets:Cash, (-1) USD, none, flag=none, txn=*); \
             posting(Expenses:Food, none, none, flag=none, txn=*)])",
            "poptag(trip)",
        ]
    );
}

// ──────────────────────────────────────────────
// Arithmetic
// ──────────────────────────────────────────────

fn balance_amount(expr: &str) -> String {
    let (builder, _) = run_clean(&format!("2023-01-01 balance Assets:Cash {expr} USD\n"));
    builder
        .calls_of("amount")
        .first()
        .map(|call| call.to_string())
        .unwrap_or_default()
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    assert_eq!(balance_amount("2 + 3 * 4"), "amount((2 + (3 * 4)) USD)");
}

#[test]
fn subtraction_after_unary_minus() {
    assert_eq!(balance_amount("-2 - 3"), "amount(((-2) - 3) USD)");
}

#[test]
fn parentheses_group_first() {
    assert_eq!(balance_amount("(2 + 3) * 4"), "amount(((2 + 3) * 4) USD)");
}

#[test]
fn operators_of_equal_rank_associate_left() {
    assert_eq!(balance_amount("8 / 4 / 2"), "amount(((8 / 4) / 2) USD)");
    assert_eq!(balance_amount("1 - 2 + 3"), "amount(((1 - 2) + 3) USD)");
}

#[test]
fn unary_plus_and_parentheses_call_no_builder_operation() {
    let (builder, _) = run_clean("2023-01-01 balance Assets:Cash +(5) USD\n");
    assert_eq!(
        builder.log(),
        vec![
            "number(5)",
            "amount(5 USD)",
            "balance(2023-01-01, Assets:Cash, 5 USD, tolerance=none, meta=none)",
            "finalize(1)",
        ]
    );
}

// ──────────────────────────────────────────────
// Directive shapes
// ──────────────────────────────────────────────

#[test]
fn every_dated_directive_reaches_the_builder() {
    let src = "\
2023-01-01 commodity USD
  name: \"Dollar\"
2023-01-01 open Assets:Cash USD, EUR \"FIFO\"
2023-01-02 close Assets:Old
2023-01-03 pad Assets:Cash Equity:Opening
2023-01-04 price EUR 1.10 USD
2023-01-05 event \"location\" \"Paris\"
2023-01-06 note Assets:Cash \"Counted\"
2023-01-07 document Assets:Cash \"receipt.pdf\"
";
    let (_, output) = run_clean(src);
    assert_eq!(
        output,
        vec![
            "commodity(2023-01-01, USD, meta=[name: \"Dollar\"])",
            "open(2023-01-01, Assets:Cash, [USD, EUR], booking=\"FIFO\", meta=none)",
            "close(2023-01-02, Assets:Old, meta=none)",
            "pad(2023-01-03, Assets:Cash, Equity:Opening, meta=none)",
            "price(2023-01-04, EUR, 1.10 USD, meta=none)",
            "event(2023-01-05, \"location\", \"Paris\", meta=none)",
            "note(2023-01-06, Assets:Cash, \"Counted\", meta=none)",
            "document(2023-01-07, Assets:Cash, \"receipt.pdf\", meta=none)",
        ]
    );
}

#[test]
fn undated_directives_are_not_entries() {
    let src = "\
option \"title\" \"Books\"
include \"other.ledger\"
plugin \"auto\"
plugin \"check\" \"strict\"
";
    let (builder, output) = run_clean(src);
    assert!(output.is_empty());
    assert_eq!(
        builder.calls_among(&["option", "include", "plugin"]),
        vec![
            "option(\"title\", \"Books\")",
            "include(\"other.ledger\")",
            "plugin(\"auto\", config=none)",
            "plugin(\"check\", config=\"strict\")",
        ]
    );
}

#[test]
fn directives_carry_their_line() {
    let src = "\n; comment\n2023-01-01 open Assets:Cash\n\n2023-01-02 close Assets:Cash\n";
    let (builder, _) = run_clean(src);
    let lines: Vec<_> = builder
        .calls()
        .iter()
        .filter(|c| c.op == "open" || c.op == "close")
        .map(|c| c.line)
        .collect();
    assert_eq!(lines, vec![Some(3), Some(5)]);
}

#[test]
fn balance_with_tolerance() {
    let (_, output) = run_clean("2023-01-01 balance Assets:Cash 10 ~ 0.01 USD\n");
    assert_eq!(
        output,
        vec!["balance(2023-01-01, Assets:Cash, 10 USD, tolerance=0.01, meta=none)"]
    );
}

#[test]
fn transaction_fields_tags_links_and_flags() {
    let src = "\
2023-01-01 ! \"Payee\" \"Note\" #trip ^inv-1
  ! Assets:Cash  -1 USD
  Expenses:Food
";
    let (builder, _) = run_clean(src);
    assert_eq!(
        builder.calls_of("posting"),
        vec![
            "posting(Assets:Cash, (-1) USD, none, flag=!, txn=!)",
            "posting(Expenses:Food, none, none, flag=none, txn=!)",
        ]
    );
    let txn = builder.calls_of("transaction");
    assert_eq!(txn.len(), 1);
    assert!(
        txn[0].starts_with("transaction(2023-01-01, !, [\"Payee\", \"Note\"], tags=[trip], links=[inv-1]"),
        "{}",
        txn[0]
    );
}

#[test]
fn txn_keyword_means_the_complete_flag() {
    let (builder, _) = run_clean("2023-01-01 txn \"Lunch\"\n  Expenses:Food\n");
    assert_eq!(
        builder.calls_of("posting"),
        vec!["posting(Expenses:Food, none, none, flag=none, txn=*)"]
    );
}

#[test]
fn metadata_before_and_between_postings() {
    let src = "\
2023-01-01 * \"Shop\"
  receipt: TRUE
  Assets:Cash  -1 USD
    seen: 2023-01-02
  Expenses:Food
";
    let (builder, _) = run_clean(src);
    assert_eq!(
        builder.calls_of("key_value"),
        vec!["key_value(receipt: true)", "key_value(seen: 2023-01-02)"]
    );
    let txn = builder.calls_of("transaction");
    assert!(
        txn[0].ends_with(
            "[meta(receipt: true); posting(Assets:Cash, (-1) USD, none, flag=none, txn=*); \
             meta(seen: 2023-01-02); posting(Expenses:Food, none, none, flag=none, txn=*)])"
        ),
        "{}",
        txn[0]
    );
}

#[test]
fn metadata_value_shapes() {
    let src = "\
2023-01-01 close Assets:Cash
  a: \"text\"
  b: Assets:Other
  c: USD
  d: #tag
  e: 2 * 3
  f: 4 EUR
  g:
";
    let (builder, _) = run_clean(src);
    assert_eq!(
        builder.calls_of("key_value"),
        vec![
            "key_value(a: \"text\")",
            "key_value(b: Assets:Other)",
            "key_value(c: USD)",
            "key_value(d: #tag)",
            "key_value(e: (2 * 3))",
            "key_value(f: 4 EUR)",
            "key_value(g: none)",
        ]
    );
}

#[test]
fn lot_specification_and_per_unit_price() {
    let src = "\
2023-01-01 * \"Buy\"
  Assets:Stock  10 HOOL {500.00 USD, 2023-01-01, \"lot1\"} @ 510.00 USD
  Assets:Cash
";
    let (builder, _) = run_clean(src);
    assert_eq!(
        builder.calls_of("lot_spec"),
        vec!["lot_spec({500.00 # none USD, 2023-01-01, \"lot1\"})"]
    );
    assert_eq!(
        builder.calls_of("posting")[0],
        "posting(Assets:Stock, 10 HOOL {500.00 # none USD, 2023-01-01, \"lot1\"}, \
         @ 510.00 USD, flag=none, txn=*)"
    );
}

#[test]
fn compound_cost_merge_marker_and_total_price() {
    let src = "\
2023-01-01 * \"Buy\"
  Assets:Stock  10 HOOL {# 5000 USD, *} @@ 5100 USD
  Assets:Cash
";
    let (builder, _) = run_clean(src);
    assert_eq!(
        builder.calls_of("compound_amount"),
        vec!["compound_amount(none # 5000 USD)"]
    );
    assert_eq!(
        builder.calls_of("posting")[0],
        "posting(Assets:Stock, 10 HOOL {none # 5000 USD, *}, @@ 5100 USD, flag=none, txn=*)"
    );
}

#[test]
fn empty_lot_specification() {
    let (builder, _) = run_clean("2023-01-01 *\n  Assets:Stock  -10 HOOL {}\n  Assets:Cash\n");
    assert_eq!(builder.calls_of("lot_spec"), vec!["lot_spec({})"]);
}

#[test]
fn comments_and_org_headings_are_ignored() {
    let src = "\
* Accounts
2023-01-01 open Assets:Cash ; main wallet
; standalone comment

2023-01-02 close Assets:Cash
";
    let (_, output) = run_clean(src);
    assert_eq!(output.len(), 2);
}

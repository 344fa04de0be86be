//! Every Builder handle is released exactly once, whatever path the parse
//! takes: consumed by a reduction, popped during recovery, discarded with a
//! lookahead, or left on the stack when the parse aborts.

use tally_core::{parse, parse_with_options, DiagnosticKind, ParseContext, ParseError, ParseOptions};
use tally_testkit::{scan, RecordingBuilder};

fn assert_balanced(builder: &RecordingBuilder) {
    assert!(builder.acquired() > 0, "fixture created no handles");
    assert_eq!(
        builder.acquired(),
        builder.released(),
        "{} handles still alive",
        builder.live()
    );
}

const LEDGER: &str = "\
option \"title\" \"Books\"
2023-01-01 open Assets:Cash USD, EUR
  opened-by: \"me\"
2023-01-02 * \"Shop\" \"Food\" #trip
  memo: 3 * (2 + 1) USD
  Assets:Cash  -10.00 USD
  Expenses:Food  2 HOOL {4.00 # 2 USD, 2023-01-01, \"a\", *} @@ 10 USD
2023-01-03 balance Assets:Cash -10 ~ 0.5 USD
2023-01-04 price HOOL 5 USD
";

#[test]
fn successful_parse_releases_everything() {
    let mut builder = RecordingBuilder::new();
    let mut tokens = scan(LEDGER).into_iter();
    let parsed = parse(&mut tokens, &mut builder, &ParseContext::new("t")).unwrap();
    assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
    assert_eq!(parsed.output.len(), 4);
    assert_balanced(&builder);
}

#[test]
fn rejected_reductions_release_their_inputs() {
    for op in ["amount", "position", "lot_spec", "posting", "key_value", "transaction"] {
        let mut builder = RecordingBuilder::new().fail_on(op);
        let mut tokens = scan(LEDGER).into_iter();
        let parsed = parse(&mut tokens, &mut builder, &ParseContext::new("t")).unwrap();
        assert!(
            parsed
                .diagnostics
                .iter()
                .any(|d| d.kind == DiagnosticKind::Semantic),
            "{op}: no semantic diagnostic"
        );
        assert_balanced(&builder);
    }
}

#[test]
fn recovery_releases_popped_values() {
    // The second posting fails after the first one is already on the stack
    // inside the transaction's line list.
    let src = "\
2023-01-01 open Assets:Cash
2023-01-02 *
  Assets:Cash  -1 USD
  Expenses:Food  1 USD {
2023-01-03 close Assets:Cash
";
    let mut builder = RecordingBuilder::new();
    let mut tokens = scan(src).into_iter();
    let parsed = parse(&mut tokens, &mut builder, &ParseContext::new("t")).unwrap();
    assert_eq!(parsed.output.len(), 2);
    assert_eq!(parsed.diagnostics.len(), 1);
    assert_balanced(&builder);
}

#[test]
fn discarded_tokens_after_an_error_release_nothing_twice() {
    let src = "\
2023-01-01 balance Assets:Cash 1 USD USD USD
2023-01-02 balance Assets:Cash 1 + 2 USD $ 4
2023-01-03 balance Assets:Cash 3 USD
";
    let mut builder = RecordingBuilder::new();
    let mut tokens = scan(src).into_iter();
    let parsed = parse(&mut tokens, &mut builder, &ParseContext::new("t")).unwrap();
    assert_eq!(parsed.output.len(), 1);
    assert_balanced(&builder);
}

#[test]
fn stack_overflow_aborts_and_releases_the_stack() {
    let src = "\
2023-01-01 open Assets:Cash
2023-01-02 * \"x\"
  Assets:Cash  1 USD
  Assets:Other  ((((((((1)))))))) USD
";
    let options = ParseOptions {
        initial_stack_depth: 4,
        max_stack_depth: 12,
        ..ParseOptions::default()
    };
    let mut builder = RecordingBuilder::new();
    let mut tokens = scan(src).into_iter();
    let failure = parse_with_options(&mut tokens, &mut builder, &ParseContext::new("t"), &options)
        .unwrap_err();

    assert_eq!(failure.error, ParseError::StackOverflow { depth: 12 });
    let last = failure.diagnostics.last().unwrap();
    assert_eq!(last.kind, DiagnosticKind::Fatal);
    assert_eq!(last.line, 4);
    assert_eq!(builder.diagnostics().last(), Some(last));
    assert!(builder.calls_of("finalize").is_empty());
    assert_balanced(&builder);
}

#[test]
fn default_stack_handles_deep_nesting() {
    let depth = 150;
    let expr = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    let src = format!("2023-01-01 balance Assets:Cash {expr} USD\n");
    let mut builder = RecordingBuilder::new();
    let mut tokens = scan(&src).into_iter();
    let parsed = parse(&mut tokens, &mut builder, &ParseContext::new("t")).unwrap();
    assert_eq!(parsed.output.len(), 1);
    assert_balanced(&builder);
}

#[test]
fn growth_beyond_the_initial_depth_is_transparent() {
    let options = ParseOptions {
        initial_stack_depth: 2,
        ..ParseOptions::default()
    };
    let mut builder = RecordingBuilder::new();
    let mut tokens = scan(LEDGER).into_iter();
    let parsed =
        parse_with_options(&mut tokens, &mut builder, &ParseContext::new("t"), &options).unwrap();
    assert_eq!(parsed.output.len(), 4);
    assert_balanced(&builder);
}

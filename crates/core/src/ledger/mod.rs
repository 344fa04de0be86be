//! The ledger directive language.
//!
//! Tables are generated from [`ledger_grammar`] on first use and shared by
//! every parse in the process. A parse owns its stack, lookahead and
//! diagnostics; only the Builder it is given sees its results.

mod dispatch;
mod rules;

use std::sync::OnceLock;

use crate::builder::Builder;
use crate::context::{ParseContext, ParseOptions};
use crate::diagnostic::Diagnostic;
use crate::driver::Driver;
use crate::error::{ParseError, ParseFailure};
use crate::grammar::{Grammar, GrammarError};
use crate::tables::ParseTables;
use crate::token::TokenSource;
use crate::value::SemanticValue;

pub use dispatch::LedgerReducer;
pub use rules::{ledger_grammar, Production};

pub struct LedgerSyntax {
    pub grammar: Grammar<Production>,
    pub tables: ParseTables,
}

static SYNTAX: OnceLock<Result<LedgerSyntax, GrammarError>> = OnceLock::new();

/// The ledger grammar and its tables, built once.
pub fn syntax() -> Result<&'static LedgerSyntax, ParseError> {
    SYNTAX
        .get_or_init(|| {
            let grammar = ledger_grammar()?;
            let tables = ParseTables::build(&grammar);
            for conflict in tables.conflicts() {
                tracing::warn!(?conflict, "unresolved grammar conflict");
            }
            Ok(LedgerSyntax { grammar, tables })
        })
        .as_ref()
        .map_err(|err| ParseError::Internal(err.to_string()))
}

/// A completed parse: the Builder's finalized output plus every diagnostic
/// emitted along the way. Diagnostics do not imply an empty output.
#[derive(Debug)]
pub struct Parsed<O> {
    pub output: O,
    pub diagnostics: Vec<Diagnostic>,
}

impl<O> Parsed<O> {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.kind.is_error())
    }
}

pub fn parse<B, S>(
    source: &mut S,
    builder: &mut B,
    context: &ParseContext,
) -> Result<Parsed<B::Output>, ParseFailure>
where
    B: Builder,
    S: TokenSource + ?Sized,
{
    parse_with_options(source, builder, context, &ParseOptions::default())
}

#[tracing::instrument(skip_all, fields(file = %context.file))]
pub fn parse_with_options<B, S>(
    source: &mut S,
    builder: &mut B,
    context: &ParseContext,
    options: &ParseOptions,
) -> Result<Parsed<B::Output>, ParseFailure>
where
    B: Builder,
    S: TokenSource + ?Sized,
{
    let syntax = match syntax() {
        Ok(syntax) => syntax,
        Err(error) => return Err(abort(builder, context, error, Vec::new())),
    };

    let mut reducer = LedgerReducer::new(builder, context);
    let result = Driver::new(&syntax.grammar, &syntax.tables, context, options)
        .run(source, &mut reducer);
    let diagnostics = reducer.into_diagnostics();

    match result {
        Ok(SemanticValue::List(entries)) => {
            let output = builder.finalize(entries);
            Ok(Parsed {
                output,
                diagnostics,
            })
        }
        Ok(other) => {
            let error = ParseError::Internal(format!(
                "start symbol reduced to {} instead of an entry list",
                other.variant()
            ));
            Err(abort(builder, context, error, diagnostics))
        }
        Err(error) => Err(ParseFailure { error, diagnostics }),
    }
}

fn abort<B: Builder>(
    builder: &mut B,
    context: &ParseContext,
    error: ParseError,
    mut diagnostics: Vec<Diagnostic>,
) -> ParseFailure {
    let fatal = Diagnostic::fatal(&context.file, 0, error.to_string());
    builder.report_error(&fatal);
    diagnostics.push(fatal);
    ParseFailure { error, diagnostics }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    #[test]
    fn ledger_tables_have_no_conflicts() {
        let syntax = syntax().unwrap();
        assert!(
            syntax.tables.conflicts().is_empty(),
            "conflicts: {:?}",
            syntax.tables.conflicts()
        );
    }

    #[test]
    fn start_state_reduces_without_lookahead() {
        let tables = &syntax().unwrap().tables;
        assert!(!tables.needs_lookahead(ParseTables::START_STATE));
        let Some(rule) = tables.default_reduction(ParseTables::START_STATE) else {
            panic!("start state must reduce the empty declaration list");
        };
        assert_eq!(tables.rule_len(rule), 0);
    }

    #[test]
    fn declaration_state_accepts_error_and_every_line_start() {
        let syntax = syntax().unwrap();
        let tables = &syntax.tables;
        let start = ParseTables::START_STATE;
        let rule = tables.default_reduction(start).unwrap();
        let decls = tables.goto(start, tables.rule_lhs(rule)).unwrap();
        assert!(tables.error_shift(decls).is_some());
        let expected = tables.expected_tokens(decls);
        for kind in [
            TokenKind::End,
            TokenKind::Eol,
            TokenKind::Comment,
            TokenKind::Skipped,
            TokenKind::Date,
            TokenKind::PushTag,
            TokenKind::PopTag,
            TokenKind::Option,
            TokenKind::Include,
            TokenKind::Plugin,
        ] {
            assert!(expected.contains(&kind), "{kind} missing from {expected:?}");
        }
    }
}

//! Table-driven shift-reduce automaton with panic-mode error recovery.
//!
//! The driver owns the parse stack and the single buffered lookahead. What
//! a reduction means is left to a [`Reducer`]: the driver only hands it the
//! popped values and spans and pushes back whatever it returns.
//!
//! Recovery works on the grammar's `error` symbol. When no action exists
//! for the current state and lookahead, the driver reports once, pops
//! states until one can shift `error`, shifts it and resumes. Until
//! `recovery_shifts` real tokens have been shifted again, further errors
//! are silent and the offending lookahead is discarded instead.

use crate::context::{ParseContext, ParseOptions};
use crate::diagnostic::Diagnostic;
use crate::error::ParseError;
use crate::grammar::Grammar;
use crate::report;
use crate::span::Span;
use crate::stack::ParseStack;
use crate::tables::{Action, ParseTables};
use crate::token::{Token, TokenKind, TokenSource, TokenValue};

/// One completed rule, handed to the reducer.
#[derive(Debug)]
pub struct Reduction<'s, V> {
    pub rule: usize,
    /// From the first consumed symbol's start to the last one's end; the
    /// end point of the preceding symbol for empty rules.
    pub span: Span,
    /// The consumed values, in source order. Ownership passes to the
    /// reducer.
    pub values: Vec<V>,
    pub spans: Vec<Span>,
    /// Values still on the stack beneath the consumed ones, deepest first.
    pub below: &'s [V],
}

#[derive(Debug)]
pub enum ReduceError {
    /// The construct was refused. The message becomes a semantic diagnostic
    /// and the driver recovers as for a syntax error.
    Rejected(String),
    /// Abort the whole parse.
    Fatal(ParseError),
}

impl From<ParseError> for ReduceError {
    fn from(err: ParseError) -> Self {
        ReduceError::Fatal(err)
    }
}

/// Gives meaning to reductions.
pub trait Reducer<A> {
    /// Stack slot contents. `Default` fills the bottom slot and the slot
    /// of a shifted `error` symbol.
    type Value: Default;

    fn token_value(&mut self, token: Token) -> Self::Value;

    fn reduce(
        &mut self,
        action: &A,
        reduction: Reduction<'_, Self::Value>,
    ) -> Result<Self::Value, ReduceError>;

    /// Receives every diagnostic in emission order.
    fn report(&mut self, diagnostic: Diagnostic);
}

pub struct Driver<'p, A> {
    grammar: &'p Grammar<A>,
    tables: &'p ParseTables,
    context: &'p ParseContext,
    options: &'p ParseOptions,
}

impl<'p, A> Driver<'p, A> {
    pub fn new(
        grammar: &'p Grammar<A>,
        tables: &'p ParseTables,
        context: &'p ParseContext,
        options: &'p ParseOptions,
    ) -> Self {
        Driver {
            grammar,
            tables,
            context,
            options,
        }
    }

    /// Runs the automaton to Accept and returns the start symbol's value.
    ///
    /// On abort the reducer has received a final `Fatal` diagnostic and
    /// every value still on the stack has been dropped.
    pub fn run<R, S>(&self, source: &mut S, reducer: &mut R) -> Result<R::Value, ParseError>
    where
        R: Reducer<A>,
        S: TokenSource + ?Sized,
    {
        let mut machine = Machine {
            driver: self,
            source,
            reducer,
            lookahead: None,
            last_span: Span::start(),
            exhausted: false,
            err_status: 0,
            errors: 0,
            shifts: 0,
            reductions: 0,
        };
        let result = machine.parse();
        if let Err(err) = &result {
            let line = machine.current_line();
            machine
                .reducer
                .report(Diagnostic::fatal(&self.context.file, line, err.to_string()));
        }
        tracing::debug!(
            file = %self.context.file,
            shifts = machine.shifts,
            reductions = machine.reductions,
            errors = machine.errors,
            ok = result.is_ok(),
            "parse finished"
        );
        result
    }
}

struct Machine<'d, 'p, 'r, A, R, S: ?Sized> {
    driver: &'d Driver<'p, A>,
    source: &'r mut S,
    reducer: &'r mut R,
    lookahead: Option<Token>,
    /// Span of the last token read from the source.
    last_span: Span,
    exhausted: bool,
    /// Shifts still required before syntax errors are reported again.
    err_status: u8,
    errors: usize,
    shifts: usize,
    reductions: usize,
}

impl<'d, 'p, 'r, A, R, S> Machine<'d, 'p, 'r, A, R, S>
where
    R: Reducer<A>,
    S: TokenSource + ?Sized,
{
    fn parse(&mut self) -> Result<R::Value, ParseError> {
        let tables = self.driver.tables;
        let options = self.driver.options;
        let mut stack = ParseStack::new(options.initial_stack_depth, options.max_stack_depth)?;
        stack.push(ParseTables::START_STATE, R::Value::default(), Span::start())?;

        loop {
            let state = top_state(&stack)?;
            let default = tables
                .default_reduction(state)
                .map_or(Action::Error, Action::Reduce);
            let action = if tables.needs_lookahead(state) {
                match tables.action(state, self.peek()) {
                    Action::Error => default,
                    action => action,
                }
            } else {
                default
            };

            match action {
                Action::Shift(to) => {
                    let token = self
                        .lookahead
                        .take()
                        .ok_or_else(|| ParseError::Internal("shift without a lookahead".into()))?;
                    tracing::trace!(state, token = %token.kind, to, "shift");
                    self.err_status = self.err_status.saturating_sub(1);
                    self.shifts += 1;
                    let span = token.span;
                    let value = self.reducer.token_value(token);
                    stack.push(to, value, span)?;
                }
                Action::Reduce(rule) => {
                    if let Some(start) = self.reduce(&mut stack, rule)? {
                        self.recover(&mut stack, start)?;
                    }
                }
                Action::Accept => {
                    let (_, value, _) = stack
                        .pop()
                        .ok_or_else(|| ParseError::Internal("accept on an empty stack".into()))?;
                    return Ok(value);
                }
                Action::Error => {
                    let start = self.syntax_error(state)?;
                    self.recover(&mut stack, start)?;
                }
            }
        }
    }

    /// Kind of the current lookahead, reading one if none is buffered.
    fn peek(&mut self) -> TokenKind {
        if let Some(token) = &self.lookahead {
            return token.kind;
        }
        let token = self.read();
        let kind = token.kind;
        self.lookahead = Some(token);
        kind
    }

    fn read(&mut self) -> Token {
        if self.exhausted {
            return Token::end(self.last_span.end_point());
        }
        match self.source.next_token() {
            Some(token) => {
                if token.kind == TokenKind::LexError {
                    let message = match &token.value {
                        TokenValue::Text(text) => text.clone(),
                        _ => "invalid token".to_owned(),
                    };
                    let line = self.driver.context.line_of(&token.span);
                    self.errors += 1;
                    self.reducer
                        .report(Diagnostic::lexical(&self.driver.context.file, line, message));
                }
                self.last_span = token.span;
                token
            }
            None => {
                self.exhausted = true;
                Token::end(self.last_span.end_point())
            }
        }
    }

    /// Pops a rule's right-hand side and pushes its result. Returns the
    /// rule's span when the reducer refused it.
    fn reduce(
        &mut self,
        stack: &mut ParseStack<R::Value>,
        rule: usize,
    ) -> Result<Option<Span>, ParseError> {
        let tables = self.driver.tables;
        let grammar = self.driver.grammar;
        let len = tables.rule_len(rule);
        let (values, spans) = stack.pop_n(len);
        let span = match (spans.first(), spans.last()) {
            (Some(first), Some(last)) => Span::cover(first, last),
            _ => stack.top_span().unwrap_or_default().end_point(),
        };
        tracing::trace!(rule = %grammar.describe_rule(rule), "reduce");
        self.reductions += 1;

        let reduction = Reduction {
            rule,
            span,
            values,
            spans,
            below: stack.values(),
        };
        match self.reducer.reduce(&grammar.rule(rule).action, reduction) {
            Ok(value) => {
                let state = top_state(stack)?;
                let to = tables.goto(state, tables.rule_lhs(rule)).ok_or_else(|| {
                    ParseError::Internal(format!("no goto from state {state} after rule {rule}"))
                })?;
                stack.push(to, value, span)?;
                Ok(None)
            }
            Err(ReduceError::Rejected(message)) => {
                let line = self.driver.context.line_of(&span);
                tracing::debug!(rule, line, %message, "reduction rejected");
                self.errors += 1;
                self.reducer
                    .report(Diagnostic::semantic(&self.driver.context.file, line, message));
                Ok(Some(span))
            }
            Err(ReduceError::Fatal(err)) => Err(err),
        }
    }

    /// Handles a missing table action: reports unless still recovering, and
    /// drops the lookahead if it already failed right after a recovery.
    fn syntax_error(&mut self, state: usize) -> Result<Span, ParseError> {
        let options = self.driver.options;
        let kind = self.peek();
        let span = self.lookahead.as_ref().map_or(self.last_span, |t| t.span);

        if self.err_status == 0 {
            self.errors += 1;
            if !report::is_silenced(kind) {
                let message =
                    report::syntax_message(self.driver.tables, state, kind, options.max_expected_tokens);
                let line = self.driver.context.line_of(&span);
                tracing::debug!(state, token = %kind, line, "syntax error");
                self.reducer
                    .report(Diagnostic::syntax(&self.driver.context.file, line, message));
            }
        }

        if self.err_status == options.recovery_shifts {
            if kind == TokenKind::End {
                return Err(self.unrecoverable());
            }
            tracing::debug!(token = %kind, "discarding lookahead");
            self.lookahead = None;
        }
        Ok(span)
    }

    /// Pops until a state can shift `error`, then shifts it.
    fn recover(&mut self, stack: &mut ParseStack<R::Value>, start: Span) -> Result<(), ParseError> {
        let tables = self.driver.tables;
        self.err_status = self.driver.options.recovery_shifts;
        let mut start = start;
        let to = loop {
            let state = top_state(stack)?;
            if let Some(to) = tables.error_shift(state) {
                break to;
            }
            if stack.len() <= 1 {
                return Err(self.unrecoverable());
            }
            if let Some((popped, value, span)) = stack.pop() {
                tracing::debug!(state = popped, "popping state");
                drop(value);
                start = span;
            }
        };
        let end = self.lookahead.as_ref().map_or(self.last_span, |t| t.span);
        tracing::debug!(state = to, "shifting error token");
        stack.push(to, R::Value::default(), Span::cover(&start, &end))?;
        Ok(())
    }

    fn unrecoverable(&self) -> ParseError {
        ParseError::UnrecoverableSyntax {
            file: self.driver.context.file.clone(),
            line: self.current_line(),
        }
    }

    fn current_line(&self) -> u32 {
        let span = self.lookahead.as_ref().map_or(self.last_span, |t| t.span);
        self.driver.context.line_of(&span)
    }
}

fn top_state<V>(stack: &ParseStack<V>) -> Result<usize, ParseError> {
    stack
        .top_state()
        .ok_or_else(|| ParseError::Internal("parser stack is empty".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticKind;
    use crate::grammar::{n, t, GrammarBuilder};
    use TokenKind::{Eol, Error, Number, Str};

    /// Renders each reduction as `action(children)`.
    #[derive(Default)]
    struct Echo {
        diagnostics: Vec<Diagnostic>,
        spans: Vec<(&'static str, Span)>,
        reject: Option<&'static str>,
    }

    impl Reducer<&'static str> for Echo {
        type Value = String;

        fn token_value(&mut self, token: Token) -> String {
            match token.value {
                TokenValue::Text(text) => text,
                _ => token.kind.name().to_owned(),
            }
        }

        fn reduce(
            &mut self,
            action: &&'static str,
            reduction: Reduction<'_, String>,
        ) -> Result<String, ReduceError> {
            self.spans.push((*action, reduction.span));
            if self.reject == Some(*action) {
                return Err(ReduceError::Rejected(format!("{action} rejected")));
            }
            Ok(format!("{}({})", action, reduction.values.join(" ")))
        }

        fn report(&mut self, diagnostic: Diagnostic) {
            self.diagnostics.push(diagnostic);
        }
    }

    fn tok(kind: TokenKind, text: &str, line: u32, col: u32) -> Token {
        let width = text.chars().count().max(1) as u32;
        Token::text(kind, text, Span::new(line, col, line, col + width - 1))
    }

    fn run(
        grammar: &Grammar<&'static str>,
        options: &ParseOptions,
        tokens: Vec<Token>,
        reducer: &mut Echo,
    ) -> Result<String, ParseError> {
        let tables = ParseTables::build(grammar);
        let context = ParseContext::new("t");
        let driver = Driver::new(grammar, &tables, &context, options);
        driver.run(&mut tokens.into_iter(), reducer)
    }

    fn line_list() -> Grammar<&'static str> {
        let mut g = GrammarBuilder::new();
        let list = g.nonterminal("list");
        let line = g.nonterminal("line");
        g.rule(list, &[], "empty")
            .rule(list, &[n(list), n(line)], "append")
            .rule(list, &[n(list), t(Error), t(Eol)], "recover")
            .rule(line, &[t(Number), t(Eol)], "line");
        g.build(list).unwrap()
    }

    #[test]
    fn malformed_line_is_reported_once_and_skipped() {
        let tokens = vec![
            tok(Number, "1", 1, 1),
            tok(Eol, "\n", 1, 2),
            tok(Str, "x", 2, 1),
            tok(Str, "y", 2, 3),
            tok(Eol, "\n", 2, 4),
            tok(Number, "2", 3, 1),
            tok(Eol, "\n", 3, 2),
        ];
        let mut echo = Echo::default();
        let out = run(&line_list(), &ParseOptions::default(), tokens, &mut echo).unwrap();
        assert_eq!(
            out,
            "append(recover(append(empty() line(1 \n))  \n) line(2 \n))"
        );
        assert_eq!(echo.diagnostics.len(), 1, "{:?}", echo.diagnostics);
        let d = &echo.diagnostics[0];
        assert_eq!(d.kind, DiagnosticKind::Syntax);
        assert_eq!(d.line, 2);
        assert_eq!(
            d.message,
            "syntax error, unexpected STRING, expecting end of file or NUMBER"
        );
    }

    #[test]
    fn rejected_reduction_becomes_semantic_diagnostic() {
        let tokens = vec![
            tok(Number, "1", 1, 1),
            tok(Eol, "\n", 1, 2),
            tok(Number, "2", 2, 1),
            tok(Eol, "\n", 2, 2),
        ];
        let mut echo = Echo {
            reject: Some("line"),
            ..Echo::default()
        };
        let out = run(&line_list(), &ParseOptions::default(), tokens, &mut echo).unwrap();
        // The rest of the input up to the next EOL is consumed by recovery.
        assert_eq!(out, "recover(empty()  \n)");
        assert_eq!(echo.diagnostics.len(), 1);
        assert_eq!(echo.diagnostics[0].kind, DiagnosticKind::Semantic);
        assert_eq!(echo.diagnostics[0].message, "line rejected");
        assert_eq!(echo.diagnostics[0].line, 1);
    }

    #[test]
    fn no_error_state_aborts() {
        let mut g = GrammarBuilder::new();
        let s = g.nonterminal("s");
        g.rule(s, &[t(Number), t(Eol)], "s");
        let grammar = g.build(s).unwrap();
        let mut echo = Echo::default();
        let err = run(
            &grammar,
            &ParseOptions::default(),
            vec![tok(Eol, "\n", 4, 1)],
            &mut echo,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ParseError::UnrecoverableSyntax {
                file: "t".into(),
                line: 4
            }
        );
        let kinds: Vec<_> = echo.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::Syntax, DiagnosticKind::Fatal]);
        assert_eq!(
            echo.diagnostics[0].message,
            "syntax error, unexpected EOL, expecting NUMBER"
        );
    }

    #[test]
    fn deep_nesting_overflows_the_stack() {
        let mut g = GrammarBuilder::new();
        let l = g.nonterminal("l");
        g.rule(l, &[t(Number), n(l)], "cons")
            .rule(l, &[t(Number)], "one");
        let grammar = g.build(l).unwrap();
        let options = ParseOptions {
            initial_stack_depth: 2,
            max_stack_depth: 4,
            ..ParseOptions::default()
        };
        let tokens = (1..=10).map(|i| tok(Number, "1", i, 1)).collect();
        let mut echo = Echo::default();
        let err = run(&grammar, &options, tokens, &mut echo).unwrap_err();
        assert_eq!(err, ParseError::StackOverflow { depth: 4 });
        assert_eq!(
            echo.diagnostics.last().map(|d| d.kind),
            Some(DiagnosticKind::Fatal)
        );
    }

    #[test]
    fn spans_cover_children_and_empty_rules_collapse() {
        let mut g = GrammarBuilder::new();
        let s = g.nonterminal("s");
        let opt = g.nonterminal("opt");
        g.rule(s, &[t(Number), n(opt), t(Eol)], "s")
            .rule(opt, &[], "none")
            .rule(opt, &[t(Str)], "some");
        let grammar = g.build(s).unwrap();
        let tokens = vec![tok(Number, "12", 1, 1), tok(Eol, "\n", 1, 3)];
        let mut echo = Echo::default();
        run(&grammar, &ParseOptions::default(), tokens, &mut echo).unwrap();
        assert_eq!(
            echo.spans,
            vec![
                ("none", Span::point(1, 2)),
                ("s", Span::new(1, 1, 1, 3)),
            ]
        );
    }
}

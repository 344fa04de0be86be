//! Context-free grammar model consumed by the table generator.
//!
//! Rules carry an opaque action tag `A` that the driver hands back to its
//! reducer; the generator itself never looks at it.

use std::collections::BTreeSet;

use crate::token::TokenKind;

/// Index of a nonterminal within its grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonTerminal(pub u16);

impl NonTerminal {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symbol {
    Term(TokenKind),
    NonTerm(NonTerminal),
}

/// Terminal symbol shorthand for rule right-hand sides.
pub fn t(kind: TokenKind) -> Symbol {
    Symbol::Term(kind)
}

/// Nonterminal symbol shorthand for rule right-hand sides.
pub fn n(nt: NonTerminal) -> Symbol {
    Symbol::NonTerm(nt)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
    /// Ranked but without associativity; equal-rank conflicts stay unresolved.
    Unordered,
}

/// Precedence rank of a token: higher binds tighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precedence {
    pub level: u8,
    pub assoc: Assoc,
}

#[derive(Debug, Clone)]
pub struct Rule<A> {
    pub lhs: NonTerminal,
    pub rhs: Vec<Symbol>,
    pub action: A,
    /// Explicit `%prec` override.
    pub prec: Option<TokenKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    #[error("nonterminal `{0}` has no rules")]
    Unproductive(&'static str),
    #[error("start symbol is not a declared nonterminal")]
    UnknownStart,
    #[error("the error symbol cannot be given a precedence")]
    ErrorPrecedence,
}

#[derive(Debug, Clone)]
pub struct Grammar<A> {
    names: Vec<&'static str>,
    rules: Vec<Rule<A>>,
    start: NonTerminal,
    precedence: [Option<Precedence>; TokenKind::COUNT],
}

impl<A> Grammar<A> {
    pub fn rules(&self) -> &[Rule<A>] {
        &self.rules
    }

    pub fn rule(&self, index: usize) -> &Rule<A> {
        &self.rules[index]
    }

    pub fn start(&self) -> NonTerminal {
        self.start
    }

    pub fn nonterminal_count(&self) -> usize {
        self.names.len()
    }

    pub fn name(&self, nt: NonTerminal) -> &'static str {
        self.names.get(nt.index()).copied().unwrap_or("?")
    }

    pub fn token_precedence(&self, kind: TokenKind) -> Option<Precedence> {
        self.precedence[kind.index()]
    }

    /// A rule's precedence: its `%prec` token, else its last ranked terminal.
    pub fn rule_precedence(&self, index: usize) -> Option<Precedence> {
        let rule = &self.rules[index];
        if let Some(kind) = rule.prec {
            return self.token_precedence(kind);
        }
        rule.rhs.iter().rev().find_map(|sym| match sym {
            Symbol::Term(kind) => self.token_precedence(*kind),
            Symbol::NonTerm(_) => None,
        })
    }

    /// Human-readable rendering of a rule, `lhs: A b C`.
    pub fn describe_rule(&self, index: usize) -> String {
        let rule = &self.rules[index];
        let mut out = format!("{}:", self.name(rule.lhs));
        if rule.rhs.is_empty() {
            out.push_str(" %empty");
        }
        for sym in &rule.rhs {
            out.push(' ');
            match sym {
                Symbol::Term(kind) => out.push_str(kind.name()),
                Symbol::NonTerm(nt) => out.push_str(self.name(*nt)),
            }
        }
        out
    }
}

/// Incremental grammar construction.
#[derive(Debug)]
pub struct GrammarBuilder<A> {
    names: Vec<&'static str>,
    rules: Vec<Rule<A>>,
    precedence: [Option<Precedence>; TokenKind::COUNT],
    next_level: u8,
}

impl<A> Default for GrammarBuilder<A> {
    fn default() -> Self {
        GrammarBuilder {
            names: Vec::new(),
            rules: Vec::new(),
            precedence: [None; TokenKind::COUNT],
            next_level: 1,
        }
    }
}

impl<A> GrammarBuilder<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nonterminal(&mut self, name: &'static str) -> NonTerminal {
        self.names.push(name);
        NonTerminal((self.names.len() - 1) as u16)
    }

    pub fn rule(&mut self, lhs: NonTerminal, rhs: &[Symbol], action: A) -> &mut Self {
        self.rules.push(Rule {
            lhs,
            rhs: rhs.to_vec(),
            action,
            prec: None,
        });
        self
    }

    pub fn rule_prec(
        &mut self,
        lhs: NonTerminal,
        rhs: &[Symbol],
        action: A,
        prec: TokenKind,
    ) -> &mut Self {
        self.rules.push(Rule {
            lhs,
            rhs: rhs.to_vec(),
            action,
            prec: Some(prec),
        });
        self
    }

    // Each call declares a new level binding tighter than the previous one.

    pub fn left(&mut self, tokens: &[TokenKind]) -> &mut Self {
        self.level(tokens, Assoc::Left)
    }

    pub fn right(&mut self, tokens: &[TokenKind]) -> &mut Self {
        self.level(tokens, Assoc::Right)
    }

    pub fn precedence(&mut self, tokens: &[TokenKind]) -> &mut Self {
        self.level(tokens, Assoc::Unordered)
    }

    fn level(&mut self, tokens: &[TokenKind], assoc: Assoc) -> &mut Self {
        let level = self.next_level;
        self.next_level += 1;
        for kind in tokens {
            self.precedence[kind.index()] = Some(Precedence { level, assoc });
        }
        self
    }

    pub fn build(self, start: NonTerminal) -> Result<Grammar<A>, GrammarError> {
        if start.index() >= self.names.len() {
            return Err(GrammarError::UnknownStart);
        }
        if self.precedence[TokenKind::Error.index()].is_some() {
            return Err(GrammarError::ErrorPrecedence);
        }
        let defined: BTreeSet<NonTerminal> = self.rules.iter().map(|r| r.lhs).collect();
        for (i, name) in self.names.iter().enumerate() {
            if !defined.contains(&NonTerminal(i as u16)) {
                return Err(GrammarError::Unproductive(name));
            }
        }
        Ok(Grammar {
            names: self.names,
            rules: self.rules,
            start,
            precedence: self.precedence,
        })
    }
}

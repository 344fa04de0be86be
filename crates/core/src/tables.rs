//! LALR(1) table generation.
//!
//! The canonical LR(0) collection is built first; lookaheads are then
//! attached to kernel items by spontaneous generation and propagation, and
//! each state's row is filled from the LR(1) closure of its kernel.
//! Shift/reduce conflicts are settled by token and rule precedence.

use std::collections::{BTreeMap, HashMap};

use crate::grammar::{Assoc, Grammar, NonTerminal, Symbol};
use crate::token::TokenKind;

// ──────────────────────────────────────────────
// Terminal sets
// ──────────────────────────────────────────────

/// Set of terminals as a bitmask. The top bit is the propagation marker
/// used while computing lookaheads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TermSet(u64);

impl TermSet {
    const EMPTY: TermSet = TermSet(0);
    const MARK: TermSet = TermSet(1 << 63);

    fn single(kind: TokenKind) -> TermSet {
        TermSet(1 << kind.index())
    }

    fn contains(self, kind: TokenKind) -> bool {
        self.0 & (1 << kind.index()) != 0
    }

    fn has_mark(self) -> bool {
        self.0 & TermSet::MARK.0 != 0
    }

    fn without_mark(self) -> TermSet {
        TermSet(self.0 & !TermSet::MARK.0)
    }

    /// Adds `other`, returning whether anything new arrived.
    fn union(&mut self, other: TermSet) -> bool {
        let before = self.0;
        self.0 |= other.0;
        self.0 != before
    }

    fn iter(self) -> impl Iterator<Item = TokenKind> {
        TokenKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Item {
    prod: usize,
    dot: usize,
}

impl Item {
    fn advance(self) -> Item {
        Item {
            prod: self.prod,
            dot: self.dot + 1,
        }
    }
}

// ──────────────────────────────────────────────
// Public tables
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Error,
    Shift(usize),
    Reduce(usize),
    Accept,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Resolved as a shift; `rule` lost.
    ShiftReduce { rule: usize },
    /// Resolved in favour of the earlier rule.
    ReduceReduce { kept: usize, dropped: usize },
}

/// A conflict that precedence declarations did not settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict {
    pub state: usize,
    pub token: TokenKind,
    pub kind: ConflictKind,
}

#[derive(Debug, Clone, Copy)]
struct RuleShape {
    lhs: NonTerminal,
    len: usize,
}

/// Action, default-reduction and goto tables for one grammar.
#[derive(Debug, Clone)]
pub struct ParseTables {
    actions: Vec<Action>,
    defaults: Vec<Option<usize>>,
    gotos: Vec<Option<usize>>,
    nonterminals: usize,
    rules: Vec<RuleShape>,
    conflicts: Vec<Conflict>,
}

impl ParseTables {
    pub const START_STATE: usize = 0;

    pub fn build<A>(grammar: &Grammar<A>) -> ParseTables {
        let generator = Generator::new(grammar);
        let (kernels, transitions) = generator.lr0_collection();
        let lookaheads = generator.lalr_lookaheads(&kernels, &transitions);
        let tables = generator.fill(&kernels, &transitions, &lookaheads);
        tracing::debug!(
            states = kernels.len(),
            rules = grammar.rules().len(),
            conflicts = tables.conflicts.len(),
            "built parse tables"
        );
        tables
    }

    pub fn state_count(&self) -> usize {
        self.defaults.len()
    }

    pub fn action(&self, state: usize, kind: TokenKind) -> Action {
        self.actions[state * TokenKind::COUNT + kind.index()]
    }

    pub fn default_reduction(&self, state: usize) -> Option<usize> {
        self.defaults[state]
    }

    /// Whether the state's row holds any explicit action. States without one
    /// take their default reduction without reading a token.
    pub fn needs_lookahead(&self, state: usize) -> bool {
        self.row(state).iter().any(|a| *a != Action::Error)
    }

    /// Target of the state's transition on the error symbol.
    pub fn error_shift(&self, state: usize) -> Option<usize> {
        match self.action(state, TokenKind::Error) {
            Action::Shift(to) => Some(to),
            _ => None,
        }
    }

    pub fn goto(&self, state: usize, nt: NonTerminal) -> Option<usize> {
        self.gotos
            .get(state * self.nonterminals + nt.index())
            .copied()
            .flatten()
    }

    pub fn rule_lhs(&self, rule: usize) -> NonTerminal {
        self.rules[rule].lhs
    }

    pub fn rule_len(&self, rule: usize) -> usize {
        self.rules[rule].len
    }

    /// Tokens with an explicit action in `state`, in table order, excluding
    /// the error symbol.
    pub fn expected_tokens(&self, state: usize) -> Vec<TokenKind> {
        self.row(state)
            .iter()
            .zip(TokenKind::ALL)
            .filter(|(a, k)| **a != Action::Error && *k != TokenKind::Error)
            .map(|(_, k)| k)
            .collect()
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    fn row(&self, state: usize) -> &[Action] {
        let base = state * TokenKind::COUNT;
        &self.actions[base..base + TokenKind::COUNT]
    }
}

// ──────────────────────────────────────────────
// Generator
// ──────────────────────────────────────────────

struct Generator<'g, A> {
    grammar: &'g Grammar<A>,
    /// Productions 0..n are the grammar's rules; production n is the
    /// augmented `$accept: start`.
    augmented: [Symbol; 1],
    by_lhs: Vec<Vec<usize>>,
    nullable: Vec<bool>,
    first: Vec<TermSet>,
}

impl<'g, A> Generator<'g, A> {
    fn new(grammar: &'g Grammar<A>) -> Self {
        let mut by_lhs = vec![Vec::new(); grammar.nonterminal_count()];
        for (i, rule) in grammar.rules().iter().enumerate() {
            by_lhs[rule.lhs.index()].push(i);
        }
        let mut generator = Generator {
            grammar,
            augmented: [Symbol::NonTerm(grammar.start())],
            by_lhs,
            nullable: vec![false; grammar.nonterminal_count()],
            first: vec![TermSet::EMPTY; grammar.nonterminal_count()],
        };
        generator.compute_first();
        generator
    }

    fn accept_prod(&self) -> usize {
        self.grammar.rules().len()
    }

    fn rhs(&self, prod: usize) -> &[Symbol] {
        if prod == self.accept_prod() {
            &self.augmented
        } else {
            &self.grammar.rule(prod).rhs
        }
    }

    fn next_symbol(&self, item: Item) -> Option<Symbol> {
        self.rhs(item.prod).get(item.dot).copied()
    }

    fn compute_first(&mut self) {
        let grammar = self.grammar;
        loop {
            let mut changed = false;
            for rule in grammar.rules() {
                let lhs = rule.lhs.index();
                let all_nullable = rule.rhs.iter().all(|s| match s {
                    Symbol::Term(_) => false,
                    Symbol::NonTerm(nt) => self.nullable[nt.index()],
                });
                if all_nullable && !self.nullable[lhs] {
                    self.nullable[lhs] = true;
                    changed = true;
                }
                let first = self.first_of(&rule.rhs, TermSet::EMPTY);
                changed |= self.first[lhs].union(first);
            }
            if !changed {
                break;
            }
        }
    }

    /// FIRST of `seq` followed by `tail`.
    fn first_of(&self, seq: &[Symbol], tail: TermSet) -> TermSet {
        let mut out = TermSet::EMPTY;
        for sym in seq {
            match sym {
                Symbol::Term(kind) => {
                    out.union(TermSet::single(*kind));
                    return out;
                }
                Symbol::NonTerm(nt) => {
                    out.union(self.first[nt.index()]);
                    if !self.nullable[nt.index()] {
                        return out;
                    }
                }
            }
        }
        out.union(tail);
        out
    }

    fn closure0(&self, kernel: &[Item]) -> Vec<Item> {
        let mut items = kernel.to_vec();
        let mut added = vec![false; self.by_lhs.len()];
        let mut i = 0;
        while i < items.len() {
            if let Some(Symbol::NonTerm(nt)) = self.next_symbol(items[i]) {
                if !added[nt.index()] {
                    added[nt.index()] = true;
                    items.extend(self.by_lhs[nt.index()].iter().map(|&prod| Item { prod, dot: 0 }));
                }
            }
            i += 1;
        }
        items
    }

    fn closure1(&self, seed: &[(Item, TermSet)]) -> Vec<(Item, TermSet)> {
        let mut items = seed.to_vec();
        let mut index: HashMap<Item, usize> =
            items.iter().enumerate().map(|(i, (item, _))| (*item, i)).collect();
        let mut work: Vec<usize> = (0..items.len()).collect();
        while let Some(i) = work.pop() {
            let (item, la) = items[i];
            let rhs = self.rhs(item.prod);
            let Some(Symbol::NonTerm(nt)) = rhs.get(item.dot) else {
                continue;
            };
            let follow = self.first_of(&rhs[item.dot + 1..], la);
            for &prod in &self.by_lhs[nt.index()] {
                let next = Item { prod, dot: 0 };
                match index.get(&next) {
                    Some(&j) => {
                        if items[j].1.union(follow) {
                            work.push(j);
                        }
                    }
                    None => {
                        index.insert(next, items.len());
                        items.push((next, follow));
                        work.push(items.len() - 1);
                    }
                }
            }
        }
        items
    }

    fn lr0_collection(&self) -> (Vec<Vec<Item>>, Vec<BTreeMap<Symbol, usize>>) {
        let start = vec![Item {
            prod: self.accept_prod(),
            dot: 0,
        }];
        let mut index: HashMap<Vec<Item>, usize> = HashMap::new();
        index.insert(start.clone(), 0);
        let mut kernels = vec![start];
        let mut transitions = Vec::new();

        let mut state = 0;
        while state < kernels.len() {
            let mut groups: BTreeMap<Symbol, Vec<Item>> = BTreeMap::new();
            for item in self.closure0(&kernels[state]) {
                if let Some(sym) = self.next_symbol(item) {
                    groups.entry(sym).or_default().push(item.advance());
                }
            }
            let mut row = BTreeMap::new();
            for (sym, mut kernel) in groups {
                kernel.sort();
                kernel.dedup();
                let target = match index.get(&kernel) {
                    Some(&target) => target,
                    None => {
                        let target = kernels.len();
                        index.insert(kernel.clone(), target);
                        kernels.push(kernel);
                        target
                    }
                };
                row.insert(sym, target);
            }
            transitions.push(row);
            state += 1;
        }
        (kernels, transitions)
    }

    fn lalr_lookaheads(
        &self,
        kernels: &[Vec<Item>],
        transitions: &[BTreeMap<Symbol, usize>],
    ) -> Vec<Vec<TermSet>> {
        let mut lookaheads: Vec<Vec<TermSet>> =
            kernels.iter().map(|k| vec![TermSet::EMPTY; k.len()]).collect();
        let mut propagate: Vec<Vec<Vec<(usize, usize)>>> =
            kernels.iter().map(|k| vec![Vec::new(); k.len()]).collect();
        lookaheads[0][0].union(TermSet::single(TokenKind::End));

        for (state, kernel) in kernels.iter().enumerate() {
            for (k, &kitem) in kernel.iter().enumerate() {
                for (item, la) in self.closure1(&[(kitem, TermSet::MARK)]) {
                    let Some(sym) = self.next_symbol(item) else {
                        continue;
                    };
                    let Some(&target) = transitions[state].get(&sym) else {
                        continue;
                    };
                    let Ok(pos) = kernels[target].binary_search(&item.advance()) else {
                        continue;
                    };
                    lookaheads[target][pos].union(la.without_mark());
                    if la.has_mark() {
                        propagate[state][k].push((target, pos));
                    }
                }
            }
        }

        loop {
            let mut changed = false;
            for state in 0..kernels.len() {
                for k in 0..kernels[state].len() {
                    let la = lookaheads[state][k];
                    for &(target, pos) in &propagate[state][k] {
                        changed |= lookaheads[target][pos].union(la);
                    }
                }
            }
            if !changed {
                break;
            }
        }
        lookaheads
    }

    fn fill(
        &self,
        kernels: &[Vec<Item>],
        transitions: &[BTreeMap<Symbol, usize>],
        lookaheads: &[Vec<TermSet>],
    ) -> ParseTables {
        let states = kernels.len();
        let nonterminals = self.grammar.nonterminal_count();
        let mut actions = vec![Action::Error; states * TokenKind::COUNT];
        let mut defaults = vec![None; states];
        let mut gotos = vec![None; states * nonterminals];
        let mut conflicts = Vec::new();

        for state in 0..states {
            let mut shifts: [Option<usize>; TokenKind::COUNT] = [None; TokenKind::COUNT];
            for (sym, &target) in &transitions[state] {
                match sym {
                    Symbol::Term(kind) => shifts[kind.index()] = Some(target),
                    Symbol::NonTerm(nt) => gotos[state * nonterminals + nt.index()] = Some(target),
                }
            }

            let seed: Vec<(Item, TermSet)> = kernels[state]
                .iter()
                .copied()
                .zip(lookaheads[state].iter().copied())
                .collect();
            let mut reduces: Vec<Vec<usize>> = vec![Vec::new(); TokenKind::COUNT];
            let mut accept = false;
            for (item, la) in self.closure1(&seed) {
                if item.dot < self.rhs(item.prod).len() {
                    continue;
                }
                if item.prod == self.accept_prod() {
                    accept |= la.contains(TokenKind::End);
                } else {
                    for kind in la.without_mark().iter() {
                        reduces[kind.index()].push(item.prod);
                    }
                }
            }

            let row = &mut actions[state * TokenKind::COUNT..(state + 1) * TokenKind::COUNT];
            for kind in TokenKind::ALL {
                let i = kind.index();
                if kind == TokenKind::End && accept {
                    row[i] = Action::Accept;
                    continue;
                }
                let candidates = &mut reduces[i];
                candidates.sort_unstable();
                candidates.dedup();
                let reduce = candidates.first().copied();
                for &dropped in candidates.iter().skip(1) {
                    conflicts.push(Conflict {
                        state,
                        token: kind,
                        kind: ConflictKind::ReduceReduce {
                            kept: candidates[0],
                            dropped,
                        },
                    });
                }
                row[i] = match (shifts[i], reduce) {
                    (None, None) => Action::Error,
                    (Some(to), None) => Action::Shift(to),
                    (None, Some(rule)) => Action::Reduce(rule),
                    (Some(to), Some(rule)) => {
                        self.resolve(state, kind, to, rule, &mut conflicts)
                    }
                };
            }

            defaults[state] = choose_default(row);
            if let Some(rule) = defaults[state] {
                for action in row.iter_mut() {
                    if *action == Action::Reduce(rule) {
                        *action = Action::Error;
                    }
                }
            }
        }

        let rules = self
            .grammar
            .rules()
            .iter()
            .map(|r| RuleShape {
                lhs: r.lhs,
                len: r.rhs.len(),
            })
            .collect();

        ParseTables {
            actions,
            defaults,
            gotos,
            nonterminals,
            rules,
            conflicts,
        }
    }

    fn resolve(
        &self,
        state: usize,
        kind: TokenKind,
        shift: usize,
        rule: usize,
        conflicts: &mut Vec<Conflict>,
    ) -> Action {
        if let (Some(tok), Some(prod)) = (
            self.grammar.token_precedence(kind),
            self.grammar.rule_precedence(rule),
        ) {
            if prod.level > tok.level {
                return Action::Reduce(rule);
            }
            if prod.level < tok.level {
                return Action::Shift(shift);
            }
            match tok.assoc {
                Assoc::Left => return Action::Reduce(rule),
                Assoc::Right => return Action::Shift(shift),
                Assoc::Unordered => {}
            }
        }
        conflicts.push(Conflict {
            state,
            token: kind,
            kind: ConflictKind::ShiftReduce { rule },
        });
        Action::Shift(shift)
    }
}

/// The most frequent reduction in a row, unless the state shifts the error
/// symbol. Ties go to the earlier rule.
fn choose_default(row: &[Action]) -> Option<usize> {
    if matches!(row[TokenKind::Error.index()], Action::Shift(_)) {
        return None;
    }
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for action in row {
        if let Action::Reduce(rule) = action {
            *counts.entry(*rule).or_default() += 1;
        }
    }
    let mut best: Option<(usize, usize)> = None;
    for (rule, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((rule, count));
        }
    }
    best.map(|(rule, _)| rule)
}

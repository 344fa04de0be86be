//! The three parallel parse stacks: automaton states, semantic values and
//! source spans.

use crate::error::ParseError;
use crate::span::Span;

/// States, values and spans kept in lockstep.
///
/// Capacity starts at the configured initial depth and doubles on demand
/// up to the maximum depth. Values left on the stack are dropped with it.
#[derive(Debug)]
pub struct ParseStack<V> {
    states: Vec<usize>,
    values: Vec<V>,
    spans: Vec<Span>,
    capacity: usize,
    max_depth: usize,
}

impl<V> ParseStack<V> {
    pub fn new(initial_depth: usize, max_depth: usize) -> Result<Self, ParseError> {
        let max_depth = max_depth.max(1);
        let capacity = initial_depth.clamp(1, max_depth);
        let mut stack = ParseStack {
            states: Vec::new(),
            values: Vec::new(),
            spans: Vec::new(),
            capacity: 0,
            max_depth,
        };
        stack.reserve(capacity)?;
        Ok(stack)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Slots available before the next growth step.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&mut self, state: usize, value: V, span: Span) -> Result<(), ParseError> {
        if self.states.len() == self.capacity {
            self.grow()?;
        }
        self.states.push(state);
        self.values.push(value);
        self.spans.push(span);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<(usize, V, Span)> {
        let state = self.states.pop()?;
        let value = self.values.pop()?;
        let span = self.spans.pop()?;
        Some((state, value, span))
    }

    /// Removes the top `n` slots, returning their values and spans in
    /// stack order (deepest first).
    pub fn pop_n(&mut self, n: usize) -> (Vec<V>, Vec<Span>) {
        let at = self.states.len().saturating_sub(n);
        self.states.truncate(at);
        (self.values.split_off(at), self.spans.split_off(at))
    }

    pub fn top_state(&self) -> Option<usize> {
        self.states.last().copied()
    }

    pub fn top_span(&self) -> Option<Span> {
        self.spans.last().copied()
    }

    pub fn states(&self) -> &[usize] {
        &self.states
    }

    pub fn values(&self) -> &[V] {
        &self.values
    }

    fn grow(&mut self) -> Result<(), ParseError> {
        if self.capacity >= self.max_depth {
            return Err(ParseError::StackOverflow {
                depth: self.max_depth,
            });
        }
        let next = self.capacity.saturating_mul(2).min(self.max_depth);
        tracing::debug!(from = self.capacity, to = next, "growing parser stack");
        self.reserve(next)
    }

    /// Brings all three stacks to `capacity` slots. Nothing is moved unless
    /// every reservation succeeds.
    fn reserve(&mut self, capacity: usize) -> Result<(), ParseError> {
        let depth = self.max_depth;
        let overflow = move |_| ParseError::StackOverflow { depth };
        let mut states = Vec::new();
        let mut values = Vec::new();
        let mut spans = Vec::new();
        states.try_reserve_exact(capacity).map_err(overflow)?;
        values.try_reserve_exact(capacity).map_err(overflow)?;
        spans.try_reserve_exact(capacity).map_err(overflow)?;
        states.append(&mut self.states);
        values.append(&mut self.values);
        spans.append(&mut self.spans);
        self.states = states;
        self.values = values;
        self.spans = spans;
        self.capacity = capacity;
        Ok(())
    }
}

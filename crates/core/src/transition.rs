//! Static lookup tables for closed status machines.
//!
//! A table maps each state to the set of values it may move to in one step.
//! For a plain status machine `T` is the status type itself; for "which
//! actions does this status offer" tables, `T` is the action type.

use core::fmt::Display;

use crate::error::{DomainError, DomainResult};

/// Map from state `S` to the set of `T` reachable from it.
///
/// States missing from the table have no outgoing edges.
#[derive(Debug)]
pub struct TransitionTable<S: 'static, T: 'static = S> {
    edges: &'static [(S, &'static [T])],
}

impl<S, T> TransitionTable<S, T>
where
    S: Copy + Eq + Display + 'static,
    T: Copy + Eq + Display + 'static,
{
    pub const fn new(edges: &'static [(S, &'static [T])]) -> Self {
        Self { edges }
    }

    /// Everything reachable from `from` in one step, in table order.
    pub fn next(&self, from: S) -> &'static [T] {
        self.edges
            .iter()
            .find(|(state, _)| *state == from)
            .map(|(_, targets)| *targets)
            .unwrap_or(&[])
    }

    pub fn permits(&self, from: S, to: T) -> bool {
        self.next(from).contains(&to)
    }

    /// A state with no outgoing edges.
    pub fn is_terminal(&self, from: S) -> bool {
        self.next(from).is_empty()
    }

    /// Reject `from -> to` unless the table lists it.
    pub fn check(&self, from: S, to: T) -> DomainResult<()> {
        if self.permits(from, to) {
            return Ok(());
        }
        if self.is_terminal(from) {
            return Err(DomainError::invariant(format!(
                "{from} is terminal; {to} is not allowed"
            )));
        }
        Err(DomainError::invariant(format!(
            "{to} is not allowed from {from}"
        )))
    }

    /// States that appear as table keys.
    pub fn states(&self) -> impl Iterator<Item = S> + '_ {
        self.edges.iter().map(|(state, _)| *state)
    }
}

//! Left folds from event streams into snapshots and indices.

use crate::store::EventEnvelope;

/// `{ init, update }` pair folded over envelopes in append order.
///
/// Folds are strictly sequential: later events may depend on the state built
/// by earlier ones, so envelopes are never reordered or batched.
pub struct Projection<S, E> {
    pub init: S,
    pub update: fn(S, &EventEnvelope<E>) -> S,
}

impl<S: Clone, E> Projection<S, E> {
    pub fn new(init: S, update: fn(S, &EventEnvelope<E>) -> S) -> Self {
        Self { init, update }
    }

    /// Folds every envelope into a fresh copy of `init`.
    pub fn project<'a, I>(&self, envelopes: I) -> S
    where
        I: IntoIterator<Item = &'a EventEnvelope<E>>,
        E: 'a,
    {
        self.project_from(self.init.clone(), envelopes)
    }

    /// Continues a fold from an already-built state.
    pub fn project_from<'a, I>(&self, state: S, envelopes: I) -> S
    where
        I: IntoIterator<Item = &'a EventEnvelope<E>>,
        E: 'a,
    {
        envelopes
            .into_iter()
            .fold(state, |state, envelope| (self.update)(state, envelope))
    }
}

impl<S: Clone, E> Clone for Projection<S, E> {
    fn clone(&self) -> Self {
        Self {
            init: self.init.clone(),
            update: self.update,
        }
    }
}

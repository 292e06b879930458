//! Contains the [`CallRegistry`].

use std::collections::HashMap;

use cobflow_arena::ID;
use cobflow_element::Element;

fn key(name: &str) -> String { name.trim().to_ascii_uppercase() }

/// Maps procedure names to the call placeholders created before the procedure
/// was materialised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallRegistry {
    placeholders: HashMap<String, Vec<ID<Element>>>,
}

impl CallRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Registers a placeholder call of the named procedure.
    pub fn register(&mut self, name: &str, placeholder: ID<Element>) {
        self.placeholders.entry(key(name)).or_default().push(placeholder);
    }

    /// Returns `true` if a placeholder waits for the named procedure.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.placeholders.get(&key(name)).is_some_and(|calls| !calls.is_empty())
    }

    /// Removes and returns the placeholders of the named procedure, in
    /// registration order.
    pub fn take(&mut self, name: &str) -> Vec<ID<Element>> {
        self.placeholders.remove(&key(name)).unwrap_or_default()
    }

    /// Removes and returns every placeholder left, grouped by name in
    /// alphabetical order.
    pub fn drain_remaining(&mut self) -> Vec<(String, Vec<ID<Element>>)> {
        let mut remaining = self
            .placeholders
            .drain()
            .filter(|(_, calls)| !calls.is_empty())
            .collect::<Vec<_>>();
        remaining.sort_by(|(left, _), (right, _)| left.cmp(right));
        remaining
    }

    /// Returns the number of placeholders still waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.placeholders.values().map(Vec::len).sum()
    }

    /// Returns `true` if no placeholder is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

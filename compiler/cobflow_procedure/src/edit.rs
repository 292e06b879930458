//! Keeps the stored ranges consistent with the structural edits of the
//! extraction pass.
//!
//! Every edit of a sequence is described once as an [`Edit`] and applied to all
//! live boundaries and to the declarations-end marker at the same place.

use std::collections::HashSet;

use cobflow_arena::ID;
use cobflow_element::Sequence;
use log::trace;

use crate::{Boundary, BoundaryTracker};

/// A structural edit: `removed` elements at `at` were replaced by `inserted`
/// new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edit {
    /// The edited sequence.
    pub sequence: ID<Sequence>,

    /// The position of the first removed (or inserted) element.
    pub at: usize,

    /// The number of removed elements.
    pub removed: usize,

    /// The number of inserted elements.
    pub inserted: usize,

    /// The boundary whose body the edit happens in. It and its containers
    /// keep their start and only move their end.
    pub within: Option<ID<Boundary>>,

    /// The sequence the removed elements were moved into, if any. Live
    /// boundaries lying entirely in the removed range follow them there,
    /// except empty ones opened before `within`.
    pub moved_to: Option<ID<Sequence>>,
}

impl Edit {
    /// Returns the signed change of the sequence length.
    #[must_use]
    pub fn delta(&self) -> isize {
        isize::try_from(self.inserted).unwrap_or(isize::MAX)
            - isize::try_from(self.removed).unwrap_or(isize::MAX)
    }
}

fn shift(index: usize, delta: isize) -> usize {
    index.saturating_add_signed(delta)
}

/// Returns `true` if the boundary is empty, sits at the edit point and was
/// opened before the boundary the edit happens within.
fn is_empty_before(id: ID<Boundary>, boundary: &Boundary, edit: &Edit) -> bool {
    boundary.start == edit.at
        && boundary.end == Some(edit.at)
        && edit.within.is_some_and(|within| id < within)
}

impl BoundaryTracker {
    /// Applies the edit to every live boundary and to the declarations-end
    /// marker.
    ///
    /// The boundary the edit happens within and its containers keep their
    /// start and move their end. An empty boundary at the edit point opened
    /// before `within` stays where it is. Other boundaries starting at or after
    /// the edited range move entirely. Boundaries enclosing the edit point
    /// move their end.
    pub fn apply(&mut self, edit: &Edit) {
        let delta = edit.delta();
        let edited_end = edit.at + edit.removed;

        let ancestors = edit
            .within
            .into_iter()
            .flat_map(|within| std::iter::once(within).chain(self.ancestors(within)))
            .collect::<HashSet<_>>();

        for (id, boundary) in self.boundaries.iter_mut() {
            if boundary.retired || boundary.sequence != edit.sequence {
                continue;
            }

            if ancestors.contains(&id) {
                boundary.end = boundary.end.map(|end| shift(end, delta));
            } else if is_empty_before(id, boundary, edit) {
                // an empty procedure preceding the edited one stays in front
                continue;
            } else if boundary.start >= edited_end {
                boundary.start = shift(boundary.start, delta);
                boundary.end = boundary.end.map(|end| shift(end, delta));
            } else if boundary.start < edit.at {
                if let Some(end) = boundary.end.filter(|end| *end > edit.at) {
                    boundary.end = Some(shift(end.max(edited_end), delta));
                }
            } else if let Some(target) = edit.moved_to.filter(|_| {
                boundary.end.is_some_and(|end| end <= edited_end)
            }) {
                boundary.sequence = target;
                boundary.start -= edit.at;
                boundary.end = boundary.end.map(|end| end - edit.at);
            } else {
                boundary.start = edit.at;
                boundary.end = boundary
                    .end
                    .map(|end| shift(end.max(edited_end), delta).max(edit.at));
            }

            trace!(
                "adjusted `{}` to {}..{:?}",
                boundary.name,
                boundary.start,
                boundary.end
            );
        }

        if let Some(marker) = &mut self.declarations_end {
            if marker.sequence == edit.sequence && edit.at < marker.index {
                marker.index = shift(marker.index.max(edited_end), delta);
            }
        }
    }
}

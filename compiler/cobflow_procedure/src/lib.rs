//! Contains the [`BoundaryTracker`] that records the range of every SECTION and
//! PARAGRAPH while the element tree is built, and the [`CallRegistry`] of
//! forward-referenced calls.
//!
//! A boundary is a half-open range `start..end` of its owning sequence. It is
//! opened when its header arrives and closed at the next header of the same (or
//! a coarser) granularity, or at the end of the unit.

use cobflow_arena::{Arena, ID};
use cobflow_element::{Element, Sequence, Tree};
use getset::{CopyGetters, Getters};
use log::trace;
use serde::{Deserialize, Serialize};

pub mod edit;
pub mod registry;

pub use edit::Edit;
pub use registry::CallRegistry;

/// The granularity of a procedure boundary.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
pub enum Granularity {
    /// A SECTION, which may group paragraphs.
    #[strum(to_string = "section")]
    Section,

    /// A PARAGRAPH.
    #[strum(to_string = "paragraph")]
    Paragraph,
}

/// The tracked range of one SECTION or PARAGRAPH body.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Getters,
    CopyGetters,
    Serialize,
    Deserialize,
)]
pub struct Boundary {
    /// The name of the procedure.
    #[get = "pub"]
    name: String,

    /// Whether it is a section or a paragraph.
    #[get_copy = "pub"]
    granularity: Granularity,

    /// The sequence the body was appended to.
    #[get_copy = "pub"]
    sequence: ID<Sequence>,

    /// The index of the first body element.
    #[get_copy = "pub"]
    start: usize,

    /// The index of the first element after the body, [`None`] while open.
    #[get_copy = "pub"]
    end: Option<usize>,

    /// The innermost boundary that was open in the same sequence when this one
    /// started.
    #[get_copy = "pub"]
    container: Option<ID<Boundary>>,

    /// The escapes this boundary owns.
    #[get = "pub"]
    escapes: Vec<ID<Escape>>,

    /// `true` once the extraction pass has dealt with the boundary.
    #[get_copy = "pub"]
    retired: bool,
}

impl Boundary {
    /// Returns the range of the body once the boundary is closed.
    #[must_use]
    pub fn range(&self) -> Option<std::ops::Range<usize>> {
        self.end.map(|end| self.start..end)
    }

    /// Returns `true` while the boundary has no end.
    #[must_use]
    pub const fn is_open(&self) -> bool { self.end.is_none() }
}

/// The kind of a non-local exit.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
pub enum EscapeKind {
    /// `EXIT PARAGRAPH`.
    #[strum(to_string = "leave paragraph")]
    LeaveParagraph,

    /// `EXIT SECTION`.
    #[strum(to_string = "leave section")]
    LeaveSection,
}

/// A recorded non-local exit.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Getters,
    CopyGetters,
    Serialize,
    Deserialize,
)]
pub struct Escape {
    /// The jump element.
    #[get_copy = "pub"]
    element: ID<Element>,

    /// What the exit leaves.
    #[get_copy = "pub"]
    kind: EscapeKind,

    /// The boundary the exit ends, [`None`] if no suitable boundary was open.
    #[get_copy = "pub"]
    owner: Option<ID<Boundary>>,

    /// The innermost boundary open when the exit was recorded.
    #[get_copy = "pub"]
    recorded_in: Option<ID<Boundary>>,

    /// `true` once the exit sits in a unit extracted from inside its owner, so
    /// a return would no longer leave the owner.
    #[get_copy = "pub"]
    nested: bool,
}

/// The position right after the leading declarations of a sequence.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
pub struct Marker {
    /// The sequence holding the declarations.
    pub sequence: ID<Sequence>,

    /// The number of leading declaration elements.
    pub index: usize,
}

/// Tracks the procedure boundaries of one compilation unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoundaryTracker {
    boundaries: Arena<Boundary>,
    escapes: Arena<Escape>,
    open: Vec<ID<Boundary>>,
    declarations_end: Option<Marker>,
}

impl BoundaryTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Returns the boundary with the given ID.
    #[must_use]
    pub fn get(&self, id: ID<Boundary>) -> &Boundary { &self.boundaries[id] }

    /// Returns the escape with the given ID.
    #[must_use]
    pub fn escape(&self, id: ID<Escape>) -> &Escape { &self.escapes[id] }

    /// Returns the IDs of every boundary, in creation order.
    pub fn ids(
        &self,
    ) -> impl ExactSizeIterator<Item = ID<Boundary>> + DoubleEndedIterator {
        self.boundaries.ids()
    }

    /// Returns every boundary with its ID, in creation order.
    pub fn boundaries(
        &self,
    ) -> impl ExactSizeIterator<Item = (ID<Boundary>, &Boundary)> {
        self.boundaries.iter()
    }

    /// Returns every escape with its ID, in recording order.
    pub fn escapes(
        &self,
    ) -> impl ExactSizeIterator<Item = (ID<Escape>, &Escape)> {
        self.escapes.iter()
    }

    /// Returns the still open boundaries, the innermost last.
    #[must_use]
    pub fn open_boundaries(&self) -> &[ID<Boundary>] { &self.open }

    /// Returns the containment chain of the boundary, the innermost container
    /// first.
    pub fn ancestors(
        &self,
        id: ID<Boundary>,
    ) -> impl Iterator<Item = ID<Boundary>> + '_ {
        std::iter::successors(self.boundaries[id].container, |container| {
            self.boundaries[*container].container
        })
    }

    /// Opens a boundary starting at the current end of the sequence.
    ///
    /// A boundary of the same granularity still open in the sequence is closed
    /// first (for a section, its open paragraphs too). The most recent boundary
    /// still open in the sequence afterwards becomes the container.
    pub fn open(
        &mut self,
        tree: &Tree,
        sequence: ID<Sequence>,
        name: impl Into<String>,
        granularity: Granularity,
    ) -> ID<Boundary> {
        self.close(tree, sequence, granularity);

        let container = self
            .open
            .iter()
            .rev()
            .copied()
            .find(|id| self.boundaries[*id].sequence == sequence);

        let id = self.boundaries.insert(Boundary {
            name: name.into(),
            granularity,
            sequence,
            start: tree.len(sequence),
            end: None,
            container,
            escapes: Vec::new(),
            retired: false,
        });
        self.open.push(id);

        trace!(
            "opened {granularity} `{}` at {}",
            self.boundaries[id].name,
            self.boundaries[id].start
        );

        id
    }

    /// Closes the most recent open boundary of the granularity in the sequence
    /// at the current end of the sequence. Closing a section first closes its
    /// open paragraphs, innermost first.
    pub fn close(
        &mut self,
        tree: &Tree,
        sequence: ID<Sequence>,
        granularity: Granularity,
    ) {
        if granularity == Granularity::Section {
            self.close(tree, sequence, Granularity::Paragraph);
        }

        let Some(position) = self.open.iter().rposition(|id| {
            let boundary = &self.boundaries[*id];
            boundary.sequence == sequence && boundary.granularity == granularity
        }) else {
            return;
        };

        let id = self.open.remove(position);
        let boundary = &mut self.boundaries[id];
        boundary.end = Some(tree.len(sequence).max(boundary.start));

        trace!("closed {granularity} `{}` at {:?}", boundary.name, boundary.end);
    }

    /// Force-closes every boundary still open, the innermost first.
    pub fn finalize(&mut self, tree: &Tree) {
        while let Some(id) = self.open.pop() {
            let boundary = &mut self.boundaries[id];
            boundary.end = Some(tree.len(boundary.sequence).max(boundary.start));
        }
    }

    /// Records a non-local exit.
    ///
    /// A leave-paragraph exit is owned by the innermost open boundary, a
    /// leave-section exit by the innermost open section. Without a suitable
    /// boundary the exit is owned by nothing.
    pub fn record_escape(
        &mut self,
        element: ID<Element>,
        kind: EscapeKind,
    ) -> ID<Escape> {
        let recorded_in = self.open.last().copied();
        let owner = match kind {
            EscapeKind::LeaveParagraph => recorded_in,
            EscapeKind::LeaveSection => self.open.iter().rev().copied().find(|id| {
                self.boundaries[*id].granularity == Granularity::Section
            }),
        };

        let id = self.escapes.insert(Escape {
            element,
            kind,
            owner,
            recorded_in,
            nested: false,
        });

        if let Some(owner) = owner {
            self.boundaries[owner].escapes.push(id);
        }

        id
    }

    /// Marks the escape as sitting in a unit extracted from inside its owner.
    pub fn mark_nested(&mut self, id: ID<Escape>) {
        self.escapes[id].nested = true;
    }

    /// Marks the boundary as dealt with; edits no longer adjust it.
    pub fn retire(&mut self, id: ID<Boundary>) {
        self.boundaries[id].retired = true;
    }

    /// Records where the leading declarations of the sequence end.
    pub fn mark_declarations_end(
        &mut self,
        sequence: ID<Sequence>,
        index: usize,
    ) {
        self.declarations_end = Some(Marker { sequence, index });
    }

    /// Returns the declarations-end marker if the declarations haven't been
    /// split off yet.
    #[must_use]
    pub const fn declarations_end(&self) -> Option<Marker> {
        self.declarations_end
    }

    /// Forgets the declarations-end marker once the declarations were split
    /// off.
    pub fn clear_declarations_end(&mut self) { self.declarations_end = None; }
}

//! Contains the structured-program [`Tree`] built for every compilation unit:
//! its [`Element`]s, the [`Sequence`]s holding them and the [`Unit`]s owning
//! the top-level sequences.
//!
//! Elements are never destroyed. Moving a range of elements into another
//! sequence only moves their [`ID`]s, so the blocks nested in a moved element
//! travel along with it.

use std::ops::Range;

use cobflow_arena::{Arena, ID};
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};

pub mod element;
pub mod module;
pub mod render;

pub use element::{
    Branch, Constant, Declaration, Element, Jump, Kind, LoopHeader, Variable,
};
pub use module::{Library, Module, SealedModuleError, Tier};
pub use render::{Outline, UnitOutline};

/// An ordered block of elements.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub struct Sequence {
    elements: Vec<ID<Element>>,
}

impl Sequence {
    /// Returns the elements of the sequence.
    #[must_use]
    pub fn elements(&self) -> &[ID<Element>] { &self.elements }
}

/// The kind of a unit.
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
pub enum UnitKind {
    /// The main program of a compilation unit.
    #[strum(to_string = "program")]
    Program,

    /// A subroutine extracted from a section or a paragraph.
    #[strum(to_string = "sub")]
    Subroutine,

    /// A unit holding shared declarations only.
    #[strum(to_string = "include")]
    Includable,
}

/// An independently callable (or includable) unit.
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
pub struct Unit {
    /// The name of the unit.
    #[get = "pub"]
    name: String,

    /// The kind of the unit.
    #[get_copy = "pub"]
    kind: UnitKind,

    /// The top-level sequence.
    #[get_copy = "pub"]
    body: ID<Sequence>,

    /// The names of the modules the unit includes, in inclusion order.
    #[get = "pub"]
    includes: Vec<String>,

    /// The explanatory comment.
    #[get = "pub"]
    comment: Option<String>,
}

impl Unit {
    /// Adds a module to the includes unless it is already there.
    pub fn include(&mut self, module: impl Into<String>) {
        let module = module.into();
        if !self.includes.iter().any(|existing| existing.eq_ignore_ascii_case(&module)) {
            self.includes.push(module);
        }
    }

    /// Replaces the comment.
    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment;
    }
}

/// The element tree of a compilation unit and of the units extracted from it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tree {
    elements: Arena<Element>,
    sequences: Arena<Sequence>,
    units: Arena<Unit>,
}

impl Tree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Creates a new empty sequence.
    pub fn new_sequence(&mut self) -> ID<Sequence> {
        self.sequences.insert(Sequence::default())
    }

    /// Creates a new sequence holding the given elements.
    pub fn new_sequence_with(
        &mut self,
        elements: Vec<ID<Element>>,
    ) -> ID<Sequence> {
        self.sequences.insert(Sequence { elements })
    }

    /// Creates a new element that isn't part of any sequence yet.
    pub fn new_element(&mut self, element: Element) -> ID<Element> {
        self.elements.insert(element)
    }

    /// Creates a unit owning the given top-level sequence.
    pub fn new_unit(
        &mut self,
        name: impl Into<String>,
        kind: UnitKind,
        body: ID<Sequence>,
    ) -> ID<Unit> {
        self.units.insert(Unit {
            name: name.into(),
            kind,
            body,
            includes: Vec::new(),
            comment: None,
        })
    }

    /// Returns the element with the given ID.
    #[must_use]
    pub fn element(&self, id: ID<Element>) -> &Element { &self.elements[id] }

    /// Returns the element with the given ID mutably.
    #[must_use]
    pub fn element_mut(&mut self, id: ID<Element>) -> &mut Element {
        &mut self.elements[id]
    }

    /// Returns the elements of the given sequence.
    #[must_use]
    pub fn sequence(&self, id: ID<Sequence>) -> &[ID<Element>] {
        &self.sequences[id].elements
    }

    /// Returns the number of elements in the given sequence.
    #[must_use]
    pub fn len(&self, id: ID<Sequence>) -> usize {
        self.sequences[id].elements.len()
    }

    /// Returns the unit with the given ID.
    #[must_use]
    pub fn unit(&self, id: ID<Unit>) -> &Unit { &self.units[id] }

    /// Returns the unit with the given ID mutably.
    #[must_use]
    pub fn unit_mut(&mut self, id: ID<Unit>) -> &mut Unit {
        &mut self.units[id]
    }

    /// Returns every unit with its ID, in creation order.
    pub fn units(&self) -> impl ExactSizeIterator<Item = (ID<Unit>, &Unit)> {
        self.units.iter()
    }

    /// Creates an element and appends it to the sequence. Returns its ID.
    pub fn push(
        &mut self,
        sequence: ID<Sequence>,
        element: Element,
    ) -> ID<Element> {
        let id = self.elements.insert(element);
        self.sequences[sequence].elements.push(id);
        id
    }

    /// Creates an element and inserts it at the given position.
    ///
    /// # Panics
    ///
    /// Panics if `at` is greater than the length of the sequence.
    pub fn insert(
        &mut self,
        sequence: ID<Sequence>,
        at: usize,
        element: Element,
    ) -> ID<Element> {
        let id = self.elements.insert(element);
        self.sequences[sequence].elements.insert(at, id);
        id
    }

    /// Detaches the element at the given position from the sequence.
    ///
    /// # Panics
    ///
    /// Panics if `at` is out of bounds.
    pub fn remove(&mut self, sequence: ID<Sequence>, at: usize) -> ID<Element> {
        self.sequences[sequence].elements.remove(at)
    }

    /// Detaches the given range of elements from the sequence.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn splice_out(
        &mut self,
        sequence: ID<Sequence>,
        range: Range<usize>,
    ) -> Vec<ID<Element>> {
        self.sequences[sequence].elements.drain(range).collect()
    }

    /// Returns the position of the element in the sequence.
    #[must_use]
    pub fn position(
        &self,
        sequence: ID<Sequence>,
        element: ID<Element>,
    ) -> Option<usize> {
        self.sequences[sequence].elements.iter().position(|id| *id == element)
    }

    /// Returns `false` if an enabled jump lies in `from..at` of the sequence.
    #[must_use]
    pub fn is_reachable_from(
        &self,
        sequence: ID<Sequence>,
        from: usize,
        at: usize,
    ) -> bool {
        let elements = &self.sequences[sequence].elements;
        let at = at.min(elements.len());

        !elements[from.min(at)..at]
            .iter()
            .any(|id| self.elements[*id].is_live_terminator())
    }
}

//! Contains the [`SymbolTable`], the per-unit record model built from the data
//! declarations of a compilation unit.
//!
//! Fields are stored in an [`Arena`] and link to their parent, next sibling
//! and first child through [`ID`]s. The table never removes a field; once
//! inserted, its links only grow.

use std::collections::HashMap;

use cobflow_arena::{Arena, ID};
use cobflow_diagnostic::{Handler, Issue};
use itertools::Itertools;
use log::{debug, trace};

pub mod condition;
pub mod diagnostic;
pub mod field;
pub mod picture;
pub mod reference;
pub mod r#type;

pub use field::{
    Field, FieldDeclaration, InvalidLevel, Level, NewField, Occurs, ValueEntry,
    Visibility,
};
pub use picture::{Category, Picture, PictureError, Usage};
pub use r#type::{Component, FieldType, Precision, Primitive, RecordType, Type, Width};
pub use reference::Reference;

use crate::diagnostic::{
    AmbiguousFieldReference, InvalidLevelNumber, InvalidPicture, UnknownUsage,
};

/// The construction cursor threaded through successive insertions.
///
/// It remembers the most recently inserted field, which is where the level of
/// the next declaration is resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cursor {
    last: Option<ID<Field>>,
}

impl Cursor {
    /// Returns the most recently inserted field.
    #[must_use]
    pub const fn last(&self) -> Option<ID<Field>> { self.last }
}

/// The result of [`SymbolTable::insert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    /// The inserted field.
    pub field: ID<Field>,

    /// The fillers created to keep the level steps consistent, outermost
    /// first.
    pub synthesized: Vec<ID<Field>>,

    /// The cursor to use for the next insertion.
    pub cursor: Cursor,
}

/// The outcome of a [`SymbolTable::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Exactly one field matches.
    Unique(ID<Field>),

    /// Several fields match; one was chosen on a best-effort basis.
    Ambiguous {
        /// The chosen field.
        chosen: ID<Field>,

        /// Every matching field, in declaration order.
        candidates: Vec<ID<Field>>,
    },

    /// No field has the name.
    NotFound,
}

impl Lookup {
    /// Returns the found (or chosen) field.
    #[must_use]
    pub const fn field(&self) -> Option<ID<Field>> {
        match self {
            Self::Unique(id) | Self::Ambiguous { chosen: id, .. } => Some(*id),
            Self::NotFound => None,
        }
    }
}

/// Owns the tree of fields of one compilation unit.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    fields: Arena<Field>,
    by_name: HashMap<String, Vec<ID<Field>>>,
    records: Vec<ID<Field>>,
    filler_prefix: String,
    fillers: usize,
}

impl Default for SymbolTable {
    fn default() -> Self { Self::new("FILLER") }
}

fn key(name: &str) -> String { name.trim().to_ascii_uppercase() }

impl SymbolTable {
    /// Creates an empty table naming anonymous fields `<prefix>_<n>`.
    #[must_use]
    pub fn new(filler_prefix: impl Into<String>) -> Self {
        Self {
            fields: Arena::new(),
            by_name: HashMap::new(),
            records: Vec::new(),
            filler_prefix: filler_prefix.into(),
            fillers: 0,
        }
    }

    /// Returns the field with the given ID.
    #[must_use]
    pub fn get(&self, id: ID<Field>) -> Option<&Field> { self.fields.get(id) }

    /// Returns the number of fields, synthesised ones included.
    #[must_use]
    pub fn len(&self) -> usize { self.fields.len() }

    /// Returns `true` if nothing has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    /// Returns every field with its ID, in creation order.
    pub fn fields(&self) -> impl ExactSizeIterator<Item = (ID<Field>, &Field)> {
        self.fields.iter()
    }

    /// Returns the top-level fields (levels 1, 77 and 78 and orphans), in
    /// declaration order.
    #[must_use]
    pub fn records(&self) -> &[ID<Field>] { &self.records }

    /// Returns the children of the given field, in declaration order.
    pub fn children(
        &self,
        id: ID<Field>,
    ) -> impl Iterator<Item = ID<Field>> + '_ {
        std::iter::successors(self[id].first_child, |child| {
            self[*child].next_sibling
        })
    }

    /// Returns the ancestors of the given field, the parent first.
    pub fn ancestors(
        &self,
        id: ID<Field>,
    ) -> impl Iterator<Item = ID<Field>> + '_ {
        std::iter::successors(self[id].parent, |parent| self[*parent].parent)
    }

    /// Returns the top-level field whose tree contains the given field.
    #[must_use]
    pub fn record_of(&self, id: ID<Field>) -> ID<Field> {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// Returns the chain of fields from the record down to the given field.
    #[must_use]
    pub fn path(&self, id: ID<Field>) -> Vec<ID<Field>> {
        let mut path = self.ancestors(id).collect::<Vec<_>>();
        path.reverse();
        path.push(id);
        path
    }

    /// Inserts a field after the one the cursor points at.
    ///
    /// Levels 1, 77 and 78 start a new top-level entry. Level 66 joins the
    /// current level-1 record and level 88 the nearest preceding field that is
    /// not a condition. Levels 2 to 49 become the sibling of an equal-level
    /// field or the child of the nearest lower-level one; whenever the parent's
    /// level is more than one below, a filler is synthesised in between.
    pub fn insert(&mut self, cursor: Cursor, field: NewField) -> Insertion {
        let level = field.level;
        let mut synthesized = Vec::new();

        let parent = if level.is_top_level() {
            None
        } else if level.is_renames() {
            cursor
                .last
                .map(|last| self.record_of(last))
                .filter(|record| self[*record].level == Level::RECORD)
        } else if level.is_condition() {
            std::iter::successors(cursor.last, |id| self[*id].parent)
                .find(|id| !self[*id].level.is_condition())
        } else {
            let visibility = cursor
                .last
                .map_or(field.visibility, |last| self[self.record_of(last)].visibility);

            let parent = match self.resolve_parent(cursor, level) {
                Some(parent) => parent,
                None => {
                    let root = self.synthesize(Level::RECORD, None, visibility);
                    synthesized.push(root);
                    root
                }
            };

            match level.enclosing() {
                Some(enclosing) if self[parent].level < enclosing => {
                    let filler = self.synthesize(enclosing, Some(parent), visibility);
                    synthesized.push(filler);
                    Some(filler)
                }
                _ => Some(parent),
            }
        };

        let visibility = parent
            .map_or(field.visibility, |parent| self[self.record_of(parent)].visibility);
        let anonymous = field.name.is_none();
        let name = field.name.unwrap_or_else(|| self.next_filler_name());

        let id = self.fields.insert(Field {
            level,
            name,
            anonymous,
            synthesized: false,
            picture: field.picture,
            usage: field.usage,
            occurs: field.occurs,
            visibility,
            values: field.values,
            redefines: field.redefines,
            parent: None,
            next_sibling: None,
            first_child: None,
        });
        self.attach(id, parent);

        trace!(
            "inserted `{}` at level {level} under {:?}",
            self[id].name,
            parent.map(|parent| &self[parent].name)
        );

        Insertion { field: id, synthesized, cursor: Cursor { last: Some(id) } }
    }

    fn resolve_parent(
        &self,
        cursor: Cursor,
        level: Level,
    ) -> Option<ID<Field>> {
        let mut candidate = cursor.last;

        while let Some(id) = candidate {
            let field = &self[id];

            if field.level.is_condition() || field.level.is_renames() {
                candidate = field.parent;
                continue;
            }

            if field.level.is_top_level() {
                return (field.level == Level::RECORD && level > field.level)
                    .then_some(id);
            }

            if field.level < level {
                return Some(id);
            }

            if field.level == level && !field.synthesized {
                return field.parent;
            }

            candidate = field.parent;
        }

        None
    }

    fn next_filler_name(&mut self) -> String {
        self.fillers += 1;
        format!("{}_{}", self.filler_prefix, self.fillers)
    }

    fn synthesize(
        &mut self,
        level: Level,
        parent: Option<ID<Field>>,
        visibility: Visibility,
    ) -> ID<Field> {
        let name = self.next_filler_name();
        let id = self.fields.insert(Field {
            level,
            name,
            anonymous: true,
            synthesized: true,
            picture: None,
            usage: Usage::Display,
            occurs: None,
            visibility,
            values: Vec::new(),
            redefines: None,
            parent: None,
            next_sibling: None,
            first_child: None,
        });
        self.attach(id, parent);

        debug!("synthesised `{}` at level {level}", self[id].name);

        id
    }

    fn attach(&mut self, id: ID<Field>, parent: Option<ID<Field>>) {
        let previous = match parent {
            Some(parent) => {
                let last = self.children(parent).last();
                if last.is_none() {
                    self.fields[parent].first_child = Some(id);
                }
                last
            }
            None => {
                let last = self.records.last().copied();
                self.records.push(id);
                last
            }
        };

        if let Some(previous) = previous {
            self.fields[previous].next_sibling = Some(id);
        }

        self.fields[id].parent = parent;

        if !self.fields[id].anonymous {
            self.by_name.entry(key(&self.fields[id].name)).or_default().push(id);
        }
    }

    /// Looks a field up by its bare name and its qualifiers (innermost first).
    ///
    /// With a single candidate, the qualifiers aren't checked. With several,
    /// the candidates whose ancestor chain contains the qualifiers in order are
    /// kept; if that still leaves more than one (or none), the earliest
    /// declared one is chosen and the lookup is [`Lookup::Ambiguous`].
    #[must_use]
    pub fn lookup<S: AsRef<str>>(
        &self,
        name: &str,
        qualifiers: &[S],
    ) -> Lookup {
        let Some(candidates) = self.by_name.get(&key(name)) else {
            return Lookup::NotFound;
        };

        match candidates.as_slice() {
            [] => Lookup::NotFound,
            [single] => Lookup::Unique(*single),
            candidates => {
                let matching = candidates
                    .iter()
                    .copied()
                    .filter(|candidate| self.matches_qualifiers(*candidate, qualifiers))
                    .collect::<Vec<_>>();

                match matching.as_slice() {
                    [single] => Lookup::Unique(*single),
                    [] => Lookup::Ambiguous {
                        chosen: candidates[0],
                        candidates: candidates.to_vec(),
                    },
                    [first, ..] => Lookup::Ambiguous {
                        chosen: *first,
                        candidates: matching.clone(),
                    },
                }
            }
        }
    }

    fn matches_qualifiers<S: AsRef<str>>(
        &self,
        id: ID<Field>,
        qualifiers: &[S],
    ) -> bool {
        let mut ancestors = self.ancestors(id);

        qualifiers.iter().all(|qualifier| {
            ancestors.any(|ancestor| {
                self[ancestor].name.eq_ignore_ascii_case(qualifier.as_ref().trim())
            })
        })
    }

    /// Parses a textual reference and looks it up, reporting an
    /// [`AmbiguousFieldReference`] when several fields match.
    pub fn resolve(
        &self,
        text: &str,
        handler: &dyn Handler<Box<dyn Issue>>,
    ) -> Option<(ID<Field>, Reference)> {
        let reference = Reference::parse(text)?;

        match self.lookup(&reference.name, &reference.qualifiers) {
            Lookup::Unique(id) => Some((id, reference)),
            Lookup::Ambiguous { chosen, candidates } => {
                debug!("`{text}` is ambiguous, choosing {chosen:?}");

                handler.receive(Box::new(AmbiguousFieldReference {
                    reference: text.trim().to_owned(),
                    chosen: self.qualified_name(chosen),
                    candidates: candidates
                        .iter()
                        .map(|candidate| self.qualified_name(*candidate))
                        .collect(),
                }));

                Some((chosen, reference))
            }
            Lookup::NotFound => None,
        }
    }

    /// Returns the dotted path of the field from its record, with one `[%k]`
    /// placeholder after every enclosing array (`A.B[%1].X`).
    #[must_use]
    pub fn qualified_name(&self, id: ID<Field>) -> String {
        self.render_path(id, |dimension| format!("%{dimension}"), false)
    }

    /// Like [`SymbolTable::qualified_name`] but substitutes the given
    /// subscripts, outermost first, into the placeholders. If the field itself
    /// is an array and a subscript is left, it is appended as well.
    #[must_use]
    pub fn access_path(&self, id: ID<Field>, subscripts: &[&str]) -> String {
        self.render_path(
            id,
            |dimension| {
                subscripts
                    .get(dimension - 1)
                    .map_or_else(|| format!("%{dimension}"), |s| (*s).trim().to_owned())
            },
            subscripts.len() > self.ancestors(id).filter(|a| self[*a].is_array()).count(),
        )
    }

    fn render_path(
        &self,
        id: ID<Field>,
        mut subscript: impl FnMut(usize) -> String,
        index_self: bool,
    ) -> String {
        let path = self.path(id);
        let mut dimension = 0;
        let mut rendered = String::new();

        for (position, segment) in path.iter().enumerate() {
            if position > 0 {
                rendered.push('.');
            }
            rendered.push_str(&self[*segment].name);

            let is_last = position + 1 == path.len();
            if self[*segment].is_array() && (!is_last || index_self) {
                dimension += 1;
                rendered.push('[');
                rendered.push_str(&subscript(dimension));
                rendered.push(']');
            }
        }

        rendered
    }

    /// Returns the `INDEXED BY` aliases declared anywhere in the tree of the
    /// given field, in declaration order.
    #[must_use]
    pub fn indices_within(&self, id: ID<Field>) -> Vec<String> {
        let mut pending = vec![id];
        let mut indices = Vec::new();

        while let Some(current) = pending.pop() {
            if let Some(occurs) = &self[current].occurs {
                indices.extend(occurs.indices.iter().cloned());
            }

            let children = self.children(current).collect::<Vec<_>>();
            pending.extend(children.into_iter().rev());
        }

        indices.into_iter().unique().collect()
    }

    /// Validates a textual declaration and inserts it.
    ///
    /// An invalid level skips the declaration; an invalid picture leaves the
    /// type unset; an unknown usage falls back to `DISPLAY`. Each case is
    /// reported to the handler.
    pub fn declare(
        &mut self,
        cursor: Cursor,
        declaration: &FieldDeclaration,
        handler: &dyn Handler<Box<dyn Issue>>,
    ) -> Option<Insertion> {
        let display_name =
            declaration.name.clone().unwrap_or_else(|| self.filler_prefix.clone());

        let level = match Level::new(declaration.level) {
            Ok(level) => level,
            Err(error) => {
                handler.receive(Box::new(InvalidLevelNumber {
                    level: error.0,
                    name: declaration.name.clone(),
                }));
                return None;
            }
        };

        let picture = declaration.picture.as_deref().and_then(|picture| {
            Picture::parse(picture)
                .map_err(|error| {
                    handler.receive(Box::new(InvalidPicture {
                        field: display_name.clone(),
                        picture: picture.to_owned(),
                        error,
                    }));
                })
                .ok()
        });

        let usage = declaration.usage.as_deref().map_or(Usage::Display, |usage| {
            Usage::parse(usage).unwrap_or_else(|_| {
                handler.receive(Box::new(UnknownUsage {
                    field: display_name.clone(),
                    usage: usage.to_owned(),
                }));
                Usage::Display
            })
        });

        let redefines = declaration.redefines.as_deref().and_then(|target| {
            let first = target
                .split_whitespace()
                .take_while(|word| {
                    !word.eq_ignore_ascii_case("THRU")
                        && !word.eq_ignore_ascii_case("THROUGH")
                })
                .join(" ");

            let resolved = self.resolve(&first, handler).map(|(id, _)| id);
            if resolved.is_none() {
                debug!("`{display_name}` redefines the unknown field `{target}`");
            }
            resolved
        });

        Some(self.insert(cursor, NewField {
            level,
            name: declaration.name.clone(),
            picture,
            usage,
            values: declaration.values.clone(),
            redefines,
            visibility: declaration.visibility,
            occurs: declaration.occurs.clone(),
        }))
    }
}

impl std::ops::Index<ID<Field>> for SymbolTable {
    type Output = Field;

    fn index(&self, id: ID<Field>) -> &Self::Output { &self.fields[id] }
}

#[cfg(test)]
mod test;

//! Contains the extraction pass that turns the tracked procedure boundaries of
//! a finished tree into independently callable subroutines.
//!
//! The pass visits the boundaries in reverse creation order, so a boundary
//! contained in another one is always handled first. The range of every
//! boundary is read from the tracker right before it is acted upon; all the
//! structural edits are reported back to the tracker as [`Edit`]s.

use cobflow_abort::{Abort, Cancellation};
use cobflow_arena::ID;
use cobflow_diagnostic::{Handler, Issue};
use cobflow_element::{
    Element, Jump, Kind, Library, Sequence, Tier, Tree, Unit, UnitKind,
};
use cobflow_procedure::{
    Boundary, BoundaryTracker, CallRegistry, Edit, EscapeKind,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

pub mod diagnostic;

use crate::diagnostic::{
    EmptyProcedure, SealedModule, UndefinedProcedure, UnsupportedExit,
};

/// Tunes the extraction pass.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    TypedBuilder,
    Serialize,
    Deserialize,
)]
pub struct Config {
    /// Moves the leading local declarations into a `<UNIT>_DATA` module
    /// shared with the extracted subroutines.
    #[builder(default = true)]
    pub split_declarations: bool,

    /// Removes calls and forward no-ops that can never execute.
    #[builder(default = true)]
    pub drop_unreachable: bool,
}

impl Default for Config {
    fn default() -> Self { Self::builder().build() }
}

/// The outcome of the extraction pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extraction {
    /// The created subroutines, in extraction order.
    pub subroutines: Vec<ID<Unit>>,

    /// The names of the shared-data modules created by the pass.
    pub modules: Vec<String>,
}

/// Runs the extraction pass over the tree of one compilation unit.
pub struct Extractor<'a> {
    tree: &'a mut Tree,
    tracker: &'a mut BoundaryTracker,
    registry: &'a mut CallRegistry,
    library: &'a mut Library,
    program: ID<Unit>,
    config: Config,
    handler: &'a dyn Handler<Box<dyn Issue>>,
    extraction: Extraction,
}

impl std::fmt::Debug for Extractor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("program", &self.program)
            .field("config", &self.config)
            .field("extraction", &self.extraction)
            .finish_non_exhaustive()
    }
}

fn mark_unsupported(tree: &mut Tree, element: ID<Element>, reason: &str) {
    let element = tree.element_mut(element);
    element.set_disabled(true);
    element.set_comment(Some(format!("unsupported: {reason}")));
}

impl<'a> Extractor<'a> {
    /// Creates the pass for the given program unit.
    pub fn new(
        tree: &'a mut Tree,
        tracker: &'a mut BoundaryTracker,
        registry: &'a mut CallRegistry,
        library: &'a mut Library,
        program: ID<Unit>,
        config: Config,
        handler: &'a dyn Handler<Box<dyn Issue>>,
    ) -> Self {
        Self {
            tree,
            tracker,
            registry,
            library,
            program,
            config,
            handler,
            extraction: Extraction::default(),
        }
    }

    /// Runs the pass.
    ///
    /// # Errors
    ///
    /// Returns [`Abort`] if the cancellation was requested; the tree is then
    /// left half-processed.
    pub fn run(
        mut self,
        cancellation: &Cancellation,
    ) -> Result<Extraction, Abort> {
        let boundaries = self.tracker.ids().rev().collect::<Vec<_>>();

        for id in boundaries {
            cancellation.check()?;
            self.process(id);
        }

        self.report_unattached_escapes();
        self.report_undefined_procedures();

        Ok(self.extraction)
    }

    fn process(&mut self, id: ID<Boundary>) {
        let boundary = self.tracker.get(id).clone();
        if boundary.retired() {
            return;
        }

        let Some(range) = boundary.range() else {
            self.tracker.retire(id);
            return;
        };

        let referenced = self.registry.contains(boundary.name());
        let owns_escapes = !boundary.escapes().is_empty();

        if range.is_empty() {
            self.leave_explanation(id, &boundary, referenced);
        } else if !referenced && !owns_escapes {
            debug!(
                "the {} `{}` is never called, its body stays inline",
                boundary.granularity(),
                boundary.name()
            );

            if self.config.drop_unreachable {
                self.drop_forward_no_op(id, &boundary, range);
            }
        } else {
            self.outline(id, &boundary, range);
        }

        self.tracker.retire(id);
    }

    fn leave_explanation(
        &mut self,
        id: ID<Boundary>,
        boundary: &Boundary,
        referenced: bool,
    ) {
        let comment =
            format!("the {} `{}` is empty", boundary.granularity(), boundary.name());

        self.tree.insert(
            boundary.sequence(),
            boundary.start(),
            Element::new_disabled(Kind::call(boundary.name()), comment.clone()),
        );
        self.tracker.apply(&Edit {
            sequence: boundary.sequence(),
            at: boundary.start(),
            removed: 0,
            inserted: 1,
            within: Some(id),
            moved_to: None,
        });

        for placeholder in self.registry.take(boundary.name()) {
            self.tree.element_mut(placeholder).set_comment(Some(comment.clone()));
        }

        if referenced {
            self.handler.receive(Box::new(EmptyProcedure {
                name: boundary.name().clone(),
                granularity: boundary.granularity(),
            }));
        }

        debug!("`{}` has no body, left an explanatory call", boundary.name());
    }

    fn drop_forward_no_op(
        &mut self,
        id: ID<Boundary>,
        boundary: &Boundary,
        range: std::ops::Range<usize>,
    ) {
        let sequence = boundary.sequence();
        let elements = self.tree.sequence(sequence);

        let from = self.entry_point(id);

        let lone_no_op = range.len() == 1
            && matches!(self.tree.element(elements[range.start]).kind(), Kind::NoOp)
            && !self.tree.is_reachable_from(sequence, from, range.start);
        if !lone_no_op {
            return;
        }

        let mut at = range.start;
        let mut removed = 1;

        if let Some(previous) = at.checked_sub(1) {
            let element = self.tree.element(elements[previous]);
            if element.disabled()
                && matches!(element.kind(), Kind::Call { .. })
                && !self.tree.is_reachable_from(sequence, from, previous)
            {
                at = previous;
                removed = 2;
            }
        }

        self.tree.splice_out(sequence, at..at + removed);
        self.tracker.apply(&Edit {
            sequence,
            at,
            removed,
            inserted: 0,
            within: Some(id),
            moved_to: None,
        });

        debug!("dropped {removed} unreachable element(s) of `{}`", boundary.name());
    }

    fn outline(
        &mut self,
        id: ID<Boundary>,
        boundary: &Boundary,
        range: std::ops::Range<usize>,
    ) {
        let sequence = boundary.sequence();
        let name = boundary.name().clone();
        let length = range.len();

        let elements = self.tree.splice_out(sequence, range.clone());
        let body = self.tree.new_sequence_with(elements);
        let unit = self.tree.new_unit(name.clone(), UnitKind::Subroutine, body);
        let call = self.tree.insert(sequence, range.start, Element::new(Kind::call(&name)));

        self.tracker.apply(&Edit {
            sequence,
            at: range.start,
            removed: length,
            inserted: 1,
            within: Some(id),
            moved_to: Some(body),
        });
        self.extraction.subroutines.push(unit);

        info!(
            "extracted the {} `{name}` ({length} element(s)) into a subroutine",
            boundary.granularity()
        );

        if self.config.split_declarations {
            self.split_declarations();
        }

        let includes = self.tree.unit(self.program).includes().clone();
        for include in includes {
            self.tree.unit_mut(unit).include(include);
        }

        for placeholder in self.registry.take(&name) {
            let element = self.tree.element_mut(placeholder);
            element.set_disabled(false);
            element.set_comment(None);
        }

        if self.config.drop_unreachable {
            self.drop_unreachable_call(id, sequence, call);
        }

        self.resolve_escapes(id, boundary, body);
    }

    fn split_declarations(&mut self) {
        let Some(marker) = self.tracker.declarations_end() else {
            return;
        };
        self.tracker.clear_declarations_end();

        if marker.index == 0 {
            return;
        }

        let name = format!("{}_DATA", self.tree.unit(self.program).name());
        let elements = self.tree.splice_out(marker.sequence, 0..marker.index);
        self.tracker.apply(&Edit {
            sequence: marker.sequence,
            at: 0,
            removed: marker.index,
            inserted: 0,
            within: None,
            moved_to: None,
        });

        let (module, created) = self.library.get_or_create(&name, Tier::Local);
        if created {
            self.extraction.modules.push(name.clone());
        }

        for element in elements {
            let Kind::Declaration(declaration) = self.tree.element(element).kind() else {
                continue;
            };

            if let Err(error) = self.library.append(module, declaration.clone()) {
                self.handler.receive(Box::new(SealedModule {
                    module: error.name,
                    declaration: declaration.name().to_owned(),
                }));
            }
        }

        self.tree.unit_mut(self.program).include(name.clone());

        info!("split {} declaration(s) into `{name}`", marker.index);
    }

    /// Returns where execution enters the code around the boundary: the start
    /// of the innermost container that is going to be extracted, or the start
    /// of the sequence.
    fn entry_point(&self, id: ID<Boundary>) -> usize {
        self.tracker
            .ancestors(id)
            .map(|ancestor| self.tracker.get(ancestor))
            .find(|ancestor| {
                !ancestor.retired()
                    && ancestor.range().is_some_and(|range| !range.is_empty())
                    && (self.registry.contains(ancestor.name())
                        || !ancestor.escapes().is_empty())
            })
            .map_or(0, Boundary::start)
    }

    fn drop_unreachable_call(
        &mut self,
        id: ID<Boundary>,
        sequence: ID<Sequence>,
        call: ID<Element>,
    ) {
        let Some(position) = self.tree.position(sequence, call) else {
            return;
        };

        if self.tree.is_reachable_from(sequence, self.entry_point(id), position) {
            return;
        }

        self.tree.remove(sequence, position);
        self.tracker.apply(&Edit {
            sequence,
            at: position,
            removed: 1,
            inserted: 0,
            within: self.tracker.get(id).container(),
            moved_to: None,
        });

        debug!("dropped the unreachable call at {position}");
    }

    fn resolve_escapes(
        &mut self,
        id: ID<Boundary>,
        boundary: &Boundary,
        body: ID<Sequence>,
    ) {
        for escape in boundary.escapes().iter().copied() {
            let escape = *self.tracker.escape(escape);
            let (element, kind) = (escape.element(), escape.kind());

            if escape.nested() {
                let reason = format!(
                    "`{kind}` of `{}` sits in a procedure performed from it",
                    boundary.name()
                );
                warn!("{reason}");
                mark_unsupported(self.tree, element, &reason);

                self.handler.receive(Box::new(UnsupportedExit {
                    kind,
                    procedure: Some(boundary.name().clone()),
                    reason,
                }));
            } else {
                *self.tree.element_mut(element).kind_mut() = Kind::Jump(Jump::Return);
            }
        }

        let nested = self
            .tracker
            .escapes()
            .filter(|(_, escape)| {
                escape.kind() == EscapeKind::LeaveSection
                    && escape.recorded_in() == Some(id)
                    && escape.owner().is_some_and(|owner| owner != id)
            })
            .map(|(escape, _)| escape)
            .collect::<Vec<_>>();

        for escape in nested {
            self.tracker.mark_nested(escape);
        }

        debug!(
            "`{}` now holds {} element(s)",
            boundary.name(),
            self.tree.len(body)
        );
    }

    fn report_unattached_escapes(&mut self) {
        let unattached = self
            .tracker
            .escapes()
            .filter(|(_, escape)| escape.owner().is_none())
            .map(|(_, escape)| *escape)
            .collect::<Vec<_>>();

        for escape in unattached {
            let procedure = escape
                .recorded_in()
                .map(|boundary| self.tracker.get(boundary).name().clone());

            let reason = match escape.kind() {
                EscapeKind::LeaveSection => "no section encloses the exit",
                EscapeKind::LeaveParagraph => "no paragraph encloses the exit",
            }
            .to_owned();

            warn!("{reason}");
            mark_unsupported(self.tree, escape.element(), &reason);

            self.handler.receive(Box::new(UnsupportedExit {
                kind: escape.kind(),
                procedure,
                reason,
            }));
        }
    }

    fn report_undefined_procedures(&mut self) {
        for (name, placeholders) in self.registry.drain_remaining() {
            for placeholder in &placeholders {
                self.tree
                    .element_mut(*placeholder)
                    .set_comment(Some(format!("undefined procedure `{name}`")));
            }

            self.handler.receive(Box::new(UndefinedProcedure {
                name,
                calls: placeholders.len(),
            }));
        }
    }
}

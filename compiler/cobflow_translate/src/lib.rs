//! Contains the [`UnitTranslator`] that turns the [`Event`]s of one
//! compilation unit into a structured-program tree and runs the extraction
//! pass over it.
//!
//! The translator owns everything that lives only as long as the unit: the
//! [`SymbolTable`], the [`BoundaryTracker`] and the [`CallRegistry`]. The
//! [`Library`] of shared-data modules is borrowed, it outlives the unit.

use cobflow_abort::{Abort, Cancellation};
use cobflow_arena::ID;
use cobflow_diagnostic::{Handler, Issue};
use cobflow_element::{
    Element, Jump, Kind, Library, Sequence, Tree, Unit, UnitKind, UnitOutline,
};
use cobflow_extract::{Config, Extractor};
use cobflow_procedure::{BoundaryTracker, CallRegistry, EscapeKind, Granularity};
use cobflow_record::{
    Cursor, Field, FieldDeclaration, Reference, SymbolTable,
};
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

mod block;
mod declaration;
pub mod diagnostic;
pub mod event;

pub use event::{Event, ExitKind};

use crate::block::Block;

/// Tunes the translation of a unit.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    TypedBuilder,
    Serialize,
    Deserialize,
)]
pub struct Options {
    /// Tunes the extraction pass.
    #[builder(default)]
    #[serde(default)]
    pub extraction: Config,

    /// The prefix of the names generated for anonymous fields.
    #[builder(default = "FILLER".to_owned(), setter(into))]
    #[serde(default = "default_filler_prefix")]
    pub filler_prefix: String,
}

fn default_filler_prefix() -> String { "FILLER".to_owned() }

impl Default for Options {
    fn default() -> Self { Self::builder().build() }
}

/// The result of translating one compilation unit.
#[derive(Debug, Clone)]
pub struct Translation {
    /// The tree holding the program and every unit extracted from it.
    pub tree: Tree,

    /// The program unit.
    pub program: ID<Unit>,

    /// The extracted subroutines, in extraction order.
    pub subroutines: Vec<ID<Unit>>,

    /// The names of the modules this unit created.
    pub modules: Vec<String>,

    /// The fields of the unit.
    pub symbols: SymbolTable,
}

impl Translation {
    /// Inlines the program followed by its subroutines, in extraction order.
    #[must_use]
    pub fn outlines(&self) -> Vec<UnitOutline> {
        std::iter::once(self.program)
            .chain(self.subroutines.iter().copied())
            .map(|unit| self.tree.unit_outline(unit))
            .collect()
    }
}

/// Consumes the events of one compilation unit.
pub struct UnitTranslator<'a> {
    name: String,
    options: Options,
    library: &'a mut Library,
    handler: &'a dyn Handler<Box<dyn Issue>>,

    symbols: SymbolTable,
    cursor: Cursor,

    tree: Tree,
    program: ID<Unit>,
    body: ID<Sequence>,
    blocks: Vec<Block>,

    tracker: BoundaryTracker,
    registry: CallRegistry,

    declarations_flushed: bool,
    ended: bool,
    created_modules: Vec<String>,
}

impl std::fmt::Debug for UnitTranslator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitTranslator")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("blocks", &self.blocks)
            .field("ended", &self.ended)
            .finish_non_exhaustive()
    }
}

impl<'a> UnitTranslator<'a> {
    /// Starts the translation of the named unit.
    ///
    /// A unit nested in another one includes the `<PARENT>_GLOBAL` module of
    /// its parent if that module exists.
    pub fn new(
        name: impl Into<String>,
        nested_in: Option<&str>,
        options: Options,
        library: &'a mut Library,
        handler: &'a dyn Handler<Box<dyn Issue>>,
    ) -> Self {
        let name = name.into();
        let mut tree = Tree::new();
        let body = tree.new_sequence();
        let program = tree.new_unit(name.clone(), UnitKind::Program, body);

        if let Some(parent) = nested_in {
            let global = format!("{parent}_GLOBAL");
            if library.module(&global).is_some() {
                tree.unit_mut(program).include(global);
            } else {
                debug!("`{parent}` shares no global data with `{name}`");
            }
        }

        Self {
            symbols: SymbolTable::new(options.filler_prefix.clone()),
            name,
            options,
            library,
            handler,
            cursor: Cursor::default(),
            tree,
            program,
            body,
            blocks: Vec::new(),
            tracker: BoundaryTracker::new(),
            registry: CallRegistry::new(),
            declarations_flushed: false,
            ended: false,
            created_modules: Vec::new(),
        }
    }

    /// Returns the name of the unit.
    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    /// Returns the fields declared so far.
    #[must_use]
    pub const fn symbols(&self) -> &SymbolTable { &self.symbols }

    /// Returns the tree built so far.
    #[must_use]
    pub const fn tree(&self) -> &Tree { &self.tree }

    /// Returns the boundaries tracked so far.
    #[must_use]
    pub const fn tracker(&self) -> &BoundaryTracker { &self.tracker }

    /// Returns the placeholders still waiting for their procedure.
    #[must_use]
    pub const fn registry(&self) -> &CallRegistry { &self.registry }

    /// Consumes one event.
    ///
    /// # Errors
    ///
    /// Returns [`Abort`] if the cancellation was requested.
    pub fn dispatch(
        &mut self,
        event: Event,
        cancellation: &Cancellation,
    ) -> Result<(), Abort> {
        cancellation.check()?;
        trace!("`{}` <- {event:?}", self.name);

        if self.ended {
            debug!("`{}` already ended, ignoring {event:?}", self.name);
            return Ok(());
        }

        if event.is_procedural() {
            self.end_of_declarations();
        }

        match event {
            Event::DeclareField(declaration) => {
                self.declare_field(&declaration);
            }
            Event::EndOfDeclarations => self.end_of_declarations(),
            Event::EnterSection(name) => self.enter_section(name),
            Event::EnterParagraph(name) => self.enter_paragraph(name),
            Event::EndOfUnit => self.end_of_unit(),
            Event::Statement(text) => {
                self.statement(text);
            }
            Event::NoOp => {
                self.append(Element::new(Kind::NoOp));
            }
            Event::Stop => {
                self.append(Element::new(Kind::Jump(Jump::Stop)));
            }
            Event::Call { target, arguments } => {
                self.emit_call(&target, arguments);
            }
            Event::Exit(kind) => {
                self.emit_exit(kind);
            }
            Event::BeginAlternative(condition) => self.begin_alternative(&condition),
            Event::Otherwise => self.otherwise(),
            Event::BeginSelection(subject) => self.begin_selection(subject),
            Event::When(labels) => self.when(labels),
            Event::BeginLoop(header) => self.begin_loop(header),
            Event::End => self.end(),
        }

        Ok(())
    }

    /// Declares a field of the data division.
    ///
    /// Returns [`None`] if the declaration was rejected.
    pub fn declare_field(
        &mut self,
        declaration: &FieldDeclaration,
    ) -> Option<ID<Field>> {
        if self.declarations_flushed {
            debug!(
                "`{}` is declared after the procedure division started",
                declaration.name.as_deref().unwrap_or(&self.options.filler_prefix)
            );
        }

        let insertion = self.symbols.declare(self.cursor, declaration, self.handler)?;
        self.cursor = insertion.cursor;

        Some(insertion.field)
    }

    /// Looks up a field by its textual reference, reporting ambiguities.
    #[must_use]
    pub fn lookup_field(&self, reference: &str) -> Option<ID<Field>> {
        self.symbols.resolve(reference, self.handler).map(|(id, _)| id)
    }

    /// Replaces a condition name by the expression it stands for; any other
    /// condition is returned unchanged.
    #[must_use]
    pub fn expand_condition(&self, condition: &str) -> String {
        let Some(reference) = Reference::parse(condition) else {
            return condition.trim().to_owned();
        };

        self.lookup_field(condition)
            .and_then(|id| {
                let subscripts =
                    reference.subscripts.iter().map(String::as_str).collect::<Vec<_>>();
                self.symbols.condition_expression(id, &subscripts)
            })
            .unwrap_or_else(|| condition.trim().to_owned())
    }

    /// Opens a section.
    pub fn enter_section(&mut self, name: impl Into<String>) {
        self.enter(name.into(), Granularity::Section);
    }

    /// Opens a paragraph.
    pub fn enter_paragraph(&mut self, name: impl Into<String>) {
        self.enter(name.into(), Granularity::Paragraph);
    }

    fn enter(&mut self, name: String, granularity: Granularity) {
        self.end_of_declarations();
        self.close_blocks();

        debug!("`{}`: {granularity} `{name}`", self.name);
        self.tracker.open(&self.tree, self.body, name, granularity);
    }

    /// Closes every open block and boundary. Later events are ignored.
    pub fn end_of_unit(&mut self) {
        if self.ended {
            return;
        }

        self.end_of_declarations();
        self.close_blocks();
        self.tracker.finalize(&self.tree);
        self.ended = true;
    }

    /// Appends a primitive statement.
    pub fn statement(&mut self, text: impl Into<String>) -> ID<Element> {
        self.append(Element::new(Kind::Instruction(text.into())))
    }

    /// Appends a call of the named procedure or program.
    ///
    /// A program translated before is called directly. Anything else gets a
    /// disabled placeholder that the extraction pass enables once the
    /// procedure is extracted.
    pub fn emit_call(
        &mut self,
        target: &str,
        arguments: Vec<String>,
    ) -> ID<Element> {
        let target = target.trim();
        let kind = Kind::Call { target: target.to_owned(), arguments };

        if self.library.has_program(target) {
            return self.append(Element::new(kind));
        }

        let placeholder =
            self.append(Element::new_disabled(kind, format!("`{target}` isn't extracted yet")));
        self.registry.register(target, placeholder);

        placeholder
    }

    /// Appends a non-local exit and records it with the open boundaries.
    /// Leaving the unit is an ordinary return and isn't recorded.
    pub fn emit_exit(&mut self, kind: ExitKind) -> ID<Element> {
        let (jump, escape) = match kind {
            ExitKind::LeaveParagraph => {
                (Jump::LeaveParagraph, Some(EscapeKind::LeaveParagraph))
            }
            ExitKind::LeaveSection => (Jump::LeaveSection, Some(EscapeKind::LeaveSection)),
            ExitKind::LeaveUnit => (Jump::Return, None),
        };

        let element = self.append(Element::new(Kind::Jump(jump)));
        if let Some(escape) = escape {
            self.tracker.record_escape(element, escape);
        }

        element
    }

    /// Finishes the unit: closes what is still open, runs the extraction
    /// pass, seals the modules the unit created and registers the program.
    ///
    /// # Errors
    ///
    /// Returns [`Abort`] if the cancellation was requested.
    pub fn finish(
        mut self,
        cancellation: &Cancellation,
    ) -> Result<Translation, Abort> {
        cancellation.check()?;
        self.end_of_unit();

        let extraction = Extractor::new(
            &mut self.tree,
            &mut self.tracker,
            &mut self.registry,
            &mut *self.library,
            self.program,
            self.options.extraction,
            self.handler,
        )
        .run(cancellation)?;

        self.created_modules.extend(extraction.modules);
        for module in &self.created_modules {
            if let Some(id) = self.library.id(module) {
                self.library.seal(id);
            }
        }
        self.library.register_program(&self.name);

        info!(
            "translated `{}`: {} subroutine(s), {} new module(s)",
            self.name,
            extraction.subroutines.len(),
            self.created_modules.len()
        );

        Ok(Translation {
            tree: self.tree,
            program: self.program,
            subroutines: extraction.subroutines,
            modules: self.created_modules,
            symbols: self.symbols,
        })
    }

    fn append(&mut self, element: Element) -> ID<Element> {
        self.end_of_declarations();

        let sequence = self.current_sequence();
        self.tree.push(sequence, element)
    }
}

/// Translates a whole unit from its events.
///
/// # Errors
///
/// Returns [`Abort`] if the cancellation was requested.
pub fn translate(
    name: &str,
    nested_in: Option<&str>,
    events: impl IntoIterator<Item = Event>,
    options: Options,
    library: &mut Library,
    handler: &dyn Handler<Box<dyn Issue>>,
    cancellation: &Cancellation,
) -> Result<Translation, Abort> {
    let mut translator = UnitTranslator::new(name, nested_in, options, library, handler);

    for event in events {
        translator.dispatch(event, cancellation)?;
    }

    translator.finish(cancellation)
}

#[cfg(test)]
mod test;

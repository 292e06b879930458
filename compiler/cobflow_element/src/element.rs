//! Contains the [`Element`] node of the structured-program tree.

use cobflow_arena::ID;
use cobflow_record::RecordType;
use derive_more::From;
use enum_as_inner::EnumAsInner;
use getset::{CopyGetters, Getters, MutGetters};
use serde::{Deserialize, Serialize};

use crate::Sequence;

/// Declares a variable.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Variable {
    /// The (qualified) name of the variable.
    pub name: String,

    /// The rendered element type, [`None`] when it is unknown.
    pub type_name: Option<String>,

    /// The number of elements if the variable is an array.
    pub occurs: Option<usize>,

    /// The initial value.
    pub initial: Option<String>,
}

/// Declares a named constant.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Constant {
    /// The name of the constant.
    pub name: String,

    /// The rendered type, [`None`] when it is unknown.
    pub type_name: Option<String>,

    /// The literal value.
    pub value: String,
}

/// A declaration hoisted from the data division.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumAsInner,
    From,
)]
#[allow(missing_docs)]
pub enum Declaration {
    Variable(Variable),
    Constant(Constant),
    RecordType(RecordType),
}

impl Declaration {
    /// Returns the name of the declared entity.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Variable(variable) => &variable.name,
            Self::Constant(constant) => &constant.name,
            Self::RecordType(record_type) => &record_type.name,
        }
    }
}

/// The header of a loop.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum LoopHeader {
    /// Tests the condition before every iteration.
    While(String),

    /// Tests the condition after every iteration.
    Until(String),

    /// Iterates over a counter, e.g. `I FROM 1 BY 1 UNTIL I > 10`.
    Counted(String),

    /// Never terminates by itself.
    Forever,
}

/// A jump out of the current structure.
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
pub enum Jump {
    /// Leaves the current unit.
    #[strum(to_string = "return")]
    Return,

    /// Leaves the enclosing paragraph.
    #[strum(to_string = "leave paragraph")]
    LeaveParagraph,

    /// Leaves the enclosing section.
    #[strum(to_string = "leave section")]
    LeaveSection,

    /// Terminates the program.
    #[strum(to_string = "stop")]
    Stop,
}

/// One branch of a [`Kind::Selection`].
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Branch<S> {
    /// The labels selecting the branch.
    pub labels: Vec<String>,

    /// The body of the branch.
    pub body: S,
}

/// The kind of an element.
///
/// `S` is how the nested blocks are held: [`ID`]s of [`Sequence`]s inside the
/// tree, or the nested elements themselves in an [`crate::render::Outline`].
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumAsInner,
)]
pub enum Kind<S = ID<Sequence>> {
    /// A primitive instruction produced by the statement translator.
    Instruction(String),

    /// Does nothing (`EXIT.`, `CONTINUE`).
    NoOp,

    /// A hoisted declaration.
    Declaration(Declaration),

    /// A two-way branch.
    Alternative {
        /// The tested condition.
        condition: String,

        /// Executed when the condition holds.
        then: S,

        /// Executed otherwise.
        otherwise: S,
    },

    /// A multi-way branch.
    Selection {
        /// The selection subject.
        subject: String,

        /// The labelled branches.
        branches: Vec<Branch<S>>,

        /// The `WHEN OTHER` branch.
        default: Option<S>,
    },

    /// An iteration.
    Loop {
        /// The loop header.
        header: LoopHeader,

        /// The loop body.
        body: S,
    },

    /// A call of a subroutine.
    Call {
        /// The name of the called unit.
        target: String,

        /// The arguments.
        arguments: Vec<String>,
    },

    /// A jump out of the current structure.
    Jump(Jump),
}

impl<S> Kind<S> {
    /// Returns the nested blocks, in rendering order.
    pub fn blocks(&self) -> Vec<&S> {
        match self {
            Self::Alternative { then, otherwise, .. } => vec![then, otherwise],
            Self::Selection { branches, default, .. } => branches
                .iter()
                .map(|branch| &branch.body)
                .chain(default.iter())
                .collect(),
            Self::Loop { body, .. } => vec![body],
            Self::Instruction(_)
            | Self::NoOp
            | Self::Declaration(_)
            | Self::Call { .. }
            | Self::Jump(_) => Vec::new(),
        }
    }

    /// Converts the nested blocks with the given function.
    pub fn map<T>(self, mut f: impl FnMut(S) -> T) -> Kind<T> {
        match self {
            Self::Instruction(text) => Kind::Instruction(text),
            Self::NoOp => Kind::NoOp,
            Self::Declaration(declaration) => Kind::Declaration(declaration),
            Self::Alternative { condition, then, otherwise } => Kind::Alternative {
                condition,
                then: f(then),
                otherwise: f(otherwise),
            },
            Self::Selection { subject, branches, default } => Kind::Selection {
                subject,
                branches: branches
                    .into_iter()
                    .map(|branch| Branch { labels: branch.labels, body: f(branch.body) })
                    .collect(),
                default: default.map(&mut f),
            },
            Self::Loop { header, body } => Kind::Loop { header, body: f(body) },
            Self::Call { target, arguments } => Kind::Call { target, arguments },
            Self::Jump(jump) => Kind::Jump(jump),
        }
    }

    /// Returns `true` if nothing after this element in the same sequence can
    /// execute. Leaving a paragraph or a section falls through to the next
    /// procedure, so only returns and stops terminate.
    #[must_use]
    pub const fn is_terminator(&self) -> bool {
        matches!(self, Self::Jump(Jump::Return | Jump::Stop))
    }
}

impl Kind {
    /// Creates a call without arguments.
    #[must_use]
    pub fn call(target: impl Into<String>) -> Self {
        Self::Call { target: target.into(), arguments: Vec::new() }
    }
}

/// A node of the structured-program tree.
///
/// A disabled element stays in the tree but doesn't execute; it is rendered
/// commented out together with its comment.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Getters,
    CopyGetters,
    MutGetters,
    Serialize,
    Deserialize,
)]
pub struct Element {
    /// What the element does.
    #[get = "pub"]
    #[get_mut = "pub"]
    pub(crate) kind: Kind,

    /// `true` if the element doesn't execute.
    #[get_copy = "pub"]
    pub(crate) disabled: bool,

    /// The explanatory comment.
    #[get = "pub"]
    pub(crate) comment: Option<String>,
}

impl Element {
    /// Creates an enabled element without comment.
    #[must_use]
    pub const fn new(kind: Kind) -> Self {
        Self { kind, disabled: false, comment: None }
    }

    /// Creates a disabled element explained by the given comment.
    #[must_use]
    pub fn new_disabled(kind: Kind, comment: impl Into<String>) -> Self {
        Self { kind, disabled: true, comment: Some(comment.into()) }
    }

    /// Enables or disables the element.
    pub fn set_disabled(&mut self, disabled: bool) { self.disabled = disabled; }

    /// Replaces the comment.
    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment;
    }

    /// Returns `true` if the element is an enabled jump.
    #[must_use]
    pub const fn is_live_terminator(&self) -> bool {
        !self.disabled && self.kind.is_terminator()
    }
}

//! Contains the [`Event`]s the statement translator sends while it walks the
//! syntax tree of a compilation unit.

use cobflow_element::LoopHeader;
use cobflow_record::FieldDeclaration;
use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};

/// What an `EXIT` statement leaves.
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
pub enum ExitKind {
    /// `EXIT PARAGRAPH`.
    #[strum(to_string = "leave paragraph")]
    LeaveParagraph,

    /// `EXIT SECTION`.
    #[strum(to_string = "leave section")]
    LeaveSection,

    /// `GOBACK`, `EXIT PROGRAM`.
    #[strum(to_string = "leave unit")]
    LeaveUnit,
}

/// One callback of the statement translator, in source order.
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
pub enum Event {
    /// A data description entry.
    DeclareField(FieldDeclaration),

    /// The data division is over.
    EndOfDeclarations,

    /// A `SECTION` header.
    EnterSection(String),

    /// A paragraph header.
    EnterParagraph(String),

    /// The end of the compilation unit.
    EndOfUnit,

    /// A primitive statement, already translated.
    Statement(String),

    /// `EXIT.` or `CONTINUE`.
    NoOp,

    /// `STOP RUN`.
    Stop,

    /// `PERFORM` or `CALL`.
    Call {
        /// The performed procedure or the called program.
        target: String,

        /// The `USING` arguments.
        #[serde(default)]
        arguments: Vec<String>,
    },

    /// A non-local exit.
    Exit(ExitKind),

    /// Opens an `IF`; the statements until [`Event::Otherwise`] form the
    /// then-branch.
    BeginAlternative(String),

    /// Switches the innermost `IF` to its else-branch.
    Otherwise,

    /// Opens an `EVALUATE` on the given subject.
    BeginSelection(String),

    /// Starts a `WHEN` branch of the innermost `EVALUATE`; no label or `OTHER`
    /// starts the default branch.
    When(Vec<String>),

    /// Opens a `PERFORM ... END-PERFORM` loop.
    BeginLoop(LoopHeader),

    /// Closes the innermost open block.
    End,
}

impl Event {
    /// Returns `true` for the events that belong to the procedure division.
    #[must_use]
    pub const fn is_procedural(&self) -> bool {
        !matches!(self, Self::DeclareField(_) | Self::EndOfDeclarations)
    }
}

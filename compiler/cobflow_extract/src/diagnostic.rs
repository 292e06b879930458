//! Diagnostics reported by the extraction pass.

use cobflow_diagnostic::{Diagnostic, Report, Severity};
use cobflow_procedure::{EscapeKind, Granularity};

/// A called procedure has no body; a disabled explanatory call was left in
/// its place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmptyProcedure {
    /// The name of the procedure.
    pub name: String,

    /// Whether it is a section or a paragraph.
    pub granularity: Granularity,
}

impl Report for EmptyProcedure {
    fn report(&self) -> Diagnostic {
        Diagnostic {
            severity: Severity::Warning,
            message: format!(
                "the {} `{}` is called but has no statements",
                self.granularity, self.name
            ),
            location: Some(self.name.clone()),
            help_message: Some(
                "the calls are kept disabled in the diagram".to_owned(),
            ),
        }
    }
}

/// A non-local exit can't be expressed with a structured call and return; it
/// was left disabled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnsupportedExit {
    /// What the exit leaves.
    pub kind: EscapeKind,

    /// The procedure the exit was written in, if any.
    pub procedure: Option<String>,

    /// Why the exit isn't supported.
    pub reason: String,
}

impl Report for UnsupportedExit {
    fn report(&self) -> Diagnostic {
        Diagnostic {
            severity: Severity::Warning,
            message: format!("unsupported `{}`: {}", self.kind, self.reason),
            location: self.procedure.clone(),
            help_message: None,
        }
    }
}

/// A procedure is called but never defined; its calls were left disabled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UndefinedProcedure {
    /// The called name.
    pub name: String,

    /// The number of calls.
    pub calls: usize,
}

impl Report for UndefinedProcedure {
    fn report(&self) -> Diagnostic {
        Diagnostic {
            severity: Severity::Warning,
            message: format!(
                "`{}` is called {} time(s) but no such procedure or program \
                 exists",
                self.name, self.calls
            ),
            location: None,
            help_message: None,
        }
    }
}

/// A declaration was appended to a module that is already sealed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SealedModule {
    /// The name of the module.
    pub module: String,

    /// The name of the refused declaration.
    pub declaration: String,
}

impl Report for SealedModule {
    fn report(&self) -> Diagnostic {
        Diagnostic {
            severity: Severity::Error,
            message: format!(
                "`{}` can't be added to the sealed module `{}`",
                self.declaration, self.module
            ),
            location: Some(self.module.clone()),
            help_message: Some(
                "modules are sealed once the unit creating them is translated"
                    .to_owned(),
            ),
        }
    }
}

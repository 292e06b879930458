//! Diagnostics reported while the events of a unit are consumed.

use cobflow_diagnostic::{Diagnostic, Report, Severity};

/// A block event doesn't fit the blocks that are open.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnbalancedBlock {
    /// An `Otherwise`, `When` or `End` without a matching open block; it was
    /// ignored.
    Unmatched {
        /// The compilation unit.
        unit: String,

        /// The name of the ignored event.
        event: String,
    },

    /// Blocks were still open at a procedure header or at the end of the
    /// unit; they were closed there.
    Unclosed {
        /// The compilation unit.
        unit: String,

        /// The number of blocks closed.
        blocks: usize,
    },
}

impl Report for UnbalancedBlock {
    fn report(&self) -> Diagnostic {
        match self {
            Self::Unmatched { unit, event } => Diagnostic {
                severity: Severity::Warning,
                message: format!("`{event}` doesn't match any open block"),
                location: Some(unit.clone()),
                help_message: Some("the event was ignored".to_owned()),
            },
            Self::Unclosed { unit, blocks } => Diagnostic {
                severity: Severity::Warning,
                message: format!("{blocks} block(s) were never closed"),
                location: Some(unit.clone()),
                help_message: Some(
                    "the blocks were closed at the next procedure header or at \
                     the end of the unit"
                        .to_owned(),
                ),
            },
        }
    }
}

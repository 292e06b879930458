//! Diagnostics reported while declaring and looking up fields.

use cobflow_diagnostic::{Diagnostic, Report, Severity};

use crate::picture::PictureError;

/// A declaration carried a level number outside the valid ordering; the
/// declaration was skipped.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InvalidLevelNumber {
    /// The offending level number.
    pub level: u8,

    /// The name of the declared field, if any.
    pub name: Option<String>,
}

impl Report for InvalidLevelNumber {
    fn report(&self) -> Diagnostic {
        Diagnostic {
            severity: Severity::Warning,
            message: format!(
                "`{}` is not a valid level number, the declaration of `{}` is \
                 skipped",
                self.level,
                self.name.as_deref().unwrap_or("FILLER")
            ),
            location: None,
            help_message: Some(
                "valid levels are 1 to 49, 66, 77, 78 and 88".to_owned(),
            ),
        }
    }
}

/// The picture string of a field couldn't be parsed; the field's type is left
/// unset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InvalidPicture {
    /// The field whose picture is invalid.
    pub field: String,

    /// The picture string as written.
    pub picture: String,

    /// What went wrong.
    pub error: PictureError,
}

impl Report for InvalidPicture {
    fn report(&self) -> Diagnostic {
        Diagnostic {
            severity: Severity::Warning,
            message: format!(
                "invalid picture `{}` for `{}`: {}",
                self.picture, self.field, self.error
            ),
            location: None,
            help_message: None,
        }
    }
}

/// The usage clause of a field names no known storage kind; the field falls
/// back to `DISPLAY`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnknownUsage {
    /// The field whose usage is unknown.
    pub field: String,

    /// The usage as written.
    pub usage: String,
}

impl Report for UnknownUsage {
    fn report(&self) -> Diagnostic {
        Diagnostic {
            severity: Severity::Warning,
            message: format!(
                "unknown usage `{}` for `{}`, `DISPLAY` is assumed",
                self.usage, self.field
            ),
            location: None,
            help_message: None,
        }
    }
}

/// A reference matched several fields; the earliest declared candidate was
/// chosen.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AmbiguousFieldReference {
    /// The reference as written.
    pub reference: String,

    /// The qualified name of the chosen field.
    pub chosen: String,

    /// The qualified names of every candidate.
    pub candidates: Vec<String>,
}

impl Report for AmbiguousFieldReference {
    fn report(&self) -> Diagnostic {
        Diagnostic {
            severity: Severity::Warning,
            message: format!(
                "the reference `{}` is ambiguous, `{}` was chosen",
                self.reference, self.chosen
            ),
            location: None,
            help_message: Some(format!(
                "candidates are: {}; qualify the reference with `OF`",
                self.candidates.join(", ")
            )),
        }
    }
}

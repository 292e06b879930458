//! Contains the definition of the [`Diagnostic`] struct, the [`Report`] trait
//! and the [`Handler`] that receives them.
//!
//! Nothing in the translator fails because of a questionable input: every
//! inconsistency is described by a small struct implementing [`Report`], sent
//! to the [`Handler`] and the translation carries on with a best-effort
//! result.

use std::{any::Any, fmt::Debug};

use colored::Colorize;

pub mod handler;

pub use handler::{Counter, Dummy, Handler, Storage};

/// Enumeration of the severity levels of a diagnostic.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum Severity {
    /// The result is known to be wrong.
    Error,

    /// The result was produced on a best-effort basis.
    Warning,

    /// Informational message.
    Info,
}

/// A message with a coloured severity header, printed to the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Message<T> {
    /// The severity of the message.
    pub severity: Severity,

    /// The content of the message.
    pub display: T,
}

impl<T> Message<T> {
    /// Creates a new [`Message`].
    pub const fn new(severity: Severity, display: T) -> Self {
        Self { severity, display }
    }
}

impl<T: std::fmt::Display> std::fmt::Display for Message<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header = match self.severity {
            Severity::Error => "[error]:".bright_red().bold(),
            Severity::Warning => "[warning]:".bright_yellow().bold(),
            Severity::Info => "[info]:".bright_green().bold(),
        };

        write!(f, "{header} {}", self.display.to_string().bold())
    }
}

/// A struct containing all the information required to display the diagnostic
/// to the user.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    derive_new::new,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Diagnostic {
    /// The severity of the diagnostic.
    pub severity: Severity,

    /// The message to display to the user.
    pub message: String,

    /// The compilation unit or procedure the diagnostic is about.
    pub location: Option<String>,

    /// The optional help message to display alongside the main message.
    pub help_message: Option<String>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Message::new(self.severity, &self.message))?;

        if let Some(location) = &self.location {
            write!(f, "\n  {} {location}", "-->".bright_cyan().bold())?;
        }

        if let Some(help_message) = &self.help_message {
            write!(f, "\n  {} {help_message}", "help:".bright_cyan().bold())?;
        }

        Ok(())
    }
}

/// Implement this trait for a type that can report a diagnostic.
///
/// The reason for having intermediate structs instead of emitting
/// [`Diagnostic`] directly is that tests can downcast and inspect exactly what
/// went wrong.
pub trait Report {
    /// Creates a diagnostic.
    fn report(&self) -> Diagnostic;
}

/// Implemented by all diagnostic objects sent to a [`Handler`].
pub trait Issue: Report + Debug + Any + Send + Sync + 'static {
    #[allow(missing_docs)]
    fn as_any(&self) -> &dyn Any;
}

impl<U: Report + Debug + Any + Send + Sync + 'static> Issue for U {
    fn as_any(&self) -> &dyn Any { self }
}

impl<U: Report + Debug + Any + Send + Sync + 'static> From<U> for Box<dyn Issue> {
    fn from(value: U) -> Self { Box::new(value) }
}

#[cfg(test)]
mod test;

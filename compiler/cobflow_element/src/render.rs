//! Renders units and modules as indented outlines.
//!
//! [`Outline`] is a self-contained copy of an element where the nested blocks
//! hold their elements directly instead of [`ID`]s into the tree. It is what
//! gets serialized and what the text rendering is written from.

use std::fmt::{self, Write};

use cobflow_arena::ID;
use serde::{Deserialize, Serialize};

use crate::{
    element::{Declaration, Kind, LoopHeader},
    module::Module,
    Sequence, Tree, Unit, UnitKind,
};

/// An element with its nested blocks inlined.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Outline {
    /// What the element does.
    pub kind: Kind<Vec<Outline>>,

    /// `true` if the element doesn't execute.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,

    /// The explanatory comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// A unit with its body inlined.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct UnitOutline {
    /// The name of the unit.
    pub name: String,

    /// The kind of the unit.
    pub kind: UnitKind,

    /// The included modules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,

    /// The explanatory comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// The top-level elements.
    pub body: Vec<Outline>,
}

impl Tree {
    /// Inlines the elements of the given sequence.
    #[must_use]
    pub fn outline(&self, sequence: ID<Sequence>) -> Vec<Outline> {
        self.sequence(sequence)
            .iter()
            .map(|id| {
                let element = self.element(*id);
                Outline {
                    kind: element.kind().clone().map(|block| self.outline(block)),
                    disabled: element.disabled(),
                    comment: element.comment().clone(),
                }
            })
            .collect()
    }

    /// Inlines the body of the given unit.
    #[must_use]
    pub fn unit_outline(&self, unit: ID<Unit>) -> UnitOutline {
        let unit = self.unit(unit);

        UnitOutline {
            name: unit.name().clone(),
            kind: unit.kind(),
            includes: unit.includes().clone(),
            comment: unit.comment().clone(),
            body: self.outline(unit.body()),
        }
    }
}

struct Printer<'a, 'b> {
    formatter: &'a mut fmt::Formatter<'b>,
    indent: usize,
}

impl Printer<'_, '_> {
    fn line(&mut self, disabled: bool, text: &str) -> fmt::Result {
        let prefix = if disabled { "// " } else { "" };
        writeln!(self.formatter, "{:width$}{prefix}{text}", "", width = self.indent * 2)
    }

    fn nested(
        &mut self,
        disabled: bool,
        elements: &[Outline],
    ) -> fmt::Result {
        self.indent += 1;
        for element in elements {
            self.element(element, disabled)?;
        }
        self.indent -= 1;

        Ok(())
    }

    fn element(&mut self, outline: &Outline, inherited: bool) -> fmt::Result {
        let disabled = inherited || outline.disabled;
        let suffix = outline
            .comment
            .as_ref()
            .map_or_else(String::new, |comment| format!("  -- {comment}"));

        match &outline.kind {
            Kind::Instruction(text) => self.line(disabled, &format!("{text}{suffix}")),
            Kind::NoOp => self.line(disabled, &format!("noop{suffix}")),
            Kind::Declaration(declaration) => {
                self.declaration(disabled, declaration, &suffix)
            }
            Kind::Alternative { condition, then, otherwise } => {
                self.line(disabled, &format!("if {condition} then{suffix}"))?;
                self.nested(disabled, then)?;
                if !otherwise.is_empty() {
                    self.line(disabled, "else")?;
                    self.nested(disabled, otherwise)?;
                }
                self.line(disabled, "end")
            }
            Kind::Selection { subject, branches, default } => {
                self.line(disabled, &format!("case {subject} of{suffix}"))?;
                self.indent += 1;
                for branch in branches {
                    self.line(disabled, &format!("when {}:", branch.labels.join(", ")))?;
                    self.nested(disabled, &branch.body)?;
                }
                if let Some(default) = default {
                    self.line(disabled, "other:")?;
                    self.nested(disabled, default)?;
                }
                self.indent -= 1;
                self.line(disabled, "end")
            }
            Kind::Loop { header, body } => {
                let (open, close) = match header {
                    LoopHeader::While(condition) => {
                        (format!("while {condition} do"), "end".to_owned())
                    }
                    LoopHeader::Until(condition) => {
                        ("repeat".to_owned(), format!("until {condition}"))
                    }
                    LoopHeader::Counted(header) => {
                        (format!("for {header} do"), "end".to_owned())
                    }
                    LoopHeader::Forever => ("loop".to_owned(), "end".to_owned()),
                };

                self.line(disabled, &format!("{open}{suffix}"))?;
                self.nested(disabled, body)?;
                self.line(disabled, &close)
            }
            Kind::Call { target, arguments } => {
                let arguments = if arguments.is_empty() {
                    String::new()
                } else {
                    format!("({})", arguments.join(", "))
                };
                self.line(disabled, &format!("call {target}{arguments}{suffix}"))
            }
            Kind::Jump(jump) => self.line(disabled, &format!("{jump}{suffix}")),
        }
    }

    fn declaration(
        &mut self,
        disabled: bool,
        declaration: &Declaration,
        suffix: &str,
    ) -> fmt::Result {
        let typed = |type_name: &Option<String>| {
            type_name.as_ref().map_or_else(String::new, |ty| format!(": {ty}"))
        };

        match declaration {
            Declaration::Variable(variable) => {
                let mut text = format!("var {}{}", variable.name, typed(&variable.type_name));
                if let Some(occurs) = variable.occurs {
                    write!(text, " [{occurs}]")?;
                }
                if let Some(initial) = &variable.initial {
                    write!(text, " := {initial}")?;
                }
                self.line(disabled, &format!("{text}{suffix}"))
            }
            Declaration::Constant(constant) => self.line(
                disabled,
                &format!(
                    "const {}{} = {}{suffix}",
                    constant.name,
                    typed(&constant.type_name),
                    constant.value
                ),
            ),
            Declaration::RecordType(record_type) => {
                self.line(disabled, &format!("type {} = record{suffix}", record_type.name))?;
                self.indent += 1;
                for component in &record_type.components {
                    let mut text = format!(
                        "{}{}",
                        component.name,
                        typed(&component.field_type.base.name())
                    );
                    if let Some(occurs) = component.field_type.occurs {
                        write!(text, " [{occurs}]")?;
                    }
                    self.line(disabled, &text)?;
                }
                self.indent -= 1;
                self.line(disabled, "end")
            }
        }
    }
}

impl fmt::Display for UnitOutline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut printer = Printer { formatter: f, indent: 0 };

        printer.line(false, &format!("{} {}", self.kind, self.name))?;
        if let Some(comment) = &self.comment {
            printer.line(false, &format!("  -- {comment}"))?;
        }

        printer.indent += 1;
        for include in &self.includes {
            printer.line(false, &format!("include {include}"))?;
        }
        printer.indent -= 1;

        printer.nested(false, &self.body)?;
        printer.line(false, "end")
    }
}

impl fmt::Display for Outline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Printer { formatter: f, indent: 0 }.element(self, false)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut printer = Printer { formatter: f, indent: 0 };

        printer.line(false, &format!("include {} ({})", self.name(), self.tier()))?;
        printer.indent += 1;
        for declaration in self.declarations() {
            printer.declaration(false, declaration, "")?;
        }
        printer.indent -= 1;

        printer.line(false, "end")
    }
}

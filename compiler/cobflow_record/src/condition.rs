//! Derives the boolean expressions of condition names (level 88).

use cobflow_arena::ID;
use itertools::Itertools;

use crate::{
    field::{Field, ValueEntry},
    SymbolTable,
};

/// Spells the figurative constant or literal the way the diagrams expect it:
/// quoted literals use double quotes, figurative constants are replaced by
/// their value.
#[must_use]
pub fn normalize_literal(literal: &str) -> String {
    let literal = literal.trim();

    match literal.to_ascii_uppercase().as_str() {
        "ZERO" | "ZEROS" | "ZEROES" => return "0".to_owned(),
        "SPACE" | "SPACES" => return "\" \"".to_owned(),
        "HIGH-VALUE" | "HIGH-VALUES" => return "'\\uffff'".to_owned(),
        "LOW-VALUE" | "LOW-VALUES" | "NULL" | "NULLS" => {
            return "'\\0'".to_owned()
        }
        "QUOTE" | "QUOTES" => return "'\"'".to_owned(),
        _ => {}
    }

    let mut chars = literal.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open @ ('\'' | '"')), Some(close)) if open == close => {
            let inner = &literal[1..literal.len() - 1];
            let doubled = format!("{open}{open}");
            format!("\"{}\"", inner.replace(&doubled, &open.to_string()).replace('"', "\\\""))
        }
        _ => literal.to_owned(),
    }
}

impl SymbolTable {
    /// Builds the boolean expression a condition name stands for, comparing the
    /// access path of its parent field against every stored literal.
    ///
    /// Returns [`None`] if the field isn't a condition name, has no parent or no
    /// literal.
    #[must_use]
    pub fn condition_expression(
        &self,
        id: ID<Field>,
        subscripts: &[&str],
    ) -> Option<String> {
        let field = &self[id];
        if !field.level().is_condition() || field.values().is_empty() {
            return None;
        }

        let subject = self.access_path(field.parent()?, subscripts);

        let alternatives = field
            .values()
            .iter()
            .map(|value| match value {
                ValueEntry::Single(literal) => {
                    format!("{subject} = {}", normalize_literal(literal))
                }
                ValueEntry::Thru(low, high) => format!(
                    "{subject} >= {} and {subject} <= {}",
                    normalize_literal(low),
                    normalize_literal(high)
                ),
            })
            .collect::<Vec<_>>();

        Some(if alternatives.len() == 1 {
            alternatives.into_iter().next().unwrap_or_default()
        } else {
            alternatives.iter().map(|alternative| format!("({alternative})")).join(" or ")
        })
    }
}

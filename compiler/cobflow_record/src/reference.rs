//! Contains the [`Reference`] to a field as it is written in the source.

use serde::{Deserialize, Serialize};

/// A possibly qualified and subscripted reference such as `X OF B IN A (I, 2)`.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
)]
pub struct Reference {
    /// The bare name of the referenced field.
    pub name: String,

    /// The qualifiers, innermost first.
    pub qualifiers: Vec<String>,

    /// The subscripts, outermost dimension first.
    pub subscripts: Vec<String>,
}

impl Reference {
    /// Parses a reference. Reference modifications (`X (1:3)`) are ignored.
    ///
    /// Returns [`None`] if the text is not a well-formed reference.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut names = String::new();
        let mut subscripts = Vec::new();
        let mut rest = text.trim();

        while let Some(open) = rest.find('(') {
            let close = open + rest[open..].find(')')?;
            names.push_str(&rest[..open]);
            names.push(' ');

            let inside = &rest[open + 1..close];
            if subscripts.is_empty() && !inside.contains(':') {
                subscripts = inside
                    .split([',', ' '])
                    .map(str::trim)
                    .filter(|subscript| !subscript.is_empty())
                    .map(str::to_owned)
                    .collect();
            }

            rest = &rest[close + 1..];
        }
        names.push_str(rest);

        let mut words = names.split_whitespace();
        let name = words.next()?.to_owned();
        let mut qualifiers = Vec::new();

        while let Some(connective) = words.next() {
            if !connective.eq_ignore_ascii_case("OF")
                && !connective.eq_ignore_ascii_case("IN")
            {
                return None;
            }

            qualifiers.push(words.next()?.to_owned());
        }

        Some(Self { name, qualifiers, subscripts })
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;

        for qualifier in &self.qualifiers {
            write!(f, " OF {qualifier}")?;
        }

        if !self.subscripts.is_empty() {
            write!(f, " ({})", self.subscripts.join(", "))?;
        }

        Ok(())
    }
}

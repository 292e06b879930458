//! Contains the [`Picture`] and [`Usage`] clauses of a field.

use std::str::FromStr;

use getset::{CopyGetters, Getters};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// The category a picture string belongs to.
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
)]
pub enum Category {
    /// Only `A` (and `B`) symbols.
    Alphabetic,

    /// Contains `X`, or mixes `A` and `9`.
    Alphanumeric,

    /// Alphanumeric with insertion symbols.
    AlphanumericEdited,

    /// Only `9`, `S`, `V` and `P` symbols.
    Numeric,

    /// Numeric with editing symbols.
    NumericEdited,

    /// Contains `N` or `U`.
    National,
}

/// An error that occurred while parsing a picture string.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, thiserror::Error,
)]
#[allow(missing_docs)]
pub enum PictureError {
    #[error("the picture string is empty")]
    Empty,

    #[error("the repetition after `{0}` is never closed")]
    UnclosedRepetition(char),

    #[error("`{0}` is not a valid repetition count")]
    InvalidRepetition(String),

    #[error("`{0}` is not a picture symbol")]
    UnknownSymbol(char),

    #[error("the picture describes more positions than can be counted")]
    TooLong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Symbol {
    Digit,
    Alphabetic,
    Alphanumeric,
    National,
    Sign,
    ImpliedDecimal,
    Scaling,
    DecimalPoint,
    Suppression,
    Insertion,
}

/// A parsed `PICTURE` clause.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Getters,
    CopyGetters,
    Serialize,
    Deserialize,
)]
pub struct Picture {
    /// The picture string as written.
    #[get = "pub"]
    source: String,

    /// The category of the picture.
    #[get_copy = "pub"]
    category: Category,

    /// The number of character positions the item occupies when displayed.
    #[get_copy = "pub"]
    length: usize,

    /// The number of digit positions, including the scaling positions.
    #[get_copy = "pub"]
    digits: usize,

    /// The number of digit positions after the decimal point.
    #[get_copy = "pub"]
    scale: usize,

    /// `true` if the picture carries an `S` symbol.
    #[get_copy = "pub"]
    signed: bool,
}

impl Picture {
    /// Parses the given picture string, expanding the repetition counts.
    ///
    /// # Errors
    ///
    /// See [`PictureError`] for the possible errors.
    pub fn parse(text: &str) -> Result<Self, PictureError> {
        let source = text.trim();
        let chars = source.to_ascii_uppercase().chars().collect::<Vec<_>>();

        if chars.is_empty() {
            return Err(PictureError::Empty);
        }

        let mut symbols = Vec::<(Symbol, usize)>::new();
        let mut index = 0;

        while index < chars.len() {
            let current = chars[index];
            let next = chars.get(index + 1).copied();

            if matches!((current, next), ('C', Some('R')) | ('D', Some('B'))) {
                symbols.push((Symbol::Insertion, 2));
                index += 2;
                continue;
            }

            let symbol = match current {
                '9' => Symbol::Digit,
                'A' => Symbol::Alphabetic,
                'X' => Symbol::Alphanumeric,
                'N' | 'U' => Symbol::National,
                'S' => Symbol::Sign,
                'V' => Symbol::ImpliedDecimal,
                'P' => Symbol::Scaling,
                '.' => Symbol::DecimalPoint,
                'Z' | '*' => Symbol::Suppression,
                '+' | '-' | '$' | ',' | 'B' | '0' | '/' => Symbol::Insertion,
                unknown => return Err(PictureError::UnknownSymbol(unknown)),
            };
            index += 1;

            let mut count = 1;
            if chars.get(index) == Some(&'(') {
                let close = chars[index..]
                    .iter()
                    .position(|c| *c == ')')
                    .map(|offset| index + offset)
                    .ok_or(PictureError::UnclosedRepetition(current))?;

                let repetition =
                    chars[index + 1..close].iter().collect::<String>();
                count = repetition
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .filter(|count| *count > 0)
                    .ok_or(PictureError::InvalidRepetition(repetition))?;

                index = close + 1;
            }

            symbols.push((symbol, count));
        }

        Self::from_symbols(source.to_owned(), &symbols)
    }

    fn from_symbols(
        source: String,
        symbols: &[(Symbol, usize)],
    ) -> Result<Self, PictureError> {
        let has = |kind: Symbol| symbols.iter().any(|(symbol, _)| *symbol == kind);
        let add = |total: usize, count: usize| {
            total.checked_add(count).ok_or(PictureError::TooLong)
        };

        let mut length = 0;
        let mut digits = 0;
        let mut scale = 0;
        let mut fraction = false;

        for (symbol, count) in symbols.iter().copied() {
            match symbol {
                Symbol::Digit | Symbol::Suppression => {
                    length = add(length, count)?;
                    digits = add(digits, count)?;
                    if fraction {
                        scale = add(scale, count)?;
                    }
                }
                Symbol::Scaling => digits = add(digits, count)?,
                Symbol::ImpliedDecimal => fraction = true,
                Symbol::DecimalPoint => {
                    length = add(length, count)?;
                    fraction = true;
                }
                Symbol::Alphabetic
                | Symbol::Alphanumeric
                | Symbol::National
                | Symbol::Insertion => length = add(length, count)?,
                Symbol::Sign => {}
            }
        }

        let edited = has(Symbol::Insertion)
            || has(Symbol::Suppression)
            || has(Symbol::DecimalPoint);

        let category = if has(Symbol::National) {
            Category::National
        } else if has(Symbol::Alphanumeric)
            || (has(Symbol::Alphabetic) && has(Symbol::Digit))
        {
            if edited {
                Category::AlphanumericEdited
            } else {
                Category::Alphanumeric
            }
        } else if has(Symbol::Alphabetic) {
            Category::Alphabetic
        } else if edited {
            Category::NumericEdited
        } else {
            Category::Numeric
        };

        Ok(Self {
            source,
            category,
            length,
            digits,
            scale,
            signed: has(Symbol::Sign),
        })
    }

    /// Returns `true` if the picture describes a number stored as digits.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self.category, Category::Numeric)
    }
}

impl std::fmt::Display for Picture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// The storage kind of a field (`USAGE` clause).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum_macros::EnumString,
    strum_macros::Display,
    strum_macros::EnumIter,
)]
#[strum(ascii_case_insensitive)]
#[allow(missing_docs)]
pub enum Usage {
    #[default]
    #[strum(to_string = "DISPLAY")]
    Display,

    #[strum(
        to_string = "BINARY",
        serialize = "COMP",
        serialize = "COMPUTATIONAL",
        serialize = "COMP-4",
        serialize = "COMPUTATIONAL-4"
    )]
    Binary,

    #[strum(
        to_string = "COMP-5",
        serialize = "COMPUTATIONAL-5",
        serialize = "COMP-X",
        serialize = "COMPUTATIONAL-X"
    )]
    NativeBinary,

    #[strum(
        to_string = "PACKED-DECIMAL",
        serialize = "COMP-3",
        serialize = "COMPUTATIONAL-3"
    )]
    PackedDecimal,

    #[strum(
        to_string = "COMP-1",
        serialize = "COMPUTATIONAL-1",
        serialize = "FLOAT-SHORT"
    )]
    Float,

    #[strum(
        to_string = "COMP-2",
        serialize = "COMPUTATIONAL-2",
        serialize = "FLOAT-LONG"
    )]
    Double,

    #[strum(to_string = "FLOAT-EXTENDED")]
    ExtendedFloat,

    #[strum(to_string = "INDEX")]
    Index,

    #[strum(
        to_string = "POINTER",
        serialize = "FUNCTION-POINTER",
        serialize = "PROCEDURE-POINTER",
        serialize = "PROGRAM-POINTER"
    )]
    Pointer,

    #[strum(to_string = "NATIONAL")]
    National,

    #[strum(to_string = "BINARY-CHAR", serialize = "BINARY-CHAR SIGNED")]
    BinaryChar,

    #[strum(to_string = "BINARY-CHAR UNSIGNED")]
    UnsignedBinaryChar,

    #[strum(to_string = "BINARY-SHORT", serialize = "BINARY-SHORT SIGNED")]
    BinaryShort,

    #[strum(to_string = "BINARY-SHORT UNSIGNED")]
    UnsignedBinaryShort,

    #[strum(to_string = "BINARY-LONG", serialize = "BINARY-LONG SIGNED")]
    BinaryLong,

    #[strum(to_string = "BINARY-LONG UNSIGNED")]
    UnsignedBinaryLong,

    #[strum(to_string = "BINARY-DOUBLE", serialize = "BINARY-DOUBLE SIGNED")]
    BinaryDouble,

    #[strum(to_string = "BINARY-DOUBLE UNSIGNED")]
    UnsignedBinaryDouble,
}

impl Usage {
    /// Parses the text of a `USAGE` clause, tolerating the optional `USAGE IS`
    /// prefix and irregular spacing.
    ///
    /// # Errors
    ///
    /// Returns [`strum::ParseError`] if the text doesn't name a known usage.
    pub fn parse(text: &str) -> Result<Self, strum::ParseError> {
        let normalized = text
            .split_whitespace()
            .skip_while(|word| {
                word.eq_ignore_ascii_case("USAGE") || word.eq_ignore_ascii_case("IS")
            })
            .join(" ");

        Self::from_str(&normalized)
    }
}

//! Contains the definition of [`Field`], its [`Level`] and the declaration
//! payloads it is created from.

use cobflow_arena::ID;
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::picture::{Picture, Usage};

/// The level number isn't one of 1 to 49, 66, 77, 78 or 88.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    thiserror::Error,
)]
#[error("`{0}` is not a valid level number")]
pub struct InvalidLevel(pub u8);

/// A validated level number.
///
/// The ordering of the numbers encodes both the depth of a field in its record
/// and the special kinds of fields (aliases, standalone items, constants and
/// condition names).
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
#[serde(try_from = "u8", into = "u8")]
pub struct Level(u8);

impl Level {
    /// Level `01`, the root of a record.
    pub const RECORD: Self = Self(1);

    /// Level `66`, an alias of other fields of the record.
    pub const RENAMES: Self = Self(66);

    /// Level `77`, a standalone elementary item.
    pub const STANDALONE: Self = Self(77);

    /// Level `78`, a named constant.
    pub const CONSTANT: Self = Self(78);

    /// Level `88`, a condition name attached to its preceding field.
    pub const CONDITION: Self = Self(88);

    /// Validates the given level number.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidLevel`] if the number isn't one of 1 to 49, 66, 77, 78
    /// or 88.
    pub const fn new(number: u8) -> Result<Self, InvalidLevel> {
        match number {
            1..=49 | 66 | 77 | 78 | 88 => Ok(Self(number)),
            _ => Err(InvalidLevel(number)),
        }
    }

    /// Returns the level number.
    #[must_use]
    pub const fn number(self) -> u8 { self.0 }

    /// Returns `true` for the levels that always start a new top-level entry
    /// (1, 77 and 78).
    #[must_use]
    pub const fn is_top_level(self) -> bool { matches!(self.0, 1 | 77 | 78) }

    /// Returns `true` for the levels 2 to 49.
    #[must_use]
    pub const fn is_nested(self) -> bool { matches!(self.0, 2..=49) }

    /// Returns `true` for level 88.
    #[must_use]
    pub const fn is_condition(self) -> bool { self.0 == 88 }

    /// Returns `true` for level 66.
    #[must_use]
    pub const fn is_renames(self) -> bool { self.0 == 66 }

    /// Returns `true` for level 78.
    #[must_use]
    pub const fn is_constant(self) -> bool { self.0 == 78 }

    /// Returns the level directly above this one, if this is a nested level.
    #[must_use]
    pub const fn enclosing(self) -> Option<Self> {
        if self.is_nested() {
            Some(Self(self.0 - 1))
        } else {
            None
        }
    }
}

impl TryFrom<u8> for Level {
    type Error = InvalidLevel;

    fn try_from(value: u8) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Level> for u8 {
    fn from(value: Level) -> Self { value.0 }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// The visibility tier of a record.
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
)]
pub enum Visibility {
    /// Only the declaring unit (and the units extracted from it) sees it.
    #[default]
    Local,

    /// Declared `GLOBAL`, visible to the nested programs.
    Global,

    /// Declared `EXTERNAL`, shared by every unit declaring it.
    External,
}

/// The `OCCURS` clause of a field.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Occurs {
    /// The number of elements.
    pub count: usize,

    /// The `INDEXED BY` aliases.
    #[serde(default)]
    pub indices: Vec<String>,
}

/// One literal of a `VALUE` clause.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ValueEntry {
    /// A single literal.
    Single(String),

    /// A `low THRU high` range.
    Thru(String, String),
}

/// The declaration of a field as it arrives from the statement translator.
///
/// Everything is still textual here: the level hasn't been validated, the
/// picture and the usage haven't been parsed and the redefined field hasn't
/// been looked up.
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
    TypedBuilder,
)]
pub struct FieldDeclaration {
    /// The raw level number.
    pub level: u8,

    /// The name, [`None`] for `FILLER` items.
    #[serde(default)]
    #[builder(default, setter(into, strip_option))]
    pub name: Option<String>,

    /// The text of the `PICTURE` clause.
    #[serde(default)]
    #[builder(default, setter(into, strip_option))]
    pub picture: Option<String>,

    /// The text of the `USAGE` clause.
    #[serde(default)]
    #[builder(default, setter(into, strip_option))]
    pub usage: Option<String>,

    /// The literals of the `VALUE` clause.
    #[serde(default)]
    #[builder(default)]
    pub values: Vec<ValueEntry>,

    /// The reference of the `REDEFINES` (or `RENAMES`) clause.
    #[serde(default)]
    #[builder(default, setter(into, strip_option))]
    pub redefines: Option<String>,

    /// The visibility of the record.
    #[serde(default)]
    #[builder(default)]
    pub visibility: Visibility,

    /// The `OCCURS` clause.
    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub occurs: Option<Occurs>,
}

/// A validated field ready to be inserted into the symbol table.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct NewField {
    /// The level of the field.
    pub level: Level,

    /// The name, [`None`] for `FILLER` items.
    #[builder(default, setter(into, strip_option))]
    pub name: Option<String>,

    /// The parsed picture.
    #[builder(default, setter(strip_option))]
    pub picture: Option<Picture>,

    /// The storage kind.
    #[builder(default)]
    pub usage: Usage,

    /// The literals of the `VALUE` clause.
    #[builder(default)]
    pub values: Vec<ValueEntry>,

    /// The field this one redefines or renames.
    #[builder(default, setter(strip_option))]
    pub redefines: Option<ID<Field>>,

    /// The visibility, only meaningful for top-level fields.
    #[builder(default)]
    pub visibility: Visibility,

    /// The `OCCURS` clause.
    #[builder(default, setter(strip_option))]
    pub occurs: Option<Occurs>,
}

/// One declared data item, a node of the record tree.
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct Field {
    /// The level of the field.
    #[get_copy = "pub"]
    pub(crate) level: Level,

    /// The declared name, or the generated one for anonymous fields.
    #[get = "pub"]
    pub(crate) name: String,

    /// `true` if the field was declared without a name.
    #[get_copy = "pub"]
    pub(crate) anonymous: bool,

    /// `true` if the field was created to keep the level steps consistent.
    #[get_copy = "pub"]
    pub(crate) synthesized: bool,

    /// The parsed picture.
    #[get = "pub"]
    pub(crate) picture: Option<Picture>,

    /// The storage kind.
    #[get_copy = "pub"]
    pub(crate) usage: Usage,

    /// The `OCCURS` clause.
    #[get = "pub"]
    pub(crate) occurs: Option<Occurs>,

    /// The visibility, inherited from the record for nested fields.
    #[get_copy = "pub"]
    pub(crate) visibility: Visibility,

    /// The literals of the `VALUE` clause.
    #[get = "pub"]
    pub(crate) values: Vec<ValueEntry>,

    /// The field this one redefines. Informational only, never traversed.
    #[get_copy = "pub"]
    pub(crate) redefines: Option<ID<Field>>,

    /// The enclosing field.
    #[get_copy = "pub"]
    pub(crate) parent: Option<ID<Field>>,

    /// The next field sharing the same parent.
    #[get_copy = "pub"]
    pub(crate) next_sibling: Option<ID<Field>>,

    /// The first nested field.
    #[get_copy = "pub"]
    pub(crate) first_child: Option<ID<Field>>,
}

impl Field {
    /// Returns the number of elements if the field is an array.
    #[must_use]
    pub fn occurrence_count(&self) -> Option<usize> {
        self.occurs.as_ref().map(|occurs| occurs.count)
    }

    /// Returns `true` if the field is an array.
    #[must_use]
    pub const fn is_array(&self) -> bool { self.occurs.is_some() }
}

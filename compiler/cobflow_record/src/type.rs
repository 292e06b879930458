//! Contains the primitive types derived from fields and the synthesised record
//! types of group fields.

use cobflow_arena::ID;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    field::Field,
    picture::{Category, Usage},
    SymbolTable,
};

/// The width of a binary integer.
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
#[allow(missing_docs)]
pub enum Width {
    Byte,
    Short,
    Int,
    Long,
}

impl Width {
    /// Returns the width needed to store the given number of decimal digits.
    #[must_use]
    pub const fn for_digits(digits: usize) -> Self {
        match digits {
            0..=4 => Self::Short,
            5..=9 => Self::Int,
            _ => Self::Long,
        }
    }

    /// Returns the rendered type name of the width.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
        }
    }
}

/// The precision of a floating point number.
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
#[allow(missing_docs)]
pub enum Precision {
    Single,
    Double,
    Extended,
}

/// The fixed set of primitive categories a scalar field maps to.
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
pub enum Primitive {
    /// Character data.
    Text {
        /// The number of characters.
        length: usize,

        /// `true` for national (wide) characters.
        national: bool,
    },

    /// A fixed-length decimal numeral.
    Numeral {
        /// The number of digits.
        digits: usize,

        /// The number of digits after the decimal point.
        scale: usize,

        /// `true` if the numeral carries a sign.
        signed: bool,
    },

    /// A binary integer.
    Binary {
        /// The storage width.
        width: Width,

        /// `true` if the integer is signed.
        signed: bool,
    },

    /// A floating point number.
    Float(Precision),

    /// A data, procedure or function pointer.
    Pointer,

    /// An index or a length.
    Index,

    /// Nothing is known about the storage.
    Unset,
}

impl Primitive {
    /// Returns the rendered type name, [`None`] for [`Primitive::Unset`].
    #[must_use]
    pub fn name(&self) -> Option<String> {
        let unsigned = |signed: bool, name: &str| {
            if signed {
                name.to_owned()
            } else {
                format!("unsigned {name}")
            }
        };

        match *self {
            Self::Text { length: 1, .. } => Some("char".to_owned()),
            Self::Text { .. } => Some("string".to_owned()),
            Self::Numeral { scale, .. } if scale > 0 => Some("double".to_owned()),
            Self::Numeral { digits, signed, .. } => {
                Some(unsigned(signed, Width::for_digits(digits).name()))
            }
            Self::Binary { width, signed } => Some(unsigned(signed, width.name())),
            Self::Float(Precision::Single) => Some("float".to_owned()),
            Self::Float(Precision::Double) => Some("double".to_owned()),
            Self::Float(Precision::Extended) => Some("long double".to_owned()),
            Self::Pointer => Some("pointer".to_owned()),
            Self::Index => Some("int".to_owned()),
            Self::Unset => None,
        }
    }
}

/// The base type of a field, either a primitive or a synthesised record type.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Type {
    /// The field is a scalar.
    Primitive(Primitive),

    /// The field is a group; holds the name of its record type.
    Record(String),
}

impl Type {
    /// Returns the rendered type name, [`None`] when the type is unset.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        match self {
            Self::Primitive(primitive) => primitive.name(),
            Self::Record(name) => Some(name.clone()),
        }
    }
}

/// The type of a field: the element type plus the occurrence count of an
/// array, which is never folded into the type name.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FieldType {
    /// The element type.
    pub base: Type,

    /// The number of elements if the field is an array.
    pub occurs: Option<usize>,
}

/// One component of a [`RecordType`].
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Component {
    /// The name of the component field.
    pub name: String,

    /// The type of the component.
    pub field_type: FieldType,
}

/// A structured type synthesised from a group field.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RecordType {
    /// The deterministic name of the type.
    pub name: String,

    /// The components, in declaration order.
    pub components: Vec<Component>,
}

impl SymbolTable {
    /// Returns `true` if the field has nested data fields (condition names and
    /// aliases don't count).
    #[must_use]
    pub fn is_group(&self, id: ID<Field>) -> bool {
        self.data_children(id).next().is_some()
    }

    /// Derives the type of the field. Condition names have no type.
    #[must_use]
    pub fn type_of(&self, id: ID<Field>) -> Option<FieldType> {
        let field = &self[id];

        if field.level().is_condition() {
            return None;
        }

        let base = if field.level().is_renames() {
            field.redefines().and_then(|target| self.type_of(target)).map_or(
                Type::Primitive(Primitive::Unset),
                |target| target.base,
            )
        } else if self.is_group(id) {
            Type::Record(self.record_type_name(id))
        } else {
            Type::Primitive(self.primitive_of(field))
        };

        Some(FieldType { base, occurs: field.occurrence_count() })
    }

    /// Returns the deterministic name of the record type synthesised from the
    /// given group field, derived from its path in the record.
    #[must_use]
    pub fn record_type_name(&self, id: ID<Field>) -> String {
        let path = self
            .path(id)
            .into_iter()
            .map(|segment| self[segment].name().replace('-', "_"))
            .join("_");

        format!("T_{}", path.to_ascii_uppercase())
    }

    /// Synthesises the record type of a group field, [`None`] for scalars.
    #[must_use]
    pub fn record_type(&self, id: ID<Field>) -> Option<RecordType> {
        if !self.is_group(id) {
            return None;
        }

        let components = self
            .data_children(id)
            .filter_map(|child| {
                self.type_of(child).map(|field_type| Component {
                    name: self[child].name().clone(),
                    field_type,
                })
            })
            .collect();

        Some(RecordType { name: self.record_type_name(id), components })
    }

    /// Returns the record types needed to declare the given field, the
    /// innermost first and the field's own type last.
    #[must_use]
    pub fn nested_record_types(&self, id: ID<Field>) -> Vec<RecordType> {
        let mut types = Vec::new();
        self.collect_record_types(id, &mut types);
        types
    }

    fn collect_record_types(&self, id: ID<Field>, types: &mut Vec<RecordType>) {
        for child in self.data_children(id) {
            self.collect_record_types(child, types);
        }

        if let Some(record_type) = self.record_type(id) {
            types.push(record_type);
        }
    }

    fn data_children(
        &self,
        id: ID<Field>,
    ) -> impl Iterator<Item = ID<Field>> + '_ {
        self.children(id).filter(|child| {
            let level = self[*child].level();
            !level.is_condition() && !level.is_renames()
        })
    }

    fn primitive_of(&self, field: &Field) -> Primitive {
        let picture = field.picture().as_ref();

        let numeral = || {
            picture.map_or(Primitive::Unset, |picture| Primitive::Numeral {
                digits: picture.digits(),
                scale: picture.scale(),
                signed: picture.signed(),
            })
        };

        match field.usage() {
            Usage::Display => match picture {
                None if field.level().is_constant() => {
                    literal_type(field.values().first())
                }
                None => Primitive::Unset,
                Some(picture) => match picture.category() {
                    Category::Numeric => numeral(),
                    category => Primitive::Text {
                        length: picture.length(),
                        national: category == Category::National,
                    },
                },
            },
            Usage::National => Primitive::Text {
                length: picture.map_or(1, |picture| picture.length()),
                national: true,
            },
            Usage::Binary | Usage::NativeBinary => match picture {
                Some(picture) if picture.scale() > 0 => numeral(),
                Some(picture) => Primitive::Binary {
                    width: Width::for_digits(picture.digits()),
                    signed: picture.signed(),
                },
                None => Primitive::Unset,
            },
            Usage::PackedDecimal => numeral(),
            Usage::Float => Primitive::Float(Precision::Single),
            Usage::Double => Primitive::Float(Precision::Double),
            Usage::ExtendedFloat => Primitive::Float(Precision::Extended),
            Usage::Index => Primitive::Index,
            Usage::Pointer => Primitive::Pointer,
            Usage::BinaryChar => Primitive::Binary { width: Width::Byte, signed: true },
            Usage::UnsignedBinaryChar => {
                Primitive::Binary { width: Width::Byte, signed: false }
            }
            Usage::BinaryShort => Primitive::Binary { width: Width::Short, signed: true },
            Usage::UnsignedBinaryShort => {
                Primitive::Binary { width: Width::Short, signed: false }
            }
            Usage::BinaryLong => Primitive::Binary { width: Width::Int, signed: true },
            Usage::UnsignedBinaryLong => {
                Primitive::Binary { width: Width::Int, signed: false }
            }
            Usage::BinaryDouble => Primitive::Binary { width: Width::Long, signed: true },
            Usage::UnsignedBinaryDouble => {
                Primitive::Binary { width: Width::Long, signed: false }
            }
        }
    }
}

/// Derives the type of a constant from its literal.
fn literal_type(value: Option<&crate::field::ValueEntry>) -> Primitive {
    let Some(crate::field::ValueEntry::Single(literal)) = value else {
        return Primitive::Unset;
    };
    let literal = literal.trim();

    if let Some(quote) = literal.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let inner = literal.trim_start_matches(quote).trim_end_matches(quote);
        return Primitive::Text { length: inner.chars().count(), national: false };
    }

    let unsigned = literal.trim_start_matches(['+', '-']);
    if unsigned.is_empty()
        || !unsigned.chars().all(|c| c.is_ascii_digit() || c == '.')
        || unsigned.chars().filter(|c| *c == '.').count() > 1
    {
        return Primitive::Unset;
    }

    let scale = unsigned.split_once('.').map_or(0, |(_, fraction)| fraction.len());
    Primitive::Numeral {
        digits: unsigned.chars().filter(char::is_ascii_digit).count(),
        scale,
        signed: literal.starts_with('-'),
    }
}

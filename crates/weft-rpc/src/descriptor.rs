//! Type descriptors for parameters and return values.
//!
//! A [`TypeDescriptor`] tells the codec what shape to expect on the wire. The
//! registry validates every descriptor when a binding is registered, so the
//! dispatcher only ever sees legal shapes:
//!
//! - optional-of is legal for parameters and record fields, never as a
//!   return value;
//! - result-of is legal only as a return value;
//! - containers wrap a non-container type (unit is allowed inside result-of);
//! - enums are non-empty with unique variant names and records have unique
//!   field names.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

/// Shape of a value crossing the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    /// No value; encodes as null. Return position only.
    Unit,
    /// UTF-8 text.
    String,
    /// Boolean.
    Bool,
    /// Signed 8-bit integer.
    Byte,
    /// Signed 16-bit integer.
    Short,
    /// Signed 32-bit integer.
    Int,
    /// Signed 64-bit integer.
    Long,
    /// Single-precision float.
    Float,
    /// Double-precision float.
    Double,
    /// Single character.
    Char,
    /// Closed set of named variants.
    Enum(EnumDescriptor),
    /// Calendar date.
    Date,
    /// Wall-clock time.
    Time,
    /// Date and time without offset.
    DateTime,
    /// Date and time with offset.
    OffsetDateTime,
    /// Exact decimal.
    Decimal,
    /// User-defined record with named fields.
    Record(RecordDescriptor),
    /// Value that may be absent.
    Optional(Box<TypeDescriptor>),
    /// Ordered homogeneous list.
    Sequence(Box<TypeDescriptor>),
    /// Success value or propagated error.
    Result(Box<TypeDescriptor>),
}

/// Closed enum declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    name: String,
    variants: Vec<String>,
}

impl EnumDescriptor {
    /// Enum name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared variant names in order.
    #[must_use]
    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    /// Returns `true` if `variant` is declared.
    #[must_use]
    pub fn contains(&self, variant: &str) -> bool {
        self.variants.iter().any(|declared| declared == variant)
    }
}

/// Record declaration with ordered fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDescriptor {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl RecordDescriptor {
    /// Record name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields in order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }
}

/// Named record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    descriptor: TypeDescriptor,
}

impl FieldDescriptor {
    /// Declares a field.
    pub fn new(name: impl Into<String>, descriptor: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            descriptor,
        }
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field type.
    #[must_use]
    pub const fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Returns `true` unless the field is optional-of.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        !matches!(self.descriptor, TypeDescriptor::Optional(_))
    }
}

/// Illegal descriptor shapes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// Optional-of used as a return value.
    #[error("optional-of is not allowed as a return type")]
    OptionalReturn,
    /// Result-of used outside return position.
    #[error("result-of is only allowed as a return type")]
    MisplacedResult,
    /// Unit used outside return position.
    #[error("unit is only allowed as a return type")]
    MisplacedUnit,
    /// A container wraps another container.
    #[error("{outer} cannot contain {inner}")]
    NestedContainer {
        /// Outer container kind.
        outer: &'static str,
        /// Inner descriptor.
        inner: String,
    },
    /// Enum without variants.
    #[error("enum {name} declares no variants")]
    EmptyEnum {
        /// Enum name.
        name: String,
    },
    /// Enum variant declared twice.
    #[error("enum {name} declares variant '{variant}' twice")]
    DuplicateVariant {
        /// Enum name.
        name: String,
        /// Repeated variant.
        variant: String,
    },
    /// Record field declared twice.
    #[error("record {name} declares field '{field}' twice")]
    DuplicateField {
        /// Record name.
        name: String,
        /// Repeated field.
        field: String,
    },
    /// A record field is illegal.
    #[error("record {name} field '{field}': {source}")]
    Field {
        /// Record name.
        name: String,
        /// Field name.
        field: String,
        /// Underlying problem.
        #[source]
        source: Box<DescriptorError>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Position {
    Parameter,
    Return,
    Field,
    Contained,
}

impl TypeDescriptor {
    /// Optional-of `inner`.
    #[must_use]
    pub fn optional(inner: Self) -> Self {
        Self::Optional(Box::new(inner))
    }

    /// Sequence-of `inner`.
    #[must_use]
    pub fn sequence(inner: Self) -> Self {
        Self::Sequence(Box::new(inner))
    }

    /// Result-of `inner`.
    #[must_use]
    pub fn result(inner: Self) -> Self {
        Self::Result(Box::new(inner))
    }

    /// Enum with the given variant names.
    pub fn enumeration<I, S>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum(EnumDescriptor {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        })
    }

    /// Record with the given fields.
    pub fn record(name: impl Into<String>, fields: impl IntoIterator<Item = FieldDescriptor>) -> Self {
        Self::Record(RecordDescriptor {
            name: name.into(),
            fields: fields.into_iter().collect(),
        })
    }

    /// Returns `true` for optional-of, sequence-of and result-of.
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self, Self::Optional(_) | Self::Sequence(_) | Self::Result(_))
    }

    /// Checks that the descriptor may describe a parameter.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] describing the first illegal shape.
    pub fn validate_parameter(&self) -> Result<(), DescriptorError> {
        self.validate(Position::Parameter)
    }

    /// Checks that the descriptor may describe a return value.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] describing the first illegal shape.
    pub fn validate_return(&self) -> Result<(), DescriptorError> {
        self.validate(Position::Return)
    }

    fn validate(&self, position: Position) -> Result<(), DescriptorError> {
        match self {
            Self::Unit => match position {
                Position::Return | Position::Contained => Ok(()),
                Position::Parameter | Position::Field => Err(DescriptorError::MisplacedUnit),
            },
            Self::Optional(inner) => {
                if position == Position::Return {
                    return Err(DescriptorError::OptionalReturn);
                }
                inner.validate_contained("optional-of", false)
            }
            Self::Sequence(inner) => inner.validate_contained("sequence-of", false),
            Self::Result(inner) => {
                if position != Position::Return {
                    return Err(DescriptorError::MisplacedResult);
                }
                inner.validate_contained("result-of", true)
            }
            Self::Enum(descriptor) => descriptor.validate(),
            Self::Record(descriptor) => descriptor.validate(),
            _ => Ok(()),
        }
    }

    fn validate_contained(&self, outer: &'static str, allow_unit: bool) -> Result<(), DescriptorError> {
        if self.is_container() || (*self == Self::Unit && !allow_unit) {
            return Err(DescriptorError::NestedContainer {
                outer,
                inner: self.to_string(),
            });
        }
        self.validate(Position::Contained)
    }
}

impl EnumDescriptor {
    fn validate(&self) -> Result<(), DescriptorError> {
        if self.variants.is_empty() {
            return Err(DescriptorError::EmptyEnum {
                name: self.name.clone(),
            });
        }
        let mut seen = BTreeSet::new();
        for variant in &self.variants {
            if !seen.insert(variant.as_str()) {
                return Err(DescriptorError::DuplicateVariant {
                    name: self.name.clone(),
                    variant: variant.clone(),
                });
            }
        }
        Ok(())
    }
}

impl RecordDescriptor {
    fn validate(&self) -> Result<(), DescriptorError> {
        let mut seen = BTreeSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(DescriptorError::DuplicateField {
                    name: self.name.clone(),
                    field: field.name.clone(),
                });
            }
            field
                .descriptor
                .validate(Position::Field)
                .map_err(|source| DescriptorError::Field {
                    name: self.name.clone(),
                    field: field.name.clone(),
                    source: Box::new(source),
                })?;
        }
        Ok(())
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("unit"),
            Self::String => f.write_str("string"),
            Self::Bool => f.write_str("bool"),
            Self::Byte => f.write_str("byte"),
            Self::Short => f.write_str("short"),
            Self::Int => f.write_str("int"),
            Self::Long => f.write_str("long"),
            Self::Float => f.write_str("float"),
            Self::Double => f.write_str("double"),
            Self::Char => f.write_str("char"),
            Self::Enum(descriptor) => write!(f, "enum {}", descriptor.name),
            Self::Date => f.write_str("date"),
            Self::Time => f.write_str("time"),
            Self::DateTime => f.write_str("date-time"),
            Self::OffsetDateTime => f.write_str("offset date-time"),
            Self::Decimal => f.write_str("decimal"),
            Self::Record(descriptor) => write!(f, "record {}", descriptor.name),
            Self::Optional(inner) => write!(f, "optional-of<{inner}>"),
            Self::Sequence(inner) => write!(f, "sequence-of<{inner}>"),
            Self::Result(inner) => write!(f, "result-of<{inner}>"),
        }
    }
}

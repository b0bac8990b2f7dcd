//! In-memory values exchanged between the codec and service methods.
//!
//! The codec decodes wire arguments into [`Value`]s guided by a
//! [`TypeDescriptor`](crate::TypeDescriptor); service methods convert them into
//! Rust types through [`FromValue`] and hand results back through
//! [`IntoValue`].

use std::collections::BTreeMap;

use thiserror::Error;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use weft_wire::WireFailure;

use crate::decimal::Decimal;

/// A decoded argument or result.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent optional or unit result.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Any member of the integer family.
    Integer(i64),
    /// Any member of the float family.
    Float(f64),
    /// Single character.
    Char(char),
    /// Text.
    String(String),
    /// Enum variant name.
    Enum(String),
    /// Calendar date.
    Date(Date),
    /// Wall-clock time.
    Time(Time),
    /// Date and time without an offset.
    DateTime(PrimitiveDateTime),
    /// Date and time with a UTC offset.
    OffsetDateTime(OffsetDateTime),
    /// Exact decimal.
    Decimal(Decimal),
    /// Record fields keyed by name.
    Record(BTreeMap<String, Value>),
    /// Ordered homogeneous elements.
    Sequence(Vec<Value>),
    /// Success value or tagged failure of a result-of return.
    Result(Result<Box<Value>, WireFailure>),
}

impl Value {
    /// Short name of the variant, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Char(_) => "char",
            Self::String(_) => "string",
            Self::Enum(_) => "enum",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::DateTime(_) => "date-time",
            Self::OffsetDateTime(_) => "offset date-time",
            Self::Decimal(_) => "decimal",
            Self::Record(_) => "record",
            Self::Sequence(_) => "sequence",
            Self::Result(_) => "result",
        }
    }

    /// Builds a record value from `(field, value)` pairs.
    pub fn record<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::Record(
            fields
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }

    /// Builds an enum value from a variant name.
    pub fn variant(name: impl Into<String>) -> Self {
        Self::Enum(name.into())
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Consumes an enum value and returns its variant name.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::Unexpected`] when the value is not an enum.
    pub fn into_variant(self) -> Result<String, ValueError> {
        match self {
            Self::Enum(name) => Ok(name),
            other => Err(ValueError::unexpected("enum", &other)),
        }
    }

    /// Consumes a record value and returns its fields.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::Unexpected`] when the value is not a record.
    pub fn into_record(self) -> Result<RecordFields, ValueError> {
        match self {
            Self::Record(fields) => Ok(RecordFields(fields)),
            other => Err(ValueError::unexpected("record", &other)),
        }
    }
}

/// Owned record fields with typed extraction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFields(BTreeMap<String, Value>);

impl RecordFields {
    /// Removes a field and converts it.
    ///
    /// A missing field is treated as [`Value::Null`], so optional fields may
    /// be extracted as `Option<T>`.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::Field`] wrapping the conversion failure.
    pub fn take<T: FromValue>(&mut self, name: &str) -> Result<T, ValueError> {
        let value = self.0.remove(name).unwrap_or(Value::Null);
        T::from_value(value).map_err(|source| ValueError::Field {
            name: name.to_owned(),
            source: Box::new(source),
        })
    }

    /// Borrows a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

/// Failures converting a [`Value`] into a Rust type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The value has a different shape.
    #[error("expected {expected}, found {found}")]
    Unexpected {
        /// Shape the conversion needed.
        expected: &'static str,
        /// Shape that was present.
        found: &'static str,
    },
    /// An integer does not fit the target width.
    #[error("integer {value} does not fit in {target}")]
    OutOfRange {
        /// Offending integer.
        value: i64,
        /// Target type name.
        target: &'static str,
    },
    /// An enum name is not a variant of the target enum.
    #[error("'{variant}' is not a variant of {target}")]
    UnknownVariant {
        /// Offending variant name.
        variant: String,
        /// Target enum name.
        target: &'static str,
    },
    /// A record field failed to convert.
    #[error("field '{name}': {source}")]
    Field {
        /// Field name.
        name: String,
        /// Underlying failure.
        #[source]
        source: Box<ValueError>,
    },
}

impl ValueError {
    /// Creates a shape mismatch error.
    #[must_use]
    pub fn unexpected(expected: &'static str, found: &Value) -> Self {
        Self::Unexpected {
            expected,
            found: found.kind(),
        }
    }

    /// Creates an unknown variant error.
    pub fn unknown_variant(variant: impl Into<String>, target: &'static str) -> Self {
        Self::UnknownVariant {
            variant: variant.into(),
            target,
        }
    }
}

/// Conversion into a [`Value`].
pub trait IntoValue {
    /// Performs the conversion.
    fn into_value(self) -> Value;
}

/// Fallible conversion out of a [`Value`].
pub trait FromValue: Sized {
    /// Performs the conversion.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError`] when the value has the wrong shape or range.
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        Ok(value)
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Null
    }
}

impl FromValue for () {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(()),
            other => Err(ValueError::unexpected("null", &other)),
        }
    }
}

macro_rules! simple_value {
    ($ty:ty, $variant:ident, $label:literal) => {
        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }

        impl FromValue for $ty {
            fn from_value(value: Value) -> Result<Self, ValueError> {
                match value {
                    Value::$variant(inner) => Ok(inner),
                    other => Err(ValueError::unexpected($label, &other)),
                }
            }
        }
    };
}

simple_value!(bool, Bool, "bool");
simple_value!(i64, Integer, "integer");
simple_value!(f64, Float, "float");
simple_value!(char, Char, "char");
simple_value!(String, String, "string");
simple_value!(Date, Date, "date");
simple_value!(Time, Time, "time");
simple_value!(PrimitiveDateTime, DateTime, "date-time");
simple_value!(OffsetDateTime, OffsetDateTime, "offset date-time");
simple_value!(Decimal, Decimal, "decimal");

macro_rules! narrow_integer {
    ($($ty:ty),*) => {
        $(
            impl IntoValue for $ty {
                fn into_value(self) -> Value {
                    Value::Integer(i64::from(self))
                }
            }

            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, ValueError> {
                    let wide = i64::from_value(value)?;
                    <$ty>::try_from(wide).map_err(|_| ValueError::OutOfRange {
                        value: wide,
                        target: stringify!($ty),
                    })
                }
            }
        )*
    };
}

narrow_integer!(i8, i16, i32);

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Float(f64::from(self))
    }
}

impl FromValue for f32 {
    // The codec range-checks single-precision floats before they get here.
    fn from_value(value: Value) -> Result<Self, ValueError> {
        f64::from_value(value).map(|wide| wide as f32)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::String(self.to_owned())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Null, IntoValue::into_value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::Sequence(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Sequence(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(ValueError::unexpected("sequence", &other)),
        }
    }
}

impl<T: IntoValue> IntoValue for Result<T, WireFailure> {
    fn into_value(self) -> Value {
        Value::Result(self.map(|ok| Box::new(ok.into_value())))
    }
}

impl<T: FromValue> FromValue for Result<T, WireFailure> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Result(Ok(inner)) => T::from_value(*inner).map(Ok),
            Value::Result(Err(failure)) => Ok(Err(failure)),
            other => Err(ValueError::unexpected("result", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use time::macros::date;

    use super::*;

    #[rstest]
    #[case(Value::Integer(127), Ok(127_i8))]
    #[case(Value::Integer(128), Err(ValueError::OutOfRange { value: 128, target: "i8" }))]
    #[case(
        Value::Bool(true),
        Err(ValueError::Unexpected { expected: "integer", found: "bool" })
    )]
    fn narrows_integers_with_checks(
        #[case] value: Value,
        #[case] expected: Result<i8, ValueError>,
    ) {
        assert_eq!(i8::from_value(value), expected);
    }

    #[test]
    fn optional_maps_null_to_none() {
        assert_eq!(Option::<String>::from_value(Value::Null), Ok(None));
        assert_eq!(
            Option::<String>::from_value(Value::String("x".into())),
            Ok(Some("x".to_owned()))
        );
        assert_eq!(None::<i32>.into_value(), Value::Null);
    }

    #[test]
    fn empty_sequence_is_distinct_from_absent() {
        let empty: Vec<i64> = Vec::new();
        assert_eq!(empty.into_value(), Value::Sequence(Vec::new()));
        assert!(Vec::<i64>::from_value(Value::Null).is_err());
    }

    #[test]
    fn record_fields_extract_typed_values() {
        let value = Value::record([
            ("name", "Ada".into_value()),
            ("born", date!(1815 - 12 - 10).into_value()),
        ]);
        let mut fields = value.into_record().expect("record");
        assert_eq!(fields.take::<String>("name"), Ok("Ada".to_owned()));
        assert_eq!(fields.take::<Date>("born"), Ok(date!(1815 - 12 - 10)));
        assert_eq!(fields.take::<Option<String>>("email"), Ok(None));
    }

    #[test]
    fn record_field_errors_name_the_field() {
        let mut fields = Value::record([("age", Value::String("old".into()))])
            .into_record()
            .expect("record");
        let error = fields.take::<i32>("age").expect_err("mistyped");
        assert_eq!(error.to_string(), "field 'age': expected integer, found string");
    }

    #[test]
    fn result_values_keep_failures() {
        let failure = WireFailure::new("PasswordExpired", "change it");
        let value = Err::<i64, _>(failure.clone()).into_value();
        assert_eq!(Result::<i64, WireFailure>::from_value(value), Ok(Err(failure)));
    }
}

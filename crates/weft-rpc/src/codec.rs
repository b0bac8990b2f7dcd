//! Descriptor-driven conversion between [`Value`]s and wire JSON.
//!
//! Scalars map onto JSON primitives. Enums travel as their variant name,
//! decimals as exact decimal text (integral JSON numbers are also read), and
//! temporal values as ISO 8601 text (RFC 3339 for offset date-times).
//! Fractional JSON numbers are refused for decimals. Non-finite floats use
//! the strings `"NaN"`, `"Infinity"` and `"-Infinity"`. Result-of values encode as
//! `{"ok": value}` or `{"error": tag, "message": text}`.
//!
//! Records encode every declared field; decoding ignores undeclared fields
//! and treats a missing optional field as absent.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Number};
use thiserror::Error;
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use weft_wire::{WireFailure, WireValue};

use crate::decimal::{Decimal, DecimalError};
use crate::descriptor::{EnumDescriptor, RecordDescriptor, TypeDescriptor};
use crate::value::Value;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second].[subsecond]");
const WHOLE_TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second]");
const DATE_TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
const WHOLE_DATE_TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

const NAN: &str = "NaN";
const INFINITY: &str = "Infinity";
const NEG_INFINITY: &str = "-Infinity";

/// Failures decoding a wire value against a descriptor.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The wire value has the wrong JSON shape.
    #[error("{path}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Location of the value.
        path: String,
        /// Expected descriptor.
        expected: String,
        /// JSON kind that was present.
        found: &'static str,
    },
    /// An enum name is not part of the declared set.
    #[error("{path}: '{variant}' is not a variant of enum {name}")]
    UnknownEnumVariant {
        /// Location of the value.
        path: String,
        /// Enum name.
        name: String,
        /// Offending variant.
        variant: String,
    },
    /// A record field is missing or mistyped.
    #[error("{path}: record {record} field '{field}' {detail}")]
    SchemaMismatch {
        /// Location of the record.
        path: String,
        /// Record name.
        record: String,
        /// Field name.
        field: String,
        /// What went wrong with the field.
        detail: String,
    },
    /// A number does not fit the declared width.
    #[error("{path}: {value} is out of range for {expected}")]
    OutOfRange {
        /// Location of the value.
        path: String,
        /// Offending number as text.
        value: String,
        /// Declared descriptor.
        expected: String,
    },
    /// Decimal text could not be parsed.
    #[error("{path}: invalid decimal: {source}")]
    InvalidDecimal {
        /// Location of the value.
        path: String,
        /// Parse failure.
        #[source]
        source: DecimalError,
    },
    /// Temporal text could not be parsed.
    #[error("{path}: invalid {expected} '{text}': {source}")]
    InvalidTemporal {
        /// Location of the value.
        path: String,
        /// Declared descriptor.
        expected: String,
        /// Offending text.
        text: String,
        /// Parse failure.
        #[source]
        source: time::error::Parse,
    },
    /// Char text was not exactly one character.
    #[error("{path}: expected a single character, found '{text}'")]
    InvalidChar {
        /// Location of the value.
        path: String,
        /// Offending text.
        text: String,
    },
    /// Result-of payload is neither an `ok` nor an `error` object.
    #[error("{path}: malformed result: {detail}")]
    MalformedResult {
        /// Location of the value.
        path: String,
        /// What was wrong.
        detail: String,
    },
}

/// Failures encoding a value against a descriptor.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The value does not match the descriptor.
    #[error("{path}: cannot encode {found} as {expected}")]
    TypeMismatch {
        /// Location of the value.
        path: String,
        /// Expected descriptor.
        expected: String,
        /// Value kind that was present.
        found: &'static str,
    },
    /// An enum name is not part of the declared set.
    #[error("{path}: '{variant}' is not a variant of enum {name}")]
    UnknownEnumVariant {
        /// Location of the value.
        path: String,
        /// Enum name.
        name: String,
        /// Offending variant.
        variant: String,
    },
    /// A required record field is missing.
    #[error("{path}: record {record} is missing field '{field}'")]
    MissingField {
        /// Location of the record.
        path: String,
        /// Record name.
        record: String,
        /// Missing field.
        field: String,
    },
    /// An integer does not fit the declared width.
    #[error("{path}: {value} is out of range for {expected}")]
    OutOfRange {
        /// Location of the value.
        path: String,
        /// Offending integer.
        value: i64,
        /// Declared descriptor.
        expected: String,
    },
    /// A temporal value could not be formatted.
    #[error("{path}: cannot format {expected}: {source}")]
    Temporal {
        /// Location of the value.
        path: String,
        /// Declared descriptor.
        expected: String,
        /// Format failure.
        #[source]
        source: time::error::Format,
    },
}

#[derive(Clone, Copy)]
enum Path<'a> {
    Root,
    Field(&'a Path<'a>, &'a str),
    Index(&'a Path<'a>, usize),
}

impl fmt::Display for Path<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("$"),
            Self::Field(parent, name) => write!(f, "{parent}.{name}"),
            Self::Index(parent, index) => write!(f, "{parent}[{index}]"),
        }
    }
}

/// Encodes `value` as described by `descriptor`.
///
/// # Errors
///
/// Returns [`EncodeError`] when the value does not fit the descriptor.
pub fn encode(value: &Value, descriptor: &TypeDescriptor) -> Result<WireValue, EncodeError> {
    encode_at(value, descriptor, Path::Root)
}

/// Decodes `wire` as described by `descriptor`.
///
/// # Errors
///
/// Returns [`DecodeError`] when the wire value does not match the descriptor.
pub fn decode(wire: &WireValue, descriptor: &TypeDescriptor) -> Result<Value, DecodeError> {
    decode_at(wire, descriptor, Path::Root)
}

fn encode_at(
    value: &Value,
    descriptor: &TypeDescriptor,
    path: Path<'_>,
) -> Result<WireValue, EncodeError> {
    let mismatch = || EncodeError::TypeMismatch {
        path: path.to_string(),
        expected: descriptor.to_string(),
        found: value.kind(),
    };
    match (descriptor, value) {
        (TypeDescriptor::Unit, Value::Null) => Ok(WireValue::Null),
        (TypeDescriptor::String, Value::String(text)) => Ok(WireValue::String(text.clone())),
        (TypeDescriptor::Bool, Value::Bool(flag)) => Ok(WireValue::Bool(*flag)),
        (
            TypeDescriptor::Byte | TypeDescriptor::Short | TypeDescriptor::Int | TypeDescriptor::Long,
            Value::Integer(number),
        ) => {
            if integer_fits(*number, descriptor) {
                Ok(WireValue::from(*number))
            } else {
                Err(EncodeError::OutOfRange {
                    path: path.to_string(),
                    value: *number,
                    expected: descriptor.to_string(),
                })
            }
        }
        (TypeDescriptor::Float | TypeDescriptor::Double, Value::Float(number)) => {
            Ok(encode_float(*number))
        }
        (TypeDescriptor::Char, Value::Char(ch)) => Ok(WireValue::String(ch.to_string())),
        (TypeDescriptor::Enum(declared), Value::Enum(variant)) => {
            if declared.contains(variant) {
                Ok(WireValue::String(variant.clone()))
            } else {
                Err(EncodeError::UnknownEnumVariant {
                    path: path.to_string(),
                    name: declared.name().to_owned(),
                    variant: variant.clone(),
                })
            }
        }
        (TypeDescriptor::Date, Value::Date(date)) => {
            format_temporal(date.format(DATE_FORMAT), descriptor, path)
        }
        (TypeDescriptor::Time, Value::Time(time)) => {
            format_temporal(time.format(TIME_FORMAT), descriptor, path)
        }
        (TypeDescriptor::DateTime, Value::DateTime(stamp)) => {
            format_temporal(stamp.format(DATE_TIME_FORMAT), descriptor, path)
        }
        (TypeDescriptor::OffsetDateTime, Value::OffsetDateTime(stamp)) => {
            format_temporal(stamp.format(&Rfc3339), descriptor, path)
        }
        (TypeDescriptor::Decimal, Value::Decimal(decimal)) => {
            Ok(WireValue::String(decimal.to_string()))
        }
        (TypeDescriptor::Record(record), Value::Record(fields)) => {
            encode_record(record, fields, path)
        }
        (TypeDescriptor::Optional(_), Value::Null) => Ok(WireValue::Null),
        (TypeDescriptor::Optional(inner), present) => encode_at(present, inner, path),
        (TypeDescriptor::Sequence(inner), Value::Sequence(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| encode_at(item, inner, Path::Index(&path, index)))
            .collect::<Result<Vec<_>, _>>()
            .map(WireValue::Array),
        (TypeDescriptor::Result(inner), Value::Result(outcome)) => {
            let mut object = Map::new();
            match outcome {
                Ok(ok) => {
                    let encoded = encode_at(ok, inner, Path::Field(&path, "ok"))?;
                    object.insert("ok".to_owned(), encoded);
                }
                Err(failure) => {
                    object.insert("error".to_owned(), WireValue::String(failure.error_tag.clone()));
                    object.insert("message".to_owned(), WireValue::String(failure.message.clone()));
                }
            }
            Ok(WireValue::Object(object))
        }
        _ => Err(mismatch()),
    }
}

fn encode_record(
    record: &RecordDescriptor,
    fields: &BTreeMap<String, Value>,
    path: Path<'_>,
) -> Result<WireValue, EncodeError> {
    let mut object = Map::new();
    for field in record.fields() {
        let field_path = Path::Field(&path, field.name());
        let encoded = match fields.get(field.name()) {
            Some(value) => encode_at(value, field.descriptor(), field_path)?,
            None if !field.is_required() => WireValue::Null,
            None => {
                return Err(EncodeError::MissingField {
                    path: path.to_string(),
                    record: record.name().to_owned(),
                    field: field.name().to_owned(),
                });
            }
        };
        object.insert(field.name().to_owned(), encoded);
    }
    Ok(WireValue::Object(object))
}

fn encode_float(number: f64) -> WireValue {
    match Number::from_f64(number) {
        Some(finite) => WireValue::Number(finite),
        None if number.is_nan() => WireValue::String(NAN.to_owned()),
        None if number.is_sign_positive() => WireValue::String(INFINITY.to_owned()),
        None => WireValue::String(NEG_INFINITY.to_owned()),
    }
}

fn format_temporal(
    formatted: Result<String, time::error::Format>,
    descriptor: &TypeDescriptor,
    path: Path<'_>,
) -> Result<WireValue, EncodeError> {
    formatted
        .map(WireValue::String)
        .map_err(|source| EncodeError::Temporal {
            path: path.to_string(),
            expected: descriptor.to_string(),
            source,
        })
}

fn integer_fits(number: i64, descriptor: &TypeDescriptor) -> bool {
    match descriptor {
        TypeDescriptor::Byte => i8::try_from(number).is_ok(),
        TypeDescriptor::Short => i16::try_from(number).is_ok(),
        TypeDescriptor::Int => i32::try_from(number).is_ok(),
        _ => true,
    }
}

fn decode_at(
    wire: &WireValue,
    descriptor: &TypeDescriptor,
    path: Path<'_>,
) -> Result<Value, DecodeError> {
    let mismatch = || DecodeError::TypeMismatch {
        path: path.to_string(),
        expected: descriptor.to_string(),
        found: json_kind(wire),
    };
    match (descriptor, wire) {
        (TypeDescriptor::Unit, WireValue::Null) => Ok(Value::Null),
        (TypeDescriptor::String, WireValue::String(text)) => Ok(Value::String(text.clone())),
        (TypeDescriptor::Bool, WireValue::Bool(flag)) => Ok(Value::Bool(*flag)),
        (
            TypeDescriptor::Byte | TypeDescriptor::Short | TypeDescriptor::Int | TypeDescriptor::Long,
            WireValue::Number(number),
        ) => decode_integer(number, descriptor, path),
        (TypeDescriptor::Float | TypeDescriptor::Double, WireValue::Number(number)) => {
            let value = number.as_f64().ok_or_else(mismatch)?;
            check_float_range(value, descriptor, path)
        }
        (TypeDescriptor::Float | TypeDescriptor::Double, WireValue::String(text)) => {
            match text.as_str() {
                NAN => Ok(Value::Float(f64::NAN)),
                INFINITY => Ok(Value::Float(f64::INFINITY)),
                NEG_INFINITY => Ok(Value::Float(f64::NEG_INFINITY)),
                _ => Err(mismatch()),
            }
        }
        (TypeDescriptor::Char, WireValue::String(text)) => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Ok(Value::Char(ch)),
                _ => Err(DecodeError::InvalidChar {
                    path: path.to_string(),
                    text: text.clone(),
                }),
            }
        }
        (TypeDescriptor::Enum(declared), WireValue::String(name)) => {
            decode_enum(declared, name, path)
        }
        (TypeDescriptor::Date, WireValue::String(text)) => {
            parse_temporal(Date::parse(text, DATE_FORMAT), text, descriptor, path).map(Value::Date)
        }
        (TypeDescriptor::Time, WireValue::String(text)) => parse_temporal(
            Time::parse(text, TIME_FORMAT).or_else(|_| Time::parse(text, WHOLE_TIME_FORMAT)),
            text,
            descriptor,
            path,
        )
        .map(Value::Time),
        (TypeDescriptor::DateTime, WireValue::String(text)) => parse_temporal(
            PrimitiveDateTime::parse(text, DATE_TIME_FORMAT)
                .or_else(|_| PrimitiveDateTime::parse(text, WHOLE_DATE_TIME_FORMAT)),
            text,
            descriptor,
            path,
        )
        .map(Value::DateTime),
        (TypeDescriptor::OffsetDateTime, WireValue::String(text)) => parse_temporal(
            OffsetDateTime::parse(text, &Rfc3339),
            text,
            descriptor,
            path,
        )
        .map(Value::OffsetDateTime),
        (TypeDescriptor::Decimal, WireValue::String(text)) => decode_decimal(text, path),
        (TypeDescriptor::Decimal, WireValue::Number(number))
            if number.is_i64() || number.is_u64() =>
        {
            decode_decimal(&number.to_string(), path)
        }
        (TypeDescriptor::Decimal, WireValue::Number(_)) => Err(DecodeError::TypeMismatch {
            path: path.to_string(),
            expected: descriptor.to_string(),
            found: "inexact number",
        }),
        (TypeDescriptor::Record(record), WireValue::Object(object)) => {
            decode_record(record, object, path)
        }
        (TypeDescriptor::Optional(_), WireValue::Null) => Ok(Value::Null),
        (TypeDescriptor::Optional(inner), present) => decode_at(present, inner, path),
        (TypeDescriptor::Sequence(inner), WireValue::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| decode_at(item, inner, Path::Index(&path, index)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
        (TypeDescriptor::Result(inner), WireValue::Object(object)) => {
            decode_result(inner, object, path)
        }
        _ => Err(mismatch()),
    }
}

fn decode_integer(
    number: &Number,
    descriptor: &TypeDescriptor,
    path: Path<'_>,
) -> Result<Value, DecodeError> {
    let out_of_range = || DecodeError::OutOfRange {
        path: path.to_string(),
        value: number.to_string(),
        expected: descriptor.to_string(),
    };
    if number.is_f64() {
        return Err(DecodeError::TypeMismatch {
            path: path.to_string(),
            expected: descriptor.to_string(),
            found: "fractional number",
        });
    }
    let wide = number.as_i64().ok_or_else(out_of_range)?;
    if integer_fits(wide, descriptor) {
        Ok(Value::Integer(wide))
    } else {
        Err(out_of_range())
    }
}

fn check_float_range(
    value: f64,
    descriptor: &TypeDescriptor,
    path: Path<'_>,
) -> Result<Value, DecodeError> {
    if *descriptor == TypeDescriptor::Float && value.abs() > f64::from(f32::MAX) {
        return Err(DecodeError::OutOfRange {
            path: path.to_string(),
            value: value.to_string(),
            expected: descriptor.to_string(),
        });
    }
    Ok(Value::Float(value))
}

fn decode_enum(declared: &EnumDescriptor, name: &str, path: Path<'_>) -> Result<Value, DecodeError> {
    if declared.contains(name) {
        Ok(Value::Enum(name.to_owned()))
    } else {
        Err(DecodeError::UnknownEnumVariant {
            path: path.to_string(),
            name: declared.name().to_owned(),
            variant: name.to_owned(),
        })
    }
}

fn decode_decimal(text: &str, path: Path<'_>) -> Result<Value, DecodeError> {
    Decimal::from_str(text)
        .map(Value::Decimal)
        .map_err(|source| DecodeError::InvalidDecimal {
            path: path.to_string(),
            source,
        })
}

fn parse_temporal<T>(
    parsed: Result<T, time::error::Parse>,
    text: &str,
    descriptor: &TypeDescriptor,
    path: Path<'_>,
) -> Result<T, DecodeError> {
    parsed.map_err(|source| DecodeError::InvalidTemporal {
        path: path.to_string(),
        expected: descriptor.to_string(),
        text: text.to_owned(),
        source,
    })
}

fn decode_record(
    record: &RecordDescriptor,
    object: &Map<String, WireValue>,
    path: Path<'_>,
) -> Result<Value, DecodeError> {
    let schema_mismatch = |field: &str, detail: String| DecodeError::SchemaMismatch {
        path: path.to_string(),
        record: record.name().to_owned(),
        field: field.to_owned(),
        detail,
    };
    let mut fields = BTreeMap::new();
    for field in record.fields() {
        let value = match object.get(field.name()) {
            Some(wire) => decode_at(wire, field.descriptor(), Path::Field(&path, field.name()))
                .map_err(|error| schema_mismatch(field.name(), format!("is invalid: {error}")))?,
            None if !field.is_required() => Value::Null,
            None => return Err(schema_mismatch(field.name(), "is missing".to_owned())),
        };
        fields.insert(field.name().to_owned(), value);
    }
    Ok(Value::Record(fields))
}

fn decode_result(
    inner: &TypeDescriptor,
    object: &Map<String, WireValue>,
    path: Path<'_>,
) -> Result<Value, DecodeError> {
    if let Some(ok) = object.get("ok") {
        let value = decode_at(ok, inner, Path::Field(&path, "ok"))?;
        return Ok(Value::Result(Ok(Box::new(value))));
    }
    match (object.get("error"), object.get("message")) {
        (Some(WireValue::String(tag)), Some(WireValue::String(message))) => Ok(Value::Result(
            Err(WireFailure::new(tag.clone(), message.clone())),
        )),
        _ => Err(DecodeError::MalformedResult {
            path: path.to_string(),
            detail: "expected {\"ok\": ...} or {\"error\": tag, \"message\": text}".to_owned(),
        }),
    }
}

const fn json_kind(wire: &WireValue) -> &'static str {
    match wire {
        WireValue::Null => "null",
        WireValue::Bool(_) => "bool",
        WireValue::Number(_) => "number",
        WireValue::String(_) => "string",
        WireValue::Array(_) => "array",
        WireValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests;

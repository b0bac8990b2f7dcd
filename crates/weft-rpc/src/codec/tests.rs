//! Unit tests for the descriptor-driven codec.

use proptest::prelude::*;
use rstest::{fixture, rstest};
use serde_json::json;
use time::macros::{date, datetime, time};

use super::*;
use crate::descriptor::FieldDescriptor;

#[fixture]
fn sort() -> TypeDescriptor {
    TypeDescriptor::enumeration("Sort", ["FN", "LN", "E"])
}

#[fixture]
fn address() -> TypeDescriptor {
    TypeDescriptor::record(
        "Address",
        [
            FieldDescriptor::new("firstName", TypeDescriptor::String),
            FieldDescriptor::new("email", TypeDescriptor::optional(TypeDescriptor::String)),
            FieldDescriptor::new("favourite", TypeDescriptor::Bool),
        ],
    )
}

fn round_trip(value: &Value, descriptor: &TypeDescriptor) -> Value {
    let wire = encode(value, descriptor).expect("encode");
    decode(&wire, descriptor).expect("decode")
}

#[rstest]
fn absent_optional_and_enum_decode(sort: TypeDescriptor) {
    let search = TypeDescriptor::optional(TypeDescriptor::String);
    assert_eq!(decode(&WireValue::Null, &search).expect("search"), Value::Null);
    assert_eq!(
        decode(&json!("FN"), &sort).expect("sort"),
        Value::Enum("FN".to_owned())
    );
}

#[rstest]
fn unknown_enum_variant_is_rejected(sort: TypeDescriptor) {
    let error = decode(&json!("ZZ"), &sort).expect_err("not a variant");
    assert!(matches!(
        error,
        DecodeError::UnknownEnumVariant { ref name, ref variant, .. } if name == "Sort" && variant == "ZZ"
    ));
}

#[rstest]
fn empty_sequence_encodes_as_empty_array(address: TypeDescriptor) {
    let descriptor = TypeDescriptor::sequence(address);
    let wire = encode(&Value::Sequence(Vec::new()), &descriptor).expect("encode");
    assert_eq!(wire, json!([]));
}

#[rstest]
fn record_encodes_all_declared_fields(address: TypeDescriptor) {
    let value = Value::record([
        ("firstName", Value::String("Ada".into())),
        ("favourite", Value::Bool(true)),
    ]);
    let wire = encode(&value, &address).expect("encode");
    assert_eq!(
        wire,
        json!({"firstName": "Ada", "email": null, "favourite": true})
    );
}

#[rstest]
fn record_missing_required_field_is_schema_mismatch(address: TypeDescriptor) {
    let error = decode(&json!({"email": "a@b.c", "favourite": false}), &address)
        .expect_err("missing field");
    assert!(matches!(
        error,
        DecodeError::SchemaMismatch { ref field, .. } if field == "firstName"
    ));
}

#[rstest]
fn record_mistyped_field_is_schema_mismatch(address: TypeDescriptor) {
    let error = decode(&json!({"firstName": 7, "favourite": false}), &address)
        .expect_err("mistyped field");
    let DecodeError::SchemaMismatch { field, detail, .. } = error else {
        panic!("expected a schema mismatch, got {error}");
    };
    assert_eq!(field, "firstName");
    assert!(detail.contains("$.firstName"), "detail was {detail}");
}

#[rstest]
fn record_ignores_undeclared_fields(address: TypeDescriptor) {
    let value = decode(
        &json!({"firstName": "Ada", "favourite": true, "nickname": "Countess"}),
        &address,
    )
    .expect("decode");
    let fields = value.into_record().expect("record");
    assert!(fields.get("nickname").is_none());
    assert_eq!(fields.get("email"), Some(&Value::Null));
}

#[rstest]
#[case(TypeDescriptor::Byte, json!(128))]
#[case(TypeDescriptor::Short, json!(-40_000))]
#[case(TypeDescriptor::Int, json!(3_000_000_000_i64))]
#[case(TypeDescriptor::Long, json!(u64::MAX))]
fn integers_out_of_range_are_rejected(#[case] descriptor: TypeDescriptor, #[case] wire: WireValue) {
    assert!(matches!(
        decode(&wire, &descriptor),
        Err(DecodeError::OutOfRange { .. })
    ));
}

#[test]
fn fractional_number_is_not_an_integer() {
    assert!(matches!(
        decode(&json!(1.5), &TypeDescriptor::Int),
        Err(DecodeError::TypeMismatch { .. })
    ));
}

#[test]
fn encoding_checks_integer_width() {
    assert!(matches!(
        encode(&Value::Integer(300), &TypeDescriptor::Byte),
        Err(EncodeError::OutOfRange { value: 300, .. })
    ));
}

#[rstest]
#[case(f64::INFINITY, json!("Infinity"))]
#[case(f64::NEG_INFINITY, json!("-Infinity"))]
#[case(2.5, json!(2.5))]
fn floats_encode_non_finite_values_as_text(#[case] number: f64, #[case] expected: WireValue) {
    let wire = encode(&Value::Float(number), &TypeDescriptor::Double).expect("encode");
    assert_eq!(wire, expected);
    assert_eq!(
        decode(&wire, &TypeDescriptor::Double).expect("decode"),
        Value::Float(number)
    );
}

#[test]
fn nan_survives_the_wire() {
    let wire = encode(&Value::Float(f64::NAN), &TypeDescriptor::Float).expect("encode");
    assert_eq!(wire, json!("NaN"));
    let Value::Float(decoded) = decode(&wire, &TypeDescriptor::Float).expect("decode") else {
        panic!("expected a float");
    };
    assert!(decoded.is_nan());
}

#[test]
fn single_precision_range_is_checked() {
    assert!(matches!(
        decode(&json!(1e300), &TypeDescriptor::Float),
        Err(DecodeError::OutOfRange { .. })
    ));
}

#[rstest]
#[case(json!(""))]
#[case(json!("ab"))]
fn char_requires_exactly_one_character(#[case] wire: WireValue) {
    assert!(matches!(
        decode(&wire, &TypeDescriptor::Char),
        Err(DecodeError::InvalidChar { .. })
    ));
}

#[test]
fn decimal_travels_as_exact_text() {
    let decimal = Decimal::from_str("12345678901234567890.123456789").expect("decimal");
    let wire = encode(&Value::Decimal(decimal), &TypeDescriptor::Decimal).expect("encode");
    assert_eq!(wire, json!("12345678901234567890.123456789"));
}

#[rstest]
#[case(json!(42), "42")]
#[case(json!(-7), "-7")]
#[case(json!(u64::MAX), "18446744073709551615")]
fn decimal_accepts_integral_json_numbers(#[case] wire: WireValue, #[case] expected: &str) {
    let decoded = decode(&wire, &TypeDescriptor::Decimal).expect("decode");
    assert_eq!(
        decoded,
        Value::Decimal(Decimal::from_str(expected).expect("decimal"))
    );
}

#[test]
fn decimal_refuses_json_numbers_that_lost_digits() {
    let request = weft_wire::WireRequest::parse(
        br#"{"route":"/rpc/pay","body":[12345678901234567890.12345, 0.1000000000000000055511151231257827, 12.5]}"#,
    )
    .expect("request parses");
    for argument in &request.body {
        assert!(
            matches!(
                decode(argument, &TypeDescriptor::Decimal),
                Err(DecodeError::TypeMismatch {
                    found: "inexact number",
                    ..
                })
            ),
            "{argument} must not decode as a decimal"
        );
    }
}

#[test]
fn decimal_text_keeps_digits_through_a_request() {
    let request = weft_wire::WireRequest::parse(
        br#"{"route":"/rpc/pay","body":["12345678901234567890.12345","0.1000000000000000055511151231257827","0E+50"]}"#,
    )
    .expect("request parses");
    let decoded: Vec<String> = request
        .body
        .iter()
        .map(|argument| match decode(argument, &TypeDescriptor::Decimal) {
            Ok(Value::Decimal(decimal)) => decimal.to_string(),
            other => panic!("unexpected decode result {other:?}"),
        })
        .collect();
    assert_eq!(
        decoded,
        [
            "12345678901234567890.12345",
            "0.1000000000000000055511151231257827",
            "0E+50"
        ]
    );
}

#[test]
fn invalid_decimal_text_is_rejected() {
    assert!(matches!(
        decode(&json!("12,5"), &TypeDescriptor::Decimal),
        Err(DecodeError::InvalidDecimal { .. })
    ));
}

#[rstest]
#[case(TypeDescriptor::Date, Value::Date(date!(2024 - 02 - 29)), json!("2024-02-29"))]
#[case(TypeDescriptor::Time, Value::Time(time!(08:15:30.25)), json!("08:15:30.25"))]
#[case(
    TypeDescriptor::DateTime,
    Value::DateTime(datetime!(2024 - 02 - 29 08:15:30)),
    json!("2024-02-29T08:15:30.0")
)]
#[case(
    TypeDescriptor::OffsetDateTime,
    Value::OffsetDateTime(datetime!(2024 - 02 - 29 08:15:30 +01:00)),
    json!("2024-02-29T08:15:30+01:00")
)]
fn temporal_values_use_iso_text(
    #[case] descriptor: TypeDescriptor,
    #[case] value: Value,
    #[case] expected: WireValue,
) {
    let wire = encode(&value, &descriptor).expect("encode");
    assert_eq!(wire, expected);
    assert_eq!(decode(&wire, &descriptor).expect("decode"), value);
}

#[test]
fn whole_second_times_decode() {
    assert_eq!(
        decode(&json!("23:59:59"), &TypeDescriptor::Time).expect("decode"),
        Value::Time(time!(23:59:59))
    );
}

#[test]
fn invalid_dates_are_rejected() {
    assert!(matches!(
        decode(&json!("2023-02-29"), &TypeDescriptor::Date),
        Err(DecodeError::InvalidTemporal { .. })
    ));
}

#[test]
fn result_of_encodes_both_branches() {
    let descriptor = TypeDescriptor::result(TypeDescriptor::Int);
    let ok = Value::Result(Ok(Box::new(Value::Integer(3))));
    assert_eq!(encode(&ok, &descriptor).expect("encode"), json!({"ok": 3}));

    let failure = WireFailure::new("PasswordExpired", "change it");
    let err = Value::Result(Err(failure));
    let wire = encode(&err, &descriptor).expect("encode");
    assert_eq!(
        wire,
        json!({"error": "PasswordExpired", "message": "change it"})
    );
    assert_eq!(decode(&wire, &descriptor).expect("decode"), err);
}

#[test]
fn malformed_result_is_rejected() {
    let descriptor = TypeDescriptor::result(TypeDescriptor::Int);
    assert!(matches!(
        decode(&json!({"error": 5}), &descriptor),
        Err(DecodeError::MalformedResult { .. })
    ));
}

#[test]
fn nested_paths_are_reported() {
    let descriptor = TypeDescriptor::sequence(TypeDescriptor::Int);
    let error = decode(&json!([1, 2, "three"]), &descriptor).expect_err("mistyped element");
    assert_eq!(error.to_string(), "$[2]: expected int, found string");
}

#[test]
fn null_is_not_a_required_value() {
    assert!(matches!(
        decode(&WireValue::Null, &TypeDescriptor::String),
        Err(DecodeError::TypeMismatch { found: "null", .. })
    ));
}

fn decimal_strategy() -> impl Strategy<Value = Decimal> {
    ("-?[0-9]{1,60}", -80_i64..=80).prop_map(|(digits, scale)| {
        Decimal::from_str(&format!("{digits}E{}", -scale)).expect("strategy text parses")
    })
}

proptest! {
    #[test]
    fn sequences_of_text_round_trip(items in proptest::collection::vec(".*", 0..8)) {
        let value = Value::Sequence(items.into_iter().map(Value::String).collect());
        let descriptor = TypeDescriptor::sequence(TypeDescriptor::String);
        prop_assert_eq!(round_trip(&value, &descriptor), value);
    }

    #[test]
    fn optional_longs_round_trip(number in proptest::option::of(any::<i64>())) {
        let value = number.map_or(Value::Null, Value::Integer);
        let descriptor = TypeDescriptor::optional(TypeDescriptor::Long);
        prop_assert_eq!(round_trip(&value, &descriptor), value);
    }

    #[test]
    fn decimals_round_trip(decimal in decimal_strategy()) {
        let value = Value::Decimal(decimal);
        prop_assert_eq!(round_trip(&value, &TypeDescriptor::Decimal), value);
    }

    #[test]
    fn finite_doubles_round_trip(number in any::<f64>().prop_filter("finite", |n| n.is_finite())) {
        let value = Value::Float(number);
        prop_assert_eq!(round_trip(&value, &TypeDescriptor::Double), value);
    }

    #[test]
    fn records_round_trip(
        name in "[a-zA-Z ]{0,12}",
        email in proptest::option::of("[a-z]{1,6}@[a-z]{1,6}\\.com"),
        favourite in any::<bool>(),
    ) {
        let value = Value::record([
            ("firstName", Value::String(name)),
            ("email", email.map_or(Value::Null, Value::String)),
            ("favourite", Value::Bool(favourite)),
        ]);
        prop_assert_eq!(round_trip(&value, &address()), value);
    }
}

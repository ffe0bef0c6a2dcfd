mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};
use common::{CustomMeasurement, Undeclared, WithUnsupportedField};
use influx_mapper::{
    FieldSet, MapperConfig, MapperError, MetadataCache, QueryResult, RawValue, Record,
    ResultMapper, Series, TimePrecision, map_result,
};
use proptest::prelude::*;
use uuid::Uuid;

fn single_column(column: &str, value: RawValue) -> QueryResult {
    QueryResult::new(vec![
        Series::new("CustomMeasurement", &[column]).with_row([value]),
    ])
}

fn map_one(column: &str, value: RawValue) -> CustomMeasurement {
    let mut records: Vec<CustomMeasurement> =
        map_result(&single_column(column, value)).expect("map single column");
    assert_eq!(records.len(), 1);
    records.remove(0)
}

#[test]
fn undeclared_type_fails_before_looking_at_the_result() {
    let result = QueryResult::failed("upstream exploded");
    let err = map_result::<Undeclared>(&result).unwrap_err();
    assert!(matches!(err, MapperError::InvalidArgument { .. }));
    assert!(err.to_string().contains("Undeclared"));
}

#[test]
fn top_level_error_is_reported() {
    let err = map_result::<CustomMeasurement>(&QueryResult::failed("main queryresult error"))
        .unwrap_err();
    assert_eq!(err.upstream_message(), Some("main queryresult error"));
}

#[test]
fn series_error_is_reported_even_for_other_measurements() {
    let result = QueryResult::new(vec![
        Series::new("CustomMeasurement", &["uuid"]).with_row(["a"]),
        Series::failed("series error"),
    ]);
    let err = map_result::<CustomMeasurement>(&result).unwrap_err();
    assert!(matches!(err, MapperError::ResultError { .. }));
    assert_eq!(err.upstream_message(), Some("series error"));
}

#[test]
fn two_rows_map_in_order() {
    let t0 = Utc::now().timestamp_millis();
    let t1 = t0 + 1_000;
    let u0 = Uuid::new_v4().to_string();
    let u1 = Uuid::new_v4().to_string();
    let series = Series::new("CustomMeasurement", &["time", "uuid"])
        .with_row([RawValue::Integer(t0), RawValue::from(u0.as_str())])
        .with_row([RawValue::Integer(t1), RawValue::from(u1.as_str())]);

    let records: Vec<CustomMeasurement> =
        map_result(&QueryResult::new(vec![series])).expect("map two rows");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].time.map(|t| t.timestamp_millis()), Some(t0));
    assert_eq!(records[0].uuid.as_deref(), Some(u0.as_str()));
    assert_eq!(records[1].time.map(|t| t.timestamp_millis()), Some(t1));
    assert_eq!(records[1].uuid.as_deref(), Some(u1.as_str()));
}

#[test]
fn every_supported_kind_is_populated() {
    let now = Utc::now().timestamp_millis() as f64;
    let uuid = Uuid::new_v4().to_string();
    let series = Series::new(
        "CustomMeasurement",
        &[
            "time",
            "uuid",
            "doubleObject",
            "longObject",
            "integerObject",
            "doublePrimitive",
            "longPrimitive",
            "integerPrimitive",
            "booleanObject",
            "booleanPrimitive",
        ],
    )
    .with_row([
        RawValue::Float(now),
        RawValue::from(uuid.as_str()),
        RawValue::Float(1.01),
        RawValue::Float(2.0),
        RawValue::Float(3.0),
        RawValue::Float(1.01),
        RawValue::Float(4.0),
        RawValue::Float(5.0),
        RawValue::from("false"),
        RawValue::from("true"),
    ]);

    let records: Vec<CustomMeasurement> =
        map_result(&QueryResult::new(vec![series])).expect("map all kinds");
    let record = &records[0];
    assert_eq!(record.time.map(|t| t.timestamp_millis()), Some(now as i64));
    assert_eq!(record.uuid.as_deref(), Some(uuid.as_str()));
    assert_eq!(record.double_object, Some(1.01));
    assert_eq!(record.long_object, Some(2));
    assert_eq!(record.integer_object, Some(3));
    assert_eq!(record.double_primitive, 1.01);
    assert_eq!(record.long_primitive, 4);
    assert_eq!(record.integer_primitive, 5);
    assert_eq!(record.boolean_object, Some(false));
    assert!(record.boolean_primitive);
    assert_eq!(record.non_column, None);
}

#[test]
fn numeric_widening_truncates_doubles() {
    assert_eq!(map_one("integerPrimitive", RawValue::Float(3.0)).integer_primitive, 3);
    assert_eq!(map_one("longPrimitive", RawValue::Float(3.0)).long_primitive, 3);
    assert_eq!(map_one("doublePrimitive", RawValue::Float(3.0)).double_primitive, 3.0);
    assert_eq!(map_one("integerObject", RawValue::Float(-2.9)).integer_object, Some(-2));
    assert_eq!(
        map_one("integerPrimitive", RawValue::Float(1e12)).integer_primitive,
        i32::MAX
    );
}

#[test]
fn text_fields_take_any_representation() {
    assert_eq!(map_one("uuid", RawValue::Float(3.0)).uuid.as_deref(), Some("3.0"));
    assert_eq!(map_one("uuid", RawValue::Boolean(true)).uuid.as_deref(), Some("true"));
    assert_eq!(map_one("uuid", RawValue::Integer(7)).uuid.as_deref(), Some("7"));
}

#[test]
fn boolean_policy_only_accepts_exact_true() {
    assert!(map_one("booleanPrimitive", RawValue::from("true")).boolean_primitive);
    assert!(map_one("booleanPrimitive", RawValue::Boolean(true)).boolean_primitive);
    assert!(!map_one("booleanPrimitive", RawValue::from("false")).boolean_primitive);
    assert_eq!(
        map_one("booleanObject", RawValue::from("TRUE")).boolean_object,
        Some(false)
    );
    assert_eq!(
        map_one("booleanObject", RawValue::from("yes")).boolean_object,
        Some(false)
    );
}

#[test]
fn timestamp_encodings_agree() {
    let expected = Utc.with_ymd_and_hms(2017, 6, 19, 9, 29, 45).unwrap()
        + Duration::microseconds(655_123);
    let millis = expected.timestamp_millis();

    let from_text = map_one("time", RawValue::from("2017-06-19T09:29:45.655123Z"))
        .time
        .expect("time from text");
    let from_integer = map_one("time", RawValue::Integer(millis))
        .time
        .expect("time from integer");
    let from_float = map_one("time", RawValue::Float(millis as f64))
        .time
        .expect("time from float");

    assert_eq!(from_text, expected);
    assert_eq!(from_integer.timestamp_millis(), from_text.timestamp_millis());
    assert_eq!(from_float, from_integer);
    assert!(from_text - from_integer < Duration::milliseconds(1));
}

#[test]
fn epoch_precision_is_configurable() {
    let cache = MetadataCache::new();
    let config = MapperConfig {
        precision: TimePrecision::Seconds,
        ..MapperConfig::default()
    };
    let mapper = ResultMapper::with_cache(&cache, config);
    let records: Vec<CustomMeasurement> = mapper
        .map_result(&single_column("time", RawValue::Float(1_497_864_585.9)))
        .expect("map seconds");
    assert_eq!(
        records[0].time,
        DateTime::from_timestamp(1_497_864_585, 0)
    );
}

#[test]
fn unsupported_field_type_fails() {
    let result = QueryResult::new(vec![
        Series::new("foo", &["bar"]).with_row(["content representing a Date"]),
    ]);
    let err = map_result::<WithUnsupportedField>(&result).unwrap_err();
    match err {
        MapperError::UnsupportedFieldType {
            field, declared, ..
        } => {
            assert_eq!(field, "my_date");
            assert_eq!(declared, "chrono::NaiveDate");
        }
        other => panic!("expected unsupported field type, got {other:?}"),
    }
}

#[test]
fn type_mismatch_aborts_the_whole_call() {
    let series = Series::new("CustomMeasurement", &["longPrimitive"])
        .with_row([RawValue::Float(1.0)])
        .with_row([RawValue::from("two")])
        .with_row([RawValue::Float(3.0)]);
    let err = map_result::<CustomMeasurement>(&QueryResult::new(vec![series])).unwrap_err();
    match err {
        MapperError::TypeMismatch {
            field,
            actual,
            value,
            ..
        } => {
            assert_eq!(field, "long_primitive");
            assert_eq!(actual, "string");
            assert_eq!(value, "two");
        }
        other => panic!("expected type mismatch, got {other:?}"),
    }
}

#[test]
fn instant_field_rejects_booleans() {
    let err =
        map_result::<CustomMeasurement>(&single_column("time", RawValue::Boolean(false)))
            .unwrap_err();
    assert!(matches!(err, MapperError::TypeMismatch { .. }));
}

#[test]
fn rows_without_bound_columns_produce_nothing() {
    let series = Series::new("CustomMeasurement", &["unknown", "other"])
        .with_row([RawValue::from("a"), RawValue::Float(1.0)])
        .with_row([RawValue::from("b"), RawValue::Float(2.0)]);
    let records: Vec<CustomMeasurement> =
        map_result(&QueryResult::new(vec![series])).expect("map degenerate rows");
    assert!(records.is_empty());
}

#[test]
fn null_cells_leave_defaults_but_still_create_records() {
    let series = Series::new("CustomMeasurement", &["uuid", "longObject"])
        .with_row([RawValue::Null, RawValue::Null]);
    let records: Vec<CustomMeasurement> =
        map_result(&QueryResult::new(vec![series])).expect("map null row");
    assert_eq!(records, vec![CustomMeasurement::default()]);
}

#[test]
fn other_measurements_are_skipped_and_order_is_kept() {
    let result = QueryResult::new(vec![
        Series::new("CustomMeasurement", &["uuid"]).with_row(["a"]).with_row(["b"]),
        Series::new("Elsewhere", &["uuid"]).with_row(["x"]),
        Series::new("CustomMeasurement", &["uuid"]).with_row(["c"]),
    ]);
    let records: Vec<CustomMeasurement> = map_result(&result).expect("map mixed series");
    let uuids: Vec<_> = records.iter().filter_map(|r| r.uuid.as_deref()).collect();
    assert_eq!(uuids, vec!["a", "b", "c"]);
}

#[test]
fn ragged_rows_abort_instead_of_mapping_partially() {
    let short = Series::new("CustomMeasurement", &["uuid", "longPrimitive"])
        .with_row([RawValue::from("a"), RawValue::Float(1.0)])
        .with_row([RawValue::from("b")]);
    let err = map_result::<CustomMeasurement>(&QueryResult::new(vec![short])).unwrap_err();
    assert_eq!(
        err,
        MapperError::RowWidth {
            series: "CustomMeasurement".to_string(),
            row: 1,
            expected: 2,
            found: 1,
        }
    );

    let wide = Series::new("CustomMeasurement", &["uuid"])
        .with_row([RawValue::from("a"), RawValue::Float(1.0)]);
    let err = map_result::<CustomMeasurement>(&QueryResult::new(vec![wide])).unwrap_err();
    assert!(matches!(err, MapperError::RowWidth { found: 2, .. }));
}

#[derive(Debug, Default)]
struct Unbuildable;

impl Record for Unbuildable {
    fn measurement() -> Option<&'static str> {
        Some("unbuildable")
    }

    fn declare(fields: &mut FieldSet<Self>) {
        fields.float("value", "value", |_, _| {});
    }

    fn instantiate() -> Result<Self, String> {
        Err("no zero value".to_string())
    }
}

#[test]
fn instantiation_failures_are_wrapped() {
    let result = QueryResult::new(vec![Series::new("unbuildable", &["value"]).with_row([1.0])]);
    let err = map_result::<Unbuildable>(&result).unwrap_err();
    assert_eq!(
        err,
        MapperError::Instantiation {
            record: std::any::type_name::<Unbuildable>().to_string(),
            reason: "no zero value".to_string(),
        }
    );

    let degenerate =
        QueryResult::new(vec![Series::new("unbuildable", &["other"]).with_row([1.0])]);
    assert!(map_result::<Unbuildable>(&degenerate).unwrap().is_empty());
}

static COUNTED_DECLARATIONS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Default, PartialEq)]
struct Counted {
    value: f64,
}

impl Record for Counted {
    fn measurement() -> Option<&'static str> {
        Some("counted")
    }

    fn declare(fields: &mut FieldSet<Self>) {
        COUNTED_DECLARATIONS.fetch_add(1, Ordering::SeqCst);
        fields.float("value", "value", |r, v| r.value = v);
    }

    fn instantiate() -> Result<Self, String> {
        Ok(Self::default())
    }
}

#[test]
fn cached_descriptor_is_reused_across_calls() {
    let result = QueryResult::new(vec![
        Series::new("counted", &["value"]).with_row([1.5]).with_row([2.5]),
    ]);
    let first: Vec<Counted> = map_result(&result).expect("first mapping");
    let second: Vec<Counted> = map_result(&result).expect("second mapping");

    assert_eq!(first, second);
    assert_eq!(COUNTED_DECLARATIONS.load(Ordering::SeqCst), 1);
    assert!(MetadataCache::global().contains::<Counted>());
}

#[test]
fn full_response_with_tags_maps_through_json() {
    let json = r#"{"results": [{"statement_id": 0, "series": [
        {"name": "CustomMeasurement", "tags": {"uuid": "tagged"},
         "columns": ["time", "longPrimitive"],
         "values": [["2017-06-19T09:29:45Z", 10], ["2017-06-19T09:29:46Z", null]]},
        {"name": "cpu", "columns": ["time"], "values": [[1]]}
    ]}]}"#;
    let result = QueryResult::from_json(json).expect("decode response");
    let records: Vec<CustomMeasurement> = map_result(&result).expect("map response");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].long_primitive, 10);
    assert_eq!(records[1].long_primitive, 0);
    assert!(records.iter().all(|r| r.uuid.as_deref() == Some("tagged")));
}

fn non_null_raw() -> impl Strategy<Value = RawValue> {
    prop_oneof![
        any::<String>().prop_map(RawValue::String),
        any::<f64>().prop_map(RawValue::Float),
        any::<i64>().prop_map(RawValue::Integer),
        any::<bool>().prop_map(RawValue::Boolean),
    ]
}

proptest! {
    #[test]
    fn any_text_other_than_true_maps_to_false(text in any::<String>()) {
        prop_assume!(text != "true");
        let record = map_one("booleanPrimitive", RawValue::String(text));
        prop_assert!(!record.boolean_primitive);
    }

    #[test]
    fn unsupported_fields_fail_for_any_value(raw in non_null_raw()) {
        let result = QueryResult::new(vec![Series::new("foo", &["bar"]).with_row([raw])]);
        let err = map_result::<WithUnsupportedField>(&result).unwrap_err();
        let is_unsupported = matches!(err, MapperError::UnsupportedFieldType { .. });
        prop_assert!(is_unsupported);
    }

    #[test]
    fn long_fields_truncate_toward_zero(value in -1.0e15f64..1.0e15f64) {
        let record = map_one("longPrimitive", RawValue::Float(value));
        prop_assert_eq!(record.long_primitive, value.trunc() as i64);
    }

    #[test]
    fn any_result_error_is_reproduced(message in "[a-z][a-z ]{0,30}") {
        let failed = QueryResult::failed(message.clone());
        let err = map_result::<CustomMeasurement>(&failed).unwrap_err();
        prop_assert_eq!(err.upstream_message(), Some(message.as_str()));

        let result = QueryResult::new(vec![Series::failed(message.clone())]);
        let err = map_result::<CustomMeasurement>(&result).unwrap_err();
        prop_assert_eq!(err.upstream_message(), Some(message.as_str()));
    }
}

//! Tests for values, records and row identity.

use std::cmp::Ordering;

use chrono::NaiveDate;
use datagrid_data::model::{DISPLAY_MAX, EMPTY_DISPLAY};
use datagrid_data::{FieldAccess, Identity, Record, RowId, Value};

// =============================================================================
// Value
// =============================================================================

#[test]
fn test_empty_values() {
    assert!(Value::Null.is_empty());
    assert!(Value::from("   ").is_empty());
    assert!(Value::List(vec![]).is_empty());
    assert!(!Value::from(0i64).is_empty());
    assert!(!Value::from(false).is_empty());
}

#[test]
fn test_compare_numbers_across_kinds() {
    assert_eq!(Value::from(2i64).compare(&Value::from(2.5)), Ordering::Less);
    assert_eq!(Value::from(3.0).compare(&Value::from(3i64)), Ordering::Equal);
}

#[test]
fn test_compare_strings_ignores_case_first() {
    assert_eq!(Value::from("apple").compare(&Value::from("Banana")), Ordering::Less);
    assert_ne!(Value::from("a").compare(&Value::from("A")), Ordering::Equal);
}

#[test]
fn test_null_orders_before_everything() {
    assert_eq!(Value::Null.compare(&Value::from(false)), Ordering::Less);
    assert_eq!(Value::from("x").compare(&Value::Null), Ordering::Greater);
}

#[test]
fn test_display_text() {
    assert_eq!(Value::Null.display_text(DISPLAY_MAX), EMPTY_DISPLAY);
    assert_eq!(Value::from(true).display_text(DISPLAY_MAX), "Yes");
    assert_eq!(
        Value::List(vec![Value::from("a"), Value::from(1i64)]).display_text(DISPLAY_MAX),
        "a, 1"
    );
    assert_eq!(Value::from("abcdef").display_text(3), "abc");

    let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    assert_eq!(Value::from(date).display_text(DISPLAY_MAX), "2024-01-15");
}

#[test]
fn test_json_object_prefers_name() {
    let value = Value::from(serde_json::json!({ "id": 4, "name": "Ops" }));
    assert_eq!(value.display_text(DISPLAY_MAX), "Ops");
}

#[test]
fn test_contains_text() {
    let value = Value::from("Grace Hopper");
    assert!(value.contains_text("hop"));
    assert!(value.contains_text(""));
    assert!(!value.contains_text("turing"));
    assert!(!Value::Null.contains_text("x"));
}

#[test]
fn test_as_date_parses_strings() {
    let expected = NaiveDate::from_ymd_opt(2023, 5, 2);
    assert_eq!(Value::from("2023-05-02").as_date(), expected);
    assert_eq!(Value::from("2023-05-02T10:00:00Z").as_date(), expected);
    assert_eq!(Value::from("yesterday").as_date(), None);
}

#[test]
fn test_matches_str() {
    assert!(Value::from(3i64).matches_str("3"));
    assert!(Value::List(vec![Value::from("a"), Value::from("b")]).matches_str("b"));
    assert!(!Value::from("A").matches_str("a"));
}

// =============================================================================
// Record
// =============================================================================

#[test]
fn test_record_nested_path() {
    let record = Record::new().set(
        "address",
        Value::from(serde_json::json!({ "city": "Oslo", "zip": { "code": "0150" } })),
    );
    assert_eq!(record.field("address.city"), Value::from("Oslo"));
    assert_eq!(record.field("address.zip.code"), Value::from("0150"));
    assert_eq!(record.field("address.country"), Value::Null);
}

#[test]
fn test_record_merge_overwrites() {
    let mut record = Record::new().set("name", "Ada").set("role", "admin");
    record.merge([("name".to_string(), Value::from("Grace"))].into_iter().collect());
    assert_eq!(record.field("name"), Value::from("Grace"));
    assert_eq!(record.field("role"), Value::from("admin"));
}

// =============================================================================
// Identity
// =============================================================================

#[test]
fn test_row_id_normalizes_numbers() {
    assert_eq!(RowId::from(9i64), RowId::from("9"));
    assert_eq!(RowId::from_value(&Value::from(9.0)), Some(RowId::from("9")));
    assert_eq!(RowId::from_value(&Value::from("")), None);
    assert_eq!(RowId::from_value(&Value::Null), None);
}

#[test]
fn test_identity_field_or_uuid() {
    let identity: Identity<Record> = Identity::field_or_uuid("id");

    let with_id = Record::new().set("id", 7i64).set("uuid", "abc");
    let with_uuid = Record::new().set("uuid", "abc");
    let without = Record::new().set("name", "x");

    assert_eq!(identity.of(&with_id), Some(RowId::from("7")));
    assert_eq!(identity.of(&with_uuid), Some(RowId::from("abc")));
    assert_eq!(identity.of(&without), None);
}

#[test]
fn test_identity_closure() {
    let identity = Identity::new(|row: &(u32, String)| Some(RowId::from(row.1.as_str())));
    assert_eq!(identity.of(&(1, "k1".to_string())), Some(RowId::from("k1")));
}

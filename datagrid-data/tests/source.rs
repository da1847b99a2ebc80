//! Tests for the in-memory source and source errors.

use std::time::Duration;

use datagrid_data::source::IdStrategy;
use datagrid_data::{DataSource, FieldAccess, MemorySource, Record, RowId, SourceError, SourceOp, Value};

fn seeded() -> MemorySource {
    MemorySource::new("id").with_records(vec![
        Record::new().set("id", "1").set("name", "Ada"),
        Record::new().set("id", "2").set("name", "Grace"),
    ])
}

fn values(pairs: &[(&str, &str)]) -> datagrid_data::FieldValues {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(*v)))
        .collect()
}

// =============================================================================
// MemorySource
// =============================================================================

#[tokio::test]
async fn test_list_returns_seeded_records() {
    let source = seeded();
    let rows = source.list().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(source.calls(SourceOp::List), 1);
}

#[tokio::test]
async fn test_create_assigns_next_sequential_id() {
    let source = seeded();
    let created = source.create(values(&[("name", "Linus")])).await.unwrap();

    assert_eq!(source.identity().of(&created), Some(RowId::from("3")));
    assert_eq!(source.snapshot().await.len(), 3);
}

#[tokio::test]
async fn test_create_with_uuid_strategy() {
    let source = MemorySource::new("id").with_id_strategy(IdStrategy::Uuid);
    let created = source.create(values(&[("name", "x")])).await.unwrap();
    let id = source.identity().of(&created).unwrap();
    assert_eq!(id.as_str().len(), 36);
}

#[tokio::test]
async fn test_update_merges_and_keeps_id() {
    let source = seeded();
    let id = RowId::from("2");
    let updated = source
        .update(&id, values(&[("name", "Grace H."), ("id", "99")]))
        .await
        .unwrap();

    assert_eq!(updated.field("name"), Value::from("Grace H."));
    assert_eq!(updated.field("id"), Value::from("2"));
}

#[tokio::test]
async fn test_update_unknown_row_is_404() {
    let source = seeded();
    let err = source.update(&RowId::from("42"), values(&[])).await.unwrap_err();
    assert_eq!(err.status_code(), Some(404));
}

#[tokio::test]
async fn test_remove() {
    let source = seeded();
    source.remove(&RowId::from("1")).await.unwrap();
    assert_eq!(source.snapshot().await.len(), 1);
    assert!(source.remove(&RowId::from("1")).await.is_err());
    assert_eq!(source.calls(SourceOp::Remove), 2);
}

#[tokio::test]
async fn test_fail_next_fails_once() {
    let source = seeded();
    source.fail_next(SourceOp::List, SourceError::rejected("offline"));

    assert_eq!(source.list().await, Err(SourceError::rejected("offline")));
    assert!(source.list().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_latency_delays_calls() {
    let source = seeded().with_latency(Duration::from_millis(300));
    let started = tokio::time::Instant::now();
    source.list().await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(300));
}

// =============================================================================
// SourceError
// =============================================================================

#[test]
fn test_message_prefers_explicit_message() {
    let err = SourceError::http(422, "Email already taken");
    assert_eq!(err.message_or("Save failed"), "Email already taken");
}

#[test]
fn test_message_from_payload() {
    let nested = SourceError::http_with_payload(
        400,
        serde_json::json!({ "data": { "message": "Name is reserved" } }),
    );
    assert_eq!(nested.message_or("Save failed"), "Name is reserved");

    let flat = SourceError::http_with_payload(
        400,
        serde_json::json!({ "message": "Bad input", "code": "E_INPUT" }),
    );
    assert_eq!(flat.message_or("Save failed"), "Bad input");
    assert!(matches!(flat, SourceError::Http { code: Some(ref c), .. } if c == "E_INPUT"));
}

#[test]
fn test_message_falls_back() {
    assert_eq!(SourceError::http(500, "").message_or("Delete failed"), "Delete failed");
    assert_eq!(SourceError::Unexpected(None).message_or("Delete failed"), "Delete failed");
    assert_eq!(SourceError::Cancelled.message_or("Delete failed"), "Delete failed");
    assert_eq!(SourceError::rejected("  ").message_or("Delete failed"), "Delete failed");
}

#[test]
fn test_error_predicates() {
    assert!(SourceError::http(401, "expired").is_auth());
    assert!(SourceError::Cancelled.is_cancelled());
    assert_eq!(SourceError::rejected("x").status_code(), None);
}

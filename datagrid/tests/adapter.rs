//! Tests for the CRUD adapter and grids bound to a data source.

use std::sync::Arc;
use std::time::Duration;

use datagrid::prelude::*;

fn source() -> Arc<MemorySource> {
    Arc::new(MemorySource::new("id").with_records(vec![
        Record::new().set("id", "7").set("name", "Ada"),
        Record::new().set("id", "8").set("name", "Grace"),
    ]))
}

fn columns() -> Vec<Column<Record>> {
    vec![Column::field("name", "Name").editor(EditorSpec::text().required())]
}

fn bound_grid(source: Arc<MemorySource>) -> DataGrid<Record> {
    let adapter = CrudAdapter::<Record>::new(source);
    DataGrid::builder(columns(), adapter.identity())
        .config(GridConfig::new("People"))
        .adapter(adapter)
        .build()
        .unwrap()
}

// =============================================================================
// Adapter
// =============================================================================

#[tokio::test]
async fn test_refetch_populates_state() {
    let adapter = CrudAdapter::<Record>::new(source());
    assert!(adapter.state().is_idle());

    let rows = adapter.refetch().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(adapter.rows().len(), 2);
    assert!(adapter.state().is_ready());
}

#[tokio::test]
async fn test_load_rows_uses_cache() {
    let source = source();
    let adapter = CrudAdapter::<Record>::new(source.clone());
    adapter.load_rows().await.unwrap();
    adapter.load_rows().await.unwrap();
    assert_eq!(source.calls(SourceOp::List), 1);
}

#[tokio::test(start_paused = true)]
async fn test_newer_fetch_supersedes_older() {
    let source = Arc::new(
        MemorySource::new("id")
            .with_records(vec![Record::new().set("id", "1")])
            .with_latency(Duration::from_millis(50)),
    );
    let adapter = CrudAdapter::<Record>::new(source.clone());

    let (first, second) = tokio::join!(adapter.refetch(), adapter.refetch());
    assert_eq!(first, Err(SourceError::Cancelled));
    assert_eq!(second.map(|rows| rows.len()), Ok(1));
    assert!(adapter.state().is_ready());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_in_flight() {
    let source = Arc::new(MemorySource::new("id").with_latency(Duration::from_millis(50)));
    let adapter = CrudAdapter::<Record>::new(source.clone());

    let fetching = adapter.clone();
    let (result, ()) = tokio::join!(fetching.refetch(), async {
        tokio::task::yield_now().await;
        adapter.shutdown();
    });

    assert_eq!(result, Err(SourceError::Cancelled));
    assert!(!adapter.state().is_loading());
    assert!(adapter.is_shut_down());
    assert_eq!(
        adapter.create(FieldValues::new()).await.unwrap_err(),
        SourceError::Cancelled
    );
    assert_eq!(source.calls(SourceOp::Create), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_settles_grid_loading() {
    let source = Arc::new(
        MemorySource::new("id")
            .with_records(vec![Record::new().set("id", "1")])
            .with_latency(Duration::from_millis(50)),
    );
    let adapter = CrudAdapter::<Record>::new(source);
    let grid = DataGrid::builder(columns(), adapter.identity())
        .adapter(adapter.clone())
        .build()
        .unwrap();

    let ((), ()) = tokio::join!(grid.load(), async {
        tokio::task::yield_now().await;
        adapter.shutdown();
    });

    assert!(adapter.state().is_idle());
    assert!(!adapter.is_loading());
    assert!(!grid.is_loading());
    assert!(!grid.status().loading);
    assert!(grid.error_banner().is_none());
}

#[tokio::test]
async fn test_mutation_refetches_list() {
    let source = source();
    let adapter = CrudAdapter::<Record>::new(source.clone());
    adapter.refetch().await.unwrap();

    let mut values = FieldValues::new();
    values.insert("name".to_string(), Value::from("Linus"));
    let created = adapter.create(values).await.unwrap();

    assert_eq!(adapter.identity().of(&created), Some(RowId::from("9")));
    assert_eq!(source.calls(SourceOp::List), 2);
    assert_eq!(adapter.rows().len(), 3);
}

#[tokio::test]
async fn test_invalidation_can_be_disabled() {
    let source = source();
    let adapter = CrudAdapter::<Record>::with_invalidation(source.clone(), InvalidateOnSuccess::none());
    adapter.refetch().await.unwrap();

    adapter.remove(&RowId::from("7")).await.unwrap();
    assert_eq!(source.calls(SourceOp::List), 1);
    assert_eq!(adapter.rows().len(), 2);
}

#[tokio::test]
async fn test_failed_mutation_does_not_refetch() {
    let source = source();
    let adapter = CrudAdapter::<Record>::new(source.clone());
    source.fail_next(SourceOp::Update, SourceError::rejected("locked"));

    let err = adapter
        .update(&RowId::from("7"), FieldValues::new())
        .await
        .unwrap_err();
    assert_eq!(err, SourceError::rejected("locked"));
    assert_eq!(source.calls(SourceOp::List), 0);
}

// =============================================================================
// Bound grid
// =============================================================================

#[tokio::test]
async fn test_grid_loads_through_adapter() {
    let grid = bound_grid(source());
    assert!(grid.status().empty);

    grid.load().await;
    assert_eq!(grid.rows().len(), 2);
    assert!(!grid.is_loading());
    assert!(grid.error_banner().is_none());
}

#[tokio::test]
async fn test_load_error_banner_and_retry() {
    let source = source();
    source.fail_next(
        SourceOp::List,
        SourceError::http_with_payload(503, serde_json::json!({ "message": "Maintenance" })),
    );
    let grid = bound_grid(source.clone());

    grid.load().await;
    let banner = grid.error_banner().unwrap();
    assert_eq!(banner.message, "Maintenance");
    assert!(banner.can_retry);
    assert!(!grid.status().can_add);

    grid.retry().await;
    assert!(grid.error_banner().is_none());
    assert_eq!(grid.rows().len(), 2);
    assert_eq!(source.calls(SourceOp::List), 2);
}

#[tokio::test]
async fn test_create_through_adapter() {
    let source = source();
    let grid = bound_grid(source.clone());
    grid.load().await;

    grid.start_create().unwrap();
    grid.form().unwrap().set_value("name", Value::from("X"));
    let outcome = grid.submit().await.unwrap();

    assert!(outcome.is_saved());
    assert!(grid.edit_state().is_idle());
    let row = grid.row(&RowId::from("9")).unwrap();
    assert_eq!(row.field("name"), Value::from("X"));
    assert_eq!(source.calls(SourceOp::Create), 1);
}

#[tokio::test]
async fn test_update_through_adapter() {
    let source = source();
    let grid = bound_grid(source.clone());
    grid.load().await;

    grid.start_edit(&RowId::from("7")).unwrap();
    grid.form().unwrap().set_value("name", Value::from("Ada Lovelace"));
    assert!(grid.submit().await.unwrap().is_saved());

    assert_eq!(source.calls(SourceOp::Update), 1);
    assert_eq!(
        grid.row(&RowId::from("7")).unwrap().field("name"),
        Value::from("Ada Lovelace")
    );
}

//! Tests for confirmed deletes and row actions.

use std::sync::{Arc, Mutex};

use datagrid::prelude::*;

fn source() -> Arc<MemorySource> {
    Arc::new(MemorySource::new("id").with_records(vec![
        Record::new().set("id", "1").set("name", "Ada"),
        Record::new().set("id", "2").set("name", "Grace"),
    ]))
}

fn grid(source: Arc<MemorySource>, errors: Arc<Mutex<Vec<SourceError>>>) -> DataGrid<Record> {
    let adapter = CrudAdapter::<Record>::new(source);
    DataGrid::builder(vec![Column::field("name", "Name")], adapter.identity())
        .adapter(adapter)
        .on_error(move |e| errors.lock().unwrap().push(e.clone()))
        .build()
        .unwrap()
}

/// Answer the confirmation dialog once it opens.
async fn answer(dialog: &ConfirmDialog, confirmed: bool) {
    while !dialog.is_open() {
        tokio::task::yield_now().await;
    }
    let options = dialog.options().unwrap();
    assert_eq!(options.title, "Delete this item?");
    assert!(options.destructive);
    dialog.resolve(confirmed);
}

#[tokio::test]
async fn test_declined_delete_never_calls_remove() {
    let source = source();
    let grid = grid(source.clone(), Arc::default());
    grid.load().await;

    let id = RowId::from("1");
    let (outcome, ()) = tokio::join!(
        grid.request_delete(&id),
        answer(grid.confirm_dialog(), false)
    );

    assert_eq!(outcome, Ok(DeleteOutcome::Declined));
    assert_eq!(source.calls(SourceOp::Remove), 0);
    assert_eq!(grid.rows().len(), 2);
}

#[tokio::test]
async fn test_confirmed_delete_calls_remove_once() {
    let source = source();
    let grid = grid(source.clone(), Arc::default());
    grid.load().await;

    let id = RowId::from("1");
    grid.click_row(&id).unwrap();
    grid.toggle_expanded(&id);

    let (outcome, ()) = tokio::join!(
        grid.request_delete(&id),
        answer(grid.confirm_dialog(), true)
    );

    assert_eq!(outcome, Ok(DeleteOutcome::Deleted));
    assert_eq!(source.calls(SourceOp::Remove), 1);
    assert!(grid.row(&id).is_none());
    assert_eq!(grid.selected(), None);
    assert!(!grid.is_expanded(&id));
}

#[tokio::test]
async fn test_failed_delete_reports_to_sink() {
    let source = source();
    let errors: Arc<Mutex<Vec<SourceError>>> = Arc::default();
    let grid = grid(source.clone(), errors.clone());
    grid.load().await;
    source.fail_next(SourceOp::Remove, SourceError::http(500, ""));

    let id = RowId::from("2");
    let (outcome, ()) = tokio::join!(
        grid.request_delete(&id),
        answer(grid.confirm_dialog(), true)
    );

    assert_eq!(outcome, Ok(DeleteOutcome::Failed("Delete failed".to_string())));
    assert_eq!(*errors.lock().unwrap(), vec![SourceError::http(500, "")]);
    assert!(grid.row(&id).is_some());
}

#[tokio::test]
async fn test_escape_declines_open_confirmation() {
    let source = source();
    let grid = grid(source.clone(), Arc::default());
    grid.load().await;

    let id = RowId::from("1");
    let escape = async {
        while !grid.confirm_dialog().is_open() {
            tokio::task::yield_now().await;
        }
        assert!(grid.escape());
    };
    let (outcome, ()) = tokio::join!(grid.request_delete(&id), escape);

    assert_eq!(outcome, Ok(DeleteOutcome::Declined));
    assert_eq!(source.calls(SourceOp::Remove), 0);
}

#[tokio::test]
async fn test_deleting_edited_row_closes_session() {
    let source = source();
    let adapter = CrudAdapter::<Record>::new(source.clone());
    let cancels = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&cancels);
    let grid = DataGrid::builder(vec![Column::field("name", "Name")], adapter.identity())
        .config(GridConfig::new("People").edit_container(EditContainerKind::Inline))
        .adapter(adapter)
        .on_cancel_edit(move || *counter.lock().unwrap() += 1)
        .build()
        .unwrap();
    grid.load().await;

    let id = RowId::from("1");
    grid.start_edit(&id).unwrap();
    assert_eq!(grid.edit_surface(), EditSurface::InlineBelow(id.clone()));

    let (outcome, ()) = tokio::join!(
        grid.request_delete(&id),
        answer(grid.confirm_dialog(), true)
    );

    assert_eq!(outcome, Ok(DeleteOutcome::Deleted));
    assert!(grid.edit_state().is_idle());
    assert_eq!(grid.edit_surface(), EditSurface::Hidden);
    assert!(grid.form().is_none());
    assert_eq!(*cancels.lock().unwrap(), 1);
    assert_eq!(grid.submit().await.unwrap_err(), GridError::NoSession);
    assert_eq!(source.calls(SourceOp::Update), 0);
}

#[tokio::test]
async fn test_deleting_other_row_keeps_session() {
    let grid = grid(source(), Arc::default());
    grid.load().await;
    grid.start_edit(&RowId::from("2")).unwrap();

    let id = RowId::from("1");
    let (outcome, ()) = tokio::join!(
        grid.request_delete(&id),
        answer(grid.confirm_dialog(), true)
    );

    assert_eq!(outcome, Ok(DeleteOutcome::Deleted));
    assert_eq!(grid.edit_state(), EditState::Editing(RowId::from("2")));
}

#[tokio::test]
async fn test_delete_unknown_row() {
    let grid = grid(source(), Arc::default());
    grid.load().await;
    assert_eq!(
        grid.request_delete(&RowId::from("404")).await,
        Err(GridError::UnknownRow(RowId::from("404")))
    );
    assert!(!grid.confirm_dialog().is_open());
}

#[test]
fn test_row_actions_follow_wired_callbacks() {
    let edit_only = FnPersistence::<Record>::new()
        .on_persist(|_, values, _| async move { Ok(Record::from_fields(values)) });
    let grid = DataGrid::builder(vec![Column::field("name", "Name")], Identity::field("id"))
        .persistence(edit_only)
        .build()
        .unwrap();

    let actions: Vec<RowAction> = grid.row_actions().iter().map(|b| b.action).collect();
    assert_eq!(actions, vec![RowAction::Edit]);
    assert_eq!(grid.action_column().header(), "");

    let inline = DataGrid::builder(vec![Column::field("name", "Name")], Identity::field("id"))
        .config(GridConfig::new("x").actions(ActionPresentation::Inline))
        .persistence(FnPersistence::<Record>::new())
        .build()
        .unwrap();
    assert!(inline.row_actions().is_empty());
    assert_eq!(inline.action_column().header(), "Actions");
}

//! Tests for sorting, filtering, paging, layout, windowing and column prefs.

use std::sync::Arc;
use std::time::Duration;

use datagrid::column::ACTIONS_COLUMN_ID;
use datagrid::prefs::{PrefsStore, normalize_order};
use datagrid::prelude::*;

fn columns() -> Vec<Column<Record>> {
    vec![
        Column::field("name", "Name")
            .size(200)
            .filter(FilterSpec::text()),
        Column::field("role", "Role")
            .size(120)
            .filter(FilterSpec::select(vec![
                SelectOption::new("admin", "Admin"),
                SelectOption::new("user", "User"),
            ]))
            .editor(EditorSpec::select(vec![
                SelectOption::new("admin", "Admin"),
                SelectOption::new("user", "User"),
            ])),
        Column::field("age", "Age").size(80).min_size(60).max_size(300),
    ]
}

fn people(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            Record::new()
                .set("id", i as i64)
                .set("name", format!("Person {i:05}"))
                .set("role", if i % 3 == 0 { "admin" } else { "user" })
                .set("age", (20 + i % 50) as i64)
        })
        .collect()
}

fn grid(rows: Vec<Record>) -> DataGrid<Record> {
    DataGrid::builder(columns(), Identity::field("id"))
        .config(GridConfig::new("People"))
        .rows(rows)
        .build()
        .unwrap()
}

// =============================================================================
// Sorting, filtering, paging
// =============================================================================

#[test]
fn test_sort_cycles_and_resets_page() {
    let grid = grid(people(30));
    grid.set_page_index(2);
    assert_eq!(grid.page_summary().page_index, 2);

    grid.toggle_sort("age", false).unwrap();
    assert_eq!(grid.sorting(), vec![SortEntry::asc("age")]);
    assert_eq!(grid.page_summary().page_index, 0);

    grid.toggle_sort("age", false).unwrap();
    assert_eq!(grid.sorting(), vec![SortEntry::desc("age")]);
    let first = grid.page_rows()[0].field("age");
    assert_eq!(first, Value::from(49i64));

    grid.toggle_sort("age", false).unwrap();
    assert!(grid.sorting().is_empty());
}

#[test]
fn test_toggle_sort_unknown_column() {
    let grid = grid(people(3));
    assert_eq!(
        grid.toggle_sort("salary", false),
        Err(GridError::UnknownColumn("salary".to_string()))
    );
}

#[test]
fn test_filter_resets_page() {
    let grid = grid(people(30));
    grid.next_page();
    assert_eq!(grid.page_summary().page_index, 1);

    grid.set_filter("role", Some(FilterValue::Select("admin".to_string())))
        .unwrap();
    let summary = grid.page_summary();
    assert_eq!(summary.page_index, 0);
    assert_eq!(summary.total, 10);
    assert!(grid.page_rows().iter().all(|r| r.field("role") == Value::from("admin")));
}

#[test]
fn test_page_size_change_keeps_first_row() {
    let grid = grid(people(100));
    grid.set_page_size(10);
    grid.set_page_index(3);
    let first = grid.page_rows()[0].clone();

    grid.set_page_size(20);
    assert_eq!(grid.page_summary().page_index, 1);
    assert!(grid.page_rows().contains(&first));
}

#[test]
fn test_page_summary_label() {
    let grid = grid(people(25));
    assert_eq!(grid.page_summary().label(), "1 to 10 of 25");
    grid.last_page();
    assert_eq!(grid.page_summary().label(), "21 to 25 of 25");
    assert!(!grid.page_summary().can_next);

    let empty = self::grid(Vec::new());
    assert_eq!(empty.page_summary().label(), "No results");
}

#[tokio::test(start_paused = true)]
async fn test_text_filter_is_debounced() {
    let grid = grid(people(30));

    grid.type_filter("name", "Person 0000").unwrap();
    assert_eq!(grid.pending_filter("name").as_deref(), Some("Person 0000"));
    assert!(grid.filters().is_empty());
    assert!(!grid.flush_filters());

    tokio::time::advance(Duration::from_millis(100)).await;
    grid.type_filter("name", "Person 00001").unwrap();

    tokio::time::advance(Duration::from_millis(200)).await;
    assert!(!grid.flush_filters());

    grid.settle_filters().await;
    assert_eq!(
        grid.filters().get("name"),
        Some(&FilterValue::Text("Person 00001".to_string()))
    );
    assert_eq!(grid.page_summary().total, 1);
    assert_eq!(grid.pending_filter("name"), None);
}

#[tokio::test(start_paused = true)]
async fn test_set_filter_cancels_pending_text() {
    let grid = grid(people(5));
    grid.type_filter("name", "Person").unwrap();
    grid.set_filter("name", None).unwrap();

    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(!grid.flush_filters());
    assert!(grid.filters().is_empty());
}

// =============================================================================
// Layout
// =============================================================================

#[test]
fn test_layout_fills_container() {
    let grid = grid(people(3));
    assert!(grid.observe_container_width(1000));

    let layout = grid.layout();
    assert_eq!(layout.width_of("name"), Some(200));
    assert_eq!(layout.width_of("role"), Some(120));
    assert_eq!(layout.width_of("age"), Some(680));
    assert_eq!(layout.table_width, 1000);
    assert_eq!(layout.width_of(ACTIONS_COLUMN_ID), None);
}

#[test]
fn test_layout_overflows_narrow_container() {
    let grid = grid(people(3));
    grid.observe_container_width(300);

    let layout = grid.layout();
    assert_eq!(layout.width_of("age"), Some(80));
    assert_eq!(layout.table_width, 400);
}

#[tokio::test(start_paused = true)]
async fn test_container_width_is_frame_throttled() {
    let grid = grid(people(3));
    assert!(grid.observe_container_width(900));
    assert!(!grid.observe_container_width(950));
    assert_eq!(grid.container_width(), 900);

    grid.settle_layout().await;
    assert_eq!(grid.container_width(), 950);
}

#[test]
fn test_resize_clamps_and_persists() {
    let store = Arc::new(MemoryPrefsStore::new());
    let grid = DataGrid::builder(columns(), Identity::field("id"))
        .config(GridConfig::new("People"))
        .prefs_store(store.clone())
        .build()
        .unwrap();

    assert!(grid.begin_resize("age", 500).unwrap());
    assert_eq!(grid.drag_resize(540), Some(120));
    assert_eq!(grid.drag_resize(100), Some(60));
    assert_eq!(grid.drag_resize(2000), Some(300));
    grid.end_resize();
    assert_eq!(grid.drag_resize(600), None);

    assert_eq!(grid.column_width("age"), Some(300));
    let raw = store.load("dg:people").unwrap();
    assert!(raw.contains("\"columnSizing\""));

    grid.reset_column_size("age");
    assert_eq!(grid.column_width("age"), Some(80));
}

#[test]
fn test_header_cells() {
    let grid = grid(people(3));
    grid.toggle_sort("name", false).unwrap();
    let header = grid.header();

    let ids: Vec<&str> = header.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["name", "role", "age", ACTIONS_COLUMN_ID]);
    assert_eq!(header[0].sort, Some(SortDirection::Asc));
    assert_eq!(header[3].width, 0);
}

#[test]
fn test_tooltip_and_mobile_flags() {
    let grid = DataGrid::builder(
        vec![
            Column::field("name", "Name").tooltip(),
            Column::field("role", "Role").hide_on_mobile(),
        ],
        Identity::field("id"),
    )
    .rows(vec![Record::new().set("id", "1").set("name", "Ada").set("role", "admin")])
    .build()
    .unwrap();
    grid.set_viewport_height(200);

    let header = grid.header();
    assert!(header[0].tooltip && !header[0].hide_on_mobile);
    assert!(!header[1].tooltip && header[1].hide_on_mobile);

    let window = grid.window();
    assert_eq!(window.rows[0].tooltips, vec![Some("Ada".to_string()), None]);
}

// =============================================================================
// Column prefs
// =============================================================================

#[test]
fn test_order_normalization_is_idempotent() {
    let declared: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
    let stored: Vec<String> = ["c", "zombie", ACTIONS_COLUMN_ID, "c", "a"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let once = normalize_order(&stored, &declared);
    assert_eq!(once, vec!["c", "a", "b", ACTIONS_COLUMN_ID]);
    assert_eq!(normalize_order(&once, &declared), once);
}

#[test]
fn test_prefs_survive_rebuild() {
    let store: Arc<MemoryPrefsStore> = Arc::new(MemoryPrefsStore::new());
    let build = || {
        DataGrid::builder(columns(), Identity::field("id"))
            .config(GridConfig::new("Team").storage_key("team-grid"))
            .prefs_store(store.clone())
            .build()
            .unwrap()
    };

    let first = build();
    first.move_column("age", 0);
    first.set_column_visible("role", false).unwrap();

    let second = build();
    assert_eq!(second.storage_key(), "team-grid");
    assert_eq!(second.column_order(), vec!["age", "name", "role", ACTIONS_COLUMN_ID]);
    assert!(!second.is_column_visible("role"));
    let visible: Vec<String> = second.visible_columns().into_iter().map(|c| c.id).collect();
    assert_eq!(visible, vec!["age", "name"]);
}

#[test]
fn test_unreadable_prefs_fall_back() {
    let store = Arc::new(MemoryPrefsStore::new());
    store.save("dg:people", "{not json".to_string());

    let grid = DataGrid::builder(columns(), Identity::field("id"))
        .config(GridConfig::new("People"))
        .prefs_store(store)
        .build()
        .unwrap();
    assert_eq!(grid.column_order(), vec!["name", "role", "age", ACTIONS_COLUMN_ID]);
}

#[test]
fn test_set_columns_renormalizes() {
    let grid = grid(people(3));
    grid.set_columns(vec![
        Column::field("age", "Age"),
        Column::field("email", "Email"),
    ]);
    assert_eq!(grid.column_order(), vec!["age", "email", ACTIONS_COLUMN_ID]);
}

// =============================================================================
// Window
// =============================================================================

#[test]
fn test_window_bounded_for_large_pages() {
    let grid = DataGrid::builder(columns(), Identity::field("id"))
        .config(GridConfig::new("Big").without_pagination())
        .rows(people(100_000))
        .build()
        .unwrap();
    grid.set_viewport_height(440);
    grid.scroll_to(44 * 50_000);

    let window = grid.window();
    // 10 visible rows plus 10 overscan on each side.
    assert!(window.rows.len() <= 30);
    assert_eq!(window.rows.first().map(|r| r.index), Some(49_990));
    assert_eq!(window.range.total_height, 44 * 100_000);
    assert_eq!(
        window.range.padding_top + window.rows.len() as u64 * 44 + window.range.padding_bottom,
        window.range.total_height
    );
}

#[test]
fn test_window_cells_use_option_labels() {
    let grid = grid(people(3));
    grid.set_viewport_height(200);
    let window = grid.window();
    assert_eq!(window.rows[0].cells, vec!["Person 00000", "Admin", "20"]);
    assert_eq!(window.rows[1].cells[1], "User");
}

#[test]
fn test_expanded_rows_add_height() {
    let grid = DataGrid::builder(columns(), Identity::field("id"))
        .config(GridConfig::new("People").detail_height(100))
        .rows(people(5))
        .build()
        .unwrap();
    grid.set_viewport_height(1000);

    let id = RowId::from("1");
    assert!(grid.toggle_expanded(&id));
    let window = grid.window();
    assert_eq!(window.range.total_height, 5 * 44 + 100);
    assert!(window.rows[1].expanded);
    assert_eq!(window.rows[1].item.size, 144);

    grid.report_detail_height(&id, 60);
    assert_eq!(grid.window().range.total_height, 5 * 44 + 60);

    assert!(!grid.toggle_expanded(&id));
    assert_eq!(grid.window().range.total_height, 5 * 44);
}

#[test]
fn test_scroll_to_row() {
    let grid = DataGrid::builder(columns(), Identity::field("id"))
        .config(GridConfig::new("Big").without_pagination())
        .rows(people(1000))
        .build()
        .unwrap();
    grid.set_viewport_height(440);

    assert!(grid.scroll_to_row(&RowId::from("500")));
    let window = grid.window();
    assert!(window.rows.iter().any(|r| r.id == Some(RowId::from("500"))));
    assert!(!grid.scroll_to_row(&RowId::from("5000")));
}

#[test]
fn test_window_reads_leave_grid_clean() {
    let grid = grid(people(5));
    grid.set_viewport_height(200);
    grid.clear_dirty();

    let _ = grid.window();
    assert!(!grid.is_dirty());
    assert!(!grid.scroll_to_row(&RowId::from("404")));
    assert!(!grid.is_dirty());

    assert!(grid.scroll_to_row(&RowId::from("3")));
    assert!(grid.is_dirty());
}

// =============================================================================
// Selection and status
// =============================================================================

#[test]
fn test_click_row_toggles_selection() {
    let clicked = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&clicked);
    let grid = DataGrid::builder(columns(), Identity::field("id"))
        .rows(people(3))
        .on_row_click(move |row, id| {
            sink.lock().unwrap().push((row.field("name"), id.cloned()));
        })
        .build()
        .unwrap();

    let id = RowId::from("2");
    grid.click_row(&id).unwrap();
    assert_eq!(grid.selected(), Some(id.clone()));
    grid.click_row(&id).unwrap();
    assert_eq!(grid.selected(), None);

    assert_eq!(clicked.lock().unwrap().len(), 2);
    assert_eq!(
        clicked.lock().unwrap()[0],
        (Value::from("Person 00002"), Some(id))
    );
}

#[test]
fn test_status_states() {
    let grid = grid(Vec::new());
    assert!(grid.status().empty);

    grid.set_loading(true);
    let status = grid.status();
    assert!(status.loading);
    assert_eq!(status.skeleton_rows, 3);
    assert!(!status.empty);

    grid.set_loading(false);
    grid.set_load_error(Some(SourceError::Unexpected(None)));
    let banner = grid.error_banner().unwrap();
    assert_eq!(banner.message, "Failed to load data");
    assert!(!banner.can_retry);
    assert!(!grid.status().empty);
}

#[test]
fn test_invalid_config_is_rejected() {
    let result = DataGrid::builder(columns(), Identity::field("id"))
        .config(GridConfig::new("Bad").row_height(0))
        .build();
    assert!(matches!(result, Err(GridError::InvalidConfig(_))));
}

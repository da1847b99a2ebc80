//! Tests for the schema-driven form: fields, layout groups, controls and
//! validation timing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use datagrid::form::{FormSections, form_fields, partition};
use datagrid::prelude::*;

fn schema() -> Arc<dyn Schema> {
    Arc::new(
        RuleSchema::builder()
            .field("name")
            .required("Name is required")
            .min_length(2, "Name must be at least 2 characters")
            .build(),
    )
}

fn create_form(columns: &[Column<Record>]) -> Form {
    Form::for_session(EditMode::Create, None, columns, schema())
}

fn keys(fields: &[datagrid::form::FieldSlot]) -> Vec<(&str, u8)> {
    fields.iter().map(|f| (f.key.as_str(), f.span)).collect()
}

// =============================================================================
// Fields
// =============================================================================

#[test]
fn test_form_fields_skip_hidden_and_sort_by_order() {
    let columns: Vec<Column<Record>> = vec![
        Column::field("city", "City").editor(EditorSpec::text().order(3)),
        Column::field("bio", "Bio").editor(EditorSpec::textarea()),
        Column::field("secret", "Secret").editor(EditorSpec::text().hidden_in_form()),
        Column::field("name", "Name").editor(EditorSpec::text().order(1)),
        Column::field("created", "Created"),
        Column::field("notes", "Notes").editor(EditorSpec::text()),
    ];

    let fields = form_fields(&columns);
    let keys: Vec<&str> = fields.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(keys, vec!["name", "city", "bio", "notes"]);
    assert_eq!(fields[2].order(), 999);
}

#[test]
fn test_edit_values_come_through_format() {
    let columns = vec![
        Column::field("name", "Name").editor(EditorSpec::text()),
        Column::field("email", "Email").editor(
            EditorSpec::text().format(|v, _| Value::from(v.to_string().to_lowercase())),
        ),
    ];
    let row = Record::new().set("name", "Ada").set("email", "ADA@EXAMPLE.COM");

    let form = Form::for_session(EditMode::Edit, Some(&row), &columns, schema());
    assert_eq!(form.value("name"), Value::from("Ada"));
    assert_eq!(form.value("email"), Value::from("ada@example.com"));

    let create = create_form(&columns);
    assert!(create.values().is_empty());
}

// =============================================================================
// Layout
// =============================================================================

#[test]
fn test_partition_groups_fields() {
    let columns: Vec<Column<Record>> = vec![
        Column::field("name", "Name").editor(EditorSpec::text()),
        Column::field("bio", "Bio").editor(EditorSpec::textarea().span(ColSpan::Full)),
        Column::field("active", "Active").editor(EditorSpec::switch()),
        Column::field("city", "City").editor(EditorSpec::text().span(ColSpan::Four)),
        Column::field("zip", "Zip").editor(EditorSpec::text().span(ColSpan::Two)),
        Column::field("admin", "Admin").editor(EditorSpec::switch()),
    ];
    let fields = form_fields(&columns);

    let sections: FormSections = partition(&fields, &FormLayout::columns(3));
    assert_eq!(sections.columns, 3);
    assert_eq!(keys(&sections.grid), vec![("name", 1), ("city", 3), ("zip", 2)]);
    assert_eq!(keys(&sections.full_width), vec![("bio", 0)]);
    assert_eq!(keys(&sections.switches), vec![("active", 0), ("admin", 0)]);

    let single = partition(&fields, &FormLayout::columns(1));
    assert_eq!(keys(&single.grid), vec![("name", 1), ("city", 1), ("zip", 1)]);
}

#[test]
fn test_form_layout_columns_are_clamped() {
    assert_eq!(FormLayout::columns(0).columns, 1);
    assert_eq!(FormLayout::columns(9).columns, 4);
    assert_eq!(FormLayout::default().columns, 2);
}

// =============================================================================
// Controls
// =============================================================================

#[test]
fn test_control_per_editor_kind() {
    let roles = vec![SelectOption::new("admin", "Admin")];

    assert_eq!(
        EditorKind::Text.control(&Value::Null, &[]),
        Control::Text { value: String::new() }
    );
    assert_eq!(
        EditorKind::TextArea.control(&Value::from("hi"), &[]),
        Control::TextArea { value: "hi".to_string() }
    );
    assert_eq!(
        EditorKind::Number.control(&Value::from(42i64), &[]),
        Control::Number { value: Some(42.0) }
    );
    assert_eq!(
        EditorKind::Number.control(&Value::from(" 3.5 "), &[]),
        Control::Number { value: Some(3.5) }
    );
    assert_eq!(
        EditorKind::Select.control(&Value::from("admin"), &roles),
        Control::Select {
            value: "admin".to_string(),
            options: roles.clone(),
        }
    );
    assert_eq!(
        EditorKind::Switch.control(&Value::from(true), &[]),
        Control::Switch { checked: true }
    );
    assert_eq!(
        EditorKind::Switch.control(&Value::Null, &[]),
        Control::Switch { checked: false }
    );
    let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
    assert_eq!(
        EditorKind::Date.control(&Value::from(date), &[]),
        Control::Date { value: "2024-03-09".to_string() }
    );
}

#[test]
fn test_form_controls_carry_errors() {
    let columns = vec![
        Column::field("name", "Name").editor(EditorSpec::text().required()),
        Column::field("active", "Active").editor(EditorSpec::switch()),
    ];
    let form = create_form(&columns);
    form.input("active", ControlInput::Checked(true));
    form.blur("name");

    let controls = form.controls();
    assert_eq!(controls[0].id, "field-name");
    assert!(controls[0].required);
    assert_eq!(controls[0].error.as_deref(), Some("Name is required"));
    assert_eq!(controls[1].control, Control::Switch { checked: true });
    assert!(!controls[1].disabled);
}

// =============================================================================
// Validation timing
// =============================================================================

#[test]
fn test_validation_waits_for_blur() {
    let columns = vec![Column::field("name", "Name").editor(EditorSpec::text())];
    let form = create_form(&columns);

    form.set_value("name", Value::from("A"));
    assert_eq!(form.error("name"), None);
    assert!(!form.is_touched("name"));

    form.blur("name");
    assert!(form.is_touched("name"));
    assert_eq!(
        form.error("name").as_deref(),
        Some("Name must be at least 2 characters")
    );

    // Touched fields revalidate on every change.
    form.set_value("name", Value::from("Al"));
    assert_eq!(form.error("name"), None);
    form.set_value("name", Value::Null);
    assert_eq!(form.error("name").as_deref(), Some("Name is required"));
}

// =============================================================================
// Submit
// =============================================================================

#[tokio::test]
async fn test_parse_applies_to_submitted_values() {
    let columns = vec![
        Column::field("name", "Name").editor(
            EditorSpec::text().parse(|v, _| Value::from(v.as_str().unwrap_or_default().trim())),
        ),
        Column::field("slug", "Slug").editor(EditorSpec::text().parse(|_, values| {
            let name = values.get("name").and_then(Value::as_str).unwrap_or_default();
            Value::from(name.trim().to_lowercase().replace(' ', "-"))
        })),
    ];
    let form = create_form(&columns);
    form.set_value("name", Value::from("  Ada Lovelace  "));

    let outcome = form
        .submit(|values| async move { Ok::<_, SourceError>(values) })
        .await;

    let SubmitOutcome::Saved(sent) = outcome else {
        panic!("expected a saved outcome, got {outcome:?}");
    };
    assert_eq!(sent["name"], Value::from("Ada Lovelace"));
    assert_eq!(sent["slug"], Value::from("ada-lovelace"));
    // The form keeps the raw input.
    assert_eq!(form.value("name"), Value::from("  Ada Lovelace  "));
}

#[tokio::test]
async fn test_invalid_submit_skips_persist() {
    let columns = vec![Column::field("name", "Name").editor(EditorSpec::text())];
    let form = create_form(&columns);

    let persisted = AtomicBool::new(false);
    let outcome = form
        .submit(|_| async {
            persisted.store(true, Ordering::SeqCst);
            Ok::<_, SourceError>(())
        })
        .await;

    assert!(matches!(outcome, SubmitOutcome::Invalid(_)));
    assert!(!persisted.load(Ordering::SeqCst));
    assert_eq!(form.error("name").as_deref(), Some("Name is required"));
    assert!(!form.is_submitting());
}

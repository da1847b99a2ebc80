use std::fs::File;
use std::sync::Arc;
use std::time::Duration;

use datagrid::prelude::*;
use simplelog::{Config, LevelFilter, WriteLogger};

fn columns() -> Vec<Column<Record>> {
    let roles = vec![
        SelectOption::new("admin", "Admin"),
        SelectOption::new("editor", "Editor"),
        SelectOption::new("viewer", "Viewer"),
    ];
    vec![
        Column::field("name", "Name")
            .size(180)
            .filter(FilterSpec::text().placeholder("Search names"))
            .editor(EditorSpec::text().required().order(1)),
        Column::field("email", "Email")
            .size(220)
            .tooltip()
            .editor(EditorSpec::text().required().order(2)),
        Column::field("role", "Role")
            .size(120)
            .filter(FilterSpec::select(roles.clone()))
            .editor(EditorSpec::select(roles).order(3)),
        Column::field("active", "Active")
            .size(90)
            .filter(FilterSpec::boolean())
            .editor(EditorSpec::switch()),
    ]
}

fn schema() -> RuleSchema {
    RuleSchema::builder()
        .field("name")
        .required("Name is required")
        .min_length(2, "Name must be at least 2 characters")
        .field("email")
        .required("Email is required")
        .email("Please enter a valid email")
        .build()
}

fn seed() -> Vec<Record> {
    [
        ("Ada Lovelace", "ada@example.com", "admin", true),
        ("Grace Hopper", "grace@example.com", "editor", true),
        ("Alan Turing", "alan@example.com", "viewer", false),
        ("Edsger Dijkstra", "edsger@example.com", "editor", true),
        ("Barbara Liskov", "barbara@example.com", "viewer", true),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (name, email, role, active))| {
        Record::new()
            .set("id", (i + 1) as i64)
            .set("name", name)
            .set("email", email)
            .set("role", role)
            .set("active", active)
    })
    .collect()
}

fn print_page(grid: &DataGrid<Record>) {
    let header: Vec<String> = grid
        .header()
        .into_iter()
        .filter(|c| c.width > 0)
        .map(|c| format!("{:<w$}", c.label, w = (c.width / 10) as usize))
        .collect();
    println!("{}", header.join(" "));

    for row in grid.window().rows {
        let cells: Vec<String> = row.cells.iter().map(|c| format!("{c:<18}")).collect();
        println!("{}", cells.join(" "));
    }
    println!("{}\n", grid.page_summary().label());
}

#[tokio::main]
async fn main() {
    let log_file = File::create("datagrid-demo.log").expect("Failed to create log file");
    WriteLogger::init(LevelFilter::Debug, Config::default(), log_file)
        .expect("Failed to initialize logger");

    let source = Arc::new(
        MemorySource::new("id")
            .with_records(seed())
            .with_latency(Duration::from_millis(20)),
    );
    let adapter = CrudAdapter::<Record>::new(source.clone());

    let grid = DataGrid::builder(columns(), adapter.identity())
        .config(
            GridConfig::new("Team members")
                .pagination(PaginationConfig::default().page_size(5))
                .initial_sorting(vec![SortEntry::asc("name")]),
        )
        .schema(schema())
        .adapter(adapter)
        .prefs_store(Arc::new(MemoryPrefsStore::new()))
        .on_error(|e| eprintln!("Error: {}", e.message_or("Something went wrong")))
        .build()
        .expect("Failed to build grid");

    log::info!("Starting datagrid demo");
    grid.observe_container_width(900);
    grid.set_viewport_height(400);

    println!("== {} ==", grid.title());
    grid.load().await;
    print_page(&grid);

    log::info!("Loaded {} rows", grid.rows().len());

    println!("-- filter: name contains \"an\"");
    grid.type_filter("name", "an").expect("name column exists");
    grid.settle_filters().await;
    print_page(&grid);
    grid.clear_filters();

    println!("-- create with an invalid email");
    grid.start_create().expect("add is available");
    let form = grid.form().expect("create session is open");
    form.set_value("name", Value::from("Linus Torvalds"));
    form.set_value("email", Value::from("linus"));
    if let Ok(SubmitOutcome::Invalid(result)) = grid.submit().await {
        log::info!("Create rejected with {} error(s)", result.errors().len());
        for error in result.errors() {
            println!("   {}: {}", error.field, error.message);
        }
    }

    println!("-- fix the email and save");
    form.set_value("email", Value::from("linus@example.com"));
    match grid.submit().await {
        Ok(outcome) if outcome.is_saved() => println!("   saved"),
        other => println!("   not saved: {:?}", other),
    }
    print_page(&grid);

    println!("-- delete Alan Turing");
    let id = RowId::from("3");
    let dialog = grid.confirm_dialog().clone();
    let confirm = async {
        while !dialog.is_open() {
            tokio::task::yield_now().await;
        }
        if let Some(options) = dialog.options() {
            println!("   {} [{}]", options.title, options.confirm_text);
        }
        dialog.accept();
    };
    let (outcome, ()) = tokio::join!(grid.request_delete(&id), confirm);
    log::info!("Delete outcome: {:?}", outcome);
    println!("   {:?}", outcome);
    print_page(&grid);

    println!(
        "source calls: list={} create={} remove={}",
        source.calls(SourceOp::List),
        source.calls(SourceOp::Create),
        source.calls(SourceOp::Remove)
    );
}

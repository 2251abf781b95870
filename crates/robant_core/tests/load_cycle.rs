use robant_core::{
    CancelToken, ConfigError, CycleLimits, LoadError, NoteKind, TaskSelection,
    ValidationErrorKind, WorkspaceError, WorkspaceService,
};
use std::fs;
use std::path::Path;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent dirs should be created");
    }
    fs::write(path, contents).expect("fixture file should be written");
}

#[test]
fn reload_publishes_increasing_generations() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    write(dir.path(), "home/paint.md", "---\nkind: task\nstatus: open\n---\n# Paint fence\n");

    let service = WorkspaceService::open(dir.path()).expect("workspace should open");
    assert_eq!(service.snapshot().generation, 0);
    assert!(service.snapshot().index.is_empty());

    let first = service.reload().expect("first reload should succeed");
    assert_eq!(first.generation, 1);
    assert!(first.report.is_clean());
    assert_eq!(
        service.next_task(&TaskSelection::default()).map(|task| task.id),
        Some("home/paint".to_string())
    );

    write(dir.path(), "home/mow.md", "---\nkind: task\nstatus: open\npriority: high\n---\n");
    let second = service.reload().expect("second reload should succeed");
    assert_eq!(second.generation, 2);
    assert_eq!(second.index.len(), 2);
    // Readers holding the older snapshot keep their view.
    assert_eq!(first.index.len(), 1);
    assert_eq!(
        service.next_task(&TaskSelection::default()).map(|task| task.id),
        Some("home/mow".to_string())
    );
}

#[test]
fn failed_cycle_keeps_previous_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let root = dir.path().join("hierarchy");
    write(&root, "note.md", "kept");

    let service = WorkspaceService::open(&root).expect("workspace should open");
    service.reload().expect("first reload should succeed");

    fs::remove_dir_all(&root).expect("hierarchy should be removed");
    let result = service.reload();
    assert!(matches!(
        result,
        Err(WorkspaceError::Load(LoadError::RootMissing(_)))
    ));
    let current = service.snapshot();
    assert_eq!(current.generation, 1);
    assert!(current.index.contains("note"));
}

#[test]
fn cancelled_cycle_publishes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    write(dir.path(), "a.md", "a");

    let service = WorkspaceService::open(dir.path()).expect("workspace should open");
    let cancel = CancelToken::new();
    cancel.cancel();
    let result = service.reload_with(CycleLimits::new().with_cancel(cancel));
    assert!(matches!(
        result,
        Err(WorkspaceError::Load(LoadError::Cancelled))
    ));
    assert_eq!(service.snapshot().generation, 0);
}

#[test]
fn validation_errors_are_reported_not_fatal() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    write(dir.path(), "ok.md", "---\nkind: task\nstatus: open\n---\n");
    write(dir.path(), "bad-kind.md", "---\nkind: epic\n---\n");
    write(dir.path(), "bad-date.md", "---\nkind: task\nstatus: open\ndue: someday\n---\n");
    write(dir.path(), "broken.md", "---\nkind: task\n");

    let service = WorkspaceService::open(dir.path()).expect("workspace should open");
    let snapshot = service.reload().expect("reload should succeed");

    assert_eq!(snapshot.report.notes_loaded, 4);
    assert_eq!(snapshot.index.len(), 1);
    let mut kinds: Vec<ValidationErrorKind> =
        snapshot.report.errors.iter().map(|error| error.kind).collect();
    kinds.sort();
    assert_eq!(
        kinds,
        vec![
            ValidationErrorKind::Parse,
            ValidationErrorKind::Type,
            ValidationErrorKind::UnknownKind,
        ]
    );
    let locations: Vec<String> = snapshot
        .report
        .errors
        .iter()
        .map(|error| error.location())
        .collect();
    assert!(locations.contains(&"bad-date.md".to_string()));
}

#[test]
fn config_file_drives_loader_and_validation() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    write(
        dir.path(),
        ".robant.yml",
        "loader:\n  default_kind: task\n  exclude_dirs: [archive]\nvalidation:\n  strict_fields: true\n",
    );
    write(dir.path(), "todo.md", "---\nstatus: open\nowner: kim\n---\n");
    write(dir.path(), "archive/old.md", "---\nstatus: done\n---\n");
    write(dir.path(), "LIB/kept.md", "---\nstatus: open\n---\n");

    let service = WorkspaceService::open(dir.path()).expect("workspace should open");
    let snapshot = service.reload().expect("reload should succeed");

    assert_eq!(
        snapshot.index.get("todo").map(|note| note.kind),
        Some(NoteKind::Task)
    );
    assert!(!snapshot.index.contains("archive/old"));
    assert!(snapshot.index.contains("LIB/kept"));
    assert_eq!(snapshot.report.errors.len(), 1);
    assert_eq!(
        snapshot.report.errors[0].kind,
        ValidationErrorKind::UnknownField
    );
}

#[test]
fn schema_file_replaces_builtin_schema_and_is_not_a_note() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    write(dir.path(), ".robant.yml", "schema_file: schema.yml\n");
    write(
        dir.path(),
        "schema.yml",
        "kinds:\n  plan:\n    - name: owner\n      type: string\n",
    );
    write(dir.path(), "team.md", "---\nowner: kim\n---\n");
    write(dir.path(), "solo.md", "no owner here");

    let service = WorkspaceService::open(dir.path()).expect("workspace should open");
    assert!(service.schema().resolve(NoteKind::Task).is_none());
    let snapshot = service.reload().expect("reload should succeed");

    assert!(snapshot.index.contains("team"));
    assert!(!snapshot.index.contains("schema"));
    assert_eq!(snapshot.report.notes_loaded, 2);
    assert_eq!(snapshot.report.errors.len(), 1);
    assert_eq!(snapshot.report.errors[0].note_id, "solo");
}

#[test]
fn dotted_schema_file_path_is_still_skipped() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    write(dir.path(), ".robant.yml", "schema_file: ./schema.yml\n");
    write(
        dir.path(),
        "schema.yml",
        "kinds:\n  plan:\n    - name: owner\n      type: string\n",
    );
    write(dir.path(), "team.md", "---\nowner: kim\n---\n");

    let service = WorkspaceService::open(dir.path()).expect("workspace should open");
    let snapshot = service.reload().expect("reload should succeed");

    assert!(!snapshot.index.contains("schema"));
    assert_eq!(snapshot.report.notes_loaded, 1);
    assert!(snapshot.report.errors.is_empty(), "{:?}", snapshot.report.errors);
}

#[test]
fn invalid_config_fails_open() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    write(dir.path(), ".robant.yml", "loader:\n  default_kind: resource\n");
    assert!(matches!(
        WorkspaceService::open(dir.path()),
        Err(WorkspaceError::Config(ConfigError::Invalid(_)))
    ));

    write(dir.path(), ".robant.yml", "loader: [not, a, mapping]\n");
    assert!(matches!(
        WorkspaceService::open(dir.path()),
        Err(WorkspaceError::Config(ConfigError::Parse { .. }))
    ));
}

#[test]
fn cycle_report_serializes_for_tooling() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    write(dir.path(), "bad.md", "---\nkind: task\n---\n");

    let service = WorkspaceService::open(dir.path()).expect("workspace should open");
    let snapshot = service.reload().expect("reload should succeed");
    let json = serde_json::to_value(&snapshot.report).expect("report should serialize");

    assert_eq!(json["notes_loaded"], 1);
    assert_eq!(json["errors"][0]["kind"], "missing_field");
    assert_eq!(json["errors"][0]["field"], "status");
    assert_eq!(json["errors"][0]["note_id"], "bad");
}

use chrono::{TimeZone, Utc};
use robant_core::index::records::ActivityKind;
use robant_core::{
    build, ranked_tasks, recall_actions, recall_activity, search, select_next_task, subtasks,
    Index, NoteKind, ParsedNote, QueryError, RawNote, SchemaRegistry, SearchQuery, TaskSelection,
    TaskStatus, TimeRange, Validator,
};

fn note(id: &str, yaml: &str, body: &str) -> ParsedNote {
    let mut raw = RawNote::new(format!("{id}.md"), id);
    raw.metadata = serde_yaml::from_str(yaml).expect("fixture metadata should parse");
    raw.body = body.to_string();
    ParsedNote::Ok(raw)
}

fn index_of(notes: Vec<ParsedNote>) -> Index {
    let schema = SchemaRegistry::builtin();
    let validator = Validator::new(&schema);
    let accepted = notes.into_iter().map(|parsed| {
        let validation = validator.validate(parsed);
        assert!(validation.errors.is_empty(), "{:?}", validation.errors);
        validation.note.expect("fixture note should be accepted")
    });
    let outcome = build(accepted.collect::<Vec<_>>());
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
    outcome.index
}

fn backlog() -> Index {
    index_of(vec![
        note("a-low", "kind: task\nstatus: open\npriority: low\ndue: 2024-01-01\n", ""),
        note("b-high-late", "kind: task\nstatus: open\npriority: high\ndue: 2024-09-01\n", ""),
        note("c-high-early", "kind: task\nstatus: open\npriority: high\ndue: 2024-03-01\ntags: [home]\n", ""),
        note("d-high-nodue", "kind: task\nstatus: open\npriority: high\n", ""),
        note("e-done", "kind: task\nstatus: done\npriority: high\ndue: 2023-01-01\n", ""),
        note("f-medium", "kind: task\nstatus: active\nparent: c-high-early\ntags: [home]\n", ""),
        note("plan", "title: Garden plan\n", "Dig the garden. Water the garden."),
    ])
}

#[test]
fn next_task_prefers_priority_then_due_then_id() {
    let index = backlog();
    let ranked: Vec<String> = ranked_tasks(&index, &TaskSelection::default())
        .into_iter()
        .map(|task| task.id)
        .collect();
    assert_eq!(
        ranked,
        vec!["c-high-early", "b-high-late", "d-high-nodue", "f-medium", "a-low"]
    );

    let next = select_next_task(&index, &TaskSelection::default()).expect("a task is open");
    assert_eq!(next.id, "c-high-early");
}

#[test]
fn next_task_respects_status_and_tag_filters() {
    let index = backlog();
    let home = TaskSelection::default().with_tag("home");
    assert_eq!(
        select_next_task(&index, &home).map(|task| task.id),
        Some("c-high-early".to_string())
    );

    let active_home = home.with_statuses([TaskStatus::Active]);
    assert_eq!(
        select_next_task(&index, &active_home).map(|task| task.id),
        Some("f-medium".to_string())
    );

    let blocked = TaskSelection::default().with_statuses([TaskStatus::Blocked]);
    assert!(select_next_task(&index, &blocked).is_none());
}

#[test]
fn search_ranks_title_hits_above_body_hits() {
    let index = index_of(vec![
        note("notes/a", "title: Shopping\n", "remember the garden hose"),
        note("notes/b", "title: Garden\n", ""),
        note("notes/c", "title: Kitchen\n", "nothing here"),
    ]);

    let hits: Vec<&str> = search(&index, &SearchQuery::new().text("garden"))
        .into_iter()
        .map(|hit| hit.note.id.as_str())
        .collect();
    assert_eq!(hits, vec!["notes/b", "notes/a"]);

    let none = search(&index, &SearchQuery::new().text("garden kitchen"));
    assert!(none.is_empty(), "every term must match one note");
}

#[test]
fn search_combines_structured_filters() {
    let index = backlog();

    let high_open: Vec<&str> = search(
        &index,
        &SearchQuery::new()
            .kind(NoteKind::Task)
            .status(TaskStatus::Open)
            .field("priority", "high"),
    )
    .into_iter()
    .map(|hit| hit.note.id.as_str())
    .collect();
    assert_eq!(high_open, vec!["b-high-late", "c-high-early", "d-high-nodue"]);

    let tagged = search(&index, &SearchQuery::new().tag("home").limit(1));
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].note.id, "c-high-early");
    assert_eq!(tagged[0].score, 0);
}

#[test]
fn recall_distinguishes_missing_and_non_task_notes() {
    let index = backlog();
    assert_eq!(
        recall_actions(&index, "nope", TimeRange::all()),
        Err(QueryError::NotFound("nope".to_string()))
    );
    assert_eq!(
        recall_actions(&index, "plan", TimeRange::all()),
        Err(QueryError::NotATask("plan".to_string()))
    );
    assert_eq!(
        recall_actions(&index, "a-low", TimeRange::all()).map(|actions| actions.len()),
        Ok(0)
    );
}

#[test]
fn recall_filters_actions_and_activity_by_range() {
    let index = index_of(vec![
        note("t", "kind: task\nstatus: blocked\n", ""),
        note("t/go", "kind: action\ntask: t\nat: 2024-05-01T09:00:00Z\nto: active\n", ""),
        note("t/wait", "kind: action\ntask: t\nat: 2024-05-03T09:00:00Z\nto: blocked\n", ""),
        note(
            "log/1",
            "kind: log\ntask: t\nat: 2024-05-02T08:00:00Z\nstop: 2024-05-02T09:00:00Z\n",
            "",
        ),
    ]);

    let range = TimeRange::between(
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 0).unwrap(),
    );
    let actions = recall_actions(&index, "t", range).expect("t is a task");
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].id, "t/go");
    assert_eq!(actions[0].to, Some(TaskStatus::Active));

    let activity = recall_activity(&index, range);
    let kinds: Vec<(&str, ActivityKind)> = activity
        .iter()
        .map(|entry| (entry.note_id.as_str(), entry.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![("t/go", ActivityKind::Action), ("log/1", ActivityKind::Log)]
    );
    assert!(activity[1].stop.is_some());
}

#[test]
fn subtasks_list_direct_children() {
    let index = backlog();
    let children: Vec<String> = subtasks(&index, "c-high-early")
        .expect("c-high-early is a task")
        .into_iter()
        .map(|task| task.id)
        .collect();
    assert_eq!(children, vec!["f-medium"]);
    assert!(matches!(subtasks(&index, "plan"), Err(QueryError::NotATask(_))));
}

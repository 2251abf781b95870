use robant_core::model::note::Metadata;
use robant_core::model::value::FieldValue;
use robant_core::{
    NoteKind, ParsedNote, RawNote, SchemaRegistry, ValidationErrorKind, Validator,
};

fn raw(id: &str, yaml: &str, body: &str) -> ParsedNote {
    let mut note = RawNote::new(format!("{id}.md"), id);
    note.metadata = serde_yaml::from_str::<Metadata>(yaml).expect("fixture metadata should parse");
    note.body = body.to_string();
    ParsedNote::Ok(note)
}

fn kinds(errors: &[robant_core::ValidationError]) -> Vec<ValidationErrorKind> {
    errors.iter().map(|error| error.kind).collect()
}

#[test]
fn valid_task_gets_typed_fields_and_defaults() {
    let schema = SchemaRegistry::builtin();
    let validation = Validator::new(&schema).validate(raw(
        "work/ship",
        "kind: task\nstatus: open\neffort: 1h30m\ndue: 2024-06-01\ntags: [release, q2]\n",
        "# Ship it\n",
    ));

    assert!(validation.errors.is_empty(), "{:?}", validation.errors);
    let note = validation.note.expect("task should be accepted");
    assert_eq!(note.kind, NoteKind::Task);
    assert_eq!(note.field("effort"), Some(&FieldValue::Duration(90)));
    assert_eq!(
        note.field("priority"),
        Some(&FieldValue::Enum("medium".to_string()))
    );
    assert_eq!(note.title.as_deref(), Some("Ship it"));
    assert!(note.tags.contains("release"));
}

#[test]
fn every_problem_of_a_note_is_reported() {
    let schema = SchemaRegistry::builtin();
    let validation = Validator::new(&schema).validate(raw(
        "t",
        "kind: action\nspent: forever\nto: finished\n",
        "",
    ));

    assert!(validation.note.is_none());
    let mut found = kinds(&validation.errors);
    found.sort();
    assert_eq!(
        found,
        vec![
            ValidationErrorKind::MissingField,
            ValidationErrorKind::MissingField,
            ValidationErrorKind::Type,
            ValidationErrorKind::Type,
        ]
    );
    let fields: Vec<&str> = validation
        .errors
        .iter()
        .filter_map(|error| error.field.as_deref())
        .collect();
    assert!(fields.contains(&"task"));
    assert!(fields.contains(&"at"));
    assert!(fields.contains(&"spent"));
    assert!(fields.contains(&"to"));
}

#[test]
fn unknown_kind_is_the_only_error() {
    let schema = SchemaRegistry::builtin();
    let validation =
        Validator::new(&schema).validate(raw("x", "kind: epic\nstatus: 7\ndue: never\n", ""));
    assert!(validation.note.is_none());
    assert_eq!(kinds(&validation.errors), vec![ValidationErrorKind::UnknownKind]);
}

#[test]
fn missing_kind_uses_default_kind() {
    let schema = SchemaRegistry::builtin();
    let validator = Validator::new(&schema);
    let note = validator
        .validate(raw("p", "title: Plan\n", ""))
        .note
        .expect("plan should be accepted");
    assert_eq!(note.kind, NoteKind::Plan);

    let note = validator
        .with_default_kind(NoteKind::Log)
        .validate(raw("l", "at: 2024-05-01T09:00:00Z\n", ""))
        .note
        .expect("log should be accepted");
    assert_eq!(note.kind, NoteKind::Log);
}

#[test]
fn unknown_fields_are_preserved_unless_strict() {
    let schema = SchemaRegistry::builtin();
    let lenient = Validator::new(&schema).validate(raw("p", "owner: sam\n", ""));
    assert!(lenient.errors.is_empty());
    let note = lenient.note.expect("plan should be accepted");
    assert_eq!(
        note.extra.get("owner").and_then(|value| value.as_str()),
        Some("sam")
    );

    let strict = Validator::new(&schema)
        .with_strict_fields(true)
        .validate(raw("p", "owner: sam\n", ""));
    assert_eq!(kinds(&strict.errors), vec![ValidationErrorKind::UnknownField]);
    assert!(strict.note.is_some(), "unknown fields never reject a note");
}

#[test]
fn explicit_id_overrides_the_path_id() {
    let schema = SchemaRegistry::builtin();
    let note = Validator::new(&schema)
        .validate(raw("folder/file", "id: custom\n", ""))
        .note
        .expect("note should be accepted");
    assert_eq!(note.id, "custom");

    let bad = Validator::new(&schema).validate(raw("folder/file", "id: [1, 2]\n", ""));
    assert!(bad.note.is_none());
    assert_eq!(bad.errors[0].field.as_deref(), Some("id"));
}

#[test]
fn loader_failures_become_parse_errors() {
    let schema = SchemaRegistry::builtin();
    let validation = Validator::new(&schema).validate(ParsedNote::Failed {
        note: RawNote::new("broken.md", "broken"),
        error: "unterminated front matter".to_string(),
    });
    assert!(validation.note.is_none());
    assert_eq!(kinds(&validation.errors), vec![ValidationErrorKind::Parse]);
    assert_eq!(
        validation.errors[0].to_string(),
        "broken.md: parse_error: unterminated front matter"
    );
}

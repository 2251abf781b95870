use robant_core::config::LoaderConfig;
use robant_core::{
    load, load_with_limits, CancelToken, CycleLimits, LoadError, LoadedEntry, ParsedNote,
};
use std::fs;
use std::path::Path;

fn write(root: &Path, relative: &str, contents: &[u8]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent dirs should be created");
    }
    fs::write(path, contents).expect("fixture file should be written");
}

fn entry_id(entry: &LoadedEntry) -> String {
    match entry {
        LoadedEntry::Note(parsed) => parsed.raw().derived_id.clone(),
        LoadedEntry::Resource(resource) => format!("resource:{}", resource.id),
    }
}

fn load_all(root: &Path, config: &LoaderConfig) -> Vec<LoadedEntry> {
    load(root, config)
        .expect("root should be loadable")
        .collect::<Result<Vec<_>, _>>()
        .expect("unbounded load should not be interrupted")
}

#[test]
fn walk_order_follows_sorted_relative_paths() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let root = dir.path();
    write(root, "b.md", b"---\nkind: plan\n---\nsecond");
    write(root, "a.md", b"first");
    write(root, "a/x.md", b"nested");
    write(root, "img.png", &[0x89, 0x50, 0x4e, 0x47]);
    write(root, "p/METADATA.yml", b"kind: plan\ntitle: Project\n");

    let ids: Vec<String> = load_all(root, &LoaderConfig::default())
        .iter()
        .map(entry_id)
        .collect();
    assert_eq!(
        ids,
        vec!["a/x", "a", "b", "resource:img.png", "p/METADATA"]
    );
}

#[test]
fn excluded_and_hidden_entries_are_skipped() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let root = dir.path();
    write(root, "LIB/vendored.md", b"skip me");
    write(root, "TMP/scratch.md", b"skip me");
    write(root, ".git/HEAD", b"ref: main");
    write(root, ".hidden.md", b"skip me");
    write(root, ".robant.yml", b"loader:\n  include_hidden: false\n");
    write(root, "keep.md", b"kept");

    let ids: Vec<String> = load_all(root, &LoaderConfig::default())
        .iter()
        .map(entry_id)
        .collect();
    assert_eq!(ids, vec!["keep"]);
}

#[test]
fn only_the_root_config_file_is_skipped() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let root = dir.path();
    write(root, ".robant.yml", b"loader:\n  include_hidden: true\n");
    write(root, "sub/.robant.yml", b"loader: {}\n");
    let config = LoaderConfig {
        include_hidden: true,
        ..LoaderConfig::default()
    };
    let ids: Vec<String> = load_all(root, &config).iter().map(entry_id).collect();
    assert_eq!(ids, vec!["sub/.robant"]);
}

#[test]
fn hidden_files_load_when_configured() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let root = dir.path();
    write(root, ".draft.md", b"draft");
    let config = LoaderConfig {
        include_hidden: true,
        ..LoaderConfig::default()
    };
    let ids: Vec<String> = load_all(root, &config).iter().map(entry_id).collect();
    assert_eq!(ids, vec![".draft"]);
}

#[test]
fn front_matter_is_split_from_body() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let root = dir.path();
    write(
        root,
        "note.md",
        b"---\nkind: task\nstatus: open\n---\n# Heading\nbody text\n",
    );

    let entries = load_all(root, &LoaderConfig::default());
    let LoadedEntry::Note(ParsedNote::Ok(raw)) = &entries[0] else {
        panic!("note should parse, got {:?}", entries[0]);
    };
    assert_eq!(
        raw.metadata.get("status").and_then(|value| value.as_str()),
        Some("open")
    );
    assert_eq!(raw.body, "# Heading\nbody text\n");
    assert!(raw.origin.is_local());
    assert!(raw.modified.is_some());
}

#[test]
fn broken_files_become_failed_entries_and_the_walk_continues() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let root = dir.path();
    write(root, "a.md", b"---\nkind: plan\nno closing fence\n");
    write(root, "b.md", &[0xff, 0xfe, 0x00]);
    write(root, "c.md", b"---\n- not\n- a mapping\n---\n");
    write(root, "d.md", b"fine");

    let entries = load_all(root, &LoaderConfig::default());
    assert_eq!(entries.len(), 4);
    for entry in &entries[..3] {
        assert!(
            matches!(entry, LoadedEntry::Note(ParsedNote::Failed { .. })),
            "expected failure, got {entry:?}"
        );
    }
    assert!(matches!(&entries[3], LoadedEntry::Note(ParsedNote::Ok(_))));
}

#[test]
fn root_problems_fail_the_whole_load() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let file = dir.path().join("plain.md");
    fs::write(&file, "x").expect("file should be written");

    assert!(matches!(
        load(&file, &LoaderConfig::default()),
        Err(LoadError::RootNotDirectory(_))
    ));
    assert!(matches!(
        load(&dir.path().join("missing"), &LoaderConfig::default()),
        Err(LoadError::RootMissing(_))
    ));
}

#[test]
fn cancelled_load_yields_one_error_then_ends() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    write(dir.path(), "a.md", b"a");
    write(dir.path(), "b.md", b"b");

    let cancel = CancelToken::new();
    let limits = CycleLimits::new().with_cancel(cancel.clone());
    let mut stream =
        load_with_limits(dir.path(), &LoaderConfig::default(), limits).expect("root is valid");

    assert!(matches!(stream.next(), Some(Ok(_))));
    cancel.cancel();
    assert!(matches!(stream.next(), Some(Err(LoadError::Cancelled))));
    assert!(stream.next().is_none());
}

#[test]
fn expired_deadline_times_out() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    write(dir.path(), "a.md", b"a");

    let limits = CycleLimits::new().with_timeout(std::time::Duration::ZERO);
    let mut stream =
        load_with_limits(dir.path(), &LoaderConfig::default(), limits).expect("root is valid");
    assert!(matches!(stream.next(), Some(Err(LoadError::TimedOut))));
    assert!(stream.next().is_none());
}

#[test]
fn restarting_a_load_yields_the_same_sequence() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    write(dir.path(), "z/one.md", b"1");
    write(dir.path(), "y.txt", b"2");
    write(dir.path(), "notes.rst", b"3");

    let config = LoaderConfig::default();
    assert_eq!(load_all(dir.path(), &config), load_all(dir.path(), &config));
}

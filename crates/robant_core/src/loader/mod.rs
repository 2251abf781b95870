//! Note loader: walks a folder hierarchy and yields raw note records.
//!
//! # Responsibility
//! - Traverse the hierarchy in a deterministic order.
//! - Read each note file, split its front matter and decode the metadata.
//! - Record non-note files as resources.
//!
//! # Invariants
//! - Per-file problems become `ParsedNote::Failed` entries, never stream errors.
//! - Only root problems and interruption produce `LoadError`.
//! - Siblings are visited sorted by file name, so output order equals
//!   component-wise lexicographic order of relative paths.
//! - After yielding `Cancelled` or `TimedOut` the stream ends.

pub mod convention;
pub mod frontmatter;

use crate::cancel::{CycleLimits, Interruption};
use crate::config::{LoaderConfig, CONFIG_FILE_NAME};
use crate::model::note::{Metadata, ParsedNote, RawNote, ResourceEntry};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::{DirEntry, WalkDir};

use self::convention::{
    classify, derived_note_id, derived_resource_id, is_excluded_dir, is_hidden, EntryClass,
};
use self::frontmatter::{parse_metadata_document, split_note};

/// Whole-load failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    RootMissing(PathBuf),
    RootNotDirectory(PathBuf),
    RootUnreadable { path: PathBuf, message: String },
    Cancelled,
    TimedOut,
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RootMissing(path) => write!(f, "root `{}` does not exist", path.display()),
            Self::RootNotDirectory(path) => {
                write!(f, "root `{}` is not a directory", path.display())
            }
            Self::RootUnreadable { path, message } => {
                write!(f, "root `{}` cannot be read: {message}", path.display())
            }
            Self::Cancelled => write!(f, "load cancelled"),
            Self::TimedOut => write!(f, "load timed out"),
        }
    }
}

impl Error for LoadError {}

impl From<Interruption> for LoadError {
    fn from(value: Interruption) -> Self {
        match value {
            Interruption::Cancelled => Self::Cancelled,
            Interruption::TimedOut => Self::TimedOut,
        }
    }
}

/// One item produced by the loader.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedEntry {
    Note(ParsedNote),
    Resource(ResourceEntry),
}

/// Counters reported when the stream ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub notes: usize,
    pub failed: usize,
    pub resources: usize,
    pub skipped_dirs: usize,
}

/// Starts an unbounded load of `root`.
pub fn load(root: &Path, config: &LoaderConfig) -> Result<NoteStream, LoadError> {
    load_with_limits(root, config, CycleLimits::default())
}

/// Starts a load of `root` that stops when `limits` trip.
///
/// # Errors
/// - `RootMissing`, `RootNotDirectory` or `RootUnreadable` when the root
///   cannot be walked at all.
pub fn load_with_limits(
    root: &Path,
    config: &LoaderConfig,
    limits: CycleLimits,
) -> Result<NoteStream, LoadError> {
    check_root(root)?;
    info!(
        "event=load_start module=loader status=start root={}",
        root.display()
    );
    Ok(NoteStream {
        root: root.to_path_buf(),
        config: config.clone(),
        limits,
        walker: WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter(),
        finished: false,
        stats: LoadStats::default(),
        started: Instant::now(),
    })
}

fn check_root(root: &Path) -> Result<(), LoadError> {
    let metadata = match std::fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(LoadError::RootMissing(root.to_path_buf()));
        }
        Err(err) => {
            return Err(LoadError::RootUnreadable {
                path: root.to_path_buf(),
                message: err.to_string(),
            });
        }
    };
    if !metadata.is_dir() {
        return Err(LoadError::RootNotDirectory(root.to_path_buf()));
    }
    std::fs::read_dir(root).map_err(|err| LoadError::RootUnreadable {
        path: root.to_path_buf(),
        message: err.to_string(),
    })?;
    Ok(())
}

/// Lazy, finite stream of loaded entries.
///
/// Call `load` again to restart from the beginning.
pub struct NoteStream {
    root: PathBuf,
    config: LoaderConfig,
    limits: CycleLimits,
    walker: walkdir::IntoIter,
    finished: bool,
    stats: LoadStats,
    started: Instant,
}

impl NoteStream {
    pub fn stats(&self) -> LoadStats {
        self.stats
    }

    fn finish(&mut self, status: &str) {
        if self.finished {
            return;
        }
        self.finished = true;
        info!(
            "event=load_finish module=loader status={} notes={} failed={} resources={} skipped_dirs={} duration_ms={}",
            status,
            self.stats.notes,
            self.stats.failed,
            self.stats.resources,
            self.stats.skipped_dirs,
            self.started.elapsed().as_millis()
        );
    }

    fn relative<'p>(&self, path: &'p Path) -> &'p Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }

    fn visit(&mut self, entry: DirEntry) -> Option<LoadedEntry> {
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry.file_type();

        if file_type.is_dir() {
            if is_excluded_dir(&name, &self.config) {
                debug!(
                    "event=load_skip module=loader status=skipped kind=dir path={}",
                    entry.path().display()
                );
                self.stats.skipped_dirs += 1;
                self.walker.skip_current_dir();
            }
            return None;
        }
        if !file_type.is_file() {
            return None;
        }
        if entry.depth() == 1 && name == CONFIG_FILE_NAME {
            return None;
        }
        if !self.config.include_hidden && is_hidden(&name) {
            return None;
        }

        let relative = self.relative(entry.path()).to_path_buf();
        let modified = entry
            .metadata()
            .ok()
            .and_then(|metadata| metadata.modified().ok())
            .map(DateTime::<Utc>::from);

        match classify(&relative, &self.config) {
            EntryClass::Resource => {
                self.stats.resources += 1;
                Some(LoadedEntry::Resource(ResourceEntry {
                    id: derived_resource_id(&relative),
                    modified,
                    path: relative,
                }))
            }
            class => {
                let mut note = RawNote::new(relative.clone(), derived_note_id(&relative));
                note.modified = modified;
                let parsed = match read_note(entry.path(), class) {
                    Ok((metadata, body)) => {
                        note.metadata = metadata;
                        note.body = body;
                        self.stats.notes += 1;
                        ParsedNote::Ok(note)
                    }
                    Err(error) => {
                        self.stats.failed += 1;
                        warn!(
                            "event=load_note module=loader status=error path={} error={}",
                            relative.display(),
                            error
                        );
                        ParsedNote::Failed { note, error }
                    }
                };
                Some(LoadedEntry::Note(parsed))
            }
        }
    }

    fn failed_walk(&mut self, err: walkdir::Error) -> Option<LoadedEntry> {
        let message = err.to_string();
        let Some(path) = err.path() else {
            warn!("event=load_walk module=loader status=error error={message}");
            return None;
        };
        let relative = self.relative(path).to_path_buf();
        warn!(
            "event=load_walk module=loader status=error path={} error={}",
            relative.display(),
            message
        );
        self.stats.failed += 1;
        let note = RawNote::new(relative.clone(), derived_note_id(&relative));
        Some(LoadedEntry::Note(ParsedNote::Failed {
            note,
            error: message,
        }))
    }
}

impl Iterator for NoteStream {
    type Item = Result<LoadedEntry, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            if let Some(interruption) = self.limits.interruption() {
                let error = LoadError::from(interruption);
                self.finish(match error {
                    LoadError::Cancelled => "cancelled",
                    _ => "timed_out",
                });
                return Some(Err(error));
            }

            let produced = match self.walker.next() {
                None => {
                    self.finish("ok");
                    return None;
                }
                Some(Ok(entry)) => self.visit(entry),
                Some(Err(err)) => self.failed_walk(err),
            };
            if let Some(entry) = produced {
                return Some(Ok(entry));
            }
        }
        None
    }
}

fn read_note(path: &Path, class: EntryClass) -> Result<(Metadata, String), String> {
    let bytes = std::fs::read(path).map_err(|err| format!("cannot read file: {err}"))?;
    let text = String::from_utf8(bytes).map_err(|_| "file is not valid UTF-8".to_string())?;

    if class == EntryClass::Metadata {
        let metadata = parse_metadata_document(&text)?;
        return Ok((metadata, String::new()));
    }

    let split = split_note(&text)?;
    let metadata = match split.metadata {
        Some(block) => parse_metadata_document(block)?,
        None => Metadata::new(),
    };
    Ok((metadata, split.body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{load, LoadError, LoadedEntry};
    use crate::config::LoaderConfig;
    use crate::model::note::ParsedNote;

    #[test]
    fn missing_root_fails_whole_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope");
        let result = load(&missing, &LoaderConfig::default());
        assert!(matches!(result, Err(LoadError::RootMissing(_))));
    }

    #[test]
    fn file_root_is_not_a_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("note.md");
        std::fs::write(&file, "body").expect("write");
        let result = load(&file, &LoaderConfig::default());
        assert!(matches!(result, Err(LoadError::RootNotDirectory(_))));
    }

    #[test]
    fn empty_root_yields_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let stream = load(dir.path(), &LoaderConfig::default()).expect("load");
        assert_eq!(stream.count(), 0);
    }

    #[test]
    fn invalid_utf8_becomes_failed_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("bad.md"), [0xff, 0xfe, 0x00]).expect("write");
        let entries: Vec<_> = load(dir.path(), &LoaderConfig::default())
            .expect("load")
            .collect::<Result<_, _>>()
            .expect("no stream error");
        assert!(matches!(
            entries.as_slice(),
            [LoadedEntry::Note(ParsedNote::Failed { error, .. })] if error.contains("UTF-8")
        ));
    }
}

//! Folder-hierarchy conventions: which files are notes and how they are named.

use crate::config::LoaderConfig;
use std::path::{Component, Path};

/// How the loader treats one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryClass {
    /// Text note with an optional front-matter block.
    Note,
    /// Pure metadata note; the whole file is the mapping.
    Metadata,
    /// Any other file, recorded without parsing.
    Resource,
}

pub fn classify(path: &Path, config: &LoaderConfig) -> EntryClass {
    let Some(ext) = extension(path) else {
        return EntryClass::Resource;
    };
    if config.note_extensions.iter().any(|known| *known == ext) {
        EntryClass::Note
    } else if config.metadata_extensions.iter().any(|known| *known == ext) {
        EntryClass::Metadata
    } else {
        EntryClass::Resource
    }
}

/// Whether a directory must be skipped with all its contents.
pub fn is_excluded_dir(name: &str, config: &LoaderConfig) -> bool {
    config.exclude_dirs.iter().any(|excluded| excluded == name)
        || (!config.include_hidden && is_hidden(name))
}

pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Identifier for a note at `relative` path: components joined by `/`,
/// final extension removed.
pub fn derived_note_id(relative: &Path) -> String {
    join_components(&relative.with_extension(""))
}

/// Identifier for a resource: the full relative path with extension.
pub fn derived_resource_id(relative: &Path) -> String {
    join_components(relative)
}

fn join_components(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

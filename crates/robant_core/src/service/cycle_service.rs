//! One load cycle: load, validate, import, index.
//!
//! # Responsibility
//! - Drive the loader stream through the validator into the index builder.
//! - Merge integration signals through the same validation path.
//! - Collect every non-fatal problem into one report.
//!
//! # Invariants
//! - Only `LoadError` aborts a cycle; everything else is reported.
//! - A cycle never publishes; publication belongs to the caller.

use crate::cancel::{CycleLimits, Interruption};
use crate::config::RobantConfig;
use crate::index::{Index, IndexBuilder};
use crate::integration::registry::{AdapterRegistry, IntegrationIssue};
use crate::loader::{load_with_limits, LoadError, LoadedEntry};
use crate::model::note::{Note, ParsedNote};
use crate::schema::registry::SchemaRegistry;
use crate::validate::error::ValidationError;
use crate::validate::validator::Validator;
use log::{info, warn};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

/// Everything a cycle found besides the index itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    /// Validation and index errors, loader order first.
    pub errors: Vec<ValidationError>,
    pub integration: Vec<IntegrationIssue>,
    pub notes_loaded: usize,
    pub resources_loaded: usize,
    pub imported: usize,
    pub indexed: usize,
}

impl CycleReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.integration.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub index: Index,
    pub report: CycleReport,
}

/// Inputs of one load cycle.
pub struct LoadCycle<'a> {
    root: &'a Path,
    config: &'a RobantConfig,
    schema: &'a SchemaRegistry,
    adapters: Option<&'a AdapterRegistry>,
    limits: CycleLimits,
    skip: Vec<PathBuf>,
}

impl<'a> LoadCycle<'a> {
    pub fn new(root: &'a Path, config: &'a RobantConfig, schema: &'a SchemaRegistry) -> Self {
        let root_path = lexical(root);
        let skip = config
            .schema_file
            .as_ref()
            .map(|file| {
                let file = lexical(file);
                file.strip_prefix(&root_path)
                    .map(Path::to_path_buf)
                    .unwrap_or(file)
            })
            .into_iter()
            .collect();
        Self {
            root,
            config,
            schema,
            adapters: None,
            limits: CycleLimits::default(),
            skip,
        }
    }

    pub fn with_adapters(mut self, adapters: &'a AdapterRegistry) -> Self {
        self.adapters = Some(adapters);
        self
    }

    pub fn with_limits(mut self, limits: CycleLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Runs the cycle to completion.
    ///
    /// # Errors
    /// - Root failures from the loader.
    /// - `Cancelled` / `TimedOut` while walking the hierarchy.
    /// - `Cancelled` when the cycle is cancelled during imports.
    pub fn run(self) -> Result<CycleOutcome, LoadError> {
        let started = Instant::now();
        let cycle_id = Uuid::new_v4();
        info!(
            "event=cycle_start module=service status=start cycle_id={} root={}",
            cycle_id,
            self.root.display()
        );

        let validator =
            Validator::from_config(self.schema, &self.config.loader, &self.config.validation);
        let mut builder = IndexBuilder::new();
        let mut report = CycleReport {
            cycle_id,
            ..CycleReport::default()
        };

        let stream = load_with_limits(self.root, &self.config.loader, self.limits.clone())?;
        for entry in stream {
            let entry = entry.inspect_err(|err| {
                warn!(
                    "event=cycle_abort module=service status=error cycle_id={cycle_id} error={err}"
                );
            })?;
            match entry {
                LoadedEntry::Note(parsed) => {
                    let path = lexical(&parsed.raw().path);
                    if self.skip.iter().any(|skip| *skip == path) {
                        continue;
                    }
                    report.notes_loaded += 1;
                    admit(&validator, parsed, &mut builder, &mut report.errors);
                }
                LoadedEntry::Resource(resource) => {
                    report.resources_loaded += 1;
                    builder.insert(Note::from_resource(resource));
                }
            }
        }

        if let Some(adapters) = self.adapters.filter(|adapters| !adapters.is_empty()) {
            let imported = adapters.import_all(&self.limits, self.config.integration.import_timeout());
            if let Some(Interruption::Cancelled) = self.limits.interruption() {
                warn!("event=cycle_abort module=service status=error cycle_id={cycle_id} error=cancelled");
                return Err(LoadError::Cancelled);
            }
            report.imported = imported.notes.len();
            report.integration = imported.issues;
            for raw in imported.notes {
                admit(&validator, ParsedNote::Ok(raw), &mut builder, &mut report.errors);
            }
        }

        let built = builder.finish();
        report.errors.extend(built.errors);
        report.indexed = built.index.len();

        info!(
            "event=cycle_finish module=service status=ok cycle_id={} notes={} resources={} imported={} indexed={} errors={} integration_issues={} duration_ms={}",
            cycle_id,
            report.notes_loaded,
            report.resources_loaded,
            report.imported,
            report.indexed,
            report.errors.len(),
            report.integration.len(),
            started.elapsed().as_millis()
        );
        Ok(CycleOutcome {
            index: built.index,
            report,
        })
    }
}

/// `path` without `.` components, so `./schema.yml` equals `schema.yml`.
fn lexical(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

fn admit(
    validator: &Validator<'_>,
    parsed: ParsedNote,
    builder: &mut IndexBuilder,
    errors: &mut Vec<ValidationError>,
) {
    let validation = validator.validate(parsed);
    errors.extend(validation.errors);
    if let Some(note) = validation.note {
        builder.insert(note);
    }
}

//! Workspace service: owns one hierarchy and its published index.
//!
//! # Responsibility
//! - Resolve configuration and schema for a hierarchy root.
//! - Serialize rebuilds and publish each finished index atomically.
//! - Offer snapshot-based reads and exports to callers.
//!
//! # Invariants
//! - At most one rebuild runs at a time per service.
//! - A failed rebuild leaves the previous snapshot published.
//! - Readers never block on a rebuild.

use crate::cancel::CycleLimits;
use crate::config::{load_config, ConfigError, RobantConfig};
use crate::index::{IndexHandle, IndexSnapshot};
use crate::integration::adapter::{AdapterError, ExportPayload, IntegrationAdapter};
use crate::integration::registry::{AdapterRegistry, AdapterRegistryError};
use crate::loader::LoadError;
use crate::query::{ranked_tasks, select_next_task, TaskSelection, TaskView};
use crate::schema::global::installed_schema;
use crate::schema::registry::{SchemaError, SchemaRegistry};
use crate::service::cycle_service::LoadCycle;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Service error for workspace use-cases.
#[derive(Debug)]
pub enum WorkspaceError {
    Config(ConfigError),
    Schema(SchemaError),
    Load(LoadError),
    Adapter(AdapterRegistryError),
    Export(AdapterError),
}

impl Display for WorkspaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Schema(err) => write!(f, "{err}"),
            Self::Load(err) => write!(f, "{err}"),
            Self::Adapter(err) => write!(f, "{err}"),
            Self::Export(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WorkspaceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Schema(err) => Some(err),
            Self::Load(err) => Some(err),
            Self::Adapter(err) => Some(err),
            Self::Export(err) => Some(err),
        }
    }
}

impl From<ConfigError> for WorkspaceError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<SchemaError> for WorkspaceError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

impl From<LoadError> for WorkspaceError {
    fn from(value: LoadError) -> Self {
        Self::Load(value)
    }
}

impl From<AdapterRegistryError> for WorkspaceError {
    fn from(value: AdapterRegistryError) -> Self {
        Self::Adapter(value)
    }
}

impl From<AdapterError> for WorkspaceError {
    fn from(value: AdapterError) -> Self {
        Self::Export(value)
    }
}

/// Facade over one hierarchy root.
pub struct WorkspaceService {
    root: PathBuf,
    config: RobantConfig,
    schema: Arc<SchemaRegistry>,
    adapters: AdapterRegistry,
    handle: IndexHandle,
    reload_guard: Mutex<()>,
}

impl WorkspaceService {
    /// Opens `root`, reading `.robant.yml` and resolving the schema.
    ///
    /// Schema source order: `schema_file`, the installed process-wide
    /// schema, the built-in schema.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, WorkspaceError> {
        let root = root.into();
        let config = load_config(&root)?;
        let schema = resolve_schema(&root, &config)?;
        Ok(Self::new(root, config, schema))
    }

    pub fn new(root: impl Into<PathBuf>, config: RobantConfig, schema: Arc<SchemaRegistry>) -> Self {
        Self {
            root: root.into(),
            config,
            schema,
            adapters: AdapterRegistry::new(),
            handle: IndexHandle::new(),
            reload_guard: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &RobantConfig {
        &self.config
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    pub fn register_adapter(
        &mut self,
        adapter: Arc<dyn IntegrationAdapter>,
    ) -> Result<(), WorkspaceError> {
        self.adapters.register(adapter)?;
        Ok(())
    }

    /// Runs an unbounded cycle and publishes its index.
    pub fn reload(&self) -> Result<Arc<IndexSnapshot>, WorkspaceError> {
        self.reload_with(CycleLimits::default())
    }

    /// Runs a bounded cycle and publishes its index.
    ///
    /// # Errors
    /// - `WorkspaceError::Load` when the cycle aborts; the previous snapshot
    ///   stays published.
    pub fn reload_with(&self, limits: CycleLimits) -> Result<Arc<IndexSnapshot>, WorkspaceError> {
        let _guard = self
            .reload_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let outcome = LoadCycle::new(&self.root, &self.config, &self.schema)
            .with_adapters(&self.adapters)
            .with_limits(limits)
            .run()
            .map_err(|err| {
                warn!(
                    "event=workspace_reload module=service status=error root={} error={}",
                    self.root.display(),
                    err
                );
                err
            })?;

        let snapshot = self.handle.publish(outcome.index, outcome.report);
        info!(
            "event=workspace_reload module=service status=ok generation={} notes={} errors={}",
            snapshot.generation,
            snapshot.index.len(),
            snapshot.report.errors.len()
        );
        Ok(snapshot)
    }

    /// Current published snapshot.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.handle.snapshot()
    }

    pub fn next_task(&self, selection: &TaskSelection) -> Option<TaskView> {
        select_next_task(&self.snapshot().index, selection)
    }

    /// Exports the ranked selection through one adapter.
    pub fn export_selection(
        &self,
        adapter_id: &str,
        selection: &TaskSelection,
    ) -> Result<ExportPayload, WorkspaceError> {
        if self.adapters.get(adapter_id).is_none() {
            return Err(AdapterRegistryError::AdapterNotFound(adapter_id.trim().to_string()).into());
        }
        let tasks = ranked_tasks(&self.snapshot().index, selection);
        Ok(self.adapters.export_to(adapter_id, &tasks)?)
    }
}

fn resolve_schema(root: &Path, config: &RobantConfig) -> Result<Arc<SchemaRegistry>, SchemaError> {
    if let Some(path) = config.schema_path(root) {
        let registry = SchemaRegistry::load_file(&path)?;
        info!(
            "event=schema_load module=service status=ok source=file path={}",
            path.display()
        );
        return Ok(Arc::new(registry));
    }
    if let Some(installed) = installed_schema() {
        return Ok(installed);
    }
    Ok(Arc::new(SchemaRegistry::builtin()))
}

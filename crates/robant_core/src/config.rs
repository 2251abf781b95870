//! Hierarchy configuration read from `.robant.yml`.
//!
//! # Responsibility
//! - Deserialize loader, validation, integration and logging settings.
//! - Fall back to defaults when the file or a section is absent.
//!
//! # Invariants
//! - Extension lists are stored lowercase without a leading dot.
//! - `validate` rejects configurations the loader cannot honor.

use crate::model::note::NoteKind;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration file name looked up at the hierarchy root.
pub const CONFIG_FILE_NAME: &str = ".robant.yml";

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration loading failures.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "cannot parse config `{}`: {source}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RobantConfig {
    pub loader: LoaderConfig,
    pub validation: ValidationConfig,
    pub integration: IntegrationConfig,
    pub logging: LoggingConfig,
    /// Schema document path, relative to the hierarchy root.
    pub schema_file: Option<PathBuf>,
}

/// Folder-convention settings for the note loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    pub note_extensions: Vec<String>,
    pub metadata_extensions: Vec<String>,
    /// Directory names skipped at any depth.
    pub exclude_dirs: Vec<String>,
    pub include_hidden: bool,
    /// Kind assumed for notes without a `kind` field.
    pub default_kind: NoteKind,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            note_extensions: to_strings(&["md", "markdown", "rst", "txt"]),
            metadata_extensions: to_strings(&["yml", "yaml"]),
            exclude_dirs: to_strings(&["LIB", "SRC", "TMP"]),
            include_hidden: false,
            default_kind: NoteKind::Plan,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Report metadata keys no schema field claims.
    pub strict_fields: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegrationConfig {
    /// Per-adapter import budget.
    pub import_timeout_ms: u64,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            import_timeout_ms: 5_000,
        }
    }
}

impl IntegrationConfig {
    pub fn import_timeout(&self) -> Duration {
        Duration::from_millis(self.import_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute log directory; logs go to stderr when absent.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::DEFAULT_LOG_LEVEL.to_string(),
            dir: None,
        }
    }
}

impl RobantConfig {
    /// Parses a configuration document.
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Normalizes extension spellings and checks cross-field constraints.
    pub fn validate(mut self) -> ConfigResult<Self> {
        self.loader.note_extensions = normalize_extensions(&self.loader.note_extensions);
        self.loader.metadata_extensions = normalize_extensions(&self.loader.metadata_extensions);

        if self.loader.note_extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "loader.note_extensions cannot be empty".to_string(),
            ));
        }
        if let Some(shared) = self
            .loader
            .note_extensions
            .iter()
            .find(|ext| self.loader.metadata_extensions.contains(ext))
        {
            return Err(ConfigError::Invalid(format!(
                "extension `{shared}` is both a note and a metadata extension"
            )));
        }
        if self.loader.default_kind == NoteKind::Resource {
            return Err(ConfigError::Invalid(
                "loader.default_kind cannot be `resource`".to_string(),
            ));
        }
        if self.integration.import_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "integration.import_timeout_ms must be positive".to_string(),
            ));
        }
        if let Some(dir) = &self.logging.dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "logging.dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(self)
    }

    /// Schema document path resolved against `root`.
    pub fn schema_path(&self, root: &Path) -> Option<PathBuf> {
        self.schema_file.as_ref().map(|file| root.join(file))
    }
}

/// Reads `.robant.yml` under `root`; a missing file yields defaults.
pub fn load_config(root: &Path) -> ConfigResult<RobantConfig> {
    let path = root.join(CONFIG_FILE_NAME);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return RobantConfig::default().validate();
        }
        Err(source) => return Err(ConfigError::Io { path, source }),
    };
    RobantConfig::from_yaml_str(&text)
        .map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?
        .validate()
}

fn normalize_extensions(values: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let ext = value.trim().trim_start_matches('.').to_ascii_lowercase();
        if !ext.is_empty() && !normalized.contains(&ext) {
            normalized.push(ext);
        }
    }
    normalized
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

//! Process logger setup for the engine and the `robant` binary.
//!
//! # Responsibility
//! - Start one `flexi_logger` backend per process, appending to
//!   `robant.log` in a configured directory or writing to stderr.
//!
//! # Invariants
//! - A repeated call with the same level and sink is a no-op.
//! - A call asking for another level or sink fails and leaves the running
//!   logger as it was.
//! - Setup never panics.

use crate::config::LoggingConfig;
use flexi_logger::{FileSpec, Logger, LoggerHandle};
use log::{info, LevelFilter};
use once_cell::sync::OnceCell;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_LOG_LEVEL: &str = "info";

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();

/// Destination of log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Sink {
    Stderr,
    Dir(PathBuf),
}

impl Sink {
    fn from_dir(dir: Option<&Path>) -> Result<Self, String> {
        match dir {
            None => Ok(Self::Stderr),
            Some(dir) if dir.is_absolute() => Ok(Self::Dir(dir.to_path_buf())),
            Some(dir) => Err(format!("log dir `{}` is not absolute", dir.display())),
        }
    }

    fn dir(&self) -> Option<PathBuf> {
        match self {
            Self::Stderr => None,
            Self::Dir(dir) => Some(dir.clone()),
        }
    }
}

impl Display for Sink {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stderr => f.write_str("stderr"),
            Self::Dir(dir) => write!(f, "{}", dir.display()),
        }
    }
}

struct ActiveLogger {
    level: LevelFilter,
    sink: Sink,
    _handle: LoggerHandle,
}

/// Starts the process logger described by `config`.
///
/// # Errors
/// - The level is not one of trace, debug, info, warn, error.
/// - The directory is relative or cannot be created.
/// - A logger with another level or sink is already running.
pub fn init_logging(config: &LoggingConfig) -> Result<(), String> {
    let level = parse_level(&config.level)?;
    let sink = Sink::from_dir(config.dir.as_deref())?;
    let active = ACTIVE.get_or_try_init(|| start(level, &sink))?;
    if active.level == level && active.sink == sink {
        return Ok(());
    }
    Err(format!(
        "logger already running at {} on {}; cannot restart it at {} on {}",
        active.level, active.sink, level, sink
    ))
}

/// Level and directory of the running logger; the directory is `None` for stderr.
pub fn logging_status() -> Option<(LevelFilter, Option<PathBuf>)> {
    ACTIVE.get().map(|active| (active.level, active.sink.dir()))
}

fn start(level: LevelFilter, sink: &Sink) -> Result<ActiveLogger, String> {
    let spec = level.as_str().to_ascii_lowercase();
    let logger =
        Logger::try_with_str(&spec).map_err(|err| format!("bad log spec `{spec}`: {err}"))?;
    let handle = match sink {
        Sink::Stderr => logger.log_to_stderr().start(),
        Sink::Dir(dir) => {
            std::fs::create_dir_all(dir)
                .map_err(|err| format!("cannot create log dir `{}`: {err}", dir.display()))?;
            logger
                .log_to_file(
                    FileSpec::default()
                        .directory(dir.clone())
                        .basename("robant")
                        .suppress_timestamp(),
                )
                .append()
                .format_for_files(flexi_logger::detailed_format)
                .start()
        }
    }
    .map_err(|err| format!("logger did not start: {err}"))?;

    info!(
        "event=logging_start module=logging status=ok level={} sink={} version={}",
        spec,
        sink,
        env!("CARGO_PKG_VERSION")
    );
    Ok(ActiveLogger {
        level,
        sink: sink.clone(),
        _handle: handle,
    })
}

fn parse_level(level: &str) -> Result<LevelFilter, String> {
    let level = level.trim();
    let level = if level.eq_ignore_ascii_case("warning") {
        "warn"
    } else {
        level
    };
    match level.parse::<LevelFilter>() {
        Ok(LevelFilter::Off) | Err(_) => Err(format!(
            "unknown log level `{level}`; use trace, debug, info, warn or error"
        )),
        Ok(filter) => Ok(filter),
    }
}

#[cfg(test)]
mod tests {
    use super::{init_logging, logging_status, parse_level};
    use crate::config::LoggingConfig;
    use log::LevelFilter;

    #[test]
    fn parse_level_is_case_insensitive_and_refuses_off() {
        assert_eq!(parse_level(" INFO "), Ok(LevelFilter::Info));
        assert_eq!(parse_level("Warning"), Ok(LevelFilter::Warn));
        assert!(parse_level("off").is_err());
        assert!(parse_level("verbose").is_err());
    }

    #[test]
    fn relative_dir_is_refused_before_anything_starts() {
        let error = init_logging(&LoggingConfig {
            level: "info".to_string(),
            dir: Some("logs/dev".into()),
        })
        .expect_err("relative dir should be refused");
        assert!(error.contains("not absolute"));
    }

    #[test]
    fn second_init_must_match_the_running_logger() {
        let log_dir = tempfile::tempdir().expect("tempdir");
        let config = LoggingConfig {
            level: "info".to_string(),
            dir: Some(log_dir.path().join("logs")),
        };

        init_logging(&config).expect("first init should succeed");
        init_logging(&config).expect("same config should be a no-op");

        let louder = init_logging(&LoggingConfig {
            level: "debug".to_string(),
            ..config.clone()
        })
        .expect_err("another level should fail");
        assert!(louder.contains("already running"));

        let elsewhere = init_logging(&LoggingConfig {
            level: "info".to_string(),
            dir: None,
        })
        .expect_err("another sink should fail");
        assert!(elsewhere.contains("stderr"));

        assert_eq!(
            logging_status(),
            Some((LevelFilter::Info, config.dir.clone()))
        );
        assert!(log_dir.path().join("logs").join("robant.log").exists());
    }
}

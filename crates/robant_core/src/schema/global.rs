//! Process-wide schema table.
//!
//! # Invariants
//! - At most one registry is installed at a time.
//! - An installed registry is never mutated; readers share one `Arc`.
//! - Only `reset_schema` clears the slot.

use crate::schema::registry::{SchemaError, SchemaRegistry, SchemaResult};
use log::info;
use once_cell::sync::Lazy;
use std::sync::{Arc, PoisonError, RwLock};

static INSTALLED: Lazy<RwLock<Option<Arc<SchemaRegistry>>>> = Lazy::new(|| RwLock::new(None));

/// Installs `registry` as the process-wide schema.
///
/// # Errors
/// - `SchemaError::AlreadyInstalled` when a schema is already installed.
pub fn install_schema(registry: SchemaRegistry) -> SchemaResult<Arc<SchemaRegistry>> {
    let mut slot = INSTALLED.write().unwrap_or_else(PoisonError::into_inner);
    if slot.is_some() {
        return Err(SchemaError::AlreadyInstalled);
    }
    let shared = Arc::new(registry);
    *slot = Some(Arc::clone(&shared));
    info!(
        "event=schema_install module=schema status=ok kinds={}",
        shared.kinds().count()
    );
    Ok(shared)
}

/// Returns the installed schema, if any.
pub fn installed_schema() -> Option<Arc<SchemaRegistry>> {
    INSTALLED
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Clears the process-wide schema.
///
/// # Errors
/// - `SchemaError::NotInstalled` when nothing is installed.
pub fn reset_schema() -> SchemaResult<()> {
    let mut slot = INSTALLED.write().unwrap_or_else(PoisonError::into_inner);
    if slot.take().is_none() {
        return Err(SchemaError::NotInstalled);
    }
    info!("event=schema_reset module=schema status=ok");
    Ok(())
}

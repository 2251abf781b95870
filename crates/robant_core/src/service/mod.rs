//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate loader, validator, importer and index builder into cycles.
//! - Keep CLI and embedding layers decoupled from pipeline details.

pub mod cycle_service;
pub mod workspace_service;

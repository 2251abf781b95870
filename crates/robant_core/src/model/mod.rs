//! Domain model for the note hierarchy.
//!
//! # Responsibility
//! - Define the note, task status and field value shapes shared by the
//!   loader, validator, index and query layers.
//!
//! # Invariants
//! - Every indexed note is identified by a stable `NoteId`.
//! - Note kinds and task statuses are closed enumerations.

pub mod note;
pub mod status;
pub mod value;

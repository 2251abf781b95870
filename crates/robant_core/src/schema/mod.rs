//! Schema registry: recognized metadata fields per note kind.

pub mod field;
pub mod global;
pub mod registry;

pub use field::{FieldSpec, FieldType};
pub use global::{install_schema, installed_schema, reset_schema};
pub use registry::{SchemaError, SchemaRegistry, SchemaResult, RESERVED_FIELDS};

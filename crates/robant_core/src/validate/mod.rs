//! Validator: checks raw notes against the schema registry.

pub mod error;
pub mod validator;

pub use error::{ValidationError, ValidationErrorKind};
pub use validator::{Validation, Validator};

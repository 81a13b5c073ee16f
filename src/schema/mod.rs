//! Schema system - grammar tables, datatypes and validation

pub mod datatypes;
pub mod grammar;
pub mod registry;
pub mod validator;

pub use registry::{Schema, SchemaRegistry};
pub use validator::{ValidationError, ValidationResult, Validator};

//! LCV: Lifecycle Configuration Validator
//!
//! Parses and validates object-storage `LifecycleConfiguration` XML
//! documents against the bundled RELAX NG grammar, builds a typed model
//! from them and writes them back out in canonical form.

pub mod cli;
pub mod core;
pub mod schema;
pub mod xml;

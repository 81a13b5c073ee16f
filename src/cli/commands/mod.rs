//! CLI command implementations

pub mod completions;
pub mod fmt;
pub mod schema;
pub mod show;
pub mod validate;

//! Core module - configuration, lifecycle model and lints

pub mod config;
pub mod lifecycle;
pub mod lint;

pub use config::{Config, ConfigError};
pub use lifecycle::{LifecycleConfiguration, ModelError, Rule, RuleStatus};
pub use lint::{lint, LintKind, LintWarning};

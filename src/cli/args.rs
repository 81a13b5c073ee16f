//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use miette::Result;
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, fmt::FmtArgs, schema::SchemaCommands, show::ShowArgs,
    validate::ValidateArgs,
};
use crate::core::Config;

#[derive(Parser)]
#[command(name = "lcv")]
#[command(author, version, about = "Lifecycle Configuration Validator")]
#[command(long_about = "Validate, inspect and format object-storage LifecycleConfiguration XML documents.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Config file to use instead of ./.lcv.yaml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

impl GlobalOpts {
    /// Load the layered configuration
    pub fn load_config(&self) -> Result<Config> {
        Ok(Config::load(self.config.as_deref())?)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate lifecycle documents against the schema
    Validate(ValidateArgs),

    /// Show a lifecycle document as YAML or JSON
    Show(ShowArgs),

    /// Print a lifecycle document in canonical XML form
    Fmt(FmtArgs),

    /// Inspect the bundled schemas
    #[command(subcommand)]
    Schema(SchemaCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Use the configured default (yaml if unset)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// JSON format (for programming)
    Json,
}

impl OutputFormat {
    /// Replace `Auto` with the configured default format
    pub fn resolve(self, config: &Config) -> Result<OutputFormat> {
        if self != OutputFormat::Auto {
            return Ok(self);
        }
        match config.default_format.as_deref() {
            None => Ok(OutputFormat::Auto),
            Some(name) => OutputFormat::from_str(name, true).map_err(|_| {
                miette::miette!(
                    help = "Use one of: auto, yaml, json",
                    "Unknown default_format '{}'",
                    name
                )
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_format_resolution() {
        let mut config = Config::default();
        assert_eq!(OutputFormat::Auto.resolve(&config).unwrap(), OutputFormat::Auto);

        config.default_format = Some("JSON".to_string());
        assert_eq!(OutputFormat::Auto.resolve(&config).unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::Yaml.resolve(&config).unwrap(), OutputFormat::Yaml);

        config.default_format = Some("xml".to_string());
        assert!(OutputFormat::Auto.resolve(&config).is_err());
    }
}

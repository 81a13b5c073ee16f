//! `lcv show` command - print the typed model of a lifecycle document

use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::read_input;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::lifecycle::LifecycleConfiguration;

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Lifecycle document (`-` for stdin)
    pub file: PathBuf,
}

pub fn run(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let config = global.load_config()?;
    let format = global.format.resolve(&config)?;

    let (filename, content) = read_input(&args.file)?;
    let root = config.validator().parse(
        &content,
        &filename,
        Some(LifecycleConfiguration::ROOT_TAG),
    )?;
    let lifecycle = LifecycleConfiguration::from_element(&root)?;

    print!("{}", render(&lifecycle, format)?);
    Ok(())
}

fn render(lifecycle: &LifecycleConfiguration, format: OutputFormat) -> Result<String> {
    // Go through a JSON value so YAML output uses plain maps for enums
    let value = serde_json::to_value(lifecycle).into_diagnostic()?;
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&value).into_diagnostic()?;
            Ok(format!("{}\n", json))
        }
        OutputFormat::Yaml | OutputFormat::Auto => serde_yml::to_string(&value).into_diagnostic(),
    }
}

//! `lcv fmt` command - rewrite a lifecycle document in canonical form

use console::style;
use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::PathBuf;

use crate::cli::helpers::{is_stdin, read_input};
use crate::cli::GlobalOpts;
use crate::core::lifecycle::LifecycleConfiguration;
use crate::xml::writer::{self, WriteOptions};

/// Encoding applied to free-text values
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodingType {
    /// Percent-encode Prefix, tag Key and tag Value
    Url,
}

#[derive(clap::Args, Debug)]
pub struct FmtArgs {
    /// Lifecycle document (`-` for stdin)
    pub file: PathBuf,

    /// Write the result back to the file instead of printing it
    #[arg(long, short = 'w')]
    pub write: bool,

    /// Encode free-text values
    #[arg(long, value_enum)]
    pub encoding_type: Option<EncodingType>,

    /// Leave the S3 namespace off the root element
    #[arg(long)]
    pub no_s3_namespace: bool,
}

impl FmtArgs {
    fn write_options(&self) -> WriteOptions {
        WriteOptions {
            url_encode: self.encoding_type == Some(EncodingType::Url),
            s3_namespace: !self.no_s3_namespace,
        }
    }
}

pub fn run(args: FmtArgs, global: &GlobalOpts) -> Result<()> {
    if args.write && is_stdin(&args.file) {
        return Err(miette::miette!(
            help = "Pass a file path, or drop --write to print to stdout",
            "Cannot use --write with standard input"
        ));
    }

    let config = global.load_config()?;
    let (filename, content) = read_input(&args.file)?;
    let root = config.validator().parse(
        &content,
        &filename,
        Some(LifecycleConfiguration::ROOT_TAG),
    )?;
    let lifecycle = LifecycleConfiguration::from_element(&root)?;
    let formatted = writer::to_string_with(&lifecycle, args.write_options());

    if !args.write {
        print!("{}", formatted);
        return Ok(());
    }

    if formatted == content {
        if !global.quiet {
            println!("{} {} (unchanged)", style("✓").green(), filename);
        }
        return Ok(());
    }

    std::fs::write(&args.file, &formatted)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to write {}", filename))?;
    if !global.quiet {
        println!("{} Formatted {}", style("✓").green(), filename);
    }
    Ok(())
}

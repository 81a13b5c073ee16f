//! `lcv validate` command - Validate lifecycle documents against the schema

use console::style;
use miette::Result;
use std::path::PathBuf;
use tracing::debug;
use walkdir::WalkDir;

use crate::cli::helpers::{is_stdin, read_input};
use crate::cli::GlobalOpts;
use crate::schema::validator::ValidationIssue;

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Files or directories to validate, `-` for stdin (default: current directory)
    #[arg()]
    pub paths: Vec<PathBuf>,

    /// Strict mode - warnings become errors
    #[arg(long)]
    pub strict: bool,

    /// Continue validation after first error
    #[arg(long)]
    pub keep_going: bool,

    /// Show summary only, don't show individual errors
    #[arg(long)]
    pub summary: bool,
}

/// Validation statistics
#[derive(Default)]
struct ValidationStats {
    files_checked: usize,
    files_passed: usize,
    files_failed: usize,
    total_errors: usize,
    total_warnings: usize,
    total_rules: usize,
    enabled_rules: usize,
}

pub fn run(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let config = global.load_config()?;
    let strict = args.strict || config.strict();
    let validator = config.validator().strict(strict);
    let detail = !args.summary && !global.quiet;

    let files_to_validate = if args.paths.is_empty() {
        expand_paths(&[PathBuf::from(".")])
    } else {
        expand_paths(&args.paths)
    };
    debug!(files = files_to_validate.len(), strict, "starting validation");

    let mut stats = ValidationStats::default();
    let mut had_error = false;

    if !global.quiet {
        println!(
            "{} Validating {} file(s)...\n",
            style("→").blue(),
            files_to_validate.len()
        );
    }

    for path in &files_to_validate {
        stats.files_checked += 1;

        let (filename, content) = match read_input(path) {
            Ok(input) => input,
            Err(e) => {
                if detail {
                    println!("{} {} - {}", style("✗").red(), path.display(), e);
                }
                stats.files_failed += 1;
                stats.total_errors += 1;
                had_error = true;
                if !args.keep_going {
                    break;
                }
                continue;
            }
        };

        match validator.validate(&content, &filename, None) {
            Ok(result) if result.valid => {
                stats.files_passed += 1;
                stats.total_rules += result.rules;
                stats.enabled_rules += result.enabled_rules;
                stats.total_warnings += result.warnings.len();

                if !detail {
                    continue;
                }
                if !result.has_issues() {
                    println!("{} {}", style("✓").green(), filename);
                } else {
                    println!(
                        "{} {} - {} warning(s)",
                        style("!").yellow(),
                        filename,
                        result.warnings.len()
                    );
                    print_issues(&result.warnings);
                }
            }
            Ok(result) => {
                stats.files_failed += 1;
                stats.total_rules += result.rules;
                stats.enabled_rules += result.enabled_rules;
                stats.total_errors += result.errors.len();
                had_error = true;

                if detail {
                    println!(
                        "{} {} - {} error(s)",
                        style("✗").red(),
                        filename,
                        result.errors.len()
                    );
                    print_issues(&result.errors);
                }

                if !args.keep_going {
                    break;
                }
            }
            Err(e) => {
                stats.files_failed += 1;
                stats.total_errors += e.violation_count();
                had_error = true;

                if detail {
                    println!(
                        "{} {} - {} error(s)",
                        style("✗").red(),
                        filename,
                        e.violation_count()
                    );

                    // Print detailed error using miette
                    let report = miette::Report::new(e);
                    println!("{:?}", report);
                }

                if !args.keep_going {
                    break;
                }
            }
        }
    }

    if !global.quiet {
        print_summary(&stats);
    }

    if had_error {
        if stats.files_failed == 1 {
            Err(miette::miette!("Validation failed: 1 file has errors"))
        } else {
            Err(miette::miette!(
                "Validation failed: {} files have errors",
                stats.files_failed
            ))
        }
    } else {
        if !global.quiet {
            println!(
                "{} All files passed validation!",
                style("✓").green().bold()
            );
        }
        Ok(())
    }
}

fn print_issues(issues: &[ValidationIssue]) {
    for issue in issues {
        let location = match (issue.line, issue.column) {
            (Some(line), Some(column)) => format!("{}:{} ", line, column),
            _ => String::new(),
        };
        println!(
            "    {}{} {}",
            style(location).dim(),
            style(&issue.path).cyan(),
            style(&issue.message).yellow()
        );
        if let Some(suggestion) = &issue.suggestion {
            println!("      {}", style(suggestion).dim());
        }
    }
}

fn print_summary(stats: &ValidationStats) {
    println!();
    println!("{}", style("─".repeat(60)).dim());
    println!("{}", style("Validation Summary").bold());
    println!("{}", style("─".repeat(60)).dim());
    println!("  Files checked:  {}", style(stats.files_checked).cyan());
    println!("  Files passed:   {}", style(stats.files_passed).green());
    println!("  Files failed:   {}", style(stats.files_failed).red());
    println!("  Rules checked:  {}", style(stats.total_rules).cyan());
    println!("  Rules enabled:  {}", style(stats.enabled_rules).cyan());
    println!("  Total errors:   {}", style(stats.total_errors).red());

    if stats.total_warnings > 0 {
        println!(
            "  Total warnings: {}",
            style(stats.total_warnings).yellow()
        );
    }

    println!();
}

/// Expand paths - if a directory is given, find all .xml files in it
fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if is_stdin(path) || !path.is_dir() {
            files.push(path.clone());
            continue;
        }

        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .into_iter()
            .filter_entry(|e| {
                // Skip hidden directories such as .git
                let name = e.file_name().to_string_lossy();
                !name.starts_with('.') || e.depth() == 0
            })
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
            })
            .map(|e| e.path().to_path_buf())
            .collect();
        found.sort();
        files.extend(found);
    }

    files
}

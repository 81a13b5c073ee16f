//! Schema introspection
//!
//! Shows the bundled grammars as an element outline or as raw RELAX NG, so
//! document authors can see the expected structure without external docs.

use clap::Subcommand;
use miette::Result;

use crate::cli::helpers::truncate_str;
use crate::cli::GlobalOpts;
use crate::schema::grammar::outline;
use crate::schema::registry::SchemaRegistry;

/// Schema shown when no name is given
const DEFAULT_SCHEMA: &str = "lifecycle_configuration";

#[derive(Subcommand, Debug)]
pub enum SchemaCommands {
    /// List all bundled schemas
    List,

    /// Show the element outline of a schema
    Show(ShowArgs),
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Schema name (default: lifecycle_configuration)
    pub name: Option<String>,

    /// Show raw RELAX NG compact syntax instead of formatted summary
    #[arg(long)]
    pub raw: bool,
}

pub fn run(cmd: SchemaCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SchemaCommands::List => list_schemas(),
        SchemaCommands::Show(args) => show_schema(args, global),
    }
}

fn list_schemas() -> Result<()> {
    let registry = SchemaRegistry::default();

    println!("Available schemas:\n");
    println!("{:<26} {:<24} {}", "NAME", "ROOT ELEMENT", "DESCRIPTION");
    println!("{}", "-".repeat(80));

    for schema in registry.list() {
        println!(
            "{:<26} {:<24} {}",
            schema.name,
            schema.root.name,
            truncate_str(schema.description, 40)
        );
    }

    println!("\nUse 'lcv schema show <name>' for element details");
    Ok(())
}

fn show_schema(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let registry = SchemaRegistry::default();
    let name = args.name.as_deref().unwrap_or(DEFAULT_SCHEMA);

    let Some(schema) = registry.get(name) else {
        let available: Vec<&str> = registry.list().map(|s| s.name).collect();
        return Err(miette::miette!(
            help = format!("Available schemas: {}", available.join(", ")),
            "Unknown schema: {}",
            name
        ));
    };

    if args.raw {
        print!("{}", schema.source);
        if !schema.source.ends_with('\n') {
            println!();
        }
        return Ok(());
    }

    println!("{}", schema.title);
    println!("{}", "=".repeat(schema.title.len()));
    println!("{}\n", schema.description);

    println!("Elements:");
    println!("{:<44} {:<6} {}", "NAME", "OCCURS", "TYPE");
    println!("{}", "-".repeat(80));

    for entry in outline(schema.root) {
        let marker = if entry.choice { "| " } else { "" };
        let label = format!("{}{}{}", "  ".repeat(entry.depth), marker, entry.name);
        println!(
            "{:<44} {:<6} {}",
            label,
            entry.occurs.as_str(),
            entry.datatype.unwrap_or_default()
        );
    }

    let config = global.load_config()?;
    println!("\nStorage classes: {}", config.storage_classes().join(", "));
    println!("Entries marked '|' are alternatives: exactly one may appear.");
    println!("\nUse --raw for the RELAX NG grammar");
    Ok(())
}

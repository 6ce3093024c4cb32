//! crawlit CLI - extract records from HTML pages with YAML item schemas

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use crawlit::serialization::write_json;
use crawlit::{HtmlExtractor, ItemDef, ItemType, TransformRegistry};
use tracing_subscriber::EnvFilter;

/// Exit code for a dropped record, distinct from usage/config errors
const EXIT_DROPPED: i32 = 2;

#[derive(Parser)]
#[command(name = "crawlit")]
#[command(version, about = "Extract typed records from HTML with declarative item schemas", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load one record from an HTML page and print it as JSON
    Extract {
        /// Path to the item schema YAML
        #[arg(short, long)]
        schema: PathBuf,

        /// HTML file to read, `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Pretty-print the JSON output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Validate an item schema without extracting anything
    Validate {
        /// Path to the item schema YAML
        #[arg(short, long)]
        schema: PathBuf,
    },

    /// Show each field's dialect, sub-pattern and stage order
    Describe {
        /// Path to the item schema YAML
        #[arg(short, long)]
        schema: PathBuf,
    },
}

enum Failure {
    Error(String),
    Dropped(String),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract { schema, input, pretty } => extract(schema, input, pretty),
        Commands::Validate { schema } => validate(schema).map_err(Failure::Error),
        Commands::Describe { schema } => describe(schema).map_err(Failure::Error),
    };

    match result {
        Ok(()) => {}
        Err(Failure::Error(e)) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
        Err(Failure::Dropped(reason)) => {
            eprintln!("Dropped: {}", reason);
            process::exit(EXIT_DROPPED);
        }
    }
}

fn load_item(schema: &Path) -> Result<ItemType, String> {
    let def = ItemDef::load_from_file(schema)
        .map_err(|e| format!("Failed to load schema {}: {}", schema.display(), e))?;
    def.build(&TransformRegistry::with_builtins())
        .map_err(|e| format!("Invalid schema {}: {}", schema.display(), e))
}

fn read_input(input: &Path) -> Result<String, String> {
    if input.as_os_str() == "-" {
        let mut html = String::new();
        io::stdin()
            .read_to_string(&mut html)
            .map_err(|e| format!("Failed to read stdin: {}", e))?;
        Ok(html)
    } else {
        fs::read_to_string(input).map_err(|e| format!("Failed to read {}: {}", input.display(), e))
    }
}

fn extract(schema: PathBuf, input: PathBuf, pretty: bool) -> Result<(), Failure> {
    let item = load_item(&schema).map_err(Failure::Error)?;
    let html = read_input(&input).map_err(Failure::Error)?;

    let document = HtmlExtractor::parse(&html);
    let record = item
        .load(&HtmlExtractor::new(), &document)
        .map_err(|dropped| Failure::Dropped(dropped.reason()))?;

    write_json(io::stdout().lock(), &record, pretty)
        .map_err(|e| Failure::Error(format!("Failed to write record: {}", e)))
}

fn validate(schema: PathBuf) -> Result<(), String> {
    let item = load_item(&schema)?;
    println!("✓ {}: {} fields", item.name(), item.len());
    Ok(())
}

fn describe(schema: PathBuf) -> Result<(), String> {
    let item = load_item(&schema)?;
    println!("{}", item.name());

    for (name, field) in item.fields() {
        let stages: Vec<String> = field
            .pipeline()
            .kinds()
            .iter()
            .map(|kind| format!("{:?}", kind).to_lowercase())
            .collect();

        println!("  {} ({})", name, field.kind());
        println!("    selector: {} [{}]", field.selector(), field.dialect());
        if let Some(pattern) = field.pattern() {
            println!("    pattern:  {}", pattern.as_str());
        }
        println!("    stages:   {}", stages.join(" → "));
    }
    Ok(())
}

//! strata CLI — driving adapter for the strata hierarchy reader.
//!
//! Subcommands:
//! - `read <schema> [<input>] [--name <name>]` — stream targets as JSON lines
//! - `check <schema>` — validate the schema loads without errors
//! - `decls <schema>` — print the validated declaration tree

mod schema;

use clap::{Parser, Subcommand};
use schema::{describe, Schema};
use std::fmt::Debug;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use strata::NodeId;
use strata_edi::EdiReader;
use strata_flat::FlatReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "strata", version)]
#[command(about = "Rebuild the hierarchy of flat structured text and print it as JSON")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream every target in the input as one JSON document per line
    Read {
        /// Schema file (.json, or YAML otherwise)
        schema: PathBuf,
        /// Input file; stdin when omitted
        input: Option<PathBuf>,
        /// Input name used in error messages
        #[arg(long)]
        name: Option<String>,
    },
    /// Validate a schema
    Check {
        /// Schema file
        schema: PathBuf,
    },
    /// Print the validated declaration tree
    Decls {
        /// Schema file
        schema: PathBuf,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Read {
            schema,
            input,
            name,
        } => cmd_read(&schema, input.as_deref(), name),
        Command::Check { schema } => cmd_check(&schema),
        Command::Decls { schema } => cmd_decls(&schema),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Commands
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_read(schema_path: &Path, input: Option<&Path>, name: Option<String>) -> Result<(), String> {
    let schema = Schema::load(schema_path)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let count = match input {
        Some(path) => {
            let file =
                File::open(path).map_err(|e| format!("failed to open \"{}\": {e}", path.display()))?;
            let name = name.unwrap_or_else(|| path.display().to_string());
            stream(&schema, name, BufReader::new(file), &mut out)?
        }
        None => {
            let name = name.unwrap_or_else(|| "<stdin>".to_owned());
            stream(&schema, name, io::stdin().lock(), &mut out)?
        }
    };
    out.flush().map_err(|e| format!("failed to write output: {e}"))?;
    tracing::info!(targets = count, "input read");
    Ok(())
}

fn cmd_check(schema_path: &Path) -> Result<(), String> {
    let schema = Schema::load(schema_path)?;
    println!(
        "Schema valid: {} declarations, target '{}'",
        schema.decl_count(),
        schema.target_path()
    );
    Ok(())
}

fn cmd_decls(schema_path: &Path) -> Result<(), String> {
    let schema = Schema::load(schema_path)?;
    let lines = match &schema {
        Schema::Flat(flat) => describe(flat.decls()),
        Schema::Edi(edi) => describe(edi.decls()),
    };
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Streaming
// ═══════════════════════════════════════════════════════════════════════════════

/// The two format readers, behind one interface.
trait TargetStream {
    fn next_target(&mut self) -> Result<Option<serde_json::Value>, String>;
}

impl<R: BufRead + Debug> TargetStream for FlatReader<R> {
    fn next_target(&mut self) -> Result<Option<serde_json::Value>, String> {
        let target: Option<NodeId> = self.read().map_err(|e| e.to_string())?;
        Ok(target.map(|t| self.tree().to_json(t)))
    }
}

impl<R: BufRead + Debug> TargetStream for EdiReader<R> {
    fn next_target(&mut self) -> Result<Option<serde_json::Value>, String> {
        let target: Option<NodeId> = self.read().map_err(|e| e.to_string())?;
        Ok(target.map(|t| self.tree().to_json(t)))
    }
}

fn stream<R: BufRead + Debug>(
    schema: &Schema,
    name: String,
    input: R,
    out: &mut impl Write,
) -> Result<usize, String> {
    match schema {
        Schema::Flat(flat) => write_targets(&mut FlatReader::new(name, flat, input), out),
        Schema::Edi(edi) => write_targets(&mut EdiReader::new(name, edi, input), out),
    }
}

fn write_targets(reader: &mut impl TargetStream, out: &mut impl Write) -> Result<usize, String> {
    let mut count = 0;
    while let Some(target) = reader.next_target()? {
        serde_json::to_writer(&mut *out, &target)
            .map_err(|e| format!("failed to write output: {e}"))?;
        out.write_all(b"\n")
            .map_err(|e| format!("failed to write output: {e}"))?;
        count += 1;
    }
    Ok(count)
}

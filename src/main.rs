//! declap - declarative command-line parsing driven by JSON schemas.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

use declap::{compile, parse, process_env, ParseOutcome, Root};

/// Declarative command-line parsing driven by JSON schemas.
#[derive(Parser, Debug)]
#[command(name = "declap", version, about, disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse arguments against a schema and print the result as JSON
    Parse {
        /// Path to the JSON schema file
        #[arg(long)]
        schema: PathBuf,

        /// Arguments to parse for the target program
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Load and compile a schema, reporting any errors
    Check {
        /// Path to the JSON schema file
        #[arg(long)]
        schema: PathBuf,
    },
}

fn load_schema(path: &PathBuf) -> Result<Root> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read schema file {}", path.display()))?;
    let root = Root::from_json(&text)
        .with_context(|| format!("invalid schema in {}", path.display()))?;
    Ok(root)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { schema, args } => {
            let root = load_schema(&schema)?;
            let compiled = compile(&root);

            match parse(&compiled, &args, process_env) {
                Ok(ParseOutcome::Success {
                    config,
                    command_path,
                }) => {
                    let report = json!({
                        "result": "ok",
                        "command": command_path,
                        "config": config,
                    });
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                Ok(ParseOutcome::Help { command_path }) => {
                    let report = json!({ "result": "help", "command": command_path });
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                Ok(ParseOutcome::Version) => {
                    let report = json!({ "result": "version", "version": compiled.version });
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                Ok(ParseOutcome::Manpage { command_path }) => {
                    let report = json!({ "result": "manpage", "command": command_path });
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                Err(err) => {
                    eprintln!("{}: {}", compiled.name, err);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Check { schema } => {
            let root = load_schema(&schema)?;
            let compiled = compile(&root);
            println!("{}: schema ok", compiled.name);
        }
    }

    Ok(ExitCode::SUCCESS)
}

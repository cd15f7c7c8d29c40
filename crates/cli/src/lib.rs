pub mod commands;

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use shopwise_core::config::SummaryMode;
use shopwise_core::summary::Language;

use commands::compare::CompareArgs;
use commands::match_query::MatchArgs;
use commands::CommandResult;

#[derive(Debug, Parser)]
#[command(
    name = "shopwise",
    about = "Compare grocery basket prices across stores",
    long_about = "Match a free-text shopping list against a product catalog, total it per store, and explain which store is cheapest.",
    after_help = "Examples:\n  shopwise compare \"2x milch\" brot eier\n  shopwise compare --lang de --export basket.csv milch, nutela\n  echo \"kaffe, zucker\" | shopwise compare --stdin --json\n  shopwise match kartofeln\n  shopwise doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Price a shopping list at every store and summarize the result")]
    Compare {
        #[arg(help = "Shopping list items; commas inside an argument also separate items")]
        items: Vec<String>,
        #[arg(long, help = "Read additional items from stdin, one per line or comma separated")]
        stdin: bool,
        #[arg(long = "lang", help = "Summary language (en|de)")]
        language: Option<Language>,
        #[arg(long, help = "Minimum match score in 0.0..=1.0")]
        threshold: Option<f64>,
        #[arg(long, help = "Catalog JSON file instead of the built-in staples")]
        catalog: Option<PathBuf>,
        #[arg(long, help = "Summary mode (template|llm)")]
        summary: Option<SummaryMode>,
        #[arg(long, help = "Write the comparison as CSV to this path")]
        export: Option<PathBuf>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(name = "match", about = "Show the best catalog candidate and score for one query")]
    Match {
        query: String,
        #[arg(long, help = "Minimum match score in 0.0..=1.0")]
        threshold: Option<f64>,
        #[arg(long, help = "Catalog JSON file instead of the built-in staples")]
        catalog: Option<PathBuf>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Describe the loaded catalog and any skipped records")]
    Catalog {
        #[arg(long, help = "Catalog JSON file instead of the built-in staples")]
        catalog: Option<PathBuf>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, catalog loading, summary templates and LLM readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Compare { items, stdin, language, threshold, catalog, summary, export, json } => {
            let stdin = match stdin.then(read_stdin).transpose() {
                Ok(stdin) => stdin,
                Err(error) => {
                    let result = CommandResult::failure(
                        "compare",
                        "input",
                        format!("failed to read stdin: {error}"),
                        2,
                    );
                    return finish(result);
                }
            };
            commands::compare::run(CompareArgs {
                items,
                stdin,
                language,
                threshold,
                catalog,
                summary,
                export,
                json,
            })
        }
        Command::Match { query, threshold, catalog, json } => {
            commands::match_query::run(MatchArgs { query, threshold, catalog, json })
        }
        Command::Catalog { catalog, json } => commands::catalog::run(catalog, json),
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
    };

    finish(result)
}

fn finish(result: CommandResult) -> ExitCode {
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn read_stdin() -> io::Result<String> {
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(String::new());
    }
    let mut buffer = String::new();
    stdin.read_to_string(&mut buffer)?;
    Ok(buffer)
}

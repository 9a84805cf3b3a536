// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dbreader_lib::config::ReaderConfig;
use dbreader_lib::engine::types::DEFAULT_ROW_LIMIT;
use dbreader_lib::engine::{EngineError, ErrorResponse};
use dbreader_lib::{observability, AppState, DEFAULT_QUERY};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "dbreader")]
#[command(about = "Read-only SQL runner with natural-language query generation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a read-only query and print the result as JSON
    Query {
        /// SELECT or WITH statement
        #[arg(value_name = "SQL", default_value = DEFAULT_QUERY)]
        sql: String,

        /// Maximum rows to return (clamped to 1..=1000)
        #[arg(long, short, default_value_t = DEFAULT_ROW_LIMIT as i64, allow_negative_numbers = true)]
        limit: i64,
    },
    /// Stream every row of a read-only query as CSV
    Export {
        #[arg(value_name = "SQL")]
        sql: String,

        /// Output file path (stdout when omitted)
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Generate a query from a natural-language request
    Generate {
        #[arg(value_name = "PROMPT")]
        prompt: String,

        /// Also execute the generated query
        #[arg(long)]
        run: bool,
    },
    /// Suggest questions the current schema can answer
    Suggest,
    /// Print the cached schema
    Schema {
        /// Print the structured snapshot instead of the prompt text
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    fn needs_schema(&self) -> bool {
        matches!(
            self,
            Commands::Generate { .. } | Commands::Suggest | Commands::Schema { .. }
        )
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _log_guard = observability::init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "command failed");
            match serde_json::to_string(&error_response(&err)) {
                Ok(json) => eprintln!("{json}"),
                Err(_) => eprintln!("Error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

/// Engine failures keep their reason; anything else is reported as `internal`.
fn error_response(err: &anyhow::Error) -> ErrorResponse {
    match err.downcast_ref::<EngineError>() {
        Some(engine) => engine.to_response(),
        None => ErrorResponse {
            error: format!("{err:#}"),
            reason: "internal".to_string(),
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ReaderConfig::from_env().context("Invalid configuration")?;
    let state = AppState::connect(&config)
        .await
        .context("Failed to start dbreader")?;
    if cli.command.needs_schema() {
        state.load_initial_schema().await;
    }
    let service = &state.service;

    match cli.command {
        Commands::Query { sql, limit } => {
            let result = service.execute_query(&sql, limit).await?;
            print_json(&result)?;
        }
        Commands::Export { sql, out } => {
            let summary = match out {
                Some(path) => {
                    let mut file = tokio::fs::File::create(&path)
                        .await
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    let summary = service.export_csv(&sql, &mut file).await?;
                    eprintln!("Exported {} rows to: {}", summary.rows_exported, path.display());
                    summary
                }
                None => {
                    let mut stdout = tokio::io::stdout();
                    service.export_csv(&sql, &mut stdout).await?
                }
            };
            tracing::debug!(elapsed_ms = summary.elapsed_ms, "export command done");
        }
        Commands::Generate { prompt, run } => {
            let generated = service.generate_query(&prompt).await?;
            print_json(&generated)?;

            if run {
                if let Some(query) = generated.query() {
                    let result = service.execute_query(query, DEFAULT_ROW_LIMIT as i64).await?;
                    print_json(&result)?;
                }
            }
        }
        Commands::Suggest => {
            let categories = service.suggest_questions().await?;
            print_json(&categories)?;
        }
        Commands::Schema { json } => {
            if json {
                print_json(&*service.schema().snapshot())?;
            } else {
                println!("{}", service.schema().to_text());
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{out}");
    Ok(())
}

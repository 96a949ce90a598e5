use clap::{Parser, Subcommand};
use multidb::config::{load_config, Config};
use multidb::{ConnectionRegistry, MultiDbError, Result, SqliteDriver};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Run statements against the connections listed in a multidb config file.
#[derive(Debug, Parser)]
#[command(name = "multidb", version, about)]
struct Cli {
    /// Configuration file (defaults to <config dir>/multidb/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Connection identifier to use instead of the primary
    #[arg(long, global = true)]
    connection: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List registered connections, marking the primary
    List,
    /// Run a query and print the rows as JSON
    Query { sql: String },
    /// Run a statement batch on every connection
    Exec { sql: String },
    /// Print the row count of a table
    Count { table: String },
    /// Print TEXT escaped for a single-quoted literal
    Escape { text: String },
}

fn main() -> ExitCode {
    // Logs go to stderr so stdout stays machine readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let path = cli
        .config
        .or_else(Config::default_path)
        .ok_or_else(|| MultiDbError::Config("no configuration file given".to_string()))?;
    info!(path = %path.display(), "loading configuration");

    let config = load_config(&path)?;
    let mut registry = ConnectionRegistry::from_config(&config)?;
    let target = cli.connection.as_deref();

    let code = execute(&registry, cli.command, target)?;
    registry.close_all();
    Ok(code)
}

fn execute(
    registry: &ConnectionRegistry<SqliteDriver>,
    command: Command,
    target: Option<&str>,
) -> Result<ExitCode> {
    match command {
        Command::List => {
            for id in registry.keys() {
                let marker = if registry.primary() == Some(id) { "*" } else { " " };
                println!("{} {}", marker, id);
            }
        }
        Command::Query { sql } => {
            let rows = registry.get_assoc(&sql, target)?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Command::Exec { sql } => {
            let report = registry.execute(&sql);
            for outcome in report.outcomes() {
                match &outcome.result {
                    Ok(()) => println!("ok     {}", outcome.connection_id),
                    Err(e) => println!("failed {}: {}", outcome.connection_id, e),
                }
            }
            if !report.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Count { table } => {
            println!("{}", registry.count(&table, target)?);
        }
        Command::Escape { text } => {
            println!("{}", registry.escape(&text, target)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}

//! mssql-pg-dump CLI - export a SQL Server schema as a PostgreSQL load script.

use clap::{Parser, Subcommand};
use mssql_pg_dump::{Config, DumpError, MssqlFactory, Orchestrator};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "mssql-pg-dump")]
#[command(about = "Export a SQL Server schema's data as a replayable PostgreSQL script")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print the run result as JSON (to stderr; stdout may carry the script)
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the schema into a SQL script
    Run {
        /// Override source schema
        #[arg(long)]
        schema: Option<String>,

        /// Override output file ("-" for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override maximum rows per INSERT statement
        #[arg(long)]
        max_rows: Option<usize>,

        /// Do not emit DELETE FROM before each table
        #[arg(long)]
        no_truncate: bool,
    },

    /// Show which tables would be exported
    Inspect {
        /// Override source schema
        #[arg(long)]
        schema: Option<String>,
    },

    /// Test the source database connection
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), DumpError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let mut config = Config::load_unvalidated(&cli.config)?;

    match cli.command {
        Commands::Run {
            schema,
            output,
            max_rows,
            no_truncate,
        } => {
            // Apply overrides
            if let Some(schema) = schema {
                config.source.schema = schema;
            }
            if let Some(path) = output {
                config.export.output_path = if path.as_os_str() == "-" {
                    None
                } else {
                    Some(path)
                };
            }
            if let Some(n) = max_rows {
                config.export.max_rows_per_insert = n;
            }
            if no_truncate {
                config.export.truncate_tables = false;
            }
            config.validate()?;
            info!("Loaded configuration from {:?}", cli.config);

            // Setup signal handling for graceful shutdown (SIGINT and SIGTERM)
            let cancel_token = setup_signal_handler();

            let factory = Arc::new(MssqlFactory::new(config.source.clone()));
            let orchestrator = Orchestrator::new(config, factory);
            let result = orchestrator.run(cancel_token).await?;

            if cli.output_json {
                eprintln!("{}", result.to_json()?);
            } else {
                let status_msg = if result.is_success() {
                    "Export completed!"
                } else {
                    "Export finished with errors"
                };
                eprintln!("\n{}", status_msg);
                eprintln!("  Run ID: {}", result.run_id);
                eprintln!("  Duration: {:.2}s", result.duration_seconds);
                eprintln!(
                    "  Tables: {}/{} ({} excluded)",
                    result.tables_exported, result.tables_total, result.tables_excluded
                );
                eprintln!("  Rows: {}", result.rows_exported);
                eprintln!("  Throughput: {} rows/sec", result.rows_per_second);
                if !result.failed_tables.is_empty() {
                    eprintln!("  Failed tables: {:?}", result.failed_tables);
                }
            }

            result.into_result()?;
        }

        Commands::Inspect { schema } => {
            if let Some(schema) = schema {
                config.source.schema = schema;
            }
            config.validate()?;

            let factory = Arc::new(MssqlFactory::new(config.source.clone()));
            let orchestrator = Orchestrator::new(config, factory);
            let database = orchestrator.inspect().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&database)?);
            } else {
                println!("Tables:");
                for table in &database.tables {
                    let marker = if table.excluded { "excluded" } else { "export" };
                    println!("  [{}] {}", marker, table.full_name());
                    for column in &table.columns {
                        println!(
                            "      {} {} -> {}",
                            column.name, column.data_type, column.sql_type
                        );
                    }
                }
                println!(
                    "\n  {} to export, {} excluded",
                    database.exported_tables().count(),
                    database.excluded_count()
                );
            }
        }

        Commands::HealthCheck => {
            config.validate()?;
            let factory = Arc::new(MssqlFactory::new(config.source.clone()));
            let orchestrator = Orchestrator::new(config, factory);
            let result = orchestrator.health_check().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Source (MSSQL): {} ({}ms)",
                    if result.source_connected { "OK" } else { "FAILED" },
                    result.source_latency_ms
                );
                if let Some(ref err) = result.source_error {
                    println!("    Error: {}", err);
                }
                if let Some(count) = result.tables_visible {
                    println!("    Tables and views visible: {}", count);
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.healthy {
                return Err(DumpError::pool(
                    result.source_error.unwrap_or_default(),
                    "health check",
                ));
            }
        }
    }

    Ok(())
}

/// Logs always go to stderr; stdout may carry the generated script.
fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Setup signal handlers for graceful shutdown.
///
/// Returns a CancellationToken that will be cancelled when a signal is received.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    for kind in [SignalKind::interrupt(), SignalKind::terminate()] {
        let token = cancel_token.clone();
        tokio::spawn(async move {
            let mut stream = match signal(kind) {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Failed to install signal handler: {}", e);
                    return;
                }
            };
            stream.recv().await;
            warn!("Received shutdown signal, stopping export...");
            token.cancel();
        });
    }

    cancel_token
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        warn!("Received Ctrl-C, stopping export...");
        token.cancel();
    });

    cancel_token
}

//! gdb-freight command-line interface.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;
use tracing_subscriber::EnvFilter;

use gdb_freight::{Config, ExchangeError, Orchestrator};

#[derive(Parser)]
#[command(
    name = "gdb-freight",
    version,
    about = "Geodata exchange between geodatabase-like stores",
    long_about = "Pushes or pulls feature classes, tables, and raster datasets from a source \
                  store to a target store, following the exchange protocol's control tables."
)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, global = true, default_value = "config.yaml")]
    config: PathBuf,

    /// Log verbosity (overridden by RUST_LOG when set)
    #[arg(long, global = true, default_value = "info")]
    verbosity: Verbosity,

    /// Log output format
    #[arg(long, global = true, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Verbosity {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    fn as_str(self) -> &'static str {
        match self {
            Verbosity::Error => "error",
            Verbosity::Warn => "warn",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
            Verbosity::Trace => "trace",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the exchange
    Run {
        /// Build and print the plan without writing to the target
        #[arg(long)]
        dry_run: bool,

        /// Print the run result as JSON on stdout
        #[arg(long)]
        output_json: bool,
    },
    /// Build the transfer plan and print it without executing
    Plan {
        /// Print the plan as JSON instead of a table
        #[arg(long)]
        output_json: bool,
    },
    /// Verify both stores and their protocol tables
    HealthCheck,
}

fn setup_logging(verbosity: Verbosity, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.as_str()));
    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_writer(std::io::stderr)
            .init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbosity, cli.log_format);

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn execute(cli: Cli) -> Result<(), ExchangeError> {
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Run {
            dry_run,
            output_json,
        } => {
            let orchestrator = Orchestrator::from_config(config)?;
            let result = orchestrator.run(dry_run).await?;
            if output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!(
                    "Run {} finished: {} planned, {} transferred ({} created, {} refreshed), \
                     {} unchanged, {} skipped",
                    result.run_id,
                    result.objects_planned,
                    result.objects_transferred,
                    result.objects_created,
                    result.objects_refreshed,
                    result.objects_unchanged,
                    result.objects_skipped,
                );
            }
            Ok(())
        }
        Commands::Plan { output_json } => {
            let orchestrator = Orchestrator::from_config(config)?;
            let result = orchestrator.run(true).await?;
            if output_json {
                println!("{}", serde_json::to_string_pretty(&result.plan)?);
            } else {
                if result.plan.directives.is_empty() {
                    println!("Nothing to transfer.");
                }
                for d in &result.plan.directives {
                    let mode = if d.detect_changes {
                        "detect-changes"
                    } else if d.already_there {
                        "refresh"
                    } else {
                        "create"
                    };
                    println!(
                        "{:<12} {:<30} {}",
                        mode,
                        d.source_qualified(),
                        d.kind.label()
                    );
                }
                for ds in &result.plan.datasets_to_create {
                    println!("{:<12} {:<30} feature dataset", "create", ds);
                }
            }
            Ok(())
        }
        Commands::HealthCheck => {
            let orchestrator = Orchestrator::from_config(config)?;
            let (source_role, target_role) = orchestrator.health_check().await?;
            println!(
                "OK: source is a {}, target is a {}",
                source_role.as_str(),
                target_role.as_str()
            );
            Ok(())
        }
    }
}

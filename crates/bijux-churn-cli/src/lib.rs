// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod commands;
mod config;
mod helpers;
mod logging;

use bijux_churn_core::{
    resolve_bijux_cache_dir, resolve_bijux_config_path, ConfigPathScope, ErrorCode, ExitCode,
    MachineError,
};
use bijux_churn_ingest::{ExportFormat, IngestError};
use bijux_churn_metrics::{FilterSelection, MetricsError, MetricsErrorCode, Selection};
use bijux_churn_model::Segment;
use clap::{error::ErrorKind, ArgAction, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Generator, Shell};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode as ProcessExitCode;

use config::SourceOverrides;
use logging::LogFlags;

pub const CRATE_NAME: &str = "bijux-churn-cli";

const BIJUX_HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
Usage: {usage}

Options:
{options}

Commands:
{subcommands}
{after-help}";

#[derive(Parser)]
#[command(name = "bijux-churn")]
#[command(version)]
#[command(about = "Churn reconciliation and KPI report CLI")]
#[command(help_template = BIJUX_HELP_TEMPLATE)]
#[command(
    after_help = "Environment:\n  BIJUX_LOG_LEVEL   Log verbosity override\n  BIJUX_CACHE_DIR   Cache root; loaded facts persist under <dir>/churn"
)]
struct Cli {
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[arg(long, global = true, default_value_t = false)]
    quiet: bool,
    #[arg(long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[arg(long, global = true, default_value_t = false)]
    trace: bool,
    #[arg(long = "log-json", global = true, default_value_t = false)]
    log_json: bool,
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long = "print-config-paths", default_value_t = false)]
    print_config_paths: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute every KPI and chart table for one filter selection.
    Report {
        #[command(flatten)]
        sources: SourceArgs,
        #[command(flatten)]
        filters: FilterArgs,
        /// Also write the report as pretty JSON to this file.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Summarize the normalized tables, drop counts and load events.
    Inspect {
        #[command(flatten)]
        sources: SourceArgs,
    },
    /// Write the consolidated churn facts for downstream tools.
    Export {
        #[command(flatten)]
        sources: SourceArgs,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = ExportFormatCli::Csv)]
        format: ExportFormatCli,
    },
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct SourceArgs {
    /// Yearly churn log; repeat for each year. Overrides `[sources] churn`.
    #[arg(long = "churn", value_name = "PATH")]
    churn: Vec<PathBuf>,
    #[arg(long = "active-base", value_name = "PATH")]
    active_base: Option<PathBuf>,
    #[arg(long, value_name = "PATH")]
    backlog: Option<PathBuf>,
    #[arg(long = "current-year")]
    current_year: Option<i32>,
    #[arg(long = "prior-year")]
    prior_year: Option<i32>,
}

impl SourceArgs {
    fn overrides(&self) -> SourceOverrides {
        SourceOverrides {
            churn: self.churn.clone(),
            active_base: self.active_base.clone(),
            backlog: self.backlog.clone(),
            current_year: self.current_year,
            prior_year: self.prior_year,
        }
    }
}

/// Each dimension is "all" unless at least one value is given.
#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    #[arg(long = "year")]
    years: Vec<i32>,
    #[arg(long = "month", value_parser = helpers::parse_month)]
    months: Vec<u8>,
    #[arg(long = "segment", value_parser = helpers::parse_segment)]
    segments: Vec<Segment>,
    #[arg(long = "churn-type")]
    churn_types: Vec<String>,
}

impl FilterArgs {
    fn selection(&self) -> FilterSelection {
        FilterSelection {
            years: selection_of(&self.years),
            months: selection_of(&self.months),
            segments: selection_of(&self.segments),
            churn_types: selection_of(&self.churn_types),
        }
    }
}

fn selection_of<T: Ord + Clone>(values: &[T]) -> Selection<T> {
    if values.is_empty() {
        Selection::All
    } else {
        Selection::only(values.iter().cloned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportFormatCli {
    Csv,
    JsonlZst,
}

impl From<ExportFormatCli> for ExportFormat {
    fn from(value: ExportFormatCli) -> Self {
        match value {
            ExportFormatCli::Csv => Self::Csv,
            ExportFormatCli::JsonlZst => Self::JsonlZst,
        }
    }
}

#[must_use]
pub fn main_entry() -> ProcessExitCode {
    let wants_json = std::env::args().any(|arg| arg == "--json");
    match run() {
        Ok(()) => ProcessExitCode::from(ExitCode::Success as u8),
        Err(err) => {
            emit_error(&err, wants_json);
            ProcessExitCode::from(err.exit_code as u8)
        }
    }
}

fn run() -> Result<(), CliError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{err}");
                return Ok(());
            }
            _ => {
                return Err(MachineError::new(
                    ErrorCode::UsageError,
                    "invalid command line arguments",
                )
                .with_detail("error", err.to_string())
                .into());
            }
        },
    };
    let output_mode = OutputMode { json: cli.json };
    if cli.print_config_paths {
        emit_config_paths(output_mode).map_err(CliError::internal)?;
        return Ok(());
    }

    let command = cli
        .command
        .ok_or_else(|| CliError::new(ErrorCode::UsageError, "missing command; see --help"))?;
    logging::init_tracing(LogFlags {
        quiet: cli.quiet,
        verbose: cli.verbose,
        trace: cli.trace,
        json: cli.log_json,
    });
    let config_path = cli.config.as_deref();

    match command {
        Commands::Completion { shell } => {
            print_completion(shell);
            Ok(())
        }
        Commands::Report {
            sources,
            filters,
            out,
        } => commands::run_report(
            config_path,
            &sources.overrides(),
            &filters.selection(),
            out.as_deref(),
            output_mode,
        ),
        Commands::Inspect { sources } => {
            commands::run_inspect(config_path, &sources.overrides(), output_mode)
        }
        Commands::Export {
            sources,
            out,
            format,
        } => commands::run_export(
            config_path,
            &sources.overrides(),
            &out,
            format.into(),
            output_mode,
        ),
    }
}

#[derive(Clone, Copy)]
struct OutputMode {
    json: bool,
}

fn print_completion<G: Generator>(generator: G) {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    generate(generator, &mut command, name, &mut std::io::stdout());
}

fn emit_config_paths(output_mode: OutputMode) -> Result<(), String> {
    helpers::emit_ok(
        output_mode,
        json!({
            "workspace_config": resolve_bijux_config_path(ConfigPathScope::Workspace),
            "user_config": resolve_bijux_config_path(ConfigPathScope::User),
            "cache_dir": resolve_bijux_cache_dir(),
        }),
    )
}

struct CliError {
    exit_code: ExitCode,
    machine: MachineError,
}

impl From<MachineError> for CliError {
    fn from(machine: MachineError) -> Self {
        Self {
            exit_code: machine.exit_code(),
            machine,
        }
    }
}

impl CliError {
    fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        MachineError::new(code, message).into()
    }

    fn internal(message: String) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    fn config(message: String) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    fn ingest(err: IngestError) -> Self {
        Self::new(ErrorCode::IngestError, err.to_string())
    }

    fn metrics(err: MetricsError) -> Self {
        match err.code {
            MetricsErrorCode::Validation => Self::new(ErrorCode::ValidationError, err.message),
            _ => Self::internal(err.to_string()),
        }
    }
}

fn emit_error(error: &CliError, machine_json: bool) {
    if machine_json {
        match serde_json::to_string(&error.machine) {
            Ok(payload) => eprintln!("{payload}"),
            Err(_) => eprintln!(
                "{{\"code\":\"internal_error\",\"message\":\"failed to encode structured error\",\"details\":{{}}}}"
            ),
        }
    } else {
        eprintln!("{}", error.machine.message);
    }
}

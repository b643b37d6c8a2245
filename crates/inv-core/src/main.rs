//! Storage inventory CLI.
//!
//! Runs the manifest pipeline against a local directory standing in for
//! object storage, and reads back persisted statistics. Command payloads go
//! to stdout as JSON; logs and errors go to stderr.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use inv_common::{Error, StructuredError};
use inv_config::{load_config, ConfigError, ConfigOptions, FileErrorPolicy, ResolvedConfig};
use inv_core::exit_codes::ExitCode;
use inv_core::log_event;
use inv_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use inv_core::{
    filesystem_service, AnalysisError, AnalyzerOptions, CancellationToken, FsManifestReader,
    FsTabularSource, InventoryAnalyzer, ManifestReader,
};
use inv_store::ParquetStatisticsStore;
use serde::Serialize;
use std::sync::Arc;

/// Storage inventory statistics: analyze inventory manifests and persist
/// aggregated tier and metadata statistics
#[derive(Parser)]
#[command(name = "inv-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory standing in for object storage (one subdirectory per container)
    #[arg(long, global = true)]
    storage_root: Option<PathBuf>,

    /// Statistics store directory
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Tracked metadata fields, separated by '|', ';' or ','
    #[arg(long, global = true)]
    metadata_fields: Option<String>,

    /// Inventory files analyzed concurrently
    #[arg(long, global = true)]
    parallel: Option<usize>,

    /// Rows decoded per batch
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    /// Abort analysis after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// What to do when one inventory file fails: abort or skip
    #[arg(long, global = true)]
    file_errors: Option<FileErrorPolicy>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr: human or jsonl
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a manifest, analyze its inventory files and persist the statistics
    Process(LocatorArgs),

    /// Analyze a manifest's inventory files without persisting anything
    Analyze(LocatorArgs),

    /// Show persisted statistics
    Stats(StatsArgs),

    /// Configuration management
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
struct LocatorArgs {
    /// Manifest locator: `container/path/to/manifest.json` or a blob URL
    locator: String,
}

#[derive(Args, Debug)]
struct StatsArgs {
    /// Render an Arrow table instead of JSON
    #[arg(long)]
    table: bool,

    /// Only the most recent N records
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the resolved configuration
    Show,
}

// ============================================================================
// Main entry point
// ============================================================================

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                ExitCode::ArgsError
            } else {
                ExitCode::Success
            };
            let _ = e.print();
            std::process::exit(code.as_i32());
        }
    };

    let log_config = LogConfig::from_env(
        LogLevel::from_verbosity(cli.global.verbose, cli.global.quiet),
        cli.global.log_format,
    );
    init_logging(&log_config);

    let exit_code = match load_config(&config_options(&cli.global)) {
        Ok(resolved) => match &cli.command {
            Commands::Process(args) => run_process(&resolved, args),
            Commands::Analyze(args) => run_analyze(&resolved, args),
            Commands::Stats(args) => run_stats(&resolved, args),
            Commands::Config(args) => match args.command {
                ConfigCommands::Show => run_config_show(&resolved),
            },
        },
        Err(e) => output_config_error(&e),
    };

    std::process::exit(exit_code.as_i32());
}

fn config_options(global: &GlobalOpts) -> ConfigOptions {
    ConfigOptions {
        config_path: global.config.clone(),
        metadata_fields: global.metadata_fields.clone(),
        storage_root: global.storage_root.clone(),
        store_dir: global.store_dir.clone(),
        max_parallel_files: global.parallel,
        batch_size: global.batch_size,
        timeout_secs: global.timeout,
        file_error_policy: global.file_errors,
    }
}

// ============================================================================
// Commands
// ============================================================================

fn run_process(resolved: &ResolvedConfig, args: &LocatorArgs) -> ExitCode {
    let Some(root) = storage_root(resolved) else {
        return ExitCode::ArgsError;
    };
    let service = filesystem_service(&resolved.config, &root);
    let result = service.process_manifest(&args.locator);

    if let Err(code) = print_json(&result) {
        return code;
    }
    if result.is_success() {
        ExitCode::Success
    } else {
        ExitCode::ProcessingFailed
    }
}

fn run_analyze(resolved: &ResolvedConfig, args: &LocatorArgs) -> ExitCode {
    let Some(root) = storage_root(resolved) else {
        return ExitCode::ArgsError;
    };
    let ctx = LogContext::new(generate_run_id()).with_manifest(args.locator.as_str());
    let config = &resolved.config;

    let manifest = match FsManifestReader::new(&root).read_manifest(&args.locator) {
        Ok(Some(manifest)) => manifest,
        Ok(None) => {
            return output_error(
                &Error::ManifestNotFound {
                    locator: args.locator.clone(),
                },
                ExitCode::ProcessingFailed,
            )
        }
        Err(e) => {
            return output_error(&Error::InvalidLocator(e.to_string()), ExitCode::ArgsError)
        }
    };

    let token = match config.analyzer.timeout_secs {
        Some(secs) => CancellationToken::with_timeout(Duration::from_secs(secs)),
        None => CancellationToken::new(),
    };
    let analyzer = InventoryAnalyzer::new(
        Arc::new(FsTabularSource::new(&root)),
        AnalyzerOptions::from(&config.analyzer),
    );

    match analyzer.analyze(&manifest, &config.metadata_fields, &token) {
        Ok(report) => {
            log_event!(
                ctx,
                INFO,
                event_names::ANALYZE_FINISHED,
                Stage::Analyze,
                "inventory analyzed",
                objects = report.statistics.object_count
            );
            match print_json(&report) {
                Ok(()) => ExitCode::Success,
                Err(code) => code,
            }
        }
        Err(e) => {
            log_event!(ctx, ERROR, event_names::ANALYZE_FAILED, Stage::Analyze, "inventory analysis failed", error = %e);
            let code = match e {
                AnalysisError::Cancelled | AnalysisError::DeadlineExceeded => ExitCode::Interrupted,
                _ => ExitCode::ProcessingFailed,
            };
            output_error(&Error::from(e), code)
        }
    }
}

fn run_stats(resolved: &ResolvedConfig, args: &StatsArgs) -> ExitCode {
    let store = ParquetStatisticsStore::open(resolved.config.store.effective_dir());

    if args.table {
        let batches = match store.read_batches() {
            Ok(batches) => batches,
            Err(e) => return output_error(&Error::Store(e.to_string()), ExitCode::IoError),
        };
        match arrow::util::pretty::pretty_format_batches(&batches) {
            Ok(table) => {
                println!("{table}");
                ExitCode::Success
            }
            Err(e) => output_error(&Error::Store(e.to_string()), ExitCode::InternalError),
        }
    } else {
        let mut records = match store.read_all() {
            Ok(records) => records,
            Err(e) => return output_error(&Error::Store(e.to_string()), ExitCode::IoError),
        };
        if let Some(limit) = args.limit {
            let skip = records.len().saturating_sub(limit);
            records.drain(..skip);
        }
        match print_json(&records) {
            Ok(()) => ExitCode::Success,
            Err(code) => code,
        }
    }
}

fn run_config_show(resolved: &ResolvedConfig) -> ExitCode {
    let response = serde_json::json!({
        "source": resolved.source.to_string(),
        "path": resolved.path.as_ref().map(|p| p.display().to_string()),
        "store_dir": resolved.config.store.effective_dir().display().to_string(),
        "config": &resolved.config,
    });
    match print_json(&response) {
        Ok(()) => ExitCode::Success,
        Err(code) => code,
    }
}

// ============================================================================
// Output helpers
// ============================================================================

fn storage_root(resolved: &ResolvedConfig) -> Option<PathBuf> {
    match &resolved.config.storage_root {
        Some(root) => Some(root.clone()),
        None => {
            output_error(
                &Error::Config(
                    "storage root not configured (use --storage-root or INV_STORAGE_ROOT)"
                        .to_string(),
                ),
                ExitCode::ArgsError,
            );
            None
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ExitCode> {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            Ok(())
        }
        Err(e) => Err(output_error(&Error::Json(e), ExitCode::InternalError)),
    }
}

fn output_error(error: &Error, exit_code: ExitCode) -> ExitCode {
    let structured = StructuredError::from(error).with_context("exit_code", exit_code.code_name());
    eprintln!("{}", structured.to_json_pretty());
    exit_code
}

fn output_config_error(error: &ConfigError) -> ExitCode {
    let exit_code = match error {
        ConfigError::IoError { .. } => ExitCode::IoError,
        _ => ExitCode::ArgsError,
    };
    let common = match error {
        ConfigError::ValidationError(inv_config::ValidationError::InvalidValue { field, message }) => {
            Error::InvalidConfig {
                field: field.clone(),
                message: message.clone(),
            }
        }
        other => Error::Config(other.to_string()),
    };
    output_error(&common, exit_code)
}

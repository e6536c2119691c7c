/*!
 * Stamp CLI - Command Line Interface
 *
 * Author: Shane Wall <shaneawall@gmail.com>
 */

use clap::{Parser, Subcommand, ValueEnum};
use stamp::{
    config::{ErrorMode, LogLevel, StampConfig},
    core::{
        cleanup::{clean, clean_old, CleanStats},
        process_directory,
    },
    error::{Result, StampError, EXIT_SUCCESS},
    logging,
    system::LocalSystem,
    ManifestFormat,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stamp")]
#[command(version, about = "Content-hash static assets and write a lookup manifest", long_about = None)]
struct Cli {
    /// Directory holding the original assets
    #[arg(value_name = "SOURCE")]
    source: Option<PathBuf>,

    /// Directory receiving hashed copies and the manifest
    #[arg(value_name = "TARGET")]
    target: Option<PathBuf>,

    /// Include pattern (glob, regex:, path:); overrides excludes (repeatable)
    #[arg(long = "include", value_name = "PATTERN")]
    include: Vec<String>,

    /// Exclude pattern (glob, regex:, path:) (repeatable)
    #[arg(long = "exclude", value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Manifest format (default: from --manifest extension, else json)
    #[arg(long, value_enum, global = true)]
    format: Option<FormatArg>,

    /// Manifest location (default: <TARGET>/manifest.<ext>)
    #[arg(long, value_name = "PATH", global = true)]
    manifest: Option<PathBuf>,

    /// Reuse entries from the existing manifest, copying only what changed
    #[arg(long)]
    amend: bool,

    /// Record per-file errors and keep going (exit code 1)
    #[arg(long)]
    continue_on_error: bool,

    /// Use the fast non-cryptographic hash (XXH3)
    #[arg(long)]
    quick_hash: bool,

    /// Copy stylesheets verbatim instead of rewriting their references
    #[arg(long)]
    no_css: bool,

    /// Plugin adding fields to every entry: integrity, size (repeatable)
    #[arg(long = "plugin", value_name = "NAME")]
    plugins: Vec<String>,

    /// Path to a TOML config file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Path to log file (default: stdout)
    #[arg(long, value_name = "FILE", global = true)]
    log: Option<PathBuf>,

    /// Enable verbose logging (equivalent to --log-level=debug)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Delete the manifest and every hashed file in TARGET
    Clean {
        #[arg(value_name = "TARGET")]
        target: PathBuf,
    },

    /// Delete hashed files in TARGET that the manifest no longer references
    CleanOld {
        #[arg(value_name = "TARGET")]
        target: PathBuf,

        /// Only delete files last modified more than this many days ago
        #[arg(long, value_name = "N")]
        days: Option<u64>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Json,
    Toml,
}

impl From<FormatArg> for ManifestFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => ManifestFormat::Json,
            FormatArg::Toml => ManifestFormat::Toml,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let system = LocalSystem::new();

    match cli.command {
        Some(Commands::Clean { target }) => {
            let stats = clean(&target, &config, &system)?;
            print_clean_summary("clean", &stats);
            Ok(EXIT_SUCCESS)
        }
        Some(Commands::CleanOld { target, days }) => {
            let config = StampConfig {
                clean_old_days: days.or(config.clean_old_days),
                ..config
            };
            let stats = clean_old(&target, &config, &system, chrono::Utc::now())?;
            print_clean_summary("clean-old", &stats);
            Ok(EXIT_SUCCESS)
        }
        None => {
            let source = cli
                .source
                .ok_or_else(|| StampError::Config("Source directory required".to_string()))?;
            let target = cli
                .target
                .ok_or_else(|| StampError::Config("Target directory required".to_string()))?;

            let outcome = process_directory(&source, &target, &config, &system)?;
            let stats = &outcome.report.stats;
            println!(
                "Wrote {} ({} assets: {} written, {} reused, {} skipped)",
                outcome.manifest_path.display(),
                outcome.report.records.len(),
                stats.materialized,
                stats.reused,
                stats.skipped
            );
            for error in &outcome.report.errors {
                eprintln!("Error: {}", error);
            }
            Ok(outcome.exit_code())
        }
    }
}

/// Layer command-line flags over the config file (or defaults)
fn build_config(cli: &Cli) -> Result<StampConfig> {
    let mut config = match &cli.config {
        Some(path) => StampConfig::from_file(path)?,
        None => StampConfig::default(),
    };

    config.include_patterns.extend(cli.include.iter().cloned());
    config.exclude_patterns.extend(cli.exclude.iter().cloned());
    config.plugins.extend(cli.plugins.iter().cloned());

    if let Some(manifest) = &cli.manifest {
        config.manifest_path = Some(manifest.clone());
    }
    match cli.format {
        Some(format) => config.manifest_format = format.into(),
        None => {
            let inferred = cli
                .manifest
                .as_ref()
                .and_then(|path| path.extension())
                .and_then(|ext| ext.to_str())
                .and_then(ManifestFormat::from_extension);
            if let Some(format) = inferred {
                config.manifest_format = format;
            }
        }
    }

    config.amend |= cli.amend;
    config.quick_hash |= cli.quick_hash;
    if cli.continue_on_error {
        config.error_mode = ErrorMode::Continue;
    }
    if cli.no_css {
        config.process_css = false;
    }

    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log.clone();
    }
    config.verbose |= cli.verbose;

    Ok(config)
}

fn print_clean_summary(operation: &str, stats: &CleanStats) {
    println!(
        "{}: removed {} hashed files, kept {}{}",
        operation,
        stats.removed.len(),
        stats.kept,
        if stats.manifest_removed {
            ", removed manifest"
        } else {
            ""
        }
    );
}

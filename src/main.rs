mod backup;
mod block;
mod checker;
mod commands;
mod config;
mod detector;
mod diagnostics;
mod error;
mod frontmatter;
mod index;
mod injector;
mod orchestrator;
mod paths;
mod regen;
mod report;
mod resolver;
mod scanner;
mod types;
mod watch;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::orchestrator::ScanOptions;
use crate::regen::{RegenMode, RegenOptions};

#[derive(Parser)]
#[command(
    name = "autoxref",
    version,
    about = "Detect unlinked mentions and maintain @references blocks"
)]
struct Cli {
    /// Config file (.toml, .yaml, or .json); defaults to `<root>/.autoxref.toml`
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Project root; relative config paths are resolved against it
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    /// Log debug details
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ensure every file references the core standard documents
    Regen {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
        /// Stop after this many files
        #[arg(long)]
        max: Option<usize>,
        /// Which injector mode to run
        #[arg(long, value_enum, default_value_t = RegenMode::Diagnose)]
        mode: RegenMode,
        /// Write the per-file report as JSON
        #[arg(long)]
        output: Option<PathBuf>,
        /// Only files whose root-relative path matches one of these globs
        #[arg(long, num_args = 1..)]
        paths: Vec<String>,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Find unlinked mentions and suggest (or apply) references
    Scan {
        /// Write accepted suggestions into the files
        #[arg(long)]
        apply: bool,
        /// Ask before each injection (implies a single worker)
        #[arg(long)]
        interactive: bool,
        /// Worker threads for processing files
        #[arg(long, short, default_value_t = 1)]
        jobs: usize,
        /// Write the run summary and suggestions as JSON
        #[arg(long)]
        output: Option<PathBuf>,
        /// Files or directories to scan instead of `scan_paths`
        paths: Vec<PathBuf>,
    },
    /// Re-run a dry-run scan whenever scanned files change
    Watch {
        /// Files or directories to watch instead of `scan_paths`
        paths: Vec<PathBuf>,
    },
}

/// Set up `env_logger` on stderr: `info` by default, `RUST_LOG` honoured,
/// `--verbose` and `--quiet` override both.
fn init_logging(verbose: bool, quiet: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    return match run(cli) {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            if e.is_configuration() {
                log::error!("aborted before any file was touched");
            }
            ExitCode::from(3_u8)
        },
    };
}

/// Anchor explicit CLI paths to the current directory; empty means "use the config".
///
/// # Errors
///
/// Returns `Error::Io` if the current directory cannot be read.
fn explicit_paths(given: &[PathBuf]) -> Result<Option<Vec<PathBuf>>, error::Error> {
    if given.is_empty() {
        return Ok(None);
    }
    let anchored = given
        .iter()
        .map(|p| return paths::absolute(p))
        .collect::<Result<Vec<_>, _>>()?;
    return Ok(Some(anchored));
}

/// Load configuration and dispatch to the chosen command.
///
/// # Errors
///
/// Returns configuration errors before any file is touched, and fatal
/// errors from the commands themselves.
fn run(cli: Cli) -> Result<ExitCode, error::Error> {
    let root = paths::absolute(&cli.root)?;
    let config_path = cli.config.as_deref().map(paths::absolute).transpose()?;
    let config = Config::load(&root, config_path.as_deref())?;

    return match cli.command {
        Commands::Regen {
            dry_run,
            max,
            mode,
            output,
            paths,
            yes,
        } => {
            let options = RegenOptions {
                dry_run,
                globs: paths,
                max_files: max,
                mode,
            };
            commands::regen(&config, &options, yes, output.as_deref())
        },
        Commands::Scan {
            apply,
            interactive,
            jobs,
            output,
            paths,
        } => {
            let options = ScanOptions {
                apply,
                interactive,
                jobs,
                paths: explicit_paths(&paths)?,
            };
            commands::scan(&config, &options, output.as_deref())
        },
        Commands::Watch { paths } => watch::run(&config, explicit_paths(&paths)?),
    };
}

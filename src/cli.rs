//! Command-line interface for par-annotate.

use clap::{Parser, Subcommand};
use par_annotate_config::LogLevel;
use std::fmt;
use std::path::PathBuf;

use crate::render::OutputFormat;

/// par-annotate - Annotate console logs with links, highlights and stack-trace styling
#[derive(Parser, Debug)]
#[command(name = "par-annotate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of ~/.config/par-annotate/config.yaml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace); overrides RUST_LOG and the config
    #[arg(long, global = true, value_name = "LEVEL", value_parser = parse_log_level)]
    pub log_level: Option<LogLevel>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Annotate log files, one viewing session per file
    Annotate {
        /// Files to annotate
        #[arg(required = true, value_name = "FILES")]
        files: Vec<PathBuf>,

        /// First line to emit (0-based); the session starts there
        #[arg(long, value_name = "N", default_value_t = 0)]
        from: usize,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Ansi)]
        format: OutputFormat,

        /// Treat the files as the console of this build (JOB#NUMBER)
        #[arg(long, value_name = "JOB#NUMBER", value_parser = parse_build_spec)]
        build: Option<BuildSpec>,

        /// Base URL of the build's job, used to link #N references
        #[arg(long, value_name = "URL", requires = "build", value_parser = parse_job_url)]
        job_url: Option<String>,

        /// Keep reading as the files grow
        #[arg(short, long)]
        follow: bool,
    },
    /// List registered providers in layer order
    Providers,
    /// Print a provider asset with its cache headers
    Asset {
        /// Request path, e.g. /annotators/par_annotate/providers/links/LinkProvider/script.js
        request_path: String,
    },
}

/// `JOB#NUMBER` as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    pub job: String,
    pub number: u64,
}

impl fmt::Display for BuildSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.job, self.number)
    }
}

fn parse_build_spec(s: &str) -> Result<BuildSpec, String> {
    let (job, number) = s
        .rsplit_once('#')
        .ok_or_else(|| format!("expected JOB#NUMBER, got '{s}'"))?;
    if job.is_empty() {
        return Err("job name is empty".to_string());
    }
    let number = number
        .parse::<u64>()
        .map_err(|e| format!("invalid build number '{number}': {e}"))?;
    Ok(BuildSpec {
        job: job.to_string(),
        number,
    })
}

/// Accept absolute http(s) URLs only; links are built by appending to it.
fn parse_job_url(s: &str) -> Result<String, String> {
    let url = url::Url::parse(s).map_err(|e| format!("invalid job URL '{s}': {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(s.to_string()),
        other => Err(format!("unsupported job URL scheme '{other}'")),
    }
}

fn parse_log_level(s: &str) -> Result<LogLevel, String> {
    LogLevel::parse(s).ok_or_else(|| format!("unknown log level '{s}'"))
}

/// Runtime options passed from CLI to the host
#[derive(Clone, Debug)]
pub struct RuntimeOptions {
    /// Explicit config file
    pub config_path: Option<PathBuf>,
    /// Log level from the command line
    pub log_level: Option<LogLevel>,
    /// Subcommand to run
    pub command: Commands,
}

impl From<Cli> for RuntimeOptions {
    fn from(cli: Cli) -> Self {
        Self {
            config_path: cli.config,
            log_level: cli.log_level,
            command: cli.command,
        }
    }
}

/// Parse CLI arguments. Exits on `--help`, `--version` and usage errors.
pub fn process_cli() -> RuntimeOptions {
    Cli::parse().into()
}

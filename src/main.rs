//! selective-checks: compute CI output variables for a single run.
//!
//! Reads the changed files from arguments, a file, or stdin, evaluates them
//! against the configured pattern groups, and writes one output variable per
//! decision to stdout. Logging goes to stderr.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use clap::error::ErrorKind;

use selective_checks::config::Config;
use selective_checks::eval::{GithubEvent, RunContext, Selector};
use selective_checks::logging;
use selective_checks::output::{self, OutputFormat};

#[derive(Parser)]
#[command(name = "selective-checks")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Decide which CI checks a run needs from its changed files", long_about = None)]
struct Cli {
    /// Changed files, relative to the repository root
    files: Vec<String>,

    /// Read newline-separated changed files from PATH ("-" for stdin)
    #[arg(long, value_name = "PATH")]
    files_from: Option<PathBuf>,

    /// Commit under test; when absent everything runs
    #[arg(long, env = "COMMIT_REF")]
    commit_ref: Option<String>,

    /// Branch the run targets
    #[arg(long, env = "DEFAULT_BRANCH", default_value = "main")]
    default_branch: String,

    /// Pull-request label (repeatable)
    #[arg(long = "pr-label", value_name = "LABEL")]
    pr_labels: Vec<String>,

    /// Event that triggered the run
    #[arg(long, env = "GITHUB_EVENT_NAME", default_value = "pull_request")]
    github_event: GithubEvent,

    /// Read the whole run context as JSON from stdin
    #[arg(long, conflicts_with_all = ["files", "files_from", "pr_labels"])]
    stdin_json: bool,

    /// Config overlay (default: ~/.config/selective-checks/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output variable format: set-output, github-output or json
    #[arg(long, default_value = "set-output")]
    format: OutputFormat,

    /// Also append log lines to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log matched files and pattern counts
    #[arg(short, long)]
    verbose: bool,

    /// Only log warnings
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn read_stdin() -> Result<String> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;
    Ok(input)
}

/// Newline-separated paths; blank lines and surrounding whitespace are dropped.
fn parse_file_list(content: &str) -> impl Iterator<Item = String> + '_ {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
}

fn read_file_list(path: &Path) -> Result<Vec<String>> {
    let content = if path == Path::new("-") {
        read_stdin()?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read file list {}", path.display()))?
    };
    Ok(parse_file_list(&content).collect())
}

fn run_context(cli: &Cli) -> Result<RunContext> {
    if cli.stdin_json {
        let input = read_stdin()?;
        return serde_json::from_str(&input).context("failed to parse run context JSON");
    }

    let mut files = cli.files.clone();
    if let Some(path) = &cli.files_from {
        files.extend(read_file_list(path)?);
    }

    Ok(RunContext {
        files,
        default_branch: cli.default_branch.clone(),
        commit_ref: cli.commit_ref.clone().filter(|r| !r.is_empty()),
        pr_labels: cli.pr_labels.iter().cloned().collect(),
        github_event: cli.github_event,
    })
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let selector = Selector::from_config(&config)?;
    let ctx = run_context(&cli)?;

    log::info!(
        "evaluating {} changed files for {} on {} (commit: {})",
        ctx.files.len(),
        ctx.github_event,
        ctx.default_branch,
        ctx.commit_ref.as_deref().unwrap_or("none"),
    );

    let checks = selector.checks(ctx);
    let rendered = output::render(&checks.decisions(), cli.format);

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(rendered.as_bytes())
        .context("failed to write outputs")?;
    stdout.flush().context("failed to write outputs")?;
    Ok(())
}

/// Invalid arguments exit 1 like every other input error; help and version
/// requests keep clap's own exit code 0.
fn parse_exit_code(kind: ErrorKind) -> Option<i32> {
    match kind {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => None,
        _ => Some(1),
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match parse_exit_code(e.kind()) {
            None => e.exit(),
            Some(code) => {
                let _ = e.print();
                std::process::exit(code);
            }
        },
    };
    logging::init(
        logging::level(cli.verbose, cli.quiet),
        cli.log_file.as_deref(),
    );

    if let Err(e) = run(cli) {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}

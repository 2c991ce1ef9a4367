//! costline - cost and context status line
//!
//! Reads the host's status JSON on stdin and prints exactly one line:
//! model, context bar, project, branch, cost rollup and clock.
//!
//! ## Usage
//!
//! ```bash
//! # Typical statusline hook
//! echo '{"session_id":"s1","cost":{"total_cost_usd":1.5}}' | costline
//!
//! # Pin the zone used for day/week/month/year boundaries
//! costline --timezone Europe/Berlin < status.json
//!
//! # Mirror debug logs to stderr
//! costline -v < status.json
//! ```

mod git;
mod input;
mod render;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use costline_core::{Config, CostlineError, LogGuard, init_logging};
use costline_cost::{ContextTracker, Ledger, UsageLogReader, rollup};
use tracing::{debug, error, warn};

use crate::input::StatusInput;
use crate::render::StatusLine;

/// Single-line cost and context status display
///
/// Reads the status JSON document from stdin.
#[derive(Parser, Debug)]
#[command(name = "costline")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging (mirrors logs to stderr)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory for log files (defaults to ~/.costline/logs/)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Configuration file (defaults to ~/.costline/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// IANA time zone for date boundaries
    #[arg(long)]
    timezone: Option<String>,

    /// Directory for the ledger and context state
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Disable colored output (also respects NO_COLOR)
    #[arg(long)]
    no_color: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // logging problems never block the status line
    let _guard = match setup_logging(&cli) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    match run(&cli) {
        Ok(line) => {
            println!("{line}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("costline failed: {e:#}");
            eprintln!("costline: {e:#}");
            if let Some(hint) = guidance(&e) {
                eprintln!("  hint: {hint}");
            }
            ExitCode::from(1)
        }
    }
}

/// Guidance from the first costline error in the chain.
fn guidance(err: &anyhow::Error) -> Option<&'static str> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<CostlineError>())
        .and_then(CostlineError::guidance)
}

/// Set up logging based on CLI arguments.
fn setup_logging(cli: &Cli) -> costline_core::Result<LogGuard> {
    init_logging(cli.log_dir.clone(), cli.verbose > 0)
}

/// Build the status line; every error returned here is fatal.
fn run(cli: &Cli) -> anyhow::Result<String> {
    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = &cli.state_dir {
        config.state_dir = Some(dir.clone());
    }
    let zone = config
        .zone(cli.timezone.as_deref())
        .context("resolving time zone")?;

    let mut stdin = String::new();
    std::io::stdin()
        .read_to_string(&mut stdin)
        .context("reading stdin")?;
    let status = StatusInput::parse(&stdin).context("parsing status JSON from stdin")?;

    let now = Utc::now();
    let today = zone.date_of(now);
    let session_id = status.session_id();
    let session_cost = status.cost.total_cost_usd;
    debug!(%zone, %today, session_id, "building status line");

    let reader = UsageLogReader::new(config.usage_dirs(), zone).with_prefilter(config.prefilter);
    let today_cost = reader.cost_for_date(today);

    let totals = {
        let ledger_path = config.ledger_path().context("locating ledger")?;
        let mut ledger = Ledger::open(ledger_path);
        ledger.record_session(today, session_id, session_cost);
        let totals = rollup(today, today_cost, &mut ledger, &reader, config.year_backfill);
        if let Err(e) = ledger.save() {
            warn!(path = %ledger.path().display(), error = %e, "failed to save ledger");
        }
        totals
    };

    let window = &status.context_window;
    let context_path = config.context_path().context("locating context state")?;
    let mut tracker = ContextTracker::load(context_path, today, config.context_retention_days);
    let context = tracker.update(
        session_id,
        window.total_input_tokens,
        window.total_output_tokens,
        window.context_window_size,
        today,
    );
    if let Err(e) = tracker.save() {
        warn!(path = %tracker.path().display(), error = %e, "failed to save context state");
    }

    let workspace = status.workspace_dir().map(Path::new);
    let project = workspace.and_then(|dir| dir.file_name()).and_then(|n| n.to_str());
    let branch = workspace.and_then(git::current_branch);
    let clock = zone.clock(now);

    let color = !cli.no_color && std::env::var_os("NO_COLOR").is_none();
    let line = StatusLine {
        model: status.model_name(),
        context,
        project,
        branch: branch.as_deref(),
        session_cost,
        totals,
        clock: &clock,
    }
    .render(color);

    Ok(line)
}

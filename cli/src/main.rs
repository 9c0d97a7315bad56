//! CLI entrypoint for plenum
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod repl;

use anyhow::Result;
use clap::Parser;
use plenum_application::ports::audit::{AuditSink, NoAuditSink};
use plenum_application::{ChamberState, PulsationProcessor, RollCallService, SessionService};
use plenum_infrastructure::{ConfigLoader, KeypadListener, LeveledFileAudit, TomlRosterSource};
use repl::ConsoleRepl;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "plenum", about = "Legislative session and roll-call console", version)]
struct Cli {
    /// Explicit config file (overrides plenum.toml and the global config)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Do not start the TCP keypad listener even if configured
    #[arg(long)]
    no_listener: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = ConfigLoader::load(cli.config.as_ref())
        .map_err(|e| anyhow::anyhow!("configuration error: {}", e))?;
    info!(
        roster = %config.roster_file.display(),
        log_dir = %config.log_dir.display(),
        quorum = config.quorum,
        "starting plenum"
    );

    // === Dependency Injection ===
    let audit: Arc<dyn AuditSink> =
        match LeveledFileAudit::new(&config.log_dir, config.tail_capacity) {
            Some(sink) => Arc::new(sink),
            None => {
                warn!("audit files unavailable, continuing without a trail");
                Arc::new(NoAuditSink)
            }
        };
    let roster = Arc::new(TomlRosterSource::new(&config.roster_file));
    let state = ChamberState::shared();

    let sessions = SessionService::new(state.clone(), roster, audit.clone(), config.quorum);
    let roll_calls = RollCallService::new(state.clone(), audit.clone());
    let processor = Arc::new(PulsationProcessor::new(state, audit.clone()));

    if let Some(addr) = config.listen_addr.filter(|_| !cli.no_listener) {
        let listener = KeypadListener::new(processor.clone());
        tokio::spawn(async move {
            if let Err(e) = listener.serve(&addr).await {
                warn!("keypad listener stopped: {}", e);
            }
        });
    }

    ConsoleRepl::new(sessions, roll_calls, processor, audit).run()?;
    Ok(())
}

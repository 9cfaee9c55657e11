//! filesweep CLI
//!
//! Runs the configured cleanup rules once over the configured folders.

use anyhow::{Context, Result};
use clap::Parser;
use filesweep::rules::{Outcome, destination_for, planned_destinations};
use filesweep::{Action, Config, MatchedFile, Summary, Sweeper};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "filesweep")]
#[command(author, version, about = "Rule-based disk cleanup and archival")]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Scan folders and apply rule actions (default)
    Run {
        /// Only list what would be done
        #[arg(long)]
        dry_run: bool,

        /// Do not ask for confirmation even if the config says so
        #[arg(short, long)]
        yes: bool,
    },

    /// Validate config file
    Check,

    /// List folders and rules
    List,

    /// Write an example config file
    Init {
        /// Where to write it
        #[arg(default_value = "filesweep.toml")]
        path: PathBuf,
    },
}

fn init_logging(verbose: bool, configured: &str) {
    let log_level = if verbose { "debug" } else { configured };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("FILESWEEP_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Describe what executing a pending match would do, given where it is planned to land
fn preview(matched: &MatchedFile<'_>, planned: Option<&Path>) -> String {
    let kind = matched.rule.action.kind();
    let path = matched.path.display();
    match (&matched.rule.action, planned) {
        (Action::Copy(_) | Action::Move(_), Some(dest)) => {
            format!("{} {} -> {}", kind, path, dest.display())
        }
        (Action::Copy(transfer) | Action::Move(transfer), None) => {
            match destination_for(matched, transfer) {
                Ok(dest) => format!("{} {} -> {}", kind, path, dest.display()),
                Err(e) => format!("{} {} ({})", kind, path, e),
            }
        }
        _ => format!("{} {}", kind, path),
    }
}

fn confirm(pending: usize) -> Result<bool> {
    print!("Proceed with {} actions? [y/N] ", pending);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read answer")?;
    let answer = answer.trim();
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}

fn run(config: &Config, dry_run: bool, yes: bool) -> Result<()> {
    let sweeper = Sweeper::new(config)?;
    let report = sweeper.scan();

    if report.matches.is_empty() {
        println!("Nothing to do");
        return Ok(());
    }

    println!("Pending:");
    let planned = planned_destinations(&report.matches);
    for (matched, dest) in report.matches.iter().zip(&planned) {
        println!("  {}", preview(matched, dest.as_deref()));
    }

    if dry_run {
        println!("[dry-run] {} actions not applied", report.matches.len());
        return Ok(());
    }

    if config.general.prompt_before_action && !yes && !confirm(report.matches.len())? {
        println!("Aborted, nothing changed");
        return Ok(());
    }

    let outcomes = filesweep::execute(&report.matches);

    println!("Results:");
    for outcome in &outcomes {
        let mark = match outcome.outcome {
            Outcome::Succeeded { .. } => "✓",
            Outcome::Failed { .. } => "✗",
            Outcome::Partial { .. } => "!",
            Outcome::Skipped => "-",
        };
        println!("  {} {}", mark, outcome);
    }

    let summary = Summary::of(&outcomes);
    println!(
        "{} succeeded, {} failed, {} partial",
        summary.succeeded, summary.failed, summary.partial
    );
    if summary.partial > 0 {
        println!("Partial moves left a copy at both locations; remove the sources by hand");
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Commands::Run {
        dry_run: false,
        yes: false,
    });

    match command {
        Commands::Init { path } => {
            init_logging(cli.verbose, "info");
            Config::write_example(&path)?;
            println!("File {} has been generated", path.display());
        }
        Commands::Check => match Config::load(cli.config.as_deref())
            .and_then(|config| Sweeper::new(&config).map(|sweeper| (config, sweeper)))
        {
            Ok((config, sweeper)) => {
                println!("✓ Config is valid");
                println!("  {} folders", sweeper.folders().len());
                println!(
                    "  {} rules ({} enabled)",
                    config.rules.len(),
                    sweeper.rules().len()
                );
            }
            Err(e) => {
                eprintln!("✗ Config error: {:#}", anyhow::Error::from(e));
                std::process::exit(1);
            }
        },
        Commands::List => {
            let config = Config::load(cli.config.as_deref())?;
            println!("Folders:");
            for (i, folder) in config.folders.iter().enumerate() {
                println!("  [{}] {}", i + 1, folder.path.display());
            }
            println!("Rules:");
            for (i, rule) in config.rules.iter().enumerate() {
                let status = if rule.enabled { "✓" } else { "✗" };
                println!(
                    "  {} [{}] {} /{}/ -> {}",
                    status,
                    i + 1,
                    rule.label(),
                    rule.pattern,
                    rule.action
                );
            }
        }
        Commands::Run { dry_run, yes } => {
            let config = Config::load(cli.config.as_deref())?;
            init_logging(cli.verbose, &config.general.log_level);
            run(&config, dry_run, yes)?;
        }
    }

    Ok(())
}

use std::fs;
use std::io::{BufRead, BufReader};

use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use serde_json::Value;
use tracing::{debug, info};

use stateholder::cli::{Cli, Command};
use stateholder::config::Config;
use stateholder::script::{self, Outcome};
use stateholder::state::{StateController, WriteMode, set_event_logging};
use stateholder::stress;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Priority: CLI --log-level > config file > default (INFO)
    let level_str = cli_log_level.or(config_log_level);
    let level = match level_str.map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;

    debug!(?level, "setup_logging: initialized");
    Ok(())
}

fn read_script(cli_path: Option<&std::path::PathBuf>) -> Result<Vec<String>> {
    match cli_path {
        Some(path) => {
            let content =
                fs::read_to_string(path).context(format!("Failed to read script {}", path.display()))?;
            Ok(content.lines().map(str::to_string).collect())
        }
        None => BufReader::new(std::io::stdin())
            .lines()
            .collect::<std::io::Result<Vec<_>>>()
            .context("Failed to read script from stdin"),
    }
}

async fn run_script(controller: &StateController<Value>, lines: Vec<String>, strict: bool) -> Result<()> {
    let mut failures = 0usize;

    for (idx, line) in lines.iter().enumerate() {
        let lineno = idx + 1;
        let cmd = match script::parse_line(line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{} line {}: {}", "✗".red(), lineno, e);
                failures += 1;
                if strict {
                    return Err(eyre!("line {}: {}", lineno, e));
                }
                continue;
            }
        };

        match script::execute(controller, cmd).await {
            Ok(outcome @ Outcome::Value(None)) => println!("{}", outcome.to_string().dimmed()),
            Ok(outcome) => println!("{}", outcome.to_string().green()),
            Err(e) => {
                eprintln!("{} line {}: {}", "✗".red(), lineno, e);
                failures += 1;
                if strict {
                    return Err(eyre!("line {}: {}", lineno, e));
                }
            }
        }
    }

    info!(lines = lines.len(), failures, "Script finished");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    if cli.fire_and_forget {
        config.state.write_mode = WriteMode::FireAndForget;
    }
    if cli.poll_ms.is_some() {
        config.state.poll_interval_ms = cli.poll_ms;
    }
    set_event_logging(cli.log_events || config.log_events);

    info!(state = ?config.state, "stateholder starting");
    let controller = StateController::<Value>::new(config.state.clone());

    let result = match cli.command {
        Command::Run {
            script: script_path,
            strict,
        } => {
            let lines = read_script(script_path.as_ref())?;
            run_script(&controller, lines, strict).await
        }
        Command::Stress { tasks, ops, json } => {
            controller.start().await?;
            let report = stress::run_stress(&controller, tasks, ops).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let status = if report.is_clean() { "✓".green() } else { "✗".red() };
                println!(
                    "{} {} tasks x {} ops: {} requests in {:?}",
                    status, report.tasks, report.ops_per_task, report.total_ops, report.elapsed
                );
                println!("  Read-your-writes violations: {}", report.read_your_writes_violations);
                println!("  Lost updates: {}", report.lost_updates);
                println!("  Shared key consistent: {}", report.shared_key_consistent);
            }
            if report.is_clean() {
                Ok(())
            } else {
                Err(eyre!("Stress run observed inconsistent state"))
            }
        }
    };

    if controller.is_running().await {
        controller.stop().await?;
    }
    result
}

mod batch;
mod cli;
mod config;
mod discovery;
mod emit;
mod error;
mod extract;
mod loader;
mod naming;
mod output;
mod watcher;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{Level, error};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use batch::BatchReport;
use cli::Cli;
use config::{GeneratorConfig, ProjectConfig};
use error::GenerateError;
use output::{BatchSummary, print_summary};
use watcher::session::WatchSession;

/// Some files failed; the rest were written.
const EXIT_PARTIAL: u8 = 1;
/// Nothing could be attempted (bad pattern, bad configuration).
const EXIT_FATAL: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let root = std::env::current_dir().context("cannot determine working directory")?;
    let project = ProjectConfig::load(&root);
    let config = GeneratorConfig::resolve(&cli, project, root)?;

    init_logging(config.debug);

    if config.watch {
        let session = WatchSession::new(config)?;
        let outcome = session.run().await;
        if let Err(err) = &outcome {
            error!("{err}");
        }
        return Ok(ExitCode::from(watch_exit_status(&outcome)));
    }

    let outcome = batch::generate(&config).await;
    match &outcome {
        Ok(report) => print_summary(&BatchSummary::from(report), cli.json),
        Err(err) => error!("{err}"),
    }
    Ok(ExitCode::from(batch_exit_status(&outcome)))
}

fn batch_exit_status(outcome: &Result<BatchReport, GenerateError>) -> u8 {
    match outcome {
        Ok(report) if report.has_failures() => EXIT_PARTIAL,
        Ok(_) => 0,
        Err(err) if err.is_fatal() => EXIT_FATAL,
        Err(_) => EXIT_PARTIAL,
    }
}

/// Per-file failures never leave a running session, so any error that does
/// means nothing is being watched.
fn watch_exit_status(outcome: &Result<(), GenerateError>) -> u8 {
    match outcome {
        Ok(()) => 0,
        Err(_) => EXIT_FATAL,
    }
}

/// Diagnostics go to stderr so stdout stays clean for `--json`.
/// `RUST_LOG` takes precedence over `--debug`.
fn init_logging(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_batch_exit_status() {
        assert_eq!(batch_exit_status(&Ok(BatchReport::default())), 0);

        let mut report = BatchReport::default();
        report.failed.push((PathBuf::from("a.module.scss"), "boom".to_string()));
        assert_eq!(batch_exit_status(&Ok(report)), EXIT_PARTIAL);

        let fatal = GenerateError::Discovery {
            pattern: "src/[".to_string(),
            message: "invalid range pattern".to_string(),
        };
        assert_eq!(batch_exit_status(&Err(fatal)), EXIT_FATAL);
    }

    #[test]
    fn test_watcher_start_failure_is_fatal() {
        let err = GenerateError::Watcher("cannot start poller".to_string());
        assert_eq!(watch_exit_status(&Err(err)), EXIT_FATAL);
        assert_eq!(watch_exit_status(&Ok(())), 0);
    }
}

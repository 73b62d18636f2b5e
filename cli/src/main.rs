//! Infoview CLI - binary entry point and stdio session driver.
//!
//! ```text
//! main() -> StdioHost::spawn(stdin, stdout) -> InfoviewSession::with_command_queue()
//!                |                                   ^
//!                v                                   |
//!        inbound notifications ---- handle_notification()
//! ```
//!
//! Everything runs on a current-thread runtime inside a `LocalSet`. The
//! session lives until the host closes stdin. stdout carries the protocol,
//! so logs never go there.

mod config;

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Mutex;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::LocalSet;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use infoview_sync::{EditorHost, GoalWorker, InfoviewSession, StdioHost, run_host_pump};

use crate::config::AppConfig;

fn init_tracing(filter: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.infoview/logs/infoview.log
    if let Some(config_path) = config::config_path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("infoview.log"));
    }

    // Fallback: ./.infoview/logs/infoview.log
    candidates.push(PathBuf::from(".infoview").join("logs").join("infoview.log"));

    candidates
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Tracing needs the configured filter, so config errors are reported
    // once logging is up.
    let loaded = AppConfig::load();
    let filter = match &loaded {
        Ok(Some(config)) => config.log.filter.clone(),
        _ => None,
    };
    init_tracing(filter.as_deref());

    let config = match loaded {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(path = %e.path().display(), error = %e, "Using default configuration");
            AppConfig::default()
        }
    };

    LocalSet::new().run_until(run(config)).await
}

async fn run(config: AppConfig) -> Result<()> {
    let (host, mut inbound) = StdioHost::spawn(tokio::io::stdin(), tokio::io::stdout());
    let editor: Rc<dyn EditorHost> = host.clone();
    let worker: Rc<dyn GoalWorker> = host.clone();

    let (commands, queued) = mpsc::unbounded_channel();
    let pump = tokio::task::spawn_local(run_host_pump(editor, queued));
    let session = InfoviewSession::with_command_queue(commands, worker, config.scheduler);
    if let Some(display) = config.display {
        session.set_options(display);
    }
    tracing::info!("Infoview session started");

    while let Some(notification) = inbound.recv().await {
        session.handle_notification(&notification.method, notification.params);
    }

    tracing::info!("Host disconnected; shutting down");
    session.dispose();
    // The last handle holds the command queue open. Once it is gone the pump
    // writes the queued unsubscribes and exits, then the writer may stop.
    drop(session);
    if let Err(e) = pump.await {
        tracing::warn!(error = %e, "Host command pump failed");
    }
    host.close();
    Ok(())
}

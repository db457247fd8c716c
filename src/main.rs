//! policyd
//!
//! Serves a fixed policy document to every TCP client, then disconnects.
//!
//! # Architecture Overview
//!
//! ```text
//!   -f policy file ──▶ policy::store ──┐
//!                                      ▼
//!   Client ──TCP──▶ net::listener ──▶ server loop ──▶ write document ──▶ close
//!                                      ▲
//!   SIGINT/SIGTERM ──▶ lifecycle::signals ──▶ shutdown flag
//! ```
//!
//! Startup order: config → logging → policy → listener → (fork) → runtime.

use std::net::SocketAddr;
use std::process::ExitCode;

use clap::Parser;

use policyd::cli::{self, Cli};
use policyd::config::{resolve_config, DaemonConfig};
use policyd::lifecycle::daemon::{self, Detached};
use policyd::lifecycle::{self, signals, Prepared, Shutdown, StartupError};
use policyd::net::Listener;
use policyd::observability::{logging, metrics};
use policyd::policy::PolicyDocument;
use policyd::server::PolicyServer;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("policyd: {e}");
            if e.is_usage() {
                eprintln!("{}", cli::usage());
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, StartupError> {
    let config = resolve_config(cli.config.as_deref(), cli.overrides())?;

    logging::init(&config.observability, config.daemon.detach)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "policyd starting");

    let Prepared { document, listener } = lifecycle::prepare(&config)?;

    if config.daemon.detach {
        if let Detached::Parent(child) = daemon::detach()? {
            println!("{child}");
            return Ok(ExitCode::SUCCESS);
        }
        tracing::info!(pid = std::process::id(), "Detached");
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(StartupError::Runtime)?;

    runtime.block_on(serve(config, document, listener))
}

async fn serve(
    config: DaemonConfig,
    document: PolicyDocument,
    listener: Listener,
) -> Result<ExitCode, StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = listener.into_async()?;

    let shutdown = Shutdown::new();
    signals::install(shutdown.clone()).map_err(StartupError::Signals)?;

    let server = PolicyServer::new(listener, document, shutdown.subscribe());
    match server.run().await {
        Ok(stats) => {
            tracing::info!(
                served = stats.served,
                abandoned = stats.abandoned,
                "Shutdown complete"
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!(error = %e, "Server stopped on error");
            Ok(ExitCode::FAILURE)
        }
    }
}

//! Command-line surface.

use std::path::PathBuf;

use clap::{CommandFactory, Parser};

use crate::config::schema::DEFAULT_PORT;
use crate::config::Overrides;

#[derive(Debug, Parser)]
#[command(name = "policyd", version)]
#[command(about = "Serve a fixed policy document to every TCP client", long_about = None)]
#[command(args_override_self = true)]
pub struct Cli {
    /// Policy document to serve.
    #[arg(short = 'f', long = "file", value_name = "POLICY")]
    pub policy: Option<PathBuf>,

    /// TCP port to listen on [default: 843].
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Append log lines to this file instead of standard output.
    #[arg(short, long, value_name = "PATH")]
    pub log: Option<PathBuf>,

    /// Detach into the background once listening.
    #[arg(short, long)]
    pub daemon: bool,

    /// Optional TOML configuration file; flags override it.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            policy_path: self.policy.clone(),
            port: self.port,
            log_file: self.log.clone(),
            detach: self.daemon,
        }
    }
}

/// Usage text printed after a usage error.
pub fn usage() -> String {
    format!(
        "{}\nDefault port is {}",
        Cli::command().render_usage(),
        DEFAULT_PORT
    )
}

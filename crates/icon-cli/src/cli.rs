use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "iconrepo",
    about = "Icon repository: versioned storage for icon files",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Overrides `data_dir` from the configuration.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Overrides `log_level`; `RUST_LOG` wins over both.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// List icons and their file paths
    List,
    /// Check that metadata and stored files agree
    Verify,
    /// Show blob store commit history
    Log(LogArgs),
    /// Show the effective format/size allow-list
    Config,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Overrides `bind_addr` from the configuration.
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
    #[arg(long)]
    pub oneline: bool,
}

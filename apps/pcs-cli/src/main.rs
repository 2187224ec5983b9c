//! pcs: command-line client for the PCS file API.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pcs_upload::Strategy;
use tracing_subscriber::EnvFilter;

use config::CliConfig;

#[derive(Parser, Debug)]
#[command(name = "pcs", version, about = "PCS cloud storage client")]
struct Cli {
    /// Path to config.toml (default: ~/.config/pcs/config.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show used and available space
    Quota,

    /// Upload a local file
    Upload {
        local: PathBuf,
        /// Absolute remote path
        remote: String,
        /// auto, direct, rapid or block
        #[arg(long, short = 's', default_value = "auto")]
        strategy: Strategy,
        /// Keep the existing remote file and store a renamed copy
        #[arg(long)]
        newcopy: bool,
    },

    /// Download a remote file
    Download {
        remote: String,
        local: PathBuf,
        /// Inclusive byte range, e.g. `0-1023` or `1024-`
        #[arg(long)]
        range: Option<String>,
    },

    /// Print the content fingerprint used for rapid upload
    Fingerprint { local: PathBuf },

    /// Show file or directory metadata
    Meta {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// List a directory
    Ls {
        path: String,
        /// Entry range `start-end`
        #[arg(long)]
        limit: Option<String>,
    },

    /// Create a directory
    Mkdir { path: String },

    /// Move or rename
    Mv { from: String, to: String },

    /// Copy
    Cp { from: String, to: String },

    /// Delete files or directories (to the recycle bin)
    Rm {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Search file names under a directory
    Search {
        dir: String,
        word: String,
        #[arg(long, short = 'r')]
        recursive: bool,
    },

    /// Incremental changes since a cursor
    Diff {
        #[arg(long)]
        cursor: Option<String>,
    },

    /// Save an image thumbnail
    Thumbnail {
        remote: String,
        local: PathBuf,
        #[arg(long, default_value_t = 160)]
        width: u32,
        #[arg(long, default_value_t = 120)]
        height: u32,
        #[arg(long)]
        quality: Option<u8>,
    },

    /// Recycle bin
    Recycle {
        #[command(subcommand)]
        action: RecycleAction,
    },

    /// Offline downloads
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Print the active configuration (token redacted)
    Config,
}

#[derive(Subcommand, Debug)]
enum RecycleAction {
    List {
        #[arg(long)]
        start: Option<u64>,
        #[arg(long)]
        limit: Option<u64>,
    },
    Restore {
        #[arg(required = true)]
        fs_ids: Vec<u64>,
    },
    Empty,
}

#[derive(Subcommand, Debug)]
enum TaskAction {
    Add { source_url: String, save_path: String },
    Query {
        #[arg(required = true)]
        task_ids: Vec<u64>,
    },
    List,
    Cancel { task_id: u64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref())?;
    config.validate()?;

    commands::run(cli.command, &config).await
}

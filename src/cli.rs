use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Rollout - fail-fast provisioning pipeline for web application deployments
#[derive(Parser, Debug)]
#[command(name = "rollout")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Run 'rollout' without arguments to provision with defaults.")]
pub struct Cli {
    /// Output machine-readable JSON events
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the provisioning pipeline (install, collect, migrate, admin)
    Run {
        /// Path to a rollout.toml config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Project directory (default: current directory)
        #[arg(short, long)]
        project_dir: Option<PathBuf>,

        /// Dependency manifest file (overrides config)
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Admin username (overrides config and environment)
        #[arg(long)]
        admin_username: Option<String>,

        /// Admin email (overrides config and environment)
        #[arg(long)]
        admin_email: Option<String>,

        /// Admin password (overrides config and environment)
        #[arg(long)]
        admin_password: Option<String>,

        /// Never prompt; fail if credentials are incomplete
        #[arg(short, long)]
        yes: bool,
    },

    /// Report provisioning state without mutating anything
    Status {
        /// Path to a rollout.toml config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Project directory (default: current directory)
        #[arg(short, long)]
        project_dir: Option<PathBuf>,
    },

    /// Write a rollout.toml template and an empty manifest
    Init {
        /// Project directory (default: current directory)
        #[arg(short, long)]
        project_dir: Option<PathBuf>,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,
    },
}

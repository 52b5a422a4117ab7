//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};
use uuid::Uuid;

/// Build stable-identity skill trees from YAML definitions and render them as chart JSON
#[derive(Parser, Debug)]
#[command(name = "skilltree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Skills root directory (overrides config)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub skills_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rebuild all skill areas, publish them and persist identities
    Update {
        /// Source revision being processed, recorded on success
        #[arg(short, long)]
        revision: Option<String>,
        /// Print JSON to stdout and persist nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Build one skill area and print its chart JSON
    Build {
        /// Skill area directory
        #[arg(value_hint = ValueHint::DirPath)]
        dir: PathBuf,
        /// Pretty-print the JSON
        #[arg(short, long)]
        pretty: bool,
    },

    /// Show one skill area as a tree
    Tree {
        /// Skill area directory
        #[arg(value_hint = ValueHint::DirPath)]
        dir: PathBuf,
    },

    /// List persisted code to id mappings
    Mappings,

    /// Show the last processed revision
    Revision,

    /// Manage user progress
    Progress {
        #[command(subcommand)]
        command: ProgressCommands,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProgressCommands {
    /// List a user's obtained skills
    Show {
        /// User identifier
        user: String,
    },

    /// Set a user's level for a skill
    Set {
        /// User identifier
        user: String,
        /// Skill identifier
        skill: Uuid,
        /// Level reached
        level: u32,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config instead of the skills directory's local one
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}

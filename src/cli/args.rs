//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

use crate::domain::DocumentShape;

/// Integration route toolkit: format, validate and map YAML route definitions
#[derive(Parser, Debug)]
#[command(name = "routekit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Project directory (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rewrite flow files in canonical form
    Fmt {
        /// Flow files
        #[arg(required = true, value_hint = ValueHint::FilePath)]
        files: Vec<PathBuf>,
        /// Only report files that are not canonical
        #[arg(long, conflicts_with = "write")]
        check: bool,
        /// Write canonical text back instead of printing it
        #[arg(short, long)]
        write: bool,
    },

    /// Report missing required fields and plain-text secrets
    Check {
        /// Flow files
        #[arg(required = true, value_hint = ValueHint::FilePath)]
        files: Vec<PathBuf>,
    },

    /// List `{{...}}` placeholders referenced by a flow file
    Placeholders {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Show the node tree of a flow file
    Tree {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Show the route graph across files (default: project dir)
    Topology {
        /// Flow files or directories
        #[arg(value_hint = ValueHint::AnyPath)]
        paths: Vec<PathBuf>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create an empty flow file
    New {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Document shape (default: codec.default_shape)
        #[arg(short, long)]
        shape: Option<DocumentShape>,
        /// Resource name (default: file stem)
        #[arg(short, long)]
        name: Option<String>,
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
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Print a commented config template
    Template,
    /// Show config file locations
    Path,
}

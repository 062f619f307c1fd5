//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

/// Hierarchical configuration tree: dotted-path resolution, import/export and command generation
#[derive(Parser, Debug)]
#[command(name = "cfgtree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output on stderr (repeat for more: -d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Directory holding a local .cfgtree.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add an item at root or under a parent
    Add {
        /// Label of the new item (must not contain '.')
        label: String,
        /// Dotted path of the parent item (default: root)
        #[arg(short, long)]
        parent: Option<String>,
        /// Value for the new item (makes it a leaf)
        #[arg(short, long)]
        value: Option<String>,
    },

    /// Set the value of a leaf or empty item
    Set {
        /// Dotted path of the item
        path: String,
        /// New value
        value: String,
        /// Parse the value as JSON (numbers, booleans; arrays/objects are rejected)
        #[arg(long)]
        json: bool,
    },

    /// Print the value at a dotted path
    Get {
        /// Dotted path (case-insensitive)
        path: String,
    },

    /// Remove an item and everything below it
    #[command(alias = "remove")]
    Rm {
        /// Dotted path of the item
        path: String,
    },

    /// Change the label of an item
    Rename {
        /// Dotted path of the item
        path: String,
        /// New label
        label: String,
    },

    /// Remove all items
    Clear,

    /// Show the tree
    Tree,

    /// Print a command descriptor for every leaf as JSON
    Commands,

    /// Write the tree to an export file
    Export {
        /// Target file (default: export_file setting)
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
    },

    /// Replace the tree with the contents of an export file
    Import {
        /// Source file (default: export_file setting)
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
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
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}

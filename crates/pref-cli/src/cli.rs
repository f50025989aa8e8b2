//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// prefs - Inspect and edit preference stores through a key schema
#[derive(Parser, Debug)]
#[command(name = "prefs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Key schema declaring every editable preference
    #[arg(long, global = true, env = "PREFS_SCHEMA", default_value = "prefs.schema.toml")]
    pub schema: PathBuf,

    /// Directory holding the workspace store files (<store>.toml)
    #[arg(long, global = true, env = "PREFS_DIR")]
    pub dir: Option<PathBuf>,

    /// Project directory whose store files override the workspace
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Show every declared preference with its effective value
    Show {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Print the effective value of one preference
    Get {
        /// Preference name, e.g. editor.tab_width
        key: String,
    },

    /// Edit preferences and commit them in one session
    ///
    /// The commit is refused if any edit leaves the page in error.
    ///
    /// Examples:
    ///   prefs set editor.tab_width=8
    ///   prefs set editor.folding=false formatter.style=GNU
    Set {
        /// Assignments of the form KEY=VALUE
        #[arg(required = true, value_name = "KEY=VALUE")]
        assignments: Vec<String>,
    },

    /// Restore defaults for the given preferences, or for all of them
    Reset {
        /// Preference names; all when omitted
        keys: Vec<String>,
    },

    /// Validate the stored values against the schema
    Check,
}

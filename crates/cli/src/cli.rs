//! Command-line interface for boson.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// boson - a build-system configuration engine
#[derive(Parser)]
#[command(name = "boson")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configure a build directory from a source tree
    Setup {
        /// Path to the source tree (contains boson.build)
        source_dir: PathBuf,

        /// Path to the build directory to configure
        build_dir: PathBuf,
    },

    /// Run the tests registered by a configured build directory
    Test {
        /// Path to the configured build directory
        build_dir: PathBuf,
    },

    /// Replace a version placeholder with the current VCS tag (used by
    /// generated custom targets, not usually by hand)
    #[command(hide = true)]
    VcsTag {
        input: PathBuf,
        output: PathBuf,
        fallback: String,
        replace_string: String,
    },
}

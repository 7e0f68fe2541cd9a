//! boson entry point.

mod cli;
mod pipeline;

use clap::Parser;
use std::process::ExitCode;

use cli::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Setup {
            source_dir,
            build_dir,
        } => pipeline::setup(source_dir, build_dir),
        Commands::Test { build_dir } => pipeline::run_tests(build_dir),
        Commands::VcsTag {
            input,
            output,
            fallback,
            replace_string,
        } => pipeline::vcs_tag(input, output, fallback, replace_string),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(pipeline::PipelineError::Reported) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("{}", error);
            ExitCode::FAILURE
        }
    }
}

//! The configure and test pipelines behind the CLI commands.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use colored::Colorize;
use rayon::prelude::*;

use boson_backend::{deserialize_tests, mir_to_fir, serialize_tests, Test};
use boson_mir::object::MessageLevel;
use boson_mir::process;
use boson_mir::{collect_errors, flat_instructions, lower, lower_ast, Persistant};

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug)]
pub enum PipelineError {
    Io(std::io::Error),
    /// Already reported to the user; carries only the exit status.
    Reported,
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Io(e) => write!(f, "I/O error: {}", e),
            PipelineError::Reported => Ok(()),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<std::io::Error> for PipelineError {
    fn from(error: std::io::Error) -> Self {
        PipelineError::Io(error)
    }
}

const TESTS_FILE: &str = "boson_tests";
const STATE_FILE: &str = "boson-coredata.json";

/// Configure `build_dir` from the build description in `source_dir`.
pub fn setup(source_dir: &Path, build_dir: &Path) -> PipelineResult<()> {
    let source_root = source_dir.canonicalize()?;
    fs::create_dir_all(build_dir)?;
    let build_root = build_dir.canonicalize()?;

    let build_file = source_root.join("boson.build");
    let source = fs::read_to_string(&build_file)?;

    let ast = match boson_parser::parse(&source) {
        Ok(ast) => ast,
        Err(error) => {
            eprintln!(
                "{}",
                error
                    .format_with_source(&build_file.to_string_lossy(), &source)
                    .red()
            );
            return Err(PipelineError::Reported);
        }
    };

    // Reuse the caches of a previous configuration when they exist
    let mut pstate = match fs::File::open(build_root.join(STATE_FILE)) {
        Ok(file) => {
            let mut loaded =
                Persistant::load(file).unwrap_or_else(|_| Persistant::new(source_root.clone(), build_root.clone()));
            loaded.source_root = source_root.clone();
            loaded.build_root = build_root.clone();
            loaded
        }
        Err(_) => Persistant::new(source_root.clone(), build_root.clone()),
    };

    let mut cfg = match lower_ast(&ast, Path::new("")) {
        Ok(cfg) => cfg,
        Err(error) => {
            eprintln!("{}", error.to_string().red());
            return Err(PipelineError::Reported);
        }
    };

    if let Err(error) = lower(&mut cfg, &mut pstate) {
        eprintln!("{}", error.to_string().red());
        return Err(PipelineError::Reported);
    }

    let instructions = flat_instructions(&cfg);

    // Print the stream's messages; errors keep the backend from running
    for inst in &instructions {
        if let boson_mir::Object::Message(m) = &inst.obj {
            match m.level {
                MessageLevel::Error => eprintln!("{} {}", "ERROR:".red(), m.message),
                MessageLevel::Warn => eprintln!("{} {}", "WARNING:".yellow(), m.message),
                MessageLevel::Message => println!("{}", m.message),
                MessageLevel::Debug => {}
            }
        }
    }
    if !collect_errors(&instructions).is_empty() {
        return Err(PipelineError::Reported);
    }

    let (targets, tests) = match mir_to_fir(&instructions, &pstate) {
        Ok(out) => out,
        Err(error) => {
            eprintln!("{}", error.to_string().red());
            return Err(PipelineError::Reported);
        }
    };

    fs::write(build_root.join(TESTS_FILE), serialize_tests(&tests))?;
    pstate.serialize(fs::File::create(build_root.join(STATE_FILE))?)?;

    println!(
        "Configured {} target rules, {} tests",
        targets.len().to_string().bold(),
        tests.len().to_string().bold()
    );
    Ok(())
}

struct TestResults {
    success: usize,
    failures: usize,
    skipped: usize,
    xfail: usize,
    xpass: usize,
}

/// Run the tests a configured build directory registered.
pub fn run_tests(build_dir: &Path) -> PipelineResult<()> {
    let build_root = build_dir.canonicalize()?;
    let raw = fs::read_to_string(build_root.join(TESTS_FILE))?;
    let tests = match deserialize_tests(&raw) {
        Ok(tests) => tests,
        Err(error) => {
            eprintln!("{}", error.to_string().red());
            return Err(PipelineError::Reported);
        }
    };

    let count = tests.len();
    let results = Mutex::new(TestResults {
        success: 0,
        failures: 0,
        skipped: 0,
        xfail: 0,
        xpass: 0,
    });
    let finished = Mutex::new(0usize);

    tests.par_iter().for_each(|test: &Test| {
        let exe = build_root.join(&test.exe);
        let args: Vec<&str> = test.arguments.iter().map(String::as_str).collect();
        let output = process::run(&exe, &args, Duration::from_secs(300));

        let status = output.map(|o| o.status).unwrap_or(127);
        let mut results = results.lock().expect("results lock");
        let verdict = match status {
            0 if test.should_fail => {
                results.xpass += 1;
                "XPASS".red()
            }
            0 => {
                results.success += 1;
                "OK".green()
            }
            127 => {
                results.skipped += 1;
                "SKIP".yellow()
            }
            _ if test.should_fail => {
                results.xfail += 1;
                "XFAIL".green()
            }
            _ => {
                results.failures += 1;
                "FAIL".red()
            }
        };

        let mut finished = finished.lock().expect("progress lock");
        *finished += 1;
        println!(" {}/{} {}    {}", *finished, count, test.name, verdict);
    });

    let results = results.into_inner().expect("results lock");
    println!();
    println!("Ok:              {}", results.success);
    println!("Fail:            {}", results.failures);
    println!("Skipped:         {}", results.skipped);
    println!("Expected Fail:   {}", results.xfail);
    println!("Unexpected Pass: {}", results.xpass);

    if results.failures > 0 || results.xpass > 0 {
        return Err(PipelineError::Reported);
    }
    Ok(())
}

/// Replace a placeholder in `input` with the current VCS tag, falling back
/// to a fixed string outside a repository. The output is only rewritten on
/// change so downstream rules don't rebuild needlessly.
pub fn vcs_tag(
    input: &Path,
    output: &Path,
    fallback: &str,
    replace_string: &str,
) -> PipelineResult<()> {
    let describe = process::run(
        &PathBuf::from("git"),
        &["describe", "--tags", "--dirty"],
        Duration::from_secs(10),
    );
    let tag = match describe {
        Some(out) if out.success() => out.stdout.trim().to_owned(),
        _ => fallback.to_owned(),
    };

    let content = fs::read_to_string(input)?.replace(replace_string, &tag);
    if fs::read_to_string(output).map(|old| old == content).unwrap_or(false) {
        return Ok(());
    }
    fs::write(output, content)?;
    Ok(())
}

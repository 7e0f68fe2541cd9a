//! Toolchain auto-detection.
//!
//! Candidate binaries are probed with `--version` and classified by their
//! output. The `CXX`, `AR`, and `LD` environment variables override the
//! default candidate lists.

use std::env;
use std::path::PathBuf;

use crate::error::LowerError;
use crate::machines::Machine;
use crate::process::{self, PROBE_TIMEOUT};

use super::archiver::{Archiver, GnuAr};
use super::compiler::{Compiler, GnuLikeCpp};
use super::linker::{GnuBfd, Linker, Lld};
use super::Language;

const DEFAULT_CPP: &[&str] = &["c++", "g++", "clang++"];
const DEFAULT_AR: &[&str] = &["ar", "gcc-ar", "llvm-ar"];

fn candidates(var: &str, defaults: &[&str]) -> Vec<PathBuf> {
    match env::var(var) {
        Ok(bin) if !bin.is_empty() => vec![PathBuf::from(bin)],
        _ => defaults.iter().map(PathBuf::from).collect(),
    }
}

/// The first line of `--version` output, used for reporting.
fn version_line(stdout: &str) -> String {
    stdout.lines().next().unwrap_or("").to_owned()
}

fn detect_cpp_compiler(_machine: Machine) -> Option<Box<dyn Compiler>> {
    // TODO: cross compilation needs a machine file before the machine
    // argument can mean anything here
    for bin in candidates("CXX", DEFAULT_CPP) {
        let Some(out) = process::run(&bin, &["--version"], PROBE_TIMEOUT) else {
            continue;
        };
        if !out.success() {
            continue;
        }

        if out.stdout.contains("Free Software Foundation") {
            return Some(Box::new(GnuLikeCpp::gnu(bin, version_line(&out.stdout))));
        }
        if out.stdout.contains("clang version") {
            return Some(Box::new(GnuLikeCpp::clang(bin, version_line(&out.stdout))));
        }
    }
    None
}

pub fn detect_compiler(
    language: Language,
    machine: Machine,
) -> Result<Box<dyn Compiler>, LowerError> {
    let found = match language {
        Language::Cpp => detect_cpp_compiler(machine),
    };
    found.ok_or_else(|| LowerError::UnknownCompiler {
        language: language.display().to_owned(),
        machine,
    })
}

pub fn detect_linker(
    _language: Language,
    _machine: Machine,
    compiler: &dyn Compiler,
) -> Result<Box<dyn Linker>, LowerError> {
    // Gnu-like compilers drive the link step themselves; ask which linker
    // they would use.
    let driver = compiler.binary().to_path_buf();
    if let Some(out) = process::run(&driver, &["-Wl,--version"], PROBE_TIMEOUT) {
        if out.stdout.contains("LLD") || out.stderr.contains("LLD") {
            return Ok(Box::new(Lld::new(driver)));
        }
    }
    Ok(Box::new(GnuBfd::new(driver)))
}

pub fn detect_archiver(_machine: Machine) -> Result<Box<dyn Archiver>, LowerError> {
    for bin in candidates("AR", DEFAULT_AR) {
        let Some(out) = process::run(&bin, &["--version"], PROBE_TIMEOUT) else {
            continue;
        };
        if out.success() {
            return Ok(Box::new(GnuAr::new(bin)));
        }
    }
    Err(LowerError::UnknownArchiver)
}

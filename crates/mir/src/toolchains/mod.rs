//! Toolchains: the (compiler, linker, archiver) triple for one language on
//! one machine, plus the probing that finds them.

pub mod archiver;
pub mod compiler;
pub mod detect;
pub mod linker;

pub use archiver::Archiver;
pub use compiler::{CanCompileType, Compiler};
pub use linker::Linker;

use crate::error::LowerError;
use crate::machines::Machine;

/// A language the engine can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Cpp,
}

impl Language {
    pub fn from_string(raw: &str) -> Result<Self, LowerError> {
        match raw {
            "cpp" | "c++" => Ok(Language::Cpp),
            other => Err(LowerError::UnknownLanguage(other.to_owned())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Cpp => "cpp",
        }
    }

    /// Name shown to users, matching what compilers call themselves.
    pub fn display(&self) -> &'static str {
        match self {
            Language::Cpp => "C++",
        }
    }
}

/// Holds the toolchain for one language, for one machine.
#[derive(Debug)]
pub struct Toolchain {
    pub compiler: Box<dyn Compiler>,
    pub linker: Box<dyn Linker>,
    pub archiver: Box<dyn Archiver>,
}

/// Probe for a full toolchain. Each tool is found independently; a missing
/// tool fails the whole lookup.
pub fn get_toolchain(language: Language, machine: Machine) -> Result<Toolchain, LowerError> {
    let compiler = detect::detect_compiler(language, machine)?;
    let linker = detect::detect_linker(language, machine, compiler.as_ref())?;
    let archiver = detect::detect_archiver(machine)?;
    Ok(Toolchain {
        compiler,
        linker,
        archiver,
    })
}

//! Error taxonomy for lowering.
//!
//! User-facing errors never abort the pipeline: the pass that hits one
//! rewrites the offending instruction into a `Message` of level `Error` and
//! lowering continues, so every diagnostic in the program is collected.
//! Errors that escape as `Err` here are configuration-fatal (no compiler,
//! no `project()` call) and stop the driver.

use thiserror::Error;

use crate::machines::Machine;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LowerError {
    /// Wrong positional count, keyword, or type in a lowered function.
    #[error("{0}")]
    InvalidArguments(String),

    #[error("object is not callable")]
    NotCallable,

    #[error("assignment target must be an identifier")]
    InvalidAssignmentTarget,

    #[error("dictionary keys must be strings")]
    InvalidDictKey,

    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    #[error("no {language} compiler found for the {machine:?} machine")]
    UnknownCompiler { language: String, machine: Machine },

    #[error("no archiver found")]
    UnknownArchiver,

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("{holder} has no method {method}")]
    UnknownMethod { holder: String, method: String },

    #[error("first statement must be a call to project()")]
    MissingProject,

    #[error("could not find required program \"{0}\"")]
    ProgramNotFound(String),
}

pub type LowerResult<T> = Result<T, LowerError>;

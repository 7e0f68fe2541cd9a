//! Compiler abstraction and the gnu-like C++ implementations.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use crate::arguments::{ArgType, Argument, IncludeType};
use crate::object::relative_to;

use super::Language;

/// Whether a file can be compiled, only tracked as a dependency, or is
/// meaningless to this compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanCompileType {
    Source,
    Depends,
    None,
}

pub trait Compiler: Debug + Send + Sync {
    /// Stable identifier of the compiler family, as exposed by
    /// `compiler.get_id()` in the DSL.
    fn id(&self) -> &'static str;

    fn language(&self) -> Language;

    fn binary(&self) -> &Path;

    fn version(&self) -> &str;

    /// Turn a compiler-specific argument string into the agnostic form.
    fn generalize_argument(&self, raw: &str) -> Argument;

    /// Turn an agnostic argument back into concrete command line words,
    /// resolving include paths against both trees.
    fn specialize_argument(
        &self,
        arg: &Argument,
        source_root: &Path,
        build_root: &Path,
    ) -> Vec<String>;

    /// Arguments passed on every invocation.
    fn always_args(&self) -> Vec<String>;

    fn supports_file(&self, name: &str) -> CanCompileType;

    fn output_command(&self, output: &str) -> Vec<String> {
        vec!["-o".to_owned(), output.to_owned()]
    }

    fn compile_only_command(&self) -> Vec<String> {
        vec!["-c".to_owned()]
    }

    fn generate_depfile(&self, target_file: &str, depfile: &str) -> Vec<String> {
        vec![
            "-MD".to_owned(),
            "-MQ".to_owned(),
            target_file.to_owned(),
            "-MF".to_owned(),
            depfile.to_owned(),
        ]
    }
}

/// Shared behavior of the gcc/clang C++ family. Only the id differs.
#[derive(Debug)]
pub struct GnuLikeCpp {
    id: &'static str,
    binary: PathBuf,
    version: String,
}

impl GnuLikeCpp {
    pub fn gnu(binary: PathBuf, version: String) -> Self {
        GnuLikeCpp {
            id: "gcc",
            binary,
            version,
        }
    }

    pub fn clang(binary: PathBuf, version: String) -> Self {
        GnuLikeCpp {
            id: "clang",
            binary,
            version,
        }
    }
}

impl Compiler for GnuLikeCpp {
    fn id(&self) -> &'static str {
        self.id
    }

    fn language(&self) -> Language {
        Language::Cpp
    }

    fn binary(&self) -> &Path {
        &self.binary
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn generalize_argument(&self, raw: &str) -> Argument {
        // XXX: this can't handle two-word forms like "-I foo"
        if let Some(rest) = raw.strip_prefix("-isystem") {
            return Argument::new_include(rest, IncludeType::System);
        }
        if let Some(rest) = raw.strip_prefix("-I") {
            return Argument::new_include(rest, IncludeType::Base);
        }
        if let Some(rest) = raw.strip_prefix("-D") {
            return Argument::new(rest, ArgType::Define);
        }
        if let Some(rest) = raw.strip_prefix("-L") {
            return Argument::new(rest, ArgType::LinkSearch);
        }
        if let Some(rest) = raw.strip_prefix("-l") {
            return Argument::new(rest, ArgType::Link);
        }
        if raw.ends_with(".a") || raw.ends_with(".so") {
            return Argument::new(raw, ArgType::Link);
        }
        Argument::new(raw, ArgType::Raw)
    }

    fn specialize_argument(
        &self,
        arg: &Argument,
        source_root: &Path,
        build_root: &Path,
    ) -> Vec<String> {
        match arg.typ() {
            ArgType::Define => vec![format!("-D{}", arg.value())],
            ArgType::Link => vec![format!("-l{}", arg.value())],
            ArgType::LinkSearch => vec![format!("-L{}", arg.value())],
            ArgType::Include => {
                let flag = match arg.include_type() {
                    IncludeType::Base => "-I",
                    IncludeType::System => "-isystem",
                };
                // Both copies of the directory: the build tree one for
                // generated headers, the source tree one for the rest.
                let build_inc = if arg.value().is_empty() {
                    ".".to_owned()
                } else {
                    arg.value().to_owned()
                };
                let source_inc = relative_to(&source_root.join(arg.value()), build_root);
                vec![
                    format!("{}{}", flag, build_inc),
                    format!("{}{}", flag, source_inc.display()),
                ]
            }
            ArgType::Raw => vec![arg.value().to_owned()],
        }
    }

    fn always_args(&self) -> Vec<String> {
        vec!["-D_FILE_OFFSET_BITS=64".to_owned()]
    }

    fn supports_file(&self, name: &str) -> CanCompileType {
        match Path::new(name).extension().and_then(|e| e.to_str()) {
            Some("cpp" | "c++" | "cc" | "cxx") => CanCompileType::Source,
            Some("hpp" | "h++" | "hh" | "h") => CanCompileType::Depends,
            _ => CanCompileType::None,
        }
    }
}

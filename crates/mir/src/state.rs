//! Persistent configuration state.
//!
//! This state is meant to survive reconfiguration: the probe caches in
//! particular are expensive to refill, so they are dumped to the build
//! directory as JSON and loaded back on the next run.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::machines::{self, Info, PerMachine};
use crate::toolchains::{Language, Toolchain};

/// A pkg-config lookup result, cached across reconfigurations. Flags are
/// kept in raw form and generalized when the dependency object is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedDependency {
    pub found: bool,
    pub version: String,
    pub compile_args: Vec<String>,
    pub link_args: Vec<String>,
}

/// Persistent state.
#[derive(Debug)]
pub struct Persistant {
    /// Absolute path to the source tree. Immutable after construction.
    pub source_root: PathBuf,

    /// Absolute path to the build tree. Immutable after construction.
    pub build_root: PathBuf,

    /// The name of the project, set by `project()`.
    pub name: String,

    /// The version of the project, set by `project()`.
    pub project_version: String,

    /// A mapping of language -> machine -> toolchain. Appended to by
    /// `project()` and `add_languages()`, read-only for every other pass.
    pub toolchains: IndexMap<Language, PerMachine<Arc<Toolchain>>>,

    /// Information on each machine. Only host == build configurations are
    /// handled until machine files exist.
    pub machines: PerMachine<Info>,

    /// Programs found by `find_program()`, cached across re-runs as
    /// name -> path. An empty path records a failed lookup.
    pub programs: PerMachine<IndexMap<String, PathBuf>>,

    /// Dependencies resolved through pkg-config, keyed by request
    /// fingerprint.
    pub dependencies: IndexMap<String, CachedDependency>,
}

impl Persistant {
    pub fn new(source_root: PathBuf, build_root: PathBuf) -> Self {
        Persistant {
            source_root,
            build_root,
            name: String::new(),
            project_version: String::new(),
            toolchains: IndexMap::new(),
            machines: PerMachine::new(machines::detect_build()),
            programs: PerMachine::default(),
            dependencies: IndexMap::new(),
        }
    }

    /// Serialize the cacheable parts of the state.
    pub fn serialize(&self, out: impl Write) -> std::io::Result<()> {
        let dump = Dump {
            source_root: self.source_root.clone(),
            build_root: self.build_root.clone(),
            name: self.name.clone(),
            project_version: self.project_version.clone(),
            machines: self.machines.clone(),
            programs: self.programs.clone(),
            dependencies: self.dependencies.clone(),
        };
        serde_json::to_writer_pretty(out, &dump).map_err(std::io::Error::from)
    }

    /// Rebuild state from a serialized dump. Toolchains are not cached;
    /// they are re-detected by the next `project()` lowering.
    pub fn load(input: impl Read) -> std::io::Result<Self> {
        let dump: Dump = serde_json::from_reader(input).map_err(std::io::Error::from)?;
        Ok(Persistant {
            source_root: dump.source_root,
            build_root: dump.build_root,
            name: dump.name,
            project_version: dump.project_version,
            toolchains: IndexMap::new(),
            machines: dump.machines,
            programs: dump.programs,
            dependencies: dump.dependencies,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct Dump {
    source_root: PathBuf,
    build_root: PathBuf,
    name: String,
    project_version: String,
    machines: PerMachine<Info>,
    programs: PerMachine<IndexMap<String, PathBuf>>,
    dependencies: IndexMap<String, CachedDependency>,
}

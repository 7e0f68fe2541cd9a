//! The mid-level IR object model.
//!
//! The MIR is lossy by design: it drops AST details that only matter for
//! parsing and keeps what the lowering passes need to reduce the program to
//! a flat list of build artifacts. Every value in the IR is an [`Object`];
//! an [`Instruction`] pairs an object with the [`Variable`] it defines.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::arguments::Argument;
use crate::cfg::NodeId;
use crate::machines::Machine;
use crate::toolchains::{Language, Toolchain};

/// Information about an object when it is stored to a variable.
///
/// At the MIR level assignments are attached to the defining instruction, as
/// many objects have creation side effects (creating a target, for example).
/// The name is referenced against the symbol table along with the version
/// assigned by value numbering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Variable {
    pub name: String,
    /// The version as used by value numbering, 0 means unset.
    pub gvn: u32,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Variable {
            name: name.into(),
            gvn: 0,
        }
    }

    pub fn versioned(name: impl Into<String>, gvn: u32) -> Self {
        Variable {
            name: name.into(),
            gvn,
        }
    }

    /// An anonymous variable defines nothing.
    pub fn is_set(&self) -> bool {
        !self.name.is_empty()
    }
}

/// A use of a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
    /// The value numbering version this use resolves to.
    ///
    /// Mostly this is filled in by value numbering, but it also matters when
    /// a phi is replaced with an identifier and we must be clear which
    /// version it aliases:
    ///
    /// ```text
    /// x.4 = x.1
    /// x.5 = phi(x.3, x.4)
    /// ```
    ///
    /// Here x.4 is x.1 and nothing else. Constant folding collapses such
    /// aliases promptly, so the version is only tracked short term.
    pub version: u32,
}

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Identifier {
            name: name.into(),
            version: 0,
        }
    }

    pub fn versioned(name: impl Into<String>, version: u32) -> Self {
        Identifier {
            name: name.into(),
            version,
        }
    }
}

/// A function or method call that has not been lowered yet.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    /// The object this method is called on, if it is a method.
    pub holder: Option<Box<Instruction>>,
    pub pos_args: Vec<Instruction>,
    pub kw_args: IndexMap<String, Instruction>,
    /// The directory the call was written in, relative to the source root.
    /// Functions like `files()` need it to map sources between the source
    /// and build trees.
    pub source_dir: PathBuf,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, pos_args: Vec<Instruction>, source_dir: PathBuf) -> Self {
        FunctionCall {
            name: name.into(),
            holder: None,
            pos_args,
            kw_args: IndexMap::new(),
            source_dir,
        }
    }

    pub fn with_keywords(
        name: impl Into<String>,
        pos_args: Vec<Instruction>,
        kw_args: IndexMap<String, Instruction>,
        source_dir: PathBuf,
    ) -> Self {
        FunctionCall {
            name: name.into(),
            holder: None,
            pos_args,
            kw_args,
            source_dir,
        }
    }
}

/// A source file, tracked relative to both trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub name: String,
    pub subdir: PathBuf,
    /// Whether this file is generated by the build, or a static source.
    pub built: bool,
    pub source_root: PathBuf,
    pub build_root: PathBuf,
}

impl File {
    pub fn new(
        name: impl Into<String>,
        subdir: impl Into<PathBuf>,
        built: bool,
        source_root: impl Into<PathBuf>,
        build_root: impl Into<PathBuf>,
    ) -> Self {
        File {
            name: name.into(),
            subdir: subdir.into(),
            built,
            source_root: source_root.into(),
            build_root: build_root.into(),
        }
    }

    /// The name of the file, relative to the source dir if it is static, or
    /// the build dir if it is built.
    pub fn get_name(&self) -> String {
        self.subdir.join(&self.name).to_string_lossy().into_owned()
    }

    pub fn relative_to_source_dir(&self) -> PathBuf {
        self.subdir.join(&self.name)
    }

    /// A path for this file usable from the build directory.
    pub fn relative_to_build_dir(&self) -> PathBuf {
        if self.built {
            self.subdir.join(&self.name)
        } else {
            let absolute = self.source_root.join(&self.subdir).join(&self.name);
            relative_to(&absolute, &self.build_root)
        }
    }
}

/// Compute `target` relative to the directory `base`. Both must be absolute.
pub(crate) fn relative_to(target: &Path, base: &Path) -> PathBuf {
    let target_parts: Vec<Component> = target.components().collect();
    let base_parts: Vec<Component> = base.components().collect();

    let common = target_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..base_parts.len() {
        out.push("..");
    }
    for part in &target_parts[common..] {
        out.push(part);
    }
    out
}

/// Input sources for most targets.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    File(File),
    CustomTarget(CustomTarget),
}

/// How a static library is linked into a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticLinkMode {
    Normal,
    Whole,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaticLinkage {
    pub mode: StaticLinkMode,
    pub library: Box<StaticLibrary>,
}

/// Arguments for a target, sorted by language. Each compiled source only
/// receives its per-language arguments.
pub type ArgMap = IndexMap<Language, Vec<Argument>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Executable {
    pub name: String,
    pub sources: Vec<Source>,
    /// Which machine this executable is built for.
    pub machine: Machine,
    /// Where this target is defined.
    pub subdir: PathBuf,
    pub arguments: ArgMap,
    /// Static targets to link with.
    pub link_static: Vec<StaticLinkage>,
}

impl Executable {
    pub fn output(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaticLibrary {
    pub name: String,
    pub sources: Vec<Source>,
    pub machine: Machine,
    pub subdir: PathBuf,
    pub arguments: ArgMap,
    pub link_static: Vec<StaticLinkage>,
}

impl StaticLibrary {
    pub fn output(&self) -> String {
        format!("lib{}.a", self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomTarget {
    pub name: String,
    pub inputs: Vec<Source>,
    pub outputs: Vec<File>,
    pub command: Vec<String>,
    pub subdir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeDirectories {
    pub directories: Vec<String>,
    pub is_system: bool,
}

/// A dependency to apply to build targets: arguments, found-ness, version.
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    pub name: String,
    pub found: bool,
    pub version: String,
    pub arguments: Vec<Argument>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageLevel {
    Debug,
    Message,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub level: MessageLevel,
    pub message: String,
}

impl Message {
    pub fn error(message: impl Into<String>) -> Self {
        Message {
            level: MessageLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub name: String,
    pub for_machine: Machine,
    pub path: PathBuf,
}

impl Program {
    pub fn found(&self) -> bool {
        !self.path.as_os_str().is_empty()
    }
}

/// A compiler as seen by the DSL. Toolchains are owned by the registry in
/// the persistent state; this only shares a reference.
#[derive(Debug, Clone)]
pub struct Compiler {
    pub toolchain: Arc<Toolchain>,
}

impl PartialEq for Compiler {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.toolchain, &other.toolchain)
    }
}

/// A phi: the point where two possible versions of a variable converge.
/// When one side strictly dominates the other the phi is replaced with an
/// identifier alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phi {
    pub left: u32,
    pub right: u32,
}

/// A resolved test registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Test {
    pub name: String,
    pub exe: String,
    pub arguments: Vec<String>,
    pub should_fail: bool,
}

/// Compiler or link arguments applied project- or global-wide, hoisted and
/// merged by the combine_add_arguments pass.
#[derive(Debug, Clone, PartialEq)]
pub struct AddArguments {
    pub arguments: ArgMap,
    pub is_global: bool,
}

/// The absorbing value of the DSL.
///
/// A `disabler()` (or a not-found lookup asked to produce one) poisons
/// whatever touches it: any call that receives a disabler becomes a
/// disabler itself instead of erroring, so a whole feature's worth of
/// targets silently drops out of the build. `found()` is the one escape
/// hatch, lowering to false.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disabler;

/// Unconditional or predicated jump terminator.
#[derive(Debug, Clone, PartialEq)]
pub struct Jump {
    pub target: NodeId,
    pub predicate: Option<Box<Instruction>>,
}

impl Jump {
    pub fn unconditional(target: NodeId) -> Self {
        Jump {
            target,
            predicate: None,
        }
    }
}

/// Multi-way branch terminator. Arms are tried in order; the last arm is the
/// fallthrough and carries a literal true predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub arms: Vec<(Instruction, NodeId)>,
}

/// Every value the MIR can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Empty,
    Boolean(bool),
    Number(i64),
    String(String),
    Identifier(Identifier),
    Array(Vec<Instruction>),
    Dict(IndexMap<String, Instruction>),
    FunctionCall(FunctionCall),
    File(File),
    Executable(Executable),
    StaticLibrary(StaticLibrary),
    CustomTarget(CustomTarget),
    IncludeDirectories(IncludeDirectories),
    Dependency(Dependency),
    Message(Message),
    Program(Program),
    Compiler(Compiler),
    Phi(Phi),
    Test(Test),
    AddArguments(AddArguments),
    Disabler(Disabler),
    Jump(Jump),
    Branch(Branch),
}

impl Object {
    /// Name of the variant, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Object::Empty => "void",
            Object::Boolean(_) => "boolean",
            Object::Number(_) => "number",
            Object::String(_) => "string",
            Object::Identifier(_) => "identifier",
            Object::Array(_) => "array",
            Object::Dict(_) => "dictionary",
            Object::FunctionCall(_) => "function call",
            Object::File(_) => "file",
            Object::Executable(_) => "executable",
            Object::StaticLibrary(_) => "static library",
            Object::CustomTarget(_) => "custom target",
            Object::IncludeDirectories(_) => "include directories",
            Object::Dependency(_) => "dependency",
            Object::Message(_) => "message",
            Object::Program(_) => "program",
            Object::Compiler(_) => "compiler",
            Object::Phi(_) => "phi",
            Object::Test(_) => "test",
            Object::AddArguments(_) => "add arguments",
            Object::Disabler(_) => "disabler",
            Object::Jump(_) => "jump",
            Object::Branch(_) => "branch",
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self, Object::Jump(_) | Object::Branch(_))
    }

    /// Whether this object is fully lowered: no unresolved calls or names
    /// left inside it. Only reduced objects may be consumed by function
    /// lowering.
    pub fn is_reduced(&self) -> bool {
        match self {
            Object::Boolean(_)
            | Object::Number(_)
            | Object::String(_)
            | Object::File(_)
            | Object::Executable(_)
            | Object::StaticLibrary(_)
            | Object::CustomTarget(_)
            | Object::IncludeDirectories(_)
            | Object::Dependency(_)
            | Object::Message(_)
            | Object::Program(_)
            | Object::Compiler(_)
            | Object::Test(_)
            | Object::Empty => true,
            Object::Array(values) => values.iter().all(|v| v.obj.is_reduced()),
            Object::Dict(values) => values.values().all(|v| v.obj.is_reduced()),
            // A disabler is deliberately never "reduced": lowering must not
            // consume a call holding one, the disabler pass absorbs it first
            Object::Identifier(_)
            | Object::FunctionCall(_)
            | Object::Phi(_)
            | Object::AddArguments(_)
            | Object::Disabler(_)
            | Object::Jump(_)
            | Object::Branch(_) => false,
        }
    }
}

/// One step of the program: an object and the variable it defines.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub obj: Object,
    pub var: Variable,
}

impl Instruction {
    pub fn new(obj: Object) -> Self {
        Instruction {
            obj,
            var: Variable::default(),
        }
    }

    pub fn with_var(obj: Object, var: Variable) -> Self {
        Instruction { obj, var }
    }

    pub fn is_terminator(&self) -> bool {
        self.obj.is_terminator()
    }
}

impl From<Object> for Instruction {
    fn from(obj: Object) -> Self {
        Instruction::new(obj)
    }
}

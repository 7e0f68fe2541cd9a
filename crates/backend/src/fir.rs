//! The flat intermediate representation.
//!
//! The lowered instruction stream is converted into backend-neutral target
//! records: one compile rule per source, one link or archive rule per
//! target, one custom rule per custom target. A build-tool backend (ninja
//! or otherwise) only has to serialize these.

use std::path::PathBuf;

use thiserror::Error;

use boson_mir::machines::Machine;
use boson_mir::object::{ArgMap, CustomTarget, Executable, Object, Source, StaticLibrary};
use boson_mir::toolchains::{CanCompileType, Language};
use boson_mir::{Instruction, Persistant};

use crate::test_records::Test;

#[derive(Debug, Error)]
pub enum FirError {
    #[error("no {0:?} toolchain is registered")]
    MissingToolchain(Language),

    #[error("the instruction stream still contains an error: {0}")]
    ErrorInStream(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    Compile,
    Archive,
    Link,
    Custom,
}

/// A build rule to be serialized by a build-tool backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub input: Vec<String>,
    pub output: Vec<String>,
    pub typ: TargetType,
    pub language: Option<Language>,
    pub machine: Option<Machine>,
    pub arguments: Vec<String>,
    /// Real dependencies beyond the inputs.
    pub deps: Vec<String>,
    /// Order-only dependencies.
    pub order_deps: Vec<String>,
}

/// Arguments that apply program-wide, collected from AddArguments nodes
/// before any target is emitted.
#[derive(Default)]
struct FirState {
    arguments: ArgMap,
}

fn source_paths(source: &Source) -> Vec<String> {
    match source {
        Source::File(f) => vec![f.relative_to_build_dir().to_string_lossy().into_owned()],
        Source::CustomTarget(t) => t
            .outputs
            .iter()
            .map(|o| o.relative_to_build_dir().to_string_lossy().into_owned())
            .collect(),
    }
}

/// Emit the compile and link rules for one build target.
fn target_rules(
    name: &str,
    sources: &[Source],
    arguments: &ArgMap,
    link_output: String,
    link_type: TargetType,
    machine: Machine,
    pstate: &Persistant,
    state: &FirState,
) -> Result<Vec<Target>, FirError> {
    let toolchain = pstate
        .toolchains
        .get(&Language::Cpp)
        .ok_or(FirError::MissingToolchain(Language::Cpp))?
        .build();
    let compiler = &toolchain.compiler;

    let mut cpp_args: Vec<String> = Vec::new();
    for set in [&state.arguments, arguments] {
        if let Some(args) = set.get(&Language::Cpp) {
            for a in args {
                cpp_args.extend(compiler.specialize_argument(
                    a,
                    &pstate.source_root,
                    &pstate.build_root,
                ));
            }
        }
    }
    cpp_args.extend(compiler.always_args());

    // Generated headers from custom-target sources order the compiles
    let mut order_deps: Vec<String> = Vec::new();
    for source in sources {
        if let Source::CustomTarget(t) = source {
            for output in &t.outputs {
                if compiler.supports_file(&output.name) == CanCompileType::Depends {
                    order_deps
                        .push(output.relative_to_build_dir().to_string_lossy().into_owned());
                }
            }
        }
    }

    let mut rules = Vec::new();
    let private_dir = PathBuf::from(format!("{}.p", name));

    for source in sources {
        match source {
            Source::File(file) => {
                if compiler.supports_file(&file.name) != CanCompileType::Source {
                    continue;
                }
                let object = private_dir.join(format!("{}.o", file.get_name()));
                rules.push(Target {
                    input: source_paths(source),
                    output: vec![object.to_string_lossy().into_owned()],
                    typ: TargetType::Compile,
                    language: Some(Language::Cpp),
                    machine: Some(machine),
                    arguments: cpp_args.clone(),
                    deps: vec![],
                    order_deps: order_deps.clone(),
                });
            }
            Source::CustomTarget(t) => {
                for file in &t.outputs {
                    if compiler.supports_file(&file.name) != CanCompileType::Source {
                        continue;
                    }
                    let generated = file.relative_to_build_dir().to_string_lossy().into_owned();
                    let object = private_dir.join(format!("{}.o", file.get_name()));
                    rules.push(Target {
                        input: vec![generated.clone()],
                        output: vec![object.to_string_lossy().into_owned()],
                        typ: TargetType::Compile,
                        language: Some(Language::Cpp),
                        machine: Some(machine),
                        arguments: cpp_args.clone(),
                        deps: vec![generated],
                        order_deps: order_deps.clone(),
                    });
                }
            }
        }
    }

    let final_inputs: Vec<String> = rules.iter().flat_map(|r| r.output.clone()).collect();
    let link_args = match link_type {
        TargetType::Archive => toolchain.archiver.always_args(),
        _ => toolchain.linker.always_args(),
    };

    rules.push(Target {
        input: final_inputs,
        output: vec![link_output],
        typ: link_type,
        language: Some(Language::Cpp),
        machine: Some(machine),
        arguments: link_args,
        deps: vec![],
        order_deps: vec![],
    });

    Ok(rules)
}

fn executable_rules(
    exe: &Executable,
    pstate: &Persistant,
    state: &FirState,
) -> Result<Vec<Target>, FirError> {
    let mut rules = target_rules(
        &exe.name,
        &exe.sources,
        &exe.arguments,
        exe.output(),
        TargetType::Link,
        exe.machine,
        pstate,
        state,
    )?;
    // Archives join the link line
    if let Some(link) = rules.last_mut() {
        for linkage in &exe.link_static {
            link.input.push(linkage.library.output());
        }
    }
    Ok(rules)
}

fn static_library_rules(
    lib: &StaticLibrary,
    pstate: &Persistant,
    state: &FirState,
) -> Result<Vec<Target>, FirError> {
    target_rules(
        &lib.name,
        &lib.sources,
        &lib.arguments,
        lib.output(),
        TargetType::Archive,
        lib.machine,
        pstate,
        state,
    )
}

fn custom_target_rule(ct: &CustomTarget) -> Target {
    Target {
        input: ct.inputs.iter().flat_map(source_paths).collect(),
        output: ct
            .outputs
            .iter()
            .map(|o| o.relative_to_build_dir().to_string_lossy().into_owned())
            .collect(),
        typ: TargetType::Custom,
        language: None,
        machine: None,
        arguments: ct.command.clone(),
        deps: vec![],
        order_deps: vec![],
    }
}

/// Convert a fully lowered instruction stream into FIR targets and test
/// records. The stream must be error free.
pub fn mir_to_fir(
    instructions: &[Instruction],
    pstate: &Persistant,
) -> Result<(Vec<Target>, Vec<Test>), FirError> {
    let mut state = FirState::default();

    // Program-wide arguments first: they apply to every target no matter
    // where the add_arguments call sat in the source
    for inst in instructions {
        match &inst.obj {
            Object::AddArguments(args) => {
                for (language, arguments) in &args.arguments {
                    state
                        .arguments
                        .entry(*language)
                        .or_default()
                        .extend(arguments.iter().cloned());
                }
            }
            Object::Message(m) if m.level == boson_mir::object::MessageLevel::Error => {
                return Err(FirError::ErrorInStream(m.message.clone()));
            }
            _ => {}
        }
    }

    let mut targets = Vec::new();
    let mut tests = Vec::new();
    for inst in instructions {
        match &inst.obj {
            Object::Executable(exe) => {
                targets.extend(executable_rules(exe, pstate, &state)?)
            }
            Object::StaticLibrary(lib) => {
                targets.extend(static_library_rules(lib, pstate, &state)?)
            }
            Object::CustomTarget(ct) => targets.push(custom_target_rule(ct)),
            Object::Test(t) => tests.push(Test {
                name: t.name.clone(),
                exe: t.exe.clone(),
                arguments: t.arguments.clone(),
                should_fail: t.should_fail,
            }),
            _ => {}
        }
    }

    Ok((targets, tests))
}

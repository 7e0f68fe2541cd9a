//! Lowering for free standing functions.
//!
//! Each builtin waits until its arguments are fully reduced, then rewrites
//! the call into the object it creates. Argument mistakes never stop the
//! pipeline: they turn into error messages at the call site and dead code
//! elimination takes it from there.

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;

use crate::cfg::{Cfg, NodeId};
use crate::error::{LowerError, LowerResult};
use crate::machines::Machine;
use crate::object::{
    AddArguments, ArgMap, CustomTarget, Dependency, Disabler, Executable, File, FunctionCall,
    IncludeDirectories, Instruction, Message, MessageLevel, Object, Source, StaticLibrary,
    StaticLinkage, StaticLinkMode, Test,
};
use crate::state::Persistant;
use crate::toolchains::{self, Compiler, Language};

use super::extractors::{
    all_args_reduced, bool_value, kw_bool, kw_list, kw_string, kw_string_list, string_value,
    variadic_strings,
};
use super::operators;
use super::walkers::function_walker;
use super::with_instructions;

fn cpp_compiler(pstate: &Persistant) -> LowerResult<&dyn Compiler> {
    pstate
        .toolchains
        .get(&Language::Cpp)
        .map(|tc| tc.build().compiler.as_ref())
        .ok_or_else(|| {
            LowerError::InvalidArguments(
                "tried to build a C++ target without a C++ toolchain".to_owned(),
            )
        })
}

fn lower_files(f: &FunctionCall, pstate: &Persistant) -> LowerResult<Object> {
    let names = variadic_strings(&f.pos_args, "files: arguments must be strings")?;
    let files = names
        .into_iter()
        .map(|name| {
            Instruction::new(Object::File(File::new(
                name,
                &f.source_dir,
                false,
                &pstate.source_root,
                &pstate.build_root,
            )))
        })
        .collect();
    Ok(Object::Array(files))
}

/// Convert one source argument into a [`Source`]: strings become static
/// files keyed by the call site's directory, files and custom targets pass
/// through.
fn src_to_source(
    inst: &Instruction,
    pstate: &Persistant,
    subdir: &Path,
    what: &str,
) -> LowerResult<Source> {
    match &inst.obj {
        Object::String(s) => Ok(Source::File(File::new(
            s,
            subdir,
            false,
            &pstate.source_root,
            &pstate.build_root,
        ))),
        Object::File(file) => Ok(Source::File(file.clone())),
        Object::CustomTarget(ct) => Ok(Source::CustomTarget(ct.clone())),
        other => Err(LowerError::InvalidArguments(format!(
            "{}: sources must be strings, files, or custom_target objects, got {}",
            what,
            other.kind_name()
        ))),
    }
}

enum TargetKind {
    Executable,
    StaticLibrary,
}

fn lower_build_target(
    f: &FunctionCall,
    pstate: &Persistant,
    kind: TargetKind,
) -> LowerResult<Object> {
    if f.pos_args.len() < 2 {
        return Err(LowerError::InvalidArguments(format!(
            "{} requires at least 2 arguments",
            f.name
        )));
    }

    let name = string_value(
        &f.pos_args[0],
        &format!("{}: first argument must be a string", f.name),
    )?;

    let mut sources = Vec::new();
    for arg in &f.pos_args[1..] {
        sources.push(src_to_source(arg, pstate, &f.source_dir, &f.name)?);
    }

    let compiler = cpp_compiler(pstate)?;

    let mut arguments = ArgMap::new();
    let raw_args = kw_string_list(
        &f.kw_args,
        "cpp_args",
        &format!("{}: 'cpp_args' keyword argument must be strings", f.name),
    )?;
    let cpp_args: &mut Vec<_> = arguments.entry(Language::Cpp).or_default();
    for raw in raw_args {
        cpp_args.push(compiler.generalize_argument(&raw));
    }

    for inc in kw_list(&f.kw_args, "include_directories") {
        let Object::IncludeDirectories(dirs) = &inc.obj else {
            return Err(LowerError::InvalidArguments(format!(
                "{}: 'include_directories' keyword argument must be IncludeDirectories objects",
                f.name
            )));
        };
        for d in &dirs.directories {
            cpp_args.push(crate::arguments::Argument::new_include(
                d,
                if dirs.is_system {
                    crate::arguments::IncludeType::System
                } else {
                    crate::arguments::IncludeType::Base
                },
            ));
        }
    }

    for dep in kw_list(&f.kw_args, "dependencies") {
        let Object::Dependency(dep) = &dep.obj else {
            return Err(LowerError::InvalidArguments(format!(
                "{}: 'dependencies' keyword argument must be Dependency objects",
                f.name
            )));
        };
        cpp_args.extend(dep.arguments.iter().cloned());
    }

    let mut link_static = Vec::new();
    for lib in kw_list(&f.kw_args, "link_with") {
        let Object::StaticLibrary(lib) = &lib.obj else {
            return Err(LowerError::InvalidArguments(format!(
                "{}: 'link_with' keyword argument must be StaticLibrary objects",
                f.name
            )));
        };
        link_static.push(StaticLinkage {
            mode: StaticLinkMode::Normal,
            library: Box::new(lib.clone()),
        });
    }

    // TODO: the machine needs to come from the native kwarg
    let machine = Machine::Build;
    Ok(match kind {
        TargetKind::Executable => Object::Executable(Executable {
            name,
            sources,
            machine,
            subdir: f.source_dir.clone(),
            arguments,
            link_static,
        }),
        TargetKind::StaticLibrary => Object::StaticLibrary(StaticLibrary {
            name,
            sources,
            machine,
            subdir: f.source_dir.clone(),
            arguments,
            link_static,
        }),
    })
}

fn lower_disabler(f: &FunctionCall) -> LowerResult<Object> {
    if !f.pos_args.is_empty() || !f.kw_args.is_empty() {
        return Err(LowerError::InvalidArguments(
            "disabler: does not take any arguments".to_owned(),
        ));
    }
    Ok(Object::Disabler(Disabler))
}

fn lower_include_dirs(f: &FunctionCall) -> LowerResult<Object> {
    let directories = variadic_strings(
        &f.pos_args,
        "include_directories: all positional arguments must be strings",
    )?;
    let is_system = kw_bool(
        &f.kw_args,
        "is_system",
        "include_directories: 'is_system' argument must be a boolean",
    )?
    .unwrap_or(false);

    Ok(Object::IncludeDirectories(IncludeDirectories {
        directories,
        is_system,
    }))
}

fn lower_messages(f: &FunctionCall) -> LowerResult<Object> {
    let level = match f.name.as_str() {
        "message" => MessageLevel::Message,
        "warning" => MessageLevel::Warn,
        "error" => MessageLevel::Error,
        "debug" => MessageLevel::Debug,
        other => unreachable!("lower_messages called for {}", other),
    };

    // TODO: meson accepts basically anything as a message; only strings
    // until the flattening story for non-string values is decided
    let parts = variadic_strings(&f.pos_args, "message: arguments must be strings")?;
    Ok(Object::Message(Message {
        level,
        message: parts.join(" "),
    }))
}

fn lower_assert(f: &FunctionCall) -> LowerResult<Object> {
    if f.pos_args.is_empty() || f.pos_args.len() > 2 {
        return Err(LowerError::InvalidArguments(format!(
            "assert: takes 1 or 2 arguments, got {}",
            f.pos_args.len()
        )));
    }

    let value = bool_value(
        &f.pos_args[0],
        "assert: first argument did not resolve to boolean",
    )?;
    if value {
        return Ok(Object::Empty);
    }

    let message = match f.pos_args.get(1) {
        Some(m) => string_value(m, "assert: second argument must be a string")?,
        None => String::new(),
    };
    Ok(Object::Message(Message::error(format!(
        "Assertion failed: {}",
        message
    ))))
}

fn lower_declare_dependency(f: &FunctionCall, pstate: &Persistant) -> LowerResult<Object> {
    if !f.pos_args.is_empty() {
        return Err(LowerError::InvalidArguments(
            "declare_dependency: takes 0 positional arguments".to_owned(),
        ));
    }

    let version = kw_string(
        &f.kw_args,
        "version",
        "declare_dependency: 'version' keyword argument must be a string",
    )?
    .unwrap_or_else(|| "unknown".to_owned());

    let mut arguments = Vec::new();

    let compile_args = kw_string_list(
        &f.kw_args,
        "compile_args",
        "declare_dependency: 'compile_args' keyword argument must be strings",
    )?;
    if !compile_args.is_empty() {
        // XXX: assumes C++
        let compiler = cpp_compiler(pstate)?;
        for raw in compile_args {
            arguments.push(compiler.generalize_argument(&raw));
        }
    }

    for inc in kw_list(&f.kw_args, "include_directories") {
        match &inc.obj {
            Object::String(s) => {
                arguments.push(crate::arguments::Argument::new_include(
                    s,
                    crate::arguments::IncludeType::Base,
                ));
            }
            Object::IncludeDirectories(dirs) => {
                for d in &dirs.directories {
                    arguments.push(crate::arguments::Argument::new_include(
                        d,
                        if dirs.is_system {
                            crate::arguments::IncludeType::System
                        } else {
                            crate::arguments::IncludeType::Base
                        },
                    ));
                }
            }
            other => {
                return Err(LowerError::InvalidArguments(format!(
                    "declare_dependency: 'include_directories' must be strings or \
                     IncludeDirectories objects, got {}",
                    other.kind_name()
                )))
            }
        }
    }

    // Nested dependencies are absorbed whole
    for dep in kw_list(&f.kw_args, "dependencies") {
        let Object::Dependency(dep) = &dep.obj else {
            return Err(LowerError::InvalidArguments(
                "declare_dependency: 'dependencies' keyword argument must be Dependency objects"
                    .to_owned(),
            ));
        };
        arguments.extend(dep.arguments.iter().cloned());
    }

    Ok(Object::Dependency(Dependency {
        name: "internal".to_owned(),
        found: true,
        version,
        arguments,
    }))
}

fn sources_of(kw: &Instruction, pstate: &Persistant, subdir: &Path) -> LowerResult<Vec<Source>> {
    match &kw.obj {
        Object::Array(elements) => elements
            .iter()
            .map(|e| src_to_source(e, pstate, subdir, "custom_target"))
            .collect(),
        _ => Ok(vec![src_to_source(kw, pstate, subdir, "custom_target")?]),
    }
}

fn substitute_command(
    inst: &Instruction,
    inputs: &[Source],
    outputs: &[File],
) -> LowerResult<Vec<String>> {
    let path_of = |s: &Source| -> Vec<String> {
        match s {
            Source::File(f) => vec![f.relative_to_build_dir().to_string_lossy().into_owned()],
            Source::CustomTarget(t) => t
                .outputs
                .iter()
                .map(|o| o.relative_to_build_dir().to_string_lossy().into_owned())
                .collect(),
        }
    };

    match &inst.obj {
        Object::String(v) => {
            if v == "@OUTPUT@" {
                return Ok(outputs
                    .iter()
                    .map(|o| o.relative_to_build_dir().to_string_lossy().into_owned())
                    .collect());
            }
            if v == "@INPUT@" {
                return Ok(inputs.iter().flat_map(|i| path_of(i)).collect());
            }
            if let Some(index) = v
                .strip_prefix("@OUTPUT")
                .and_then(|r| r.strip_suffix('@'))
                .and_then(|r| r.parse::<usize>().ok())
            {
                return outputs
                    .get(index)
                    .map(|o| vec![o.relative_to_build_dir().to_string_lossy().into_owned()])
                    .ok_or_else(|| {
                        LowerError::InvalidArguments(format!(
                            "custom_target: output index {} out of range",
                            index
                        ))
                    });
            }
            if let Some(index) = v
                .strip_prefix("@INPUT")
                .and_then(|r| r.strip_suffix('@'))
                .and_then(|r| r.parse::<usize>().ok())
            {
                return inputs.get(index).map(path_of).ok_or_else(|| {
                    LowerError::InvalidArguments(format!(
                        "custom_target: input index {} out of range",
                        index
                    ))
                });
            }
            Ok(vec![v.clone()])
        }
        Object::File(file) => Ok(vec![file
            .relative_to_build_dir()
            .to_string_lossy()
            .into_owned()]),
        Object::Program(program) => Ok(vec![program.path.to_string_lossy().into_owned()]),
        other => Err(LowerError::InvalidArguments(format!(
            "custom_target: 'command' must be strings, files, or find_program objects, got {}",
            other.kind_name()
        ))),
    }
}

fn lower_custom_target(f: &FunctionCall, pstate: &Persistant) -> LowerResult<Object> {
    let inputs = match f.kw_args.get("input") {
        Some(kw) => sources_of(kw, pstate, &f.source_dir)?,
        None => Vec::new(),
    };

    let out_names = kw_string_list(
        &f.kw_args,
        "output",
        "custom_target: output arguments must be strings",
    )?;
    let outputs: Vec<File> = out_names
        .into_iter()
        .map(|name| {
            File::new(
                name,
                &f.source_dir,
                true,
                &pstate.source_root,
                &pstate.build_root,
            )
        })
        .collect();

    let name = match f.pos_args.first() {
        Some(arg) => string_value(arg, "custom_target: name must be a string")?,
        None => outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| {
                LowerError::InvalidArguments(
                    "custom_target: missing required kwarg 'output'".to_owned(),
                )
            })?,
    };

    let cmd = f.kw_args.get("command").ok_or_else(|| {
        LowerError::InvalidArguments("custom_target: missing required kwarg 'command'".to_owned())
    })?;
    let mut command = Vec::new();
    match &cmd.obj {
        Object::Array(elements) => {
            for e in elements {
                command.extend(substitute_command(e, &inputs, &outputs)?);
            }
        }
        _ => command.extend(substitute_command(cmd, &inputs, &outputs)?),
    }

    Ok(Object::CustomTarget(CustomTarget {
        name,
        inputs,
        outputs,
        command,
        subdir: f.source_dir.clone(),
    }))
}

fn lower_add_arguments(f: &FunctionCall, pstate: &Persistant) -> LowerResult<Object> {
    let languages = kw_string_list(
        &f.kw_args,
        "language",
        &format!("{}: 'language' keyword argument must be strings", f.name),
    )?;
    if languages.is_empty() {
        return Err(LowerError::InvalidArguments(format!(
            "{}: missing required kwarg 'language'",
            f.name
        )));
    }

    let arguments = variadic_strings(
        &f.pos_args,
        &format!("{}: positional arguments must be strings", f.name),
    )?;
    // Meson allows an empty call, so just delete the node
    if arguments.is_empty() {
        return Ok(Object::Empty);
    }

    let mut mapping = ArgMap::new();
    for raw_lang in languages {
        let language = Language::from_string(&raw_lang)?;
        if let Some(tc) = pstate.toolchains.get(&language) {
            let compiler = &tc.build().compiler;
            mapping.entry(language).or_default().extend(
                arguments.iter().map(|a| compiler.generalize_argument(a)),
            );
        }
    }

    Ok(Object::AddArguments(AddArguments {
        arguments: mapping,
        is_global: f.name.starts_with("add_global"),
    }))
}

fn lower_test(f: &FunctionCall) -> LowerResult<Object> {
    if f.pos_args.len() != 2 {
        return Err(LowerError::InvalidArguments(
            "test: takes 2 positional arguments".to_owned(),
        ));
    }

    let name = string_value(&f.pos_args[0], "test: first argument must be a string")?;

    let exe = match &f.pos_args[1].obj {
        Object::File(file) => file.relative_to_build_dir().to_string_lossy().into_owned(),
        Object::Executable(exe) => exe.output(),
        Object::Program(program) => program.path.to_string_lossy().into_owned(),
        other => {
            return Err(LowerError::InvalidArguments(format!(
                "test: second argument must be a File, Executable, or found Program, got {}",
                other.kind_name()
            )))
        }
    };

    let mut arguments = Vec::new();
    for arg in kw_list(&f.kw_args, "args") {
        match &arg.obj {
            Object::String(s) => arguments.push(s.clone()),
            Object::File(file) => {
                arguments.push(file.relative_to_build_dir().to_string_lossy().into_owned())
            }
            Object::CustomTarget(t) => arguments.extend(
                t.outputs
                    .iter()
                    .map(|o| o.relative_to_build_dir().to_string_lossy().into_owned()),
            ),
            other => {
                return Err(LowerError::InvalidArguments(format!(
                    "test: 'args' keyword arguments must be strings, files, or custom_target \
                     objects, got {}",
                    other.kind_name()
                )))
            }
        }
    }

    let should_fail = kw_bool(
        &f.kw_args,
        "should_fail",
        "test: 'should_fail' argument must be a boolean",
    )?
    .unwrap_or(false);

    Ok(Object::Test(Test {
        name,
        exe,
        arguments,
        should_fail,
    }))
}

fn lower_vcs_tag(f: &FunctionCall, pstate: &Persistant) -> LowerResult<Object> {
    if !f.pos_args.is_empty() {
        return Err(LowerError::InvalidArguments(
            "vcs_tag: does not take any positional arguments".to_owned(),
        ));
    }
    if f.kw_args.contains_key("command") {
        return Err(LowerError::InvalidArguments(
            "not implemented: vcs_tag 'command' keyword argument".to_owned(),
        ));
    }

    let input = f.kw_args.get("input").ok_or_else(|| {
        LowerError::InvalidArguments("vcs_tag: missing required keyword argument input".to_owned())
    })?;
    let input = src_to_source(input, pstate, &f.source_dir, "vcs_tag")?;

    let output = kw_string(&f.kw_args, "output", "vcs_tag: 'output' must be a string")?
        .ok_or_else(|| {
            LowerError::InvalidArguments(
                "vcs_tag: missing required keyword argument output".to_owned(),
            )
        })?;
    let fallback = kw_string(&f.kw_args, "fallback", "vcs_tag: 'fallback' must be a string")?
        .unwrap_or_else(|| pstate.project_version.clone());
    let replace_string = kw_string(
        &f.kw_args,
        "replace_string",
        "vcs_tag: 'replace_string' must be a string",
    )?
    .unwrap_or_else(|| "@VCS_TAG@".to_owned());

    let outfile = File::new(
        output,
        &f.source_dir,
        true,
        &pstate.source_root,
        &pstate.build_root,
    );
    let Source::File(src) = &input else {
        return Err(LowerError::InvalidArguments(
            "vcs_tag: 'input' must be a string or file".to_owned(),
        ));
    };

    let boson = std::env::current_exe().unwrap_or_else(|_| "boson".into());
    let command = vec![
        boson.to_string_lossy().into_owned(),
        "vcs-tag".to_owned(),
        src.relative_to_build_dir().to_string_lossy().into_owned(),
        outfile.relative_to_build_dir().to_string_lossy().into_owned(),
        fallback,
        replace_string,
    ];

    Ok(Object::CustomTarget(CustomTarget {
        name: outfile.name.clone(),
        inputs: vec![input],
        outputs: vec![outfile],
        command,
        subdir: f.source_dir.clone(),
    }))
}

fn lower_impl(f: &FunctionCall, pstate: &Persistant) -> Option<LowerResult<Object>> {
    let lowered = match f.name.as_str() {
        "assert" => lower_assert(f),
        "message" | "warning" | "error" | "debug" => lower_messages(f),
        "disabler" => lower_disabler(f),
        "include_directories" => lower_include_dirs(f),
        "files" => lower_files(f, pstate),
        "custom_target" => lower_custom_target(f, pstate),
        "executable" => lower_build_target(f, pstate, TargetKind::Executable),
        "static_library" => lower_build_target(f, pstate, TargetKind::StaticLibrary),
        "declare_dependency" => lower_declare_dependency(f, pstate),
        "vcs_tag" => lower_vcs_tag(f, pstate),
        "test" => lower_test(f),
        "add_project_arguments"
        | "add_project_link_arguments"
        | "add_global_arguments"
        | "add_global_link_arguments" => lower_add_arguments(f, pstate),
        // A project() call surviving to this point is out of position
        "project" => Err(LowerError::InvalidArguments(
            "project() must be the first statement of the root build file".to_owned(),
        )),
        // Handled by the threaded lowering
        "find_program" | "dependency" => return None,
        other => Err(LowerError::UnknownFunction(other.to_owned())),
    };
    Some(lowered)
}

pub fn lower_free_functions(cfg: &mut Cfg, node: NodeId, pstate: &Persistant) -> bool {
    with_instructions(cfg, node, |instructions| {
        function_walker(instructions, &mut |inst| {
            let Object::FunctionCall(f) = &inst.obj else {
                return None;
            };
            if f.holder.is_some() || operators::is_operator(&f.name) {
                return None;
            }
            if !all_args_reduced(&f.pos_args, &f.kw_args) {
                return None;
            }

            let obj = match lower_impl(f, pstate)? {
                Ok(obj) => obj,
                Err(e) => Object::Message(Message::error(e.to_string())),
            };
            Some(Instruction::new(obj))
        })
    })
}

/// Handle the requirements placed on the `project()` call.
///
/// It must be the first statement of the root build file: it is read before
/// the pipeline runs, fills the persistent state, registers toolchains for
/// the requested languages, and is removed so later passes only ever see an
/// out-of-place project() as an error.
pub fn lower_project(cfg: &mut Cfg, pstate: &mut Persistant) -> LowerResult<()> {
    let entry = cfg.entry();

    let call = match cfg.node(entry).instructions.first() {
        Some(Instruction {
            obj: Object::FunctionCall(f),
            ..
        }) if f.holder.is_none() && f.name == "project" => f.clone(),
        _ => return Err(LowerError::MissingProject),
    };

    if call.pos_args.is_empty() {
        return Err(LowerError::InvalidArguments(
            "project requires at least 1 argument".to_owned(),
        ));
    }

    pstate.name = string_value(
        &call.pos_args[0],
        "project: first argument must be a string",
    )?;
    println!("Project name: {}", pstate.name.bold());

    let languages = variadic_strings(
        &call.pos_args[1..],
        "project: language arguments must be strings",
    )?;
    for raw in languages {
        let language = Language::from_string(&raw)?;
        if pstate.toolchains.contains_key(&language) {
            continue;
        }

        // TODO: the host toolchain needs a machine file to differ
        let toolchain = Arc::new(toolchains::get_toolchain(language, Machine::Build)?);
        println!(
            "{} compiler for the build machine: {} ({})",
            language.display(),
            toolchain.compiler.id().bold(),
            toolchain.compiler.version()
        );
        println!(
            "{} linker for the build machine: {}",
            language.display(),
            toolchain.linker.id().bold()
        );

        pstate
            .toolchains
            .insert(language, crate::machines::PerMachine::new(toolchain));
    }

    pstate.project_version = kw_string(
        &call.kw_args,
        "version",
        "project: 'version' must be a string",
    )?
    .unwrap_or_else(|| "unknown".to_owned());

    // Remove the call so we don't find it again when looking for invalid
    // function calls
    cfg.node_mut(entry).instructions.remove(0);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_to_mir::lower_ast;
    use crate::machines::PerMachine;
    use crate::toolchains::archiver::GnuAr;
    use crate::toolchains::compiler::GnuLikeCpp;
    use crate::toolchains::linker::GnuBfd;
    use crate::toolchains::Toolchain;
    use boson_parser::parse;

    fn test_state() -> Persistant {
        let mut pstate = Persistant::new("/src".into(), "/src/build".into());
        let toolchain = Toolchain {
            compiler: Box::new(GnuLikeCpp::gnu(
                "/usr/bin/g++".into(),
                "g++ (GCC) 13.2.0".into(),
            )),
            linker: Box::new(GnuBfd::new("/usr/bin/g++".into())),
            archiver: Box::new(GnuAr::new("/usr/bin/ar".into())),
        };
        pstate
            .toolchains
            .insert(Language::Cpp, PerMachine::new(Arc::new(toolchain)));
        pstate
    }

    fn run(source: &str) -> (Cfg, Persistant) {
        let pstate = test_state();
        let ast = parse(source).unwrap();
        let mut cfg = lower_ast(&ast, Path::new("")).unwrap();
        let entry = cfg.entry();
        lower_free_functions(&mut cfg, entry, &pstate);
        (cfg, pstate)
    }

    fn first_obj(cfg: &Cfg) -> Object {
        cfg.node(cfg.entry()).instructions[0].obj.clone()
    }

    #[test]
    fn files_produces_an_array_of_files() {
        let (cfg, _) = run("x = files('foo.c')");
        let Object::Array(elements) = first_obj(&cfg) else {
            panic!("expected array");
        };
        assert_eq!(elements.len(), 1);
        let Object::File(file) = &elements[0].obj else {
            panic!("expected file");
        };
        assert_eq!(file.get_name(), "foo.c");
        assert!(!file.built);
    }

    #[test]
    fn message_joins_arguments_with_spaces() {
        let (cfg, _) = run("warning('foo', 'bar')");
        let Object::Message(m) = first_obj(&cfg) else {
            panic!("expected message");
        };
        assert_eq!(m.level, MessageLevel::Warn);
        assert_eq!(m.message, "foo bar");
    }

    #[test]
    fn assert_false_is_an_error() {
        let (cfg, _) = run("assert(false)");
        let Object::Message(m) = first_obj(&cfg) else {
            panic!("expected message");
        };
        assert_eq!(m.level, MessageLevel::Error);
        assert_eq!(m.message, "Assertion failed: ");
    }

    #[test]
    fn assert_true_is_empty() {
        let (cfg, _) = run("assert(true, 'must hold')");
        assert_eq!(first_obj(&cfg), Object::Empty);
    }

    #[test]
    fn executable_collects_sources_and_arguments() {
        let (cfg, _) = run("x = executable('exe', 'source.c', cpp_args : ['-Dfoo'])");
        let Object::Executable(exe) = first_obj(&cfg) else {
            panic!("expected executable, got {:?}", first_obj(&cfg));
        };
        assert_eq!(exe.name, "exe");
        assert_eq!(exe.sources.len(), 1);
        assert!(matches!(&exe.sources[0], Source::File(f) if f.get_name() == "source.c"));
        let args = &exe.arguments[&Language::Cpp];
        assert_eq!(args.len(), 1);
        assert_eq!(args[0].value(), "foo");
        assert_eq!(args[0].typ(), crate::arguments::ArgType::Define);
    }

    #[test]
    fn static_library_output_is_an_archive() {
        let (cfg, _) = run("static_library('util', 'util.cpp')");
        let Object::StaticLibrary(lib) = first_obj(&cfg) else {
            panic!("expected static library");
        };
        assert_eq!(lib.output(), "libutil.a");
    }

    #[test]
    fn custom_target_substitutes_inputs_and_outputs() {
        let (cfg, _) = run(concat!(
            "custom_target('gen', input : 'in.txt', output : 'out.c', ",
            "command : [find_program_result, '@INPUT@', '@OUTPUT@'])"
        ));
        // with an unresolved command entry the call must wait
        assert!(matches!(first_obj(&cfg), Object::FunctionCall(_)));
    }

    #[test]
    fn declare_dependency_absorbs_nested_dependencies() {
        let (cfg, _) = run("declare_dependency(compile_args : ['-DX'], version : '1.0')");
        let Object::Dependency(dep) = first_obj(&cfg) else {
            panic!("expected dependency");
        };
        assert!(dep.found);
        assert_eq!(dep.version, "1.0");
        assert_eq!(dep.arguments.len(), 1);
    }

    #[test]
    fn disabler_lowers_to_the_absorbing_value() {
        let (cfg, _) = run("d = disabler()");
        assert!(matches!(first_obj(&cfg), Object::Disabler(_)));
    }

    #[test]
    fn disabler_rejects_arguments() {
        let (cfg, _) = run("disabler('why')");
        assert!(matches!(
            first_obj(&cfg),
            Object::Message(m) if m.level == MessageLevel::Error
        ));
    }

    #[test]
    fn unknown_function_is_an_error_message() {
        let (cfg, _) = run("frobnicate('x')");
        assert!(matches!(
            first_obj(&cfg),
            Object::Message(m) if m.level == MessageLevel::Error
        ));
    }

    #[test]
    fn test_records_resolve_their_executable() {
        let (cfg, _) = run("t = executable('exe', 'main.cpp')\ntest('runs', t)");
        // the identifier argument is not reduced, so test() waits
        let insts = &cfg.node(cfg.entry()).instructions;
        assert!(matches!(&insts[1].obj, Object::FunctionCall(_)));
    }

    #[test]
    fn project_fills_the_state_and_removes_itself() {
        let mut pstate = test_state();
        let ast = parse("project('demo', 'cpp', version : '1.2')\nx = 1").unwrap();
        let mut cfg = lower_ast(&ast, Path::new("")).unwrap();
        lower_project(&mut cfg, &mut pstate).unwrap();

        assert_eq!(pstate.name, "demo");
        assert_eq!(pstate.project_version, "1.2");
        // the pre-registered toolchain was reused, not re-detected
        assert_eq!(pstate.toolchains.len(), 1);
        // only `x = 1` remains
        assert_eq!(cfg.node(cfg.entry()).instructions.len(), 1);
    }

    #[test]
    fn missing_project_is_fatal() {
        let mut pstate = test_state();
        let ast = parse("x = 1").unwrap();
        let mut cfg = lower_ast(&ast, Path::new("")).unwrap();
        assert_eq!(
            lower_project(&mut cfg, &mut pstate).unwrap_err(),
            LowerError::MissingProject
        );
    }

    #[test]
    fn late_project_is_an_error_message() {
        let (cfg, _) = run("project('late')");
        assert!(matches!(
            first_obj(&cfg),
            Object::Message(m) if m.level == MessageLevel::Error
        ));
    }
}

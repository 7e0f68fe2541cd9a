//! End-to-end lowering tests: source text in, flat instruction stream out.

use std::path::Path;
use std::sync::Arc;

use boson_mir::machines::PerMachine;
use boson_mir::object::{MessageLevel, Source};
use boson_mir::toolchains::archiver::GnuAr;
use boson_mir::toolchains::compiler::GnuLikeCpp;
use boson_mir::toolchains::linker::GnuBfd;
use boson_mir::toolchains::{Language, Toolchain};
use boson_mir::{
    collect_errors, flat_instructions, lower, lower_ast, lower_pipeline, Cfg, Instruction,
    Object, Persistant,
};

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

/// Run the pass pipeline over a program fragment (no project() call).
fn pipeline(source: &str) -> (Cfg, Persistant, Vec<Instruction>) {
    let mut pstate = test_state();
    let ast = boson_parser::parse(source).expect("parse failed");
    let mut cfg = lower_ast(&ast, Path::new("")).expect("ast lowering failed");
    lower_pipeline(&mut cfg, &mut pstate);
    let stream = flat_instructions(&cfg);
    (cfg, pstate, stream)
}

fn single(source: &str) -> Instruction {
    let (_, _, stream) = pipeline(source);
    assert_eq!(
        stream.len(),
        1,
        "expected a single instruction, got {:?}",
        stream
    );
    stream.into_iter().next().unwrap()
}

#[test]
fn project_fills_the_state_and_leaves_nothing() {
    let mut pstate = test_state();
    let ast = boson_parser::parse("project('foo')").unwrap();
    let mut cfg = lower_ast(&ast, Path::new("")).unwrap();
    lower(&mut cfg, &mut pstate).unwrap();

    assert_eq!(pstate.name, "foo");
    assert!(flat_instructions(&cfg).is_empty());
}

#[test]
fn files_lowers_to_an_array_of_files() {
    let inst = single("x = files('foo.c')");
    let Object::Array(elements) = &inst.obj else {
        panic!("expected array, got {:?}", inst.obj);
    };
    assert_eq!(elements.len(), 1);
    let Object::File(file) = &elements[0].obj else {
        panic!("expected file");
    };
    assert_eq!(file.get_name(), "foo.c");
    assert_eq!(inst.var.name, "x");
}

#[test]
fn constant_branch_reduces_to_one_block() {
    let (cfg, _, stream) = pipeline("if true\n  x = 9\nelse\n  x = 10\nendif");

    // one live block left
    assert_eq!(cfg.reachable().len(), 1);
    assert!(cfg.edges_consistent());

    // the taken branch is kept, the dead one is gone, and the phi has been
    // fixed up into an alias of the surviving version
    assert_eq!(stream.len(), 2, "stream: {:?}", stream);
    assert_eq!(stream[0].obj, Object::Number(9));
    assert_eq!(stream[0].var.name, "x");
    let Object::Identifier(alias) = &stream[1].obj else {
        panic!("expected an alias, got {:?}", stream[1].obj);
    };
    assert_eq!(alias.name, "x");
    assert_eq!(alias.version, stream[0].var.gvn);
    assert_eq!(stream[1].var.name, "x");
    assert_ne!(stream[1].var.gvn, stream[0].var.gvn);
}

#[test]
fn false_branch_keeps_the_else_side() {
    let (_, _, stream) = pipeline("if false\n  x = 9\nelse\n  x = 10\nendif");
    assert_eq!(stream[0].obj, Object::Number(10));
}

#[test]
fn message_lowers_to_a_message() {
    let inst = single("message('foo')");
    let Object::Message(m) = &inst.obj else {
        panic!("expected message");
    };
    assert_eq!(m.level, MessageLevel::Message);
    assert_eq!(m.message, "foo");
}

#[test]
fn warning_joins_arguments() {
    let inst = single("warning('foo', 'bar')");
    let Object::Message(m) = &inst.obj else {
        panic!("expected message");
    };
    assert_eq!(m.level, MessageLevel::Warn);
    assert_eq!(m.message, "foo bar");
}

#[test]
fn failed_assert_truncates_the_block() {
    let (_, _, stream) = pipeline("assert(false)\nx = files('foo.c')\nmessage('after')");
    assert_eq!(stream.len(), 1, "stream: {:?}", stream);
    let Object::Message(m) = &stream[0].obj else {
        panic!("expected message");
    };
    assert_eq!(m.level, MessageLevel::Error);
    assert_eq!(m.message, "Assertion failed: ");
}

#[test]
fn version_compare_lowers_to_a_boolean() {
    let inst = single("'3.6'.version_compare('< 3.7')");
    assert_eq!(inst.obj, Object::Boolean(true));
}

#[test]
fn executable_resolves_sources_and_arguments() {
    let inst = single("x = executable('exe', 'source.c', cpp_args : ['-Dfoo'])");
    let Object::Executable(exe) = &inst.obj else {
        panic!("expected executable, got {:?}", inst.obj);
    };
    assert_eq!(exe.name, "exe");
    assert_eq!(exe.sources.len(), 1);
    assert!(matches!(&exe.sources[0], Source::File(f) if f.get_name() == "source.c"));
    let args = &exe.arguments[&Language::Cpp];
    assert_eq!(args.len(), 1);
    assert_eq!(args[0].typ(), boson_mir::arguments::ArgType::Define);
    assert_eq!(args[0].value(), "foo");
}

#[test]
fn not_false_is_true() {
    assert_eq!(single("not false").obj, Object::Boolean(true));
}

#[test]
fn literal_comparisons() {
    assert_eq!(single("1 == 1").obj, Object::Boolean(true));
    assert_eq!(single("1 != 5").obj, Object::Boolean(true));
    assert_eq!(single("'foo' == 'foo'").obj, Object::Boolean(true));
    assert_eq!(single("1 != 1").obj, Object::Boolean(false));
    assert_eq!(single("1 == '1'").obj, Object::Boolean(false));
}

#[test]
fn variables_flow_through_branches() {
    let source = "\
x = 'main.cpp'
if true
  sources = files(x)
else
  sources = files('other.cpp')
endif
exe = executable('demo', 'demo.cpp')";
    let (cfg, _, stream) = pipeline(source);
    assert!(cfg.edges_consistent());
    assert!(stream
        .iter()
        .any(|i| matches!(&i.obj, Object::Executable(e) if e.name == "demo")));
    // the taken branch produced files('main.cpp')
    let files = stream
        .iter()
        .find(|i| i.var.name == "sources")
        .expect("sources array");
    let Object::Array(elements) = &files.obj else {
        panic!("expected array");
    };
    assert!(matches!(&elements[0].obj, Object::File(f) if f.get_name() == "main.cpp"));
}

#[test]
fn nested_branches_fully_collapse() {
    let source = "\
if true
  if false
    x = 1
  else
    x = 2
  endif
else
  x = 3
endif
message('tail')";
    let (cfg, _, stream) = pipeline(source);
    assert_eq!(cfg.reachable().len(), 1);
    assert_eq!(
        stream
            .iter()
            .find(|i| matches!(i.obj, Object::Number(_)))
            .map(|i| i.obj.clone()),
        Some(Object::Number(2))
    );
}

#[test]
fn errors_keep_downstream_targets_out_of_the_stream() {
    let (_, _, stream) = pipeline("error('no')\nexecutable('demo', 'demo.cpp')");
    assert!(!stream.iter().any(|i| matches!(i.obj, Object::Executable(_))));
    assert_eq!(collect_errors(&stream).len(), 1);
}

#[test]
fn every_numbered_use_has_a_definition() {
    let source = "\
x = 1
if x == 1
  y = x + 1
else
  y = x + 2
endif
z = y";
    let (cfg, _, stream) = pipeline(source);
    assert!(cfg.edges_consistent());

    let mut defined = std::collections::BTreeSet::new();
    for inst in &stream {
        if inst.var.is_set() {
            defined.insert((inst.var.name.clone(), inst.var.gvn));
        }
    }
    for inst in &stream {
        if let Object::Identifier(id) = &inst.obj {
            if id.version != 0 {
                assert!(
                    defined.contains(&(id.name.clone(), id.version)),
                    "use of {}.{} has no definition",
                    id.name,
                    id.version
                );
            }
        }
    }
}

#[test]
fn compiler_id_is_resolved_through_the_registry() {
    let inst = single("meson.get_compiler('cpp').get_id()");
    assert_eq!(inst.obj, Object::String("gcc".to_owned()));
}

#[test]
fn machine_methods_feed_branch_pruning() {
    let source = "\
if build_machine.system() == 'linux'
  x = 'yes'
else
  x = 'no'
endif";
    let (cfg, _, stream) = pipeline(source);
    assert_eq!(cfg.reachable().len(), 1);
    assert_eq!(stream[0].obj, Object::String("yes".to_owned()));
}

#[test]
fn subscript_and_arithmetic_fold_together() {
    let inst = single("x = [10, 20, 30][1] + 5");
    assert_eq!(inst.obj, Object::Number(25));
    assert_eq!(inst.var.name, "x");
}

#[test]
fn string_methods_chain() {
    let inst = single("x = 'a b'.split()[1].to_upper()");
    assert_eq!(inst.obj, Object::String("B".to_owned()));
}

#[test]
fn declare_dependency_feeds_executable_arguments() {
    let source = "\
dep = declare_dependency(compile_args : ['-DWITH_DEP'])
exe = executable('demo', 'demo.cpp', dependencies : [dep])";
    let (_, _, stream) = pipeline(source);
    let exe = stream
        .iter()
        .find_map(|i| match &i.obj {
            Object::Executable(e) => Some(e.clone()),
            _ => None,
        })
        .expect("executable");
    let args = &exe.arguments[&Language::Cpp];
    assert!(args.iter().any(|a| a.value() == "WITH_DEP"));
}

#[test]
fn dependency_methods_resolve_on_declared_dependencies() {
    let inst = single("declare_dependency(version : '2.0').version()");
    assert_eq!(inst.obj, Object::String("2.0".to_owned()));
}

#[test]
fn link_with_collects_static_libraries() {
    let source = "\
lib = static_library('util', 'util.cpp')
exe = executable('demo', 'demo.cpp', link_with : [lib])";
    let (_, _, stream) = pipeline(source);
    let exe = stream
        .iter()
        .find_map(|i| match &i.obj {
            Object::Executable(e) => Some(e.clone()),
            _ => None,
        })
        .expect("executable");
    assert_eq!(exe.link_static.len(), 1);
    assert_eq!(exe.link_static[0].library.output(), "libutil.a");
}

#[test]
fn add_project_arguments_are_combined() {
    let source = "\
add_project_arguments('-DONE', language : 'cpp')
add_project_arguments('-DTWO', language : 'cpp')";
    let (_, _, stream) = pipeline(source);
    let adds: Vec<_> = stream
        .iter()
        .filter_map(|i| match &i.obj {
            Object::AddArguments(a) => Some(a.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(adds.len(), 1);
    assert_eq!(adds[0].arguments[&Language::Cpp].len(), 2);
    assert!(!adds[0].is_global);
}

#[test]
fn ternary_folds_through_the_pipeline() {
    let inst = single("x = true ? 'a' : 'b'");
    assert_eq!(inst.obj, Object::String("a".to_owned()));
}

#[test]
fn division_by_zero_surfaces_as_an_error() {
    let (_, _, stream) = pipeline("x = 1 / 0\nmessage('after')");
    let errors = collect_errors(&stream);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("division by zero"));
    // dead code removed everything after the error
    assert_eq!(stream.len(), 1);
}

#[test]
fn unknown_function_surfaces_as_an_error() {
    let (_, _, stream) = pipeline("frobnicate('x')");
    let errors = collect_errors(&stream);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("frobnicate"));
}

#[test]
fn a_disabler_swallows_the_targets_built_on_it() {
    let source = "\
d = disabler()
exe = executable('demo', 'demo.cpp', dependencies : [d])";
    let (_, _, stream) = pipeline(source);
    assert!(!stream.iter().any(|i| matches!(i.obj, Object::Executable(_))));
    // the call chain became a disabler instead of an error
    assert!(collect_errors(&stream).is_empty());
    let exe = stream
        .iter()
        .find(|i| i.var.name == "exe")
        .expect("exe definition");
    assert!(matches!(exe.obj, Object::Disabler(_)));
}

#[test]
fn found_on_a_disabler_takes_the_else_branch() {
    let source = "\
d = disabler()
if d.found()
  x = 1
else
  x = 2
endif";
    let (cfg, _, stream) = pipeline(source);
    assert_eq!(cfg.reachable().len(), 1);
    assert_eq!(
        stream
            .iter()
            .find(|i| matches!(i.obj, Object::Number(_)))
            .map(|i| i.obj.clone()),
        Some(Object::Number(2))
    );
}

#[test]
fn find_program_found_method_lowers_to_true() {
    // sh is on PATH in any environment these tests run in
    let inst = single("find_program('sh').found()");
    assert_eq!(inst.obj, Object::Boolean(true));
}

#[test]
fn custom_target_resolves_its_program_and_substitutions() {
    let source = "custom_target('gen', input : 'in.txt', output : 'out.c', \
                  command : ['sh', '@INPUT@', '@OUTPUT@'])";
    let (_, _, stream) = pipeline(source);
    let ct = stream
        .iter()
        .find_map(|i| match &i.obj {
            Object::CustomTarget(c) => Some(c.clone()),
            _ => None,
        })
        .expect("custom target in stream");
    // command[0] went through find_program and is now an absolute path
    assert!(ct.command[0].ends_with("sh"), "command: {:?}", ct.command);
    assert!(ct.command[0].starts_with('/'));
    // the static input resolves relative to the build dir, the generated
    // output relative to nothing
    assert_eq!(ct.command[1], "../in.txt");
    assert_eq!(ct.command[2], "out.c");
}

#[test]
fn pipeline_is_idempotent_at_fixpoint() {
    let source = "if true\n  x = 1 + 2\nendif\ny = 'a' + 'b'";
    let (mut cfg, mut pstate, stream) = pipeline(source);
    lower_pipeline(&mut cfg, &mut pstate);
    assert_eq!(flat_instructions(&cfg), stream);
}

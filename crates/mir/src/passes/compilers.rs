//! Compiler insertion and compiler method lowering.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::cfg::{Cfg, NodeId};
use crate::machines::{Machine, PerMachine};
use crate::object::{Compiler, Instruction, Message, Object};
use crate::toolchains::{Language, Toolchain};

use super::extractors::all_args_reduced;
use super::walkers::function_walker;
use super::with_instructions;

type ToolchainMap = IndexMap<Language, PerMachine<Arc<Toolchain>>>;

fn holder_is_meson(holder: Option<&Instruction>) -> bool {
    matches!(
        holder.map(|h| &h.obj),
        Some(Object::Identifier(id)) if id.name == "meson"
    )
}

/// Replace `meson.get_compiler(lang)` with a compiler object from the
/// registry.
pub fn insert_compilers(cfg: &mut Cfg, node: NodeId, toolchains: &ToolchainMap) -> bool {
    with_instructions(cfg, node, |instructions| {
        function_walker(instructions, &mut |inst| {
            let Object::FunctionCall(f) = &inst.obj else {
                return None;
            };
            if !(holder_is_meson(f.holder.as_deref()) && f.name == "get_compiler") {
                return None;
            }

            // Wait until the language argument has been reduced to a string
            let Some(Instruction {
                obj: Object::String(lang),
                ..
            }) = f.pos_args.first()
            else {
                return None;
            };

            let language = match Language::from_string(lang) {
                Ok(l) => l,
                Err(e) => return Some(Instruction::new(Object::Message(Message::error(e.to_string())))),
            };

            let machine = match f.kw_args.get("native").map(|n| &n.obj) {
                Some(Object::Boolean(true)) => Machine::Build,
                Some(Object::Boolean(false)) => Machine::Host,
                // Not lowered yet, try again later
                Some(_) => return None,
                None => Machine::Host,
            };

            match toolchains.get(&language) {
                Some(per_machine) => Some(Instruction::new(Object::Compiler(Compiler {
                    toolchain: Arc::clone(per_machine.get(machine)),
                }))),
                None => Some(Instruction::new(Object::Message(Message::error(format!(
                    "no {} compiler for this project",
                    language.display()
                ))))),
            }
        })
    })
}

/// Lower methods on compiler objects.
pub fn lower_compiler_methods(cfg: &mut Cfg, node: NodeId) -> bool {
    with_instructions(cfg, node, |instructions| {
        function_walker(instructions, &mut |inst| {
            let Object::FunctionCall(f) = &inst.obj else {
                return None;
            };
            let Some(Instruction {
                obj: Object::Compiler(compiler),
                ..
            }) = f.holder.as_deref()
            else {
                return None;
            };
            if !all_args_reduced(&f.pos_args, &f.kw_args) {
                return None;
            }

            let replacement = match f.name.as_str() {
                "get_id" => {
                    if f.pos_args.is_empty() && f.kw_args.is_empty() {
                        Object::String(compiler.toolchain.compiler.id().to_owned())
                    } else {
                        Object::Message(Message::error(
                            "compiler.get_id(): takes no arguments",
                        ))
                    }
                }
                "version" => Object::String(compiler.toolchain.compiler.version().to_owned()),
                other => Object::Message(Message::error(format!(
                    "compiler has no method {}",
                    other
                ))),
            };
            Some(Instruction::new(replacement))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_to_mir::lower_ast;
    use crate::toolchains::archiver::GnuAr;
    use crate::toolchains::compiler::GnuLikeCpp;
    use crate::toolchains::linker::GnuBfd;
    use boson_parser::parse;
    use std::path::Path;

    pub(crate) fn test_toolchains() -> ToolchainMap {
        let toolchain = Toolchain {
            compiler: Box::new(GnuLikeCpp::gnu(
                "/usr/bin/g++".into(),
                "g++ (GCC) 13.2.0".into(),
            )),
            linker: Box::new(GnuBfd::new("/usr/bin/g++".into())),
            archiver: Box::new(GnuAr::new("/usr/bin/ar".into())),
        };
        let mut map = IndexMap::new();
        map.insert(Language::Cpp, PerMachine::new(Arc::new(toolchain)));
        map
    }

    fn lower(source: &str) -> Cfg {
        let ast = parse(source).unwrap();
        lower_ast(&ast, Path::new("")).unwrap()
    }

    #[test]
    fn get_compiler_inserts_a_compiler_object() {
        let mut cfg = lower("cpp = meson.get_compiler('cpp')");
        let entry = cfg.entry();
        assert!(insert_compilers(&mut cfg, entry, &test_toolchains()));
        let inst = &cfg.node(entry).instructions[0];
        assert!(matches!(inst.obj, Object::Compiler(_)));
        assert_eq!(inst.var.name, "cpp");
    }

    #[test]
    fn get_id_lowers_to_string() {
        let mut cfg = lower("meson.get_compiler('cpp').get_id()");
        let entry = cfg.entry();
        insert_compilers(&mut cfg, entry, &test_toolchains());
        assert!(lower_compiler_methods(&mut cfg, entry));
        let inst = &cfg.node(entry).instructions[0];
        assert_eq!(inst.obj, Object::String("gcc".to_owned()));
    }

    #[test]
    fn missing_language_is_an_error_message() {
        let mut cfg = lower("meson.get_compiler('rust')");
        let entry = cfg.entry();
        assert!(insert_compilers(&mut cfg, entry, &test_toolchains()));
        assert!(matches!(
            &cfg.node(entry).instructions[0].obj,
            Object::Message(m) if m.level == crate::object::MessageLevel::Error
        ));
    }

    #[test]
    fn unreduced_language_waits() {
        let mut cfg = lower("meson.get_compiler(lang)");
        let entry = cfg.entry();
        assert!(!insert_compilers(&mut cfg, entry, &test_toolchains()));
    }
}

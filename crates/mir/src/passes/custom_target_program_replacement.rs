//! Rewrite the program of a `custom_target()` command.
//!
//! A string in the command's program slot (`command[0]`) is replaced with a
//! `find_program()` call, so the threaded lowering resolves it like any
//! other program lookup.

use crate::cfg::{Cfg, NodeId};
use crate::object::{FunctionCall, Instruction, Object};

use super::with_instructions;

fn replacement_impl(inst: &mut Instruction) -> bool {
    let Object::FunctionCall(fc) = &mut inst.obj else {
        return false;
    };
    if fc.name != "custom_target" {
        return false;
    }
    let source_dir = fc.source_dir.clone();

    let Some(command) = fc.kw_args.get_mut("command") else {
        return false;
    };

    match &mut command.obj {
        Object::Array(commands) => {
            let Some(first) = commands.first_mut() else {
                return false;
            };
            if let Object::String(s) = &first.obj {
                let fp = FunctionCall::new(
                    "find_program",
                    vec![Instruction::new(Object::String(s.clone()))],
                    source_dir,
                );
                *first = Instruction::new(Object::FunctionCall(fp));
                true
            } else {
                false
            }
        }
        Object::String(s) => {
            let fp = FunctionCall::new(
                "find_program",
                vec![Instruction::new(Object::String(s.clone()))],
                source_dir,
            );
            command.obj = Object::Array(vec![Instruction::new(Object::FunctionCall(fp))]);
            true
        }
        _ => false,
    }
}

pub fn custom_target_program_replacement(cfg: &mut Cfg, node: NodeId) -> bool {
    with_instructions(cfg, node, |instructions| {
        let mut progress = false;
        for inst in instructions.iter_mut() {
            progress |= replacement_impl(inst);
        }
        progress
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_to_mir::lower_ast;
    use boson_parser::parse;
    use std::path::Path;

    fn lower(source: &str) -> Cfg {
        let ast = parse(source).unwrap();
        lower_ast(&ast, Path::new("")).unwrap()
    }

    fn command_of(cfg: &Cfg) -> Vec<Instruction> {
        let Object::FunctionCall(f) = &cfg.node(cfg.entry()).instructions[0].obj else {
            panic!("expected call");
        };
        match &f.kw_args["command"].obj {
            Object::Array(elements) => elements.clone(),
            other => panic!("expected array command, got {:?}", other),
        }
    }

    #[test]
    fn string_program_becomes_find_program() {
        let mut cfg =
            lower("custom_target('gen', output : 'out.c', command : ['gen.py', '@OUTPUT@'])");
        let entry = cfg.entry();
        assert!(custom_target_program_replacement(&mut cfg, entry));
        let command = command_of(&cfg);
        let Object::FunctionCall(fp) = &command[0].obj else {
            panic!("first command entry should now be a call");
        };
        assert_eq!(fp.name, "find_program");
        // later entries untouched
        assert!(matches!(&command[1].obj, Object::String(s) if s == "@OUTPUT@"));
    }

    #[test]
    fn bare_string_command_is_wrapped() {
        let mut cfg = lower("custom_target('gen', output : 'out.c', command : 'gen.py')");
        let entry = cfg.entry();
        assert!(custom_target_program_replacement(&mut cfg, entry));
        assert_eq!(command_of(&cfg).len(), 1);
    }

    #[test]
    fn runs_once() {
        let mut cfg = lower("custom_target('gen', output : 'out.c', command : ['gen.py'])");
        let entry = cfg.entry();
        assert!(custom_target_program_replacement(&mut cfg, entry));
        assert!(!custom_target_program_replacement(&mut cfg, entry));
    }
}

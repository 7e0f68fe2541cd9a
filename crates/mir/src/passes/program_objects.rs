//! Lower program object methods.

use crate::cfg::{Cfg, NodeId};
use crate::error::{LowerError, LowerResult};
use crate::object::{FunctionCall, Instruction, Message, Object, Program};

use super::extractors::all_args_reduced;
use super::walkers::function_walker;
use super::with_instructions;

fn no_arguments(f: &FunctionCall, what: &str) -> LowerResult<()> {
    if !f.pos_args.is_empty() {
        return Err(LowerError::InvalidArguments(format!(
            "{} does not take any positional arguments",
            what
        )));
    }
    if !f.kw_args.is_empty() {
        return Err(LowerError::InvalidArguments(format!(
            "{} does not take any keyword arguments",
            what
        )));
    }
    Ok(())
}

fn lower_method(program: &Program, f: &FunctionCall) -> LowerResult<Object> {
    match f.name.as_str() {
        "found" => {
            no_arguments(f, "program.found()")?;
            Ok(Object::Boolean(program.found()))
        }
        "path" | "full_path" => {
            no_arguments(f, "program.path()")?;
            Ok(Object::String(program.path.to_string_lossy().into_owned()))
        }
        other => Err(LowerError::UnknownMethod {
            holder: "program".to_owned(),
            method: other.to_owned(),
        }),
    }
}

pub fn lower_program_objects(cfg: &mut Cfg, node: NodeId) -> bool {
    with_instructions(cfg, node, |instructions| {
        function_walker(instructions, &mut |inst| {
            let Object::FunctionCall(f) = &inst.obj else {
                return None;
            };
            let Some(Instruction {
                obj: Object::Program(program),
                ..
            }) = f.holder.as_deref()
            else {
                return None;
            };
            if !all_args_reduced(&f.pos_args, &f.kw_args) {
                return None;
            }

            Some(Instruction::new(match lower_method(program, f) {
                Ok(obj) => obj,
                Err(e) => Object::Message(Message::error(e.to_string())),
            }))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machines::Machine;
    use crate::object::Variable;

    fn method_call(program: Program, name: &str) -> Cfg {
        let mut cfg = Cfg::new();
        let mut call = FunctionCall::new(name, vec![], std::path::PathBuf::new());
        call.holder = Some(Box::new(Instruction::new(Object::Program(program))));
        cfg.node_mut(0).instructions.push(Instruction::with_var(
            Object::FunctionCall(call),
            Variable::new("r"),
        ));
        cfg
    }

    fn program(path: &str) -> Program {
        Program {
            name: "prog".to_owned(),
            for_machine: Machine::Build,
            path: path.into(),
        }
    }

    #[test]
    fn found_lowers_to_boolean() {
        let mut cfg = method_call(program("/usr/bin/prog"), "found");
        assert!(lower_program_objects(&mut cfg, 0));
        assert_eq!(cfg.node(0).instructions[0].obj, Object::Boolean(true));

        let mut cfg = method_call(program(""), "found");
        assert!(lower_program_objects(&mut cfg, 0));
        assert_eq!(cfg.node(0).instructions[0].obj, Object::Boolean(false));
    }

    #[test]
    fn result_keeps_the_defining_variable() {
        let mut cfg = method_call(program(""), "found");
        lower_program_objects(&mut cfg, 0);
        assert_eq!(cfg.node(0).instructions[0].var.name, "r");
    }

    #[test]
    fn path_lowers_to_string() {
        let mut cfg = method_call(program("/usr/bin/prog"), "path");
        assert!(lower_program_objects(&mut cfg, 0));
        assert_eq!(
            cfg.node(0).instructions[0].obj,
            Object::String("/usr/bin/prog".to_owned())
        );
    }
}

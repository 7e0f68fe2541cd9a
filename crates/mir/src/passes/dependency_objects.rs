//! Lower dependency object methods.

use crate::cfg::{Cfg, NodeId};
use crate::error::{LowerError, LowerResult};
use crate::object::{Dependency, FunctionCall, Instruction, Message, Object};

use super::extractors::all_args_reduced;
use super::walkers::function_walker;
use super::with_instructions;

fn lower_method(dep: &Dependency, f: &FunctionCall) -> LowerResult<Object> {
    if !f.pos_args.is_empty() || !f.kw_args.is_empty() {
        return Err(LowerError::InvalidArguments(format!(
            "dependency.{}() does not take any arguments",
            f.name
        )));
    }
    match f.name.as_str() {
        "found" => Ok(Object::Boolean(dep.found)),
        "version" => Ok(Object::String(dep.version.clone())),
        "name" => Ok(Object::String(dep.name.clone())),
        other => Err(LowerError::UnknownMethod {
            holder: "dependency".to_owned(),
            method: other.to_owned(),
        }),
    }
}

pub fn lower_dependency_objects(cfg: &mut Cfg, node: NodeId) -> bool {
    with_instructions(cfg, node, |instructions| {
        function_walker(instructions, &mut |inst| {
            let Object::FunctionCall(f) = &inst.obj else {
                return None;
            };
            let Some(Instruction {
                obj: Object::Dependency(dep),
                ..
            }) = f.holder.as_deref()
            else {
                return None;
            };
            if !all_args_reduced(&f.pos_args, &f.kw_args) {
                return None;
            }

            Some(Instruction::new(match lower_method(dep, f) {
                Ok(obj) => obj,
                Err(e) => Object::Message(Message::error(e.to_string())),
            }))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Variable;

    fn dep(found: bool) -> Dependency {
        Dependency {
            name: "zlib".to_owned(),
            found,
            version: "1.3".to_owned(),
            arguments: vec![],
        }
    }

    fn method_call(dep: Dependency, name: &str) -> Cfg {
        let mut cfg = Cfg::new();
        let mut call = FunctionCall::new(name, vec![], std::path::PathBuf::new());
        call.holder = Some(Box::new(Instruction::new(Object::Dependency(dep))));
        cfg.node_mut(0).instructions.push(Instruction::with_var(
            Object::FunctionCall(call),
            Variable::new("r"),
        ));
        cfg
    }

    #[test]
    fn accessors_lower_to_literals() {
        let mut cfg = method_call(dep(true), "found");
        assert!(lower_dependency_objects(&mut cfg, 0));
        assert_eq!(cfg.node(0).instructions[0].obj, Object::Boolean(true));

        let mut cfg = method_call(dep(true), "version");
        assert!(lower_dependency_objects(&mut cfg, 0));
        assert_eq!(
            cfg.node(0).instructions[0].obj,
            Object::String("1.3".to_owned())
        );

        let mut cfg = method_call(dep(false), "name");
        assert!(lower_dependency_objects(&mut cfg, 0));
        assert_eq!(
            cfg.node(0).instructions[0].obj,
            Object::String("zlib".to_owned())
        );
    }

    #[test]
    fn unknown_method_is_an_error() {
        let mut cfg = method_call(dep(true), "link_args");
        assert!(lower_dependency_objects(&mut cfg, 0));
        assert!(matches!(&cfg.node(0).instructions[0].obj, Object::Message(_)));
    }
}

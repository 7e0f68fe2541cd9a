//! Flatten array arguments to functions.
//!
//! The DSL allows some interesting arrangements of arguments:
//!
//! ```text
//! project(['foo'], ['cpp'])
//! project(['foo', 'cpp'])
//! project('foo', ['cpp'])
//! project('foo', 'cpp')
//! ```
//!
//! are all identical. This pass splices array positional arguments into
//! scalars and collapses nested arrays in keyword arguments, so function
//! lowering always sees an idealized argument list. Operator calls are left
//! alone: `__in__` and friends take arrays as real values.

use crate::cfg::{Cfg, NodeId};
use crate::object::{Instruction, Object};

use super::walkers::function_walker;
use super::with_instructions;

fn flatten_into(element: Instruction, out: &mut Vec<Instruction>) {
    match element.obj {
        Object::Array(inner) => {
            for e in inner {
                flatten_into(e, out);
            }
        }
        _ => out.push(element),
    }
}

fn has_array(args: &[Instruction]) -> bool {
    args.iter().any(|a| matches!(a.obj, Object::Array(_)))
}

pub fn flatten(cfg: &mut Cfg, node: NodeId) -> bool {
    with_instructions(cfg, node, |instructions| {
        function_walker(instructions, &mut |inst| {
            let Object::FunctionCall(f) = &inst.obj else {
                return None;
            };
            // Reserved operators consume arrays as values
            if f.name.starts_with("__") {
                return None;
            }

            let needs_splice = has_array(&f.pos_args);
            let needs_kw_flatten = f
                .kw_args
                .values()
                .any(|v| matches!(&v.obj, Object::Array(inner) if has_array(inner)));
            if !needs_splice && !needs_kw_flatten {
                return None;
            }

            let mut new_call = f.clone();

            if needs_splice {
                let mut pos = Vec::with_capacity(new_call.pos_args.len());
                for arg in new_call.pos_args.drain(..) {
                    flatten_into(arg, &mut pos);
                }
                new_call.pos_args = pos;
            }

            for value in new_call.kw_args.values_mut() {
                if matches!(&value.obj, Object::Array(inner) if has_array(inner)) {
                    let taken = std::mem::replace(value, Instruction::new(Object::Empty));
                    let mut flat = Vec::new();
                    flatten_into(taken, &mut flat);
                    *value = Instruction::new(Object::Array(flat));
                }
            }

            Some(Instruction::new(Object::FunctionCall(new_call)))
        })
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

    fn first_call(cfg: &Cfg) -> crate::object::FunctionCall {
        match &cfg.node(cfg.entry()).instructions[0].obj {
            Object::FunctionCall(f) => f.clone(),
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn positional_arrays_are_spliced() {
        let mut cfg = lower("f('a', ['b', ['c', 'd']])");
        let entry = cfg.entry();
        assert!(flatten(&mut cfg, entry));
        let f = first_call(&cfg);
        assert_eq!(f.pos_args.len(), 4);
        assert!(f
            .pos_args
            .iter()
            .all(|a| matches!(a.obj, Object::String(_))));
    }

    #[test]
    fn keyword_arrays_stay_arrays_but_flatten() {
        let mut cfg = lower("f(args : ['a', ['b']])");
        let entry = cfg.entry();
        assert!(flatten(&mut cfg, entry));
        let f = first_call(&cfg);
        let Object::Array(elements) = &f.kw_args["args"].obj else {
            panic!("kw arg should stay an array");
        };
        assert_eq!(elements.len(), 2);
    }

    #[test]
    fn operators_are_not_flattened() {
        let mut cfg = lower("'a' in ['a', 'b']");
        let entry = cfg.entry();
        assert!(!flatten(&mut cfg, entry));
    }

    #[test]
    fn idempotent_once_flat() {
        let mut cfg = lower("f(['a'])");
        let entry = cfg.entry();
        assert!(flatten(&mut cfg, entry));
        assert!(!flatten(&mut cfg, entry));
    }
}

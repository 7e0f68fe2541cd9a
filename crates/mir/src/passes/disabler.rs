//! Disabler propagation.
//!
//! A disabler absorbs everything around it: an instruction that holds one
//! anywhere inside (a positional or keyword argument, a method holder, an
//! array or dictionary member) is rewritten into a disabler itself, so a
//! call chain rooted in a missing dependency short-circuits instead of
//! erroring. The single exception is `found()`, which lowers to false and
//! is how build files test whether they were disabled.

use crate::cfg::{Cfg, NodeId};
use crate::object::{Disabler, Instruction, Object};

use super::walkers::function_walker;
use super::with_instructions;

fn contains_disabler(inst: &Instruction) -> bool {
    match &inst.obj {
        Object::Disabler(_) => true,
        Object::Array(elements) => elements.iter().any(contains_disabler),
        Object::Dict(values) => values.values().any(contains_disabler),
        Object::FunctionCall(f) => {
            f.holder.as_deref().is_some_and(contains_disabler)
                || f.pos_args.iter().any(contains_disabler)
                || f.kw_args.values().any(contains_disabler)
        }
        _ => false,
    }
}

pub fn disable(cfg: &mut Cfg, node: NodeId) -> bool {
    with_instructions(cfg, node, |instructions| {
        function_walker(instructions, &mut |inst| {
            match &inst.obj {
                // found() on a disabler answers the only question a
                // disabled object can: no
                Object::FunctionCall(f)
                    if f.name == "found"
                        && matches!(
                            f.holder.as_deref(),
                            Some(Instruction {
                                obj: Object::Disabler(_),
                                ..
                            })
                        )
                        && f.pos_args.is_empty()
                        && f.kw_args.is_empty() =>
                {
                    Some(Instruction::new(Object::Boolean(false)))
                }
                // Terminators keep their shape; their predicates are
                // separate instructions and absorb on their own
                Object::Disabler(_) | Object::Jump(_) | Object::Branch(_) => None,
                _ if contains_disabler(inst) => {
                    Some(Instruction::new(Object::Disabler(Disabler)))
                }
                _ => None,
            }
        })
    })
}

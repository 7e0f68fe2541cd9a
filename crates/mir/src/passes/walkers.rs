//! Instruction walkers shared by the rewriting passes.
//!
//! A replacement callback returns `Some(new)` when the instruction it was
//! shown should be swapped out. The walker descends innermost-first, so the
//! arguments of a call are rewritten before the call itself is offered to
//! the callback, and the predicates stored inside terminators are walked
//! like any other instruction.

use crate::object::{Instruction, Object};

pub type ReplacementCallback<'a> = dyn FnMut(&Instruction) -> Option<Instruction> + 'a;

/// Apply `cb` to every instruction in the list, recursively.
pub fn function_walker(
    instructions: &mut [Instruction],
    cb: &mut ReplacementCallback<'_>,
) -> bool {
    let mut progress = false;
    for inst in instructions.iter_mut() {
        progress |= replace_in(inst, cb);
    }
    progress
}

/// Rewrite one instruction slot: children first, then the slot itself. A
/// replacement that does not set a defining variable inherits the old one,
/// so folding a call never loses the name it defined.
pub fn replace_in(inst: &mut Instruction, cb: &mut ReplacementCallback<'_>) -> bool {
    let mut progress = descend(inst, cb);
    if let Some(mut new) = cb(inst) {
        if !new.var.is_set() {
            new.var = inst.var.clone();
        }
        *inst = new;
        progress = true;
    }
    progress
}

fn descend(inst: &mut Instruction, cb: &mut ReplacementCallback<'_>) -> bool {
    let mut progress = false;
    match &mut inst.obj {
        Object::Array(elements) => {
            for e in elements {
                progress |= replace_in(e, cb);
            }
        }
        Object::Dict(values) => {
            for v in values.values_mut() {
                progress |= replace_in(v, cb);
            }
        }
        Object::FunctionCall(call) => {
            if let Some(holder) = &mut call.holder {
                progress |= replace_in(holder, cb);
            }
            for a in &mut call.pos_args {
                progress |= replace_in(a, cb);
            }
            for v in call.kw_args.values_mut() {
                progress |= replace_in(v, cb);
            }
        }
        Object::Jump(jump) => {
            if let Some(predicate) = &mut jump.predicate {
                progress |= replace_in(predicate, cb);
            }
        }
        Object::Branch(branch) => {
            for (predicate, _) in &mut branch.arms {
                progress |= replace_in(predicate, cb);
            }
        }
        _ => {}
    }
    progress
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{FunctionCall, Identifier, Jump};
    use std::path::PathBuf;

    fn rename_x_to_y(inst: &Instruction) -> Option<Instruction> {
        match &inst.obj {
            Object::Identifier(id) if id.name == "x" => {
                Some(Instruction::new(Object::Identifier(Identifier::new("y"))))
            }
            _ => None,
        }
    }

    #[test]
    fn walks_into_call_arguments() {
        let call = FunctionCall::new(
            "f",
            vec![Instruction::new(Object::Identifier(Identifier::new("x")))],
            PathBuf::new(),
        );
        let mut insts = vec![Instruction::new(Object::FunctionCall(call))];
        assert!(function_walker(&mut insts, &mut rename_x_to_y));
        let Object::FunctionCall(f) = &insts[0].obj else {
            panic!()
        };
        assert!(matches!(&f.pos_args[0].obj, Object::Identifier(id) if id.name == "y"));
    }

    #[test]
    fn walks_into_jump_predicates() {
        let jump = Jump {
            target: 1,
            predicate: Some(Box::new(Instruction::new(Object::Identifier(
                Identifier::new("x"),
            )))),
        };
        let mut insts = vec![Instruction::new(Object::Jump(jump))];
        assert!(function_walker(&mut insts, &mut rename_x_to_y));
    }

    #[test]
    fn replacement_inherits_the_defining_variable() {
        let mut insts = vec![Instruction::with_var(
            Object::Identifier(Identifier::new("x")),
            crate::object::Variable::versioned("z", 4),
        )];
        assert!(function_walker(&mut insts, &mut rename_x_to_y));
        assert_eq!(insts[0].var, crate::object::Variable::versioned("z", 4));
    }

    #[test]
    fn no_match_no_progress() {
        let mut insts = vec![Instruction::new(Object::Number(1))];
        assert!(!function_walker(&mut insts, &mut rename_x_to_y));
    }
}

//! Merge `add_project_arguments` and `add_global_arguments` nodes.
//!
//! After the program is flat, every AddArguments instruction of a scope is
//! folded into the first one of that scope so the backend sees at most one
//! per scope.

use crate::cfg::{Cfg, NodeId};
use crate::object::{ArgMap, Object};

use super::with_instructions;

fn merge(target: &mut ArgMap, source: ArgMap) {
    for (language, arguments) in source {
        target.entry(language).or_default().extend(arguments);
    }
}

pub fn combine_add_arguments(cfg: &mut Cfg, node: NodeId) -> bool {
    with_instructions(cfg, node, |instructions| {
        let mut first_global: Option<usize> = None;
        let mut first_project: Option<usize> = None;
        let mut merged: Vec<(usize, ArgMap)> = Vec::new();
        let mut remove: Vec<usize> = Vec::new();

        for (index, inst) in instructions.iter().enumerate() {
            let Object::AddArguments(args) = &inst.obj else {
                continue;
            };
            let slot = if args.is_global {
                &mut first_global
            } else {
                &mut first_project
            };
            match slot {
                None => *slot = Some(index),
                Some(target) => {
                    // TODO: project arguments from different subprojects
                    // must stay separate once subprojects exist
                    merged.push((*target, args.arguments.clone()));
                    remove.push(index);
                }
            }
        }

        if remove.is_empty() {
            return false;
        }

        for (target, arguments) in merged {
            let Object::AddArguments(into) = &mut instructions[target].obj else {
                unreachable!("merge target disappeared");
            };
            merge(&mut into.arguments, arguments);
        }
        for index in remove.into_iter().rev() {
            instructions.remove(index);
        }
        true
    })
}

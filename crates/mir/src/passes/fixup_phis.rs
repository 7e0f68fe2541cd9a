//! Replace degenerate phis with identifier aliases.
//!
//! Branch pruning can remove the predecessor that produced one side of a
//! phi. When only one side is still producible the phi is not a join any
//! more: it becomes a plain alias of the surviving version.

use crate::cfg::{Cfg, NodeId};
use crate::object::{Identifier, Instruction, Object};

pub fn fixup_phis(cfg: &mut Cfg, node: NodeId) -> bool {
    let mut progress = false;

    let preds: Vec<NodeId> = cfg.node(node).predecessors.iter().copied().collect();
    let mut instructions = std::mem::take(&mut cfg.node_mut(node).instructions);

    for index in 0..instructions.len() {
        let Object::Phi(phi) = &instructions[index].obj else {
            continue;
        };
        let phi = *phi;
        let name = instructions[index].var.name.clone();

        let mut left = false;
        let mut right = false;
        'preds: for p in &preds {
            for inst in &cfg.node(*p).instructions {
                if inst.var.name == name {
                    if inst.var.gvn == phi.left {
                        left = true;
                        break;
                    }
                    if inst.var.gvn == phi.right {
                        right = true;
                        break;
                    }
                }
            }
            if left && right {
                break 'preds;
            }
        }

        if !(left ^ right) {
            // Both sides may also be produced by this very block, upstream
            // of the phi. The later definition shadows the earlier one, so
            // the last matching version wins.
            for earlier in &instructions[..index] {
                if earlier.var.name == name {
                    left = earlier.var.gvn == phi.left;
                    right = earlier.var.gvn == phi.right;
                }
            }
        }

        if left ^ right {
            let version = if left { phi.left } else { phi.right };
            instructions[index] = Instruction::with_var(
                Object::Identifier(Identifier::versioned(&name, version)),
                instructions[index].var.clone(),
            );
            progress = true;
        }
    }

    cfg.node_mut(node).instructions = instructions;
    progress
}

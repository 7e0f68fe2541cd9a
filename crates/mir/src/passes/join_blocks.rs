//! Join contiguous blocks.
//!
//! After pruning, a node that unconditionally jumps to a block with no
//! other predecessors can absorb it: the jump goes away, the successor's
//! instructions (terminator included) move up, and the successor's edges
//! are re-parented. Runs to a local fixpoint so a whole chain collapses in
//! one visit.

use crate::cfg::{Cfg, NodeId};
use crate::object::{Instruction, Object};

fn join_once(cfg: &mut Cfg, node: NodeId) -> bool {
    let Some(Instruction {
        obj: Object::Jump(jump),
        ..
    }) = cfg.node(node).terminator()
    else {
        return false;
    };
    if jump.predicate.is_some() {
        return false;
    }
    let next = jump.target;
    if next == node || cfg.node(next).predecessors.len() > 1 {
        return false;
    }

    // Drop the jump and its edge
    cfg.node_mut(node).instructions.pop();
    cfg.unlink(node, next);

    // Move the instructions up and re-parent the successor's edges
    let moved = std::mem::take(&mut cfg.node_mut(next).instructions);
    let successors: Vec<NodeId> = cfg.node(next).successors.iter().copied().collect();
    for s in successors {
        cfg.unlink(next, s);
        cfg.link(node, s);
    }
    cfg.node_mut(node).instructions.extend(moved);
    cfg.remove_node(next);

    true
}

pub fn join_blocks(cfg: &mut Cfg, node: NodeId) -> bool {
    let mut progress = false;
    while join_once(cfg, node) {
        progress = true;
    }
    progress
}

//! Prune branches whose predicates are literal.
//!
//! Once folding has reduced a predicate to a boolean the branch can be
//! resolved: false arms disappear, a true arm cuts off everything after it,
//! a branch left with a single arm becomes a jump, an empty branch is
//! removed outright. Every edge removal updates both endpoints, and nodes
//! that become unreachable are deleted immediately so their stale edges
//! never gate the block walker.

use std::collections::BTreeSet;

use crate::cfg::{Cfg, NodeId};
use crate::object::{Branch, Instruction, Jump, Object};

fn literal_predicate(predicate: &Instruction) -> Option<bool> {
    match predicate.obj {
        Object::Boolean(b) => Some(b),
        _ => None,
    }
}

/// Delete every node that is no longer reachable from the entry, edges
/// included.
pub(crate) fn sweep_unreachable(cfg: &mut Cfg) -> bool {
    let reachable = cfg.reachable();
    let dead: Vec<NodeId> = cfg.live_nodes().filter(|n| !reachable.contains(n)).collect();
    for node in &dead {
        cfg.remove_node(*node);
    }
    !dead.is_empty()
}

fn prune_jump(cfg: &mut Cfg, node: NodeId) -> bool {
    let Some(Instruction {
        obj: Object::Jump(jump),
        ..
    }) = cfg.node(node).terminator()
    else {
        return false;
    };
    let Some(predicate) = &jump.predicate else {
        return false;
    };
    let Some(value) = literal_predicate(predicate) else {
        return false;
    };
    let target = jump.target;

    if value {
        let Some(Instruction {
            obj: Object::Jump(jump),
            ..
        }) = cfg.node_mut(node).terminator_mut()
        else {
            unreachable!()
        };
        jump.predicate = None;
    } else {
        cfg.node_mut(node).instructions.pop();
        cfg.unlink(node, target);
    }
    true
}

fn prune_branch(cfg: &mut Cfg, node: NodeId) -> bool {
    let Some(Instruction {
        obj: Object::Branch(branch),
        ..
    }) = cfg.node(node).terminator()
    else {
        return false;
    };

    let mut kept: Vec<(Instruction, NodeId)> = Vec::new();
    let mut changed = false;
    for (predicate, target) in &branch.arms {
        match literal_predicate(predicate) {
            Some(true) => {
                kept.push((predicate.clone(), *target));
                // everything after a true arm is dead
                changed |= kept.len() != branch.arms.len();
                break;
            }
            Some(false) => changed = true,
            None => kept.push((predicate.clone(), *target)),
        }
    }

    if !changed && kept.len() > 1 {
        return false;
    }

    let old_targets: BTreeSet<NodeId> = cfg.node(node).successors.clone();
    let new_targets: BTreeSet<NodeId> = kept.iter().map(|(_, t)| *t).collect();

    // Replace the terminator before touching edges so the graph is
    // consistent the moment the edges are
    let terminator = cfg.node_mut(node).instructions.pop();
    debug_assert!(matches!(
        terminator.as_ref().map(|t| &t.obj),
        Some(Object::Branch(_))
    ));

    match kept.len() {
        0 => {}
        1 => {
            let (predicate, target) = kept.into_iter().next().expect("one arm");
            let predicate = match literal_predicate(&predicate) {
                Some(true) => None,
                _ => Some(Box::new(predicate)),
            };
            cfg.node_mut(node)
                .instructions
                .push(Instruction::new(Object::Jump(Jump { target, predicate })));
        }
        _ => {
            cfg.node_mut(node)
                .instructions
                .push(Instruction::new(Object::Branch(Branch { arms: kept })));
        }
    }

    for gone in old_targets.difference(&new_targets) {
        cfg.unlink(node, *gone);
    }

    true
}

pub fn branch_pruning(cfg: &mut Cfg, node: NodeId) -> bool {
    let progress = prune_jump(cfg, node) | prune_branch(cfg, node);
    if progress {
        sweep_unreachable(cfg);
    }
    progress
}

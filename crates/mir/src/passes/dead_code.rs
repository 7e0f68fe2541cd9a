//! Delete code that can never run.
//!
//! An error message is a terminator: configuration stops there, so every
//! instruction after the first error in a block is deleted (later errors
//! may be spurious consequences of the first) and the block's successors
//! are unlinked. Whatever becomes unreachable from the entry is then swept
//! away.

use crate::cfg::{Cfg, NodeId};
use crate::object::{MessageLevel, Object};

use super::branch_pruning::sweep_unreachable;

pub fn delete_unreachable(cfg: &mut Cfg, node: NodeId) -> bool {
    let first_error = cfg.node(node).instructions.iter().position(|inst| {
        matches!(&inst.obj, Object::Message(m) if m.level == MessageLevel::Error)
    });
    let Some(index) = first_error else {
        return false;
    };

    let mut progress = false;

    if cfg.node(node).instructions.len() > index + 1 {
        cfg.node_mut(node).instructions.truncate(index + 1);
        progress = true;
    }

    let successors: Vec<NodeId> = cfg.node(node).successors.iter().copied().collect();
    for s in successors {
        cfg.unlink(node, s);
        progress = true;
    }

    if progress {
        sweep_unreachable(cfg);
    }
    progress
}

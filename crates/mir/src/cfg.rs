//! The control-flow graph.
//!
//! Nodes are arena-allocated and addressed by index; predecessor and
//! successor sets store indices, never references, so the usual CFG cycles
//! cost nothing. The terminator of a block (a [`Jump`] or [`Branch`]
//! instruction) is stored as the last instruction of the block; successor
//! sets are derived from terminators and predecessor sets by reverse
//! linking. Every edge mutation goes through [`Cfg::link`]/[`Cfg::unlink`]
//! so both sides stay consistent.

use std::collections::{BTreeSet, VecDeque};

use crate::object::{Branch, Instruction, Jump, Object};

/// Index of a node in the graph arena.
pub type NodeId = u32;

/// A basic block and its edges.
#[derive(Debug, Clone)]
pub struct CfgNode {
    pub index: NodeId,
    /// The instructions of the block, terminator (if any) last.
    pub instructions: Vec<Instruction>,
    pub predecessors: BTreeSet<NodeId>,
    pub successors: BTreeSet<NodeId>,
    /// Cleared when the node is deleted; dead nodes stay in the arena so
    /// indices remain stable.
    pub alive: bool,
}

impl CfgNode {
    fn new(index: NodeId) -> Self {
        CfgNode {
            index,
            instructions: Vec::new(),
            predecessors: BTreeSet::new(),
            successors: BTreeSet::new(),
            alive: true,
        }
    }

    /// The block's terminator, if it has one.
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last().filter(|i| i.is_terminator())
    }

    pub fn terminator_mut(&mut self) -> Option<&mut Instruction> {
        self.instructions.last_mut().filter(|i| i.is_terminator())
    }
}

#[derive(Debug, Clone)]
pub struct Cfg {
    nodes: Vec<CfgNode>,
}

impl Cfg {
    /// A graph with a single empty entry node.
    pub fn new() -> Self {
        Cfg {
            nodes: vec![CfgNode::new(0)],
        }
    }

    pub fn entry(&self) -> NodeId {
        0
    }

    pub fn add_node(&mut self) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(CfgNode::new(id));
        id
    }

    pub fn node(&self, id: NodeId) -> &CfgNode {
        &self.nodes[id as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut CfgNode {
        &mut self.nodes[id as usize]
    }

    /// All live node ids, in arena order.
    pub fn live_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().filter(|n| n.alive).map(|n| n.index)
    }

    /// Add the edge `from -> to`, updating both endpoint sets.
    pub fn link(&mut self, from: NodeId, to: NodeId) {
        self.node_mut(from).successors.insert(to);
        self.node_mut(to).predecessors.insert(from);
    }

    /// Remove the edge `from -> to`, updating both endpoint sets.
    pub fn unlink(&mut self, from: NodeId, to: NodeId) {
        self.node_mut(from).successors.remove(&to);
        self.node_mut(to).predecessors.remove(&from);
    }

    /// Append an unconditional jump to `from`, linking the edge.
    pub fn terminate_jump(&mut self, from: NodeId, to: NodeId) {
        debug_assert!(self.node(from).terminator().is_none());
        self.node_mut(from)
            .instructions
            .push(Instruction::new(Object::Jump(Jump::unconditional(to))));
        self.link(from, to);
    }

    /// Append a branch to `from`, linking every arm's edge.
    pub fn terminate_branch(&mut self, from: NodeId, arms: Vec<(Instruction, NodeId)>) {
        debug_assert!(self.node(from).terminator().is_none());
        for (_, target) in &arms {
            self.link(from, *target);
        }
        self.node_mut(from)
            .instructions
            .push(Instruction::new(Object::Branch(Branch { arms })));
    }

    /// Delete a node: unlink every edge touching it and clear it out.
    pub fn remove_node(&mut self, id: NodeId) {
        let preds: Vec<NodeId> = self.node(id).predecessors.iter().copied().collect();
        let succs: Vec<NodeId> = self.node(id).successors.iter().copied().collect();
        for p in preds {
            self.unlink(p, id);
        }
        for s in succs {
            self.unlink(id, s);
        }
        let node = self.node_mut(id);
        node.instructions.clear();
        node.alive = false;
    }

    /// Nodes reachable from the entry by following successor edges.
    pub fn reachable(&self) -> BTreeSet<NodeId> {
        let mut seen = BTreeSet::new();
        let mut todo = VecDeque::from([self.entry()]);
        while let Some(id) = todo.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            for s in &self.node(id).successors {
                todo.push_back(*s);
            }
        }
        seen
    }

    /// Verify the graph invariants: successor sets match terminator targets,
    /// and predecessor sets are the exact reverse of successor sets. Used by
    /// tests and debug assertions; a violation is a bug in a pass.
    pub fn edges_consistent(&self) -> bool {
        for node in self.nodes.iter().filter(|n| n.alive) {
            let targets: BTreeSet<NodeId> = match node.terminator().map(|t| &t.obj) {
                Some(Object::Jump(j)) => BTreeSet::from([j.target]),
                Some(Object::Branch(b)) => b.arms.iter().map(|(_, t)| *t).collect(),
                _ => BTreeSet::new(),
            };
            if targets != node.successors {
                return false;
            }
            for s in &node.successors {
                if !self.node(*s).predecessors.contains(&node.index) {
                    return false;
                }
            }
            for p in &node.predecessors {
                if !self.node(*p).successors.contains(&node.index) {
                    return false;
                }
            }
        }
        true
    }
}

impl Default for Cfg {
    fn default() -> Self {
        Cfg::new()
    }
}

/// Reverse-postorder iterator over the live graph.
///
/// A node is scheduled once every live predecessor has been visited, which
/// guarantees that value numbering sees all definitions that can reach a
/// block before the block itself.
pub struct RpoIter {
    seen: BTreeSet<NodeId>,
    todo: VecDeque<NodeId>,
    current: Option<NodeId>,
}

impl RpoIter {
    pub fn new(cfg: &Cfg, entry: NodeId) -> Self {
        let mut iter = RpoIter {
            seen: BTreeSet::new(),
            todo: VecDeque::new(),
            current: None,
        };
        iter.add_todo(cfg, entry);
        iter
    }

    fn add_todo(&mut self, cfg: &Cfg, id: NodeId) {
        if !cfg.node(id).alive || self.seen.contains(&id) || self.todo.contains(&id) {
            return;
        }
        let all_preds_seen = cfg
            .node(id)
            .predecessors
            .iter()
            .all(|p| !cfg.node(*p).alive || self.seen.contains(p));
        if all_preds_seen {
            self.todo.push_front(id);
        }
    }

    pub fn next(&mut self, cfg: &Cfg) -> Option<NodeId> {
        if let Some(current) = self.current {
            let succs: Vec<NodeId> = cfg.node(current).successors.iter().copied().collect();
            for s in succs {
                self.add_todo(cfg, s);
            }
        }

        while let Some(id) = self.todo.pop_back() {
            if cfg.node(id).alive && self.seen.insert(id) {
                self.current = Some(id);
                return Some(id);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linking_updates_both_sides() {
        let mut cfg = Cfg::new();
        let a = cfg.entry();
        let b = cfg.add_node();
        cfg.terminate_jump(a, b);
        assert!(cfg.node(a).successors.contains(&b));
        assert!(cfg.node(b).predecessors.contains(&a));
        assert!(cfg.edges_consistent());
    }

    #[test]
    fn removing_a_node_clears_edges() {
        let mut cfg = Cfg::new();
        let a = cfg.entry();
        let b = cfg.add_node();
        cfg.terminate_jump(a, b);
        // drop the terminator along with the node's edges
        cfg.node_mut(a).instructions.clear();
        cfg.remove_node(b);
        assert!(cfg.node(a).successors.is_empty());
        assert!(!cfg.node(b).alive);
        assert!(cfg.edges_consistent());
    }

    #[test]
    fn reachability_follows_successors() {
        let mut cfg = Cfg::new();
        let a = cfg.entry();
        let b = cfg.add_node();
        let orphan = cfg.add_node();
        cfg.terminate_jump(a, b);
        let reachable = cfg.reachable();
        assert!(reachable.contains(&a));
        assert!(reachable.contains(&b));
        assert!(!reachable.contains(&orphan));
    }

    #[test]
    fn rpo_visits_predecessors_first() {
        // diamond: 0 -> {1, 2} -> 3
        let mut cfg = Cfg::new();
        let a = cfg.entry();
        let b = cfg.add_node();
        let c = cfg.add_node();
        let d = cfg.add_node();
        cfg.terminate_branch(
            a,
            vec![
                (Instruction::new(Object::Boolean(true)), b),
                (Instruction::new(Object::Boolean(true)), c),
            ],
        );
        cfg.terminate_jump(b, d);
        cfg.terminate_jump(c, d);

        let mut order = Vec::new();
        let mut iter = RpoIter::new(&cfg, a);
        while let Some(id) = iter.next(&cfg) {
            order.push(id);
        }
        assert_eq!(order.len(), 4);
        assert_eq!(order[0], a);
        assert_eq!(*order.last().unwrap(), d);
    }

    #[test]
    fn branch_terminator_links_all_arms() {
        let mut cfg = Cfg::new();
        let a = cfg.entry();
        let b = cfg.add_node();
        let c = cfg.add_node();
        cfg.terminate_branch(
            a,
            vec![
                (Instruction::new(Object::Boolean(false)), b),
                (Instruction::new(Object::Boolean(true)), c),
            ],
        );
        assert_eq!(cfg.node(a).successors.len(), 2);
        assert!(cfg.edges_consistent());
    }
}

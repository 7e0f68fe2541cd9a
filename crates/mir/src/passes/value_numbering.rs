//! Global value numbering and phi insertion.
//!
//! Two cooperating maps drive the numbering: a per-name global counter
//! handing out fresh versions, and a per-block table of the version of each
//! name visible on exit. Visiting in reverse-postorder lets each block seed
//! its table from its predecessors; where two predecessors disagree, a phi
//! chain is inserted at the top of the block.

use std::collections::HashMap;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::cfg::{Cfg, NodeId};
use crate::object::{Instruction, Object, Phi, Variable};

#[derive(Default)]
pub struct GlobalValueNumbering {
    /// name -> next available version, global across the program.
    gvn: HashMap<String, u32>,
    /// block -> name -> version visible on exit.
    data: HashMap<NodeId, IndexMap<String, u32>>,
}

impl GlobalValueNumbering {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh(&mut self, name: &str) -> u32 {
        let counter = self.gvn.entry(name.to_owned()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Merge predecessor tables down and insert phis where two or more
    /// predecessors carry different versions of the same name.
    fn insert_phis(&mut self, cfg: &mut Cfg, node: NodeId) -> bool {
        let preds: Vec<NodeId> = cfg.node(node).predecessors.iter().copied().collect();

        // Merge the data down, even for strictly dominated blocks
        for p in &preds {
            let incoming: Vec<(String, u32)> = self
                .data
                .get(p)
                .map(|t| t.iter().map(|(k, v)| (k.clone(), *v)).collect())
                .unwrap_or_default();
            let table = self.data.entry(node).or_default();
            for (name, version) in incoming {
                let entry = table.entry(name).or_insert(version);
                *entry = (*entry).max(version);
            }
        }

        if preds.len() <= 1 {
            return false;
        }

        // A name converges if at least two predecessors export a version
        let names: Vec<String> = self
            .data
            .entry(node)
            .or_default()
            .keys()
            .cloned()
            .collect();
        let mut convergence: Vec<(String, SmallVec<[u32; 2]>)> = Vec::new();
        for name in names {
            let mut values: SmallVec<[u32; 2]> = SmallVec::new();
            for p in &preds {
                if let Some(v) = self.data.get(p).and_then(|t| t.get(&name)) {
                    values.push(*v);
                }
            }
            values.dedup();
            if values.len() >= 2 {
                convergence.push((name, values));
            }
        }

        if convergence.is_empty() {
            return false;
        }

        let mut phis: Vec<Instruction> = Vec::new();
        for (name, values) in convergence {
            // Join the versions pairwise: phi(a, b), then phi(that, c), ...
            let mut iter = values.into_iter();
            let mut prev = iter.next().expect("convergence needs two versions");
            for value in iter {
                let version = self.fresh(&name);
                let phi = Instruction::with_var(
                    Object::Phi(Phi {
                        left: prev,
                        right: value,
                    }),
                    Variable::versioned(&name, version),
                );
                prev = version;
                phis.push(phi);
            }
            self.data
                .entry(node)
                .or_default()
                .insert(name.clone(), prev);
        }

        // Identical phis are never duplicated
        let existing = cfg.node(node).instructions.clone();
        phis.retain(|phi| {
            !existing.iter().any(|i| {
                matches!((&i.obj, &phi.obj), (Object::Phi(a), Object::Phi(b)) if a == b)
                    && i.var.name == phi.var.name
            })
        });

        if phis.is_empty() {
            return false;
        }

        let instructions = &mut cfg.node_mut(node).instructions;
        phis.append(instructions);
        *instructions = phis;
        true
    }

    /// Number one instruction: resolve identifier uses against the block
    /// table, then allocate a version for the definition, in that order so
    /// `x = x + 1` reads the old version.
    fn number(&mut self, inst: &mut Instruction, node: NodeId) -> bool {
        let mut progress = false;

        match &mut inst.obj {
            Object::Identifier(id) => {
                if id.version == 0 {
                    // A name with no visible definition is a user error
                    // reported at the end of lowering; leave it unnumbered.
                    if let Some(version) =
                        self.data.get(&node).and_then(|t| t.get(&id.name))
                    {
                        id.version = *version;
                        progress = true;
                    }
                }
            }
            Object::Array(elements) => {
                for e in elements.iter_mut() {
                    progress |= self.number(e, node);
                }
            }
            Object::Dict(values) => {
                for v in values.values_mut() {
                    progress |= self.number(v, node);
                }
            }
            Object::FunctionCall(call) => {
                if let Some(holder) = call.holder.as_deref_mut() {
                    progress |= self.number(holder, node);
                }
                for a in call.pos_args.iter_mut() {
                    progress |= self.number(a, node);
                }
                for v in call.kw_args.values_mut() {
                    progress |= self.number(v, node);
                }
            }
            Object::Jump(jump) => {
                if let Some(predicate) = jump.predicate.as_deref_mut() {
                    progress |= self.number(predicate, node);
                }
            }
            Object::Branch(branch) => {
                for (predicate, _) in branch.arms.iter_mut() {
                    progress |= self.number(predicate, node);
                }
            }
            _ => {}
        }

        // Number the definition after uses, array members, and arguments,
        // which might otherwise create a circular reference
        if inst.var.is_set() && inst.var.gvn == 0 {
            let version = self.fresh(&inst.var.name);
            inst.var.gvn = version;
            self.data
                .entry(node)
                .or_default()
                .insert(inst.var.name.clone(), version);
            progress = true;
        }

        progress
    }

    /// Run on one node. A node is only ever numbered once; later structural
    /// changes are handled by fixup passes, not by renumbering.
    pub fn run(&mut self, cfg: &mut Cfg, node: NodeId) -> bool {
        if self.data.contains_key(&node) {
            return false;
        }
        self.data.insert(node, IndexMap::new());

        let mut progress = self.insert_phis(cfg, node);

        let mut instructions = std::mem::take(&mut cfg.node_mut(node).instructions);
        for inst in instructions.iter_mut() {
            progress |= self.number(inst, node);
        }
        cfg.node_mut(node).instructions = instructions;

        progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_to_mir::lower_ast;
    use crate::cfg::RpoIter;
    use boson_parser::parse;
    use std::path::Path;

    fn numbered(source: &str) -> Cfg {
        let ast = parse(source).unwrap();
        let mut cfg = lower_ast(&ast, Path::new("")).unwrap();
        let mut gvn = GlobalValueNumbering::new();
        let mut iter = RpoIter::new(&cfg, cfg.entry());
        while let Some(node) = iter.next(&cfg) {
            gvn.run(&mut cfg, node);
        }
        cfg
    }

    #[test]
    fn definitions_get_increasing_versions() {
        let cfg = numbered("x = 1\nx = 2");
        let insts = &cfg.node(cfg.entry()).instructions;
        assert_eq!(insts[0].var.gvn, 1);
        assert_eq!(insts[1].var.gvn, 2);
    }

    #[test]
    fn uses_resolve_to_the_latest_version() {
        let cfg = numbered("x = 1\ny = x");
        let insts = &cfg.node(cfg.entry()).instructions;
        let Object::Identifier(id) = &insts[1].obj else {
            panic!("expected identifier");
        };
        assert_eq!(id.version, 1);
    }

    #[test]
    fn self_reference_reads_the_old_version() {
        let cfg = numbered("x = 1\nx = x + 1");
        let insts = &cfg.node(cfg.entry()).instructions;
        let Object::FunctionCall(f) = &insts[1].obj else {
            panic!("expected call");
        };
        let Object::Identifier(id) = &f.pos_args[0].obj else {
            panic!("expected identifier argument");
        };
        assert_eq!(id.version, 1);
        assert_eq!(insts[1].var.gvn, 2);
    }

    #[test]
    fn divergent_definitions_get_a_phi() {
        let cfg = numbered("if c\n  x = 1\nelse\n  x = 2\nendif\ny = x");
        // the join node is the one defining y
        let join = cfg
            .live_nodes()
            .find(|n| {
                cfg.node(*n)
                    .instructions
                    .iter()
                    .any(|i| i.var.name == "y")
            })
            .expect("join node");
        let insts = &cfg.node(join).instructions;
        let Object::Phi(phi) = &insts[0].obj else {
            panic!("join should start with a phi, got {:?}", insts[0].obj);
        };
        assert_eq!(insts[0].var.name, "x");
        assert_ne!(phi.left, phi.right);
        // the use of x resolves to the phi's version
        let Object::Identifier(id) = &insts[1].obj else {
            panic!("expected identifier");
        };
        assert_eq!(id.version, insts[0].var.gvn);
    }

    #[test]
    fn no_phi_for_single_sided_definitions() {
        let cfg = numbered("x = 1\nif c\n  y = 2\nendif\nz = x");
        for node in cfg.live_nodes() {
            for inst in &cfg.node(node).instructions {
                assert!(!matches!(inst.obj, Object::Phi(_)), "unexpected phi");
            }
        }
    }

    #[test]
    fn phi_versions_never_collide_with_later_definitions() {
        let cfg = numbered("if c\n  x = 1\nelse\n  x = 2\nendif\nx = 9");
        let mut versions = Vec::new();
        for node in cfg.live_nodes() {
            for inst in &cfg.node(node).instructions {
                if inst.var.name == "x" {
                    versions.push(inst.var.gvn);
                }
            }
        }
        versions.sort_unstable();
        let deduped: Vec<u32> = {
            let mut v = versions.clone();
            v.dedup();
            v
        };
        assert_eq!(versions, deduped, "duplicate version assigned: {:?}", versions);
    }

    #[test]
    fn numbering_is_idempotent() {
        let ast = parse("x = 1\ny = x").unwrap();
        let mut cfg = lower_ast(&ast, Path::new("")).unwrap();
        let mut gvn = GlobalValueNumbering::new();
        let entry = cfg.entry();
        assert!(gvn.run(&mut cfg, entry));
        assert!(!gvn.run(&mut cfg, entry));
    }
}

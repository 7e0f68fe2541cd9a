//! Constant folding.
//!
//! Two reductions happen here. Identifier alias chains collapse through a
//! replacement table:
//!
//! ```text
//! x.1 = 7
//! y.1 = x.1
//! z.1 = y.1
//! ```
//!
//! records that z.1 is really x.1 and rewrites the use directly. And
//! operator calls whose arguments are all literal evaluate to their value;
//! arithmetic faults and type mismatches become error messages in place of
//! the call. Both reductions preserve the defining variable of the original
//! instruction. Running the pass twice changes nothing.

use std::collections::BTreeMap;

use crate::cfg::{Cfg, NodeId};
use crate::object::{Identifier, Instruction, Message, Object, Variable};

use super::operators;
use super::walkers::function_walker;
use super::with_instructions;

#[derive(Default)]
pub struct ConstantFolding {
    /// Alias table: defining variable -> the variable it aliases.
    data: BTreeMap<Variable, Variable>,
}

impl ConstantFolding {
    pub fn new() -> Self {
        Self::default()
    }

    fn fold_impl(&mut self, inst: &Instruction) -> Option<Instruction> {
        match &inst.obj {
            Object::Identifier(id) => {
                if id.version == 0 {
                    return None;
                }
                let used = Variable::versioned(&id.name, id.version);

                if let Some(root) = self.data.get(&used).cloned() {
                    // The use is itself an alias, map it to the root
                    if inst.var.is_set() {
                        self.data.insert(inst.var.clone(), root.clone());
                    }
                    return Some(Instruction::with_var(
                        Object::Identifier(Identifier::versioned(&root.name, root.gvn)),
                        inst.var.clone(),
                    ));
                }
                if inst.var.is_set() {
                    self.data.insert(inst.var.clone(), used);
                }
                None
            }
            Object::FunctionCall(f) if operators::is_operator(&f.name) => {
                match operators::fold(f) {
                    Ok(Some(obj)) => Some(Instruction::with_var(obj, inst.var.clone())),
                    Ok(None) => None,
                    Err(e) => Some(Instruction::with_var(
                        Object::Message(Message::error(e.to_string())),
                        inst.var.clone(),
                    )),
                }
            }
            _ => None,
        }
    }

    pub fn run(&mut self, cfg: &mut Cfg, node: NodeId) -> bool {
        with_instructions(cfg, node, |instructions| {
            function_walker(instructions, &mut |inst| self.fold_impl(inst))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_to_mir::lower_ast;
    use crate::object::MessageLevel;
    use boson_parser::parse;
    use std::path::Path;

    fn folded(source: &str) -> Cfg {
        let ast = parse(source).unwrap();
        let mut cfg = lower_ast(&ast, Path::new("")).unwrap();
        let entry = cfg.entry();
        let mut folding = ConstantFolding::new();
        folding.run(&mut cfg, entry);
        cfg
    }

    #[test]
    fn operator_calls_fold_to_literals() {
        let cfg = folded("x = 1 + 2");
        let inst = &cfg.node(cfg.entry()).instructions[0];
        assert_eq!(inst.obj, Object::Number(3));
        assert_eq!(inst.var.name, "x");
    }

    #[test]
    fn nested_operators_fold_in_one_pass() {
        let cfg = folded("x = 1 + 2 * 3");
        assert_eq!(cfg.node(cfg.entry()).instructions[0].obj, Object::Number(7));
    }

    #[test]
    fn not_false_is_true() {
        let cfg = folded("not false");
        assert_eq!(
            cfg.node(cfg.entry()).instructions[0].obj,
            Object::Boolean(true)
        );
    }

    #[test]
    fn division_by_zero_becomes_an_error_message() {
        let cfg = folded("x = 1 / 0");
        let inst = &cfg.node(cfg.entry()).instructions[0];
        assert!(matches!(
            &inst.obj,
            Object::Message(m) if m.level == MessageLevel::Error
        ));
        // the error still defines x
        assert_eq!(inst.var.name, "x");
    }

    #[test]
    fn alias_chains_collapse_to_the_root() {
        // after numbering: x.1 = 7; y.1 = x.1; z.1 = y.1
        let ast = parse("x = 7\ny = x\nz = y").unwrap();
        let mut cfg = lower_ast(&ast, Path::new("")).unwrap();
        let entry = cfg.entry();
        let mut gvn = super::super::value_numbering::GlobalValueNumbering::new();
        gvn.run(&mut cfg, entry);
        let mut folding = ConstantFolding::new();
        assert!(folding.run(&mut cfg, entry));

        let insts = &cfg.node(entry).instructions;
        let Object::Identifier(z_alias) = &insts[2].obj else {
            panic!("expected identifier");
        };
        assert_eq!(z_alias.name, "x");
        assert_eq!(z_alias.version, 1);
    }

    #[test]
    fn folding_is_idempotent() {
        let ast = parse("x = 7\ny = x\nz = y + 0").unwrap();
        let mut cfg = lower_ast(&ast, Path::new("")).unwrap();
        let entry = cfg.entry();
        let mut gvn = super::super::value_numbering::GlobalValueNumbering::new();
        gvn.run(&mut cfg, entry);

        let mut folding = ConstantFolding::new();
        while folding.run(&mut cfg, entry) {}
        let snapshot = cfg.node(entry).instructions.clone();
        assert!(!folding.run(&mut cfg, entry));
        assert_eq!(cfg.node(entry).instructions, snapshot);
    }
}

//! Constant propagation.
//!
//! Definitions whose object is a concrete value are published into a
//! binding table; identifier uses are replaced with the bound value. Only
//! uses are rewritten: an identifier that itself defines a variable is an
//! alias, and aliases belong to constant folding.

use std::collections::BTreeMap;

use crate::cfg::{Cfg, NodeId};
use crate::object::{Instruction, Object, Variable};

use super::walkers::function_walker;
use super::with_instructions;

#[derive(Default)]
pub struct ConstantPropagation {
    data: BTreeMap<Variable, Instruction>,
}

impl ConstantPropagation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a definition of this object may be published. Identifiers,
    /// phis, and unresolved calls are not values; messages and the other
    /// bookkeeping objects must not be duplicated into use sites.
    fn publishable(obj: &Object) -> bool {
        matches!(
            obj,
            Object::Boolean(_)
                | Object::Number(_)
                | Object::String(_)
                | Object::Array(_)
                | Object::Dict(_)
                | Object::File(_)
                | Object::Executable(_)
                | Object::StaticLibrary(_)
                | Object::CustomTarget(_)
                | Object::IncludeDirectories(_)
                | Object::Dependency(_)
                | Object::Program(_)
                | Object::Compiler(_)
                | Object::Test(_)
                // Disablers must reach their use sites to absorb them
                | Object::Disabler(_)
        )
    }

    fn publish(&mut self, instructions: &[Instruction]) {
        for inst in instructions {
            if inst.var.is_set() && Self::publishable(&inst.obj) {
                self.data.insert(inst.var.clone(), inst.clone());
            }
        }
    }

    fn substitute(&self, inst: &Instruction) -> Option<Instruction> {
        // A defining identifier is an alias, not a use
        if inst.var.is_set() {
            return None;
        }
        let Object::Identifier(id) = &inst.obj else {
            return None;
        };
        let bound = self.data.get(&Variable::versioned(&id.name, id.version))?;
        Some(Instruction::new(bound.obj.clone()))
    }

    pub fn run(&mut self, cfg: &mut Cfg, node: NodeId) -> bool {
        with_instructions(cfg, node, |instructions| {
            // Bindings first, then substitution, so a use later in the block
            // sees definitions earlier in it.
            self.publish(instructions);
            function_walker(instructions, &mut |inst| self.substitute(inst))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_to_mir::lower_ast;
    use crate::passes::value_numbering::GlobalValueNumbering;
    use boson_parser::parse;
    use std::path::Path;

    fn propagated(source: &str) -> Cfg {
        let ast = parse(source).unwrap();
        let mut cfg = lower_ast(&ast, Path::new("")).unwrap();
        let entry = cfg.entry();
        let mut gvn = GlobalValueNumbering::new();
        gvn.run(&mut cfg, entry);
        let mut prop = ConstantPropagation::new();
        prop.run(&mut cfg, entry);
        cfg
    }

    #[test]
    fn literal_flows_into_call_arguments() {
        let cfg = propagated("x = 'foo.cpp'\nfiles(x)");
        let insts = &cfg.node(cfg.entry()).instructions;
        let Object::FunctionCall(f) = &insts[1].obj else {
            panic!("expected call");
        };
        assert_eq!(f.pos_args[0].obj, Object::String("foo.cpp".to_owned()));
    }

    #[test]
    fn defining_identifier_is_left_for_folding() {
        let cfg = propagated("x = 1\ny = x");
        let insts = &cfg.node(cfg.entry()).instructions;
        // y = x defines y, so it must stay an identifier here
        assert!(matches!(&insts[1].obj, Object::Identifier(_)));
    }

    #[test]
    fn operator_arguments_get_values() {
        let cfg = propagated("x = 2\ny = x + 1");
        let insts = &cfg.node(cfg.entry()).instructions;
        let Object::FunctionCall(f) = &insts[1].obj else {
            panic!("expected call");
        };
        assert_eq!(f.pos_args[0].obj, Object::Number(2));
    }

    #[test]
    fn bindings_cross_blocks_in_rpo() {
        let ast = parse("x = 5\nif c\n  f(x)\nendif").unwrap();
        let mut cfg = lower_ast(&ast, Path::new("")).unwrap();
        let mut gvn = GlobalValueNumbering::new();
        let mut prop = ConstantPropagation::new();
        let mut iter = crate::cfg::RpoIter::new(&cfg, cfg.entry());
        while let Some(node) = iter.next(&cfg) {
            gvn.run(&mut cfg, node);
            prop.run(&mut cfg, node);
        }

        let body = cfg
            .live_nodes()
            .find(|n| {
                cfg.node(*n)
                    .instructions
                    .iter()
                    .any(|i| matches!(&i.obj, Object::FunctionCall(f) if f.name == "f"))
            })
            .expect("body node");
        let Object::FunctionCall(f) = &cfg.node(body).instructions[0].obj else {
            panic!("expected call");
        };
        assert_eq!(f.pos_args[0].obj, Object::Number(5));
    }
}

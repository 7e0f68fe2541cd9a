//! Lowering from the AST into the mid-level IR.
//!
//! Expression lowering is a pure bottom-up traversal producing an
//! [`Instruction`]. Statement lowering keeps a cursor to the current CFG
//! node and splits it whenever control flow forks. Operators are not
//! evaluated here: they become function calls with reserved `__op__` names
//! so the pass pipeline can rewrite every computation the same way.

use std::path::{Path, PathBuf};

use boson_parser::ast;

use crate::cfg::{Cfg, NodeId};
use crate::error::{LowerError, LowerResult};
use crate::object::{FunctionCall, Identifier, Instruction, Object};

struct LoweringContext {
    /// Directory of the file being lowered, relative to the source root.
    subdir: PathBuf,
}

impl LoweringContext {
    fn lower_expr(&self, expr: &ast::Expr) -> LowerResult<Instruction> {
        let obj = match expr {
            ast::Expr::String(s) => Object::String(s.value.clone()),
            ast::Expr::Number(n) => Object::Number(n.value),
            ast::Expr::Boolean(b) => Object::Boolean(b.value),
            ast::Expr::Identifier(id) => Object::Identifier(Identifier::new(&id.value)),
            ast::Expr::Array(arr) => {
                let elements = arr
                    .elements
                    .iter()
                    .map(|e| self.lower_expr(e))
                    .collect::<LowerResult<Vec<_>>>()?;
                Object::Array(elements)
            }
            ast::Expr::Dict(dict) => {
                let mut values = indexmap::IndexMap::new();
                for (key, value) in &dict.elements {
                    let ast::Expr::String(key) = key else {
                        return Err(LowerError::InvalidDictKey);
                    };
                    values.insert(key.value.clone(), self.lower_expr(value)?);
                }
                Object::Dict(values)
            }
            ast::Expr::FunctionCall(call) => Object::FunctionCall(self.lower_call(call)?),
            ast::Expr::GetAttribute(attr) => {
                let holder = self.lower_expr(&attr.holder)?;
                // Only methods live on objects, so the held side must be a call
                let ast::Expr::FunctionCall(call) = attr.held.as_ref() else {
                    return Err(LowerError::NotCallable);
                };
                let mut method = self.lower_call(call)?;
                method.holder = Some(Box::new(holder));
                Object::FunctionCall(method)
            }
            ast::Expr::Subscript(sub) => {
                let holder = self.lower_expr(&sub.holder)?;
                let index = self.lower_expr(&sub.index)?;
                Object::FunctionCall(FunctionCall::new(
                    "__subscript__",
                    vec![holder, index],
                    self.subdir.clone(),
                ))
            }
            ast::Expr::Unary(unary) => {
                let name = match unary.op {
                    ast::UnaryOp::Not => "__not__",
                    ast::UnaryOp::Neg => "__neg__",
                };
                let rhs = self.lower_expr(&unary.rhs)?;
                Object::FunctionCall(FunctionCall::new(name, vec![rhs], self.subdir.clone()))
            }
            ast::Expr::Additive(bin) => {
                let name = match bin.op {
                    ast::AddOp::Add => "__add__",
                    ast::AddOp::Sub => "__sub__",
                };
                self.lower_binary(name, &bin.lhs, &bin.rhs)?
            }
            ast::Expr::Multiplicative(bin) => {
                let name = match bin.op {
                    ast::MulOp::Mul => "__mul__",
                    ast::MulOp::Div => "__div__",
                    ast::MulOp::Mod => "__mod__",
                };
                self.lower_binary(name, &bin.lhs, &bin.rhs)?
            }
            ast::Expr::Relational(bin) => {
                let name = match bin.op {
                    ast::RelationalOp::Eq => "__eq__",
                    ast::RelationalOp::Ne => "__ne__",
                    ast::RelationalOp::Lt => "__lt__",
                    ast::RelationalOp::Le => "__le__",
                    ast::RelationalOp::Gt => "__gt__",
                    ast::RelationalOp::Ge => "__ge__",
                    ast::RelationalOp::In => "__in__",
                    ast::RelationalOp::NotIn => "__not_in__",
                    ast::RelationalOp::And => "__and__",
                    ast::RelationalOp::Or => "__or__",
                };
                self.lower_binary(name, &bin.lhs, &bin.rhs)?
            }
            ast::Expr::Ternary(tern) => {
                let condition = self.lower_expr(&tern.condition)?;
                let if_true = self.lower_expr(&tern.if_true)?;
                let if_false = self.lower_expr(&tern.if_false)?;
                Object::FunctionCall(FunctionCall::new(
                    "__ternary__",
                    vec![condition, if_true, if_false],
                    self.subdir.clone(),
                ))
            }
        };
        Ok(Instruction::new(obj))
    }

    fn lower_binary(
        &self,
        name: &str,
        lhs: &ast::Expr,
        rhs: &ast::Expr,
    ) -> LowerResult<Object> {
        let lhs = self.lower_expr(lhs)?;
        let rhs = self.lower_expr(rhs)?;
        Ok(Object::FunctionCall(FunctionCall::new(
            name,
            vec![lhs, rhs],
            self.subdir.clone(),
        )))
    }

    fn lower_call(&self, call: &ast::FunctionCall) -> LowerResult<FunctionCall> {
        let ast::Expr::Identifier(name) = call.held.as_ref() else {
            return Err(LowerError::NotCallable);
        };

        let pos_args = call
            .args
            .positional
            .iter()
            .map(|a| self.lower_expr(a))
            .collect::<LowerResult<Vec<_>>>()?;

        let mut kw_args = indexmap::IndexMap::new();
        for (key, value) in &call.args.keyword {
            kw_args.insert(key.value.clone(), self.lower_expr(value)?);
        }

        Ok(FunctionCall::with_keywords(
            &name.value,
            pos_args,
            kw_args,
            self.subdir.clone(),
        ))
    }

    /// Lower one statement, returning the node the cursor moves to.
    fn lower_stmt(&self, cfg: &mut Cfg, current: NodeId, stmt: &ast::Stmt) -> LowerResult<NodeId> {
        match stmt {
            ast::Stmt::Expression(s) => {
                let inst = self.lower_expr(&s.value)?;
                cfg.node_mut(current).instructions.push(inst);
                Ok(current)
            }
            ast::Stmt::Assignment(s) => {
                let ast::Expr::Identifier(target) = &s.lhs else {
                    return Err(LowerError::InvalidAssignmentTarget);
                };

                // `a += e` desugars into `a = a + e`
                let mut value = match s.op {
                    ast::AssignOp::Equal => self.lower_expr(&s.rhs)?,
                    ast::AssignOp::AddEquals => self.lower_compound("__add__", &s.lhs, &s.rhs)?,
                    ast::AssignOp::SubEquals => self.lower_compound("__sub__", &s.lhs, &s.rhs)?,
                    ast::AssignOp::MulEquals => self.lower_compound("__mul__", &s.lhs, &s.rhs)?,
                    ast::AssignOp::DivEquals => self.lower_compound("__div__", &s.lhs, &s.rhs)?,
                    ast::AssignOp::ModEquals => self.lower_compound("__mod__", &s.lhs, &s.rhs)?,
                };
                value.var.name = target.value.clone();

                cfg.node_mut(current).instructions.push(value);
                Ok(current)
            }
            ast::Stmt::If(s) => self.lower_if(cfg, current, s),
            // Loops are not implemented; keep an opaque placeholder so the
            // rest of the program still lowers.
            ast::Stmt::Foreach(_) | ast::Stmt::Break(_) | ast::Stmt::Continue(_) => {
                cfg.node_mut(current)
                    .instructions
                    .push(Instruction::new(Object::Empty));
                Ok(current)
            }
        }
    }

    fn lower_compound(
        &self,
        name: &str,
        lhs: &ast::Expr,
        rhs: &ast::Expr,
    ) -> LowerResult<Instruction> {
        Ok(Instruction::new(self.lower_binary(name, lhs, rhs)?))
    }

    /// Lower an if/elif/else web.
    ///
    /// The current block ends in a Branch whose predicates are the source
    /// conditions in order plus a final literal-true fallthrough. Every body
    /// flows into a fresh join node, which becomes the cursor; the
    /// fallthrough targets the else body when there is one, the join node
    /// otherwise.
    fn lower_if(
        &self,
        cfg: &mut Cfg,
        current: NodeId,
        stmt: &ast::IfStatement,
    ) -> LowerResult<NodeId> {
        let join = cfg.add_node();

        let mut arms = Vec::new();
        for conditioned in
            std::iter::once(&stmt.ifblock).chain(stmt.efblock.iter())
        {
            let predicate = self.lower_expr(&conditioned.condition)?;
            let body = cfg.add_node();
            let end = self.lower_block(cfg, body, &conditioned.block)?;
            cfg.terminate_jump(end, join);
            arms.push((predicate, body));
        }

        let fallthrough_target = match &stmt.eblock {
            Some(block) => {
                let body = cfg.add_node();
                let end = self.lower_block(cfg, body, block)?;
                cfg.terminate_jump(end, join);
                body
            }
            None => join,
        };
        arms.push((
            Instruction::new(Object::Boolean(true)),
            fallthrough_target,
        ));

        cfg.terminate_branch(current, arms);
        Ok(join)
    }

    fn lower_block(
        &self,
        cfg: &mut Cfg,
        entry: NodeId,
        block: &ast::CodeBlock,
    ) -> LowerResult<NodeId> {
        let mut current = entry;
        for stmt in &block.statements {
            current = self.lower_stmt(cfg, current, stmt)?;
        }
        Ok(current)
    }
}

/// Lower a parsed file into a fresh CFG.
///
/// `subdir` is the directory of the file relative to the source root; calls
/// that create files remember it so sources resolve against the right tree.
pub fn lower_ast(block: &ast::CodeBlock, subdir: &Path) -> LowerResult<Cfg> {
    let ctx = LoweringContext {
        subdir: subdir.to_path_buf(),
    };
    let mut cfg = Cfg::new();
    let entry = cfg.entry();
    ctx.lower_block(&mut cfg, entry, block)?;
    Ok(cfg)
}

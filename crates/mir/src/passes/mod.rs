//! The lowering passes.
//!
//! Every pass has the same shape: given the graph and one node, rewrite
//! what it recognizes and report whether anything changed. The driver in
//! [`crate::lower`] walks the graph in reverse-postorder applying a pass
//! list per node, and iterates until the whole pipeline stops making
//! progress.

mod branch_pruning;
mod combine_add_arguments;
mod compilers;
mod constant_folding;
mod constant_propagation;
mod custom_target_program_replacement;
mod dead_code;
mod dependency_objects;
mod disabler;
mod extractors;
mod fixup_phis;
mod flatten;
mod free_functions;
mod join_blocks;
mod machines;
mod operators;
mod printer;
mod program_objects;
mod string_objects;
mod threaded;
mod value_numbering;
mod walkers;

pub use branch_pruning::branch_pruning;
pub use combine_add_arguments::combine_add_arguments;
pub use compilers::{insert_compilers, lower_compiler_methods};
pub use constant_folding::ConstantFolding;
pub use constant_propagation::ConstantPropagation;
pub use custom_target_program_replacement::custom_target_program_replacement;
pub use dead_code::delete_unreachable;
pub use dependency_objects::lower_dependency_objects;
pub use disabler::disable;
pub use fixup_phis::fixup_phis;
pub use flatten::flatten;
pub use free_functions::{lower_free_functions, lower_project};
pub use join_blocks::join_blocks;
pub use machines::machine_lower;
pub use printer::Printer;
pub use program_objects::lower_program_objects;
pub use string_objects::lower_string_objects;
pub use threaded::threaded_lowering;
pub use value_numbering::GlobalValueNumbering;

use crate::cfg::{Cfg, NodeId, RpoIter};
use crate::object::Instruction;

/// Walk every live node reachable from `entry` in reverse-postorder,
/// applying the callback; returns whether any application made progress.
///
/// The callback may restructure the graph: the iterator re-queries edges
/// and liveness as it goes, so merged or deleted nodes simply stop showing
/// up.
pub fn block_walker(
    cfg: &mut Cfg,
    entry: NodeId,
    passes: &mut dyn FnMut(&mut Cfg, NodeId) -> bool,
) -> bool {
    let mut progress = false;
    let mut iter = RpoIter::new(cfg, entry);
    while let Some(node) = iter.next(cfg) {
        progress |= passes(cfg, node);
    }
    progress
}

/// Borrow a node's instruction list for editing. Passes that only rewrite
/// instructions use this so the graph stays borrowable alongside.
pub(crate) fn with_instructions(
    cfg: &mut Cfg,
    node: NodeId,
    f: impl FnOnce(&mut Vec<Instruction>) -> bool,
) -> bool {
    let mut instructions = std::mem::take(&mut cfg.node_mut(node).instructions);
    let progress = f(&mut instructions);
    cfg.node_mut(node).instructions = instructions;
    progress
}

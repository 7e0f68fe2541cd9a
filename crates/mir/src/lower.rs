//! The main lowering loop.
//!
//! Three phases. Early passes run once for the whole program: machine and
//! compiler introspection can be resolved immediately, and value numbering
//! must see the graph before pruning starts rewriting it. The main loop
//! then iterates to fixpoint; when it runs dry the probe lowering fires
//! (find_program, dependency lookups) and, if it resolved anything, the
//! main loop runs to fixpoint again. Late passes run once on the result.

use crate::cfg::Cfg;
use crate::error::LowerResult;
use crate::object::{Instruction, Message, MessageLevel, Object};
use crate::passes;
use crate::state::Persistant;

fn early(cfg: &mut Cfg, pstate: &Persistant, printer: &mut passes::Printer) {
    let mut gvn = passes::GlobalValueNumbering::new();
    let entry = cfg.entry();
    passes::block_walker(cfg, entry, &mut |cfg, node| {
        let mut progress = passes::machine_lower(cfg, node, &pstate.machines);
        progress |= passes::insert_compilers(cfg, node, &pstate.toolchains);
        progress |= passes::custom_target_program_replacement(cfg, node);
        progress |= gvn.run(cfg, node);
        progress
    });
    printer.increment();
    printer.print(cfg);
}

fn main_fixpoint(cfg: &mut Cfg, pstate: &Persistant, printer: &mut passes::Printer) {
    let mut folding = passes::ConstantFolding::new();
    let mut propagation = passes::ConstantPropagation::new();

    loop {
        let entry = cfg.entry();
        let progress = passes::block_walker(cfg, entry, &mut |cfg, node| {
            let mut p = passes::flatten(cfg, node);
            // get_compiler and machine calls whose arguments only reduced
            // after the early phase still need resolving
            p |= passes::machine_lower(cfg, node, &pstate.machines);
            p |= passes::insert_compilers(cfg, node, &pstate.toolchains);
            p |= passes::lower_free_functions(cfg, node, pstate);
            p |= passes::delete_unreachable(cfg, node);
            p |= passes::branch_pruning(cfg, node);
            p |= passes::join_blocks(cfg, node);
            p |= passes::fixup_phis(cfg, node);
            p |= folding.run(cfg, node);
            p |= propagation.run(cfg, node);
            p |= passes::disable(cfg, node);
            p |= passes::lower_program_objects(cfg, node);
            p |= passes::lower_string_objects(cfg, node);
            p |= passes::lower_dependency_objects(cfg, node);
            p |= passes::lower_compiler_methods(cfg, node);
            p
        });
        printer.increment();
        printer.print(cfg);
        if !progress {
            break;
        }
    }
}

fn late(cfg: &mut Cfg, printer: &mut passes::Printer) {
    let entry = cfg.entry();
    passes::block_walker(cfg, entry, &mut |cfg, node| {
        passes::combine_add_arguments(cfg, node)
    });
    printer.increment();
    printer.print(cfg);
}

/// Run the full pass pipeline over an already projected graph.
pub fn lower_pipeline(cfg: &mut Cfg, pstate: &mut Persistant) {
    let mut printer = passes::Printer::new();
    printer.print(cfg);

    early(cfg, pstate, &mut printer);
    main_fixpoint(cfg, pstate, &mut printer);

    // The main loop has run dry; do the probe lowering across the whole
    // program, then lower whatever the probes unblocked.
    if passes::threaded_lowering(cfg, pstate) {
        main_fixpoint(cfg, pstate, &mut printer);
    }

    late(cfg, &mut printer);
}

/// Lower a program: consume `project()`, then run the pipeline.
pub fn lower(cfg: &mut Cfg, pstate: &mut Persistant) -> LowerResult<()> {
    passes::lower_project(cfg, pstate)?;
    lower_pipeline(cfg, pstate);
    Ok(())
}

/// The final flat instruction stream, in control flow order. Terminators
/// and empty placeholders are dropped; everything else is preserved,
/// errors included.
pub fn flat_instructions(cfg: &Cfg) -> Vec<Instruction> {
    let mut out = Vec::new();
    let mut iter = crate::cfg::RpoIter::new(cfg, cfg.entry());
    while let Some(node) = iter.next(cfg) {
        for inst in &cfg.node(node).instructions {
            match &inst.obj {
                Object::Jump(_) | Object::Branch(_) | Object::Empty => {}
                _ => out.push(inst.clone()),
            }
        }
    }
    out
}

/// Collect the error messages of a lowered program, in stream order. The
/// backend must only be handed a stream with no errors.
pub fn collect_errors(instructions: &[Instruction]) -> Vec<Message> {
    instructions
        .iter()
        .filter_map(|inst| match &inst.obj {
            Object::Message(m) if m.level == MessageLevel::Error => Some(m.clone()),
            _ => None,
        })
        .collect()
}

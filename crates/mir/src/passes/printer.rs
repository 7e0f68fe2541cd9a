//! Debugging pass that dumps a text rendering of the IR between passes.
//!
//! Enabled by setting the `BOSON_DEBUG_PRINT_MIR` environment variable to a
//! directory; each pipeline iteration appends a numbered section.

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::PathBuf;

use crate::cfg::Cfg;
use crate::object::{Instruction, Object};

pub struct Printer {
    pass: u32,
    out: Option<PathBuf>,
}

impl Printer {
    pub fn new() -> Self {
        let out = std::env::var_os("BOSON_DEBUG_PRINT_MIR").map(|dir| {
            PathBuf::from(dir).join("boson-mir.txt")
        });
        Printer { pass: 0, out }
    }

    pub fn increment(&mut self) {
        self.pass += 1;
    }

    pub fn print(&mut self, cfg: &Cfg) {
        let Some(path) = &self.out else {
            return;
        };

        let mut text = format!("=== pass {} ===\n", self.pass);
        for node in cfg.live_nodes() {
            let n = cfg.node(node);
            let _ = writeln!(
                text,
                "block {} (pred: {:?}, succ: {:?})",
                node, n.predecessors, n.successors
            );
            for inst in &n.instructions {
                let _ = writeln!(text, "  {}", render(inst));
            }
        }

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = file.write_all(text.as_bytes());
        }
    }
}

impl Default for Printer {
    fn default() -> Self {
        Printer::new()
    }
}

fn render(inst: &Instruction) -> String {
    let value = match &inst.obj {
        Object::Empty => "()".to_owned(),
        Object::Boolean(b) => b.to_string(),
        Object::Number(n) => n.to_string(),
        Object::String(s) => format!("'{}'", s),
        Object::Identifier(id) => format!("{}.{}", id.name, id.version),
        Object::Array(elements) => format!("[{} elements]", elements.len()),
        Object::Dict(values) => format!("{{{} entries}}", values.len()),
        Object::FunctionCall(f) => format!("{}(...)", f.name),
        Object::Phi(phi) => format!("phi({}, {})", phi.left, phi.right),
        Object::Jump(j) => match &j.predicate {
            Some(p) => format!("jump {} if {}", j.target, render(p)),
            None => format!("jump {}", j.target),
        },
        Object::Branch(b) => {
            let arms: Vec<String> = b
                .arms
                .iter()
                .map(|(p, t)| format!("{} -> {}", render(p), t))
                .collect();
            format!("branch [{}]", arms.join(", "))
        }
        Object::Message(m) => format!("{:?}: {}", m.level, m.message),
        other => other.kind_name().to_owned(),
    };

    if inst.var.is_set() {
        format!("{}.{} = {}", inst.var.name, inst.var.gvn, value)
    } else {
        value
    }
}

//! Lower away machine introspection.
//!
//! Calls to methods on `build_machine`, `host_machine`, and `target_machine`
//! are replaced with their concrete values.

use crate::cfg::{Cfg, NodeId};
use crate::error::{LowerError, LowerResult};
use crate::machines::{Endian, Info, Machine, PerMachine};
use crate::object::{Instruction, Message, Object};

use super::walkers::function_walker;
use super::with_instructions;

fn machine_map(holder: &str) -> Option<Machine> {
    match holder {
        "build_machine" => Some(Machine::Build),
        "host_machine" => Some(Machine::Host),
        "target_machine" => Some(Machine::Target),
        _ => None,
    }
}

fn lower_method(holder: &str, name: &str, info: &Info) -> LowerResult<Object> {
    match name {
        "cpu_family" => Ok(Object::String(info.cpu_family.clone())),
        "cpu" => Ok(Object::String(info.cpu.clone())),
        "system" => Ok(Object::String(info.system().to_owned())),
        "endian" => Ok(Object::String(
            match info.endian {
                Endian::Little => "little",
                Endian::Big => "big",
            }
            .to_owned(),
        )),
        _ => Err(LowerError::UnknownMethod {
            holder: holder.to_owned(),
            method: name.to_owned(),
        }),
    }
}

pub fn machine_lower(cfg: &mut Cfg, node: NodeId, machines: &PerMachine<Info>) -> bool {
    with_instructions(cfg, node, |instructions| {
        function_walker(instructions, &mut |inst| {
            let Object::FunctionCall(f) = &inst.obj else {
                return None;
            };
            let holder = match f.holder.as_deref() {
                Some(Instruction {
                    obj: Object::Identifier(id),
                    ..
                }) => &id.name,
                _ => return None,
            };
            let machine = machine_map(holder)?;

            let replacement = match lower_method(holder, &f.name, machines.get(machine)) {
                Ok(obj) => obj,
                Err(e) => Object::Message(Message::error(e.to_string())),
            };
            Some(Instruction::new(replacement))
        })
    })
}

//! Lower string object methods.

use crate::cfg::{Cfg, NodeId};
use crate::error::{LowerError, LowerResult};
use crate::object::{FunctionCall, Instruction, Message, Object};
use crate::version;

use super::extractors::{all_args_reduced, string_value};
use super::walkers::function_walker;
use super::with_instructions;

fn lower_version_compare(holder: &str, f: &FunctionCall) -> LowerResult<Object> {
    if !f.kw_args.is_empty() {
        return Err(LowerError::InvalidArguments(
            "string.version_compare() does not take any keyword arguments".to_owned(),
        ));
    }
    if f.pos_args.len() != 1 {
        return Err(LowerError::InvalidArguments(format!(
            "string.version_compare() takes exactly 1 positional argument, got: {}",
            f.pos_args.len()
        )));
    }

    let raw = string_value(
        &f.pos_args[0],
        "string.version_compare: first argument must be a string",
    )?;
    let constraint: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let (op, wanted) = version::parse_constraint(&constraint);

    Ok(Object::Boolean(version::compare(holder, op, wanted)))
}

fn lower_split(holder: &str, f: &FunctionCall) -> LowerResult<Object> {
    let separator = match f.pos_args.len() {
        0 => " ".to_owned(),
        1 => string_value(&f.pos_args[0], "string.split: separator must be a string")?,
        n => {
            return Err(LowerError::InvalidArguments(format!(
                "string.split() takes at most 1 argument, got: {}",
                n
            )))
        }
    };
    let parts = holder
        .split(&separator)
        .map(|p| Instruction::new(Object::String(p.to_owned())))
        .collect();
    Ok(Object::Array(parts))
}

pub fn lower_string_objects(cfg: &mut Cfg, node: NodeId) -> bool {
    with_instructions(cfg, node, |instructions| {
        function_walker(instructions, &mut |inst| {
            let Object::FunctionCall(f) = &inst.obj else {
                return None;
            };
            let Some(Instruction {
                obj: Object::String(holder),
                ..
            }) = f.holder.as_deref()
            else {
                return None;
            };
            if !all_args_reduced(&f.pos_args, &f.kw_args) {
                return None;
            }

            let lowered = match f.name.as_str() {
                "version_compare" => lower_version_compare(holder, f),
                "to_upper" => Ok(Object::String(holder.to_uppercase())),
                "to_lower" => Ok(Object::String(holder.to_lowercase())),
                "strip" => Ok(Object::String(holder.trim().to_owned())),
                "split" => lower_split(holder, f),
                other => Err(LowerError::UnknownMethod {
                    holder: "string".to_owned(),
                    method: other.to_owned(),
                }),
            };

            Some(Instruction::new(match lowered {
                Ok(obj) => obj,
                Err(e) => Object::Message(Message::error(e.to_string())),
            }))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_to_mir::lower_ast;
    use boson_parser::parse;
    use std::path::Path;

    fn run(source: &str) -> Object {
        let ast = parse(source).unwrap();
        let mut cfg = lower_ast(&ast, Path::new("")).unwrap();
        let entry = cfg.entry();
        assert!(lower_string_objects(&mut cfg, entry));
        cfg.node(entry).instructions[0].obj.clone()
    }

    #[test]
    fn version_compare_lowers_to_boolean() {
        assert_eq!(run("'3.6'.version_compare('< 3.7')"), Object::Boolean(true));
        assert_eq!(run("'3.6'.version_compare('>= 3.7')"), Object::Boolean(false));
        // no operator prefix defaults to equality
        assert_eq!(run("'1.2.0'.version_compare('1.2')"), Object::Boolean(true));
    }

    #[test]
    fn case_methods() {
        assert_eq!(run("'Ab'.to_upper()"), Object::String("AB".to_owned()));
        assert_eq!(run("'Ab'.to_lower()"), Object::String("ab".to_owned()));
    }

    #[test]
    fn split_produces_an_array() {
        let Object::Array(parts) = run("'a b'.split()") else {
            panic!("expected array");
        };
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn unknown_method_is_an_error() {
        assert!(matches!(run("'a'.frobnicate()"), Object::Message(_)));
    }
}

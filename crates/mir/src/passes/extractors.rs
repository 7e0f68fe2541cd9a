//! Argument extraction helpers for function lowering.
//!
//! These run only after `Object::is_reduced` has held for every argument,
//! so a type that doesn't match is a user error, not an unlowered value.

use indexmap::IndexMap;

use crate::error::{LowerError, LowerResult};
use crate::object::{Instruction, Object};

/// Check that every positional and keyword argument has been reduced to a
/// concrete object. Lowering waits until this holds.
pub fn all_args_reduced(
    pos_args: &[Instruction],
    kw_args: &IndexMap<String, Instruction>,
) -> bool {
    pos_args.iter().all(|a| a.obj.is_reduced())
        && kw_args.values().all(|a| a.obj.is_reduced())
}

pub fn string_value(inst: &Instruction, err: &str) -> LowerResult<String> {
    match &inst.obj {
        Object::String(s) => Ok(s.clone()),
        _ => Err(LowerError::InvalidArguments(err.to_owned())),
    }
}

pub fn bool_value(inst: &Instruction, err: &str) -> LowerResult<bool> {
    match &inst.obj {
        Object::Boolean(b) => Ok(*b),
        _ => Err(LowerError::InvalidArguments(err.to_owned())),
    }
}

/// Extract variadic string arguments, flattening through arrays: the DSL
/// treats `f('a', 'b')`, `f(['a', 'b'])` and `f(['a'], 'b')` identically.
pub fn variadic_strings(args: &[Instruction], err: &str) -> LowerResult<Vec<String>> {
    let mut out = Vec::new();
    for arg in args {
        match &arg.obj {
            Object::String(s) => out.push(s.clone()),
            Object::Array(elements) => out.extend(variadic_strings(elements, err)?),
            _ => return Err(LowerError::InvalidArguments(err.to_owned())),
        }
    }
    Ok(out)
}

pub fn kw_string(
    kw_args: &IndexMap<String, Instruction>,
    key: &str,
    err: &str,
) -> LowerResult<Option<String>> {
    kw_args
        .get(key)
        .map(|inst| string_value(inst, err))
        .transpose()
}

pub fn kw_bool(
    kw_args: &IndexMap<String, Instruction>,
    key: &str,
    err: &str,
) -> LowerResult<Option<bool>> {
    kw_args
        .get(key)
        .map(|inst| bool_value(inst, err))
        .transpose()
}

/// A keyword argument holding either a scalar or an array of scalars;
/// returns the underlying instructions.
pub fn kw_list<'a>(
    kw_args: &'a IndexMap<String, Instruction>,
    key: &str,
) -> Vec<&'a Instruction> {
    match kw_args.get(key).map(|i| &i.obj) {
        Some(Object::Array(elements)) => elements.iter().collect(),
        Some(_) => vec![&kw_args[key]],
        None => Vec::new(),
    }
}

/// A keyword argument of strings, scalar promoted to a one element list.
pub fn kw_string_list(
    kw_args: &IndexMap<String, Instruction>,
    key: &str,
    err: &str,
) -> LowerResult<Vec<String>> {
    kw_list(kw_args, key)
        .into_iter()
        .map(|inst| string_value(inst, err))
        .collect()
}

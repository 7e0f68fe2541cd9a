//! Evaluation of the reserved operator calls.
//!
//! The AST lowering turns every operator into a `__op__` function call;
//! once the arguments are literal the call folds to its value here. Type
//! errors and arithmetic faults produce `Err`, which constant folding turns
//! into an error message at the call site.

use indexmap::IndexMap;

use crate::error::{LowerError, LowerResult};
use crate::object::{FunctionCall, Instruction, Object};

pub fn is_operator(name: &str) -> bool {
    name.starts_with("__") && name.ends_with("__")
}

fn literal(inst: &Instruction) -> Option<&Object> {
    match &inst.obj {
        Object::Boolean(_)
        | Object::Number(_)
        | Object::String(_)
        | Object::Array(_)
        | Object::Dict(_) => inst.obj.is_reduced().then_some(&inst.obj),
        _ => None,
    }
}

fn two_args<'a>(f: &'a FunctionCall) -> Option<(&'a Object, &'a Object)> {
    if f.pos_args.len() != 2 {
        return None;
    }
    Some((literal(&f.pos_args[0])?, literal(&f.pos_args[1])?))
}

fn arity_error(name: &str, want: usize, got: usize) -> LowerError {
    LowerError::InvalidArguments(format!("{}: takes {} arguments, got {}", name, want, got))
}

/// Try to evaluate an operator call. `Ok(None)` means the arguments are not
/// literal yet and the call should be left alone.
pub fn fold(f: &FunctionCall) -> LowerResult<Option<Object>> {
    match f.name.as_str() {
        "__add__" => fold_add(f),
        "__sub__" | "__mul__" | "__div__" | "__mod__" => fold_arithmetic(f),
        "__neg__" => fold_neg(f),
        "__not__" => fold_not(f),
        "__eq__" | "__ne__" => fold_equality(f),
        "__lt__" | "__le__" | "__gt__" | "__ge__" => fold_ordering(f),
        "__in__" | "__not_in__" => fold_contains(f),
        "__and__" | "__or__" => fold_logic(f),
        "__subscript__" => fold_subscript(f),
        "__ternary__" => fold_ternary(f),
        _ => Ok(None),
    }
}

fn fold_add(f: &FunctionCall) -> LowerResult<Option<Object>> {
    if f.pos_args.len() != 2 {
        return Err(arity_error("+", 2, f.pos_args.len()));
    }
    let Some((lhs, rhs)) = two_args(f) else {
        return Ok(None);
    };
    match (lhs, rhs) {
        (Object::Number(a), Object::Number(b)) => a
            .checked_add(*b)
            .map(|n| Some(Object::Number(n)))
            .ok_or_else(|| LowerError::InvalidArguments("integer overflow".to_owned())),
        (Object::String(a), Object::String(b)) => {
            Ok(Some(Object::String(format!("{}{}", a, b))))
        }
        (Object::Array(a), Object::Array(b)) => {
            let mut out = a.clone();
            out.extend(b.iter().cloned());
            Ok(Some(Object::Array(out)))
        }
        (Object::Dict(a), Object::Dict(b)) => {
            // right biased merge
            let mut out: IndexMap<String, Instruction> = a.clone();
            for (k, v) in b {
                out.insert(k.clone(), v.clone());
            }
            Ok(Some(Object::Dict(out)))
        }
        (a, b) => Err(LowerError::InvalidArguments(format!(
            "cannot add {} and {}",
            a.kind_name(),
            b.kind_name()
        ))),
    }
}

fn fold_arithmetic(f: &FunctionCall) -> LowerResult<Option<Object>> {
    if f.pos_args.len() != 2 {
        return Err(arity_error(&f.name, 2, f.pos_args.len()));
    }
    let Some((lhs, rhs)) = two_args(f) else {
        return Ok(None);
    };
    let (Object::Number(a), Object::Number(b)) = (lhs, rhs) else {
        return Err(LowerError::InvalidArguments(format!(
            "arithmetic on {} and {}",
            lhs.kind_name(),
            rhs.kind_name()
        )));
    };

    let result = match f.name.as_str() {
        "__sub__" => a.checked_sub(*b),
        "__mul__" => a.checked_mul(*b),
        "__div__" => {
            if *b == 0 {
                return Err(LowerError::InvalidArguments("division by zero".to_owned()));
            }
            a.checked_div(*b)
        }
        "__mod__" => {
            if *b == 0 {
                return Err(LowerError::InvalidArguments("modulo by zero".to_owned()));
            }
            a.checked_rem(*b)
        }
        _ => unreachable!("fold_arithmetic called for {}", f.name),
    };

    result
        .map(|n| Some(Object::Number(n)))
        .ok_or_else(|| LowerError::InvalidArguments("integer overflow".to_owned()))
}

fn fold_neg(f: &FunctionCall) -> LowerResult<Option<Object>> {
    if f.pos_args.len() != 1 {
        return Err(arity_error("negation", 1, f.pos_args.len()));
    }
    match literal(&f.pos_args[0]) {
        Some(Object::Number(n)) => n
            .checked_neg()
            .map(|n| Some(Object::Number(n)))
            .ok_or_else(|| LowerError::InvalidArguments("integer overflow".to_owned())),
        Some(other) => Err(LowerError::InvalidArguments(format!(
            "attempted to negate a value of type {}",
            other.kind_name()
        ))),
        None => Ok(None),
    }
}

fn fold_not(f: &FunctionCall) -> LowerResult<Option<Object>> {
    if f.pos_args.len() != 1 {
        return Err(arity_error("not", 1, f.pos_args.len()));
    }
    match literal(&f.pos_args[0]) {
        Some(Object::Boolean(b)) => Ok(Some(Object::Boolean(!b))),
        Some(other) => Err(LowerError::InvalidArguments(format!(
            "attempted to negate a value of type {}",
            other.kind_name()
        ))),
        None => Ok(None),
    }
}

fn fold_equality(f: &FunctionCall) -> LowerResult<Option<Object>> {
    if f.pos_args.len() != 2 {
        return Err(arity_error(&f.name, 2, f.pos_args.len()));
    }
    let Some((lhs, rhs)) = two_args(f) else {
        return Ok(None);
    };
    // Different kinds never compare equal
    let same_kind = std::mem::discriminant(lhs) == std::mem::discriminant(rhs);
    let equal = same_kind && lhs == rhs;
    Ok(Some(Object::Boolean(match f.name.as_str() {
        "__eq__" => equal,
        _ => !equal,
    })))
}

fn fold_ordering(f: &FunctionCall) -> LowerResult<Option<Object>> {
    if f.pos_args.len() != 2 {
        return Err(arity_error(&f.name, 2, f.pos_args.len()));
    }
    let Some((lhs, rhs)) = two_args(f) else {
        return Ok(None);
    };
    let (Object::Number(a), Object::Number(b)) = (lhs, rhs) else {
        return Err(LowerError::InvalidArguments(format!(
            "cannot order {} and {}",
            lhs.kind_name(),
            rhs.kind_name()
        )));
    };
    let value = match f.name.as_str() {
        "__lt__" => a < b,
        "__le__" => a <= b,
        "__gt__" => a > b,
        "__ge__" => a >= b,
        _ => unreachable!("fold_ordering called for {}", f.name),
    };
    Ok(Some(Object::Boolean(value)))
}

fn fold_contains(f: &FunctionCall) -> LowerResult<Option<Object>> {
    if f.pos_args.len() != 2 {
        return Err(arity_error(&f.name, 2, f.pos_args.len()));
    }
    let Some((needle, haystack)) = two_args(f) else {
        return Ok(None);
    };
    let contains = match haystack {
        Object::Array(elements) => elements.iter().any(|e| e.obj == *needle),
        Object::Dict(values) => match needle {
            Object::String(key) => values.contains_key(key),
            other => {
                return Err(LowerError::InvalidArguments(format!(
                    "dictionary membership needs a string, got {}",
                    other.kind_name()
                )))
            }
        },
        other => {
            return Err(LowerError::InvalidArguments(format!(
                "'in' needs an array or dictionary, got {}",
                other.kind_name()
            )))
        }
    };
    Ok(Some(Object::Boolean(match f.name.as_str() {
        "__in__" => contains,
        _ => !contains,
    })))
}

fn fold_logic(f: &FunctionCall) -> LowerResult<Option<Object>> {
    if f.pos_args.len() != 2 {
        return Err(arity_error(&f.name, 2, f.pos_args.len()));
    }
    let and = f.name == "__and__";

    // Short circuit on a literal left side
    if let Some(Object::Boolean(a)) = literal(&f.pos_args[0]) {
        if and && !a {
            return Ok(Some(Object::Boolean(false)));
        }
        if !and && *a {
            return Ok(Some(Object::Boolean(true)));
        }
    }

    let Some((lhs, rhs)) = two_args(f) else {
        return Ok(None);
    };
    let (Object::Boolean(a), Object::Boolean(b)) = (lhs, rhs) else {
        return Err(LowerError::InvalidArguments(format!(
            "logical operator on {} and {}",
            lhs.kind_name(),
            rhs.kind_name()
        )));
    };
    Ok(Some(Object::Boolean(if and { *a && *b } else { *a || *b })))
}

fn fold_subscript(f: &FunctionCall) -> LowerResult<Option<Object>> {
    if f.pos_args.len() != 2 {
        return Err(arity_error("subscript", 2, f.pos_args.len()));
    }
    let Some((holder, index)) = two_args(f) else {
        return Ok(None);
    };
    match (holder, index) {
        (Object::Array(elements), Object::Number(n)) => {
            let i = usize::try_from(*n).ok().filter(|i| *i < elements.len());
            match i {
                Some(i) => Ok(Some(elements[i].obj.clone())),
                None => Err(LowerError::InvalidArguments(format!(
                    "index {} out of range for array of {}",
                    n,
                    elements.len()
                ))),
            }
        }
        (Object::Dict(values), Object::String(key)) => match values.get(key) {
            Some(value) => Ok(Some(value.obj.clone())),
            None => Err(LowerError::InvalidArguments(format!(
                "key '{}' not in dictionary",
                key
            ))),
        },
        (a, b) => Err(LowerError::InvalidArguments(format!(
            "cannot index {} with {}",
            a.kind_name(),
            b.kind_name()
        ))),
    }
}

fn fold_ternary(f: &FunctionCall) -> LowerResult<Option<Object>> {
    if f.pos_args.len() != 3 {
        return Err(arity_error("ternary", 3, f.pos_args.len()));
    }
    match literal(&f.pos_args[0]) {
        Some(Object::Boolean(c)) => {
            let chosen = if *c { &f.pos_args[1] } else { &f.pos_args[2] };
            Ok(Some(chosen.obj.clone()))
        }
        Some(other) => Err(LowerError::InvalidArguments(format!(
            "ternary condition must be a boolean, got {}",
            other.kind_name()
        ))),
        None => Ok(None),
    }
}

//! Version string comparison for `string.version_compare()`.

use std::cmp::Ordering;

/// Comparison requested by the version constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lt,
    Le,
    Ne,
    Eq,
    Ge,
    Gt,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Ne => "!=",
            Operator::Eq => "==",
            Operator::Ge => ">=",
            Operator::Gt => ">",
        }
    }
}

/// Split a version string into its numeric components. Anything that does
/// not parse as a number compares as 0, so `1.2.rc1` orders like `1.2.0`.
fn components(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}

/// Compare two version strings component-wise, with missing components
/// treated as 0 (`1.2` == `1.2.0`).
pub fn compare(v1: &str, op: Operator, v2: &str) -> bool {
    let a = components(v1);
    let b = components(v2);
    let len = a.len().max(b.len());

    let mut ordering = Ordering::Equal;
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        ordering = x.cmp(&y);
        if ordering != Ordering::Equal {
            break;
        }
    }

    match op {
        Operator::Lt => ordering == Ordering::Less,
        Operator::Le => ordering != Ordering::Greater,
        Operator::Ne => ordering != Ordering::Equal,
        Operator::Eq => ordering == Ordering::Equal,
        Operator::Ge => ordering != Ordering::Less,
        Operator::Gt => ordering == Ordering::Greater,
    }
}

/// Parse the operator prefix of a constraint like `>= 1.2`, returning the
/// operator and the remaining version. An absent prefix means equality.
pub fn parse_constraint(raw: &str) -> (Operator, &str) {
    let trimmed = raw.trim_start();
    for (prefix, op) in [
        ("==", Operator::Eq),
        ("!=", Operator::Ne),
        (">=", Operator::Ge),
        ("<=", Operator::Le),
        (">", Operator::Gt),
        ("<", Operator::Lt),
    ] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            return (op, rest.trim_start());
        }
    }
    (Operator::Eq, trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_orderings() {
        assert!(compare("3.6", Operator::Lt, "3.7"));
        assert!(compare("3.7", Operator::Gt, "3.6"));
        assert!(compare("3.6", Operator::Eq, "3.6"));
        assert!(compare("3.6", Operator::Ne, "3.7"));
        assert!(compare("3.6", Operator::Le, "3.6"));
        assert!(compare("3.6", Operator::Ge, "3.6"));
    }

    #[test]
    fn numeric_not_lexicographic() {
        assert!(compare("1.10", Operator::Gt, "1.9"));
        assert!(compare("10.0", Operator::Gt, "9.99"));
    }

    #[test]
    fn missing_components_are_zero() {
        assert!(compare("1.2", Operator::Eq, "1.2.0"));
        assert!(compare("1.2.1", Operator::Gt, "1.2"));
    }

    #[test]
    fn constraint_parsing() {
        assert_eq!(parse_constraint(">= 1.2"), (Operator::Ge, "1.2"));
        assert_eq!(parse_constraint("<3.7"), (Operator::Lt, "3.7"));
        assert_eq!(parse_constraint("1.0"), (Operator::Eq, "1.0"));
    }
}

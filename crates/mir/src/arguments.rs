//! Compiler-agnostic command line arguments.
//!
//! Arguments given in compiler specific form (from the build definitions, or
//! from a source like pkg-config) are lowered into an agnostic form; the
//! backend asks the concrete compiler to specialize them back. This contrasts
//! with Meson's approach of using GCC-style arguments internally.

/// The kind of argument this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    /// A pre-processor define (`-D...`)
    Define,
    /// A library to link with (`-lfoo` or a path to an archive)
    Link,
    /// A path to search for libraries (`-L...`)
    LinkSearch,
    /// An include directory, further specialized by [`IncludeType`]
    Include,
    /// An argument we don't know how to classify, proxied along
    Raw,
}

/// Exactly what kind of include directory an [`ArgType::Include`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeType {
    /// A standard include, such as `-Ifoo`
    Base,
    /// A system include, such as `-isystem foo`
    System,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    value: String,
    typ: ArgType,
    include_type: IncludeType,
}

impl Argument {
    pub fn new(value: impl Into<String>, typ: ArgType) -> Self {
        Argument {
            value: value.into(),
            typ,
            include_type: IncludeType::Base,
        }
    }

    pub fn new_include(value: impl Into<String>, include_type: IncludeType) -> Self {
        Argument {
            value: value.into(),
            typ: ArgType::Include,
            include_type,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn typ(&self) -> ArgType {
        self.typ
    }

    pub fn include_type(&self) -> IncludeType {
        self.include_type
    }
}

//! Linker abstraction.
//!
//! Linkers are driven through the compiler binary on gnu-like toolchains,
//! so the interesting part is classification, not invocation.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

pub trait Linker: Debug + Send + Sync {
    /// Stable identifier of the linker family (`ld.bfd`, `ld.lld`, ...).
    fn id(&self) -> &'static str;

    /// The binary the link step is driven through.
    fn binary(&self) -> &Path;

    fn always_args(&self) -> Vec<String> {
        Vec::new()
    }
}

/// GNU bfd ld, driven through the compiler.
#[derive(Debug)]
pub struct GnuBfd {
    driver: PathBuf,
}

impl GnuBfd {
    pub fn new(driver: PathBuf) -> Self {
        GnuBfd { driver }
    }
}

impl Linker for GnuBfd {
    fn id(&self) -> &'static str {
        "ld.bfd"
    }

    fn binary(&self) -> &Path {
        &self.driver
    }
}

/// LLVM lld, driven through the compiler.
#[derive(Debug)]
pub struct Lld {
    driver: PathBuf,
}

impl Lld {
    pub fn new(driver: PathBuf) -> Self {
        Lld { driver }
    }
}

impl Linker for Lld {
    fn id(&self) -> &'static str {
        "ld.lld"
    }

    fn binary(&self) -> &Path {
        &self.driver
    }
}

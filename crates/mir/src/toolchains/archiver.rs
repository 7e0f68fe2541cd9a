//! Archiver abstraction for static libraries.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

pub trait Archiver: Debug + Send + Sync {
    fn id(&self) -> &'static str;

    fn binary(&self) -> &Path;

    fn always_args(&self) -> Vec<String> {
        vec!["csr".to_owned()]
    }
}

#[derive(Debug)]
pub struct GnuAr {
    binary: PathBuf,
}

impl GnuAr {
    pub fn new(binary: PathBuf) -> Self {
        GnuAr { binary }
    }
}

impl Archiver for GnuAr {
    fn id(&self) -> &'static str {
        "ar"
    }

    fn binary(&self) -> &Path {
        &self.binary
    }
}

//! Test record serialization.
//!
//! Registered tests are handed to the test runner through a line-oriented
//! ASCII file. The format is versioned; a reader for a different version
//! refuses the file rather than guessing.

use std::fmt::Write as _;

use thiserror::Error;

const SERIAL_VERSION: i64 = 0;

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("malformed test serialization: {0}")]
    Malformed(String),

    #[error("test serialization for a different version of boson (got {0})")]
    VersionMismatch(i64),
}

/// One registered test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Test {
    pub name: String,
    /// Path of the executable, relative to the build directory.
    pub exe: String,
    pub arguments: Vec<String>,
    pub should_fail: bool,
}

impl Test {
    pub fn serialize(&self, out: &mut String) {
        // A bare name must stay invocable from the build dir
        let exe = if self.exe.contains('/') {
            self.exe.clone()
        } else {
            format!("./{}", self.exe)
        };

        out.push_str("BEGIN_TEST\n");
        let _ = writeln!(out, "  name:{}", self.name);
        let _ = writeln!(out, "  exe:{}", exe);
        for arg in &self.arguments {
            let _ = writeln!(out, "  arg:{}", arg);
        }
        let _ = writeln!(out, "  xfail:{}", u8::from(self.should_fail));
        out.push_str("END_TEST\n");
    }
}

pub fn serialize_tests(tests: &[Test]) -> String {
    let mut out = format!("SERIAL_VERSION:{}\n", SERIAL_VERSION);
    for test in tests {
        test.serialize(&mut out);
    }
    out
}

pub fn deserialize_tests(input: &str) -> Result<Vec<Test>, RecordError> {
    let mut lines = input.lines();

    let header = lines
        .next()
        .ok_or_else(|| RecordError::Malformed("empty input".to_owned()))?;
    let (key, value) = header
        .split_once(':')
        .ok_or_else(|| RecordError::Malformed(header.to_owned()))?;
    if key != "SERIAL_VERSION" {
        return Err(RecordError::Malformed(format!(
            "first line is not a version: {}",
            header
        )));
    }
    let version: i64 = value
        .parse()
        .map_err(|_| RecordError::Malformed(header.to_owned()))?;
    if version != SERIAL_VERSION {
        return Err(RecordError::VersionMismatch(version));
    }

    let mut out = Vec::new();
    let mut test = Test::default();
    for line in lines {
        match line {
            "BEGIN_TEST" => test = Test::default(),
            "END_TEST" => out.push(std::mem::take(&mut test)),
            _ => {
                let (key, value) = line
                    .trim_start()
                    .split_once(':')
                    .ok_or_else(|| RecordError::Malformed(line.to_owned()))?;
                match key {
                    "name" => test.name = value.to_owned(),
                    "exe" => test.exe = value.to_owned(),
                    "arg" => test.arguments.push(value.to_owned()),
                    "xfail" => test.should_fail = value == "1",
                    _ => return Err(RecordError::Malformed(line.to_owned())),
                }
            }
        }
    }

    Ok(out)
}

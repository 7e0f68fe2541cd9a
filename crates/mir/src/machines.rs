//! The three-machine model: build, host, and target.

use serde::{Deserialize, Serialize};

/// Which of the three machines is being referred to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Machine {
    Build,
    Host,
    Target,
}

/// The operating system kernel in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kernel {
    Linux,
}

/// Byte order of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endian {
    Big,
    Little,
}

/// Information about one of the three machines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub machine: Machine,
    pub kernel: Kernel,
    pub endian: Endian,
    pub cpu_family: String,
    pub cpu: String,
}

impl Info {
    pub fn new(machine: Machine, kernel: Kernel, endian: Endian, cpu_family: &str) -> Self {
        Info {
            machine,
            kernel,
            endian,
            cpu_family: cpu_family.to_owned(),
            cpu: cpu_family.to_owned(),
        }
    }

    pub fn system(&self) -> &'static str {
        match self.kernel {
            Kernel::Linux => "linux",
        }
    }
}

/// A value tracked per machine, with the meson fallback chain:
/// target falls back to host, host falls back to build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerMachine<T> {
    build: T,
    host: Option<T>,
    target: Option<T>,
}

impl<T> PerMachine<T> {
    pub fn new(build: T) -> Self {
        PerMachine {
            build,
            host: None,
            target: None,
        }
    }

    pub fn build(&self) -> &T {
        &self.build
    }

    pub fn build_mut(&mut self) -> &mut T {
        &mut self.build
    }

    pub fn host(&self) -> &T {
        self.host.as_ref().unwrap_or(&self.build)
    }

    pub fn target(&self) -> &T {
        self.target.as_ref().unwrap_or_else(|| self.host())
    }

    pub fn get(&self, machine: Machine) -> &T {
        match machine {
            Machine::Build => self.build(),
            Machine::Host => self.host(),
            Machine::Target => self.target(),
        }
    }

    pub fn set(&mut self, machine: Machine, value: T) {
        match machine {
            Machine::Build => self.build = value,
            Machine::Host => self.host = Some(value),
            Machine::Target => self.target = Some(value),
        }
    }
}

impl<T: Default> Default for PerMachine<T> {
    fn default() -> Self {
        PerMachine::new(T::default())
    }
}

/// Detect the build machine. All of this is known at compile time.
pub fn detect_build() -> Info {
    let endian = if cfg!(target_endian = "little") {
        Endian::Little
    } else {
        Endian::Big
    };

    let cpu_family = match std::env::consts::ARCH {
        "x86_64" => "x86_64",
        "x86" => "x86",
        "aarch64" => "aarch64",
        "arm" => "arm",
        "riscv64" => "riscv64",
        other => other,
    };

    Info::new(Machine::Build, Kernel::Linux, endian, cpu_family)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_falls_back_to_build() {
        let pm = PerMachine::new(1);
        assert_eq!(*pm.host(), 1);
        assert_eq!(*pm.target(), 1);
    }

    #[test]
    fn target_falls_back_to_host() {
        let mut pm = PerMachine::new(1);
        pm.set(Machine::Host, 2);
        assert_eq!(*pm.build(), 1);
        assert_eq!(*pm.host(), 2);
        assert_eq!(*pm.target(), 2);
    }

    #[test]
    fn explicit_target_wins() {
        let mut pm = PerMachine::new(1);
        pm.set(Machine::Target, 3);
        assert_eq!(*pm.get(Machine::Target), 3);
    }

    #[test]
    fn build_info_is_sensible() {
        let info = detect_build();
        assert_eq!(info.machine, Machine::Build);
        assert_eq!(info.system(), "linux");
        assert!(!info.cpu_family.is_empty());
    }
}

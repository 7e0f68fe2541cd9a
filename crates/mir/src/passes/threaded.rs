//! Probe lowering.
//!
//! `find_program()` and `dependency()` hit the filesystem and external
//! tools, so they are handled differently from every other lowering: a
//! first walk over the whole program gathers the outstanding lookups, the
//! probes fan out across a thread pool, the results land in the persistent
//! caches, and a second walk rewrites the calls from the caches on the
//! driver thread. The CFG is never touched from a worker.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use sha2::{Digest, Sha256};

use colored::Colorize;

use crate::cfg::Cfg;
use crate::machines::Machine;
use crate::object::{Dependency, Disabler, Instruction, Message, Object, Program};
use crate::process::{self, PROBE_TIMEOUT};
use crate::state::{CachedDependency, Persistant};
use crate::version;

use super::extractors::{all_args_reduced, kw_bool, kw_string, variadic_strings};
use super::walkers::function_walker;
use super::{block_walker, with_instructions};

/// One outstanding probe. The fingerprint keys the result caches, so
/// identical requests are probed once per configuration ever.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Job {
    Program { names: Vec<String> },
    Dependency { name: String, constraint: String },
}

impl Job {
    fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        match self {
            Job::Program { names } => {
                hasher.update(b"find_program");
                for n in names {
                    hasher.update(b":");
                    hasher.update(n.as_bytes());
                }
            }
            Job::Dependency { name, constraint } => {
                hasher.update(b"dependency:");
                hasher.update(name.as_bytes());
                hasher.update(b":");
                hasher.update(constraint.as_bytes());
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

enum JobResult {
    Program(Option<PathBuf>),
    Dependency(CachedDependency),
}

fn is_free_call<'a>(inst: &'a Instruction, name: &str) -> Option<&'a crate::object::FunctionCall> {
    match &inst.obj {
        Object::FunctionCall(f)
            if f.holder.is_none()
                && f.name == name
                && all_args_reduced(&f.pos_args, &f.kw_args) =>
        {
            Some(f)
        }
        _ => None,
    }
}

/// Walk the program and collect every probe that can run.
fn gather_jobs(cfg: &mut Cfg, pstate: &Persistant) -> Vec<Job> {
    let mut jobs: BTreeMap<String, Job> = BTreeMap::new();

    let entry = cfg.entry();
    block_walker(cfg, entry, &mut |cfg, node| {
        with_instructions(cfg, node, |instructions| {
            function_walker(instructions, &mut |inst| {
                if let Some(f) = is_free_call(inst, "find_program") {
                    if let Ok(names) = variadic_strings(
                        &f.pos_args,
                        "find_program: arguments must be strings",
                    ) {
                        let known = names
                            .iter()
                            .any(|n| pstate.programs.build().contains_key(n));
                        if !names.is_empty() && !known {
                            let job = Job::Program { names };
                            jobs.insert(job.fingerprint(), job);
                        }
                    }
                }
                if let Some(f) = is_free_call(inst, "dependency") {
                    if let (Some(Object::String(name)), Ok(constraint)) = (
                        f.pos_args.first().map(|a| &a.obj),
                        kw_string(&f.kw_args, "version", "dependency: 'version' must be a string"),
                    ) {
                        let job = Job::Dependency {
                            name: name.clone(),
                            constraint: constraint.unwrap_or_default(),
                        };
                        if !pstate.dependencies.contains_key(&job.fingerprint()) {
                            jobs.insert(job.fingerprint(), job);
                        }
                    }
                }
                None
            });
            false
        })
    });

    jobs.into_values().collect()
}

/// Search PATH for the first of `names` that exists.
fn find_program(names: &[String]) -> Option<PathBuf> {
    let path = std::env::var("PATH").unwrap_or_default();
    for name in names {
        for dir in std::env::split_paths(&path) {
            let trial = dir.join(name);
            if trial.is_file() {
                return Some(trial);
            }
        }
    }
    None
}

/// Query pkg-config for a dependency.
fn find_dependency(name: &str, constraint: &str) -> CachedDependency {
    let pkgconfig = Path::new("pkg-config");
    let Some(version_out) = process::run(pkgconfig, &["--modversion", name], PROBE_TIMEOUT) else {
        return CachedDependency::default();
    };
    if !version_out.success() {
        return CachedDependency::default();
    }
    let found_version = version_out.stdout.trim().to_owned();

    if !constraint.is_empty() {
        let cleaned: String = constraint.chars().filter(|c| !c.is_whitespace()).collect();
        let (op, wanted) = version::parse_constraint(&cleaned);
        if !version::compare(&found_version, op, wanted) {
            return CachedDependency {
                found: false,
                version: found_version,
                ..CachedDependency::default()
            };
        }
    }

    let flags = |args: &[&str]| -> Vec<String> {
        process::run(pkgconfig, args, PROBE_TIMEOUT)
            .filter(|o| o.success())
            .map(|o| o.stdout.split_whitespace().map(str::to_owned).collect())
            .unwrap_or_default()
    };

    CachedDependency {
        found: true,
        version: found_version,
        compile_args: flags(&["--cflags", name]),
        link_args: flags(&["--libs", name]),
    }
}

fn run_jobs(jobs: Vec<Job>, pstate: &mut Persistant) {
    let results: Vec<(Job, JobResult)> = jobs
        .into_par_iter()
        .map(|job| {
            let result = match &job {
                Job::Program { names } => JobResult::Program(find_program(names)),
                Job::Dependency { name, constraint } => {
                    JobResult::Dependency(find_dependency(name, constraint))
                }
            };
            (job, result)
        })
        .collect();

    for (job, result) in results {
        match (job, result) {
            (Job::Program { names }, JobResult::Program(path)) => {
                let display = &names[0];
                match &path {
                    Some(p) => println!(
                        "Found program \"{}\": {} ({})",
                        display,
                        "YES".green(),
                        p.display()
                    ),
                    None => println!("Found program \"{}\": {}", display, "NO".red()),
                }
                let map = pstate.programs.build_mut();
                for name in names {
                    map.entry(name).or_insert_with(|| path.clone().unwrap_or_default());
                }
            }
            (job @ Job::Dependency { .. }, JobResult::Dependency(dep)) => {
                let Job::Dependency { name, .. } = &job else {
                    unreachable!()
                };
                println!(
                    "Dependency \"{}\" found: {}{}",
                    name,
                    if dep.found { "YES".green() } else { "NO".red() },
                    if dep.found {
                        format!(" ({})", dep.version)
                    } else {
                        String::new()
                    }
                );
                pstate.dependencies.insert(job.fingerprint(), dep);
            }
            _ => unreachable!("job and result kinds always match"),
        }
    }
}

/// Rewrite resolved calls from the caches.
fn replace_from_caches(cfg: &mut Cfg, pstate: &Persistant) -> bool {
    let entry = cfg.entry();
    block_walker(cfg, entry, &mut |cfg, node| {
        with_instructions(cfg, node, |instructions| {
            function_walker(instructions, &mut |inst| {
                if let Some(f) = is_free_call(inst, "find_program") {
                    let names = variadic_strings(&f.pos_args, "").ok()?;
                    let name = names.into_iter().next()?;
                    let path = pstate.programs.build().get(&name)?.clone();

                    let required =
                        kw_bool(&f.kw_args, "required", "find_program: 'required' must be a boolean")
                            .unwrap_or(Some(true))
                            .unwrap_or(true);
                    if required && path.as_os_str().is_empty() {
                        return Some(Instruction::new(Object::Message(Message::error(
                            format!("could not find required program \"{}\"", name),
                        ))));
                    }
                    return Some(Instruction::new(Object::Program(Program {
                        name,
                        for_machine: Machine::Build,
                        path,
                    })));
                }

                if let Some(f) = is_free_call(inst, "dependency") {
                    let Some(Object::String(name)) = f.pos_args.first().map(|a| &a.obj) else {
                        return None;
                    };
                    let constraint = kw_string(&f.kw_args, "version", "")
                        .ok()?
                        .unwrap_or_default();
                    let job = Job::Dependency {
                        name: name.clone(),
                        constraint,
                    };
                    let cached = pstate.dependencies.get(&job.fingerprint())?;

                    let required =
                        kw_bool(&f.kw_args, "required", "dependency: 'required' must be a boolean")
                            .unwrap_or(Some(true))
                            .unwrap_or(true);
                    if required && !cached.found {
                        return Some(Instruction::new(Object::Message(Message::error(
                            format!("dependency \"{}\" not found", name),
                        ))));
                    }

                    // An optional dependency can ask to come back as a
                    // disabler, which then swallows every target built on it
                    let as_disabler =
                        kw_bool(&f.kw_args, "disabler", "dependency: 'disabler' must be a boolean")
                            .unwrap_or(Some(false))
                            .unwrap_or(false);
                    if as_disabler && !cached.found {
                        return Some(Instruction::new(Object::Disabler(Disabler)));
                    }

                    let generalize = pstate
                        .toolchains
                        .get(&crate::toolchains::Language::Cpp)
                        .map(|tc| &tc.build().compiler);
                    let arguments = cached
                        .compile_args
                        .iter()
                        .chain(cached.link_args.iter())
                        .map(|raw| match &generalize {
                            Some(compiler) => compiler.generalize_argument(raw),
                            None => crate::arguments::Argument::new(
                                raw,
                                crate::arguments::ArgType::Raw,
                            ),
                        })
                        .collect();

                    return Some(Instruction::new(Object::Dependency(Dependency {
                        name: name.clone(),
                        found: cached.found,
                        version: cached.version.clone(),
                        arguments,
                    })));
                }

                None
            })
        })
    })
}

/// Run every outstanding probe and rewrite the calls they resolve.
pub fn threaded_lowering(cfg: &mut Cfg, pstate: &mut Persistant) -> bool {
    let jobs = gather_jobs(cfg, pstate);
    if !jobs.is_empty() {
        run_jobs(jobs, pstate);
    }
    replace_from_caches(cfg, pstate)
}

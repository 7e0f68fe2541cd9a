//! Backend handoff for the boson configuration engine.
//!
//! The pass pipeline leaves a flat list of resolved build artifacts; this
//! crate turns it into backend-neutral records. Target records describe
//! compile, archive, link, and custom rules; test records serialize to the
//! versioned line format the test runner loads back.

pub mod fir;
pub mod test_records;

pub use fir::{mir_to_fir, FirError, Target, TargetType};
pub use test_records::{deserialize_tests, serialize_tests, RecordError, Test};

#[cfg(test)]
mod tests {
    use super::*;
    use boson_mir::machines::PerMachine;
    use boson_mir::object::{ArgMap, Executable, File, Object, Source, Test as MirTest};
    use boson_mir::toolchains::archiver::GnuAr;
    use boson_mir::toolchains::compiler::GnuLikeCpp;
    use boson_mir::toolchains::linker::GnuBfd;
    use boson_mir::toolchains::{Language, Toolchain};
    use boson_mir::{Instruction, Persistant};
    use std::sync::Arc;

    fn test_state() -> Persistant {
        let mut pstate = Persistant::new("/src".into(), "/src/build".into());
        let toolchain = Toolchain {
            compiler: Box::new(GnuLikeCpp::gnu(
                "/usr/bin/g++".into(),
                "g++ (GCC) 13.2.0".into(),
            )),
            linker: Box::new(GnuBfd::new("/usr/bin/g++".into())),
            archiver: Box::new(GnuAr::new("/usr/bin/ar".into())),
        };
        pstate
            .toolchains
            .insert(Language::Cpp, PerMachine::new(Arc::new(toolchain)));
        pstate
    }

    fn exe(name: &str, source: &str) -> Instruction {
        Instruction::new(Object::Executable(Executable {
            name: name.to_owned(),
            sources: vec![Source::File(File::new(
                source,
                "",
                false,
                "/src",
                "/src/build",
            ))],
            machine: boson_mir::machines::Machine::Build,
            subdir: "".into(),
            arguments: ArgMap::new(),
            link_static: vec![],
        }))
    }

    #[test]
    fn executable_gets_compile_and_link_rules() {
        let pstate = test_state();
        let stream = vec![exe("demo", "main.cpp")];
        let (targets, tests) = mir_to_fir(&stream, &pstate).unwrap();

        assert!(tests.is_empty());
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].typ, TargetType::Compile);
        assert_eq!(targets[0].output, vec!["demo.p/main.cpp.o"]);
        assert_eq!(targets[1].typ, TargetType::Link);
        assert_eq!(targets[1].output, vec!["demo"]);
        assert_eq!(targets[1].input, targets[0].output);
    }

    #[test]
    fn non_source_files_are_not_compiled() {
        let pstate = test_state();
        let mut instruction = exe("demo", "main.cpp");
        if let Object::Executable(e) = &mut instruction.obj {
            e.sources.push(Source::File(File::new(
                "util.hpp",
                "",
                false,
                "/src",
                "/src/build",
            )));
        }
        let (targets, _) = mir_to_fir(&[instruction], &pstate).unwrap();
        let compiles = targets
            .iter()
            .filter(|t| t.typ == TargetType::Compile)
            .count();
        assert_eq!(compiles, 1);
    }

    #[test]
    fn tests_are_collected() {
        let pstate = test_state();
        let stream = vec![Instruction::new(Object::Test(MirTest {
            name: "smoke".to_owned(),
            exe: "demo".to_owned(),
            arguments: vec![],
            should_fail: false,
        }))];
        let (targets, tests) = mir_to_fir(&stream, &pstate).unwrap();
        assert!(targets.is_empty());
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].name, "smoke");
    }

    #[test]
    fn an_error_in_the_stream_is_refused() {
        let pstate = test_state();
        let stream = vec![Instruction::new(Object::Message(
            boson_mir::object::Message::error("boom"),
        ))];
        assert!(matches!(
            mir_to_fir(&stream, &pstate),
            Err(FirError::ErrorInStream(_))
        ));
    }
}

//! Benchmark the pass pipeline on a synthetic program.

use criterion::{criterion_group, criterion_main, Criterion};
use std::path::Path;

use boson_mir::{lower_ast, lower_pipeline, Persistant};

fn source(branches: usize) -> String {
    let mut out = String::from("x = 0\n");
    for i in 0..branches {
        out.push_str(&format!(
            "if x == {i}\n  x = x + 1\nelse\n  x = x + 2\nendif\n"
        ));
    }
    out.push_str("message('done')\n");
    out
}

fn bench_pipeline(c: &mut Criterion) {
    let program = source(32);
    let ast = boson_parser::parse(&program).expect("benchmark source parses");

    c.bench_function("lower_pipeline/32_branches", |b| {
        b.iter(|| {
            let mut cfg = lower_ast(&ast, Path::new("")).expect("lowers");
            let mut pstate = Persistant::new("/src".into(), "/src/build".into());
            lower_pipeline(&mut cfg, &mut pstate);
            cfg
        })
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);

//! Tracing pipeline benchmarks
//!
//! Measures each stage on canonical teaching snippets:
//! - Instrumentation (parse, rewrite, print)
//! - Sandboxed execution of the instrumented program
//! - Reduction of raw events into frames

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stepwise_runtime::{frames_from_events, instrument_source, Tracer};

const LOOP: &str = "let total = 0;\nfor (let i = 0; i < 200; i++) {\n  if (i % 3 == 0) { total += i; }\n}";

const RECURSION: &str = "function fib(n) {\n  if (n < 2) { return n; }\n  return fib(n - 1) + fib(n - 2);\n}\nfib(12);";

const OBJECTS: &str = r#"
class Stack {
  constructor() { this.items = []; }
  push(x) { this.items.push(x); return this.items.length; }
}
let s = new Stack();
for (let i = 0; i < 50; i++) { s.push({id: i, tags: ["a", "b"]}); }
console.log(s.items.length);
"#;

const PROGRAMS: [(&str, &str); 3] = [("loop", LOOP), ("recursion", RECURSION), ("objects", OBJECTS)];

fn bench_instrument(c: &mut Criterion) {
    let mut group = c.benchmark_group("instrument");
    for (name, source) in PROGRAMS {
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, source| {
            b.iter(|| instrument_source(black_box(source)))
        });
    }
    group.finish();
}

fn bench_trace(c: &mut Criterion) {
    let tracer = Tracer::new();
    let mut group = c.benchmark_group("trace");
    for (name, source) in PROGRAMS {
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, source| {
            b.iter(|| tracer.trace(black_box(source)))
        });
    }
    group.finish();
}

fn bench_reduce(c: &mut Criterion) {
    let tracer = Tracer::new();
    let mut group = c.benchmark_group("reduce");
    for (name, source) in PROGRAMS {
        let events = match tracer.raw_events(source) {
            Ok(events) => events,
            Err(error) => panic!("benchmark program {} failed: {}", name, error),
        };
        group.bench_with_input(BenchmarkId::from_parameter(name), &events, |b, events| {
            b.iter(|| frames_from_events(black_box(events)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_instrument, bench_trace, bench_reduce);
criterion_main!(benches);

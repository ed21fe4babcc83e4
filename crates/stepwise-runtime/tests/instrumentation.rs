//! Instrumented programs must compute exactly what the original computes
//!
//! Every case runs twice on a bare interpreter: once as written, once after
//! instrumentation with the probe runtime installed. The global `result` must
//! match.

mod common;

use common::*;
use common::assert_eq;
use rstest::rstest;
use stepwise_runtime::{
    instrument_source, parse_source, Interpreter, ProbeRecorder, TraceError, Tracer, Value,
};

fn run(source: &str, probes: bool) -> (Value, Interpreter) {
    let program = parse_source(source).expect("source parses");
    let mut interpreter = Interpreter::new();
    if probes {
        interpreter.install_probe_runtime(ProbeRecorder::default());
    }
    interpreter.eval(&program).expect("program runs");
    let result = interpreter.global("result").expect("result is defined");
    (result, interpreter)
}

#[rstest]
#[case::arithmetic("let result = 1 + 2 * 3;")]
#[case::for_loop("let result = 0; for (let i = 0; i < 10; i++) { result += i; }")]
#[case::for_without_test("let result = 0; for (;;) { result++; if (result > 3) break; }")]
#[case::continue_runs_update(
    "let result = 0; for (let i = 0; i < 6; i++) { if (i % 3 == 0) continue; result += i; }"
)]
#[case::labeled_continue(
    "let result = 0; outer: for (let i = 0; i < 3; i++) { for (let j = 0; j < 3; j++) { if (j == 1) continue outer; result += 10 * i + j; } }"
)]
#[case::while_loop("let result = 1; while (result < 100) { result *= 3; }")]
#[case::for_of("let result = ''; for (const c of ['a', 'b']) { result += c; }")]
#[case::closures(
    "function counter() { let n = 0; return () => { n++; return n; }; } let next = counter(); next(); let result = next();"
)]
#[case::recursion("function fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } let result = fib(10);")]
#[case::classes(
    "class P { constructor(x) { this.x = x; } double() { return this.x * 2; } } let p = new P(21); let result = p.double();"
)]
#[case::short_circuit("let calls = 0; function hit() { calls++; return true; } let result = (false && hit()) || calls;")]
#[case::conditions_evaluated_once(
    "let n = 0; function bump() { n++; return n; } if (bump() > 5) { n = 100; } else if (bump() > 5) { n = 200; } let result = n;"
)]
#[case::array_methods("let result = [3, 1, 2].map((x) => x * 2).filter((x) => x > 2).join('-');")]
#[case::var_in_block("if (true) { var y = 1; } let result = y;")]
#[case::var_in_for_head("let fs = []; for (var i = 0; i < 3; i++) { fs.push(() => i); } let result = fs[0]() + ' ' + fs[2]();")]
#[case::for_let_closures(
    "let fs = []; for (let i = 0; i < 3; i++) { fs.push(() => i); } let result = fs[0]() + ' ' + fs[2]();"
)]
#[case::for_let_closures_with_continue(
    "let fs = []; for (let i = 0; i < 6; i++) { i++; fs.push(() => i); if (i == 3) continue; } let result = fs.map((f) => f()).join(',');"
)]
fn instrumentation_preserves_results(#[case] source: &str) {
    let (expected, _) = run(source, false);
    let instrumented = instrument_source(source).expect("instruments");
    let (actual, interpreter) = run(&instrumented, true);

    assert_eq!(actual, expected, "instrumented source:\n{}", instrumented);
    assert!(!interpreter.recorder().events().is_empty());
}

fn printed(source: &str) -> Vec<String> {
    trace(source)
        .into_iter()
        .flat_map(|frame| frame.stdout)
        .collect()
}

#[test]
fn var_declared_in_a_block_is_visible_after_it() {
    assert_eq!(printed("if (true) { var y = 1; }\nconsole.log(y);"), vec!["1"]);
}

#[test]
fn each_for_let_iteration_has_its_own_binding() {
    let source = "let fs = [];\nfor (let i = 0; i < 3; i++) {\n  fs.push(() => i);\n}\nconsole.log(fs[0](), fs[2]());";
    assert_eq!(printed(source), vec!["0 2"]);
    let (result, _) = run(
        "let fs = []; for (let i = 0; i < 3; i++) { fs.push(() => i); } let result = fs[0]() + ' ' + fs[2]();",
        false,
    );
    assert_eq!(result, Value::string("0 2"));
}

#[test]
fn instrumenting_twice_changes_nothing() {
    let once = instrument_source("let a = 1; if (a) { a = 2; }").unwrap();
    let twice = instrument_source(&once).unwrap();
    assert_eq!(once, twice);
}

#[rstest]
#[case("let __record = 1;")]
#[case("function f(__snapshot) {}")]
#[case("let __t3 = 0;")]
#[case("__stepwise_body0: { }")]
fn reserved_names_are_rejected(#[case] source: &str) {
    let err = Tracer::new().trace(source).unwrap_err();
    match err {
        TraceError::Instrumentation(error) => {
            assert_eq!(error.diagnostics[0].code, "SW3001");
        }
        other => panic!("expected instrumentation error, got {:?}", other),
    }
}

#[test]
fn syntax_errors_surface_as_diagnostics() {
    let err = Tracer::new().trace("let x = ;").unwrap_err();
    assert!(matches!(err, TraceError::Instrumentation(_)));
    assert_eq!(err.line(), Some(1));
}

#[test]
fn instrumented_source_is_exposed() {
    let tracer = Tracer::new();
    let out = tracer.instrument_source("let x = 1;").unwrap();
    insta::assert_snapshot!(out, @r#"
    let x = 1;
    __record({ kind: "declare", line: 1, vars: { x: __snapshot(x) } });
    "#);
}

//! Probe statement builders
//!
//! Every probe is a call `__record({kind: "...", line: N, ...})` whose payload
//! fields hold `__snapshot(...)` calls, so values are frozen at the moment the
//! probe runs.

use crate::ast::*;
use crate::probe::{RECORD_FN, SNAPSHOT_FN};
use crate::span::Span;

/// `__snapshot(expr)`
pub(super) fn snapshot(expr: Expr) -> Expr {
    let span = expr.span();
    Expr::call(Expr::ident(SNAPSHOT_FN, span), vec![expr], span)
}

fn field(key: &str, value: Expr) -> Property {
    let span = value.span();
    Property {
        key: key.to_string(),
        value,
        span,
    }
}

fn object(properties: Vec<Property>, span: Span) -> Expr {
    Expr::Object(ObjectLiteral { properties, span })
}

/// `__record({kind, line, ...fields})` as an expression
fn record(kind: &str, span: Span, fields: Vec<Property>) -> Expr {
    let mut properties = vec![
        field("kind", Expr::string(kind, span)),
        field("line", Expr::number(f64::from(span.line), span)),
    ];
    properties.extend(fields);
    Expr::call(
        Expr::ident(RECORD_FN, span),
        vec![object(properties, span)],
        span,
    )
}

/// `{name: __snapshot(value)}`
fn single_var(name: &str, value: Expr, span: Span) -> Expr {
    object(vec![field(name, snapshot(value))], span)
}

pub(super) fn call(name: &str, params: &[Identifier], span: Span) -> Stmt {
    let args = params
        .iter()
        .map(|param| field(&param.name, snapshot(Expr::ident(&param.name, param.span))))
        .collect();
    Stmt::expr(record(
        "call",
        span,
        vec![
            field("name", Expr::string(name, span)),
            field("args", object(args, span)),
        ],
    ))
}

/// Return probe; `None` records a bare return
pub(super) fn ret(value: Option<Expr>, span: Span) -> Stmt {
    let fields = value
        .map(|value| vec![field("value", snapshot(value))])
        .unwrap_or_default();
    Stmt::expr(record("return", span, fields))
}

pub(super) fn declare(name: &str, span: Span) -> Stmt {
    Stmt::expr(record(
        "declare",
        span,
        vec![field("vars", single_var(name, Expr::ident(name, span), span))],
    ))
}

/// Assign probe for `key`, read back through `value`
pub(super) fn assign(key: &str, value: Expr, span: Span) -> Stmt {
    Stmt::expr(record(
        "assign",
        span,
        vec![field("vars", single_var(key, value, span))],
    ))
}

pub(super) fn test(text: &str, temp: &str, span: Span) -> Stmt {
    Stmt::expr(record(
        "test",
        span,
        vec![
            field("test", Expr::string(text, span)),
            field("result", snapshot(Expr::ident(temp, span))),
        ],
    ))
}

pub(super) fn looped(kind: &str, span: Span) -> Stmt {
    Stmt::expr(record("loop", span, vec![field("loop", Expr::string(kind, span))]))
}

pub(super) fn class(name: &str, span: Span) -> Stmt {
    Stmt::expr(record("class", span, vec![field("name", Expr::string(name, span))]))
}

/// Replacement for a print call; evaluates to `undefined`
pub(super) fn stdout(args: Vec<Expr>, span: Span) -> Expr {
    let parts = args.into_iter().map(snapshot).collect();
    record(
        "stdout",
        span,
        vec![field("output", Expr::Array(ArrayLiteral { elements: parts, span }))],
    )
}

/// `let name = value;`
pub(super) fn temp_decl(name: &str, value: Expr, span: Span) -> Stmt {
    Stmt::VarDecl(VarDecl {
        kind: DeclKind::Let,
        declarators: vec![Declarator {
            name: Identifier::new(name, span),
            init: Some(value),
            span,
        }],
        span,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::{print_expr, print_program};

    fn line(n: u32) -> Span {
        Span::new(0, 0, n)
    }

    fn print(stmt: Stmt) -> String {
        print_program(&Program {
            statements: vec![stmt],
        })
        .trim_end()
        .to_string()
    }

    #[test]
    fn test_call_probe_snapshots_each_parameter() {
        let params = vec![
            Identifier::new("a", line(1)),
            Identifier::new("b", line(1)),
        ];
        insta::assert_snapshot!(print(call("add", &params, line(1))), @r#"__record({ kind: "call", line: 1, name: "add", args: { a: __snapshot(a), b: __snapshot(b) } });"#);
    }

    #[test]
    fn test_bare_return_has_no_value_field() {
        insta::assert_snapshot!(print(ret(None, line(4))), @r#"__record({ kind: "return", line: 4 });"#);
    }

    #[test]
    fn test_assign_probe_on_this() {
        insta::assert_snapshot!(print(assign("this", Expr::This(line(2)), line(2))), @r#"__record({ kind: "assign", line: 2, vars: { this: __snapshot(this) } });"#);
    }

    #[test]
    fn test_stdout_probe() {
        let args = vec![Expr::string("a", line(3)), Expr::ident("x", line(3))];
        insta::assert_snapshot!(print_expr(&stdout(args, line(3))), @r#"__record({ kind: "stdout", line: 3, output: [__snapshot("a"), __snapshot(x)] })"#);
    }
}

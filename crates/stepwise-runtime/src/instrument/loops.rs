//! Classic `for` desugaring
//!
//! ```text
//! for (init; test; update) body
//! ```
//!
//! becomes
//!
//! ```text
//! {
//!     init; <probe>
//!     while (true) {
//!         <loop probe>
//!         let __tN = test; <test probe>
//!         if (!__tN) break;
//!         __stepwise_bodyN: { body }
//!         update; <probe>
//!     }
//! }
//! ```
//!
//! so the test and the update get their own probes. A `continue` aimed at the
//! loop turns into `break __stepwise_bodyN`, which still runs the update.
//!
//! When the body creates functions, each `let` of the head is copied into the
//! body so closures capture that iteration's value:
//!
//! ```text
//! let __stepwise_iterK = i;
//! {
//!     let i = __stepwise_iterK;
//!     __stepwise_bodyN: { body }
//!     __stepwise_iterK = i;
//! }
//! i = __stepwise_iterK;
//! ```

use super::scan::{self, BODY_LABEL_PREFIX, TEST_TEMP_PREFIX};
use super::{probes, Instrumenter};
use crate::ast::*;
use crate::printer::print_expr;
use crate::span::Span;

impl Instrumenter {
    /// Rewrite a `for` statement; `labels` are the labels written directly on it
    pub(super) fn desugar_for(&mut self, for_stmt: ForStmt, labels: Vec<Identifier>) -> Stmt {
        let ForStmt {
            init,
            cond,
            update,
            body,
            span,
        } = for_stmt;

        let body_label = self.temp(&format!("{}body", BODY_LABEL_PREFIX));
        let label_names: Vec<&str> = labels.iter().map(|l| l.name.as_str()).collect();
        let mut body = *body;
        retarget_continues(&mut body, &label_names, &body_label, false);
        let copied = if scan::scan_stmt(&body).has_closures {
            head_bindings(init.as_deref())
        } else {
            Vec::new()
        };

        let mut outer = Vec::new();
        if let Some(init) = init {
            outer.extend(self.instrument_stmt(*init));
        }

        let mut iteration = vec![probes::looped("for", span)];
        if let Some(mut cond) = cond {
            let text = print_expr(&cond);
            let test_span = cond.span();
            self.instrument_expr(&mut cond, None);
            let temp = self.temp(TEST_TEMP_PREFIX);
            iteration.push(probes::temp_decl(&temp, cond, test_span));
            iteration.push(probes::test(&text, &temp, test_span));
            iteration.push(Stmt::If(IfStmt {
                cond: Expr::Unary(UnaryExpr {
                    op: UnaryOp::Not,
                    expr: Box::new(Expr::ident(&temp, test_span)),
                    span: test_span,
                }),
                then_branch: Box::new(Stmt::Break(JumpStmt { label: None, span })),
                else_branch: None,
                span: test_span,
            }));
        }

        let body = self.instrument_block(body.into_block());
        let body = Stmt::Labeled(LabeledStmt {
            label: Identifier::new(body_label, span),
            body: Box::new(Stmt::Block(body)),
            span,
        });
        if copied.is_empty() {
            iteration.push(body);
        } else {
            iteration.extend(self.per_iteration(copied, body, span));
        }
        if let Some(update) = update {
            iteration.extend(self.instrument_stmt(*update));
        }

        let mut looped = Stmt::While(WhileStmt {
            cond: Expr::Literal(Literal::Bool(true), span),
            body: Box::new(Stmt::Block(Block {
                statements: iteration,
                span,
            })),
            span,
        });
        for label in labels.into_iter().rev() {
            looped = Stmt::Labeled(LabeledStmt {
                label,
                body: Box::new(looped),
                span,
            });
        }
        outer.push(looped);

        Stmt::Block(Block {
            statements: outer,
            span,
        })
    }

    /// Run `body` against copies of the head bindings and write them back
    fn per_iteration(
        &mut self,
        bindings: Vec<(String, DeclKind)>,
        body: Stmt,
        span: Span,
    ) -> Vec<Stmt> {
        let copies: Vec<(String, String, DeclKind)> = bindings
            .into_iter()
            .map(|(name, kind)| (self.temp(&format!("{}iter", BODY_LABEL_PREFIX)), name, kind))
            .collect();

        let mut statements = Vec::new();
        let mut scoped = Vec::new();
        for (temp, name, kind) in &copies {
            statements.push(probes::temp_decl(temp, Expr::ident(name.as_str(), span), span));
            scoped.push(Stmt::VarDecl(VarDecl {
                kind: *kind,
                declarators: vec![Declarator {
                    name: Identifier::new(name.as_str(), span),
                    init: Some(Expr::ident(temp.as_str(), span)),
                    span,
                }],
                span,
            }));
        }
        scoped.push(body);

        // Only `let` copies are written back
        let writable: Vec<&(String, String, DeclKind)> = copies
            .iter()
            .filter(|(_, _, kind)| *kind == DeclKind::Let)
            .collect();
        for (temp, name, _) in &writable {
            scoped.push(copy_into(temp, name, span));
        }
        statements.push(Stmt::Block(Block {
            statements: scoped,
            span,
        }));
        for (temp, name, _) in &writable {
            statements.push(copy_into(name, temp, span));
        }
        statements
    }
}

/// `let` and `const` bindings declared by a loop head
fn head_bindings(init: Option<&Stmt>) -> Vec<(String, DeclKind)> {
    match init {
        Some(Stmt::VarDecl(decl)) if decl.kind != DeclKind::Var => decl
            .declarators
            .iter()
            .map(|d| (d.name.name.clone(), decl.kind))
            .collect(),
        _ => Vec::new(),
    }
}

/// `target = source;`
fn copy_into(target: &str, source: &str, span: Span) -> Stmt {
    Stmt::Assign(AssignStmt {
        target: AssignTarget::Identifier(Identifier::new(target, span)),
        op: AssignOp::Assign,
        value: Expr::ident(source, span),
        span,
    })
}

/// Point `continue` statements that target the current loop at `body_label`
///
/// `nested` is set once inside an inner loop, where only labeled continues
/// can still reach us. Functions and classes start a new jump scope.
fn retarget_continues(stmt: &mut Stmt, labels: &[&str], body_label: &str, nested: bool) {
    match stmt {
        Stmt::Continue(jump) => {
            let targets_us = match &jump.label {
                None => !nested,
                Some(label) => labels.contains(&label.name.as_str()),
            };
            if targets_us {
                let span = jump.span;
                *stmt = Stmt::Break(JumpStmt {
                    label: Some(Identifier::new(body_label, span)),
                    span,
                });
            }
        }
        Stmt::Block(block) => {
            for inner in &mut block.statements {
                retarget_continues(inner, labels, body_label, nested);
            }
        }
        Stmt::If(if_stmt) => {
            retarget_continues(&mut if_stmt.then_branch, labels, body_label, nested);
            if let Some(else_branch) = &mut if_stmt.else_branch {
                retarget_continues(else_branch, labels, body_label, nested);
            }
        }
        Stmt::Labeled(labeled) => {
            retarget_continues(&mut labeled.body, labels, body_label, nested)
        }
        Stmt::While(WhileStmt { body, .. })
        | Stmt::For(ForStmt { body, .. })
        | Stmt::ForOf(ForOfStmt { body, .. }) => {
            retarget_continues(body, labels, body_label, true)
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use crate::printer::print_program;

    fn retargeted(source: &str, labels: &[&str]) -> String {
        let mut program = parse_source(source).unwrap();
        for stmt in &mut program.statements {
            retarget_continues(stmt, labels, "__stepwise_body0", false);
        }
        print_program(&program)
    }

    #[test]
    fn test_unlabeled_continue_is_retargeted() {
        let out = retargeted("if (a) { continue; }", &[]);
        assert!(out.contains("break __stepwise_body0;"), "{}", out);
        assert!(!out.contains("continue"));
    }

    #[test]
    fn test_inner_loop_continue_is_left_alone() {
        let out = retargeted("while (a) { continue; }", &[]);
        assert!(out.contains("continue;"), "{}", out);
    }

    #[test]
    fn test_labeled_continue_from_inner_loop() {
        let out = retargeted("while (a) { continue outer; }", &["outer"]);
        assert!(out.contains("break __stepwise_body0;"), "{}", out);
    }

    #[test]
    fn test_function_bodies_are_not_entered() {
        let out = retargeted("function f() { while (a) { continue; } }", &[]);
        assert!(out.contains("continue;"), "{}", out);
    }

    #[test]
    fn test_closures_get_a_copy_per_iteration() {
        let out = crate::instrument::instrument_source(
            "let fs = [];\nfor (let i = 0; i < 3; i++) {\n  fs.push(() => i);\n}",
        )
        .unwrap();
        assert!(out.contains("let i = __stepwise_iter"), "{}", out);
        assert!(out.contains("i = __stepwise_iter"), "{}", out);
    }

    #[test]
    fn test_plain_bodies_are_not_copied() {
        let out = crate::instrument::instrument_source(
            "let n = 0;\nfor (let i = 0; i < 3; i++) {\n  n += i;\n}",
        )
        .unwrap();
        assert!(!out.contains("__stepwise_iter"), "{}", out);
    }
}

//! Expression evaluation

use crate::ast::*;
use crate::interpreter::builtins;
use crate::interpreter::{check_string_len, AssignError, Environment, Interpreter};
use crate::printer::print_expr;
use crate::span::Span;
use crate::value::{RuntimeError, Value};
use indexmap::IndexMap;

/// Resolved left-hand side of an assignment or update
enum Place {
    Variable(String, Span),
    Property(Value, Value, Span),
}

impl Interpreter {
    /// Evaluate an expression
    pub(super) fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(lit, _) => Ok(eval_literal(lit)),
            Expr::Identifier(id) => self.lookup_variable(&id.name, id.span),
            Expr::This(_) => Ok(self.this_value.clone()),
            Expr::Array(array) => {
                let mut items = Vec::with_capacity(array.elements.len());
                for element in &array.elements {
                    items.push(self.eval_expr(element)?);
                }
                Ok(Value::array(items))
            }
            Expr::Object(object) => {
                let mut properties = IndexMap::new();
                for property in &object.properties {
                    let value = self.eval_named(&property.value, &property.key)?;
                    properties.insert(property.key.clone(), value);
                }
                Ok(Value::object(properties))
            }
            Expr::Function(func) => {
                let name = func
                    .name
                    .as_ref()
                    .map(|n| n.name.clone())
                    .unwrap_or_else(|| "anonymous".to_string());
                Ok(self.make_closure(func, name))
            }
            Expr::Unary(unary) => self.eval_unary(unary),
            Expr::Binary(binary) => self.eval_binary(binary),
            Expr::Conditional(cond) => {
                if self.eval_expr(&cond.cond)?.is_truthy() {
                    self.eval_expr(&cond.then_expr)
                } else {
                    self.eval_expr(&cond.else_expr)
                }
            }
            Expr::Call(call) => self.eval_call(call),
            Expr::New(new) => {
                let callee = self.eval_expr(&new.callee)?;
                let args = self.eval_args(&new.args)?;
                if !matches!(callee, Value::Class(_) | Value::Function(_) | Value::Native(_)) {
                    return Err(RuntimeError::type_error(
                        format!("{} is not a constructor", print_expr(&new.callee)),
                        new.span,
                    ));
                }
                self.construct(&callee, args, new.span)
            }
            Expr::Member(member) => {
                let object = self.eval_expr(&member.object)?;
                self.get_property(&object, &member.property.name, member.span)
            }
            Expr::Index(index) => {
                let object = self.eval_expr(&index.object)?;
                let key = self.eval_expr(&index.index)?;
                self.get_indexed(&object, &key, index.span)
            }
            Expr::Group(group) => self.eval_expr(&group.expr),
        }
    }

    pub(super) fn lookup_variable(&self, name: &str, span: Span) -> Result<Value, RuntimeError> {
        Environment::lookup(&self.env, name).ok_or_else(|| RuntimeError::ReferenceError {
            name: name.to_string(),
            span,
        })
    }

    fn assign_variable(
        &mut self,
        name: &str,
        value: Value,
        span: Span,
    ) -> Result<(), RuntimeError> {
        Environment::assign(&self.env, name, value).map_err(|e| match e {
            AssignError::Undeclared => RuntimeError::ReferenceError {
                name: name.to_string(),
                span,
            },
            AssignError::Constant => {
                RuntimeError::type_error("Assignment to constant variable.", span)
            }
        })
    }

    fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Value>, RuntimeError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expr(arg)?);
        }
        Ok(values)
    }

    fn eval_unary(&mut self, unary: &UnaryExpr) -> Result<Value, RuntimeError> {
        if unary.op == UnaryOp::Typeof {
            // typeof tolerates undeclared names
            if let Expr::Identifier(id) = unary.expr.as_ref() {
                let value = Environment::lookup(&self.env, &id.name).unwrap_or(Value::Undefined);
                return Ok(Value::string(value.type_name()));
            }
        }

        let operand = self.eval_expr(&unary.expr)?;
        Ok(match unary.op {
            UnaryOp::Negate => Value::Number(-operand.to_number()),
            UnaryOp::Plus => Value::Number(operand.to_number()),
            UnaryOp::Not => Value::Bool(!operand.is_truthy()),
            UnaryOp::Typeof => Value::string(operand.type_name()),
        })
    }

    fn eval_binary(&mut self, binary: &BinaryExpr) -> Result<Value, RuntimeError> {
        let left = self.eval_expr(&binary.left)?;

        // Short-circuit evaluation returns the deciding operand
        match binary.op {
            BinaryOp::And if !left.is_truthy() => return Ok(left),
            BinaryOp::Or if left.is_truthy() => return Ok(left),
            BinaryOp::And | BinaryOp::Or => return self.eval_expr(&binary.right),
            _ => {}
        }

        let right = self.eval_expr(&binary.right)?;
        apply_binary(binary.op, &left, &right, binary.span)
    }

    fn eval_call(&mut self, call: &CallExpr) -> Result<Value, RuntimeError> {
        match call.callee.as_ref() {
            Expr::Member(member) => {
                let receiver = self.eval_expr(&member.object)?;
                let args = self.eval_args(&call.args)?;
                self.call_method(receiver, &member.property.name, args, call)
            }
            Expr::Index(index) => {
                let receiver = self.eval_expr(&index.object)?;
                let key = self.eval_expr(&index.index)?;
                let args = self.eval_args(&call.args)?;
                let method = self.get_indexed(&receiver, &key, index.span)?;
                self.call_callable(&method, receiver, args, call)
            }
            callee_expr => {
                let callee = self.eval_expr(callee_expr)?;
                let args = self.eval_args(&call.args)?;
                self.call_callable(&callee, Value::Undefined, args, call)
            }
        }
    }

    fn call_callable(
        &mut self,
        callee: &Value,
        this: Value,
        args: Vec<Value>,
        call: &CallExpr,
    ) -> Result<Value, RuntimeError> {
        if !matches!(callee, Value::Function(_) | Value::Native(_) | Value::Class(_)) {
            return Err(RuntimeError::type_error(
                format!("{} is not a function", print_expr(&call.callee)),
                call.span,
            ));
        }
        self.call_function(callee, this, args, call.span)
    }

    /// `receiver.name(args)`
    fn call_method(
        &mut self,
        receiver: Value,
        name: &str,
        args: Vec<Value>,
        call: &CallExpr,
    ) -> Result<Value, RuntimeError> {
        let span = call.span;
        let builtin = match &receiver {
            Value::Array(items) => builtins::call_array_method(self, items, name, args, span)?,
            Value::String(s) => builtins::call_string_method(s, name, &args, span)?,
            Value::Number(n) => builtins::call_number_method(*n, name, &args, span)?,
            _ => {
                let method = self.get_property(&receiver, name, span)?;
                return self.call_callable(&method, receiver, args, call);
            }
        };
        builtin.ok_or_else(|| {
            RuntimeError::type_error(
                format!("{} is not a function", print_expr(&call.callee)),
                span,
            )
        })
    }

    /// `object.key`
    pub(super) fn get_property(
        &self,
        object: &Value,
        key: &str,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        Ok(match object {
            Value::Undefined | Value::Null => {
                return Err(RuntimeError::type_error(
                    format!(
                        "Cannot read properties of {} (reading '{}')",
                        object.to_js_string(),
                        key
                    ),
                    span,
                ))
            }
            Value::Object(obj) => {
                let obj = obj.borrow();
                if let Some(value) = obj.properties.get(key) {
                    value.clone()
                } else if let Some(method) = obj.class.as_ref().and_then(|c| c.methods.get(key)) {
                    Value::Function(method.clone())
                } else {
                    Value::Undefined
                }
            }
            Value::Array(items) => {
                let items = items.borrow();
                match key {
                    "length" => Value::Number(items.len() as f64),
                    _ => array_index(key)
                        .and_then(|i| items.get(i).cloned())
                        .unwrap_or(Value::Undefined),
                }
            }
            Value::String(s) => match key {
                "length" => Value::Number(s.chars().count() as f64),
                _ => array_index(key)
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Value::string(c.to_string()))
                    .unwrap_or(Value::Undefined),
            },
            Value::Function(closure) if key == "name" => Value::string(&closure.name),
            Value::Class(class) if key == "name" => Value::string(&class.name),
            Value::Native(native) if key == "name" => Value::string(native.name),
            _ => Value::Undefined,
        })
    }

    /// `object[key]`
    fn get_indexed(&self, object: &Value, key: &Value, span: Span) -> Result<Value, RuntimeError> {
        self.get_property(object, &property_key(key), span)
    }

    fn resolve_place(&mut self, target: &AssignTarget) -> Result<Place, RuntimeError> {
        Ok(match target {
            AssignTarget::Identifier(id) => Place::Variable(id.name.clone(), id.span),
            AssignTarget::Member(member) => {
                let object = self.eval_expr(&member.object)?;
                Place::Property(object, Value::string(&member.property.name), member.span)
            }
            AssignTarget::Index(index) => {
                let object = self.eval_expr(&index.object)?;
                let key = self.eval_expr(&index.index)?;
                Place::Property(object, key, index.span)
            }
        })
    }

    fn read_place(&self, place: &Place) -> Result<Value, RuntimeError> {
        match place {
            Place::Variable(name, span) => self.lookup_variable(name, *span),
            Place::Property(object, key, span) => self.get_indexed(object, key, *span),
        }
    }

    fn write_place(&mut self, place: &Place, value: Value) -> Result<(), RuntimeError> {
        match place {
            Place::Variable(name, span) => self.assign_variable(name, value, *span),
            Place::Property(object, key, span) => set_property(object, key, value, *span),
        }
    }

    /// Assignment statement (plain or compound)
    pub(super) fn eval_assign(&mut self, assign: &AssignStmt) -> Result<(), RuntimeError> {
        let place = self.resolve_place(&assign.target)?;
        let value = match assign.op.binary_op() {
            None => match &place {
                Place::Variable(name, _) => self.eval_named(&assign.value, name)?,
                Place::Property(_, key, _) => {
                    let key = property_key(key);
                    self.eval_named(&assign.value, &key)?
                }
            },
            Some(op) => {
                let current = self.read_place(&place)?;
                let rhs = self.eval_expr(&assign.value)?;
                apply_binary(op, &current, &rhs, assign.span)?
            }
        };
        self.write_place(&place, value)
    }

    /// `x++` and friends; returns the value of the update expression
    pub(super) fn eval_update(&mut self, update: &UpdateStmt) -> Result<Value, RuntimeError> {
        let place = self.resolve_place(&update.target)?;
        let old = self.read_place(&place)?.to_number();
        let new = match update.op {
            UpdateOp::Increment => old + 1.0,
            UpdateOp::Decrement => old - 1.0,
        };
        self.write_place(&place, Value::Number(new))?;
        Ok(Value::Number(if update.prefix { new } else { old }))
    }
}

fn eval_literal(lit: &Literal) -> Value {
    match lit {
        Literal::Number(n) => Value::Number(*n),
        Literal::String(s) => Value::string(s),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
        Literal::Undefined => Value::Undefined,
    }
}

/// Property name used for `object[key]`
fn property_key(key: &Value) -> String {
    key.to_js_string()
}

/// Canonical array index (`"3"`, not `"03"` or `"3.5"`)
fn array_index(key: &str) -> Option<usize> {
    let index: usize = key.parse().ok()?;
    (index.to_string() == key).then_some(index)
}

fn set_property(object: &Value, key: &Value, value: Value, span: Span) -> Result<(), RuntimeError> {
    let key = property_key(key);
    match object {
        Value::Object(obj) => {
            obj.borrow_mut().properties.insert(key, value);
            Ok(())
        }
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            if key == "length" {
                let len = value.to_number();
                if len < 0.0 || len.fract() != 0.0 || !len.is_finite() {
                    return Err(RuntimeError::RangeError {
                        msg: "Invalid array length".to_string(),
                        span,
                    });
                }
                items.resize(len as usize, Value::Undefined);
                return Ok(());
            }
            let Some(index) = array_index(&key) else {
                return Err(RuntimeError::type_error(
                    format!("Cannot set property '{}' of an array", key),
                    span,
                ));
            };
            if index >= items.len() {
                items.resize(index + 1, Value::Undefined);
            }
            items[index] = value;
            Ok(())
        }
        Value::Undefined | Value::Null => Err(RuntimeError::type_error(
            format!(
                "Cannot set properties of {} (setting '{}')",
                object.to_js_string(),
                key
            ),
            span,
        )),
        // Writes to primitives are silently dropped
        _ => Ok(()),
    }
}

/// Non-short-circuit binary operators
pub(super) fn apply_binary(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    span: Span,
) -> Result<Value, RuntimeError> {
    let value = match op {
        BinaryOp::Add => {
            if is_string_like(left) || is_string_like(right) {
                let mut s = left.to_js_string();
                let rhs = right.to_js_string();
                check_string_len(s.len() + rhs.len(), span)?;
                s.push_str(&rhs);
                Value::string(s)
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Mod => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Eq => Value::Bool(left.loose_equals(right)),
        BinaryOp::Ne => Value::Bool(!left.loose_equals(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNe => Value::Bool(!left.strict_equals(right)),
        BinaryOp::Lt => compare(left, right, |o| o.is_lt()),
        BinaryOp::Le => compare(left, right, |o| o.is_le()),
        BinaryOp::Gt => compare(left, right, |o| o.is_gt()),
        BinaryOp::Ge => compare(left, right, |o| o.is_ge()),
        // Handled with short-circuiting by the caller
        BinaryOp::And => Value::Bool(left.is_truthy() && right.is_truthy()),
        BinaryOp::Or => Value::Bool(left.is_truthy() || right.is_truthy()),
    };
    Ok(value)
}

fn is_string_like(value: &Value) -> bool {
    !matches!(
        value,
        Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_)
    )
}

fn compare(left: &Value, right: &Value, test: fn(std::cmp::Ordering) -> bool) -> Value {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return Value::Bool(test(a.cmp(b)));
    }
    let ordering = left.to_number().partial_cmp(&right.to_number());
    Value::Bool(ordering.map(test).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn eval(source: &str) -> Value {
        let wrapped = format!("let __result = {};", source);
        let (tokens, _) = crate::lexer::Lexer::new(wrapped).tokenize();
        let (program, diags) = crate::parser::Parser::new(tokens).parse();
        assert!(diags.is_empty(), "{:?}", diags);
        let mut interp = Interpreter::new();
        interp.eval(&program).unwrap();
        interp.global("__result").unwrap()
    }

    #[rstest]
    #[case("1 + 2 * 3", Value::Number(7.0))]
    #[case("\"a\" + 1", Value::string("a1"))]
    #[case("1 + \"2\"", Value::string("12"))]
    #[case("[1, 2] + \"\"", Value::string("1,2"))]
    #[case("7 % 3", Value::Number(1.0))]
    #[case("\"b\" > \"a\"", Value::Bool(true))]
    #[case("\"10\" < 9", Value::Bool(false))]
    #[case("null == undefined", Value::Bool(true))]
    #[case("null === undefined", Value::Bool(false))]
    #[case("0 || \"fallback\"", Value::string("fallback"))]
    #[case("1 && 2", Value::Number(2.0))]
    #[case("!\"\"", Value::Bool(true))]
    #[case("typeof missing", Value::string("undefined"))]
    #[case("typeof [1]", Value::string("object"))]
    #[case("true ? \"y\" : \"n\"", Value::string("y"))]
    #[case("\"hello\".length", Value::Number(5.0))]
    #[case("[4, 5, 6][1]", Value::Number(5.0))]
    #[case("[4, 5, 6][9]", Value::Undefined)]
    #[case("{a: {b: 3}}.a.b", Value::Number(3.0))]
    fn test_expressions(#[case] source: &str, #[case] expected: Value) {
        assert_eq!(eval(source), expected);
    }

    #[test]
    fn test_division_by_zero_is_infinity() {
        assert_eq!(eval("1 / 0"), Value::Number(f64::INFINITY));
    }

    #[test]
    fn test_read_property_of_undefined() {
        let (tokens, _) = crate::lexer::Lexer::new("let o; let v = o.x;").tokenize();
        let (program, _) = crate::parser::Parser::new(tokens).parse();
        let err = Interpreter::new().eval(&program).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: Cannot read properties of undefined (reading 'x')"
        );
    }

    #[test]
    fn test_not_a_function_names_callee() {
        let (tokens, _) = crate::lexer::Lexer::new("let o = {}; o.go();").tokenize();
        let (program, _) = crate::parser::Parser::new(tokens).parse();
        let err = Interpreter::new().eval(&program).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: o.go is not a function");
    }

    #[test]
    fn test_member_and_index_assignment() {
        let source = r#"
            let o = {};
            o.a = 1;
            o["b"] = 2;
            o.a += 10;
            let xs = [];
            xs[2] = "z";
            xs[0]++;
        "#;
        let (tokens, _) = crate::lexer::Lexer::new(source).tokenize();
        let (program, diags) = crate::parser::Parser::new(tokens).parse();
        assert!(diags.is_empty());
        let mut interp = Interpreter::new();
        interp.eval(&program).unwrap();
        assert_eq!(format!("{:?}", interp.global("o").unwrap()), r#"{"a": 11, "b": 2}"#);
        assert_eq!(
            format!("{:?}", interp.global("xs").unwrap()),
            r#"[NaN, undefined, "z"]"#
        );
    }
}

//! Minimal standard library
//!
//! Globals: `Math`, `String`, `Number`, `Boolean`, `parseInt`, `parseFloat`,
//! `isNaN`, `Array.isArray`, `Object.keys/values/entries`, `JSON.stringify`
//! and `Error`. Array, string and number methods are dispatched by name from
//! the call site. There is deliberately no `console`: printing only exists as
//! a probe.

use crate::interpreter::{check_array_len, check_string_len, Interpreter};
use crate::printer::format_number;
use crate::span::Span;
use crate::value::{parse_numeric_string, ArrayRef, NativeFn, RuntimeError, Value};
use indexmap::IndexMap;
use std::rc::Rc;

type NativeResult = Result<Value, RuntimeError>;

pub(super) fn install(interp: &mut Interpreter) {
    interp.define_global(
        "Math",
        namespace(
            &[
                ("floor", math_floor as NativeFn),
                ("ceil", math_ceil as NativeFn),
                ("round", math_round as NativeFn),
                ("abs", math_abs as NativeFn),
                ("max", math_max as NativeFn),
                ("min", math_min as NativeFn),
                ("sqrt", math_sqrt as NativeFn),
                ("pow", math_pow as NativeFn),
                ("trunc", math_trunc as NativeFn),
                ("sign", math_sign as NativeFn),
            ],
            &[("PI", Value::Number(std::f64::consts::PI))],
        ),
    );
    interp.define_global("String", Value::native("String", to_string));
    interp.define_global("Number", Value::native("Number", to_number));
    interp.define_global("Boolean", Value::native("Boolean", to_boolean));
    interp.define_global("parseInt", Value::native("parseInt", parse_int));
    interp.define_global("parseFloat", Value::native("parseFloat", parse_float));
    interp.define_global("isNaN", Value::native("isNaN", is_nan));
    interp.define_global("Error", Value::native("Error", make_error));
    interp.define_global("NaN", Value::Number(f64::NAN));
    interp.define_global("Infinity", Value::Number(f64::INFINITY));
    interp.define_global(
        "Array",
        namespace(&[("isArray", array_is_array as NativeFn)], &[]),
    );
    interp.define_global(
        "Object",
        namespace(
            &[
                ("keys", object_keys as NativeFn),
                ("values", object_values as NativeFn),
                ("entries", object_entries as NativeFn),
            ],
            &[],
        ),
    );
    interp.define_global(
        "JSON",
        namespace(&[("stringify", json_stringify as NativeFn)], &[]),
    );
}

fn namespace(functions: &[(&'static str, NativeFn)], constants: &[(&str, Value)]) -> Value {
    let mut properties = IndexMap::new();
    for (name, func) in functions {
        properties.insert(name.to_string(), Value::native(*name, *func));
    }
    for (name, value) in constants {
        properties.insert(name.to_string(), value.clone());
    }
    Value::object(properties)
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

fn num_arg(args: &[Value], index: usize) -> f64 {
    arg(args, index).to_number()
}

// ============================================================================
// Math
// ============================================================================

fn math_unary(args: &[Value], f: fn(f64) -> f64) -> NativeResult {
    Ok(Value::Number(f(num_arg(args, 0))))
}

fn math_floor(_: &mut Interpreter, _: &Value, args: Vec<Value>, _: Span) -> NativeResult {
    math_unary(&args, f64::floor)
}

fn math_ceil(_: &mut Interpreter, _: &Value, args: Vec<Value>, _: Span) -> NativeResult {
    math_unary(&args, f64::ceil)
}

fn math_round(_: &mut Interpreter, _: &Value, args: Vec<Value>, _: Span) -> NativeResult {
    // Halves round towards +Infinity
    math_unary(&args, |n| (n + 0.5).floor())
}

fn math_abs(_: &mut Interpreter, _: &Value, args: Vec<Value>, _: Span) -> NativeResult {
    math_unary(&args, f64::abs)
}

fn math_sqrt(_: &mut Interpreter, _: &Value, args: Vec<Value>, _: Span) -> NativeResult {
    math_unary(&args, f64::sqrt)
}

fn math_trunc(_: &mut Interpreter, _: &Value, args: Vec<Value>, _: Span) -> NativeResult {
    math_unary(&args, f64::trunc)
}

fn math_sign(_: &mut Interpreter, _: &Value, args: Vec<Value>, _: Span) -> NativeResult {
    math_unary(&args, |n| {
        if n.is_nan() || n == 0.0 {
            n
        } else {
            n.signum()
        }
    })
}

fn math_pow(_: &mut Interpreter, _: &Value, args: Vec<Value>, _: Span) -> NativeResult {
    Ok(Value::Number(num_arg(&args, 0).powf(num_arg(&args, 1))))
}

fn math_max(_: &mut Interpreter, _: &Value, args: Vec<Value>, _: Span) -> NativeResult {
    Ok(Value::Number(fold_numbers(&args, f64::NEG_INFINITY, f64::max)))
}

fn math_min(_: &mut Interpreter, _: &Value, args: Vec<Value>, _: Span) -> NativeResult {
    Ok(Value::Number(fold_numbers(&args, f64::INFINITY, f64::min)))
}

fn fold_numbers(args: &[Value], init: f64, f: fn(f64, f64) -> f64) -> f64 {
    let mut acc = init;
    for value in args {
        let n = value.to_number();
        if n.is_nan() {
            return f64::NAN;
        }
        acc = f(acc, n);
    }
    acc
}

// ============================================================================
// Conversions
// ============================================================================

fn to_string(_: &mut Interpreter, _: &Value, args: Vec<Value>, _: Span) -> NativeResult {
    Ok(match args.first() {
        Some(value) => Value::string(value.to_js_string()),
        None => Value::string(""),
    })
}

fn to_number(_: &mut Interpreter, _: &Value, args: Vec<Value>, _: Span) -> NativeResult {
    Ok(Value::Number(match args.first() {
        Some(value) => value.to_number(),
        None => 0.0,
    }))
}

fn to_boolean(_: &mut Interpreter, _: &Value, args: Vec<Value>, _: Span) -> NativeResult {
    Ok(Value::Bool(arg(&args, 0).is_truthy()))
}

fn is_nan(_: &mut Interpreter, _: &Value, args: Vec<Value>, _: Span) -> NativeResult {
    Ok(Value::Bool(num_arg(&args, 0).is_nan()))
}

fn parse_int(_: &mut Interpreter, _: &Value, args: Vec<Value>, _: Span) -> NativeResult {
    let text = arg(&args, 0).to_js_string();
    let mut rest = text.trim_start();

    let negative = rest.starts_with('-');
    if rest.starts_with('-') || rest.starts_with('+') {
        rest = &rest[1..];
    }

    let mut radix = match arg(&args, 1) {
        Value::Undefined => 10,
        value => value.to_number() as u32,
    };
    if (radix == 16 || radix == 0) && (rest.starts_with("0x") || rest.starts_with("0X")) {
        rest = &rest[2..];
        radix = 16;
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return Ok(Value::Number(f64::NAN));
    }

    let mut result: Option<f64> = None;
    for c in rest.chars() {
        let Some(digit) = c.to_digit(radix) else {
            break;
        };
        result = Some(result.unwrap_or(0.0) * radix as f64 + digit as f64);
    }

    Ok(Value::Number(match result {
        Some(n) if negative => -n,
        Some(n) => n,
        None => f64::NAN,
    }))
}

fn parse_float(_: &mut Interpreter, _: &Value, args: Vec<Value>, _: Span) -> NativeResult {
    let text = arg(&args, 0).to_js_string();
    let trimmed = text.trim_start();

    for prefix in ["Infinity", "+Infinity", "-Infinity"] {
        if trimmed.starts_with(prefix) {
            return Ok(Value::Number(parse_numeric_string(prefix)));
        }
    }

    // Longest prefix that parses as a decimal literal
    let candidate: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        .collect();
    for end in (1..=candidate.len()).rev() {
        let prefix = &candidate[..end];
        if prefix.ends_with(['e', 'E', '+', '-']) {
            continue;
        }
        if let Ok(n) = prefix.parse::<f64>() {
            return Ok(Value::Number(n));
        }
    }
    Ok(Value::Number(f64::NAN))
}

fn make_error(_: &mut Interpreter, _: &Value, args: Vec<Value>, _: Span) -> NativeResult {
    let message = match arg(&args, 0) {
        Value::Undefined => String::new(),
        value => value.to_js_string(),
    };
    let mut properties = IndexMap::new();
    properties.insert("name".to_string(), Value::string("Error"));
    properties.insert("message".to_string(), Value::string(message));
    Ok(Value::object(properties))
}

// ============================================================================
// Array / Object / JSON namespaces
// ============================================================================

fn array_is_array(_: &mut Interpreter, _: &Value, args: Vec<Value>, _: Span) -> NativeResult {
    Ok(Value::Bool(matches!(arg(&args, 0), Value::Array(_))))
}

fn own_entries(value: &Value, span: Span) -> Result<Vec<(String, Value)>, RuntimeError> {
    match value {
        Value::Object(object) => Ok(object
            .borrow()
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()),
        Value::Array(items) => Ok(items
            .borrow()
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect()),
        Value::Undefined | Value::Null => Err(RuntimeError::type_error(
            "Cannot convert undefined or null to object",
            span,
        )),
        _ => Ok(Vec::new()),
    }
}

fn object_keys(_: &mut Interpreter, _: &Value, args: Vec<Value>, span: Span) -> NativeResult {
    let entries = own_entries(&arg(&args, 0), span)?;
    Ok(Value::array(
        entries.into_iter().map(|(k, _)| Value::string(k)).collect(),
    ))
}

fn object_values(_: &mut Interpreter, _: &Value, args: Vec<Value>, span: Span) -> NativeResult {
    let entries = own_entries(&arg(&args, 0), span)?;
    Ok(Value::array(entries.into_iter().map(|(_, v)| v).collect()))
}

fn object_entries(_: &mut Interpreter, _: &Value, args: Vec<Value>, span: Span) -> NativeResult {
    let entries = own_entries(&arg(&args, 0), span)?;
    Ok(Value::array(
        entries
            .into_iter()
            .map(|(k, v)| Value::array(vec![Value::string(k), v]))
            .collect(),
    ))
}

fn json_stringify(_: &mut Interpreter, _: &Value, args: Vec<Value>, span: Span) -> NativeResult {
    let mut ancestors = Vec::new();
    let Some(json) = to_json(&arg(&args, 0), &mut ancestors, span)? else {
        return Ok(Value::Undefined);
    };

    let indent = match arg(&args, 2) {
        Value::Number(n) if n >= 1.0 => " ".repeat(n.min(10.0) as usize),
        Value::String(s) => s.chars().take(10).collect(),
        _ => String::new(),
    };

    let text = if indent.is_empty() {
        serde_json::to_string(&json)
    } else {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        serde::Serialize::serialize(&json, &mut serializer)
            .map(|_| String::from_utf8_lossy(&out).into_owned())
    };
    text.map(Value::string)
        .map_err(|e| RuntimeError::type_error(e.to_string(), span))
}

/// `None` for values JSON cannot represent (undefined, functions)
fn to_json(
    value: &Value,
    ancestors: &mut Vec<*const ()>,
    span: Span,
) -> Result<Option<serde_json::Value>, RuntimeError> {
    use serde_json::Value as Json;

    Ok(Some(match value {
        Value::Undefined | Value::Function(_) | Value::Native(_) | Value::Class(_) => {
            return Ok(None)
        }
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) => json_number(*n),
        Value::String(s) => Json::String(s.to_string()),
        Value::Snapshot(snapshot) => {
            serde_json::to_value(snapshot.as_ref()).unwrap_or(Json::Null)
        }
        Value::Array(items) => {
            let ptr = Rc::as_ptr(items) as *const ();
            enter_json(ancestors, ptr, span)?;
            let mut out = Vec::new();
            for item in items.borrow().iter() {
                out.push(to_json(item, ancestors, span)?.unwrap_or(Json::Null));
            }
            ancestors.pop();
            Json::Array(out)
        }
        Value::Object(object) => {
            let ptr = Rc::as_ptr(object) as *const ();
            enter_json(ancestors, ptr, span)?;
            let mut out = serde_json::Map::new();
            for (key, item) in object.borrow().properties.iter() {
                if let Some(json) = to_json(item, ancestors, span)? {
                    out.insert(key.clone(), json);
                }
            }
            ancestors.pop();
            Json::Object(out)
        }
    }))
}

fn enter_json(
    ancestors: &mut Vec<*const ()>,
    ptr: *const (),
    span: Span,
) -> Result<(), RuntimeError> {
    if ancestors.contains(&ptr) {
        return Err(RuntimeError::type_error(
            "Converting circular structure to JSON",
            span,
        ));
    }
    ancestors.push(ptr);
    Ok(())
}

fn json_number(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

// ============================================================================
// Array methods
// ============================================================================

/// Resolve a possibly negative relative index against `len`
fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if matches!(value, Value::Undefined) {
        return default;
    }
    let n = value.to_number();
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        (n as usize).min(len)
    }
}

fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => a.strict_equals(b),
    }
}

fn callback(args: &[Value], method: &str, span: Span) -> Result<Value, RuntimeError> {
    match args.first() {
        Some(f @ (Value::Function(_) | Value::Native(_))) => Ok(f.clone()),
        Some(other) => Err(RuntimeError::type_error(
            format!("{} is not a function", other.to_js_string()),
            span,
        )),
        None => Err(RuntimeError::type_error(
            format!("undefined is not a function (in {})", method),
            span,
        )),
    }
}

/// Call `f(element, index, array)` for each element present at call time
fn for_each_element(
    interp: &mut Interpreter,
    items: &ArrayRef,
    f: &Value,
    span: Span,
    mut visit: impl FnMut(Value, Value) -> bool,
) -> Result<(), RuntimeError> {
    let len = items.borrow().len();
    for index in 0..len {
        let Some(element) = items.borrow().get(index).cloned() else {
            break;
        };
        let result = interp.call_function(
            f,
            Value::Undefined,
            vec![
                element.clone(),
                Value::Number(index as f64),
                Value::Array(Rc::clone(items)),
            ],
            span,
        )?;
        if !visit(element, result) {
            break;
        }
    }
    Ok(())
}

pub(super) fn call_array_method(
    interp: &mut Interpreter,
    items: &ArrayRef,
    name: &str,
    args: Vec<Value>,
    span: Span,
) -> Result<Option<Value>, RuntimeError> {
    let len = items.borrow().len();
    let value = match name {
        "push" => {
            let mut items = items.borrow_mut();
            check_array_len(items.len() + args.len(), span)?;
            items.extend(args);
            Value::Number(items.len() as f64)
        }
        "pop" => items.borrow_mut().pop().unwrap_or(Value::Undefined),
        "shift" => {
            let mut items = items.borrow_mut();
            if items.is_empty() {
                Value::Undefined
            } else {
                items.remove(0)
            }
        }
        "unshift" => {
            let mut items = items.borrow_mut();
            check_array_len(items.len() + args.len(), span)?;
            for (offset, value) in args.into_iter().enumerate() {
                items.insert(offset, value);
            }
            Value::Number(items.len() as f64)
        }
        "slice" => {
            let start = relative_index(&arg(&args, 0), len, 0);
            let end = relative_index(&arg(&args, 1), len, len);
            let items = items.borrow();
            Value::array(if start < end {
                items[start..end].to_vec()
            } else {
                Vec::new()
            })
        }
        "concat" => {
            let added: usize = args
                .iter()
                .map(|value| match value {
                    Value::Array(other) => other.borrow().len(),
                    _ => 1,
                })
                .sum();
            check_array_len(len + added, span)?;
            let mut out = items.borrow().clone();
            for value in args {
                match value {
                    Value::Array(other) => out.extend(other.borrow().iter().cloned()),
                    other => out.push(other),
                }
            }
            Value::array(out)
        }
        "indexOf" => {
            let needle = arg(&args, 0);
            let position = items.borrow().iter().position(|v| v.strict_equals(&needle));
            Value::Number(position.map(|p| p as f64).unwrap_or(-1.0))
        }
        "includes" => {
            let needle = arg(&args, 0);
            Value::Bool(items.borrow().iter().any(|v| same_value_zero(v, &needle)))
        }
        "join" => {
            let separator = match arg(&args, 0) {
                Value::Undefined => ",".to_string(),
                value => value.to_js_string(),
            };
            let parts: Vec<String> = items
                .borrow()
                .iter()
                .map(|v| {
                    if v.is_nullish() {
                        String::new()
                    } else {
                        v.to_js_string()
                    }
                })
                .collect();
            let total = parts.iter().map(String::len).sum::<usize>()
                + separator.len() * parts.len().saturating_sub(1);
            check_string_len(total, span)?;
            Value::string(parts.join(&separator))
        }
        "reverse" => {
            items.borrow_mut().reverse();
            Value::Array(Rc::clone(items))
        }
        "map" => {
            let f = callback(&args, name, span)?;
            let mut out = Vec::with_capacity(len);
            for_each_element(interp, items, &f, span, |_, result| {
                out.push(result);
                true
            })?;
            Value::array(out)
        }
        "filter" => {
            let f = callback(&args, name, span)?;
            let mut out = Vec::new();
            for_each_element(interp, items, &f, span, |element, keep| {
                if keep.is_truthy() {
                    out.push(element);
                }
                true
            })?;
            Value::array(out)
        }
        "forEach" => {
            let f = callback(&args, name, span)?;
            for_each_element(interp, items, &f, span, |_, _| true)?;
            Value::Undefined
        }
        "find" => {
            let f = callback(&args, name, span)?;
            let mut found = Value::Undefined;
            for_each_element(interp, items, &f, span, |element, hit| {
                if hit.is_truthy() {
                    found = element;
                    return false;
                }
                true
            })?;
            found
        }
        "findIndex" => {
            let f = callback(&args, name, span)?;
            let mut index = -1.0;
            let mut current = 0.0;
            for_each_element(interp, items, &f, span, |_, hit| {
                if hit.is_truthy() {
                    index = current;
                    return false;
                }
                current += 1.0;
                true
            })?;
            Value::Number(index)
        }
        "some" => {
            let f = callback(&args, name, span)?;
            let mut any = false;
            for_each_element(interp, items, &f, span, |_, hit| {
                any = hit.is_truthy();
                !any
            })?;
            Value::Bool(any)
        }
        "every" => {
            let f = callback(&args, name, span)?;
            let mut all = true;
            for_each_element(interp, items, &f, span, |_, hit| {
                all = hit.is_truthy();
                all
            })?;
            Value::Bool(all)
        }
        "reduce" => {
            let f = callback(&args, name, span)?;
            let mut index = 0;
            let mut acc = match args.get(1) {
                Some(initial) => initial.clone(),
                None => {
                    let first = items.borrow().first().cloned();
                    index = 1;
                    first.ok_or_else(|| {
                        RuntimeError::type_error(
                            "Reduce of empty array with no initial value",
                            span,
                        )
                    })?
                }
            };
            while index < len {
                let Some(element) = items.borrow().get(index).cloned() else {
                    break;
                };
                acc = interp.call_function(
                    &f,
                    Value::Undefined,
                    vec![
                        acc,
                        element,
                        Value::Number(index as f64),
                        Value::Array(Rc::clone(items)),
                    ],
                    span,
                )?;
                index += 1;
            }
            acc
        }
        "sort" => {
            let comparator = match args.first() {
                None | Some(Value::Undefined) => None,
                Some(_) => Some(callback(&args, name, span)?),
            };
            let snapshot = items.borrow().clone();
            let sorted = merge_sort(interp, snapshot, comparator.as_ref(), span)?;
            *items.borrow_mut() = sorted;
            Value::Array(Rc::clone(items))
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn merge_sort(
    interp: &mut Interpreter,
    mut items: Vec<Value>,
    comparator: Option<&Value>,
    span: Span,
) -> Result<Vec<Value>, RuntimeError> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(interp, items, comparator, span)?;
    let right = merge_sort(interp, right, comparator, span)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
        // Take from the right only when strictly smaller, which keeps the sort stable
        let take_right = match comparator {
            Some(f) => {
                let order = interp.call_function(
                    f,
                    Value::Undefined,
                    vec![r.clone(), l.clone()],
                    span,
                )?;
                order.to_number() < 0.0
            }
            None => default_sort_key(r) < default_sort_key(l),
        };
        let next = if take_right { right.next() } else { left.next() };
        merged.extend(next);
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

/// Without a comparator values sort by their string form, undefined last
fn default_sort_key(value: &Value) -> (bool, String) {
    match value {
        Value::Undefined => (true, String::new()),
        other => (false, other.to_js_string()),
    }
}

// ============================================================================
// String and number methods
// ============================================================================

fn char_index_of(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let start = haystack
        .char_indices()
        .nth(from)
        .map(|(i, _)| i)
        .unwrap_or(haystack.len());
    haystack[start..]
        .find(needle)
        .map(|byte| haystack[..start + byte].chars().count())
}

fn char_slice(s: &str, start: usize, end: usize) -> String {
    s.chars().skip(start).take(end.saturating_sub(start)).collect()
}

pub(super) fn call_string_method(
    s: &str,
    name: &str,
    args: &[Value],
    span: Span,
) -> Result<Option<Value>, RuntimeError> {
    let len = s.chars().count();
    let value = match name {
        "toUpperCase" => Value::string(s.to_uppercase()),
        "toLowerCase" => Value::string(s.to_lowercase()),
        "trim" => Value::string(s.trim()),
        "slice" => {
            let start = relative_index(&arg(args, 0), len, 0);
            let end = relative_index(&arg(args, 1), len, len);
            Value::string(char_slice(s, start, end))
        }
        "substring" => {
            let clamp = |v: Value, default: usize| {
                if matches!(v, Value::Undefined) {
                    return default;
                }
                let n = v.to_number();
                if n.is_nan() || n < 0.0 {
                    0
                } else {
                    (n as usize).min(len)
                }
            };
            let a = clamp(arg(args, 0), 0);
            let b = clamp(arg(args, 1), len);
            Value::string(char_slice(s, a.min(b), a.max(b)))
        }
        "charAt" => {
            let index = num_arg(args, 0);
            let index = if index.is_nan() { 0.0 } else { index };
            let c = if index >= 0.0 {
                s.chars().nth(index as usize)
            } else {
                None
            };
            Value::string(c.map(|c| c.to_string()).unwrap_or_default())
        }
        "indexOf" => {
            let needle = arg(args, 0).to_js_string();
            let from = relative_index(&arg(args, 1), len, 0);
            Value::Number(
                char_index_of(s, &needle, from)
                    .map(|i| i as f64)
                    .unwrap_or(-1.0),
            )
        }
        "includes" => Value::Bool(s.contains(arg(args, 0).to_js_string().as_str())),
        "startsWith" => Value::Bool(s.starts_with(arg(args, 0).to_js_string().as_str())),
        "endsWith" => Value::Bool(s.ends_with(arg(args, 0).to_js_string().as_str())),
        "split" => match arg(args, 0) {
            Value::Undefined => Value::array(vec![Value::string(s)]),
            separator => {
                let separator = separator.to_js_string();
                let parts: Vec<Value> = if separator.is_empty() {
                    check_array_len(len, span)?;
                    s.chars().map(|c| Value::string(c.to_string())).collect()
                } else {
                    check_array_len(s.matches(separator.as_str()).count() + 1, span)?;
                    s.split(separator.as_str()).map(Value::string).collect()
                };
                Value::array(parts)
            }
        },
        "repeat" => {
            let count = num_arg(args, 0);
            let count = if count.is_nan() { 0.0 } else { count.trunc() };
            if count < 0.0 || !count.is_finite() {
                return Err(RuntimeError::RangeError {
                    msg: format!("Invalid count value: {}", format_number(count)),
                    span,
                });
            }
            check_string_len(s.len().saturating_mul(count as usize), span)?;
            Value::string(s.repeat(count as usize))
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

pub(super) fn call_number_method(
    n: f64,
    name: &str,
    args: &[Value],
    span: Span,
) -> Result<Option<Value>, RuntimeError> {
    let value = match name {
        "toString" => Value::string(format_number(n)),
        "toFixed" => {
            let digits = num_arg(args, 0);
            let digits = if digits.is_nan() { 0.0 } else { digits.trunc() };
            if !(0.0..=100.0).contains(&digits) {
                return Err(RuntimeError::RangeError {
                    msg: "toFixed() digits argument must be between 0 and 100".to_string(),
                    span,
                });
            }
            if n.is_finite() {
                Value::string(format!("{:.*}", digits as usize, n))
            } else {
                Value::string(format_number(n))
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use rstest::rstest;

    fn eval(expr: &str) -> Value {
        let source = format!("let out = {};", expr);
        let (tokens, _) = Lexer::new(source).tokenize();
        let (program, diags) = Parser::new(tokens).parse();
        assert!(diags.is_empty(), "{:?}", diags);
        let mut interp = Interpreter::new();
        interp.eval(&program).unwrap();
        interp.global("out").unwrap()
    }

    #[rstest]
    #[case("Math.max(1, 7, 3)", "7")]
    #[case("Math.min()", "Infinity")]
    #[case("Math.round(2.5)", "3")]
    #[case("Math.round(-2.5)", "-2")]
    #[case("Math.floor(-1.5)", "-2")]
    #[case("parseInt(\"42px\")", "42")]
    #[case("parseInt(\"ff\", 16)", "255")]
    #[case("parseInt(\"abc\")", "NaN")]
    #[case("parseFloat(\"3.5e2xyz\")", "350")]
    #[case("Number(\"\")", "0")]
    #[case("String([1, [2, 3]])", "1,2,3")]
    #[case("[3, 1, 2].sort()", "1,2,3")]
    #[case("[10, 9, 1].sort()", "1,10,9")]
    #[case("[10, 9, 1].sort((a, b) => a - b)", "1,9,10")]
    #[case("[1, 2, 3].map((x) => x * 2)", "2,4,6")]
    #[case("[1, 2, 3, 4].filter((x) => x % 2 === 0)", "2,4")]
    #[case("[1, 2, 3].reduce((a, b) => a + b, 10)", "16")]
    #[case("[1, 2, 3].reduce((a, b) => a + b)", "6")]
    #[case("[1, 2, 3].find((x) => x > 1)", "2")]
    #[case("[1, 2, 3].findIndex((x) => x > 5)", "-1")]
    #[case("[1, 2, 3].some((x) => x > 2)", "true")]
    #[case("[1, 2, 3].every((x) => x > 2)", "false")]
    #[case("[1, 2, 3, 4].slice(-2)", "3,4")]
    #[case("[1].concat([2, 3], 4)", "1,2,3,4")]
    #[case("[NaN].includes(NaN)", "true")]
    #[case("[NaN].indexOf(NaN)", "-1")]
    #[case("[\"a\", null, \"b\"].join(\"-\")", "a--b")]
    #[case("\"Hello\".toUpperCase()", "HELLO")]
    #[case("\"hello\".slice(1, -1)", "ell")]
    #[case("\"hello\".substring(3, 1)", "el")]
    #[case("\"a,b,c\".split(\",\")", "a,b,c")]
    #[case("\"ab\".split(\"\").length", "2")]
    #[case("\"hello\".indexOf(\"l\")", "2")]
    #[case("\"ab\".repeat(3)", "ababab")]
    #[case("\"  x \".trim()", "x")]
    #[case("(3.14159).toFixed(2)", "3.14")]
    #[case("Object.keys({a: 1, b: 2})", "a,b")]
    #[case("Object.values({a: 1, b: 2})", "1,2")]
    #[case("Array.isArray([])", "true")]
    #[case("isNaN(\"x\")", "true")]
    fn test_builtins(#[case] expr: &str, #[case] expected: &str) {
        assert_eq!(eval(expr).to_js_string(), expected);
    }

    #[rstest]
    #[case("JSON.stringify({a: [1, \"x\", null], b: undefined})", r#"{"a":[1,"x",null]}"#)]
    #[case("JSON.stringify(2.5)", "2.5")]
    #[case("JSON.stringify([undefined])", "[null]")]
    fn test_json_stringify(#[case] expr: &str, #[case] expected: &str) {
        assert_eq!(eval(expr), Value::string(expected));
    }

    #[test]
    fn test_json_stringify_indent() {
        assert_eq!(
            eval("JSON.stringify({a: 1}, null, 2)"),
            Value::string("{\n  \"a\": 1\n}")
        );
    }

    #[test]
    fn test_push_mutates_shared_array() {
        let source = "let a = [1]; let b = a; b.push(2); let n = a.length;";
        let (tokens, _) = Lexer::new(source).tokenize();
        let (program, _) = Parser::new(tokens).parse();
        let mut interp = Interpreter::new();
        interp.eval(&program).unwrap();
        assert_eq!(interp.global("n"), Some(Value::Number(2.0)));
    }

    #[test]
    fn test_reduce_empty_without_initial() {
        let (tokens, _) = Lexer::new("[].reduce((a, b) => a);").tokenize();
        let (program, _) = Parser::new(tokens).parse();
        let err = Interpreter::new().eval(&program).unwrap_err();
        assert!(err.to_string().contains("Reduce of empty array"));
    }

    fn eval_err(source: &str) -> RuntimeError {
        let (tokens, _) = Lexer::new(source).tokenize();
        let (program, _) = Parser::new(tokens).parse();
        Interpreter::new().eval(&program).unwrap_err()
    }

    #[rstest]
    #[case("'ab'.repeat(16777216);", "Invalid string length")]
    #[case("let s = 'x'.repeat(4194304); [s, s, s, s, s].join('');", "Invalid string length")]
    #[case("'x'.repeat(2097152).split('');", "Invalid array length")]
    #[case("'x,'.repeat(1048576).split(',');", "Invalid array length")]
    fn test_builtins_refuse_oversized_results(#[case] source: &str, #[case] message: &str) {
        match eval_err(source) {
            RuntimeError::RangeError { msg, .. } => assert_eq!(msg, message),
            other => panic!("expected RangeError, got {:?}", other),
        }
    }

    #[test]
    fn test_unshift_past_the_cap() {
        let source = "let a = [0]; for (let i = 0; i < 20; i++) { a = a.concat(a); } a.unshift(1);";
        assert!(matches!(eval_err(source), RuntimeError::RangeError { .. }));
    }
}

//! Structural snapshots of runtime values
//!
//! A [`TraceValue`] is a serialization-safe copy of a [`Value`] taken at the
//! moment a probe fires. Later mutation of the original never shows through,
//! cycles are cut with a marker and nesting is bounded by a depth limit.

use crate::printer::format_number;
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Default nesting limit for snapshots
pub const DEFAULT_SNAPSHOT_DEPTH: usize = 16;

/// Snapshot of a runtime value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TraceValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<TraceValue>),
    Object(TraceObject),
    /// Function marker carrying the function's name
    Function(String),
    /// Class marker carrying the class name
    Class(String),
    /// Stand-in for a structure cut by the cycle guard or the depth limit
    Circular,
}

/// Object snapshot; `class` is set for class instances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub fields: IndexMap<String, TraceValue>,
}

impl TraceValue {
    /// Take a snapshot of `value`, descending at most `max_depth` levels
    pub fn capture(value: &Value, max_depth: usize) -> TraceValue {
        Capturer {
            ancestors: Vec::new(),
            max_depth,
        }
        .capture(value, 0)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            TraceValue::Undefined | TraceValue::Null => false,
            TraceValue::Bool(b) => *b,
            TraceValue::Number(n) => *n != 0.0 && !n.is_nan(),
            TraceValue::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Console-style rendering: strings bare at the top level, quoted when nested
    ///
    /// Follows the shape of Node's `console.log`: `-0`, `[ 1, 2 ]`,
    /// `{ a: 'x' }`, `Point { x: 1 }`.
    pub fn display(&self) -> String {
        match self {
            TraceValue::String(s) => s.clone(),
            other => other.inspect(),
        }
    }

    /// Rendering with strings quoted, as they appear inside containers
    pub fn inspect(&self) -> String {
        match self {
            TraceValue::Undefined => "undefined".to_string(),
            TraceValue::Null => "null".to_string(),
            TraceValue::Bool(b) => b.to_string(),
            TraceValue::Number(n) if *n == 0.0 && n.is_sign_negative() => "-0".to_string(),
            TraceValue::Number(n) => format_number(*n),
            TraceValue::String(s) => quoted(s),
            TraceValue::Array(items) if items.is_empty() => "[]".to_string(),
            TraceValue::Array(items) => {
                let items: Vec<String> = items.iter().map(|v| v.inspect()).collect();
                format!("[ {} ]", items.join(", "))
            }
            TraceValue::Object(object) => {
                let fields: Vec<String> = object
                    .fields
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.inspect()))
                    .collect();
                let body = if fields.is_empty() {
                    "{}".to_string()
                } else {
                    format!("{{ {} }}", fields.join(", "))
                };
                match &object.class {
                    Some(class) => format!("{} {}", class, body),
                    None => body,
                }
            }
            TraceValue::Function(name) => format!("[Function: {}]", name),
            TraceValue::Class(name) => format!("[class {}]", name),
            TraceValue::Circular => "[Circular]".to_string(),
        }
    }
}

struct Capturer {
    /// Containers on the path from the root to the current value
    ancestors: Vec<*const ()>,
    max_depth: usize,
}

impl Capturer {
    fn capture(&mut self, value: &Value, depth: usize) -> TraceValue {
        match value {
            Value::Undefined => TraceValue::Undefined,
            Value::Null => TraceValue::Null,
            Value::Bool(b) => TraceValue::Bool(*b),
            Value::Number(n) => TraceValue::Number(*n),
            Value::String(s) => TraceValue::String(s.to_string()),
            Value::Function(closure) => TraceValue::Function(closure.name.clone()),
            Value::Native(native) => TraceValue::Function(native.name.to_string()),
            Value::Class(class) => TraceValue::Class(class.name.clone()),
            Value::Snapshot(snapshot) => snapshot.as_ref().clone(),
            Value::Array(items) => {
                let ptr = Rc::as_ptr(items) as *const ();
                if !self.enter(ptr, depth) {
                    return TraceValue::Circular;
                }
                let copied = items
                    .borrow()
                    .iter()
                    .map(|item| self.capture(item, depth + 1))
                    .collect();
                self.ancestors.pop();
                TraceValue::Array(copied)
            }
            Value::Object(object) => {
                let ptr = Rc::as_ptr(object) as *const ();
                if !self.enter(ptr, depth) {
                    return TraceValue::Circular;
                }
                let object = object.borrow();
                let fields = object
                    .properties
                    .iter()
                    .map(|(key, value)| (key.clone(), self.capture(value, depth + 1)))
                    .collect();
                self.ancestors.pop();
                TraceValue::Object(TraceObject {
                    class: object.class.as_ref().map(|c| c.name.clone()),
                    fields,
                })
            }
        }
    }

    fn enter(&mut self, ptr: *const (), depth: usize) -> bool {
        if depth >= self.max_depth || self.ancestors.contains(&ptr) {
            return false;
        }
        self.ancestors.push(ptr);
        true
    }
}

/// Quote a nested string, preferring single quotes
fn quoted(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn obj(fields: Vec<(&str, Value)>) -> Value {
        Value::object(
            fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn test_capture_is_a_copy() {
        let arr = Value::array(vec![Value::Number(1.0)]);
        let snap = TraceValue::capture(&arr, DEFAULT_SNAPSHOT_DEPTH);
        if let Value::Array(items) = &arr {
            items.borrow_mut().push(Value::Number(2.0));
        }
        assert_eq!(snap, TraceValue::Array(vec![TraceValue::Number(1.0)]));
    }

    #[test]
    fn test_cycle_is_cut() {
        let o = obj(vec![("name", Value::string("a"))]);
        if let Value::Object(inner) = &o {
            inner
                .borrow_mut()
                .properties
                .insert("self".to_string(), o.clone());
        }
        let snap = TraceValue::capture(&o, DEFAULT_SNAPSHOT_DEPTH);
        let TraceValue::Object(object) = snap else {
            panic!("expected object snapshot");
        };
        assert_eq!(object.fields["self"], TraceValue::Circular);
    }

    #[test]
    fn test_shared_reference_is_not_circular() {
        let shared = Value::array(vec![]);
        let outer = Value::array(vec![shared.clone(), shared]);
        let snap = TraceValue::capture(&outer, DEFAULT_SNAPSHOT_DEPTH);
        assert_eq!(
            snap,
            TraceValue::Array(vec![TraceValue::Array(vec![]), TraceValue::Array(vec![])])
        );
    }

    #[test]
    fn test_depth_limit() {
        let nested = Value::array(vec![Value::array(vec![Value::array(vec![])])]);
        let snap = TraceValue::capture(&nested, 2);
        assert_eq!(
            snap,
            TraceValue::Array(vec![TraceValue::Array(vec![TraceValue::Circular])])
        );
    }

    #[test]
    fn test_display() {
        let value = obj(vec![
            ("a", Value::Number(1.0)),
            ("b", Value::array(vec![Value::string("x"), Value::Null])),
        ]);
        let snap = TraceValue::capture(&value, DEFAULT_SNAPSHOT_DEPTH);
        assert_eq!(snap.display(), "{ a: 1, b: [ 'x', null ] }");
        assert_eq!(TraceValue::String("hi".into()).display(), "hi");
        let empty = TraceValue::Object(TraceObject {
            class: None,
            fields: IndexMap::new(),
        });
        assert_eq!(empty.display(), "{}");
    }

    #[rstest::rstest]
    #[case(Value::Number(-0.0), "-0")]
    #[case(Value::Number(0.0), "0")]
    #[case(Value::array(vec![Value::Number(1.0), Value::Number(-0.0)]), "[ 1, -0 ]")]
    #[case(Value::array(vec![]), "[]")]
    #[case(Value::array(vec![Value::string("it's")]), r#"[ "it's" ]"#)]
    #[case(Value::array(vec![Value::string("a\nb")]), r"[ 'a\nb' ]")]
    fn test_display_matches_console(#[case] value: Value, #[case] expected: &str) {
        let snap = TraceValue::capture(&value, DEFAULT_SNAPSHOT_DEPTH);
        assert_eq!(snap.display(), expected);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_string(&TraceValue::Number(3.0)).unwrap();
        assert_eq!(json, r#"{"type":"number","value":3.0}"#);
        let json = serde_json::to_string(&TraceValue::Undefined).unwrap();
        assert_eq!(json, r#"{"type":"undefined"}"#);
    }
}

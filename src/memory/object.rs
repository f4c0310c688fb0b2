//! Heap objects
//!
//! Every non-primitive value is an [`Object`] behind an [`ObjectRef`]. The
//! object kind decides how indexed access, `length` and string conversion
//! behave; named properties live in a shared property map for all kinds.

use super::scope::ScopeRef;
use super::value::Value;
use crate::interpreter::host::HostFn;
use crate::parser::ast::FunctionDef;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub type ObjectRef = Rc<RefCell<Object>>;

/// A script closure: function definition plus captured scope.
pub struct Closure {
    pub def: Rc<FunctionDef>,
    /// `None` when created at global level.
    pub scope: Option<ScopeRef>,
    /// Unit the function was compiled from, for diagnostics.
    pub filename: Option<Rc<str>>,
}

/// A function implemented in Rust.
#[derive(Clone, Copy)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: u32,
    pub handler: HostFn,
}

pub enum Callable {
    Script(Closure),
    Native(NativeFunction),
}

pub enum ObjectKind {
    Plain,
    Array(Vec<Value>),
    /// Error instances carry `name` and `message` properties.
    Error,
    Function(Callable),
}

pub struct Object {
    pub kind: ObjectKind,
    pub properties: FxHashMap<String, Value>,
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[object {}]", self.class_name())
    }
}

/// Parses an array index key (`"0"`, `"12"`); rejects `"01"` and `"-1"`.
pub fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

impl Object {
    pub fn new(kind: ObjectKind) -> Self {
        Object {
            kind,
            properties: FxHashMap::default(),
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self.kind {
            ObjectKind::Plain => "Object",
            ObjectKind::Array(_) => "Array",
            ObjectKind::Error => "Error",
            ObjectKind::Function(_) => "Function",
        }
    }

    /// Own property lookup, including array elements and `length`.
    pub fn get(&self, key: &str) -> Option<Value> {
        match &self.kind {
            ObjectKind::Array(elements) => {
                if key == "length" {
                    return Some(Value::Number(elements.len() as f64));
                }
                if let Some(index) = array_index(key) {
                    return elements.get(index).cloned();
                }
            }
            ObjectKind::Function(callable) => {
                if let Some(value) = self.properties.get(key) {
                    return Some(value.clone());
                }
                return match (key, callable) {
                    ("length", Callable::Script(c)) => {
                        Some(Value::Number(c.def.params.len() as f64))
                    }
                    ("length", Callable::Native(n)) => Some(Value::Number(n.arity as f64)),
                    ("name", Callable::Script(c)) => {
                        Some(Value::from(c.def.name.clone().unwrap_or_default()))
                    }
                    ("name", Callable::Native(n)) => Some(Value::from(n.name)),
                    _ => None,
                };
            }
            _ => {}
        }
        self.properties.get(key).cloned()
    }

    pub fn set(&mut self, key: &str, value: Value) {
        if let ObjectKind::Array(elements) = &mut self.kind {
            if key == "length" {
                let len = value.to_number();
                if len >= 0.0 && len.is_finite() {
                    elements.resize(len as usize, Value::Undefined);
                }
                return;
            }
            if let Some(index) = array_index(key) {
                if index >= elements.len() {
                    elements.resize(index + 1, Value::Undefined);
                }
                elements[index] = value;
                return;
            }
        }
        self.properties.insert(key.to_string(), value);
    }

    /// `ToString` for objects.
    pub fn display_string(&self) -> String {
        match &self.kind {
            ObjectKind::Plain => "[object Object]".to_string(),
            ObjectKind::Array(elements) => elements
                .iter()
                .map(|v| match v {
                    Value::Undefined | Value::Null => String::new(),
                    other => other.to_display_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            ObjectKind::Error => {
                let name = self
                    .properties
                    .get("name")
                    .map(Value::to_display_string)
                    .unwrap_or_else(|| "Error".to_string());
                let message = self
                    .properties
                    .get("message")
                    .map(Value::to_display_string)
                    .unwrap_or_default();
                if message.is_empty() {
                    name
                } else {
                    format!("{}: {}", name, message)
                }
            }
            ObjectKind::Function(Callable::Script(closure)) => format!(
                "function {}({}) {{\n    [script code]\n}}",
                closure.def.name.as_deref().unwrap_or(""),
                closure.def.params.join(", ")
            ),
            ObjectKind::Function(Callable::Native(native)) => {
                format!("function {}() {{\n    [native code]\n}}", native.name)
            }
        }
    }

    /// Rough byte footprint, used for collection statistics.
    pub fn estimated_size(&self) -> usize {
        let base = std::mem::size_of::<Object>();
        let properties: usize = self
            .properties
            .keys()
            .map(|k| k.len() + std::mem::size_of::<Value>())
            .sum();
        let elements = match &self.kind {
            ObjectKind::Array(elements) => elements.len() * std::mem::size_of::<Value>(),
            _ => 0,
        };
        base + properties + elements
    }

    /// Drops everything this object references so reference cycles between
    /// closures and their scopes can be reclaimed.
    pub fn clear(&mut self) {
        self.properties.clear();
        self.kind = ObjectKind::Plain;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_index_keys() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("42"), Some(42));
        assert_eq!(array_index("01"), None);
        assert_eq!(array_index("-1"), None);
        assert_eq!(array_index("length"), None);
    }

    #[test]
    fn test_array_growth_and_length() {
        let mut array = Object::new(ObjectKind::Array(Vec::new()));
        array.set("2", Value::Number(7.0));
        assert_eq!(array.get("length").map(|v| v.to_number()), Some(3.0));
        assert!(array.get("0").is_some_and(|v| v.is_undefined()));
        assert_eq!(array.display_string(), ",,7");

        array.set("length", Value::Number(1.0));
        assert_eq!(array.get("length").map(|v| v.to_number()), Some(1.0));
    }

    #[test]
    fn test_error_display() {
        let mut error = Object::new(ObjectKind::Error);
        error.set("name", Value::from("TypeError"));
        error.set("message", Value::from("x is not a function"));
        assert_eq!(error.display_string(), "TypeError: x is not a function");
    }
}

//! Functions callable from template pipelines.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A template function: receives evaluated arguments, returns a value.
pub type TemplateFn = Arc<dyn Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync>;

/// Named functions made available to templates.
#[derive(Clone, Default)]
pub struct FuncRegistry {
    funcs: HashMap<String, TemplateFn>,
}

impl fmt::Debug for FuncRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl FuncRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function, replacing any previous one with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.funcs.insert(name.into(), Arc::new(func));
        self
    }

    /// Merge another registry in; its entries win.
    pub fn extend(&mut self, other: &FuncRegistry) -> &mut Self {
        for (name, func) in &other.funcs {
            self.funcs.insert(name.clone(), Arc::clone(func));
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&TemplateFn> {
        self.funcs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.funcs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }
}

/// Names the engine always provides.
pub(crate) const BUILTINS: &[&str] = &["and", "eq", "len", "ne", "not", "or", "print"];

pub(crate) fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Truthiness used by `if`, `with`, `and`, `or` and `not`.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Text form of a value as printed into output.
pub(crate) fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn call_builtin(name: &str, args: &[Value]) -> anyhow::Result<Value> {
    match name {
        "not" => {
            let [value] = args else {
                anyhow::bail!("wrong number of args for not: want 1 got {}", args.len());
            };
            Ok(Value::Bool(!truthy(value)))
        }
        "eq" | "ne" => {
            let [first, rest @ ..] = args else {
                anyhow::bail!("missing argument for comparison");
            };
            if rest.is_empty() {
                anyhow::bail!("missing argument for comparison");
            }
            let equal = rest.iter().any(|other| values_equal(first, other));
            Ok(Value::Bool(if name == "eq" { equal } else { !equal }))
        }
        "len" => {
            let [value] = args else {
                anyhow::bail!("wrong number of args for len: want 1 got {}", args.len());
            };
            let len = match value {
                Value::String(s) => s.chars().count(),
                Value::Array(items) => items.len(),
                Value::Object(map) => map.len(),
                other => anyhow::bail!("len of {}", type_name(other)),
            };
            Ok(Value::from(len))
        }
        "print" => Ok(Value::String(
            args.iter().map(display).collect::<Vec<_>>().join(""),
        )),
        "and" => Ok(args
            .iter()
            .find(|value| !truthy(value))
            .or(args.last())
            .cloned()
            .unwrap_or(Value::Null)),
        "or" => Ok(args
            .iter()
            .find(|value| truthy(value))
            .or(args.last())
            .cloned()
            .unwrap_or(Value::Null)),
        other => anyhow::bail!("function \"{}\" not defined", other),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "nil",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registry_register_and_merge() {
        let mut funcs = FuncRegistry::new();
        funcs.register("upper", |args| {
            Ok(Value::String(display(&args[0]).to_uppercase()))
        });
        let mut other = FuncRegistry::new();
        other.register("lower", |args| {
            Ok(Value::String(display(&args[0]).to_lowercase()))
        });
        funcs.extend(&other);

        assert_eq!(funcs.names(), vec!["lower", "upper"]);
        assert!(funcs.contains("upper"));
        let upper = funcs.get("upper").unwrap();
        assert_eq!(upper(&[json!("abc")]).unwrap(), json!("ABC"));
    }

    #[test]
    fn truthiness() {
        assert!(!truthy(&json!(null)));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("")));
        assert!(!truthy(&json!([])));
        assert!(truthy(&json!({"a": 1})));
        assert!(truthy(&json!(0.5)));
    }

    #[test]
    fn comparison_builtins() {
        assert_eq!(call_builtin("eq", &[json!(1), json!(1.0)]).unwrap(), json!(true));
        assert_eq!(
            call_builtin("eq", &[json!("a"), json!("b"), json!("a")]).unwrap(),
            json!(true)
        );
        assert_eq!(call_builtin("ne", &[json!("a"), json!("b")]).unwrap(), json!(true));
        assert!(call_builtin("eq", &[json!(1)]).is_err());
    }

    #[test]
    fn logic_builtins_return_operands() {
        assert_eq!(call_builtin("and", &[json!(1), json!("")]).unwrap(), json!(""));
        assert_eq!(call_builtin("and", &[json!(1), json!("x")]).unwrap(), json!("x"));
        assert_eq!(call_builtin("or", &[json!(0), json!("y")]).unwrap(), json!("y"));
        assert_eq!(call_builtin("not", &[json!([])]).unwrap(), json!(true));
    }

    #[test]
    fn len_and_print() {
        assert_eq!(call_builtin("len", &[json!("héllo")]).unwrap(), json!(5));
        assert_eq!(call_builtin("len", &[json!([1, 2])]).unwrap(), json!(2));
        assert!(call_builtin("len", &[json!(3)]).is_err());
        assert_eq!(
            call_builtin("print", &[json!("a"), json!(1), json!(null)]).unwrap(),
            json!("a1")
        );
    }
}

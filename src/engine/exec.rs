//! Walks parsed templates against a JSON data value.

use super::funcs::{call_builtin, display, truthy, type_name};
use super::parse::{Arg, Command, Node, Pipeline};
use super::set::TemplateSet;
use serde_json::Value;

/// Nested `template` calls allowed before execution gives up.
pub(crate) const MAX_DEPTH: usize = 100;

pub(crate) struct Exec<'a> {
    set: &'a TemplateSet,
    out: String,
    depth: usize,
}

impl<'a> Exec<'a> {
    pub(crate) fn new(set: &'a TemplateSet) -> Self {
        Self {
            set,
            out: String::new(),
            depth: 0,
        }
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }

    pub(crate) fn walk(&mut self, nodes: &[Node], dot: &Value) -> Result<(), String> {
        for node in nodes {
            self.node(node, dot)?;
        }
        Ok(())
    }

    fn node(&mut self, node: &Node, dot: &Value) -> Result<(), String> {
        match node {
            Node::Text(text) => self.out.push_str(text),
            Node::Action(pipe) => {
                let value = self.pipeline(pipe, dot)?;
                self.out.push_str(&display(&value));
            }
            Node::If {
                cond,
                then,
                otherwise,
            } => {
                if truthy(&self.pipeline(cond, dot)?) {
                    self.walk(then, dot)?;
                } else {
                    self.walk(otherwise, dot)?;
                }
            }
            Node::With {
                pipe,
                body,
                otherwise,
            } => {
                let value = self.pipeline(pipe, dot)?;
                if truthy(&value) {
                    self.walk(body, &value)?;
                } else {
                    self.walk(otherwise, dot)?;
                }
            }
            Node::Range {
                pipe,
                body,
                otherwise,
            } => {
                let value = self.pipeline(pipe, dot)?;
                let items: Vec<&Value> = match &value {
                    Value::Null => Vec::new(),
                    Value::Array(items) => items.iter().collect(),
                    Value::Object(map) => map.values().collect(),
                    other => return Err(format!("range can't iterate over {}", other)),
                };
                if items.is_empty() {
                    self.walk(otherwise, dot)?;
                }
                for item in items {
                    self.walk(body, item)?;
                }
            }
            Node::Template { name, pipe } => {
                let value = match pipe {
                    Some(pipe) => self.pipeline(pipe, dot)?,
                    None => Value::Null,
                };
                self.call_template(name, &value)?;
            }
        }
        Ok(())
    }

    pub(crate) fn call_template(&mut self, name: &str, dot: &Value) -> Result<(), String> {
        let Some(tree) = self.set.tree(name) else {
            return Err(format!("no such template \"{}\"", name));
        };
        if self.depth >= MAX_DEPTH {
            return Err(format!("exceeded maximum template depth ({})", MAX_DEPTH));
        }
        self.depth += 1;
        let result = self.walk(&tree, dot);
        self.depth -= 1;
        result
    }

    fn pipeline(&self, pipe: &Pipeline, dot: &Value) -> Result<Value, String> {
        let mut last: Option<Value> = None;
        for command in &pipe.commands {
            last = Some(self.command(command, dot, last.take())?);
        }
        Ok(last.unwrap_or(Value::Null))
    }

    fn command(&self, command: &Command, dot: &Value, piped: Option<Value>) -> Result<Value, String> {
        match command.args.split_first() {
            Some((Arg::Func(name), rest)) => {
                let mut args = rest
                    .iter()
                    .map(|arg| self.arg(arg, dot))
                    .collect::<Result<Vec<_>, _>>()?;
                args.extend(piped);
                self.call(name, &args)
            }
            Some((arg, [])) if piped.is_none() => self.arg(arg, dot),
            _ => Err("can't give argument to non-function".to_string()),
        }
    }

    fn arg(&self, arg: &Arg, dot: &Value) -> Result<Value, String> {
        match arg {
            Arg::Dot => Ok(dot.clone()),
            Arg::Literal(value) => Ok(value.clone()),
            Arg::Field(fields) => field(dot, fields),
            Arg::Func(name) => self.call(name, &[]),
        }
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Value, String> {
        let result = match self.set.funcs().get(name) {
            Some(func) => func(args),
            None => call_builtin(name, args),
        };
        result.map_err(|err| format!("error calling {}: {:#}", name, err))
    }
}

fn field(dot: &Value, fields: &[String]) -> Result<Value, String> {
    let mut current = dot;
    for name in fields {
        current = match current {
            Value::Object(map) => match map.get(name) {
                Some(value) => value,
                None => return Ok(Value::Null),
            },
            Value::Null => return Ok(Value::Null),
            other => {
                return Err(format!(
                    "can't evaluate field {} in {}",
                    name,
                    type_name(other)
                ))
            }
        };
    }
    Ok(current.clone())
}

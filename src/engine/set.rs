use super::exec::Exec;
use super::funcs::is_builtin;
use super::lexer::lex;
use super::parse::{is_empty_tree, parse, Node};
use super::{Delimiters, FuncRegistry};
use crate::error::{Result, TemplateError};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

/// A flat set of named templates sharing delimiters and functions.
///
/// Cloning is cheap: parsed trees are shared, so a clone can be extended
/// without touching the original.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    name: String,
    delims: Delimiters,
    funcs: FuncRegistry,
    templates: HashMap<String, Arc<Vec<Node>>>,
}

impl TemplateSet {
    /// Create an empty set named after its entry template.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            delims: Delimiters::default(),
            funcs: FuncRegistry::new(),
            templates: HashMap::new(),
        }
    }

    /// Use `delims` for every template parsed afterwards.
    pub fn with_delims(mut self, delims: Delimiters) -> Self {
        self.delims = delims;
        self
    }

    /// Make `funcs` callable from templates parsed afterwards.
    pub fn with_funcs(mut self, funcs: FuncRegistry) -> Self {
        self.funcs = funcs;
        self
    }

    /// Name of the entry template.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delimiters used when parsing.
    pub fn delims(&self) -> &Delimiters {
        &self.delims
    }

    /// Functions available to templates.
    pub fn funcs(&self) -> &FuncRegistry {
        &self.funcs
    }

    /// Parse `source`, storing its body as `name` and each `define` under
    /// its own name.
    ///
    /// A template whose body is only whitespace never replaces an existing
    /// one. Nothing is stored if the source fails to parse.
    pub fn parse(&mut self, name: &str, source: &str) -> Result<()> {
        let syntax = |err: super::SyntaxError| TemplateError::Syntax {
            name: name.to_string(),
            message: err.to_string(),
        };

        let items = lex(source, &self.delims).map_err(syntax)?;
        let funcs = &self.funcs;
        let parsed = parse(items, &|func: &str| funcs.contains(func) || is_builtin(func))
            .map_err(syntax)?;

        for (define, body) in parsed.defines {
            self.associate(define, body);
        }
        self.associate(name.to_string(), parsed.body);
        Ok(())
    }

    fn associate(&mut self, name: String, body: Vec<Node>) {
        if is_empty_tree(&body) && self.templates.contains_key(&name) {
            return;
        }
        self.templates.insert(name, Arc::new(body));
    }

    /// Whether a template is stored under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Template names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of stored templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether no template is stored.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub(crate) fn tree(&self, name: &str) -> Option<Arc<Vec<Node>>> {
        self.templates.get(name).cloned()
    }

    /// Render the named template against `data`.
    pub fn render(&self, name: &str, data: &Value) -> Result<String> {
        if !self.contains(name) {
            return Err(TemplateError::NotDefined {
                name: name.to_string(),
            });
        }

        let mut exec = Exec::new(self);
        exec.call_template(name, data)
            .map_err(|message| TemplateError::Render {
                name: name.to_string(),
                message,
            })?;
        Ok(exec.finish())
    }

    /// Render the named template into a writer.
    pub fn execute<W: Write>(&self, name: &str, data: &Value, out: &mut W) -> Result<()> {
        let rendered = self.render(name, data)?;
        out.write_all(rendered.as_bytes())?;
        Ok(())
    }
}

//! A small text template engine with named, composable templates.
//!
//! Inheritance is layered on top of this engine, so it only has to provide
//! a flat, named set of templates:
//!
//! - `{{ define "name" }}...{{ end }}` declares a named template
//! - `{{ block "name" . }}...{{ end }}` declares and calls one in place
//! - `{{ template "name" . }}` calls a named template
//! - Re-parsing a name replaces the previous template unless the new body
//!   is empty
//!
//! Actions also support field access (`.a.b`), pipelines (`.x | fn`),
//! `if`/`else if`/`else`, `range`, `with` and comments (`{{/* */}}`).

mod exec;
mod funcs;
mod lexer;
mod parse;
mod set;

pub use funcs::{FuncRegistry, TemplateFn};
pub use set::TemplateSet;

use crate::error::{Result, TemplateError};
use std::fmt;

/// Action delimiters, `{{` and `}}` by default.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Delimiters {
    pub left: String,
    pub right: String,
}

impl Delimiters {
    /// Create delimiters, rejecting empty ones.
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Result<Self> {
        let left = left.into();
        let right = right.into();
        if left.is_empty() || right.is_empty() {
            return Err(TemplateError::InvalidDelimiters { left, right });
        }
        Ok(Self { left, right })
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            left: "{{".to_string(),
            right: "}}".to_string(),
        }
    }
}

/// Lexing or parsing failure inside one template source.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

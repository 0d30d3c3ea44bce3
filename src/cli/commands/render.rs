//! Render command implementation.
//!
//! The `stratum render` command renders one template to stdout.

use std::io::Write;

use anyhow::Context;
use serde_json::Value;

use crate::cli::args::RenderArgs;
use crate::environment::Environment;
use crate::error::Result;

use super::dispatcher::{Command, CommandResult};

/// The render command implementation.
pub struct RenderCommand {
    args: RenderArgs,
}

impl RenderCommand {
    /// Create a new render command.
    pub fn new(args: RenderArgs) -> Self {
        Self { args }
    }

    fn data(&self) -> Result<Value> {
        let Some(data) = &self.args.data else {
            return Ok(Value::Null);
        };
        let value = serde_json::from_str(data).context("--data is not valid JSON")?;
        Ok(value)
    }
}

impl Command for RenderCommand {
    fn execute(&self, env: &Environment, out: &mut dyn Write) -> Result<CommandResult> {
        let data = self.data()?;
        let wrapper = env.load(&self.args.name)?;

        let rendered = match &self.args.block {
            Some(block) => wrapper.render_template(block, &data)?,
            None => wrapper.render(&data)?,
        };

        out.write_all(rendered.as_bytes())?;
        out.flush()?;
        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TemplateError;
    use crate::loader::MemoryLoader;
    use std::sync::Arc;

    fn env() -> Environment {
        let loader = MemoryLoader::new();
        loader
            .add("layout.html", r#"<{{ block "main" . }}{{ end }}>"#)
            .add(
                "page.html",
                r#"{{ extends "layout.html" }}{{ define "main" }}{{ .n }}{{ end }}"#,
            );
        Environment::new(Arc::new(loader))
    }

    fn args(name: &str, data: Option<&str>, block: Option<&str>) -> RenderArgs {
        RenderArgs {
            name: name.to_string(),
            data: data.map(str::to_string),
            block: block.map(str::to_string),
        }
    }

    #[test]
    fn renders_entry_template() {
        let mut out = Vec::new();
        RenderCommand::new(args("page.html", Some(r#"{"n": 5}"#), None))
            .execute(&env(), &mut out)
            .unwrap();
        assert_eq!(out, b"<5>");
    }

    #[test]
    fn renders_block() {
        let mut out = Vec::new();
        RenderCommand::new(args("page.html", Some(r#"{"n": 6}"#), Some("main")))
            .execute(&env(), &mut out)
            .unwrap();
        assert_eq!(out, b"6");
    }

    #[test]
    fn invalid_json_is_reported() {
        let mut out = Vec::new();
        let err = RenderCommand::new(args("page.html", Some("{nope"), None))
            .execute(&env(), &mut out)
            .unwrap_err();
        assert!(matches!(err, TemplateError::Other(_)));
        assert!(err.to_string().contains("--data"));
    }
}

//! Stratum - template inheritance over a flat template engine.
//!
//! Templates can extend a parent (`{{ extends "layout.html" }}`), override
//! its named blocks, and include named fragments (`{{ template "nav.html" }}`).
//! Sources come from pluggable loaders and compiled templates are cached until
//! one of their sources changes.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - `stratum.yml` loading and environment construction
//! - [`engine`] - The flat, named-template engine compiled units run on
//! - [`environment`] - Shared configuration and the wrapper cache
//! - [`error`] - Error types and result aliases
//! - [`loader`] - Template sources: memory, filesystem and chains
//! - [`resolve`] - Extends/include resolution into a compiled unit
//! - [`wrapper`] - One compiled entry template and its freshness
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use stratum::environment::Environment;
//! use stratum::loader::MemoryLoader;
//!
//! let loader = MemoryLoader::from_templates([
//!     ("@main/layout.html", r#"<body>{{block "content" .}}{{end}}</body>"#),
//!     ("@main/title.html", "<h1>Title Test</h1>"),
//!     (
//!         "@main/view.html",
//!         r#"{{extends "layout.html"}}{{define "content"}}{{template "title.html"}}{{end}}"#,
//!     ),
//! ]);
//!
//! let env = Environment::new(Arc::new(loader));
//! let view = env.load("@main/view.html").unwrap();
//! assert_eq!(
//!     view.render(&serde_json::Value::Null).unwrap(),
//!     "<body><h1>Title Test</h1></body>"
//! );
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod environment;
pub mod error;
pub mod loader;
pub mod resolve;
pub mod wrapper;

pub use environment::Environment;
pub use error::{Result, TemplateError};
pub use wrapper::TemplateWrapper;

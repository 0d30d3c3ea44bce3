//! Environment configuration files.
//!
//! - Schema definitions in [`schema`]
//! - File discovery, loading and environment construction in [`loader`]
//!
//! # Example
//!
//! ```
//! use stratum::config::load_config;
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! fs::create_dir_all(temp.path().join("templates/main")).unwrap();
//! fs::write(temp.path().join("templates/main/hi.html"), "hi {{ .name }}").unwrap();
//! fs::write(temp.path().join("stratum.yml"), "debug: true").unwrap();
//!
//! let config = load_config(&temp.path().join("stratum.yml")).unwrap();
//! let env = config.build(temp.path()).unwrap();
//! let hi = env.load("@main/hi.html").unwrap();
//! assert_eq!(hi.render(&serde_json::json!({"name": "there"})).unwrap(), "hi there");
//! ```

pub mod loader;
pub mod schema;

pub use loader::{find_config, load_config, parse_config, CONFIG_FILE};
pub use schema::{DelimitersConfig, EnvironmentConfig};

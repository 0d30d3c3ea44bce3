//! Configuration schema for `stratum.yml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure.
///
/// ```yaml
/// root: templates
/// debug: false
/// delimiters:
///   left: "{{"
///   right: "}}"
/// globals:
///   - "@main/global.html"
/// namespaces:
///   main: [main, base]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Template root directory, relative to the config file.
    pub root: PathBuf,

    /// Reparse templates on every load.
    #[serde(skip_serializing_if = "is_false")]
    pub debug: bool,

    /// Action delimiters.
    pub delimiters: DelimitersConfig,

    /// Templates compiled into every entry template.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub globals: Vec<String>,

    /// Namespace to search directories, relative to `root`.
    ///
    /// When omitted, every top-level directory of `root` becomes a namespace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<BTreeMap<String, Vec<String>>>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            debug: false,
            delimiters: DelimitersConfig::default(),
            globals: Vec::new(),
            namespaces: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelimitersConfig {
    pub left: String,
    pub right: String,
}

impl Default for DelimitersConfig {
    fn default() -> Self {
        Self {
            left: "{{".to_string(),
            right: "}}".to_string(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("templates")
}

fn is_false(value: &bool) -> bool {
    !*value
}

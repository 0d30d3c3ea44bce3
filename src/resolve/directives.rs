//! Extends/include directive extraction.
//!
//! Two directives are recognised inside a delimiter pair `(L, R)`:
//!
//! - `L extends "NAME" R` - inherit from `NAME`; removed from the source
//! - `L ... template "NAME" ... R` - include `NAME`; left in the source
//!
//! Extraction is pure: bytes in, cleaned bytes and matches out.

use crate::engine::Delimiters;
use crate::error::Result;
use regex::bytes::Regex;
use std::ops::Range;

const EXTENDS_PATTERN: &str = r#"{L}\s*extends\s*"(.*?)"\s*{R}"#;
const INCLUDE_PATTERN: &str = r#"{L}.*?template\s*"(.*?)".*?{R}"#;

/// An include directive found in a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    /// Target template name as written.
    pub name: String,
    /// Byte range of the name inside the scanned (extends-stripped) code.
    pub span: Range<usize>,
}

/// Result of scanning one template source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan {
    /// Source with every extends directive removed.
    pub code: Vec<u8>,
    /// Target of the first extends directive.
    pub extends: Option<String>,
    /// Include targets in source order.
    pub includes: Vec<Include>,
}

/// Compiled directive patterns for one delimiter pair.
#[derive(Debug, Clone)]
pub struct Directives {
    extends: Regex,
    include: Regex,
}

impl Directives {
    /// Compile the patterns for a delimiter pair.
    pub fn new(delims: &Delimiters) -> Result<Self> {
        Ok(Self {
            extends: compile(EXTENDS_PATTERN, delims)?,
            include: compile(INCLUDE_PATTERN, delims)?,
        })
    }

    /// Scan a source for directives.
    pub fn scan(&self, code: &[u8]) -> Scan {
        let extends = self
            .extends
            .captures(code)
            .and_then(|caps| caps.get(1))
            .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned());

        let code = match extends {
            Some(_) => self.extends.replace_all(code, &b""[..]).into_owned(),
            None => code.to_vec(),
        };

        let includes = self
            .include
            .captures_iter(&code)
            .filter_map(|caps| caps.get(1))
            .map(|m| Include {
                name: String::from_utf8_lossy(m.as_bytes()).into_owned(),
                span: m.range(),
            })
            .collect();

        Scan {
            code,
            extends,
            includes,
        }
    }
}

/// Scan `code` for directives bounded by `left`/`right`.
///
/// ```
/// use stratum::resolve::extract_directives;
///
/// let scan = extract_directives(
///     br#"{{extends "layout.html"}}{{define "body"}}{{template "nav.html"}}{{end}}"#,
///     "{{",
///     "}}",
/// )
/// .unwrap();
///
/// assert_eq!(scan.extends.as_deref(), Some("layout.html"));
/// assert_eq!(scan.includes[0].name, "nav.html");
/// assert!(!scan.code.starts_with(b"{{extends"));
/// ```
pub fn extract_directives(code: &[u8], left: &str, right: &str) -> Result<Scan> {
    let delims = Delimiters::new(left, right)?;
    Ok(Directives::new(&delims)?.scan(code))
}

fn compile(pattern: &str, delims: &Delimiters) -> Result<Regex> {
    let pattern = pattern
        .replace("{L}", &regex::escape(&delims.left))
        .replace("{R}", &regex::escape(&delims.right));
    Regex::new(&pattern).map_err(|e| anyhow::anyhow!("invalid directive pattern: {}", e).into())
}

/// Splice `prefix` in front of every span, back to front so earlier spans
/// stay valid.
pub(crate) fn prefix_spans(code: &mut Vec<u8>, spans: &[Range<usize>], prefix: &str) {
    let mut starts: Vec<usize> = spans.iter().map(|span| span.start).collect();
    starts.sort_unstable();
    for start in starts.into_iter().rev() {
        code.splice(start..start, prefix.bytes());
    }
}

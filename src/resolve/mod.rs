//! Template inheritance resolution.
//!
//! Starting from one template name, the [`Resolver`] follows a single
//! `extends` directive up to the topmost ancestor and every `template`
//! include, building a [`NodeTree`]. The tree is then compiled into a
//! [`TemplateSet`](crate::engine::TemplateSet):
//!
//! 1. The topmost ancestor's body under the entry name
//! 2. Each include under its own name
//! 3. Every descendant's block overrides, the final one as `child_<name>`

pub mod directives;
pub mod resolver;
pub mod tree;

pub use directives::{extract_directives, Directives, Include, Scan};
pub use resolver::{ResolveHook, Resolver};
pub use tree::{child_template_name, Node, NodeId, NodeTree};

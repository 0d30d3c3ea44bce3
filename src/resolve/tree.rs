//! Arena-backed resolution graph.

use crate::engine::TemplateSet;
use crate::error::{Result, TemplateError};
use crate::loader::Source;

/// Index of a node inside a [`NodeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// One resolved template.
#[derive(Debug, Clone)]
pub struct Node {
    /// Fully qualified template name.
    pub name: String,
    /// Source with the extends directive stripped and includes qualified.
    pub source: Source,
    /// Template this one extends.
    pub parent: Option<NodeId>,
    /// Template that extends this one.
    pub child: Option<NodeId>,
    /// Included templates, in source order.
    pub includes: Vec<NodeId>,
}

impl Node {
    /// Source code as text.
    pub fn code(&self) -> Result<&str> {
        std::str::from_utf8(&self.source.code).map_err(|_| TemplateError::Encoding {
            name: self.name.clone(),
        })
    }
}

/// Nodes of one resolution, addressed by [`NodeId`].
#[derive(Debug, Default, Clone)]
pub struct NodeTree {
    nodes: Vec<Node>,
}

impl NodeTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a node.
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Get a node mutably.
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Link `parent` as the template `child` extends.
    pub(crate) fn link(&mut self, child: NodeId, parent: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].child = Some(child);
    }

    /// Topmost ancestor of a node.
    pub fn root_of(&self, mut id: NodeId) -> NodeId {
        while let Some(parent) = self.nodes[id.0].parent {
            id = parent;
        }
        id
    }

    /// Names from `id` up to its topmost ancestor.
    pub fn ancestry(&self, mut id: NodeId) -> Vec<&str> {
        let mut names = vec![self.nodes[id.0].name.as_str()];
        while let Some(parent) = self.nodes[id.0].parent {
            id = parent;
            names.push(self.nodes[id.0].name.as_str());
        }
        names
    }

    /// Parse the chain rooted at `root` into `set`.
    ///
    /// The root's body is registered as `name`; each include as its own name;
    /// intermediate children under their own names and the final override
    /// under a `child_`-prefixed name.
    pub fn compile(&self, root: NodeId, name: &str, set: &mut TemplateSet) -> Result<()> {
        let node = self.get(root);
        set.parse(name, node.code()?)?;

        for &include in &node.includes {
            let include_name = self.get(include).name.clone();
            self.compile(self.root_of(include), &include_name, set)?;
        }

        let Some(child) = node.child else {
            return Ok(());
        };
        let child_node = self.get(child);
        let child_name = if child_node.child.is_none() {
            child_template_name(&child_node.name)
        } else {
            child_node.name.clone()
        };
        self.compile(child, &child_name, set)
    }
}

/// `dir/name.html` → `dir/child_name.html`.
pub fn child_template_name(name: &str) -> String {
    match name.rsplit_once('/') {
        Some((dir, file)) => format!("{}/child_{}", dir, file),
        None => format!("child_{}", name),
    }
}

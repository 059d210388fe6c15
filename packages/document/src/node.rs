use crate::value::PropertyValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Child indices leading from the document root to a node
pub type NodePath = Vec<usize>;

/// One entry in the document tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub class_name: String,
    pub properties: BTreeMap<String, PropertyValue>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class_name: class_name.into(),
            properties: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style property setter
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Builder-style child append
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Overwrite an existing property. Returns false (and changes nothing)
    /// when the node has no property by that name.
    pub fn set_existing(&mut self, name: &str, value: PropertyValue) -> bool {
        match self.properties.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Number of nodes in this subtree, including self
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Node::subtree_len).sum::<usize>()
    }
}

/// A loaded place document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub root: Node,
}

impl Document {
    pub const ROOT_CLASS: &'static str = "DataModel";

    pub fn new() -> Self {
        Self {
            root: Node::new("Game", Self::ROOT_CLASS),
        }
    }

    pub fn with_children(children: Vec<Node>) -> Self {
        let mut doc = Self::new();
        doc.root.children = children;
        doc
    }

    /// Root-level children, the nodes that get projected at the top of the tree
    pub fn children(&self) -> &[Node] {
        &self.root.children
    }

    /// Total node count, excluding the root
    pub fn len(&self) -> usize {
        self.root.subtree_len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// First node (depth-first, pre-order) with this exact name and class
    pub fn find(&self, name: &str, class_name: &str) -> Option<NodePath> {
        self.find_by(|node| node.name == name && node.class_name == class_name)
    }

    /// First node (depth-first, pre-order, root excluded) satisfying `pred`
    pub fn find_by<F>(&self, pred: F) -> Option<NodePath>
    where
        F: Fn(&Node) -> bool,
    {
        let mut path = Vec::new();
        if find_in(&self.root.children, &pred, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        let mut current = &self.root;
        for &index in path {
            current = current.children.get(index)?;
        }
        Some(current)
    }

    pub fn node_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let mut current = &mut self.root;
        for &index in path {
            current = current.children.get_mut(index)?;
        }
        Some(current)
    }

    /// Detach the node at `path` together with its subtree
    pub fn remove(&mut self, path: &[usize]) -> Option<Node> {
        let (&index, parent_path) = path.split_last()?;
        let parent = self.node_mut(parent_path)?;
        if index < parent.children.len() {
            Some(parent.children.remove(index))
        } else {
            None
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn find_in<F>(nodes: &[Node], pred: &F, path: &mut NodePath) -> bool
where
    F: Fn(&Node) -> bool,
{
    for (index, node) in nodes.iter().enumerate() {
        path.push(index);
        if pred(node) || find_in(&node.children, pred, path) {
            return true;
        }
        path.pop();
    }
    false
}

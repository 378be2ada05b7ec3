//! Arena form of a model element tree
//!
//! The wire tree nests elements inside their parents. Most of the debugger
//! wants id lookups instead (refs resolve by id, variable handles address
//! nodes by id), so the tree is flattened once into an id-indexed arena in
//! which children are stored as ids.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::model::{ChildValue, Location, ModelElement, RefValue};

/// A flattened model element; children hold ids into the owning arena
#[derive(Debug, Clone)]
pub struct ModelNode {
    pub id: String,
    pub types: Vec<String>,
    pub children: BTreeMap<String, ChildRef>,
    pub refs: BTreeMap<String, RefValue>,
    pub attributes: BTreeMap<String, Value>,
    pub location: Option<Location>,
    pub label: Option<String>,
}

/// Containment edge in the arena
#[derive(Debug, Clone)]
pub enum ChildRef {
    Single(String),
    Many(Vec<String>),
}

/// Id-indexed arena for one model tree (AST or runtime state)
#[derive(Debug, Clone)]
pub struct ModelTree {
    root: String,
    nodes: HashMap<String, ModelNode>,
}

impl ModelTree {
    /// Flatten a wire tree into its arena form
    #[must_use]
    pub fn from_element(root: ModelElement) -> Self {
        let mut nodes = HashMap::new();
        let root_id = root.id.clone();
        flatten(root, &mut nodes);
        Self {
            root: root_id,
            nodes,
        }
    }

    #[must_use]
    pub fn root_id(&self) -> &str {
        &self.root
    }

    #[must_use]
    pub fn root(&self) -> &ModelNode {
        &self.nodes[&self.root]
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ModelNode> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ModelNode> {
        self.nodes.values()
    }

    /// Preorder traversal, visiting children in field order
    ///
    /// The arena map itself has no stable iteration order; callers that
    /// build derived indexes use this to stay deterministic.
    #[must_use]
    pub fn depth_first(&self) -> Vec<&ModelNode> {
        let mut out = Vec::with_capacity(self.nodes.len());
        self.visit(&self.root, &mut out);
        out
    }

    fn visit<'a>(&'a self, id: &str, out: &mut Vec<&'a ModelNode>) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        out.push(node);
        for child in node.children.values() {
            match child {
                ChildRef::Single(child_id) => self.visit(child_id, out),
                ChildRef::Many(child_ids) => {
                    for child_id in child_ids {
                        self.visit(child_id, out);
                    }
                }
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn flatten(element: ModelElement, nodes: &mut HashMap<String, ModelNode>) {
    let ModelElement {
        id,
        types,
        children,
        refs,
        attributes,
        location,
        label,
    } = element;

    let mut child_refs = BTreeMap::new();
    for (field, value) in children {
        match value {
            ChildValue::Single(child) => {
                child_refs.insert(field, ChildRef::Single(child.id.clone()));
                flatten(*child, nodes);
            }
            ChildValue::Many(items) => {
                child_refs.insert(
                    field,
                    ChildRef::Many(items.iter().map(|item| item.id.clone()).collect()),
                );
                for item in items {
                    flatten(item, nodes);
                }
            }
        }
    }

    nodes.insert(
        id.clone(),
        ModelNode {
            id,
            types,
            children: child_refs,
            refs,
            attributes,
            location,
            label,
        },
    );
}

//! Type-indexed views of the model trees
//!
//! Serves the `getModelElementsReferences` custom request: every element
//! is registered under each of its type tags, AST elements first, then
//! runtime-state elements. The runtime-state side is replaced whenever a
//! fresh state tree is fetched and dropped when a step invalidates it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use stepwise_core::{ModelElementReference, ModelTree};

fn index_by_type(tree: &ModelTree) -> HashMap<String, Vec<String>> {
    let mut index: HashMap<String, Vec<String>> = HashMap::new();
    for node in tree.depth_first() {
        for ty in &node.types {
            index.entry(ty.clone()).or_default().push(node.id.clone());
        }
    }
    index
}

#[derive(Debug)]
struct TypeIndex {
    tree: Arc<ModelTree>,
    by_type: HashMap<String, Vec<String>>,
}

impl TypeIndex {
    fn new(tree: Arc<ModelTree>) -> Self {
        let by_type = index_by_type(&tree);
        Self { tree, by_type }
    }

    fn collect(&self, ty: &str, out: &mut Vec<ModelElementReference>) {
        if let Some(ids) = self.by_type.get(ty) {
            for id in ids {
                if let Some(node) = self.tree.get(id) {
                    out.push(ModelElementReference::from_node(node));
                }
            }
        }
    }
}

/// Type lookup across the AST and the current runtime-state tree
#[derive(Debug)]
pub struct ModelElementTypeRegistry {
    ast: TypeIndex,
    runtime: RwLock<Option<TypeIndex>>,
}

impl ModelElementTypeRegistry {
    #[must_use]
    pub fn new(ast: Arc<ModelTree>) -> Self {
        Self {
            ast: TypeIndex::new(ast),
            runtime: RwLock::new(None),
        }
    }

    /// Replace the runtime-state index after a state fetch
    pub fn update_runtime(&self, tree: Arc<ModelTree>) {
        *self.runtime.write() = Some(TypeIndex::new(tree));
    }

    /// Drop the runtime-state index after a step invalidates the state
    pub fn clear_runtime(&self) {
        *self.runtime.write() = None;
    }

    /// All elements carrying `ty`, AST first, then runtime state
    #[must_use]
    pub fn elements_of_type(&self, ty: &str) -> Vec<ModelElementReference> {
        let mut out = Vec::new();
        self.ast.collect(ty, &mut out);
        if let Some(runtime) = self.runtime.read().as_ref() {
            runtime.collect(ty, &mut out);
        }
        out
    }
}

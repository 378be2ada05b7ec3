//! Variable projection of the model trees
//!
//! The IDE walks complex values lazily through integer handles. Handle 1
//! is always the AST root and handle 2 the runtime-state root; everything
//! else is minted on demand, memoized per target, and thrown away whenever
//! an atomic step invalidates the runtime state.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::trace;

use stepwise_core::{ChildRef, ModelNode, ModelTree, RefValue};
use stepwise_protocol::dap::Variable;

/// Permanent handle of the AST root
pub const AST_ROOT_REFERENCE: i64 = 1;
/// Permanent handle of the runtime-state root
pub const RUNTIME_ROOT_REFERENCE: i64 = 2;
const FIRST_DYNAMIC_REFERENCE: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TreeKind {
    Ast,
    RuntimeState,
}

/// What a minted handle points at
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Target {
    Element(TreeKind, String),
    /// A `children` sequence, addressed as (owner id, field name)
    ChildSequence(TreeKind, String, String),
    /// A `refs` sequence, addressed as (owner id, field name)
    RefSequence(TreeKind, String, String),
}

#[derive(Debug, Default)]
struct HandleTable {
    by_handle: HashMap<i64, Target>,
    by_target: HashMap<Target, i64>,
    next: i64,
}

impl HandleTable {
    fn reset(&mut self) {
        self.by_handle.clear();
        self.by_target.clear();
        self.next = FIRST_DYNAMIC_REFERENCE;
    }

    fn mint(&mut self, target: Target) -> i64 {
        if let Some(&handle) = self.by_target.get(&target) {
            return handle;
        }
        let handle = self.next;
        self.next += 1;
        self.by_target.insert(target.clone(), handle);
        self.by_handle.insert(handle, target);
        handle
    }
}

/// Projects model trees into the flat handle space of the `variables`
/// request
pub struct VariableHandler {
    ast: Arc<ModelTree>,
    runtime: RwLock<Option<Arc<ModelTree>>>,
    table: Mutex<HandleTable>,
}

impl VariableHandler {
    #[must_use]
    pub fn new(ast: Arc<ModelTree>) -> Self {
        let mut table = HandleTable::default();
        table.reset();
        Self {
            ast,
            runtime: RwLock::new(None),
            table: Mutex::new(table),
        }
    }

    /// Whether a runtime-state tree is currently registered
    #[must_use]
    pub fn has_runtime_state(&self) -> bool {
        self.runtime.read().is_some()
    }

    /// Drop the runtime state and every minted handle
    pub fn invalidate_runtime(&self) {
        trace!("invalidating variable references");
        *self.runtime.write() = None;
        self.table.lock().reset();
    }

    /// Install a freshly fetched runtime state, clearing minted handles
    pub fn update_runtime(&self, tree: Arc<ModelTree>) {
        *self.runtime.write() = Some(tree);
        self.table.lock().reset();
    }

    /// Children of the value behind `reference`; unknown or stale handles
    /// yield an empty list
    #[must_use]
    pub fn variables(&self, reference: i64) -> Vec<Variable> {
        let target = match reference {
            AST_ROOT_REFERENCE => Target::Element(TreeKind::Ast, self.ast.root_id().to_string()),
            RUNTIME_ROOT_REFERENCE => match self.runtime.read().as_ref() {
                Some(tree) => Target::Element(TreeKind::RuntimeState, tree.root_id().to_string()),
                None => return Vec::new(),
            },
            _ => match self.table.lock().by_handle.get(&reference) {
                Some(target) => target.clone(),
                None => return Vec::new(),
            },
        };

        match target {
            Target::Element(kind, id) => self.render_element(kind, &id),
            Target::ChildSequence(kind, owner, field) => {
                self.render_child_sequence(kind, &owner, &field)
            }
            Target::RefSequence(kind, owner, field) => {
                self.render_ref_sequence(kind, &owner, &field)
            }
        }
    }

    fn tree(&self, kind: TreeKind) -> Option<Arc<ModelTree>> {
        match kind {
            TreeKind::Ast => Some(self.ast.clone()),
            TreeKind::RuntimeState => self.runtime.read().clone(),
        }
    }

    fn render_element(&self, kind: TreeKind, id: &str) -> Vec<Variable> {
        let Some(tree) = self.tree(kind) else {
            return Vec::new();
        };
        let Some(node) = tree.get(id) else {
            return Vec::new();
        };

        let mut variables = Vec::new();

        for (name, value) in &node.attributes {
            variables.push(leaf(name.clone(), json_text(value)));
        }

        for (name, ref_value) in &node.refs {
            match ref_value {
                RefValue::Single(target_id) => {
                    variables.push(self.render_reference(name.clone(), target_id));
                }
                RefValue::Many(ids) => {
                    let handle = if ids.is_empty() {
                        0
                    } else {
                        self.table.lock().mint(Target::RefSequence(
                            kind,
                            node.id.clone(),
                            name.clone(),
                        ))
                    };
                    variables.push(sequence(name.clone(), ids.len(), handle));
                }
            }
        }

        for (name, child) in &node.children {
            match child {
                ChildRef::Single(child_id) => {
                    let value = tree
                        .get(child_id)
                        .map_or_else(|| json_text(&Value::Null), type_label);
                    let handle = self
                        .table
                        .lock()
                        .mint(Target::Element(kind, child_id.clone()));
                    variables.push(Variable {
                        name: name.clone(),
                        value,
                        variables_reference: handle,
                        indexed_variables: None,
                    });
                }
                ChildRef::Many(ids) => {
                    let handle = if ids.is_empty() {
                        0
                    } else {
                        self.table.lock().mint(Target::ChildSequence(
                            kind,
                            node.id.clone(),
                            name.clone(),
                        ))
                    };
                    variables.push(sequence(name.clone(), ids.len(), handle));
                }
            }
        }

        variables
    }

    fn render_child_sequence(&self, kind: TreeKind, owner: &str, field: &str) -> Vec<Variable> {
        let Some(tree) = self.tree(kind) else {
            return Vec::new();
        };
        let Some(ChildRef::Many(ids)) = tree.get(owner).and_then(|node| node.children.get(field))
        else {
            return Vec::new();
        };

        ids.iter()
            .enumerate()
            .map(|(index, id)| {
                let value = tree
                    .get(id)
                    .map_or_else(|| json_text(&Value::Null), type_label);
                let handle = self.table.lock().mint(Target::Element(kind, id.clone()));
                Variable {
                    name: index.to_string(),
                    value,
                    variables_reference: handle,
                    indexed_variables: None,
                }
            })
            .collect()
    }

    fn render_ref_sequence(&self, kind: TreeKind, owner: &str, field: &str) -> Vec<Variable> {
        let Some(tree) = self.tree(kind) else {
            return Vec::new();
        };
        let Some(RefValue::Many(ids)) = tree.get(owner).and_then(|node| node.refs.get(field))
        else {
            return Vec::new();
        };

        ids.iter()
            .enumerate()
            .map(|(index, id)| self.render_reference(index.to_string(), id))
            .collect()
    }

    /// Resolve a ref target, AST index first, then runtime state
    fn render_reference(&self, name: String, id: &str) -> Variable {
        let resolved = if self.ast.contains(id) {
            self.ast.get(id).map(|node| (TreeKind::Ast, node.clone()))
        } else {
            self.runtime.read().as_ref().and_then(|tree| {
                tree.get(id)
                    .map(|node| (TreeKind::RuntimeState, node.clone()))
            })
        };

        match resolved {
            Some((kind, node)) => {
                let handle = self.table.lock().mint(Target::Element(kind, node.id.clone()));
                Variable {
                    name,
                    value: type_label(&node),
                    variables_reference: handle,
                    indexed_variables: None,
                }
            }
            // A dangling ref renders as its raw id.
            None => leaf(name, json_text(&Value::String(id.to_string()))),
        }
    }
}

fn type_label(node: &ModelNode) -> String {
    format!("[{}]", node.types.join(", "))
}

fn json_text(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

fn leaf(name: String, value: String) -> Variable {
    Variable {
        name,
        value,
        variables_reference: 0,
        indexed_variables: None,
    }
}

fn sequence(name: String, len: usize, handle: i64) -> Variable {
    Variable {
        name,
        value: format!("Array[{len}]"),
        variables_reference: handle,
        indexed_variables: Some(len as i64),
    }
}

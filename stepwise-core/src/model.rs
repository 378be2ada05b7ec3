//! Model element trees
//!
//! The language runtime describes both the AST and its runtime state as
//! trees of `ModelElement` nodes. Containment (`children`) and
//! cross-references (`refs`) are distinct relations: children own their
//! target, refs point at another element by id.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Source span in runtime-origin coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub line: i64,
    pub column: i64,
    pub end_line: i64,
    pub end_column: i64,
}

impl Location {
    /// Whether `(line, column)` falls inside this span.
    ///
    /// Spans may cover multiple lines: on the start line the column must
    /// be at or past the start column (and before the end column for
    /// single-line spans), on the end line at or before the end column,
    /// and interior lines match unconditionally.
    #[must_use]
    pub fn contains(&self, line: i64, column: i64) -> bool {
        if line == self.line {
            column >= self.column && (self.line != self.end_line || column <= self.end_column)
        } else if line == self.end_line {
            column <= self.end_column
        } else {
            self.line <= line && line <= self.end_line
        }
    }
}

/// A node in the AST or runtime-state tree, as the runtime sends it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelElement {
    /// Unique within the owning tree
    pub id: String,
    /// Ordered type tags, most specific first; never empty
    pub types: Vec<String>,
    /// Containment relation: field name to owned element(s)
    #[serde(default)]
    pub children: BTreeMap<String, ChildValue>,
    /// Cross-reference relation: field name to element id(s)
    #[serde(default)]
    pub refs: BTreeMap<String, RefValue>,
    /// Primitive-valued fields (boolean, number, string, or null)
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A contained element or an ordered sequence of them
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChildValue {
    Many(Vec<ModelElement>),
    Single(Box<ModelElement>),
}

/// A referenced element id or an ordered sequence of them
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefValue {
    Many(Vec<String>),
    Single(String),
}

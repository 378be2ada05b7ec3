//! Source-position lookup over the AST
//!
//! IDE requests address model elements by line and column. The locator
//! indexes AST elements by their start line once at registration time and
//! answers lookups by scanning from the queried line downward, returning
//! the first element whose span contains the position.

use std::collections::BTreeMap;
use std::sync::Arc;

use stepwise_core::{ModelNode, ModelTree};

/// Additive deltas translating client coordinates to runtime coordinates
///
/// The runtime reports one-based lines and columns; clients declare their
/// origin in the `initialize` request and the deltas are applied at every
/// boundary crossing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceOffsets {
    line: i64,
    column: i64,
}

impl SourceOffsets {
    #[must_use]
    pub fn new(lines_start_at1: bool, columns_start_at1: bool) -> Self {
        Self {
            line: i64::from(!lines_start_at1),
            column: i64::from(!columns_start_at1),
        }
    }

    #[must_use]
    pub fn to_runtime_line(&self, line: i64) -> i64 {
        line + self.line
    }

    #[must_use]
    pub fn to_runtime_column(&self, column: i64) -> i64 {
        column + self.column
    }

    #[must_use]
    pub fn to_client_line(&self, line: i64) -> i64 {
        line - self.line
    }

    #[must_use]
    pub fn to_client_column(&self, column: i64) -> i64 {
        column - self.column
    }
}

/// Line-indexed lookup of AST elements
#[derive(Debug)]
pub struct AstElementLocator {
    ast: Arc<ModelTree>,
    offsets: SourceOffsets,
    /// Start line to element ids on that line, in document order
    lines: BTreeMap<i64, Vec<String>>,
}

impl AstElementLocator {
    #[must_use]
    pub fn new(ast: Arc<ModelTree>, offsets: SourceOffsets) -> Self {
        let mut lines: BTreeMap<i64, Vec<String>> = BTreeMap::new();
        for node in ast.depth_first() {
            if let Some(location) = node.location {
                lines.entry(location.line).or_default().push(node.id.clone());
            }
        }
        Self { ast, offsets, lines }
    }

    #[must_use]
    pub fn offsets(&self) -> SourceOffsets {
        self.offsets
    }

    /// The element containing `(line, column)`, given in client
    /// coordinates
    #[must_use]
    pub fn element_from_position(&self, line: i64, column: i64) -> Option<&ModelNode> {
        let line = self.offsets.to_runtime_line(line);
        let column = self.offsets.to_runtime_column(column);

        // Scan lines at or before the query, nearest first.
        for (_, ids) in self.lines.range(..=line).rev() {
            for id in ids {
                let Some(node) = self.ast.get(id) else {
                    continue;
                };
                if node
                    .location
                    .is_some_and(|location| location.contains(line, column))
                {
                    return Some(node);
                }
            }
        }
        None
    }
}

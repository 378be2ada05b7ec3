//! Debug vocabulary shared between the engine and the protocols
//!
//! Steps, breakpoint types, and domain-specific breakpoints are declared
//! by the language runtime and travel over both LRDP and the IDE-facing
//! custom requests, so their serde shapes are the wire shapes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tree::ModelNode;

/// An execution step advertised by the language runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Composite steps expose sub-steps when entered; atomic steps advance
    /// the runtime state
    pub is_composite: bool,
}

/// Primitive value kinds a breakpoint parameter may accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Boolean,
    Number,
    String,
}

impl PrimitiveType {
    /// Whether a scalar JSON value matches this primitive type
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Boolean => value.is_boolean(),
            Self::Number => value.is_number(),
            Self::String => value.is_string(),
        }
    }
}

/// One declared parameter of a breakpoint type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointParameter {
    pub name: String,
    #[serde(default)]
    pub is_multivalued: bool,
    #[serde(flatten)]
    pub kind: BreakpointParameterKind,
}

/// Parameter kind: a primitive value or a model element reference
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BreakpointParameterKind {
    #[serde(rename_all = "camelCase")]
    Primitive { primitive_type: PrimitiveType },
    #[serde(rename_all = "camelCase")]
    Element { element_type: String },
}

/// Catalog entry declared by the language runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointType {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Vec<BreakpointParameter>,
}

/// An installed instance of a breakpoint type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainSpecificBreakpoint {
    pub breakpoint_type_id: String,
    #[serde(default)]
    pub entries: BTreeMap<String, Value>,
}

/// Lightweight element handle returned by the custom requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelElementReference {
    pub id: String,
    pub types: Vec<String>,
    pub label: String,
}

impl ModelElementReference {
    /// Build a reference for a node; the label falls back to the id
    #[must_use]
    pub fn from_node(node: &ModelNode) -> Self {
        Self {
            id: node.id.clone(),
            types: node.types.clone(),
            label: node.label.clone().unwrap_or_else(|| node.id.clone()),
        }
    }
}

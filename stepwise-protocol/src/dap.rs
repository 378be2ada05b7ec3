//! DAP message envelope and standard body shapes
//!
//! Only the slice of the Debug Adapter Protocol this debugger serves is
//! modeled. Bodies are plain serde structs rendered camelCase; handlers
//! that assemble one-off payloads use `serde_json::json!` instead.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire envelope, tagged by the `type` member
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProtocolMessage {
    Request(Request),
    Response(Response),
    Event(Event),
}

/// Client-to-adapter request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub seq: i64,
    pub command: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Adapter-to-client response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub seq: i64,
    /// The DAP schema keeps this one field snake_case
    #[serde(rename = "request_seq")]
    pub request_seq: i64,
    pub success: bool,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Adapter-to-client event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub seq: i64,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// `initialize` request arguments
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeArguments {
    #[serde(default)]
    pub adapter_id: String,
    /// Whether client line numbers start at 1 or 0
    #[serde(default = "default_true")]
    pub lines_start_at1: bool,
    /// Whether client column numbers start at 1 or 0
    #[serde(default = "default_true")]
    pub columns_start_at1: bool,
}

fn default_true() -> bool {
    true
}

impl Default for InitializeArguments {
    fn default() -> Self {
        Self {
            adapter_id: String::new(),
            lines_start_at1: true,
            columns_start_at1: true,
        }
    }
}

/// Capabilities advertised in the `initialize` response
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    pub supports_configuration_done_request: bool,
    pub supports_function_breakpoints: bool,
    pub supports_conditional_breakpoints: bool,
    pub supports_evaluate_for_hovers: bool,
    pub supports_step_back: bool,
    pub supports_restart_request: bool,
    pub supports_data_breakpoints: bool,
    pub supports_terminate_request: bool,
}

impl Capabilities {
    /// The surface this adapter actually serves
    #[must_use]
    pub fn advertised() -> Self {
        Self {
            supports_configuration_done_request: true,
            ..Self::default()
        }
    }
}

/// `launch` request arguments, extended with the debugger's own fields
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchArguments {
    /// Program being debugged, forwarded verbatim to the language runtime
    pub source_file: String,
    /// TCP port the language runtime listens on
    pub language_runtime_port: u16,
    #[serde(default)]
    pub pause_on_start: bool,
    #[serde(default)]
    pub pause_on_end: bool,
    /// Skip the pre-step breakpoint re-check on the step the session is
    /// already paused on
    #[serde(default = "default_true")]
    pub skip_redundant_pauses: bool,
    /// Opaque initialization arguments handed to the runtime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_args: Option<Value>,
    #[serde(default)]
    pub no_debug: bool,
}

/// Source descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// One entry of a `setBreakpoints` request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBreakpoint {
    pub line: i64,
    #[serde(default)]
    pub column: Option<i64>,
}

/// `setBreakpoints` request arguments
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointsArguments {
    pub source: Source,
    #[serde(default)]
    pub breakpoints: Vec<SourceBreakpoint>,
}

/// One verification outcome of a `setBreakpoints` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub verified: bool,
}

/// One frame of a `stackTrace` response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    pub line: i64,
    pub column: i64,
    pub can_restart: bool,
}

/// One scope of a `scopes` response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub name: String,
    pub variables_reference: i64,
    pub expensive: bool,
}

/// One variable of a `variables` response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub name: String,
    pub value: String,
    /// 0 when the value has no children
    pub variables_reference: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_variables: Option<i64>,
}

/// The single mock thread of a `threads` response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: i64,
    pub name: String,
}

/// `stopped` event body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoppedEventBody {
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub thread_id: i64,
}

/// `invalidated` event body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidatedEventBody {
    pub areas: Vec<String>,
}

//! Typed access to the language runtime
//!
//! The engine drives the runtime exclusively through the
//! [`LanguageRuntime`] trait; [`LanguageRuntimeProxy`] is the production
//! implementation over the JSON-RPC connection. Tests substitute scripted
//! doubles at the same seam.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::trace;

use stepwise_core::{BreakpointType, Location, ModelElement, Result, Step, StepwiseError};
use stepwise_protocol::{JsonRpcClient, TransportError};

/// Outcome of one `checkBreakpoint` call
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointActivation {
    #[serde(default)]
    pub is_activated: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// The LRDP primitives the engine composes
#[async_trait]
pub trait LanguageRuntime: Send + Sync {
    /// Parse the source file; idempotent on the runtime side
    async fn parse(&self, source_file: &str) -> Result<ModelElement>;

    /// Start an execution; must be called exactly once per session
    async fn initialize_execution(&self, source_file: &str, entries: &Value) -> Result<()>;

    /// Fetch the current runtime-state tree
    async fn get_runtime_state(&self, source_file: &str) -> Result<ModelElement>;

    /// Fetch the breakpoint type catalog
    async fn get_breakpoint_types(&self) -> Result<Vec<BreakpointType>>;

    /// Evaluate one installed breakpoint against the step about to run
    async fn check_breakpoint(
        &self,
        source_file: &str,
        step_id: &str,
        type_id: &str,
        entries: &Value,
    ) -> Result<BreakpointActivation>;

    /// List the currently available steps
    async fn get_available_steps(&self, source_file: &str) -> Result<Vec<Step>>;

    /// Enter a composite step, exposing its sub-steps
    async fn enter_composite_step(&self, source_file: &str, step_id: &str) -> Result<()>;

    /// Execute an atomic step; returns the ids of completed steps,
    /// innermost first
    async fn execute_atomic_step(&self, source_file: &str, step_id: &str) -> Result<Vec<String>>;

    /// Source span of a step, when the runtime knows one
    async fn get_step_location(&self, source_file: &str, step_id: &str)
        -> Result<Option<Location>>;
}

fn runtime_error(err: TransportError) -> StepwiseError {
    match err {
        TransportError::Remote { code, message } => StepwiseError::Runtime {
            message: format!("runtime error {code}: {message}"),
        },
        TransportError::Serialization(err) => StepwiseError::protocol(err.to_string()),
        TransportError::Protocol(message) => StepwiseError::protocol(message),
        other => StepwiseError::transport(other.to_string()),
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|err| StepwiseError::protocol(err.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParseResult {
    ast_root: ModelElement,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeStateResult {
    runtime_state_root: ModelElement,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BreakpointTypesResult {
    #[serde(default)]
    breakpoint_types: Vec<BreakpointType>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvailableStepsResult {
    #[serde(default)]
    available_steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteStepResult {
    #[serde(default)]
    completed_steps: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StepLocationResult {
    /// Both `{}` and `{"location": null}` normalize to `None`
    #[serde(default)]
    location: Option<Location>,
}

/// JSON-RPC-backed implementation of [`LanguageRuntime`]
#[derive(Debug)]
pub struct LanguageRuntimeProxy {
    client: JsonRpcClient,
}

impl LanguageRuntimeProxy {
    #[must_use]
    pub fn new(client: JsonRpcClient) -> Self {
        Self { client }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        trace!(method, "LRDP call");
        self.client.call(method, params).await.map_err(runtime_error)
    }
}

#[async_trait]
impl LanguageRuntime for LanguageRuntimeProxy {
    async fn parse(&self, source_file: &str) -> Result<ModelElement> {
        let result = self
            .call("parse", json!({ "sourceFile": source_file }))
            .await?;
        Ok(decode::<ParseResult>(result)?.ast_root)
    }

    async fn initialize_execution(&self, source_file: &str, entries: &Value) -> Result<()> {
        self.call(
            "initializeExecution",
            json!({ "sourceFile": source_file, "entries": entries }),
        )
        .await?;
        Ok(())
    }

    async fn get_runtime_state(&self, source_file: &str) -> Result<ModelElement> {
        let result = self
            .call("getRuntimeState", json!({ "sourceFile": source_file }))
            .await?;
        Ok(decode::<RuntimeStateResult>(result)?.runtime_state_root)
    }

    async fn get_breakpoint_types(&self) -> Result<Vec<BreakpointType>> {
        let result = self.call("getBreakpointTypes", Value::Null).await?;
        Ok(decode::<BreakpointTypesResult>(result)?.breakpoint_types)
    }

    async fn check_breakpoint(
        &self,
        source_file: &str,
        step_id: &str,
        type_id: &str,
        entries: &Value,
    ) -> Result<BreakpointActivation> {
        let result = self
            .call(
                "checkBreakpoint",
                json!({
                    "sourceFile": source_file,
                    "stepId": step_id,
                    "typeId": type_id,
                    "entries": entries,
                }),
            )
            .await?;
        decode(result)
    }

    async fn get_available_steps(&self, source_file: &str) -> Result<Vec<Step>> {
        let result = self
            .call("getAvailableSteps", json!({ "sourceFile": source_file }))
            .await?;
        Ok(decode::<AvailableStepsResult>(result)?.available_steps)
    }

    async fn enter_composite_step(&self, source_file: &str, step_id: &str) -> Result<()> {
        self.call(
            "enterCompositeStep",
            json!({ "sourceFile": source_file, "stepId": step_id }),
        )
        .await?;
        Ok(())
    }

    async fn execute_atomic_step(&self, source_file: &str, step_id: &str) -> Result<Vec<String>> {
        let result = self
            .call(
                "executeAtomicStep",
                json!({ "sourceFile": source_file, "stepId": step_id }),
            )
            .await?;
        Ok(decode::<ExecuteStepResult>(result)?.completed_steps)
    }

    async fn get_step_location(
        &self,
        source_file: &str,
        step_id: &str,
    ) -> Result<Option<Location>> {
        let result = self
            .call(
                "getStepLocation",
                json!({ "sourceFile": source_file, "stepId": step_id }),
            )
            .await?;
        Ok(decode::<StepLocationResult>(result)?.location)
    }
}

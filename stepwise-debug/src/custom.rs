//! Domain-parametric protocol extensions
//!
//! The base protocol knows nothing about breakpoint types, step choices,
//! or model elements, so those travel as custom requests. Arguments are
//! validated strictly: the argument object must carry exactly the
//! expected keys, including `sourceFile`, or the request is rejected as
//! malformed.

use serde_json::{json, Value};
use tracing::debug;

use stepwise_core::{DomainSpecificBreakpoint, Result, StepwiseError};

use crate::events::EventSink;
use crate::runtime::DebugRuntime;

const COMMANDS: &[&str] = &[
    "getBreakpointTypes",
    "setDomainSpecificBreakpoints",
    "getAvailableSteps",
    "selectStep",
    "getModelElementsReferences",
    "getModelElementReferenceFromSource",
];

/// Whether `command` belongs to the extension set
#[must_use]
pub fn is_custom_command(command: &str) -> bool {
    COMMANDS.contains(&command)
}

/// Reject arguments whose own-key set differs from `expected`
fn expect_keys(arguments: &Value, expected: &[&str]) -> Result<()> {
    let keys: Vec<&str> = arguments
        .as_object()
        .map(|object| object.keys().map(String::as_str).collect())
        .unwrap_or_default();
    let exact = keys.len() == expected.len() && expected.iter().all(|key| keys.contains(key));
    if exact {
        Ok(())
    } else {
        Err(StepwiseError::invalid_request(format!(
            "expected arguments {{{}}}, got {{{}}}",
            expected.join(", "),
            keys.join(", ")
        )))
    }
}

fn string_field(arguments: &Value, key: &str) -> Result<String> {
    arguments[key]
        .as_str()
        .map(ToString::to_string)
        .ok_or_else(|| StepwiseError::invalid_request(format!("'{key}' must be a string")))
}

fn integer_field(arguments: &Value, key: &str) -> Result<i64> {
    arguments[key]
        .as_i64()
        .ok_or_else(|| StepwiseError::invalid_request(format!("'{key}' must be an integer")))
}

/// Dispatch one custom request and produce its response body
///
/// # Errors
///
/// Fails on malformed arguments, unknown commands, or when the runtime
/// rejects the operation.
pub async fn dispatch(
    runtime: &DebugRuntime,
    sink: &EventSink,
    command: &str,
    arguments: &Value,
) -> Result<Value> {
    debug!(command, "dispatching custom request");
    match command {
        "getBreakpointTypes" => {
            expect_keys(arguments, &["sourceFile"])?;
            let types = runtime.breakpoint_types()?;
            Ok(json!({ "breakpointTypes": types }))
        }
        "setDomainSpecificBreakpoints" => {
            expect_keys(arguments, &["sourceFile", "breakpoints"])?;
            let breakpoints: Vec<DomainSpecificBreakpoint> =
                serde_json::from_value(arguments["breakpoints"].clone()).map_err(|err| {
                    StepwiseError::invalid_request(format!("malformed breakpoints: {err}"))
                })?;
            let outcomes = runtime.set_domain_breakpoints(breakpoints)?;
            let outcomes: Vec<Value> = outcomes
                .into_iter()
                .map(|verified| json!({ "verified": verified }))
                .collect();
            Ok(json!({ "breakpoints": outcomes }))
        }
        "getAvailableSteps" => {
            expect_keys(arguments, &["sourceFile"])?;
            let steps = runtime.available_steps()?;
            Ok(json!({ "availableSteps": steps }))
        }
        "selectStep" => {
            expect_keys(arguments, &["sourceFile", "stepId"])?;
            let step_id = string_field(arguments, "stepId")?;
            let changed = runtime.select_step(&step_id)?;
            if changed {
                // Stack frame locations depend on the selection.
                sink.invalidated(&["stacks"]);
            }
            Ok(json!({}))
        }
        "getModelElementsReferences" => {
            expect_keys(arguments, &["sourceFile", "type"])?;
            let ty = string_field(arguments, "type")?;
            let elements = runtime.elements_of_type(&ty)?;
            Ok(json!({ "elements": elements }))
        }
        "getModelElementReferenceFromSource" => {
            expect_keys(arguments, &["sourceFile", "line", "column"])?;
            let line = integer_field(arguments, "line")?;
            let column = integer_field(arguments, "column")?;
            match runtime.element_from_source(line, column)? {
                Some(element) => Ok(json!({ "element": element })),
                None => Ok(json!({})),
            }
        }
        other => Err(StepwiseError::invalid_request(format!(
            "unknown custom command '{other}'"
        ))),
    }
}

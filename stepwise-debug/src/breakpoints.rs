//! Domain-specific breakpoint management
//!
//! The runtime declares which breakpoint types exist; the client installs
//! instances of them. Source breakpoints from the standard `setBreakpoints`
//! request are only *verified* here (can this position anchor any declared
//! type?); installation always happens through the
//! `setDomainSpecificBreakpoints` custom request.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};

use stepwise_core::{
    BreakpointParameter, BreakpointParameterKind, BreakpointType, DomainSpecificBreakpoint, Result,
    StepwiseError,
};
use stepwise_protocol::dap::{Breakpoint, SourceBreakpoint};

use crate::locator::AstElementLocator;
use crate::proxy::LanguageRuntime;

/// A breakpoint that fired during a pre-step check
#[derive(Debug, Clone)]
pub struct ActivatedBreakpoint {
    pub type_id: String,
    pub message: String,
}

/// Owns the type catalog and the installed breakpoints of one session
pub struct BreakpointManager {
    source_file: String,
    /// Catalog in the order the runtime declared it
    catalog: Vec<BreakpointType>,
    by_id: HashMap<String, usize>,
    installed: RwLock<Vec<DomainSpecificBreakpoint>>,
}

impl BreakpointManager {
    #[must_use]
    pub fn new(source_file: String, catalog: Vec<BreakpointType>) -> Self {
        let by_id = catalog
            .iter()
            .enumerate()
            .map(|(index, ty)| (ty.id.clone(), index))
            .collect();
        Self {
            source_file,
            catalog,
            by_id,
            installed: RwLock::new(Vec::new()),
        }
    }

    /// The catalog, in runtime declaration order
    #[must_use]
    pub fn available_types(&self) -> Vec<BreakpointType> {
        self.catalog.clone()
    }

    fn type_by_id(&self, id: &str) -> Option<&BreakpointType> {
        self.by_id.get(id).map(|&index| &self.catalog[index])
    }

    /// Verify source-breakpoint slots for the client UI.
    ///
    /// A slot verifies when its position resolves to a located element
    /// whose type list satisfies the first parameter of at least one
    /// declared breakpoint type. One outcome per input, in input order;
    /// the outcome id is the input index.
    #[must_use]
    pub fn verify_source_breakpoints(
        &self,
        sources: &[SourceBreakpoint],
        locator: &AstElementLocator,
    ) -> Vec<Breakpoint> {
        sources
            .iter()
            .enumerate()
            .map(|(index, source)| {
                let verified = source.column.is_some_and(|column| {
                    locator
                        .element_from_position(source.line, column)
                        .is_some_and(|node| {
                            node.location.is_some()
                                && self.catalog.iter().any(|ty| anchors(ty, &node.types))
                        })
                });
                if verified {
                    Breakpoint {
                        id: Some(index as i64),
                        verified: true,
                    }
                } else {
                    Breakpoint {
                        id: None,
                        verified: false,
                    }
                }
            })
            .collect()
    }

    /// Replace the installed set with the valid subset of `breakpoints`;
    /// returns one outcome per input, in input order
    pub fn set_domain_breakpoints(&self, breakpoints: Vec<DomainSpecificBreakpoint>) -> Vec<bool> {
        let outcomes: Vec<bool> = breakpoints.iter().map(|bp| self.is_valid(bp)).collect();
        let accepted: Vec<DomainSpecificBreakpoint> = breakpoints
            .into_iter()
            .zip(outcomes.iter())
            .filter_map(|(bp, &valid)| valid.then_some(bp))
            .collect();
        debug!(
            installed = accepted.len(),
            rejected = outcomes.iter().filter(|&&v| !v).count(),
            "replaced domain-specific breakpoints"
        );
        *self.installed.write() = accepted;
        outcomes
    }

    #[must_use]
    pub fn installed_len(&self) -> usize {
        self.installed.read().len()
    }

    /// Typecheck a breakpoint against its declared type: one entry per
    /// parameter, each respecting the parameter's kind and multiplicity
    fn is_valid(&self, breakpoint: &DomainSpecificBreakpoint) -> bool {
        let Some(ty) = self.type_by_id(&breakpoint.breakpoint_type_id) else {
            return false;
        };
        if breakpoint.entries.len() != ty.parameters.len() {
            return false;
        }
        ty.parameters.iter().all(|parameter| {
            breakpoint
                .entries
                .get(&parameter.name)
                .is_some_and(|value| entry_matches(parameter, value))
        })
    }

    /// Evaluate every installed breakpoint against the step about to be
    /// performed.
    ///
    /// Check failures other than transport loss count as not activated,
    /// so a misbehaving runtime cannot wedge execution.
    ///
    /// # Errors
    ///
    /// Returns an error when the runtime connection is lost.
    pub async fn check(
        &self,
        runtime: &dyn LanguageRuntime,
        step_id: &str,
    ) -> Result<Vec<ActivatedBreakpoint>> {
        let installed = self.installed.read().clone();
        let mut activated = Vec::new();

        for breakpoint in installed {
            let entries = serde_json::to_value(&breakpoint.entries).unwrap_or(Value::Null);
            let outcome = runtime
                .check_breakpoint(
                    &self.source_file,
                    step_id,
                    &breakpoint.breakpoint_type_id,
                    &entries,
                )
                .await;
            match outcome {
                Ok(result) if result.is_activated => {
                    let message = result.message.unwrap_or_else(|| {
                        format!(
                            "Breakpoint of type '{}' activated.",
                            breakpoint.breakpoint_type_id
                        )
                    });
                    activated.push(ActivatedBreakpoint {
                        type_id: breakpoint.breakpoint_type_id.clone(),
                        message,
                    });
                }
                Ok(_) => {}
                Err(err @ StepwiseError::Transport { .. }) => return Err(err),
                Err(err) => {
                    warn!(
                        type_id = %breakpoint.breakpoint_type_id,
                        step_id,
                        error = %err,
                        "breakpoint check failed, treating as not activated"
                    );
                }
            }
        }
        Ok(activated)
    }
}

/// Whether a breakpoint type can anchor an element with `types`: its
/// first parameter must be element-kind and name one of those types
fn anchors(ty: &BreakpointType, types: &[String]) -> bool {
    matches!(
        ty.parameters.first(),
        Some(BreakpointParameter {
            kind: BreakpointParameterKind::Element { element_type },
            ..
        }) if types.contains(element_type)
    )
}

fn entry_matches(parameter: &BreakpointParameter, value: &Value) -> bool {
    if parameter.is_multivalued {
        value
            .as_array()
            .is_some_and(|items| items.iter().all(|item| scalar_matches(parameter, item)))
    } else {
        scalar_matches(parameter, value)
    }
}

fn scalar_matches(parameter: &BreakpointParameter, value: &Value) -> bool {
    match &parameter.kind {
        BreakpointParameterKind::Primitive { primitive_type } => primitive_type.matches(value),
        BreakpointParameterKind::Element { .. } => value.is_string(),
    }
}

//! Core model types for the stepwise debugger
//!
//! Everything the protocol layer and the execution engine share: the
//! model element trees the language runtime reports, the step and
//! breakpoint vocabulary, and the common error type.

pub mod error;
pub mod model;
pub mod tree;
pub mod types;

pub use error::{Result, StepwiseError};
pub use model::{ChildValue, Location, ModelElement, RefValue};
pub use tree::{ChildRef, ModelNode, ModelTree};
pub use types::{
    BreakpointParameter, BreakpointParameterKind, BreakpointType, DomainSpecificBreakpoint,
    ModelElementReference, PrimitiveType, Step,
};

//! Debug session execution engine
//!
//! The domain-parametric core of the stepwise debugger: a protocol
//! mediator between a DAP-speaking IDE and a language runtime that
//! exposes parse / initialize / step / check-breakpoint / runtime-state
//! primitives over LRDP. The engine owns no language semantics; it
//! composes those primitives into run, step, pause, breakpoint, call
//! stack, and variable inspection behavior.
//!
//! One [`session::DebugSession`] exists per IDE connection; it owns one
//! [`runtime::DebugRuntime`], which drives the managers in the sibling
//! modules.

pub mod breakpoints;
pub mod custom;
pub mod events;
pub mod locator;
pub mod pause;
pub mod proxy;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod steps;
pub mod variables;

pub use breakpoints::BreakpointManager;
pub use events::{EventSink, Outbound};
pub use locator::{AstElementLocator, SourceOffsets};
pub use pause::{PauseInformation, PauseReason};
pub use proxy::{LanguageRuntime, LanguageRuntimeProxy};
pub use registry::ModelElementTypeRegistry;
pub use runtime::{DebugRuntime, RuntimeConfig};
pub use steps::StepManager;
pub use variables::{VariableHandler, AST_ROOT_REFERENCE, RUNTIME_ROOT_REFERENCE};

//! The debug session execution engine
//!
//! Drives an execution forward one atomic step at a time, deciding at
//! every checkpoint whether to keep going or stop: a client pause, a
//! non-deterministic choice point, an activated breakpoint, a completed
//! target step, or the end of the program. All language semantics live on
//! the other side of [`LanguageRuntime`]; this engine only composes its
//! primitives.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use stepwise_core::{
    BreakpointType, DomainSpecificBreakpoint, ModelElementReference, ModelTree, Result, Step,
    StepwiseError,
};
use stepwise_protocol::dap::{
    Breakpoint, Source, SourceBreakpoint, StackFrame, Variable,
};

use crate::breakpoints::{ActivatedBreakpoint, BreakpointManager};
use crate::events::EventSink;
use crate::locator::{AstElementLocator, SourceOffsets};
use crate::pause::{PauseInformation, PauseReason};
use crate::proxy::LanguageRuntime;
use crate::registry::ModelElementTypeRegistry;
use crate::steps::StepManager;
use crate::variables::VariableHandler;

/// Launch-time configuration of one debug runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub source_file: String,
    pub pause_on_start: bool,
    pub pause_on_end: bool,
    pub skip_redundant_pauses: bool,
    /// Opaque initialization arguments forwarded to the runtime
    pub entries: Value,
    pub offsets: SourceOffsets,
}

/// What a drive is trying to reach
#[derive(Debug, Clone)]
enum Motion {
    /// Keep going until something else stops the execution
    Run,
    /// Stop once the step with this id is reported completed
    UntilComplete(String),
    /// Enter the selected composite, or complete the selected atomic
    StepInto,
}

/// Model-derived state, built once initialization finishes
struct ExecutionContext {
    locator: AstElementLocator,
    registry: ModelElementTypeRegistry,
    variables: VariableHandler,
    breakpoints: Arc<BreakpointManager>,
}

/// A `setBreakpoints` request waiting for initialization
struct PendingBreakpoints {
    sources: Vec<SourceBreakpoint>,
    reply: oneshot::Sender<Vec<Breakpoint>>,
}

pub struct DebugRuntime {
    config: RuntimeConfig,
    proxy: Arc<dyn LanguageRuntime>,
    events: EventSink,
    steps: RwLock<StepManager>,
    context: RwLock<Option<Arc<ExecutionContext>>>,
    pending_breakpoints: Mutex<Option<PendingBreakpoints>>,
    /// Set by `pause`, consumed at the next checkpoint
    pause_requested: AtomicBool,
    /// True right after a stop (and at session start); gates redundant
    /// re-checks on the step the client is already looking at
    paused_on_current_step: AtomicBool,
    execution_done: AtomicBool,
    terminated_sent: AtomicBool,
    /// True while a drive is in flight; `pause` is a no-op otherwise
    running: AtomicBool,
    /// Fatal diagnostic, latched on the first unrecoverable error
    failure: RwLock<Option<String>>,
    frame_seq: AtomicI64,
    /// Serializes motions; held across suspension points
    motion_lock: tokio::sync::Mutex<()>,
}

impl DebugRuntime {
    #[must_use]
    pub fn new(proxy: Arc<dyn LanguageRuntime>, events: EventSink, config: RuntimeConfig) -> Self {
        Self {
            config,
            proxy,
            events,
            steps: RwLock::new(StepManager::new()),
            context: RwLock::new(None),
            pending_breakpoints: Mutex::new(None),
            pause_requested: AtomicBool::new(false),
            paused_on_current_step: AtomicBool::new(false),
            execution_done: AtomicBool::new(false),
            terminated_sent: AtomicBool::new(false),
            running: AtomicBool::new(false),
            failure: RwLock::new(None),
            frame_seq: AtomicI64::new(1),
            motion_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn context(&self) -> Result<Arc<ExecutionContext>> {
        self.context
            .read()
            .clone()
            .ok_or(StepwiseError::NotInitialized)
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.context.read().is_some()
    }

    /// The latched fatal diagnostic, if the session has failed
    #[must_use]
    pub fn failure(&self) -> Option<String> {
        self.failure.read().clone()
    }

    /// Mark the session unusable: record the diagnostic, fail any
    /// deferred breakpoint request, and unblock the client
    pub fn latch_failure(&self, err: &StepwiseError) {
        warn!(error = %err, "debug session entered failed state");
        *self.failure.write() = Some(err.to_string());
        drop(self.pending_breakpoints.lock().take());
        if !self.terminated_sent.swap(true, Ordering::SeqCst) {
            self.events.terminated();
        }
    }

    /// Parse, initialize the runtime, load the breakpoint catalog and the
    /// initial step list, then either stop (start / choice / breakpoint)
    /// or run to the first stop
    ///
    /// # Errors
    ///
    /// Propagates runtime transport failures and engine invariant
    /// violations; both are fatal for the session.
    #[instrument(skip(self), fields(source = %self.config.source_file))]
    pub async fn initialize_execution(&self) -> Result<()> {
        let ast_root = self.proxy.parse(&self.config.source_file).await?;
        let ast = Arc::new(ModelTree::from_element(ast_root));
        info!(elements = ast.len(), "parsed source into model tree");

        self.proxy
            .initialize_execution(&self.config.source_file, &self.config.entries)
            .await?;
        let catalog = self.proxy.get_breakpoint_types().await?;
        debug!(types = catalog.len(), "loaded breakpoint type catalog");

        let context = Arc::new(ExecutionContext {
            locator: AstElementLocator::new(ast.clone(), self.config.offsets),
            registry: ModelElementTypeRegistry::new(ast.clone()),
            variables: VariableHandler::new(ast),
            breakpoints: Arc::new(BreakpointManager::new(
                self.config.source_file.clone(),
                catalog,
            )),
        });
        *self.context.write() = Some(context);
        self.resolve_pending_breakpoints();

        self.refresh_steps(&[]).await?;

        if self.steps.read().available_len() == 0 {
            self.execution_done.store(true, Ordering::SeqCst);
            if self.config.pause_on_end {
                let mut pending = PauseInformation::new();
                pending.add(PauseReason::End);
                self.stop(&pending);
            } else {
                self.send_terminated()?;
            }
            return Ok(());
        }

        let mut pending = PauseInformation::new();
        if self.config.pause_on_start {
            pending.add(PauseReason::Start);
        }
        if self.steps.read().available_len() > 1 {
            pending.add(PauseReason::Choice);
        }
        let selected = self.selected_step()?;
        for hit in self.check_breakpoints(&selected.id).await? {
            pending.add_breakpoint(hit.message);
        }

        if pending.is_empty() {
            // The initial step was just checked; the first drive must not
            // check it again.
            self.paused_on_current_step.store(true, Ordering::SeqCst);
            self.motion(Motion::Run).await
        } else {
            self.stop(&pending);
            Ok(())
        }
    }

    /// Advance until a stop condition or the end of the program
    ///
    /// # Errors
    ///
    /// Propagates fatal runtime and engine errors.
    pub async fn run(&self) -> Result<()> {
        if self.execution_done.load(Ordering::SeqCst) {
            self.resend_terminated();
            return Ok(());
        }
        self.motion(Motion::Run).await
    }

    /// Drive until the selected step is reported completed
    ///
    /// # Errors
    ///
    /// Fails when no step is selected; propagates fatal errors.
    pub async fn next_step(&self) -> Result<()> {
        if self.execution_done.load(Ordering::SeqCst) {
            self.resend_terminated();
            return Ok(());
        }
        let target = self.selected_step()?;
        self.motion(Motion::UntilComplete(target.id)).await
    }

    /// Enter the selected composite step, or execute the selected atomic
    /// step
    ///
    /// # Errors
    ///
    /// Fails when no step is selected; propagates fatal errors.
    pub async fn step_in(&self) -> Result<()> {
        if self.execution_done.load(Ordering::SeqCst) {
            self.resend_terminated();
            return Ok(());
        }
        self.selected_step()?;
        self.motion(Motion::StepInto).await
    }

    /// Drive until the innermost entered composite completes; with an
    /// empty stack this is `run`
    ///
    /// # Errors
    ///
    /// Propagates fatal errors.
    pub async fn step_out(&self) -> Result<()> {
        if self.execution_done.load(Ordering::SeqCst) {
            self.resend_terminated();
            return Ok(());
        }
        let target = self.steps.read().stack_top().cloned();
        match target {
            Some(step) => self.motion(Motion::UntilComplete(step.id)).await,
            None => self.motion(Motion::Run).await,
        }
    }

    /// Request a pause at the next checkpoint; a no-op while nothing is
    /// running
    pub fn pause(&self) {
        if self.running.load(Ordering::SeqCst) {
            debug!("pause requested");
            self.pause_requested.store(true, Ordering::SeqCst);
        }
    }

    /// Change the selected step; returns whether the selection changed
    ///
    /// # Errors
    ///
    /// Fails before initialization or when the id is not available.
    pub fn select_step(&self, id: &str) -> Result<bool> {
        self.context()?;
        self.steps.write().select(id)
    }

    async fn motion(&self, goal: Motion) -> Result<()> {
        let _guard = self.motion_lock.lock().await;
        if self.execution_done.load(Ordering::SeqCst) {
            self.resend_terminated();
            return Ok(());
        }
        self.running.store(true, Ordering::SeqCst);
        let result = self.drive(goal).await;
        self.running.store(false, Ordering::SeqCst);
        result
    }

    /// The engine's inner loop: checkpoint, then perform one step action
    async fn drive(&self, goal: Motion) -> Result<()> {
        let mut goal = goal;
        let mut pending = PauseInformation::new();
        loop {
            if self.steps.read().available_len() == 0 {
                self.execution_done.store(true, Ordering::SeqCst);
                if self.config.pause_on_end {
                    pending.add(PauseReason::End);
                    self.stop(&pending);
                } else {
                    self.send_terminated()?;
                }
                return Ok(());
            }

            if self.pause_requested.swap(false, Ordering::SeqCst) {
                pending.add(PauseReason::Pause);
            }

            let paused_here = self.paused_on_current_step.load(Ordering::SeqCst);
            if !paused_here && self.steps.read().available_len() > 1 {
                pending.add(PauseReason::Choice);
            }

            let selected = self.selected_step()?;

            // Breakpoints are checked on the step about to be performed,
            // never after it; resuming on a step that already produced a
            // stop skips the repeat check.
            if !(paused_here && self.config.skip_redundant_pauses) {
                for hit in self.check_breakpoints(&selected.id).await? {
                    pending.add_breakpoint(hit.message);
                }
            }

            if !pending.is_empty() {
                self.stop(&pending);
                return Ok(());
            }

            if selected.is_composite {
                self.enter_composite(&selected).await?;
                if matches!(goal, Motion::StepInto) {
                    pending.add(PauseReason::Step);
                    goal = Motion::Run;
                }
            } else {
                let completed = self.execute_atomic(&selected).await?;
                let target_completed = match &goal {
                    Motion::Run => false,
                    Motion::UntilComplete(id) => completed.iter().any(|done| done == id),
                    Motion::StepInto => completed.iter().any(|done| *done == selected.id),
                };
                if target_completed {
                    pending.add(PauseReason::Step);
                }
            }
            self.paused_on_current_step.store(false, Ordering::SeqCst);
        }
    }

    async fn enter_composite(&self, step: &Step) -> Result<()> {
        if !step.is_composite {
            return Err(StepwiseError::NotComposite {
                id: step.id.clone(),
            });
        }
        debug!(step = %step.id, "entering composite step");
        self.proxy
            .enter_composite_step(&self.config.source_file, &step.id)
            .await?;
        self.refresh_steps(&[]).await
    }

    async fn execute_atomic(&self, step: &Step) -> Result<Vec<String>> {
        if step.is_composite {
            return Err(StepwiseError::NotAtomic {
                id: step.id.clone(),
            });
        }
        debug!(step = %step.id, "executing atomic step");
        let completed = self
            .proxy
            .execute_atomic_step(&self.config.source_file, &step.id)
            .await?;

        // Runtime state is stale after every atomic step.
        let context = self.context()?;
        context.variables.invalidate_runtime();
        context.registry.clear_runtime();

        self.refresh_steps(&completed).await?;
        Ok(completed)
    }

    /// Re-fetch the available steps, fold the report into the step state,
    /// and cache step locations for the new list
    async fn refresh_steps(&self, completed: &[String]) -> Result<()> {
        let available = self
            .proxy
            .get_available_steps(&self.config.source_file)
            .await?;
        let ids: Vec<String> = available.iter().map(|step| step.id.clone()).collect();
        self.steps.write().update(available, completed);
        for id in ids {
            let location = self
                .proxy
                .get_step_location(&self.config.source_file, &id)
                .await?;
            self.steps.write().cache_location(&id, location);
        }
        Ok(())
    }

    async fn check_breakpoints(&self, step_id: &str) -> Result<Vec<ActivatedBreakpoint>> {
        let breakpoints = self.context()?.breakpoints.clone();
        breakpoints.check(self.proxy.as_ref(), step_id).await
    }

    fn selected_step(&self) -> Result<Step> {
        self.steps
            .read()
            .selected()
            .cloned()
            .ok_or(StepwiseError::NoSelectedStep)
    }

    fn stop(&self, info: &PauseInformation) {
        debug!(reason = %info.reason_string(), "execution stopped");
        self.paused_on_current_step.store(true, Ordering::SeqCst);
        self.pause_requested.store(false, Ordering::SeqCst);
        self.events.stopped(info);
    }

    fn send_terminated(&self) -> Result<()> {
        if self.terminated_sent.swap(true, Ordering::SeqCst) {
            return Err(StepwiseError::TerminationAlreadySent);
        }
        info!("execution terminated");
        self.events.terminated();
        Ok(())
    }

    /// Step requests after termination re-announce it instead of failing
    fn resend_terminated(&self) {
        self.terminated_sent.store(true, Ordering::SeqCst);
        self.events.terminated();
    }

    /// Verify source breakpoints, deferring until initialization when the
    /// breakpoint manager does not exist yet.
    ///
    /// Exactly one request can be pending; a newer early request replaces
    /// it and the displaced one resolves with every slot unverified.
    ///
    /// # Errors
    ///
    /// Fails when initialization is abandoned before the deferred request
    /// could be resolved.
    pub async fn set_breakpoints(
        &self,
        sources: Vec<SourceBreakpoint>,
    ) -> Result<Vec<Breakpoint>> {
        let receiver = {
            let mut pending = self.pending_breakpoints.lock();
            if let Some(context) = self.context.read().clone() {
                return Ok(context
                    .breakpoints
                    .verify_source_breakpoints(&sources, &context.locator));
            }
            if let Some(displaced) = pending.take() {
                debug!("replacing an earlier deferred setBreakpoints request");
                let outcomes = displaced
                    .sources
                    .iter()
                    .map(|_| Breakpoint {
                        id: None,
                        verified: false,
                    })
                    .collect();
                let _ = displaced.reply.send(outcomes);
            }
            let (reply, receiver) = oneshot::channel();
            *pending = Some(PendingBreakpoints { sources, reply });
            receiver
        };

        debug!("setBreakpoints deferred until initialization completes");
        receiver.await.map_err(|_| StepwiseError::Internal {
            message: "initialization ended before resolving deferred breakpoints".to_string(),
        })
    }

    fn resolve_pending_breakpoints(&self) {
        let taken = self.pending_breakpoints.lock().take();
        if let Some(pending) = taken {
            if let Some(context) = self.context.read().clone() {
                let outcomes = context
                    .breakpoints
                    .verify_source_breakpoints(&pending.sources, &context.locator);
                let _ = pending.reply.send(outcomes);
            }
        }
    }

    /// Replace the installed domain-specific breakpoints
    ///
    /// # Errors
    ///
    /// Fails before initialization.
    pub fn set_domain_breakpoints(
        &self,
        breakpoints: Vec<DomainSpecificBreakpoint>,
    ) -> Result<Vec<bool>> {
        Ok(self.context()?.breakpoints.set_domain_breakpoints(breakpoints))
    }

    /// The runtime-declared breakpoint type catalog
    ///
    /// # Errors
    ///
    /// Fails before initialization.
    pub fn breakpoint_types(&self) -> Result<Vec<BreakpointType>> {
        Ok(self.context()?.breakpoints.available_types())
    }

    /// The currently available steps
    ///
    /// # Errors
    ///
    /// Fails before initialization.
    pub fn available_steps(&self) -> Result<Vec<Step>> {
        self.context()?;
        Ok(self.steps.read().available().to_vec())
    }

    /// All model elements carrying a type tag
    ///
    /// # Errors
    ///
    /// Fails before initialization.
    pub fn elements_of_type(&self, ty: &str) -> Result<Vec<ModelElementReference>> {
        Ok(self.context()?.registry.elements_of_type(ty))
    }

    /// The element containing a client-coordinate source position
    ///
    /// # Errors
    ///
    /// Fails before initialization.
    pub fn element_from_source(
        &self,
        line: i64,
        column: i64,
    ) -> Result<Option<ModelElementReference>> {
        let context = self.context()?;
        Ok(context
            .locator
            .element_from_position(line, column)
            .map(ModelElementReference::from_node))
    }

    /// Children of the value behind a variable reference, fetching the
    /// runtime state first when the last step invalidated it
    ///
    /// # Errors
    ///
    /// Fails before initialization or on transport loss.
    pub async fn variables(&self, reference: i64) -> Result<Vec<Variable>> {
        let context = self.context()?;
        if !context.variables.has_runtime_state() {
            match self.proxy.get_runtime_state(&self.config.source_file).await {
                Ok(root) => {
                    let tree = Arc::new(ModelTree::from_element(root));
                    context.registry.update_runtime(tree.clone());
                    context.variables.update_runtime(tree);
                }
                Err(err @ StepwiseError::Transport { .. }) => return Err(err),
                Err(err) => {
                    warn!(error = %err, "could not fetch runtime state");
                }
            }
        }
        Ok(context.variables.variables(reference))
    }

    /// One frame per entered composite, innermost first, then the `Main`
    /// root frame; locations come from the caches, `(0, 0)` when missing
    ///
    /// # Errors
    ///
    /// Fails before initialization.
    pub fn stack_trace(&self) -> Result<Vec<StackFrame>> {
        self.context()?;
        let offsets = self.config.offsets;
        let source = Source {
            name: std::path::Path::new(&self.config.source_file)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            path: Some(self.config.source_file.clone()),
        };

        let mut frames = Vec::new();
        for (step, location) in self.steps.read().stack_frames() {
            let (line, column) = location.map_or((0, 0), |loc| {
                (
                    offsets.to_client_line(loc.line),
                    offsets.to_client_column(loc.column),
                )
            });
            frames.push(StackFrame {
                id: self.frame_seq.fetch_add(1, Ordering::SeqCst),
                name: step.name,
                source: Some(source.clone()),
                line,
                column,
                can_restart: false,
            });
        }
        frames.push(StackFrame {
            id: self.frame_seq.fetch_add(1, Ordering::SeqCst),
            name: "Main".to_string(),
            source: Some(source),
            line: 0,
            column: 0,
            can_restart: false,
        });
        Ok(frames)
    }
}

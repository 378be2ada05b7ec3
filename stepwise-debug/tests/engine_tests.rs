//! Execution engine scenarios driven through a scripted language runtime
//!
//! The scripted runtime interprets a small step-tree program description,
//! so each test declares the program shape and asserts the event sequence
//! the engine produces.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use stepwise_core::{BreakpointType, Location, ModelElement, Result, Step};
use stepwise_debug::events::{EventSink, Outbound};
use stepwise_debug::locator::SourceOffsets;
use stepwise_debug::proxy::{BreakpointActivation, LanguageRuntime};
use stepwise_debug::runtime::{DebugRuntime, RuntimeConfig};
use stepwise_protocol::dap::SourceBreakpoint;

/// A step in a scripted program; composites hold groups of
/// simultaneously-available sub-steps
#[derive(Debug, Clone)]
enum Spec {
    Atomic(String),
    Composite(String, Vec<Vec<Spec>>),
}

fn atomic(id: &str) -> Spec {
    Spec::Atomic(id.to_string())
}

fn composite(id: &str, groups: Vec<Vec<Spec>>) -> Spec {
    Spec::Composite(id.to_string(), groups)
}

impl Spec {
    fn id(&self) -> &str {
        match self {
            Spec::Atomic(id) | Spec::Composite(id, _) => id,
        }
    }

    fn to_step(&self) -> Step {
        Step {
            id: self.id().to_string(),
            name: format!("step {}", self.id()),
            description: None,
            is_composite: matches!(self, Spec::Composite(..)),
        }
    }
}

/// One level of nesting: the groups still to perform, and the composite
/// that completes when they are all gone
struct Frame {
    completes: Option<String>,
    groups: VecDeque<Vec<Spec>>,
}

struct ProgramState {
    frames: Vec<Frame>,
}

impl ProgramState {
    fn new(groups: Vec<Vec<Spec>>) -> Self {
        Self {
            frames: vec![Frame {
                completes: None,
                groups: groups.into(),
            }],
        }
    }

    fn available(&self) -> Vec<Step> {
        self.frames
            .last()
            .and_then(|frame| frame.groups.front())
            .map(|group| group.iter().map(Spec::to_step).collect())
            .unwrap_or_default()
    }

    fn enter(&mut self, id: &str) {
        let frame = self.frames.last_mut().expect("no active frame");
        let group = frame.groups.pop_front().expect("no available group");
        let spec = group
            .into_iter()
            .find(|spec| spec.id() == id)
            .expect("step not available");
        let Spec::Composite(id, groups) = spec else {
            panic!("entered step is not composite");
        };
        self.frames.push(Frame {
            completes: Some(id),
            groups: groups.into(),
        });
    }

    fn execute(&mut self, id: &str) -> Vec<String> {
        let frame = self.frames.last_mut().expect("no active frame");
        let group = frame.groups.pop_front().expect("no available group");
        assert!(
            group.iter().any(|spec| spec.id() == id),
            "step {id} not available"
        );
        let mut completed = vec![id.to_string()];

        // Unwind composites whose sub-steps are all done.
        while self
            .frames
            .last()
            .is_some_and(|frame| frame.groups.is_empty() && frame.completes.is_some())
        {
            let frame = self.frames.pop().unwrap();
            completed.push(frame.completes.unwrap());
        }
        completed
    }
}

struct ScriptedRuntime {
    state: Mutex<ProgramState>,
    ast: Value,
    runtime_state: Value,
    catalog: Vec<BreakpointType>,
    /// (breakpoint type id, step id) that activate, with their messages
    activations: HashMap<(String, String), String>,
    locations: HashMap<String, Location>,
    executed: Mutex<Vec<String>>,
    /// Request an engine pause while executing this step
    pause_during: Option<String>,
    engine: Arc<OnceLock<Arc<DebugRuntime>>>,
}

impl ScriptedRuntime {
    fn new(groups: Vec<Vec<Spec>>) -> Self {
        Self {
            state: Mutex::new(ProgramState::new(groups)),
            ast: default_ast(),
            runtime_state: json!({ "id": "trace", "types": ["Trace"] }),
            catalog: Vec::new(),
            activations: HashMap::new(),
            locations: HashMap::new(),
            executed: Mutex::new(Vec::new()),
            pause_during: None,
            engine: Arc::new(OnceLock::new()),
        }
    }

    fn with_catalog(mut self, catalog: Vec<BreakpointType>) -> Self {
        self.catalog = catalog;
        self
    }

    fn with_activation(mut self, type_id: &str, step_id: &str, message: &str) -> Self {
        self.activations.insert(
            (type_id.to_string(), step_id.to_string()),
            message.to_string(),
        );
        self
    }

    fn with_location(mut self, step_id: &str, line: i64) -> Self {
        self.locations.insert(
            step_id.to_string(),
            Location {
                line,
                column: 1,
                end_line: line,
                end_column: 30,
            },
        );
        self
    }

    fn with_pause_during(mut self, step_id: &str) -> Self {
        self.pause_during = Some(step_id.to_string());
        self
    }
}

#[async_trait]
impl LanguageRuntime for ScriptedRuntime {
    async fn parse(&self, _source_file: &str) -> Result<ModelElement> {
        Ok(serde_json::from_value(self.ast.clone()).unwrap())
    }

    async fn initialize_execution(&self, _source_file: &str, _entries: &Value) -> Result<()> {
        Ok(())
    }

    async fn get_runtime_state(&self, _source_file: &str) -> Result<ModelElement> {
        Ok(serde_json::from_value(self.runtime_state.clone()).unwrap())
    }

    async fn get_breakpoint_types(&self) -> Result<Vec<BreakpointType>> {
        Ok(self.catalog.clone())
    }

    async fn check_breakpoint(
        &self,
        _source_file: &str,
        step_id: &str,
        type_id: &str,
        _entries: &Value,
    ) -> Result<BreakpointActivation> {
        let key = (type_id.to_string(), step_id.to_string());
        Ok(match self.activations.get(&key) {
            Some(message) => BreakpointActivation {
                is_activated: true,
                message: Some(message.clone()),
            },
            None => BreakpointActivation {
                is_activated: false,
                message: None,
            },
        })
    }

    async fn get_available_steps(&self, _source_file: &str) -> Result<Vec<Step>> {
        Ok(self.state.lock().available())
    }

    async fn enter_composite_step(&self, _source_file: &str, step_id: &str) -> Result<()> {
        self.state.lock().enter(step_id);
        Ok(())
    }

    async fn execute_atomic_step(&self, _source_file: &str, step_id: &str) -> Result<Vec<String>> {
        self.executed.lock().push(step_id.to_string());
        if self.pause_during.as_deref() == Some(step_id) {
            if let Some(engine) = self.engine.get() {
                engine.pause();
            }
        }
        Ok(self.state.lock().execute(step_id))
    }

    async fn get_step_location(
        &self,
        _source_file: &str,
        step_id: &str,
    ) -> Result<Option<Location>> {
        Ok(self.locations.get(step_id).copied())
    }
}

fn default_ast() -> Value {
    json!({
        "id": "main",
        "types": ["Program"],
        "location": { "line": 1, "column": 1, "endLine": 20, "endColumn": 1 },
        "children": {
            "states": [
                {
                    "id": "st1",
                    "types": ["State"],
                    "location": { "line": 2, "column": 3, "endLine": 2, "endColumn": 20 },
                },
            ],
        },
    })
}

fn state_catalog() -> Vec<BreakpointType> {
    serde_json::from_value(json!([
        {
            "id": "state-reached",
            "name": "State reached",
            "parameters": [
                { "name": "state", "type": "element", "elementType": "State" },
            ],
        },
    ]))
    .unwrap()
}

fn state_breakpoint() -> stepwise_core::DomainSpecificBreakpoint {
    serde_json::from_value(json!({
        "breakpointTypeId": "state-reached",
        "entries": { "state": "st1" },
    }))
    .unwrap()
}

fn config(pause_on_start: bool, pause_on_end: bool) -> RuntimeConfig {
    RuntimeConfig {
        source_file: "machine.sm".to_string(),
        pause_on_start,
        pause_on_end,
        skip_redundant_pauses: true,
        entries: json!({}),
        offsets: SourceOffsets::new(true, true),
    }
}

struct Harness {
    engine: Arc<DebugRuntime>,
    script: Arc<ScriptedRuntime>,
    rx: mpsc::UnboundedReceiver<Outbound>,
}

impl Harness {
    fn new(script: ScriptedRuntime, config: RuntimeConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let script = Arc::new(script);
        let engine = Arc::new(DebugRuntime::new(
            script.clone(),
            EventSink::new(tx),
            config,
        ));
        script.engine.set(engine.clone()).ok();
        Self { engine, script, rx }
    }

    /// Drain all queued events as (name, body) pairs
    fn events(&mut self) -> Vec<(String, Value)> {
        let mut out = Vec::new();
        while let Ok(outbound) = self.rx.try_recv() {
            if let Outbound::Event { event, body } = outbound {
                out.push((event, body.unwrap_or(Value::Null)));
            }
        }
        out
    }

    fn executed(&self) -> Vec<String> {
        self.script.executed.lock().clone()
    }
}

fn reasons(events: &[(String, Value)]) -> Vec<String> {
    events
        .iter()
        .filter(|(name, _)| name == "stopped")
        .map(|(_, body)| body["reason"].as_str().unwrap_or_default().to_string())
        .collect()
}

fn count(events: &[(String, Value)], name: &str) -> usize {
    events.iter().filter(|(event, _)| event == name).count()
}

// S1: three atomic steps, no pauses, no breakpoints: one terminated event
// and nothing else.
#[tokio::test]
async fn run_to_termination_without_stops() {
    let mut harness = Harness::new(
        ScriptedRuntime::new(vec![
            vec![atomic("s1")],
            vec![atomic("s2")],
            vec![atomic("s3")],
        ]),
        config(false, false),
    );

    harness.engine.initialize_execution().await.unwrap();

    let events = harness.events();
    assert_eq!(count(&events, "stopped"), 0);
    assert_eq!(count(&events, "terminated"), 1);
    assert_eq!(harness.executed(), ["s1", "s2", "s3"]);
}

// S2: pauseOnStart stops before anything executes; continue runs to the
// end.
#[tokio::test]
async fn pause_on_start_then_continue() {
    let mut harness = Harness::new(
        ScriptedRuntime::new(vec![vec![atomic("s1")], vec![atomic("s2")]]),
        config(true, false),
    );

    harness.engine.initialize_execution().await.unwrap();
    let events = harness.events();
    assert_eq!(reasons(&events), ["start"]);
    assert!(harness.executed().is_empty());

    harness.engine.run().await.unwrap();
    let events = harness.events();
    assert_eq!(count(&events, "stopped"), 0);
    assert_eq!(count(&events, "terminated"), 1);
    assert_eq!(harness.executed(), ["s1", "s2"]);
}

// S3: a breakpoint on the second step stops execution after the first
// step ran; the description carries the runtime's message.
#[tokio::test]
async fn breakpoint_stops_before_its_step() {
    let mut harness = Harness::new(
        ScriptedRuntime::new(vec![
            vec![atomic("s1")],
            vec![atomic("s2")],
            vec![atomic("s3")],
        ])
        .with_catalog(state_catalog())
        .with_activation("state-reached", "s2", "State 'st1' is about to activate."),
        config(true, false),
    );

    harness.engine.initialize_execution().await.unwrap();
    harness.events();
    harness
        .engine
        .set_domain_breakpoints(vec![state_breakpoint()])
        .unwrap();

    harness.engine.run().await.unwrap();
    let events = harness.events();
    assert_eq!(reasons(&events), ["breakpoint"]);
    let (_, body) = events.iter().find(|(name, _)| name == "stopped").unwrap();
    assert_eq!(
        body["description"].as_str().unwrap(),
        "State 'st1' is about to activate."
    );
    assert_eq!(harness.executed(), ["s1"]);

    harness.engine.run().await.unwrap();
    let events = harness.events();
    assert_eq!(count(&events, "terminated"), 1);
    assert_eq!(harness.executed(), ["s1", "s2", "s3"]);
}

// S4: entering a composite that exposes two sub-steps surfaces a choice;
// after selecting the second one, next completes it.
#[tokio::test]
async fn choice_point_and_explicit_selection() {
    let mut harness = Harness::new(
        ScriptedRuntime::new(vec![
            vec![composite("block", vec![vec![atomic("x"), atomic("y")]])],
            vec![atomic("after")],
        ]),
        config(false, false),
    );

    harness.engine.initialize_execution().await.unwrap();
    let events = harness.events();
    assert_eq!(reasons(&events), ["choice"]);
    assert!(harness.executed().is_empty());

    assert!(harness.engine.select_step("y").unwrap());
    harness.engine.next_step().await.unwrap();
    let events = harness.events();
    assert_eq!(reasons(&events), ["step"]);
    assert_eq!(harness.executed(), ["y"]);
}

// S5: next over a composite runs its two atomic sub-steps, pops it, and
// stops with reason step.
#[tokio::test]
async fn next_runs_composite_to_completion() {
    let mut harness = Harness::new(
        ScriptedRuntime::new(vec![
            vec![composite(
                "block",
                vec![vec![atomic("a")], vec![atomic("b")]],
            )],
            vec![atomic("d")],
        ]),
        config(true, false),
    );

    harness.engine.initialize_execution().await.unwrap();
    harness.events();

    harness.engine.next_step().await.unwrap();
    let events = harness.events();
    assert_eq!(reasons(&events), ["step"]);
    assert_eq!(harness.executed(), ["a", "b"]);
}

// S6: a pause requested while running is observed at the next checkpoint;
// continue resumes to termination.
#[tokio::test]
async fn pause_interrupts_a_run() {
    let steps: Vec<Vec<Spec>> = (1..=10).map(|i| vec![atomic(&format!("s{i}"))]).collect();
    let mut harness = Harness::new(
        ScriptedRuntime::new(steps).with_pause_during("s1"),
        config(false, false),
    );

    harness.engine.initialize_execution().await.unwrap();
    let events = harness.events();
    assert_eq!(reasons(&events), ["pause"]);
    assert_eq!(harness.executed(), ["s1"]);

    harness.engine.run().await.unwrap();
    let events = harness.events();
    assert_eq!(count(&events, "terminated"), 1);
    assert_eq!(harness.executed().len(), 10);
}

// Zero initial steps: terminated without any stopped event.
#[tokio::test]
async fn empty_program_terminates_immediately() {
    let mut harness = Harness::new(ScriptedRuntime::new(vec![]), config(false, false));
    harness.engine.initialize_execution().await.unwrap();

    let events = harness.events();
    assert_eq!(count(&events, "stopped"), 0);
    assert_eq!(count(&events, "terminated"), 1);
}

// Zero initial steps with pauseOnEnd: one stopped(end), no terminated.
#[tokio::test]
async fn empty_program_pauses_on_end() {
    let mut harness = Harness::new(ScriptedRuntime::new(vec![]), config(false, true));
    harness.engine.initialize_execution().await.unwrap();

    let events = harness.events();
    assert_eq!(reasons(&events), ["end"]);
    assert_eq!(count(&events, "terminated"), 0);
}

// pauseOnEnd on a non-empty program: the final stop reports the completed
// target step together with the end of the program.
#[tokio::test]
async fn pause_on_end_aggregates_with_step() {
    let mut harness = Harness::new(
        ScriptedRuntime::new(vec![vec![atomic("only")]]),
        config(true, true),
    );
    harness.engine.initialize_execution().await.unwrap();
    harness.events();

    harness.engine.next_step().await.unwrap();
    let events = harness.events();
    assert_eq!(reasons(&events), ["step and end"]);

    // Resuming from the end pause terminates.
    harness.engine.run().await.unwrap();
    let events = harness.events();
    assert_eq!(count(&events, "terminated"), 1);
}

// A breakpoint activating at a choice point reports both reasons at once.
#[tokio::test]
async fn choice_and_breakpoint_aggregate() {
    let mut harness = Harness::new(
        ScriptedRuntime::new(vec![
            vec![composite("block", vec![vec![atomic("x"), atomic("y")]])],
            vec![atomic("after")],
        ])
        .with_catalog(state_catalog())
        .with_activation("state-reached", "x", "State 'st1' is about to activate."),
        config(true, false),
    );

    harness.engine.initialize_execution().await.unwrap();
    harness.events();
    harness
        .engine
        .set_domain_breakpoints(vec![state_breakpoint()])
        .unwrap();

    harness.engine.run().await.unwrap();
    let events = harness.events();
    assert_eq!(reasons(&events), ["choice and breakpoint"]);
}

// A completed target step and a breakpoint on the next step aggregate.
#[tokio::test]
async fn step_and_breakpoint_aggregate() {
    let mut harness = Harness::new(
        ScriptedRuntime::new(vec![
            vec![atomic("a")],
            vec![atomic("b")],
            vec![atomic("c")],
        ])
        .with_catalog(state_catalog())
        .with_activation("state-reached", "b", "State 'st1' is about to activate."),
        config(true, false),
    );

    harness.engine.initialize_execution().await.unwrap();
    harness.events();
    harness
        .engine
        .set_domain_breakpoints(vec![state_breakpoint()])
        .unwrap();

    harness.engine.next_step().await.unwrap();
    let events = harness.events();
    assert_eq!(reasons(&events), ["step and breakpoint"]);
    let (_, body) = events.iter().find(|(name, _)| name == "stopped").unwrap();
    assert_eq!(
        body["description"].as_str().unwrap(),
        "Step completed.\nState 'st1' is about to activate."
    );
}

// stepIn on a composite enters it without executing anything; stepIn on
// an atomic executes exactly that step.
#[tokio::test]
async fn step_in_enters_composites_and_executes_atomics() {
    let mut harness = Harness::new(
        ScriptedRuntime::new(vec![
            vec![composite("block", vec![vec![atomic("a")], vec![atomic("b")]])],
            vec![atomic("d")],
        ]),
        config(true, false),
    );

    harness.engine.initialize_execution().await.unwrap();
    harness.events();

    harness.engine.step_in().await.unwrap();
    let events = harness.events();
    assert_eq!(reasons(&events), ["step"]);
    assert!(harness.executed().is_empty());

    harness.engine.step_in().await.unwrap();
    let events = harness.events();
    assert_eq!(reasons(&events), ["step"]);
    assert_eq!(harness.executed(), ["a"]);
}

// stepOut drives until the entered composite is reported completed.
#[tokio::test]
async fn step_out_completes_the_entered_composite() {
    let mut harness = Harness::new(
        ScriptedRuntime::new(vec![
            vec![composite("block", vec![vec![atomic("a")], vec![atomic("b")]])],
            vec![atomic("d")],
        ]),
        config(true, false),
    );

    harness.engine.initialize_execution().await.unwrap();
    harness.engine.step_in().await.unwrap();
    harness.events();

    harness.engine.step_out().await.unwrap();
    let events = harness.events();
    assert_eq!(reasons(&events), ["step"]);
    assert_eq!(harness.executed(), ["a", "b"]);
}

// stepOut with an empty stack behaves like run.
#[tokio::test]
async fn step_out_at_top_level_runs() {
    let mut harness = Harness::new(
        ScriptedRuntime::new(vec![vec![atomic("s1")], vec![atomic("s2")]]),
        config(true, false),
    );
    harness.engine.initialize_execution().await.unwrap();
    harness.events();

    harness.engine.step_out().await.unwrap();
    let events = harness.events();
    assert_eq!(count(&events, "terminated"), 1);
    assert_eq!(harness.executed(), ["s1", "s2"]);
}

// Step requests after termination re-announce terminated instead of
// failing.
#[tokio::test]
async fn motions_after_termination_resend_terminated() {
    let mut harness = Harness::new(
        ScriptedRuntime::new(vec![vec![atomic("s1")]]),
        config(false, false),
    );
    harness.engine.initialize_execution().await.unwrap();
    assert_eq!(count(&harness.events(), "terminated"), 1);

    harness.engine.next_step().await.unwrap();
    assert_eq!(count(&harness.events(), "terminated"), 1);
}

// pause while already paused is a no-op: the next continue does not stop.
#[tokio::test]
async fn pause_while_paused_is_noop() {
    let mut harness = Harness::new(
        ScriptedRuntime::new(vec![vec![atomic("s1")], vec![atomic("s2")]]),
        config(true, false),
    );
    harness.engine.initialize_execution().await.unwrap();
    harness.events();

    harness.engine.pause();
    harness.engine.run().await.unwrap();
    let events = harness.events();
    assert_eq!(count(&events, "stopped"), 0);
    assert_eq!(count(&events, "terminated"), 1);
}

// The stack trace lists entered composites innermost first plus the Main
// root frame, with locations from the step caches.
#[tokio::test]
async fn stack_trace_reflects_entered_composites() {
    let mut harness = Harness::new(
        ScriptedRuntime::new(vec![
            vec![composite(
                "outer",
                vec![vec![composite("inner", vec![vec![atomic("leaf")]])]],
            )],
        ])
        .with_location("outer", 2)
        .with_location("inner", 3),
        config(true, false),
    );

    harness.engine.initialize_execution().await.unwrap();
    harness.engine.step_in().await.unwrap();
    harness.engine.step_in().await.unwrap();
    harness.events();

    let frames = harness.engine.stack_trace().unwrap();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].name, "step inner");
    assert_eq!(frames[0].line, 3);
    assert_eq!(frames[1].name, "step outer");
    assert_eq!(frames[1].line, 2);
    assert_eq!(frames[2].name, "Main");
    assert_eq!(frames[2].line, 0);
    assert!(frames.iter().all(|frame| !frame.can_restart));
    // Frame ids are monotonic across requests.
    let again = harness.engine.stack_trace().unwrap();
    assert!(again[0].id > frames[2].id);
}

// Source breakpoints verify against located, anchorable elements; a slot
// without a column never verifies.
#[tokio::test]
async fn source_breakpoint_verification_outcomes() {
    let mut harness = Harness::new(
        ScriptedRuntime::new(vec![vec![atomic("s1")]]).with_catalog(state_catalog()),
        config(true, false),
    );
    harness.engine.initialize_execution().await.unwrap();
    harness.events();

    let outcomes = harness
        .engine
        .set_breakpoints(vec![
            slot(2, Some(5)),
            slot(2, None),
            slot(15, Some(1)),
        ])
        .await
        .unwrap();
    assert_eq!(
        outcomes.iter().map(|o| o.verified).collect::<Vec<_>>(),
        [true, false, false]
    );
    assert_eq!(outcomes[0].id, Some(0));

    // Idempotence: repeating the request yields identical outcomes.
    let repeat = harness
        .engine
        .set_breakpoints(vec![slot(2, Some(5)), slot(2, None), slot(15, Some(1))])
        .await
        .unwrap();
    assert_eq!(outcomes, repeat);
}

// setBreakpoints before initialization defers and resolves once the
// breakpoint manager exists, with the same outcomes as a late request.
#[tokio::test]
async fn set_breakpoints_defers_until_initialization() {
    let mut harness = Harness::new(
        ScriptedRuntime::new(vec![vec![atomic("s1")]]).with_catalog(state_catalog()),
        config(true, false),
    );

    let engine = harness.engine.clone();
    let deferred =
        tokio::spawn(async move { engine.set_breakpoints(vec![slot(2, Some(5))]).await });
    // Let the request register before initialization runs.
    tokio::task::yield_now().await;

    harness.engine.initialize_execution().await.unwrap();
    let outcomes = deferred.await.unwrap().unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].verified);
}

// A second early request replaces the first; the displaced request
// resolves with every slot unverified.
#[tokio::test]
async fn later_deferred_request_wins() {
    let mut harness = Harness::new(
        ScriptedRuntime::new(vec![vec![atomic("s1")]]).with_catalog(state_catalog()),
        config(true, false),
    );

    let engine = harness.engine.clone();
    let first = tokio::spawn(async move { engine.set_breakpoints(vec![slot(2, Some(5))]).await });
    tokio::task::yield_now().await;

    let engine = harness.engine.clone();
    let second = tokio::spawn(async move { engine.set_breakpoints(vec![slot(2, Some(5))]).await });
    tokio::task::yield_now().await;

    harness.engine.initialize_execution().await.unwrap();

    let displaced = first.await.unwrap().unwrap();
    assert_eq!(displaced.len(), 1);
    assert!(!displaced[0].verified);

    let winner = second.await.unwrap().unwrap();
    assert!(winner[0].verified);
}

// Variables walk the AST scope and lazily fetch the runtime state for
// the runtime scope; handles survive until the next step.
#[tokio::test]
async fn variables_expose_both_scopes() {
    let mut harness = Harness::new(
        ScriptedRuntime::new(vec![vec![atomic("s1")]]),
        config(true, false),
    );
    harness.engine.initialize_execution().await.unwrap();
    harness.events();

    let ast_vars = harness.engine.variables(1).await.unwrap();
    assert!(ast_vars.iter().any(|v| v.name == "states"));

    let runtime_vars = harness.engine.variables(2).await.unwrap();
    assert!(runtime_vars.is_empty());
}

fn slot(line: i64, column: Option<i64>) -> SourceBreakpoint {
    let mut value = json!({ "line": line });
    if let Some(column) = column {
        value["column"] = json!(column);
    }
    serde_json::from_value(value).unwrap()
}

//! Per-connection debug session
//!
//! One session per accepted IDE connection. A read loop decodes framed
//! requests and dispatches them in arrival order; a writer task owns the
//! outbound half and assigns sequence numbers. Motions and initialization
//! run as spawned tasks so the loop stays responsive for `pause` and for
//! breakpoint requests racing the launch.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use stepwise_core::{Result, StepwiseError};
use stepwise_protocol::codec::DapCodec;
use stepwise_protocol::dap::{
    Capabilities, Event, InitializeArguments, LaunchArguments, ProtocolMessage, Request, Response,
    SetBreakpointsArguments,
};
use stepwise_protocol::JsonRpcClient;

use crate::custom;
use crate::events::{EventSink, Outbound};
use crate::locator::SourceOffsets;
use crate::proxy::LanguageRuntimeProxy;
use crate::runtime::{DebugRuntime, RuntimeConfig};
use crate::variables::{AST_ROOT_REFERENCE, RUNTIME_ROOT_REFERENCE};

/// How a dispatched request was answered
enum Reply {
    /// Success with no body
    Ok,
    /// Success with a body
    Body(Value),
    /// The handler queued its own response
    Sent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MotionKind {
    Continue,
    Next,
    StepIn,
    StepOut,
}

/// Drive one debug session over `stream` until the client disconnects
pub async fn run<S>(stream: S)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let session_id = Uuid::new_v4().to_string();
    let span = info_span!("session", id = %session_id);
    serve(stream).instrument(span).await;
}

async fn serve<S>(stream: S)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    info!("debug session connected");

    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = FramedRead::new(read_half, DapCodec::new());
    let mut writer_stream = FramedWrite::new(write_half, DapCodec::new());

    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();
    let writer = tokio::spawn(async move {
        let mut next_seq: i64 = 1;
        while let Some(outbound) = rx.recv().await {
            let seq = next_seq;
            next_seq += 1;
            let message = match outbound {
                Outbound::Response {
                    request_seq,
                    command,
                    success,
                    message,
                    body,
                } => ProtocolMessage::Response(Response {
                    seq,
                    request_seq,
                    success,
                    command,
                    message,
                    body,
                }),
                Outbound::Event { event, body } => {
                    ProtocolMessage::Event(Event { seq, event, body })
                }
            };
            if let Err(err) = writer_stream.send(message).await {
                debug!(error = %err, "client connection closed while writing");
                break;
            }
        }
    });

    let mut session = DebugSession {
        sink: EventSink::new(tx),
        client: None,
        runtime: None,
    };

    while let Some(frame) = reader.next().await {
        match frame {
            Ok(ProtocolMessage::Request(request)) => {
                let disconnecting = request.command == "disconnect";
                session.handle(request).await;
                if disconnecting {
                    break;
                }
            }
            Ok(_) => warn!("ignoring non-request message from client"),
            Err(err) => {
                warn!(error = %err, "malformed frame from client, closing session");
                break;
            }
        }
    }

    // Dropping the session drops its sender; the writer drains whatever
    // is queued (the disconnect response included) and then ends. Spawned
    // motion tasks can pin the channel open, so bound the wait.
    drop(session);
    let mut writer = writer;
    if tokio::time::timeout(std::time::Duration::from_secs(5), &mut writer)
        .await
        .is_err()
    {
        writer.abort();
    }
    info!("debug session closed");
}

struct DebugSession {
    sink: EventSink,
    client: Option<InitializeArguments>,
    runtime: Option<Arc<DebugRuntime>>,
}

impl DebugSession {
    async fn handle(&mut self, request: Request) {
        debug!(command = %request.command, seq = request.seq, "handling request");
        match self.dispatch(&request).await {
            Ok(Reply::Ok) => self.sink.respond_ok(request.seq, &request.command, None),
            Ok(Reply::Body(body)) => {
                self.sink.respond_ok(request.seq, &request.command, Some(body));
            }
            Ok(Reply::Sent) => {}
            Err(err) => respond_error(&self.sink, &request, &err),
        }
    }

    async fn dispatch(&mut self, request: &Request) -> Result<Reply> {
        // A failed session keeps answering with the latched diagnostic.
        if let Some(runtime) = &self.runtime {
            if let Some(message) = runtime.failure() {
                return Err(StepwiseError::Transport { message });
            }
        }

        if self.client.is_none() && !matches!(request.command.as_str(), "initialize" | "disconnect")
        {
            return Err(StepwiseError::NotInitialized);
        }

        match request.command.as_str() {
            "initialize" => self.handle_initialize(request),
            "launch" => self.handle_launch(request).await,
            "configurationDone" => Ok(Reply::Ok),
            "disconnect" => Ok(Reply::Ok),
            "threads" => Ok(Reply::Body(json!({
                "threads": [{ "id": 1, "name": "Unique Thread" }],
            }))),
            "pause" => {
                self.runtime()?.pause();
                Ok(Reply::Ok)
            }
            "continue" => self.motion(request, MotionKind::Continue),
            "next" => self.motion(request, MotionKind::Next),
            "stepIn" => self.motion(request, MotionKind::StepIn),
            "stepOut" => self.motion(request, MotionKind::StepOut),
            "setBreakpoints" => {
                let runtime = self.runtime()?.clone();
                let args: SetBreakpointsArguments = parse_args(request)?;
                // May defer until initialization completes; spawned so the
                // read loop keeps serving requests (a replacing breakpoint
                // request, pause, disconnect) while one is pending.
                let sink = self.sink.clone();
                let request = request.clone();
                tokio::spawn(async move {
                    match runtime.set_breakpoints(args.breakpoints).await {
                        Ok(outcomes) => sink.respond_ok(
                            request.seq,
                            &request.command,
                            Some(json!({ "breakpoints": outcomes })),
                        ),
                        Err(err) => respond_error(&sink, &request, &err),
                    }
                });
                Ok(Reply::Sent)
            }
            "stackTrace" => {
                let frames = self.runtime()?.stack_trace()?;
                let total = frames.len();
                Ok(Reply::Body(json!({
                    "stackFrames": frames,
                    "totalFrames": total,
                })))
            }
            "scopes" => {
                self.runtime()?;
                Ok(Reply::Body(json!({
                    "scopes": [
                        {
                            "name": "AST",
                            "variablesReference": AST_ROOT_REFERENCE,
                            "expensive": false,
                        },
                        {
                            "name": "Runtime State",
                            "variablesReference": RUNTIME_ROOT_REFERENCE,
                            "expensive": false,
                        },
                    ],
                })))
            }
            "variables" => {
                let reference = request.arguments["variablesReference"]
                    .as_i64()
                    .ok_or_else(|| {
                        StepwiseError::invalid_request("'variablesReference' must be an integer")
                    })?;
                let variables = self.runtime()?.variables(reference).await?;
                Ok(Reply::Body(json!({ "variables": variables })))
            }
            "source" => self.handle_source(request),
            "evaluate" | "attach" => Err(StepwiseError::invalid_request(format!(
                "command '{}' is not implemented",
                request.command
            ))),
            command if custom::is_custom_command(command) => {
                let runtime = self.runtime()?.clone();
                let body = custom::dispatch(&runtime, &self.sink, command, &request.arguments).await?;
                Ok(Reply::Body(body))
            }
            other => Err(StepwiseError::invalid_request(format!(
                "unknown command '{other}'"
            ))),
        }
    }

    fn handle_initialize(&mut self, request: &Request) -> Result<Reply> {
        if self.client.is_some() {
            return Err(StepwiseError::AlreadyInitialized);
        }
        let args: InitializeArguments = if request.arguments.is_null() {
            InitializeArguments::default()
        } else {
            parse_args(request)?
        };
        debug!(adapter = %args.adapter_id, "client initialized");
        self.client = Some(args);

        let capabilities = serde_json::to_value(Capabilities::advertised())
            .map_err(|err| StepwiseError::protocol(err.to_string()))?;
        self.sink
            .respond_ok(request.seq, &request.command, Some(capabilities));
        // The client sends breakpoint configuration only after this.
        self.sink.initialized();
        Ok(Reply::Sent)
    }

    async fn handle_launch(&mut self, request: &Request) -> Result<Reply> {
        if self.runtime.is_some() {
            return Err(StepwiseError::AlreadyInitialized);
        }
        let args: LaunchArguments = parse_args(request)?;
        if args.no_debug {
            return Err(StepwiseError::invalid_request(
                "noDebug sessions are not supported",
            ));
        }

        let addr = format!("127.0.0.1:{}", args.language_runtime_port);
        let client = JsonRpcClient::connect(&addr).await.map_err(|err| {
            StepwiseError::transport(format!("cannot reach language runtime at {addr}: {err}"))
        })?;
        info!(source = %args.source_file, runtime = %addr, "launching debug runtime");

        let offsets = self.client.as_ref().map_or_else(SourceOffsets::default, |client| {
            SourceOffsets::new(client.lines_start_at1, client.columns_start_at1)
        });
        let config = RuntimeConfig {
            source_file: args.source_file,
            pause_on_start: args.pause_on_start,
            pause_on_end: args.pause_on_end,
            skip_redundant_pauses: args.skip_redundant_pauses,
            entries: args.additional_args.unwrap_or_else(|| json!({})),
            offsets,
        };
        let runtime = Arc::new(DebugRuntime::new(
            Arc::new(LanguageRuntimeProxy::new(client)),
            self.sink.clone(),
            config,
        ));
        self.runtime = Some(runtime.clone());

        // The launch response precedes every event initialization emits.
        self.sink.respond_ok(request.seq, &request.command, None);
        tokio::spawn(async move {
            if let Err(err) = runtime.initialize_execution().await {
                runtime.latch_failure(&err);
            }
        });
        Ok(Reply::Sent)
    }

    /// Respond, then move; the stopped or terminated event the motion
    /// produces always follows the response
    fn motion(&self, request: &Request, kind: MotionKind) -> Result<Reply> {
        let runtime = self.runtime()?.clone();
        let body =
            (kind == MotionKind::Continue).then(|| json!({ "allThreadsContinued": true }));
        self.sink.respond_ok(request.seq, &request.command, body);

        tokio::spawn(async move {
            let result = match kind {
                MotionKind::Continue => runtime.run().await,
                MotionKind::Next => runtime.next_step().await,
                MotionKind::StepIn => runtime.step_in().await,
                MotionKind::StepOut => runtime.step_out().await,
            };
            if let Err(err) = result {
                runtime.latch_failure(&err);
            }
        });
        Ok(Reply::Sent)
    }

    fn handle_source(&self, request: &Request) -> Result<Reply> {
        let path = request.arguments["source"]["path"]
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| StepwiseError::invalid_request("'source.path' must be a string"))?;
        let content = std::fs::read_to_string(&path).map_err(|err| {
            StepwiseError::invalid_request(format!("cannot read source '{path}': {err}"))
        })?;
        Ok(Reply::Body(json!({ "content": content })))
    }

    fn runtime(&self) -> Result<&Arc<DebugRuntime>> {
        self.runtime.as_ref().ok_or(StepwiseError::NotInitialized)
    }
}

fn respond_error(sink: &EventSink, request: &Request, err: &StepwiseError) {
    let code = match err {
        StepwiseError::InvalidRequest { .. } => Some(100),
        StepwiseError::NotInitialized => Some(200),
        StepwiseError::AlreadyInitialized => Some(201),
        _ => None,
    };
    let message = err.to_string();
    warn!(command = %request.command, error = %message, "request failed");

    let mut body = json!({});
    if let Some(code) = code {
        body["error"] = json!({ "id": code, "format": message });
    }
    if custom::is_custom_command(&request.command)
        && matches!(err, StepwiseError::InvalidRequest { .. })
    {
        // Malformed extension arguments echo the offending payload.
        body["_exception"] = Value::String(message.clone());
        body["_args"] = request.arguments.clone();
    }
    sink.respond_err(request.seq, &request.command, message, Some(body));
}

fn parse_args<T: DeserializeOwned>(request: &Request) -> Result<T> {
    serde_json::from_value(request.arguments.clone()).map_err(|err| {
        StepwiseError::invalid_request(format!(
            "malformed '{}' arguments: {err}",
            request.command
        ))
    })
}

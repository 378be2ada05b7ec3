//! Outbound message queue shared by the session and the engine
//!
//! Responses and events funnel through one unbounded channel into the
//! writer task, which assigns sequence numbers at write time. Queue order
//! is wire order, so a handler that pushes its response before starting
//! work keeps the response ahead of every event that work produces.

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::trace;

use crate::pause::PauseInformation;

/// A message waiting for the writer task
#[derive(Debug)]
pub enum Outbound {
    Response {
        request_seq: i64,
        command: String,
        success: bool,
        message: Option<String>,
        body: Option<Value>,
    },
    Event {
        event: String,
        body: Option<Value>,
    },
}

/// Cloneable handle used to queue outbound messages
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl EventSink {
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { tx }
    }

    fn push(&self, outbound: Outbound) {
        // A send failure means the connection is gone; the session is
        // already tearing down.
        if self.tx.send(outbound).is_err() {
            trace!("dropping outbound message for closed session");
        }
    }

    pub fn respond_ok(&self, request_seq: i64, command: &str, body: Option<Value>) {
        self.push(Outbound::Response {
            request_seq,
            command: command.to_string(),
            success: true,
            message: None,
            body,
        });
    }

    pub fn respond_err(
        &self,
        request_seq: i64,
        command: &str,
        message: String,
        body: Option<Value>,
    ) {
        self.push(Outbound::Response {
            request_seq,
            command: command.to_string(),
            success: false,
            message: Some(message),
            body,
        });
    }

    pub fn event(&self, event: &str, body: Option<Value>) {
        self.push(Outbound::Event {
            event: event.to_string(),
            body,
        });
    }

    pub fn initialized(&self) {
        self.event("initialized", None);
    }

    pub fn stopped(&self, info: &PauseInformation) {
        let mut body = json!({
            "reason": info.reason_string(),
            "threadId": 1,
        });
        if let Some(description) = info.description() {
            body["description"] = Value::String(description);
        }
        self.event("stopped", Some(body));
    }

    pub fn terminated(&self) {
        self.event("terminated", None);
    }

    pub fn invalidated(&self, areas: &[&str]) {
        self.event("invalidated", Some(json!({ "areas": areas })));
    }
}

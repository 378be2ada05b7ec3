//! JSON-RPC client for the language runtime
//!
//! One TCP connection per debug session. Calls are issued strictly in
//! program order and the runtime answers them in that same order, so the
//! client holds the connection for the duration of each call instead of
//! correlating concurrent requests.

use std::sync::atomic::{AtomicU64, Ordering};

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::Framed;
use tracing::{debug, trace};

use crate::codec::{JsonRpcCodec, TransportError};
use crate::jsonrpc::JsonRpcRequest;

/// TCP JSON-RPC client
#[derive(Debug)]
pub struct JsonRpcClient {
    stream: Mutex<Framed<TcpStream, JsonRpcCodec>>,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    /// Connect to a runtime at `addr`
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP connection cannot be established.
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        debug!("connected to language runtime at {addr}");
        Ok(Self {
            stream: Mutex::new(Framed::new(stream, JsonRpcCodec::new())),
            next_id: AtomicU64::new(1),
        })
    }

    /// Invoke `method` and wait for its result
    ///
    /// # Errors
    ///
    /// Returns an error if the connection drops, the response cannot be
    /// parsed or correlated, or the runtime reports an error member.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        trace!(id, method, "issuing runtime call");

        let mut stream = self.stream.lock().await;
        stream.send(JsonRpcRequest::new(id, method, params)).await?;

        let response = match stream.next().await {
            Some(Ok(response)) => response,
            Some(Err(err)) => return Err(err),
            None => return Err(TransportError::ConnectionClosed),
        };

        if response.id != Some(id) {
            return Err(TransportError::Protocol(format!(
                "response id {:?} does not match request id {id}",
                response.id
            )));
        }
        if let Some(error) = response.error {
            return Err(TransportError::Remote {
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }
}

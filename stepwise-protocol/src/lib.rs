//! Wire protocols for the stepwise debugger
//!
//! Two transports meet in this crate:
//!
//! - the IDE side: DAP messages (`Content-Length`-framed JSON) decoded
//!   and encoded by [`codec::DapCodec`], with the envelope and body
//!   shapes in [`dap`];
//! - the runtime side: newline-delimited JSON-RPC 2.0, driven through
//!   [`client::JsonRpcClient`].

pub mod client;
pub mod codec;
pub mod dap;
pub mod jsonrpc;

pub use client::JsonRpcClient;
pub use codec::{DapCodec, JsonRpcCodec, TransportError};
pub use dap::{Event, ProtocolMessage, Request, Response};
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};

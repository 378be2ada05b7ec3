//! Frame codecs for both wire protocols
//!
//! The IDE side speaks DAP framing: a `Content-Length` header block,
//! a blank line, then exactly that many bytes of JSON. The language
//! runtime side speaks newline-delimited JSON-RPC 2.0, one message per
//! line.

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

use crate::dap::ProtocolMessage;
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};

/// Errors that can occur on either transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Framing error: {0}")]
    Framing(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Remote error {code}: {message}")]
    Remote { code: i64, message: String },
}

/// `Content-Length`-framed JSON codec for DAP messages
///
/// Header fields other than `Content-Length` are tolerated and ignored;
/// the framing spec reserves room for future fields.
#[derive(Debug, Default)]
pub struct DapCodec {
    /// Body length parsed from a complete header block, kept across
    /// `decode` calls while the body is still in flight
    pending_length: Option<usize>,
}

impl DapCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

fn find_header_end(src: &BytesMut) -> Option<usize> {
    src.windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
}

fn parse_content_length(header: &str) -> Result<usize, TransportError> {
    for field in header.split("\r\n") {
        if field.is_empty() {
            continue;
        }
        let (name, value) = field
            .split_once(':')
            .ok_or_else(|| TransportError::Framing(format!("malformed header field: {field}")))?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            return value
                .trim()
                .parse()
                .map_err(|_| TransportError::Framing(format!("invalid content length: {value}")));
        }
    }
    Err(TransportError::Framing(
        "missing Content-Length header".to_string(),
    ))
}

impl Decoder for DapCodec {
    type Item = ProtocolMessage;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let length = match self.pending_length {
            Some(length) => length,
            None => {
                let Some(header_end) = find_header_end(src) else {
                    return Ok(None);
                };
                let header = std::str::from_utf8(&src[..header_end])
                    .map_err(|_| TransportError::Framing("header is not UTF-8".to_string()))?;
                let length = parse_content_length(header)?;
                src.advance(header_end + HEADER_TERMINATOR.len());
                self.pending_length = Some(length);
                length
            }
        };

        if src.len() < length {
            src.reserve(length - src.len());
            return Ok(None);
        }

        self.pending_length = None;
        let body = src.split_to(length);
        Ok(Some(serde_json::from_slice(&body)?))
    }
}

impl Encoder<ProtocolMessage> for DapCodec {
    type Error = TransportError;

    fn encode(&mut self, msg: ProtocolMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = serde_json::to_vec(&msg)?;
        let header = format!("Content-Length: {}\r\n\r\n", body.len());
        dst.reserve(header.len() + body.len());
        dst.put_slice(header.as_bytes());
        dst.put_slice(&body);
        Ok(())
    }
}

/// Newline-delimited JSON-RPC codec, as used on the runtime connection
///
/// Decodes responses and encodes requests: the debugger is always the
/// client on this wire. Blank lines between messages are skipped.
#[derive(Debug, Default)]
pub struct JsonRpcCodec;

impl JsonRpcCodec {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for JsonRpcCodec {
    type Item = JsonRpcResponse;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(newline) = src.iter().position(|&byte| byte == b'\n') else {
                return Ok(None);
            };
            let mut line = src.split_to(newline + 1);
            line.truncate(newline);
            if line.ends_with(b"\r") {
                line.truncate(line.len() - 1);
            }
            if line.is_empty() {
                continue;
            }
            return Ok(Some(serde_json::from_slice(&line)?));
        }
    }
}

impl Encoder<JsonRpcRequest> for JsonRpcCodec {
    type Error = TransportError;

    fn encode(&mut self, msg: JsonRpcRequest, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = serde_json::to_vec(&msg)?;
        dst.reserve(body.len() + 1);
        dst.put_slice(&body);
        dst.put_u8(b'\n');
        Ok(())
    }
}

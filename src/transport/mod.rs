//! 传输层抽象
//!
//! The connection manager only ever talks to a [`Transport`]; the WebSocket
//! implementation lives in [`websocket`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::TransportError;

#[cfg(feature = "websocket")]
pub mod websocket;

#[cfg(feature = "websocket")]
pub use websocket::{FrameReader, WebSocketTransport};

/// 帧类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Binary,
    Text,
    Ping,
    Pong,
    Close,
}

/// 入站帧
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(kind: FrameKind, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }
}

/// What the server answered when it refused the upgrade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeResponse {
    pub status: u16,
    /// Keys are lowercased.
    headers: HashMap<String, String>,
}

impl HandshakeResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Dial failure. `response` is `None` when the server was never reached
/// (DNS, refused, timed out before the handshake completed).
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct DialError {
    pub response: Option<HandshakeResponse>,
    #[source]
    pub source: TransportError,
}

impl DialError {
    pub fn unreachable(source: TransportError) -> Self {
        Self {
            response: None,
            source,
        }
    }

    pub fn rejected(response: HandshakeResponse, source: TransportError) -> Self {
        Self {
            response: Some(response),
            source,
        }
    }
}

/// 双工连接接口
///
/// One instance is re-dialed for the whole session; `is_connected` is false
/// until the first successful dial and again after `close`.
#[async_trait]
pub trait Transport: Send {
    /// Open a connection to `url`, replacing any previous one.
    async fn dial(&mut self, url: &str, headers: &HashMap<String, String>) -> Result<(), DialError>;

    async fn close(&mut self) -> Result<(), TransportError>;

    /// Write one frame, honoring the armed write deadline.
    async fn write_frame(&mut self, kind: FrameKind, payload: Vec<u8>) -> Result<(), TransportError>;

    fn set_write_deadline(&mut self, timeout: Duration) -> Result<(), TransportError>;

    fn set_read_deadline(&mut self, timeout: Duration) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;
}

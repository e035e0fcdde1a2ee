use std::fmt;
use std::time::Duration;

use crate::codec::CodecError;

/// Marker the transport collaborator puts in the text of every deadline error.
pub const TIMEOUT_MARKER: &str = "timeout";

/// 传输层错误
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// 连接相关错误
    #[error("Connection error: {reason}")]
    Connection { reason: String },

    /// 协议相关错误
    #[error("Protocol error: {reason}")]
    Protocol { reason: String },

    /// 超时错误
    #[error("Operation '{operation}' timeout after {duration:?}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// No live connection is held
    #[error("Connection is nil")]
    NotConnected,

    /// `TimedOut` errors always carry the timeout marker in their text.
    #[error("IO error: {}{}", .0, io_timeout_suffix(.0))]
    Io(#[from] std::io::Error),
}

fn io_timeout_suffix(err: &std::io::Error) -> &'static str {
    if err.kind() == std::io::ErrorKind::TimedOut && !err.to_string().contains(TIMEOUT_MARKER) {
        " (timeout)"
    } else {
        ""
    }
}

impl TransportError {
    pub fn connection_error(reason: impl Into<String>) -> Self {
        Self::Connection {
            reason: reason.into(),
        }
    }

    pub fn protocol_error(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    pub fn timeout_error(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Structured counterpart of [`is_read_timeout`] for errors this crate produces.
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Timeout { .. } => true,
            TransportError::Io(err) => err.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        }
    }
}

/// Errors surfaced by the connection manager.
///
/// Every variant names the step that failed, so a caller logging the error
/// can tell an encode failure from a write failure without a backtrace.
#[derive(Debug, thiserror::Error)]
pub enum ConnError {
    #[error("Encode error: {0}")]
    Encode(#[source] CodecError),

    #[error("Decode error: {0}")]
    Decode(#[source] CodecError),

    #[error("{operation}: conn is nil")]
    NotConnected { operation: &'static str },

    #[error("msg too long: {len} bytes exceeds limit {limit}")]
    Oversized { len: usize, limit: usize },

    #[error("Compress error: {0}")]
    Compress(#[source] std::io::Error),

    #[error("{step} failed: {source}")]
    Transport {
        step: &'static str,
        #[source]
        source: TransportError,
    },

    /// Dial failed; `status` is present when the server answered the handshake.
    #[error("Dial failed: {message}")]
    Dial {
        status: Option<u16>,
        message: String,
        #[source]
        source: TransportError,
    },

    #[error("don't re conn: kicked offline")]
    KickedOffline,
}

impl ConnError {
    pub(crate) fn transport(step: &'static str, source: TransportError) -> Self {
        Self::Transport { step, source }
    }

    /// Server status code carried by a rejected dial.
    pub fn status(&self) -> Option<u16> {
        match self {
            ConnError::Dial { status, .. } => *status,
            _ => None,
        }
    }
}

/// 读超时判断：错误描述中包含超时标记
pub fn is_read_timeout<E: fmt::Display + ?Sized>(err: &E) -> bool {
    err.to_string().contains(TIMEOUT_MARKER)
}

/// 写超时判断：与读超时使用同一标记
pub fn is_write_timeout<E: fmt::Display + ?Sized>(err: &E) -> bool {
    err.to_string().contains(TIMEOUT_MARKER)
}

/// Anything without a timeout marker means the connection is gone and a
/// fresh reconnect is required.
pub fn is_fatal_error<E: fmt::Display + ?Sized>(err: &E) -> bool {
    !err.to_string().contains(TIMEOUT_MARKER)
}

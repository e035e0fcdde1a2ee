//! longconn - 长连接生命周期核心
//!
//! 管理与消息网关之间唯一的 WebSocket 长连接：重连协议、token 错误分类、
//! 出站帧封装（编码 → 长度校验 → 可选压缩 → 带超时写入）。

// 传输层
pub mod transport;

// 核心类型
pub mod codec;
pub mod compression;
pub mod config;
pub mod error;
pub mod listener;
pub mod message;
pub mod signal;
pub mod state;

// 连接管理
pub mod manager;

use std::sync::atomic::{AtomicU64, Ordering};

/// 请求ID：关联一次重连或操作在日志和信号中的所有记录
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(String);

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(0);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Unique within the process: wall-clock nanos plus a local sequence.
    pub fn generate() -> Self {
        let nanos = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default();
        let seq = REQUEST_SEQ.fetch_add(1, Ordering::Relaxed);
        Self(format!("{}{:04}", nanos, seq % 10_000))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// 重新导出核心类型
pub use codec::{Codec, CodecError, JsonCodec};
pub use compression::{CompressionMethod, Compressor};
pub use config::{ConfigError, ConnConfig, Credentials};
pub use error::{is_fatal_error, is_read_timeout, is_write_timeout, ConnError, TransportError};
pub use listener::{ConnListener, NoopListener, CONNECT_FAILED_RETRYABLE};
pub use manager::{ConnManager, ConnManagerBuilder};
pub use message::{WsRequest, WsResponse};
pub use signal::{command_channel, CommandReceiver, CommandSender, SyncFlag, SyncSignal};
pub use state::{LoginStatus, ReconnectOutcome, TokenErrorKind};
pub use transport::{DialError, Frame, FrameKind, HandshakeResponse, Transport};

#[cfg(feature = "websocket")]
pub use transport::{FrameReader, WebSocketTransport};

// 便捷的类型别名
pub type Result<T> = std::result::Result<T, ConnError>;

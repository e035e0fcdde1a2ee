//! 长连接配置
//!
//! 只负责描述与校验；从文件或环境变量加载由应用层完成

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::compression::CompressionMethod;

/// Largest encoded envelope accepted for a single outbound frame.
pub const MAX_TOTAL_MSG_LEN: usize = 51200;

/// Fixed write deadline armed before every data or ping frame.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for field '{field}': {value} - {reason}. Suggestion: {suggestion}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
        suggestion: String,
    },

    #[error("Missing required field: {field}. {suggestion}")]
    MissingField { field: String, suggestion: String },

    #[error("Invalid address: {address} - {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: url::ParseError,
    },
}

/// Per-session login credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub token: String,
    pub user_id: String,
    pub platform_id: i32,
}

impl Credentials {
    pub fn new(token: impl Into<String>, user_id: impl Into<String>, platform_id: i32) -> Self {
        Self {
            token: token.into(),
            user_id: user_id.into(),
            platform_id,
        }
    }
}

/// 连接管理器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnConfig {
    /// 服务器 WebSocket 地址
    pub ws_addr: String,
    /// 是否压缩出站帧
    pub compression: bool,
    pub compression_method: CompressionMethod,
    /// 单条消息编码后最大长度
    pub max_msg_len: usize,
    /// 写超时
    pub write_timeout: Duration,
    /// 握手超时
    pub dial_timeout: Duration,
    /// 读超时（None 表示不限）
    pub read_timeout: Option<Duration>,
}

impl Default for ConnConfig {
    fn default() -> Self {
        Self {
            ws_addr: "ws://localhost:10001/".to_string(),
            compression: false,
            compression_method: CompressionMethod::default(),
            max_msg_len: MAX_TOTAL_MSG_LEN,
            write_timeout: WRITE_TIMEOUT,
            dial_timeout: Duration::from_secs(10),
            read_timeout: None,
        }
    }
}

impl ConnConfig {
    pub fn new(ws_addr: impl Into<String>) -> Self {
        Self {
            ws_addr: ws_addr.into(),
            ..Default::default()
        }
    }

    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    pub fn with_compression_method(mut self, method: CompressionMethod) -> Self {
        self.compression_method = method;
        self
    }

    pub fn with_max_msg_len(mut self, max_msg_len: usize) -> Self {
        self.max_msg_len = max_msg_len;
        self
    }

    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// 校验配置并返回解析后的基础地址
    pub fn validate(&self) -> Result<Url, ConfigError> {
        if self.ws_addr.is_empty() {
            return Err(ConfigError::MissingField {
                field: "ws_addr".to_string(),
                suggestion: "set the gateway address, e.g. ws://host:10001/".to_string(),
            });
        }

        if !self.ws_addr.starts_with("ws://") && !self.ws_addr.starts_with("wss://") {
            return Err(ConfigError::InvalidValue {
                field: "ws_addr".to_string(),
                value: self.ws_addr.clone(),
                reason: "must start with 'ws://' or 'wss://'".to_string(),
                suggestion: "use a valid WebSocket URL".to_string(),
            });
        }

        let url = Url::parse(&self.ws_addr).map_err(|source| ConfigError::InvalidAddress {
            address: self.ws_addr.clone(),
            source,
        })?;

        if self.max_msg_len == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_msg_len".to_string(),
                value: "0".to_string(),
                reason: "must be > 0".to_string(),
                suggestion: "set a positive value".to_string(),
            });
        }

        for (field, value) in [
            ("write_timeout", self.write_timeout),
            ("dial_timeout", self.dial_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: format!("{:?}", value),
                    reason: "must be > 0".to_string(),
                    suggestion: "set a positive duration".to_string(),
                });
            }
        }

        if matches!(self.read_timeout, Some(timeout) if timeout.is_zero()) {
            return Err(ConfigError::InvalidValue {
                field: "read_timeout".to_string(),
                value: "0s".to_string(),
                reason: "must be > 0 when set".to_string(),
                suggestion: "leave unset to disable the read deadline".to_string(),
            });
        }

        Ok(url)
    }
}

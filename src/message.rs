//! 长连接消息信封
//!
//! Payload bytes in `data` are opaque here; only the envelope is framed by
//! the connection manager.

use serde::{Deserialize, Serialize};

/// 请求类型标识
pub mod req_identifier {
    pub const HEARTBEAT: i32 = 1001;
    pub const SEND_MSG: i32 = 1003;
    pub const PULL_MSG_BY_SEQ_LIST: i32 = 1005;
    pub const PUSH_MSG: i32 = 2001;
    pub const KICK_ONLINE_MSG: i32 = 2002;
    pub const LOGOUT_MSG: i32 = 2003;
}

/// 出站请求
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsRequest {
    pub req_identifier: i32,
    pub token: String,
    #[serde(rename = "sendID")]
    pub send_id: String,
    #[serde(rename = "operationID")]
    pub operation_id: String,
    pub msg_incr: String,
    pub data: Vec<u8>,
}

impl WsRequest {
    pub fn new(req_identifier: i32, data: impl Into<Vec<u8>>) -> Self {
        Self {
            req_identifier,
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    pub fn with_send_id(mut self, send_id: impl Into<String>) -> Self {
        self.send_id = send_id.into();
        self
    }

    pub fn with_operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = operation_id.into();
        self
    }

    pub fn with_msg_incr(mut self, msg_incr: impl Into<String>) -> Self {
        self.msg_incr = msg_incr.into();
        self
    }
}

/// 入站响应
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsResponse {
    pub req_identifier: i32,
    #[serde(default)]
    pub err_code: i32,
    #[serde(default)]
    pub err_msg: String,
    #[serde(default)]
    pub msg_incr: String,
    #[serde(rename = "operationID", default)]
    pub operation_id: String,
    #[serde(default)]
    pub data: Vec<u8>,
}

impl WsResponse {
    pub fn is_success(&self) -> bool {
        self.err_code == 0
    }
}

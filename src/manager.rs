//! 连接管理器
//!
//! Owns the transport and the login state behind one lock. Reconnect, send,
//! ping and close are mutually exclusive; inbound reads happen elsewhere.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use url::Url;

use crate::codec::{Codec, JsonCodec};
use crate::compression::Compressor;
use crate::config::{ConfigError, ConnConfig, Credentials};
use crate::error::{self, ConnError};
use crate::listener::{ConnListener, CONNECT_FAILED_RETRYABLE};
use crate::message::{WsRequest, WsResponse};
use crate::signal::{self, CommandSender};
use crate::state::{LoginStatus, ReconnectOutcome, TokenErrorKind};
use crate::transport::{DialError, FrameKind, Transport};
use crate::RequestId;

/// Payload of every keepalive ping frame.
pub const PING_PAYLOAD: &[u8] = b"try ping";

/// Handshake header announcing outbound compression.
pub const COMPRESSION_HEADER: &str = "compression";

/// Response header in which the gateway explains a refused handshake.
pub const WS_ERR_MSG_HEADER: &str = "ws_err_msg";

struct ConnState {
    transport: Box<dyn Transport>,
    login_status: LoginStatus,
    token_error: TokenErrorKind,
}

pub struct ConnManager {
    state: Mutex<ConnState>,
    listener: Arc<dyn ConnListener>,
    command_tx: Option<CommandSender>,
    codec: Box<dyn Codec>,
    compressor: Box<dyn Compressor>,
    config: ConnConfig,
    base_url: Url,
    credentials: Credentials,
}

impl ConnManager {
    pub fn builder(
        config: ConnConfig,
        credentials: Credentials,
        listener: Arc<dyn ConnListener>,
    ) -> ConnManagerBuilder {
        ConnManagerBuilder::new(config, credentials, listener)
    }

    pub fn config(&self) -> &ConnConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub async fn login_status(&self) -> LoginStatus {
        self.state.lock().await.login_status
    }

    pub async fn set_login_status(&self, status: LoginStatus) {
        self.state.lock().await.login_status = status;
    }

    pub async fn token_error_kind(&self) -> TokenErrorKind {
        self.state.lock().await.token_error
    }

    /// True when the last reconnect recorded a token error; the retry loop
    /// should stop even if it would otherwise try again.
    pub async fn is_interrupt_reconnection(&self) -> bool {
        !self.state.lock().await.token_error.is_none()
    }

    fn dial_target(&self, request_id: &RequestId) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("sendID", &self.credentials.user_id)
            .append_pair("token", &self.credentials.token)
            .append_pair("platformID", &self.credentials.platform_id.to_string())
            .append_pair("operationID", request_id.as_str());
        url
    }

    fn dial_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        if self.config.compression {
            headers.insert(
                COMPRESSION_HEADER.to_string(),
                self.compressor.encoding().to_string(),
            );
        }
        headers
    }

    /// Drop the current connection and dial a fresh one.
    ///
    /// The outcome tells the caller's retry loop whether to continue; this
    /// method never sleeps or retries by itself.
    pub async fn reconnect(&self, request_id: &RequestId) -> ReconnectOutcome {
        let mut state = self.state.lock().await;
        state.token_error = TokenErrorKind::None;

        if state.transport.is_connected() {
            if let Err(e) = state.transport.close().await {
                tracing::warn!(%request_id, "关闭旧连接失败: {}", e);
            }
        }

        if state.login_status == LoginStatus::KickedOffline {
            return ReconnectOutcome::Aborted {
                error: ConnError::KickedOffline,
            };
        }

        self.listener.on_connecting();
        state.login_status = LoginStatus::Connecting;

        let url = self.dial_target(request_id);
        tracing::debug!(%request_id, addr = %self.base_url, "ws connect begin");

        let dial_err = match state.transport.dial(url.as_str(), &self.dial_headers()).await {
            Ok(()) => {
                self.listener.on_connect_success();
                state.login_status = LoginStatus::Connected;
                tracing::info!(%request_id, user_id = %self.credentials.user_id, "✅ 长连接建立成功");
                return ReconnectOutcome::Reconnected;
            }
            Err(e) => e,
        };

        state.login_status = LoginStatus::LoginFailed;
        let DialError { response, source } = dial_err;

        let Some(response) = response else {
            let message = format!("{} operationID {}", source, request_id);
            tracing::warn!(%request_id, "ws connect failed without response: {}", source);
            self.listener.on_connect_failed(CONNECT_FAILED_RETRYABLE, &message);
            if let Some(tx) = &self.command_tx {
                signal::trigger_sync_failed(tx, request_id);
            }
            return ReconnectOutcome::Transient {
                error: ConnError::Dial {
                    status: None,
                    message,
                    source,
                },
            };
        };

        let status = response.status;
        let message = format!(
            "{} operationID {} {}",
            response.header(WS_ERR_MSG_HEADER).unwrap_or_default(),
            request_id,
            source
        );
        tracing::warn!(%request_id, status, "ws connect rejected: {}", message);
        self.listener.on_connect_failed(i32::from(status), &message);

        let kind = TokenErrorKind::from_status(status);
        match kind {
            TokenErrorKind::None => {
                let message = format!("{} operationID {}", source, request_id);
                self.listener.on_connect_failed(CONNECT_FAILED_RETRYABLE, &message);
                ReconnectOutcome::Transient {
                    error: ConnError::Dial {
                        status: Some(status),
                        message,
                        source,
                    },
                }
            }
            TokenErrorKind::Kicked => {
                state.token_error = kind;
                ReconnectOutcome::Kicked {
                    error: ConnError::Dial {
                        status: Some(status),
                        message,
                        source,
                    },
                }
            }
            _ => {
                if kind == TokenErrorKind::Expired {
                    self.listener.on_user_token_expired();
                }
                state.token_error = kind;
                ReconnectOutcome::AuthFailed {
                    kind,
                    error: ConnError::Dial {
                        status: Some(status),
                        message,
                        source,
                    },
                }
            }
        }
    }

    /// Encode, size-check, optionally compress and write one binary frame.
    pub async fn send(&self, request: &WsRequest) -> Result<(), ConnError> {
        let data = self.codec.encode(request).map_err(ConnError::Encode)?;

        let mut state = self.state.lock().await;
        if !state.transport.is_connected() {
            return Err(ConnError::NotConnected { operation: "send" });
        }

        state
            .transport
            .set_write_deadline(self.config.write_timeout)
            .map_err(|e| ConnError::transport("set write deadline", e))?;

        tracing::debug!("this msg length is: {:.2} kb", data.len() as f32 / 1024.0);
        if data.len() > self.config.max_msg_len {
            return Err(ConnError::Oversized {
                len: data.len(),
                limit: self.config.max_msg_len,
            });
        }

        let payload = if self.config.compression {
            self.compressor.compress(&data).map_err(ConnError::Compress)?
        } else {
            data
        };

        state
            .transport
            .write_frame(FrameKind::Binary, payload)
            .await
            .map_err(|e| ConnError::transport("write frame", e))
    }

    /// Decode one inbound frame. Decompression, if negotiated, is the
    /// reader's job before calling this.
    pub fn decode(&self, data: &[u8]) -> Result<WsResponse, ConnError> {
        self.codec.decode(data).map_err(ConnError::Decode)
    }

    pub async fn send_ping(&self) -> Result<(), ConnError> {
        let mut state = self.state.lock().await;
        if !state.transport.is_connected() {
            return Err(ConnError::NotConnected { operation: "ping" });
        }

        state
            .transport
            .set_write_deadline(self.config.write_timeout)
            .map_err(|e| ConnError::transport("set write deadline", e))?;
        state
            .transport
            .write_frame(FrameKind::Ping, PING_PAYLOAD.to_vec())
            .await
            .map_err(|e| ConnError::transport("write ping", e))
    }

    /// Close the current connection. Login status is left untouched.
    pub async fn close(&self) -> Result<(), ConnError> {
        let mut state = self.state.lock().await;
        if !state.transport.is_connected() {
            return Ok(());
        }
        state
            .transport
            .close()
            .await
            .map_err(|e| ConnError::transport("close", e))
    }

    pub fn is_read_timeout<E: fmt::Display + ?Sized>(err: &E) -> bool {
        error::is_read_timeout(err)
    }

    pub fn is_write_timeout<E: fmt::Display + ?Sized>(err: &E) -> bool {
        error::is_write_timeout(err)
    }

    pub fn is_fatal_error<E: fmt::Display + ?Sized>(err: &E) -> bool {
        error::is_fatal_error(err)
    }
}

impl fmt::Debug for ConnManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnManager")
            .field("ws_addr", &self.config.ws_addr)
            .field("user_id", &self.credentials.user_id)
            .field("compression", &self.config.compression)
            .finish()
    }
}

/// 连接管理器构建器
pub struct ConnManagerBuilder {
    config: ConnConfig,
    credentials: Credentials,
    listener: Arc<dyn ConnListener>,
    transport: Option<Box<dyn Transport>>,
    command_tx: Option<CommandSender>,
    codec: Option<Box<dyn Codec>>,
    compressor: Option<Box<dyn Compressor>>,
}

impl ConnManagerBuilder {
    pub fn new(config: ConnConfig, credentials: Credentials, listener: Arc<dyn ConnListener>) -> Self {
        Self {
            config,
            credentials,
            listener,
            transport: None,
            command_tx: None,
            codec: None,
            compressor: None,
        }
    }

    /// Defaults to a WebSocket transport built from the config.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    pub fn command_channel(mut self, tx: CommandSender) -> Self {
        self.command_tx = Some(tx);
        self
    }

    pub fn codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codec = Some(Box::new(codec));
        self
    }

    /// Overrides `config.compression_method`.
    pub fn compressor(mut self, compressor: impl Compressor + 'static) -> Self {
        self.compressor = Some(Box::new(compressor));
        self
    }

    pub fn build(self) -> Result<ConnManager, ConfigError> {
        let base_url = self.config.validate()?;

        let transport = match self.transport {
            Some(transport) => transport,
            #[cfg(feature = "websocket")]
            None => Box::new(crate::transport::WebSocketTransport::from_config(&self.config)),
            #[cfg(not(feature = "websocket"))]
            None => {
                return Err(ConfigError::MissingField {
                    field: "transport".to_string(),
                    suggestion: "enable the `websocket` feature or supply a transport".to_string(),
                })
            }
        };

        Ok(ConnManager {
            state: Mutex::new(ConnState {
                transport,
                login_status: LoginStatus::Disconnected,
                token_error: TokenErrorKind::None,
            }),
            listener: self.listener,
            command_tx: self.command_tx,
            codec: self.codec.unwrap_or_else(|| Box::new(JsonCodec)),
            compressor: self
                .compressor
                .unwrap_or_else(|| Box::new(self.config.compression_method)),
            config: self.config,
            base_url,
            credentials: self.credentials,
        })
    }

    /// Build and make the first connection attempt. The attempt's outcome is
    /// only logged; the caller's retry loop takes over from here.
    pub async fn connect(self) -> Result<ConnManager, ConfigError> {
        let manager = self.build()?;
        let request_id = RequestId::generate();
        let outcome = manager.reconnect(&request_id).await;
        if let Some(e) = outcome.error() {
            tracing::warn!(%request_id, "initial connect failed: {}", e);
        }
        Ok(manager)
    }
}

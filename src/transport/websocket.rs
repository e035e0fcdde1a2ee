use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::{DialError, Frame, FrameKind, HandshakeResponse, Transport};
use crate::config::ConnConfig;
use crate::error::TransportError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type StreamSlot = Arc<tokio::sync::Mutex<SplitStream<WsStream>>>;

/// WebSocket 传输实现
///
/// The write half stays here, behind the connection manager's lock. The read
/// half is published through [`FrameReader`] so a reader task can block on it
/// without holding that lock.
pub struct WebSocketTransport {
    sink: Option<SplitSink<WsStream, Message>>,
    reader: FrameReader,
    write_timeout: Option<Duration>,
    dial_timeout: Duration,
}

impl WebSocketTransport {
    pub fn new(dial_timeout: Duration) -> Self {
        Self {
            sink: None,
            reader: FrameReader::default(),
            write_timeout: None,
            dial_timeout,
        }
    }

    pub fn from_config(config: &ConnConfig) -> Self {
        let transport = Self::new(config.dial_timeout);
        *transport.reader.read_timeout.lock() = config.read_timeout;
        transport
    }

    /// Handle onto whatever connection is current; survives re-dials.
    pub fn frame_reader(&self) -> FrameReader {
        self.reader.clone()
    }

    fn build_request(
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<tungstenite::handshake::client::Request, TransportError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| TransportError::protocol_error(format!("Invalid dial target: {}", e)))?;

        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::protocol_error(format!("Invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::protocol_error(format!("Invalid header value: {}", e)))?;
            request.headers_mut().insert(name, value);
        }

        Ok(request)
    }
}

fn map_ws_error(error: tungstenite::Error) -> TransportError {
    match error {
        tungstenite::Error::Io(io_err) => TransportError::Io(io_err),
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            TransportError::connection_error("connection closed")
        }
        other => TransportError::protocol_error(other.to_string()),
    }
}

fn to_message(kind: FrameKind, payload: Vec<u8>) -> Result<Message, TransportError> {
    Ok(match kind {
        FrameKind::Binary => Message::Binary(payload),
        FrameKind::Ping => Message::Ping(payload),
        FrameKind::Pong => Message::Pong(payload),
        FrameKind::Close => Message::Close(None),
        FrameKind::Text => Message::Text(
            String::from_utf8(payload)
                .map_err(|e| TransportError::protocol_error(format!("Text frame is not UTF-8: {}", e)))?,
        ),
    })
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn dial(&mut self, url: &str, headers: &HashMap<String, String>) -> Result<(), DialError> {
        let request = Self::build_request(url, headers).map_err(DialError::unreachable)?;

        let connect = tokio_tungstenite::connect_async(request);
        let ws_stream = match tokio::time::timeout(self.dial_timeout, connect).await {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(tungstenite::Error::Http(response))) => {
                let status = response.status().as_u16();
                let mut handshake = HandshakeResponse::new(status);
                for (name, value) in response.headers() {
                    if let Ok(value) = value.to_str() {
                        handshake = handshake.with_header(name.as_str(), value);
                    }
                }
                tracing::warn!("WebSocket 握手被拒绝: HTTP {}", status);
                return Err(DialError::rejected(
                    handshake,
                    TransportError::protocol_error(format!("HTTP error: {}", status)),
                ));
            }
            Ok(Err(e)) => return Err(DialError::unreachable(map_ws_error(e))),
            Err(_) => {
                return Err(DialError::unreachable(TransportError::timeout_error(
                    "dial",
                    self.dial_timeout,
                )))
            }
        };

        let (sink, stream) = ws_stream.split();
        self.sink = Some(sink);
        self.reader.replace(Some(Arc::new(tokio::sync::Mutex::new(stream))));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.reader.replace(None);
        match self.sink.take() {
            Some(mut sink) => sink.close().await.map_err(map_ws_error),
            None => Ok(()),
        }
    }

    async fn write_frame(&mut self, kind: FrameKind, payload: Vec<u8>) -> Result<(), TransportError> {
        let sink = self.sink.as_mut().ok_or(TransportError::NotConnected)?;
        let message = to_message(kind, payload)?;

        match self.write_timeout {
            Some(timeout) => tokio::time::timeout(timeout, sink.send(message))
                .await
                .map_err(|_| TransportError::timeout_error("write frame", timeout))?
                .map_err(map_ws_error),
            None => sink.send(message).await.map_err(map_ws_error),
        }
    }

    fn set_write_deadline(&mut self, timeout: Duration) -> Result<(), TransportError> {
        self.write_timeout = Some(timeout);
        Ok(())
    }

    fn set_read_deadline(&mut self, timeout: Duration) -> Result<(), TransportError> {
        *self.reader.read_timeout.lock() = Some(timeout);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.sink.is_some()
    }
}

/// 读端句柄
///
/// Cloneable; every clone follows the transport across reconnects.
#[derive(Clone, Default)]
pub struct FrameReader {
    current: Arc<parking_lot::Mutex<Option<StreamSlot>>>,
    read_timeout: Arc<parking_lot::Mutex<Option<Duration>>>,
}

impl FrameReader {
    fn replace(&self, slot: Option<StreamSlot>) {
        *self.current.lock() = slot;
    }

    /// Next data-bearing frame; `Ok(None)` once the peer closed the stream.
    pub async fn next_frame(&self) -> Result<Option<Frame>, TransportError> {
        let slot = self
            .current
            .lock()
            .clone()
            .ok_or(TransportError::NotConnected)?;
        let read_timeout = *self.read_timeout.lock();

        let mut stream = slot.lock().await;
        let next = match read_timeout {
            Some(timeout) => tokio::time::timeout(timeout, stream.next())
                .await
                .map_err(|_| TransportError::timeout_error("read frame", timeout))?,
            None => stream.next().await,
        };

        match next {
            Some(Ok(Message::Binary(data))) => Ok(Some(Frame::new(FrameKind::Binary, data))),
            Some(Ok(Message::Text(text))) => Ok(Some(Frame::new(FrameKind::Text, text.into_bytes()))),
            Some(Ok(Message::Ping(data))) => Ok(Some(Frame::new(FrameKind::Ping, data))),
            Some(Ok(Message::Pong(data))) => Ok(Some(Frame::new(FrameKind::Pong, data))),
            Some(Ok(Message::Close(_))) | None => Ok(None),
            Some(Ok(Message::Frame(_))) => Err(TransportError::protocol_error("unexpected raw frame")),
            Some(Err(e)) => Err(map_ws_error(e)),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.current.lock().is_some()
    }
}

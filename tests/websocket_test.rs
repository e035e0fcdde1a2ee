//! WebSocket 传输端到端测试
//!
//! Runs a loopback gateway with tokio-tungstenite and drives the manager
//! through the real `WebSocketTransport`.

mod common;

use common::{init_tracing, ListenerEvent, RecordingListener};
use futures::{SinkExt, StreamExt};
use longconn::message::req_identifier;
use longconn::state::status_code;
use longconn::{
    command_channel, Codec, CompressionMethod, Compressor, ConnConfig, ConnManager, Credentials,
    FrameKind, FrameReader, JsonCodec, ReconnectOutcome, RequestId, SyncFlag, TokenErrorKind,
    WebSocketTransport, WsRequest, WsResponse,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

struct Handshake {
    uri: String,
    compression: Option<String>,
}

/// Accepts one client, pushes `greeting` and forwards everything it reads.
async fn spawn_gateway(
    greeting: Vec<u8>,
) -> (SocketAddr, oneshot::Receiver<Handshake>, mpsc::UnboundedReceiver<Message>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (handshake_tx, handshake_rx) = oneshot::channel();
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            let _ = handshake_tx.send(Handshake {
                uri: req.uri().to_string(),
                compression: req
                    .headers()
                    .get("compression")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string),
            });
            Ok(resp)
        };
        let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback).await.unwrap();
        ws.send(Message::Binary(greeting)).await.unwrap();
        while let Some(Ok(message)) = ws.next().await {
            if frames_tx.send(message).is_err() {
                break;
            }
        }
    });

    (addr, handshake_rx, frames_rx)
}

/// Refuses every upgrade with `status` and a `ws_err_msg` header.
async fn spawn_rejecting_gateway(status: u16, reason: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let callback = move |_req: &Request, _resp: Response| -> Result<Response, ErrorResponse> {
            let mut error = ErrorResponse::new(None);
            *error.status_mut() = StatusCode::from_u16(status).unwrap();
            error
                .headers_mut()
                .insert("ws_err_msg", HeaderValue::from_static(reason));
            Err(error)
        };
        let _ = tokio_tungstenite::accept_hdr_async(stream, callback).await;
    });

    addr
}

fn manager_for(
    addr: SocketAddr,
    compression: bool,
    listener: Arc<RecordingListener>,
) -> (ConnManager, FrameReader) {
    let config = ConnConfig::new(format!("ws://{}/", addr))
        .with_compression(compression)
        .with_dial_timeout(WAIT);
    let transport = WebSocketTransport::from_config(&config);
    let reader = transport.frame_reader();
    let manager = ConnManager::builder(config, Credentials::new("tk", "user-1", 3), listener)
        .transport(transport)
        .build()
        .unwrap();
    (manager, reader)
}

#[tokio::test]
async fn test_connect_send_ping_and_read() {
    init_tracing();
    let push = WsResponse {
        req_identifier: req_identifier::PUSH_MSG,
        operation_id: "op-push".to_string(),
        data: vec![1, 2, 3],
        ..Default::default()
    };
    let (addr, handshake_rx, mut frames_rx) = spawn_gateway(serde_json::to_vec(&push).unwrap()).await;
    let listener = RecordingListener::new();
    let (manager, reader) = manager_for(addr, true, listener.clone());

    let outcome = manager.reconnect(&RequestId::from("op-ws")).await;
    assert!(matches!(outcome, ReconnectOutcome::Reconnected), "{:?}", outcome);
    assert_eq!(listener.events(), vec![ListenerEvent::Connecting, ListenerEvent::ConnectSuccess]);

    let handshake = tokio::time::timeout(WAIT, handshake_rx).await.unwrap().unwrap();
    assert!(handshake.uri.contains("sendID=user-1"));
    assert!(handshake.uri.contains("token=tk"));
    assert!(handshake.uri.contains("platformID=3"));
    assert!(handshake.uri.contains("operationID=op-ws"));
    assert_eq!(handshake.compression.as_deref(), Some("gzip"));

    // inbound push through the reader handle
    let frame = tokio::time::timeout(WAIT, reader.next_frame())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(frame.kind, FrameKind::Binary);
    assert_eq!(manager.decode(&frame.payload).unwrap(), push);

    // outbound data frame is gzip(encode(request))
    let request = WsRequest::new(req_identifier::SEND_MSG, b"hello".to_vec()).with_send_id("user-1");
    manager.send(&request).await.unwrap();
    let received = tokio::time::timeout(WAIT, frames_rx.recv()).await.unwrap().unwrap();
    let expected = CompressionMethod::Gzip
        .compress(&JsonCodec.encode(&request).unwrap())
        .unwrap();
    assert_eq!(received, Message::Binary(expected));

    manager.send_ping().await.unwrap();
    let received = tokio::time::timeout(WAIT, frames_rx.recv()).await.unwrap().unwrap();
    assert_eq!(received, Message::Ping(b"try ping".to_vec()));

    manager.close().await.unwrap();
    assert!(!reader.is_attached());
}

#[tokio::test]
async fn test_rejected_handshake_is_classified() {
    init_tracing();
    let addr = spawn_rejecting_gateway(status_code::TOKEN_EXPIRED, "token expired").await;
    let listener = RecordingListener::new();
    let (manager, _reader) = manager_for(addr, false, listener.clone());

    let outcome = manager.reconnect(&RequestId::from("op-exp")).await;

    match &outcome {
        ReconnectOutcome::AuthFailed { kind, error } => {
            assert_eq!(*kind, TokenErrorKind::Expired);
            assert_eq!(error.status(), Some(status_code::TOKEN_EXPIRED));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(listener.count(|e| matches!(e, ListenerEvent::TokenExpired)), 1);
    let message = listener
        .events()
        .into_iter()
        .find_map(|e| match e {
            ListenerEvent::ConnectFailed(701, message) => Some(message),
            _ => None,
        })
        .unwrap();
    assert!(message.starts_with("token expired operationID op-exp"));
}

#[tokio::test]
async fn test_unreachable_gateway_signals_sync_failure() {
    init_tracing();
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let config = ConnConfig::new(format!("ws://{}/", addr)).with_dial_timeout(WAIT);
    let (tx, mut rx) = command_channel(4);
    let listener = RecordingListener::new();
    let manager = ConnManager::builder(config, Credentials::new("tk", "user-1", 3), listener.clone())
        .command_channel(tx)
        .build()
        .unwrap();

    let outcome = manager.reconnect(&RequestId::from("op-down")).await;

    assert!(matches!(outcome, ReconnectOutcome::Transient { .. }));
    assert!(outcome.should_retry());
    assert_eq!(listener.failure_codes(), vec![1001]);
    assert_eq!(rx.recv().await.unwrap().flag, SyncFlag::SyncBegin);
    assert_eq!(rx.recv().await.unwrap().flag, SyncFlag::SyncFailed);
}

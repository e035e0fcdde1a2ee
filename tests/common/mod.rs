//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use longconn::{
    ConnListener, DialError, FrameKind, HandshakeResponse, Transport, TransportError,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// How the next dial should end.
#[derive(Debug, Clone)]
pub enum DialScript {
    Accept,
    Reject { status: u16, err_msg: String },
    Unreachable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOp {
    Dial {
        url: String,
        headers: HashMap<String, String>,
    },
    Close,
    WriteDeadline(Duration),
    Write(FrameKind, Vec<u8>),
}

#[derive(Default)]
struct Shared {
    ops: Vec<TransportOp>,
    script: VecDeque<DialScript>,
    fail_close: bool,
    fail_write: Option<TransportError>,
}

/// Scripted transport; the [`MockHandle`] stays with the test after the
/// transport is moved into the manager.
pub struct MockTransport {
    shared: Arc<Mutex<Shared>>,
    connected: bool,
}

#[derive(Clone)]
pub struct MockHandle {
    shared: Arc<Mutex<Shared>>,
}

impl MockTransport {
    pub fn new() -> (Self, MockHandle) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        (
            Self {
                shared: shared.clone(),
                connected: false,
            },
            MockHandle { shared },
        )
    }
}

impl MockHandle {
    pub fn push_dial(&self, script: DialScript) {
        self.shared.lock().script.push_back(script);
    }

    pub fn reject_next(&self, status: u16, err_msg: &str) {
        self.push_dial(DialScript::Reject {
            status,
            err_msg: err_msg.to_string(),
        });
    }

    pub fn unreachable_next(&self, reason: &str) {
        self.push_dial(DialScript::Unreachable(reason.to_string()));
    }

    pub fn fail_close(&self, fail: bool) {
        self.shared.lock().fail_close = fail;
    }

    pub fn fail_next_write(&self, error: TransportError) {
        self.shared.lock().fail_write = Some(error);
    }

    pub fn ops(&self) -> Vec<TransportOp> {
        self.shared.lock().ops.clone()
    }

    pub fn dials(&self) -> Vec<(String, HashMap<String, String>)> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                TransportOp::Dial { url, headers } => Some((url, headers)),
                _ => None,
            })
            .collect()
    }

    pub fn writes(&self) -> Vec<(FrameKind, Vec<u8>)> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                TransportOp::Write(kind, payload) => Some((kind, payload)),
                _ => None,
            })
            .collect()
    }

    pub fn closes(&self) -> usize {
        self.ops()
            .iter()
            .filter(|op| matches!(op, TransportOp::Close))
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn dial(&mut self, url: &str, headers: &HashMap<String, String>) -> Result<(), DialError> {
        let script = {
            let mut shared = self.shared.lock();
            shared.ops.push(TransportOp::Dial {
                url: url.to_string(),
                headers: headers.clone(),
            });
            shared.script.pop_front().unwrap_or(DialScript::Accept)
        };

        match script {
            DialScript::Accept => {
                self.connected = true;
                Ok(())
            }
            DialScript::Reject { status, err_msg } => Err(DialError::rejected(
                HandshakeResponse::new(status).with_header("ws_err_msg", err_msg),
                TransportError::protocol_error(format!("HTTP error: {}", status)),
            )),
            DialScript::Unreachable(reason) => {
                Err(DialError::unreachable(TransportError::connection_error(reason)))
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let mut shared = self.shared.lock();
        shared.ops.push(TransportOp::Close);
        self.connected = false;
        if shared.fail_close {
            return Err(TransportError::connection_error("use of closed network connection"));
        }
        Ok(())
    }

    async fn write_frame(&mut self, kind: FrameKind, payload: Vec<u8>) -> Result<(), TransportError> {
        let mut shared = self.shared.lock();
        if let Some(error) = shared.fail_write.take() {
            return Err(error);
        }
        shared.ops.push(TransportOp::Write(kind, payload));
        Ok(())
    }

    fn set_write_deadline(&mut self, timeout: Duration) -> Result<(), TransportError> {
        self.shared.lock().ops.push(TransportOp::WriteDeadline(timeout));
        Ok(())
    }

    fn set_read_deadline(&mut self, _timeout: Duration) -> Result<(), TransportError> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerEvent {
    Connecting,
    ConnectSuccess,
    ConnectFailed(i32, String),
    TokenExpired,
}

#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ListenerEvent>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ListenerEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, wanted: fn(&ListenerEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| wanted(e)).count()
    }

    pub fn failure_codes(&self) -> Vec<i32> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ListenerEvent::ConnectFailed(code, _) => Some(*code),
                _ => None,
            })
            .collect()
    }
}

impl ConnListener for RecordingListener {
    fn on_connecting(&self) {
        self.events.lock().push(ListenerEvent::Connecting);
    }

    fn on_connect_success(&self) {
        self.events.lock().push(ListenerEvent::ConnectSuccess);
    }

    fn on_connect_failed(&self, code: i32, message: &str) {
        self.events
            .lock()
            .push(ListenerEvent::ConnectFailed(code, message.to_string()));
    }

    fn on_user_token_expired(&self) {
        self.events.lock().push(ListenerEvent::TokenExpired);
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::RequestId;

/// 同步状态标记
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncFlag {
    SyncBegin,
    SyncFailed,
}

/// Signal pushed to the message-sync pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSignal {
    pub messages: Vec<Bytes>,
    pub request_id: RequestId,
    pub flag: SyncFlag,
}

impl SyncSignal {
    /// Signal without messages, the only kind the connection manager emits.
    pub fn empty(request_id: RequestId, flag: SyncFlag) -> Self {
        Self {
            messages: Vec::new(),
            request_id,
            flag,
        }
    }
}

pub type CommandSender = mpsc::Sender<SyncSignal>;
pub type CommandReceiver = mpsc::Receiver<SyncSignal>;

/// Bounded command channel for sync signals.
pub fn command_channel(capacity: usize) -> (CommandSender, CommandReceiver) {
    mpsc::channel(capacity)
}

/// Push `SyncBegin` then `SyncFailed` for a connection attempt that never
/// reached the server. Never waits on the consumer: a full or closed
/// channel is logged and the remaining signals are dropped.
pub(crate) fn trigger_sync_failed(tx: &CommandSender, request_id: &RequestId) {
    for flag in [SyncFlag::SyncBegin, SyncFlag::SyncFailed] {
        match tx.try_send(SyncSignal::empty(request_id.clone(), flag)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(%request_id, ?flag, "命令通道已满，丢弃同步信号");
                return;
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(%request_id, ?flag, "命令通道已关闭");
                return;
            }
        }
    }
}

/// Code reported through [`ConnListener::on_connect_failed`] for failures the
/// caller should keep retrying.
pub const CONNECT_FAILED_RETRYABLE: i32 = 1001;

/// 连接生命周期回调
///
/// Called while the connection manager holds its state lock, so
/// implementations must not call back into the manager.
pub trait ConnListener: Send + Sync {
    fn on_connecting(&self);

    fn on_connect_success(&self);

    fn on_connect_failed(&self, code: i32, message: &str);

    fn on_user_token_expired(&self);
}

/// Listener that drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl ConnListener for NoopListener {
    fn on_connecting(&self) {}

    fn on_connect_success(&self) {}

    fn on_connect_failed(&self, _code: i32, _message: &str) {}

    fn on_user_token_expired(&self) {}
}

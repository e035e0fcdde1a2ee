//! Connection state types
//!
//! Login status, token failure taxonomy and the per-attempt reconnect outcome.

use crate::error::ConnError;

/// Server status codes returned on a refused handshake.
pub mod status_code {
    pub const TOKEN_EXPIRED: u16 = 701;
    pub const TOKEN_INVALID: u16 = 702;
    pub const TOKEN_MALFORMED: u16 = 703;
    pub const TOKEN_NOT_VALID_YET: u16 = 704;
    pub const TOKEN_UNKNOWN: u16 = 705;
    pub const TOKEN_KICKED: u16 = 706;
    pub const TOKEN_DIFFERENT_PLATFORM_ID: u16 = 707;
    pub const TOKEN_DIFFERENT_USER_ID: u16 = 708;
}

/// Login status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    LoginFailed,
    /// Terminal until reset with `ConnManager::set_login_status`.
    KickedOffline,
}

/// Why the server refused the login token on the last attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenErrorKind {
    #[default]
    None,
    Expired,
    Invalid,
    Malformed,
    NotYetValid,
    Unknown,
    DifferentPlatform,
    DifferentUser,
    Kicked,
}

impl TokenErrorKind {
    /// Classify a handshake status code; unrecognized codes map to `None`.
    pub fn from_status(status: u16) -> Self {
        match status {
            status_code::TOKEN_EXPIRED => TokenErrorKind::Expired,
            status_code::TOKEN_INVALID => TokenErrorKind::Invalid,
            status_code::TOKEN_MALFORMED => TokenErrorKind::Malformed,
            status_code::TOKEN_NOT_VALID_YET => TokenErrorKind::NotYetValid,
            status_code::TOKEN_UNKNOWN => TokenErrorKind::Unknown,
            status_code::TOKEN_DIFFERENT_PLATFORM_ID => TokenErrorKind::DifferentPlatform,
            status_code::TOKEN_DIFFERENT_USER_ID => TokenErrorKind::DifferentUser,
            status_code::TOKEN_KICKED => TokenErrorKind::Kicked,
            _ => TokenErrorKind::None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        Some(match self {
            TokenErrorKind::None => return None,
            TokenErrorKind::Expired => status_code::TOKEN_EXPIRED,
            TokenErrorKind::Invalid => status_code::TOKEN_INVALID,
            TokenErrorKind::Malformed => status_code::TOKEN_MALFORMED,
            TokenErrorKind::NotYetValid => status_code::TOKEN_NOT_VALID_YET,
            TokenErrorKind::Unknown => status_code::TOKEN_UNKNOWN,
            TokenErrorKind::DifferentPlatform => status_code::TOKEN_DIFFERENT_PLATFORM_ID,
            TokenErrorKind::DifferentUser => status_code::TOKEN_DIFFERENT_USER_ID,
            TokenErrorKind::Kicked => status_code::TOKEN_KICKED,
        })
    }

    pub fn is_none(&self) -> bool {
        matches!(self, TokenErrorKind::None)
    }
}

/// Result of one reconnection attempt.
///
/// `Kicked` is the only variant where [`was_kicked`](Self::was_kicked) holds,
/// and it never asks for a retry.
#[derive(Debug)]
pub enum ReconnectOutcome {
    Reconnected,
    /// Token rejected; re-authenticate before dialing again.
    /// `kind` is one of the seven non-kick token errors.
    AuthFailed { kind: TokenErrorKind, error: ConnError },
    /// Another session invalidated this one.
    Kicked { error: ConnError },
    /// Server unreachable or answered with an unrecognized status.
    Transient { error: ConnError },
    /// Local state is `KickedOffline`; nothing was dialed.
    Aborted { error: ConnError },
}

impl ReconnectOutcome {
    pub fn should_retry(&self) -> bool {
        matches!(self, ReconnectOutcome::Reconnected | ReconnectOutcome::Transient { .. })
    }

    pub fn was_kicked(&self) -> bool {
        matches!(self, ReconnectOutcome::Kicked { .. })
    }

    pub fn error(&self) -> Option<&ConnError> {
        match self {
            ReconnectOutcome::Reconnected => None,
            ReconnectOutcome::AuthFailed { error, .. }
            | ReconnectOutcome::Kicked { error }
            | ReconnectOutcome::Transient { error }
            | ReconnectOutcome::Aborted { error } => Some(error),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ReconnectOutcome::Reconnected)
    }

    /// `(should_retry, was_kicked, error)` as a tuple.
    pub fn into_parts(self) -> (bool, bool, Option<ConnError>) {
        let should_retry = self.should_retry();
        let was_kicked = self.was_kicked();
        let error = match self {
            ReconnectOutcome::Reconnected => None,
            ReconnectOutcome::AuthFailed { error, .. }
            | ReconnectOutcome::Kicked { error }
            | ReconnectOutcome::Transient { error }
            | ReconnectOutcome::Aborted { error } => Some(error),
        };
        (should_retry, was_kicked, error)
    }
}

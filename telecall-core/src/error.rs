use crate::model::TrackKind;
use thiserror::Error;

/// Local capture failures. Never auto-retried; a new acquisition attempt
/// requires an explicit session restart.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("{kind} capture permission denied")]
    PermissionDenied { kind: TrackKind },

    #[error("no {kind} capture device present")]
    NotFound { kind: TrackKind },

    #[error("{kind} device is exclusively held by another process")]
    Busy { kind: TrackKind },

    /// Second acquire before the prior release. Hardware handles are never
    /// silently shared.
    #[error("local media already acquired")]
    AlreadyAcquired,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignalingError {
    #[error("signaling endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("signaling handshake rejected: {0}")]
    Rejected(String),

    /// Send attempted while the channel is down. The message is dropped, not
    /// queued: stale SDP must never replay after a reconnect.
    #[error("signaling channel is not connected")]
    NotConnected,

    #[error("malformed signaling message: {0}")]
    Malformed(String),

    #[error("signaling transport closed")]
    TransportClosed,
}

/// Out-of-order or malformed SDP/ICE operations. Always surfaced: a dropped
/// negotiation step leaves the call unrecoverable without a full restart.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NegotiationError {
    #[error("peer connection not initialized")]
    NotInitialized,

    #[error("peer connection already initialized")]
    AlreadyInitialized,

    #[error("invalid session description: {0}")]
    InvalidSdp(String),

    #[error("invalid ice candidate: {0}")]
    InvalidCandidate(String),

    #[error("media transport error: {0}")]
    Transport(String),
}

/// Session-level union stored as `last_error` on the call snapshot. The UI
/// only ever sees this plus the terminal state; the variant is preserved for
/// diagnostics.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Signaling(#[from] SignalingError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error("media connection failed and did not recover")]
    ConnectionFailure,
}

impl CallError {
    pub fn is_device(&self) -> bool {
        matches!(self, CallError::Device(_))
    }
}

use std::fmt;

/// The single externally visible call lifecycle, distinct from the
/// transport-level `ConnectionState`: a session can be `Initializing` while
/// the peer connection is still `new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing acquired yet.
    Idle,
    /// Signaling connect and local media acquisition in flight.
    Initializing,
    /// Joined the room with local media ready; peer not yet present.
    WaitingForPeer,
    /// Offer/answer/ICE exchange in progress.
    Negotiating,
    /// Remote media flowing and the transport connected; timer running.
    Active,
    /// Transient impairment of an established call. Not terminal; the timer
    /// keeps running.
    Degraded,
    /// Terminal: local or remote hang-up, or an established call that
    /// failed without recovery.
    Ended,
    /// Terminal: initialization could not complete before any peer was
    /// reached.
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Ended | SessionState::Failed)
    }

    /// The call timer counts seconds strictly inside this window.
    pub fn timer_runs(self) -> bool {
        matches!(self, SessionState::Active | SessionState::Degraded)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Initializing => "initializing",
            SessionState::WaitingForPeer => "waiting-for-peer",
            SessionState::Negotiating => "negotiating",
            SessionState::Active => "active",
            SessionState::Degraded => "degraded",
            SessionState::Ended => "ended",
            SessionState::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

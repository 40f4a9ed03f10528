use crate::session::state::SessionState;
use std::time::Instant;
use telecall_core::{CallError, Participant, RoomId, UserId};

/// Observable snapshot of one call session, published on every change. The
/// streams themselves travel via session events; everything else the UI
/// renders lives here.
#[derive(Debug, Clone)]
pub struct CallSession {
    pub room_id: RoomId,
    pub self_user_id: UserId,
    pub state: SessionState,
    pub peer: Option<Participant>,
    pub is_muted: bool,
    pub is_video_off: bool,
    /// Set on first entry to `Active`; survives `Degraded` dips.
    pub started_at: Option<Instant>,
    pub duration_seconds: u64,
    pub last_error: Option<CallError>,
}

impl CallSession {
    pub fn new(room_id: RoomId, self_user_id: UserId) -> Self {
        Self {
            room_id,
            self_user_id,
            state: SessionState::Idle,
            peer: None,
            is_muted: false,
            is_video_off: false,
            started_at: None,
            duration_seconds: 0,
            last_error: None,
        }
    }
}

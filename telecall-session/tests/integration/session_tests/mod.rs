mod test_cancellation;
mod test_end_call;
mod test_signaling_drop;
mod test_start_failure_paths;
mod test_two_party_call;

use crate::utils::TestRelay;
use std::sync::Arc;
use telecall_core::{RoomId, SessionConfig, UserId};
use telecall_session::media::SyntheticCapture;
use telecall_session::session::{CallSessionController, SessionEvent};
use tokio::sync::mpsc;

pub const TEST_ROOM: &str = "consult-1";

pub fn controller_on(
    relay: &TestRelay,
    user_id: &str,
    user_name: &str,
) -> (CallSessionController, mpsc::Receiver<SessionEvent>) {
    let config = SessionConfig::new(
        RoomId::from(TEST_ROOM),
        UserId::from(user_id),
        user_name,
    );
    CallSessionController::new(config, relay.transport(), Arc::new(SyntheticCapture))
}

/// Pull everything currently queued without waiting.
pub fn drain_events(rx: &mut mpsc::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

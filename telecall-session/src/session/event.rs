use crate::media::LocalStream;
use crate::peer::{ConnectionState, RemoteStream};
use crate::session::state::SessionState;
use telecall_core::CallError;

/// Outward notifications to the UI collaborator. Together with the watched
/// `CallSession` snapshot these are the only points of contact between the
/// session core and the rest of the application.
#[derive(Debug)]
pub enum SessionEvent {
    LocalStream(LocalStream),
    /// Emitted when remote media arrives, and again as further tracks fill
    /// in the aggregate.
    RemoteStream(RemoteStream),
    StateChanged(SessionState),
    ConnectionQuality(ConnectionState),
    Error(CallError),
    CallEnded,
}

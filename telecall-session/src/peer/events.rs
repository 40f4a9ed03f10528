use crate::peer::state::ConnectionState;
use std::sync::Arc;
use telecall_core::{IceCandidateBlob, NegotiationError};
use webrtc::track::track_remote::TrackRemote;

/// Remote media as it arrives; tracks fill in one by one. The session emits
/// its remote-stream notification on the first one.
#[derive(Default, Clone)]
pub struct RemoteStream {
    pub audio: Option<Arc<TrackRemote>>,
    pub video: Option<Arc<TrackRemote>>,
}

impl RemoteStream {
    pub fn is_empty(&self) -> bool {
        self.audio.is_none() && self.video.is_none()
    }
}

impl std::fmt::Debug for RemoteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStream")
            .field("audio", &self.audio.is_some())
            .field("video", &self.video.is_some())
            .finish()
    }
}

/// Events the peer connection manager reports upward to the session.
#[derive(Debug)]
pub enum PeerEvent {
    RemoteTrack(Arc<TrackRemote>),
    /// A locally gathered candidate that must be relayed over signaling.
    CandidateReady(IceCandidateBlob),
    StateChanged(ConnectionState),
    /// Unrecoverable transport fault, surfaced rather than swallowed.
    Fault(NegotiationError),
}

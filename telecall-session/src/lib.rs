pub mod media;
pub mod peer;
pub mod session;
pub mod signaling;

pub use media::{
    CaptureBackend, CaptureHandle, LocalStream, LocalTrack, MediaConstraints, MediaDeviceManager,
    SyntheticCapture,
};
pub use peer::{ConnectionState, PeerConnectionManager, PeerEvent, RemoteStream};
pub use session::{CallSession, CallSessionController, SessionEvent, SessionState};
pub use signaling::{
    SignalingChannel, SignalingEvent, SignalingTransport, TransportLink, WsTransport,
};

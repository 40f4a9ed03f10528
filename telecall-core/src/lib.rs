pub mod error;
pub mod model;

pub use error::{CallError, DeviceError, NegotiationError, SignalingError};
pub use model::{
    IceCandidateBlob, IceServerConfig, Participant, PeerInfo, Role, RoomId, SessionConfig,
    SignalBody, SignalEnvelope, TrackKind, UserId,
};

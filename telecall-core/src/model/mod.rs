mod config;
mod participant;
mod room;
mod signaling;

pub use config::SessionConfig;
pub use participant::{Participant, Role, UserId};
pub use room::RoomId;
pub use signaling::{IceCandidateBlob, IceServerConfig, PeerInfo, SignalBody, SignalEnvelope};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which half of an audio/video capture a value refers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

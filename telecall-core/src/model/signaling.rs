use crate::error::SignalingError;
use crate::model::{RoomId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    /// A plain STUN/TURN url entry without credentials.
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// Opaque ICE candidate descriptor as relayed over signaling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateBlob {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_mline_index: Option<u16>,
}

/// Payload of a `user-joined` notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    pub user_id: UserId,
    pub display_name: String,
}

/// Type-dependent part of a signaling message: the `type` tag plus its
/// `payload` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum SignalBody {
    Join(PeerInfo),
    UserJoined(PeerInfo),
    /// Opaque SDP blob.
    Offer(String),
    /// Opaque SDP blob.
    Answer(String),
    IceCandidate(IceCandidateBlob),
    Leave,
    CallEnded,
    Error(String),
}

impl SignalBody {
    pub fn kind(&self) -> &'static str {
        match self {
            SignalBody::Join(_) => "join",
            SignalBody::UserJoined(_) => "user-joined",
            SignalBody::Offer(_) => "offer",
            SignalBody::Answer(_) => "answer",
            SignalBody::IceCandidate(_) => "ice-candidate",
            SignalBody::Leave => "leave",
            SignalBody::CallEnded => "call-ended",
            SignalBody::Error(_) => "error",
        }
    }
}

/// The wire unit exchanged over the signaling channel. One JSON object per
/// message; `to_user_id: None` means broadcast to the room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignalEnvelope {
    pub room_id: RoomId,
    pub from_user_id: UserId,
    pub to_user_id: Option<UserId>,
    #[serde(flatten)]
    pub body: SignalBody,
}

impl SignalEnvelope {
    pub fn broadcast(room_id: RoomId, from: UserId, body: SignalBody) -> Self {
        Self {
            room_id,
            from_user_id: from,
            to_user_id: None,
            body,
        }
    }

    pub fn to(room_id: RoomId, from: UserId, to: UserId, body: SignalBody) -> Self {
        Self {
            room_id,
            from_user_id: from,
            to_user_id: Some(to),
            body,
        }
    }

    /// Offer, answer and ice-candidate messages must carry a usable payload.
    /// A violating message is malformed and must be surfaced, not dropped.
    pub fn validate(&self) -> Result<(), SignalingError> {
        match &self.body {
            SignalBody::Offer(sdp) | SignalBody::Answer(sdp) if sdp.is_empty() => Err(
                SignalingError::Malformed(format!("{} with empty sdp", self.body.kind())),
            ),
            SignalBody::IceCandidate(blob) if blob.candidate.is_empty() => Err(
                SignalingError::Malformed("ice-candidate with empty candidate".into()),
            ),
            _ => Ok(()),
        }
    }

    /// Parse and validate a raw wire frame.
    pub fn from_json(raw: &str) -> Result<Self, SignalingError> {
        let envelope: SignalEnvelope =
            serde_json::from_str(raw).map_err(|e| SignalingError::Malformed(e.to_string()))?;
        envelope.validate()?;
        Ok(envelope)
    }

    pub fn to_json(&self) -> Result<String, SignalingError> {
        serde_json::to_string(self).map_err(|e| SignalingError::Malformed(e.to_string()))
    }
}

use crate::signaling::transport::SignalingTransport;
use std::sync::Arc;
use telecall_core::{PeerInfo, RoomId, SignalBody, SignalEnvelope, SignalingError, UserId};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Events delivered to the registered consumer, in transport arrival order.
/// Each room event carries the full envelope so the consumer can validate
/// the sender before acting.
#[derive(Debug)]
pub enum SignalingEvent {
    /// The transport handshake completed. Callers must not assume the
    /// channel is usable before observing this.
    Connected,
    UserJoined(SignalEnvelope),
    Offer(SignalEnvelope),
    Answer(SignalEnvelope),
    IceCandidate(SignalEnvelope),
    PeerLeft(SignalEnvelope),
    CallEnded(SignalEnvelope),
    /// A malformed or undeliverable message, surfaced instead of dropped.
    Error(SignalingError),
    /// The transport went away. The consumer decides whether to reconnect.
    Disconnected,
}

struct Connected {
    outbound: mpsc::Sender<String>,
    reader: JoinHandle<()>,
    pumps: Vec<JoinHandle<()>>,
}

/// A reconnectable, ordered message channel scoped to one room. Messages
/// sent while disconnected are dropped with an error, never queued: stale
/// SDP must not replay against a newer peer connection after a reconnect.
pub struct SignalingChannel {
    room_id: RoomId,
    self_id: UserId,
    display_name: String,
    transport: Arc<dyn SignalingTransport>,
    link: Mutex<Option<Connected>>,
}

impl SignalingChannel {
    pub fn new(
        room_id: RoomId,
        self_id: UserId,
        display_name: impl Into<String>,
        transport: Arc<dyn SignalingTransport>,
    ) -> Self {
        Self {
            room_id,
            self_id,
            display_name: display_name.into(),
            transport,
            link: Mutex::new(None),
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Connect (or reconnect) the underlying transport. On success the
    /// returned receiver yields `Connected` first, then room traffic.
    pub async fn connect(&self) -> Result<mpsc::Receiver<SignalingEvent>, SignalingError> {
        self.disconnect().await;

        let link = self.transport.connect().await?;
        let (event_tx, event_rx) = mpsc::channel(64);

        // Explicit connected notification before any room traffic.
        let _ = event_tx.send(SignalingEvent::Connected).await;

        let reader = tokio::spawn(read_loop(
            link.inbound,
            event_tx,
            self.room_id.clone(),
            self.self_id.clone(),
        ));

        *self.link.lock().await = Some(Connected {
            outbound: link.outbound,
            reader,
            pumps: link.pumps,
        });

        info!(room = %self.room_id, "signaling channel connected");
        Ok(event_rx)
    }

    /// Announce ourselves to the room. Fire-and-forget: the eventual
    /// `user-joined` for the peer arrives asynchronously, if at all.
    pub async fn join_room(&self) -> Result<(), SignalingError> {
        let body = SignalBody::Join(PeerInfo {
            user_id: self.self_id.clone(),
            display_name: self.display_name.clone(),
        });
        self.send(SignalEnvelope::broadcast(
            self.room_id.clone(),
            self.self_id.clone(),
            body,
        ))
        .await
    }

    /// Best-effort send. Fails immediately when the channel is down.
    pub async fn send(&self, envelope: SignalEnvelope) -> Result<(), SignalingError> {
        envelope.validate()?;
        let guard = self.link.lock().await;
        let Some(connected) = guard.as_ref() else {
            warn!(
                kind = envelope.body.kind(),
                "dropping signaling message: channel not connected"
            );
            return Err(SignalingError::NotConnected);
        };

        let frame = envelope.to_json()?;
        connected
            .outbound
            .send(frame)
            .await
            .map_err(|_| SignalingError::TransportClosed)
    }

    /// Targeted send helper used during negotiation.
    pub async fn send_to(&self, to: UserId, body: SignalBody) -> Result<(), SignalingError> {
        self.send(SignalEnvelope::to(
            self.room_id.clone(),
            self.self_id.clone(),
            to,
            body,
        ))
        .await
    }

    /// Room-wide send helper.
    pub async fn broadcast(&self, body: SignalBody) -> Result<(), SignalingError> {
        self.send(SignalEnvelope::broadcast(
            self.room_id.clone(),
            self.self_id.clone(),
            body,
        ))
        .await
    }

    /// Idempotent; safe from any state.
    pub async fn disconnect(&self) {
        if let Some(connected) = self.link.lock().await.take() {
            connected.reader.abort();
            for pump in connected.pumps {
                pump.abort();
            }
            info!(room = %self.room_id, "signaling channel disconnected");
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.link.lock().await.is_some()
    }
}

async fn read_loop(
    mut inbound: mpsc::Receiver<String>,
    events: mpsc::Sender<SignalingEvent>,
    room_id: RoomId,
    self_id: UserId,
) {
    while let Some(frame) = inbound.recv().await {
        let envelope = match SignalEnvelope::from_json(&frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("malformed signaling frame: {}", e);
                if events.send(SignalingEvent::Error(e)).await.is_err() {
                    return;
                }
                continue;
            }
        };

        if envelope.room_id != room_id {
            warn!(
                got = %envelope.room_id,
                expected = %room_id,
                "ignoring signaling message for another room"
            );
            continue;
        }
        if envelope.from_user_id == self_id {
            continue;
        }
        if let Some(to) = &envelope.to_user_id {
            if *to != self_id {
                debug!(to = %to, "ignoring signaling message addressed elsewhere");
                continue;
            }
        }

        let event = match &envelope.body {
            SignalBody::Join(_) | SignalBody::UserJoined(_) => {
                SignalingEvent::UserJoined(envelope)
            }
            SignalBody::Offer(_) => SignalingEvent::Offer(envelope),
            SignalBody::Answer(_) => SignalingEvent::Answer(envelope),
            SignalBody::IceCandidate(_) => SignalingEvent::IceCandidate(envelope),
            SignalBody::Leave => SignalingEvent::PeerLeft(envelope),
            SignalBody::CallEnded => SignalingEvent::CallEnded(envelope),
            SignalBody::Error(message) => {
                SignalingEvent::Error(SignalingError::Rejected(message.clone()))
            }
        };

        if events.send(event).await.is_err() {
            return;
        }
    }

    debug!("signaling transport closed");
    let _ = events.send(SignalingEvent::Disconnected).await;
}

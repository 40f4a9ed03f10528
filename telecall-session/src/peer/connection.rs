use crate::media::{LocalStream, MediaConstraints, MediaDeviceManager};
use crate::peer::events::PeerEvent;
use crate::peer::state::ConnectionState;
use std::sync::Arc;
use telecall_core::{CallError, IceCandidateBlob, IceServerConfig, NegotiationError};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

fn transport_err(e: webrtc::Error) -> NegotiationError {
    NegotiationError::Transport(e.to_string())
}

#[derive(Default)]
struct Inner {
    pc: Option<Arc<RTCPeerConnection>>,
    /// Candidates received before the remote description, kept in arrival
    /// order for replay (trickle-ICE contract).
    pending_candidates: Vec<IceCandidateBlob>,
    remote_description_set: bool,
    local_stream: Option<LocalStream>,
}

/// Owns the bidirectional media transport to exactly one peer.
pub struct PeerConnectionManager {
    event_tx: mpsc::Sender<PeerEvent>,
    inner: Mutex<Inner>,
}

impl PeerConnectionManager {
    pub fn new() -> (Self, mpsc::Receiver<PeerEvent>) {
        let (event_tx, event_rx) = mpsc::channel(64);
        (
            Self {
                event_tx,
                inner: Mutex::new(Inner::default()),
            },
            event_rx,
        )
    }

    /// Construct the underlying transport with the given ICE server list.
    /// Must run before any offer/answer/candidate operation. Errors on a
    /// live connection; usable again after `disconnect()`.
    pub async fn initialize(&self, ice_servers: &[IceServerConfig]) -> Result<(), NegotiationError> {
        let mut inner = self.inner.lock().await;
        if inner.pc.is_some() {
            return Err(NegotiationError::AlreadyInitialized);
        }

        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(transport_err)?;
        let registry =
            register_default_interceptors(Registry::new(), &mut media_engine).map_err(transport_err)?;
        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let pc = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .map_err(transport_err)?,
        );

        let state_tx = self.event_tx.clone();
        pc.on_peer_connection_state_change(Box::new(move |s| {
            let tx = state_tx.clone();
            Box::pin(async move {
                let state = ConnectionState::from(s);
                info!("peer connection state: {}", state);
                let _ = tx.send(PeerEvent::StateChanged(state)).await;
            })
        }));

        let ice_tx = self.event_tx.clone();
        pc.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let blob = IceCandidateBlob {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_mline_index: init.sdp_mline_index,
                };
                let _ = tx.send(PeerEvent::CandidateReady(blob)).await;
            })
        }));

        let track_tx = self.event_tx.clone();
        pc.on_track(Box::new(move |track, _receiver, _transceiver| {
            let tx = track_tx.clone();
            Box::pin(async move {
                debug!("remote {} track arrived", track.kind());
                let _ = tx.send(PeerEvent::RemoteTrack(track)).await;
            })
        }));

        inner.pc = Some(pc);
        info!("peer connection initialized");
        Ok(())
    }

    /// Acquire local media and attach it as the outgoing source of this
    /// connection. On attach failure the acquisition is rolled back, so the
    /// operation never partially succeeds.
    pub async fn user_media(
        &self,
        devices: &MediaDeviceManager,
        constraints: &MediaConstraints,
    ) -> Result<LocalStream, CallError> {
        if self.inner.lock().await.pc.is_none() {
            return Err(NegotiationError::NotInitialized.into());
        }

        let stream = devices.acquire(constraints).await.map_err(CallError::Device)?;
        if let Err(e) = self.attach(stream.clone()).await {
            devices.release().await;
            return Err(e.into());
        }
        Ok(stream)
    }

    async fn attach(&self, stream: LocalStream) -> Result<(), NegotiationError> {
        let mut inner = self.inner.lock().await;
        let pc = inner.pc.clone().ok_or(NegotiationError::NotInitialized)?;

        pc.add_track(stream.audio.rtp()).await.map_err(transport_err)?;
        pc.add_track(stream.video.rtp()).await.map_err(transport_err)?;
        inner.local_stream = Some(stream);
        debug!("local tracks attached to peer connection");
        Ok(())
    }

    /// Create a local offer and install it as the local description.
    pub async fn create_offer(&self) -> Result<String, NegotiationError> {
        let inner = self.inner.lock().await;
        let pc = inner.pc.clone().ok_or(NegotiationError::NotInitialized)?;

        let offer = pc.create_offer(None).await.map_err(transport_err)?;
        pc.set_local_description(offer.clone())
            .await
            .map_err(transport_err)?;
        Ok(offer.sdp)
    }

    /// Apply a remote offer and produce the local answer. Buffered
    /// candidates replay, in arrival order, as soon as the remote
    /// description is in place.
    pub async fn create_answer(&self, remote_sdp: &str) -> Result<String, NegotiationError> {
        let mut inner = self.inner.lock().await;
        let pc = inner.pc.clone().ok_or(NegotiationError::NotInitialized)?;

        let offer = RTCSessionDescription::offer(remote_sdp.to_owned())
            .map_err(|e| NegotiationError::InvalidSdp(e.to_string()))?;
        pc.set_remote_description(offer)
            .await
            .map_err(transport_err)?;
        inner.remote_description_set = true;
        self.flush_pending(&mut inner, &pc).await;

        let answer = pc.create_answer(None).await.map_err(transport_err)?;
        pc.set_local_description(answer.clone())
            .await
            .map_err(transport_err)?;
        Ok(answer.sdp)
    }

    /// Apply the peer's answer to our earlier offer.
    pub async fn apply_answer(&self, remote_sdp: &str) -> Result<(), NegotiationError> {
        let mut inner = self.inner.lock().await;
        let pc = inner.pc.clone().ok_or(NegotiationError::NotInitialized)?;

        let answer = RTCSessionDescription::answer(remote_sdp.to_owned())
            .map_err(|e| NegotiationError::InvalidSdp(e.to_string()))?;
        pc.set_remote_description(answer)
            .await
            .map_err(transport_err)?;
        inner.remote_description_set = true;
        self.flush_pending(&mut inner, &pc).await;
        Ok(())
    }

    /// Add a relayed candidate. Candidates arriving before the remote
    /// description are buffered, never dropped or reordered.
    pub async fn add_ice_candidate(&self, blob: IceCandidateBlob) -> Result<(), NegotiationError> {
        let mut inner = self.inner.lock().await;
        let pc = inner.pc.clone().ok_or(NegotiationError::NotInitialized)?;

        if !inner.remote_description_set {
            debug!("buffering candidate until remote description is set");
            inner.pending_candidates.push(blob);
            return Ok(());
        }
        apply_candidate(&pc, blob).await
    }

    async fn flush_pending(&self, inner: &mut Inner, pc: &Arc<RTCPeerConnection>) {
        if inner.pending_candidates.is_empty() {
            return;
        }
        debug!(
            count = inner.pending_candidates.len(),
            "replaying buffered ice candidates"
        );
        for blob in inner.pending_candidates.drain(..) {
            if let Err(e) = apply_candidate(pc, blob).await {
                warn!("buffered candidate rejected: {}", e);
                let _ = self.event_tx.send(PeerEvent::Fault(e)).await;
            }
        }
    }

    /// Buffered-candidate count, for diagnostics and tests.
    pub async fn pending_candidates(&self) -> usize {
        self.inner.lock().await.pending_candidates.len()
    }

    /// Flip the outgoing audio track; returns the realized enabled state.
    /// Tracks stay attached, so no renegotiation happens.
    pub async fn toggle_audio(&self) -> bool {
        match self.inner.lock().await.local_stream.as_ref() {
            Some(stream) => stream.audio.toggle(),
            None => false,
        }
    }

    pub async fn toggle_video(&self) -> bool {
        match self.inner.lock().await.local_stream.as_ref() {
            Some(stream) => stream.video.toggle(),
            None => false,
        }
    }

    /// Release all transport resources. Idempotent and safe even when
    /// `initialize` never ran; afterwards the manager accepts a fresh
    /// `initialize` for a new call.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        inner.pending_candidates.clear();
        inner.remote_description_set = false;
        inner.local_stream = None;

        if let Some(pc) = inner.pc.take() {
            if let Err(e) = pc.close().await {
                warn!("error closing peer connection: {}", e);
            } else {
                info!("peer connection closed");
            }
        }
    }
}

async fn apply_candidate(
    pc: &Arc<RTCPeerConnection>,
    blob: IceCandidateBlob,
) -> Result<(), NegotiationError> {
    let init = RTCIceCandidateInit {
        candidate: blob.candidate,
        sdp_mid: blob.sdp_mid,
        sdp_mline_index: blob.sdp_mline_index,
        username_fragment: None,
    };
    pc.add_ice_candidate(init)
        .await
        .map_err(|e| NegotiationError::InvalidCandidate(e.to_string()))
}

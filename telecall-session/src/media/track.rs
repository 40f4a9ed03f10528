use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use telecall_core::TrackKind;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// One locally captured track: the RTP-facing sample track plus an enabled
/// flag the capture feed consults before every write. Disabling a track
/// keeps it attached to the peer connection and produces no renegotiation;
/// the feed simply stops writing samples.
#[derive(Clone)]
pub struct LocalTrack {
    kind: TrackKind,
    rtp: Arc<TrackLocalStaticSample>,
    enabled: Arc<AtomicBool>,
}

impl LocalTrack {
    pub fn new(kind: TrackKind, rtp: Arc<TrackLocalStaticSample>) -> Self {
        Self {
            kind,
            rtp,
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Flip the enabled flag and return the realized state, so the caller
    /// can reconcile UI even if nothing actually changed.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.enabled.store(enabled, Ordering::SeqCst);
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn toggle(&self) -> bool {
        !self.enabled.fetch_xor(true, Ordering::SeqCst)
    }

    pub(crate) fn rtp(&self) -> Arc<TrackLocalStaticSample> {
        Arc::clone(&self.rtp)
    }
}

impl std::fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTrack")
            .field("kind", &self.kind)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

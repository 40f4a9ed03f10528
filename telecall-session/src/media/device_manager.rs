use crate::media::capture::{CaptureBackend, CaptureHandle};
use crate::media::constraints::MediaConstraints;
use crate::media::track::LocalTrack;
use std::sync::Arc;
use telecall_core::DeviceError;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// The handle the session owns exclusively for the lifetime of one call.
/// Both tracks stay attached to the peer connection even while disabled.
#[derive(Debug, Clone)]
pub struct LocalStream {
    pub audio: LocalTrack,
    pub video: LocalTrack,
}

/// Owns local camera/microphone acquisition. Exactly one acquisition may be
/// live at a time; a second `acquire` before `release` fails rather than
/// sharing hardware handles.
pub struct MediaDeviceManager {
    backend: Arc<dyn CaptureBackend>,
    active: Mutex<Option<CaptureHandle>>,
}

impl MediaDeviceManager {
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        Self {
            backend,
            active: Mutex::new(None),
        }
    }

    /// Acquire both tracks or fail with the error naming the track that
    /// could not be opened. Never partially succeeds.
    pub async fn acquire(&self, constraints: &MediaConstraints) -> Result<LocalStream, DeviceError> {
        let mut slot = self.active.lock().await;
        if slot.is_some() {
            warn!("acquire refused: local media already held");
            return Err(DeviceError::AlreadyAcquired);
        }

        let handle = self.backend.open(constraints).await?;
        let stream = LocalStream {
            audio: handle.audio.clone(),
            video: handle.video.clone(),
        };
        *slot = Some(handle);
        info!("local media acquired");
        Ok(stream)
    }

    /// Returns the realized enabled state; `false` when nothing is acquired.
    pub async fn set_audio_enabled(&self, enabled: bool) -> bool {
        match self.active.lock().await.as_ref() {
            Some(handle) => handle.audio.set_enabled(enabled),
            None => false,
        }
    }

    pub async fn set_video_enabled(&self, enabled: bool) -> bool {
        match self.active.lock().await.as_ref() {
            Some(handle) => handle.video.set_enabled(enabled),
            None => false,
        }
    }

    /// Stop all acquired hardware. Idempotent; runs on every exit path of
    /// the owning session.
    pub async fn release(&self) {
        if let Some(mut handle) = self.active.lock().await.take() {
            handle.stop();
            info!("local media released");
        } else {
            debug!("release with nothing acquired");
        }
    }
}

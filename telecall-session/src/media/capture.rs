use crate::media::constraints::MediaConstraints;
use crate::media::track::LocalTrack;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use telecall_core::{DeviceError, TrackKind};
use tokio::task::JoinHandle;
use tracing::debug;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Hardware seam. An implementation opens camera and microphone together,
/// all-or-nothing: on any failure it reports which track could not be
/// acquired and leaves no hardware open.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    async fn open(&self, constraints: &MediaConstraints) -> Result<CaptureHandle, DeviceError>;
}

/// Both acquired tracks plus their running feed tasks. Stopping the handle
/// aborts the feeds; dropping it does the same, so capture is released on
/// every exit path.
pub struct CaptureHandle {
    pub audio: LocalTrack,
    pub video: LocalTrack,
    feeds: Vec<JoinHandle<()>>,
}

impl CaptureHandle {
    pub fn new(audio: LocalTrack, video: LocalTrack, feeds: Vec<JoinHandle<()>>) -> Self {
        Self {
            audio,
            video,
            feeds,
        }
    }

    pub fn stop(&mut self) {
        for feed in self.feeds.drain(..) {
            feed.abort();
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

const OPUS_FRAME: Duration = Duration::from_millis(20);

// Opus silence/DTX frame.
const OPUS_SILENCE: [u8; 3] = [0xf8, 0xff, 0xfe];

/// Built-in backend producing Opus silence and synthetic video frames.
/// Used by tests and demos; a real camera/microphone integration plugs in
/// as another `CaptureBackend`.
#[derive(Debug, Default, Clone)]
pub struct SyntheticCapture;

impl SyntheticCapture {
    fn feed_audio(track: LocalTrack) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(OPUS_FRAME);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if !track.is_enabled() {
                    continue;
                }
                let sample = Sample {
                    data: Bytes::from_static(&OPUS_SILENCE),
                    duration: OPUS_FRAME,
                    ..Default::default()
                };
                if track.rtp().write_sample(&sample).await.is_err() {
                    debug!("audio feed stopping: track unwritable");
                    break;
                }
            }
        })
    }

    fn feed_video(track: LocalTrack, constraints: &MediaConstraints) -> JoinHandle<()> {
        let frame_interval = Duration::from_millis(1000 / constraints.frame_rate.max(1) as u64);
        // Small static payload; enough to drive RTP and fire on_track remotely.
        let frame = Bytes::from(vec![0u8; 256]);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(frame_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if !track.is_enabled() {
                    continue;
                }
                let sample = Sample {
                    data: frame.clone(),
                    duration: frame_interval,
                    ..Default::default()
                };
                if track.rtp().write_sample(&sample).await.is_err() {
                    debug!("video feed stopping: track unwritable");
                    break;
                }
            }
        })
    }
}

#[async_trait]
impl CaptureBackend for SyntheticCapture {
    async fn open(&self, constraints: &MediaConstraints) -> Result<CaptureHandle, DeviceError> {
        let stream_id = "telecall-local".to_owned();

        let audio = LocalTrack::new(
            TrackKind::Audio,
            Arc::new(TrackLocalStaticSample::new(
                RTCRtpCodecCapability {
                    mime_type: MIME_TYPE_OPUS.to_owned(),
                    clock_rate: 48000,
                    channels: 2,
                    ..Default::default()
                },
                "audio".to_owned(),
                stream_id.clone(),
            )),
        );

        let video = LocalTrack::new(
            TrackKind::Video,
            Arc::new(TrackLocalStaticSample::new(
                RTCRtpCodecCapability {
                    mime_type: MIME_TYPE_VP8.to_owned(),
                    clock_rate: 90000,
                    ..Default::default()
                },
                "video".to_owned(),
                stream_id,
            )),
        );

        let feeds = vec![
            Self::feed_audio(audio.clone()),
            Self::feed_video(video.clone(), constraints),
        ];

        debug!(
            width = constraints.width,
            height = constraints.height,
            fps = constraints.frame_rate,
            "synthetic capture opened"
        );
        Ok(CaptureHandle::new(audio, video, feeds))
    }
}

mod capture;
mod constraints;
mod device_manager;
mod track;

pub use capture::{CaptureBackend, CaptureHandle, SyntheticCapture};
pub use constraints::MediaConstraints;
pub use device_manager::{LocalStream, MediaDeviceManager};
pub use track::LocalTrack;

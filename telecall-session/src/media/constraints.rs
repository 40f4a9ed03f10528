/// Requested capture parameters. Both tracks are acquired together; a
/// constraint set that cannot be satisfied in full fails the acquisition.
#[derive(Debug, Clone)]
pub struct MediaConstraints {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            frame_rate: 30,
        }
    }
}

mod channel;
mod transport;

pub use channel::{SignalingChannel, SignalingEvent};
pub use transport::{SignalingTransport, TransportLink, WsTransport};

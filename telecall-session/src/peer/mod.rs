mod connection;
mod events;
mod state;

pub use connection::PeerConnectionManager;
pub use events::{PeerEvent, RemoteStream};
pub use state::ConnectionState;

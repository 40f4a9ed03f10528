use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use telecall_core::SignalingError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// A live connection to the signaling endpoint: raw JSON frames in both
/// directions plus the pump tasks keeping them flowing. The channel aborts
/// the pumps on disconnect.
pub struct TransportLink {
    pub outbound: mpsc::Sender<String>,
    pub inbound: mpsc::Receiver<String>,
    pub pumps: Vec<JoinHandle<()>>,
}

/// Seam between the signaling channel and the actual wire. Production uses
/// WebSocket; tests use an in-memory pair.
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    async fn connect(&self) -> Result<TransportLink, SignalingError>;
}

/// WebSocket transport for the signaling channel.
pub struct WsTransport {
    url: String,
}

impl WsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl SignalingTransport for WsTransport {
    async fn connect(&self) -> Result<TransportLink, SignalingError> {
        let (socket, _response) = connect_async(&self.url)
            .await
            .map_err(|e| SignalingError::Unreachable(e.to_string()))?;
        info!("signaling websocket connected: {}", self.url);

        let (mut sink, mut stream) = socket.split();
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(64);
        let (inbound_tx, inbound_rx) = mpsc::channel::<String>(64);

        let send_pump = tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Err(e) = sink.send(Message::text(frame)).await {
                    warn!("signaling send failed: {}", e);
                    break;
                }
            }
            let _ = sink.send(Message::Close(None)).await;
        });

        let recv_pump = tokio::spawn(async move {
            while let Some(Ok(msg)) = stream.next().await {
                match msg {
                    Message::Text(text) => {
                        if inbound_tx.send(text.to_string()).await.is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => {
                        debug!("signaling websocket closed by remote");
                        break;
                    }
                    _ => {}
                }
            }
            // Dropping inbound_tx lets the channel observe the disconnect.
        });

        Ok(TransportLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
            pumps: vec![send_pump, recv_pump],
        })
    }
}

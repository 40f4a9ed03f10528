use async_trait::async_trait;
use std::sync::Arc;
use telecall_core::{SignalBody, SignalEnvelope, SignalingError};
use tokio::sync::{Mutex, mpsc};
use telecall_session::signaling::{SignalingTransport, TransportLink};

struct RelayInner {
    /// Inbound side of every currently connected endpoint.
    endpoints: Vec<mpsc::Sender<String>>,
    /// Join frames seen so far; replayed to late joiners so both sides
    /// learn of each other.
    joins: Vec<String>,
    /// Everything that crossed the relay, for assertions.
    log: Vec<SignalEnvelope>,
}

/// In-memory signaling relay standing in for the room server: reflects
/// every frame to all connected endpoints and replays room membership to
/// newcomers. Channel-side filtering handles addressing and self-echo.
#[derive(Clone)]
pub struct TestRelay {
    inner: Arc<Mutex<RelayInner>>,
}

impl TestRelay {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RelayInner {
                endpoints: Vec::new(),
                joins: Vec::new(),
                log: Vec::new(),
            })),
        }
    }

    /// A fresh transport endpoint for one participant.
    pub fn transport(&self) -> Arc<MemoryTransport> {
        Arc::new(MemoryTransport {
            inner: Arc::clone(&self.inner),
        })
    }

    /// Kill every live connection, as if the signaling server restarted.
    /// Reconnecting endpoints get the membership replay again.
    pub async fn sever_all(&self) {
        self.inner.lock().await.endpoints.clear();
    }

    pub async fn log(&self) -> Vec<SignalEnvelope> {
        self.inner.lock().await.log.clone()
    }

    pub async fn count_offers(&self) -> usize {
        self.inner
            .lock()
            .await
            .log
            .iter()
            .filter(|env| matches!(env.body, SignalBody::Offer(_)))
            .count()
    }
}

pub struct MemoryTransport {
    inner: Arc<Mutex<RelayInner>>,
}

#[async_trait]
impl SignalingTransport for MemoryTransport {
    async fn connect(&self) -> Result<TransportLink, SignalingError> {
        let (in_tx, in_rx) = mpsc::channel::<String>(256);
        let (out_tx, mut out_rx) = mpsc::channel::<String>(256);

        {
            let mut inner = self.inner.lock().await;
            for join in &inner.joins {
                let _ = in_tx.send(join.clone()).await;
            }
            inner.endpoints.push(in_tx);
        }

        let relay = Arc::clone(&self.inner);
        let pump = tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                let mut inner = relay.lock().await;
                if let Ok(env) = SignalEnvelope::from_json(&frame) {
                    if matches!(env.body, SignalBody::Join(_)) {
                        inner.joins.push(frame.clone());
                    }
                    inner.log.push(env);
                }
                for endpoint in &inner.endpoints {
                    let _ = endpoint.send(frame.clone()).await;
                }
            }
        });

        Ok(TransportLink {
            outbound: out_tx,
            inbound: in_rx,
            pumps: vec![pump],
        })
    }
}

/// Transport whose endpoint is permanently unreachable.
#[derive(Debug, Default)]
pub struct FailingTransport;

#[async_trait]
impl SignalingTransport for FailingTransport {
    async fn connect(&self) -> Result<TransportLink, SignalingError> {
        Err(SignalingError::Unreachable(
            "connection refused".to_string(),
        ))
    }
}

/// Transport whose connect never resolves, as with a blackholed endpoint.
#[derive(Debug, Default)]
pub struct PendingTransport;

#[async_trait]
impl SignalingTransport for PendingTransport {
    async fn connect(&self) -> Result<TransportLink, SignalingError> {
        std::future::pending().await
    }
}

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Cancellable once-per-second tick source for the call duration counter.
/// Started explicitly when the session enters a timed state and cancelled on
/// leaving it; nothing runs outside that window.
pub(crate) struct CallTimer {
    tick_tx: mpsc::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl CallTimer {
    pub(crate) fn new() -> (Self, mpsc::Receiver<()>) {
        let (tick_tx, tick_rx) = mpsc::channel(4);
        (
            Self {
                tick_tx,
                task: None,
            },
            tick_rx,
        )
    }

    /// No-op when already running, so `Degraded ↔ Active` dips never reset
    /// the cadence.
    pub(crate) fn start(&mut self) {
        if self.task.is_some() {
            return;
        }
        let tx = self.tick_tx.clone();
        // The interval epoch is fixed here, not when the task first runs.
        let period = Duration::from_secs(1);
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        self.task = Some(tokio::spawn(async move {
            loop {
                ticker.tick().await;
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        }));
        debug!("call timer started");
    }

    pub(crate) fn pause(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("call timer paused");
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for CallTimer {
    fn drop(&mut self) {
        self.pause();
    }
}

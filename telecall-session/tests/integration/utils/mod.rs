mod relay;

pub use capture::{DeniedCapture, TrackedCapture};
pub use relay::{FailingTransport, PendingTransport, TestRelay};

use anyhow::{Result, bail};
use std::time::Duration;
use telecall_session::session::{CallSessionController, SessionState};

/// Poll the controller snapshot until it reaches `wanted` or the timeout
/// elapses.
pub async fn wait_for_state(
    controller: &CallSessionController,
    wanted: SessionState,
    timeout_ms: u64,
) -> Result<()> {
    let start = std::time::Instant::now();
    let timeout = Duration::from_millis(timeout_ms);

    loop {
        let state = controller.session().state;
        if state == wanted {
            return Ok(());
        }
        if state.is_terminal() && !wanted.is_terminal() {
            bail!("session reached terminal state {state} while waiting for {wanted}");
        }
        if start.elapsed() > timeout {
            bail!("timeout waiting for state {wanted} (currently {state})");
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

use crate::init_tracing;
use crate::session_tests::TEST_ROOM;
use crate::utils::{PendingTransport, TestRelay, TrackedCapture, wait_for_state};
use std::sync::Arc;
use std::time::Duration;
use telecall_core::{RoomId, SessionConfig, UserId};
use telecall_session::session::{CallSessionController, SessionState};

fn config() -> SessionConfig {
    SessionConfig::new(RoomId::from(TEST_ROOM), UserId::from("a-alice"), "Alice")
}

#[tokio::test]
async fn dropping_the_controller_releases_capture() {
    init_tracing();

    let relay = TestRelay::new();
    let capture = TrackedCapture::new();
    let (controller, _events) =
        CallSessionController::new(config(), relay.transport(), Arc::new(capture.clone()));

    controller.start().await;
    wait_for_state(&controller, SessionState::WaitingForPeer, 5000)
        .await
        .expect("session should come up");
    assert!(!capture.is_released());

    // No explicit end_call: the driver must notice the closed command
    // channel and tear everything down itself.
    drop(controller);

    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while !capture.is_released() {
        assert!(
            std::time::Instant::now() < deadline,
            "capture hardware was never released after controller drop"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

#[tokio::test]
async fn end_call_completes_while_initialization_hangs() {
    init_tracing();

    let (controller, _events) = CallSessionController::new(
        config(),
        Arc::new(PendingTransport),
        Arc::new(TrackedCapture::new()),
    );

    controller.start().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(controller.session().state, SessionState::Initializing);

    // The connect never resolves; hanging up must not wait for it.
    tokio::time::timeout(Duration::from_secs(3), controller.end_call())
        .await
        .expect("end_call must not block on a hung connect");
    assert_eq!(controller.session().state, SessionState::Ended);
}

#[tokio::test]
async fn end_call_during_initialization_releases_late_capture() {
    init_tracing();

    let relay = TestRelay::new();
    let capture = TrackedCapture::new();
    let (controller, _events) =
        CallSessionController::new(config(), relay.transport(), Arc::new(capture.clone()));

    // Hang up immediately after starting; initialization may still complete
    // afterwards, and whatever it acquired has to come back down.
    controller.start().await;
    controller.end_call().await;
    assert_eq!(controller.session().state, SessionState::Ended);

    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while !capture.is_released() {
        assert!(
            std::time::Instant::now() < deadline,
            "capture acquired by a late initialization was never released"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

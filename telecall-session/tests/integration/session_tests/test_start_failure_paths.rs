use crate::init_tracing;
use crate::session_tests::{TEST_ROOM, controller_on, drain_events};
use crate::utils::{DeniedCapture, FailingTransport, TestRelay, wait_for_state};
use std::sync::Arc;
use telecall_core::{CallError, RoomId, SessionConfig, SignalingError, UserId};
use telecall_session::session::{CallSessionController, SessionEvent, SessionState};

#[tokio::test]
async fn denied_media_yields_failed_with_device_error() {
    init_tracing();

    let relay = TestRelay::new();
    let config = SessionConfig::new(RoomId::from(TEST_ROOM), UserId::from("a-alice"), "Alice");
    let (controller, mut events) =
        CallSessionController::new(config, relay.transport(), Arc::new(DeniedCapture));

    controller.start().await;
    wait_for_state(&controller, SessionState::Failed, 5000)
        .await
        .expect("session should fail");

    let session = controller.session();
    assert!(session.last_error.expect("last_error set").is_device());
    assert_eq!(session.duration_seconds, 0);

    // Local media never came up, so the UI never saw a stream.
    let seen = drain_events(&mut events);
    assert!(
        !seen.iter().any(|e| matches!(e, SessionEvent::LocalStream(_))),
        "no local stream event expected, got {:?}",
        seen
    );
    assert!(seen.iter().any(|e| matches!(e, SessionEvent::Error(_))));
}

#[tokio::test]
async fn unreachable_signaling_yields_failed() {
    init_tracing();

    let config = SessionConfig::new(RoomId::from(TEST_ROOM), UserId::from("a-alice"), "Alice");
    let (controller, _events) = CallSessionController::new(
        config,
        Arc::new(FailingTransport),
        Arc::new(telecall_session::media::SyntheticCapture),
    );

    controller.start().await;
    wait_for_state(&controller, SessionState::Failed, 5000)
        .await
        .expect("session should fail");

    assert!(matches!(
        controller.session().last_error,
        Some(CallError::Signaling(SignalingError::Unreachable(_)))
    ));
}

#[tokio::test]
async fn successful_init_reaches_waiting_for_peer() {
    init_tracing();

    let relay = TestRelay::new();
    let (controller, mut events) = controller_on(&relay, "a-alice", "Alice");

    controller.start().await;
    wait_for_state(&controller, SessionState::WaitingForPeer, 5000)
        .await
        .expect("session should be waiting for peer");

    let session = controller.session();
    assert!(session.last_error.is_none());
    assert_eq!(session.duration_seconds, 0);
    assert!(session.started_at.is_none());

    let seen = drain_events(&mut events);
    assert!(seen.iter().any(|e| matches!(e, SessionEvent::LocalStream(_))));

    controller.end_call().await;
}

#[tokio::test]
async fn start_is_permitted_again_after_failure() {
    init_tracing();

    let relay = TestRelay::new();
    let config = SessionConfig::new(RoomId::from(TEST_ROOM), UserId::from("a-alice"), "Alice");
    let (controller, _events) =
        CallSessionController::new(config, relay.transport(), Arc::new(DeniedCapture));

    controller.start().await;
    wait_for_state(&controller, SessionState::Failed, 5000)
        .await
        .expect("first attempt should fail");

    // Explicit retry: the device is still denied, so the retry fails too,
    // but it runs as a fresh attempt instead of being ignored.
    controller.start().await;
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    wait_for_state(&controller, SessionState::Failed, 5000)
        .await
        .expect("retry should fail the same way");
    assert!(controller.session().last_error.unwrap().is_device());
}

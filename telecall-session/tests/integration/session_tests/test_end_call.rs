use crate::init_tracing;
use crate::session_tests::{controller_on, drain_events};
use crate::utils::{TestRelay, wait_for_state};
use telecall_core::SignalBody;
use telecall_session::session::{SessionEvent, SessionState};

#[tokio::test]
async fn end_call_is_idempotent_and_signals_the_room() {
    init_tracing();

    let relay = TestRelay::new();
    let (controller, mut events) = controller_on(&relay, "a-alice", "Alice");

    controller.start().await;
    wait_for_state(&controller, SessionState::WaitingForPeer, 5000)
        .await
        .expect("session should come up");

    controller.end_call().await;
    assert_eq!(controller.session().state, SessionState::Ended);

    let seen = drain_events(&mut events);
    assert!(seen.iter().any(|e| matches!(e, SessionEvent::CallEnded)));

    // Second hang-up: still Ended, no second CallEnded, no second Leave.
    controller.end_call().await;
    assert_eq!(controller.session().state, SessionState::Ended);
    let seen = drain_events(&mut events);
    assert!(!seen.iter().any(|e| matches!(e, SessionEvent::CallEnded)));

    let leaves = relay
        .log()
        .await
        .iter()
        .filter(|env| matches!(env.body, SignalBody::Leave))
        .count();
    assert_eq!(leaves, 1);
}

#[tokio::test]
async fn end_call_before_start_settles_in_ended() {
    init_tracing();

    let relay = TestRelay::new();
    let (controller, _events) = controller_on(&relay, "a-alice", "Alice");

    // Nothing is up yet; teardown must still be safe.
    controller.end_call().await;
    assert_eq!(controller.session().state, SessionState::Ended);
}

use crate::init_tracing;
use crate::session_tests::{controller_on, drain_events};
use crate::utils::{TestRelay, wait_for_state};
use telecall_session::session::{SessionEvent, SessionState};

/// Losing signaling mid-call degrades the session but leaves media alone;
/// the channel reconnects on its own and the session returns to Active with
/// its timer and streams intact.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn signaling_drop_degrades_then_recovers() {
    init_tracing();

    let relay = TestRelay::new();
    let (alice, mut alice_events) = controller_on(&relay, "a-alice", "Alice");
    let (bob, _bob_events) = controller_on(&relay, "b-bob", "Bob");

    alice.start().await;
    bob.start().await;

    wait_for_state(&alice, SessionState::Active, 30_000)
        .await
        .expect("alice should reach Active");
    wait_for_state(&bob, SessionState::Active, 30_000)
        .await
        .expect("bob should reach Active");

    let before = alice.session();
    let offers_before = relay.count_offers().await;
    drain_events(&mut alice_events);

    relay.sever_all().await;
    wait_for_state(&alice, SessionState::Degraded, 5000)
        .await
        .expect("alice should degrade when signaling drops");

    // Reconnect is automatic; no user action here.
    wait_for_state(&alice, SessionState::Active, 10_000)
        .await
        .expect("alice should recover to Active");

    let after = alice.session();
    assert_eq!(after.started_at, before.started_at, "call start must survive");
    assert!(after.duration_seconds >= before.duration_seconds);

    // Recovery rejoins the room but never reacquires media or renegotiates.
    let seen = drain_events(&mut alice_events);
    assert!(
        !seen.iter().any(|e| matches!(e, SessionEvent::LocalStream(_))),
        "media must not be reacquired on signaling recovery"
    );
    assert_eq!(relay.count_offers().await, offers_before);

    alice.end_call().await;
    bob.end_call().await;
}

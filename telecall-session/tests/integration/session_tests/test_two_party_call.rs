use crate::init_tracing;
use crate::session_tests::{controller_on, drain_events};
use crate::utils::{TestRelay, wait_for_state};
use std::time::Duration;
use telecall_core::Role;
use telecall_session::session::{SessionEvent, SessionState};

/// Full happy path over the in-memory relay: both sides join, the
/// lexicographically smaller user id makes the one offer, ICE completes over
/// loopback and both sessions go Active.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_participants_reach_active_and_hang_up() {
    init_tracing();

    let relay = TestRelay::new();
    let (alice, mut alice_events) = controller_on(&relay, "a-alice", "Alice");
    let (bob, mut bob_events) = controller_on(&relay, "b-bob", "Bob");

    alice.start().await;
    bob.start().await;

    wait_for_state(&alice, SessionState::Active, 30_000)
        .await
        .expect("alice should reach Active");
    wait_for_state(&bob, SessionState::Active, 30_000)
        .await
        .expect("bob should reach Active");

    // Roles fall out of the offer tie-break: alice offered, so she is the
    // caller and sees bob as callee.
    let alice_peer = alice.session().peer.expect("alice knows her peer");
    assert_eq!(alice_peer.user_id.as_str(), "b-bob");
    assert_eq!(alice_peer.display_name, "Bob");
    assert_eq!(alice_peer.role, Role::Callee);

    let bob_peer = bob.session().peer.expect("bob knows his peer");
    assert_eq!(bob_peer.user_id.as_str(), "a-alice");
    assert_eq!(bob_peer.role, Role::Caller);

    // Exactly one offer crossed the wire despite both sides starting.
    assert_eq!(relay.count_offers().await, 1);

    for (who, events) in [("alice", &mut alice_events), ("bob", &mut bob_events)] {
        let seen = drain_events(events);
        assert!(
            seen.iter().any(|e| matches!(e, SessionEvent::LocalStream(_))),
            "{who} saw no local stream"
        );
        assert!(
            seen.iter().any(|e| matches!(e, SessionEvent::RemoteStream(_))),
            "{who} saw no remote stream"
        );
    }

    // The call timer runs while Active.
    assert!(alice.session().started_at.is_some());
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(alice.session().duration_seconds >= 2);
    assert!(bob.session().duration_seconds >= 2);

    // Alice hangs up; bob's session ends on her Leave without any local
    // action on his side.
    alice.end_call().await;
    assert_eq!(alice.session().state, SessionState::Ended);

    wait_for_state(&bob, SessionState::Ended, 5000)
        .await
        .expect("bob should end on remote hang-up");
    let seen = drain_events(&mut bob_events);
    assert!(seen.iter().any(|e| matches!(e, SessionEvent::CallEnded)));
}

use std::time::Duration;

use crate::*;
use volley_core::metrics::SessionState;
use volley_core::{Convergence, MetricsKind, Scope, WaitPolicy};
use volley_services::Clock;

// ══════════════════════════════════════════════════════════════════════════════
//  BGP: two emulated routers, poll until both sessions are up
// ══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_two_peers_build_shape() -> Result<()> {
    let config = volley_core::build(&intents(TWO_PEERS).intents())?;

    assert_eq!(config.ports.len(), 2);
    assert_eq!(config.devices.len(), 2);
    let peers: Vec<_> = config.peers().collect();
    assert_eq!(peers.len(), 2);
    for peer in peers {
        assert_eq!(peer.v4_routes.len(), 1);
        assert_eq!(peer.v4_routes[0].addresses[0].count, 10);
    }
    Ok(())
}

#[tokio::test]
async fn test_peers_come_up_while_polling() -> Result<()> {
    let (fake, mut session, clock) = session().await?;
    fake.with(|s| s.polls_until_up = 3);

    let config = volley_core::build(&intents(TWO_PEERS).intents())?;
    let peer_names: BTreeSet<String> = config.peer_names().into_iter().collect();
    session.configure(config).await?;
    session.start(Scope::Protocol).await?;

    let policy = WaitPolicy::poll(
        Duration::from_secs(1),
        Duration::from_secs(60),
        Convergence::PeersUp,
    );
    let snapshot = session
        .wait_and_collect(&peer_names, MetricsKind::Bgpv4, &policy)
        .await?;

    assert_eq!(snapshot.len(), 2);
    for peer in snapshot.peers() {
        assert_eq!(peer.session_state, SessionState::Up, "{}", peer.name);
        assert_eq!(peer.fsm_state, "established");
        assert_eq!(peer.routes_advertised, 10);
    }
    assert_eq!(fake.calls_to("/monitor/metrics"), 4);
    assert_eq!(clock.elapsed(), Duration::from_secs(3));
    Ok(())
}

/// Peers that never come up: the poll gives up at the timeout and hands
/// back what it last saw.
#[tokio::test]
async fn test_poll_timeout_returns_last_snapshot() -> Result<()> {
    let (fake, mut session, clock) = session().await?;
    fake.with(|s| s.polls_until_up = u32::MAX);

    let config = volley_core::build(&intents(TWO_PEERS).intents())?;
    session.configure(config).await?;
    session.start(Scope::Protocol).await?;

    let policy = WaitPolicy::poll(
        Duration::from_millis(500),
        Duration::from_secs(2),
        Convergence::PeersUp,
    );
    let snapshot = session
        .wait_and_collect(&BTreeSet::new(), MetricsKind::Bgpv4, &policy)
        .await?;

    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.peers().all(|p| p.session_state == SessionState::Down));
    assert_eq!(clock.elapsed(), Duration::from_secs(2));
    assert_eq!(fake.calls_to("/monitor/metrics"), 5);
    Ok(())
}

#[tokio::test]
async fn test_stop_protocol_sends_protocol_all() -> Result<()> {
    let (fake, mut session, _clock) = session().await?;

    session
        .configure(volley_core::build(&intents(TWO_PEERS).intents())?)
        .await?;
    session.start(Scope::Protocol).await?;
    assert!(session.stop(Scope::Protocol).await.is_acknowledged());

    let controls = fake.with(|s| s.controls.clone());
    assert_eq!(controls.len(), 2);
    assert!(controls.iter().all(|c| c.scope() == Scope::Protocol));
    assert_eq!(controls[1].transition(), Transition::Stop);
    assert!(!fake.with(|s| s.protocol_running));
    Ok(())
}

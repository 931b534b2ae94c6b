use std::time::Duration;

use crate::*;
use volley_core::{MetricsKind, Scope, WaitPolicy};
use volley_services::SessionPhase;

// ══════════════════════════════════════════════════════════════════════════════
//  Traffic: configure → start → fixed wait → collect
// ══════════════════════════════════════════════════════════════════════════════

/// One 1000-packet flow between two ports; after a 10 s wait every frame
/// has been sent and at most that many received.
#[tokio::test]
async fn test_single_flow_fixed_wait() -> Result<()> {
    let (fake, mut session, clock) = session().await?;

    let config = volley_core::build(&intents(FLOW1).intents())?;
    assert_eq!(config.ports.len(), 2);
    session.configure(config).await?;
    session.start(Scope::Traffic).await?;
    assert_eq!(session.phase(), SessionPhase::Running);

    let snapshot = session
        .wait_and_collect(
            &names(&["flow1"]),
            MetricsKind::Flow,
            &WaitPolicy::fixed(Duration::from_secs(10)),
        )
        .await?;

    assert_eq!(clock.sleeps(), vec![Duration::from_secs(10)]);
    let flow1 = snapshot.flow("flow1").context("flow1 missing")?;
    assert_eq!(flow1.tx_frames, 1000);
    assert!(flow1.rx_frames <= 1000);
    assert_eq!(flow1.tx_bytes, 128_000);
    assert_eq!(
        fake.calls(),
        vec!["/config", "/control/state", "/monitor/metrics"]
    );
    Ok(())
}

/// The pushed config reaches the controller with ports resolved by name.
#[tokio::test]
async fn test_pushed_config_is_what_was_built() -> Result<()> {
    let (fake, mut session, _clock) = session().await?;

    let config = volley_core::build(&intents(FLOW1).intents())?;
    session.configure(config.clone()).await?;

    let pushed = fake.with(|s| s.config.clone()).context("nothing pushed")?;
    assert_eq!(pushed, config);
    assert_eq!(pushed.digest(), config.digest());
    Ok(())
}

#[tokio::test]
async fn test_unknown_flow_name_is_an_empty_snapshot() -> Result<()> {
    let (_fake, mut session, _clock) = session().await?;

    session
        .configure(volley_core::build(&intents(FLOW1).intents())?)
        .await?;
    session.start(Scope::Traffic).await?;

    let snapshot = session
        .collector()
        .collect(&names(&["flow9"]), MetricsKind::Flow)
        .await?;
    assert!(snapshot.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_empty_names_collects_every_flow() -> Result<()> {
    let (_fake, mut session, _clock) = session().await?;

    let mut set = intents(FLOW1);
    let mut reverse = set.flows[0].clone();
    reverse.name = "flow2".into();
    std::mem::swap(&mut reverse.tx, &mut reverse.rx);
    set.flows.push(reverse);

    session.configure(volley_core::build(&set.intents())?).await?;
    session.start(Scope::Traffic).await?;

    let snapshot = session
        .collector()
        .collect(&BTreeSet::new(), MetricsKind::Flow)
        .await?;
    assert_eq!(snapshot.names(), names(&["flow1", "flow2"]));
    Ok(())
}

use crate::*;
use volley_core::{RemoteError, Scope};
use volley_services::{OrchestratorError, SessionPhase, StopOutcome};

// ══════════════════════════════════════════════════════════════════════════════
//  Lifecycle: failures, reset, stop semantics
// ══════════════════════════════════════════════════════════════════════════════

const REJECTION: &str = "port1: location eth9 is not a valid test port";

/// A rejected config fails the session with the controller's words intact,
/// blocks `start` locally, and `reset` allows a corrected retry.
#[tokio::test]
async fn test_rejection_then_reset_then_retry() -> Result<()> {
    let (fake, mut session, _clock) = session().await?;
    fake.with(|s| s.reject_config = Some(vec![REJECTION.to_string()]));

    let config = volley_core::build(&intents(FLOW1).intents())?;
    let err = session.configure(config.clone()).await.unwrap_err();
    assert!(err.is_remote_config());
    assert!(err.to_string().contains(REJECTION));
    match err.remote() {
        Some(RemoteError::Rejected {
            status,
            kind,
            errors,
        }) => {
            assert_eq!(*status, 400);
            assert_eq!(kind.as_deref(), Some("validation"));
            assert_eq!(errors, &vec![REJECTION.to_string()]);
        }
        other => panic!("expected a rejection, got {other:?}"),
    }
    assert_eq!(session.phase(), SessionPhase::Failed);

    let err = session.start(Scope::Traffic).await.unwrap_err();
    assert!(err.is_remote_control());
    assert_eq!(fake.calls_to("/control/state"), 0);

    session.reset();
    assert_eq!(session.phase(), SessionPhase::Idle);

    fake.with(|s| s.reject_config = None);
    session.configure(config).await?;
    assert_eq!(session.phase(), SessionPhase::Configured);
    Ok(())
}

#[tokio::test]
async fn test_stop_twice_and_from_idle() -> Result<()> {
    let (fake, mut session, _clock) = session().await?;

    assert_eq!(session.stop(Scope::Traffic).await, StopOutcome::Acknowledged);
    assert_eq!(session.phase(), SessionPhase::Stopped);
    assert_eq!(session.stop(Scope::Traffic).await, StopOutcome::Acknowledged);
    assert_eq!(session.phase(), SessionPhase::Stopped);
    assert_eq!(fake.calls_to("/control/state"), 2);
    Ok(())
}

/// A non-OTG error body still reaches the caller unchanged.
#[tokio::test]
async fn test_start_failure_carries_raw_body() -> Result<()> {
    let (fake, mut session, _clock) = session().await?;
    session
        .configure(volley_core::build(&intents(FLOW1).intents())?)
        .await?;
    fake.with(|s| s.fail_control = Some("traffic engine crashed".into()));

    let err = session.start(Scope::Traffic).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::RemoteControl(_)));
    assert_eq!(
        err.remote().and_then(|e| e.remote_detail()).as_deref(),
        Some("traffic engine crashed")
    );
    assert_eq!(session.phase(), SessionPhase::Failed);
    assert!(session.failure().is_some());

    // stop still reaches the controller but does not leave Failed.
    let outcome = session.stop(Scope::Traffic).await;
    assert!(matches!(outcome, StopOutcome::RemoteFailed(_)));
    assert_eq!(session.phase(), SessionPhase::Failed);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_controller() -> Result<()> {
    // Bind then drop to get a port nobody listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let url = format!("http://{}", listener.local_addr()?);
    drop(listener);

    let mut session = SessionController::new(http_controller(&url)?);
    let err = session
        .configure(volley_core::build(&intents(FLOW1).intents())?)
        .await
        .unwrap_err();
    assert!(err.remote().map(|e| e.is_transport()).unwrap_or(false), "{err}");
    assert_eq!(session.phase(), SessionPhase::Failed);

    let outcome = session.stop(Scope::Traffic).await;
    assert!(matches!(outcome, StopOutcome::RemoteFailed(RemoteError::Transport(_))));
    Ok(())
}

#[tokio::test]
async fn test_validation_error_never_reaches_controller() -> Result<()> {
    let (fake, _session, _clock) = session().await?;

    let mut set = intents(FLOW1);
    set.flows.push(set.flows[0].clone());
    let err = volley_core::build(&set.intents()).unwrap_err();
    assert!(err.is_duplicate_name());
    let err = OrchestratorError::from(err);
    assert!(err.is_validation());

    assert!(fake.calls().is_empty());
    Ok(())
}

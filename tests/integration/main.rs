//! Volley integration test harness.
//!
//! Each test starts an in-process fake OTG controller on 127.0.0.1:0 and
//! drives it through the real `HttpController`, so requests and responses
//! cross an actual HTTP connection as JSON.
//!
//! The fake keeps just enough state to answer like a controller would:
//! the last pushed config, which scopes are running, and how many BGP
//! polls remain before peers come up.

mod bgp;
mod lifecycle;
mod traffic;

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use volley_client::HttpController;
use volley_core::config::ControllerConfig;
use volley_core::otg::{
    ControlState, FlowDurationSpec, FlowSize, MetricsRequest, ProtocolControl, SessionConfig, TrafficControl,
};
use volley_core::{IntentSet, Transition};
use volley_services::{ManualClock, SessionController};

// ── Fake controller ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeState {
    pub config: Option<SessionConfig>,
    pub traffic_running: bool,
    pub protocol_running: bool,
    /// Traffic START has run to completion at least once.
    pub traffic_sent: bool,
    /// Peers report `down` for this many bgpv4 polls after protocol START.
    pub polls_until_up: u32,
    /// When set, `/config` answers 400 with these errors.
    pub reject_config: Option<Vec<String>>,
    /// When set, `/control/state` answers 500 with this body.
    pub fail_control: Option<String>,
    /// Request paths, in arrival order.
    pub calls: Vec<String>,
    /// Bodies of every `/control/state` call.
    pub controls: Vec<ControlState>,
}

#[derive(Clone, Default)]
pub struct FakeOtg {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeOtg {
    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn calls(&self) -> Vec<String> {
        self.with(|s| s.calls.clone())
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.with(|s| s.calls.iter().filter(|c| c.as_str() == path).count())
    }
}

fn otg_error(status: StatusCode, kind: &str, errors: &[String]) -> Response {
    (
        status,
        Json(json!({ "code": status.as_u16(), "kind": kind, "errors": errors })),
    )
        .into_response()
}

async fn handle_config(State(fake): State<FakeOtg>, Json(config): Json<SessionConfig>) -> Response {
    fake.with(|s| {
        s.calls.push("/config".into());
        if let Some(errors) = &s.reject_config {
            return otg_error(StatusCode::BAD_REQUEST, "validation", errors);
        }
        s.config = Some(config);
        s.traffic_running = false;
        s.protocol_running = false;
        s.traffic_sent = false;
        Json(json!({ "warnings": [] })).into_response()
    })
}

async fn handle_control(State(fake): State<FakeOtg>, Json(control): Json<ControlState>) -> Response {
    fake.with(|s| {
        s.calls.push("/control/state".into());
        s.controls.push(control.clone());
        if let Some(body) = &s.fail_control {
            return (StatusCode::INTERNAL_SERVER_ERROR, body.clone()).into_response();
        }
        match control {
            ControlState::Traffic {
                traffic: TrafficControl::FlowTransmit { flow_transmit },
            } => {
                s.traffic_running = flow_transmit.state == Transition::Start;
                if s.traffic_running {
                    s.traffic_sent = true;
                }
            }
            ControlState::Protocol {
                protocol: ProtocolControl::All { all },
            } => {
                s.protocol_running = all.state == Transition::Start;
            }
        }
        Json(json!({ "warnings": [] })).into_response()
    })
}

/// Counters go out as decimal strings, the way protojson encodes uint64.
fn flow_records(s: &FakeState, names: &BTreeSet<String>) -> Vec<Value> {
    let Some(config) = &s.config else {
        return Vec::new();
    };
    config
        .flows
        .iter()
        .filter(|f| names.is_empty() || names.contains(&f.name))
        .map(|f| {
            let packets = match (&f.duration, s.traffic_sent) {
                (FlowDurationSpec::FixedPackets { fixed_packets }, true) => fixed_packets.packets,
                (_, true) => 100,
                (_, false) => 0,
            };
            let FlowSize::Fixed { fixed } = f.size;
            let bytes = packets * u64::from(fixed);
            json!({
                "name": f.name,
                "transmit": "stopped",
                "frames_tx": packets.to_string(),
                "frames_rx": packets.to_string(),
                "bytes_tx": bytes.to_string(),
                "bytes_rx": bytes.to_string(),
            })
        })
        .collect()
}

fn peer_records(s: &mut FakeState, names: &BTreeSet<String>) -> Vec<Value> {
    let up = if s.protocol_running {
        if s.polls_until_up == 0 {
            true
        } else {
            s.polls_until_up -= 1;
            false
        }
    } else {
        false
    };
    let Some(config) = &s.config else {
        return Vec::new();
    };
    config
        .peers()
        .filter(|p| names.is_empty() || names.contains(&p.name))
        .map(|p| {
            let routes: u64 = p
                .v4_routes
                .iter()
                .flat_map(|r| &r.addresses)
                .map(|a| u64::from(a.count))
                .sum();
            json!({
                "name": p.name,
                "session_state": if up { "up" } else { "down" },
                "fsm_state": if up { "established" } else { "active" },
                "routes_advertised": if up { routes } else { 0 },
                "routes_received": 0,
                "session_flap_count": 0,
            })
        })
        .collect()
}

async fn handle_metrics(State(fake): State<FakeOtg>, Json(request): Json<MetricsRequest>) -> Response {
    fake.with(|s| {
        s.calls.push("/monitor/metrics".into());
        match request {
            MetricsRequest::Flow { flow } => {
                let names = flow.flow_names.into_iter().collect();
                let records = flow_records(s, &names);
                Json(json!({ "choice": "flow_metrics", "flow_metrics": records })).into_response()
            }
            MetricsRequest::Bgpv4 { bgpv4 } => {
                let names = bgpv4.peer_names.into_iter().collect();
                let records = peer_records(s, &names);
                Json(json!({ "choice": "bgpv4_metrics", "bgpv4_metrics": records }))
                    .into_response()
            }
        }
    })
}

/// Serve a fresh fake controller; returns it and its base URL.
pub async fn spawn_fake() -> Result<(FakeOtg, String)> {
    let fake = FakeOtg::default();
    let app = Router::new()
        .route("/config", post(handle_config))
        .route("/control/state", post(handle_control))
        .route("/monitor/metrics", post(handle_metrics))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to bind fake controller")?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((fake, format!("http://{addr}")))
}

// ── Session helpers ───────────────────────────────────────────────────────────

pub fn http_controller(location: &str) -> Result<Arc<HttpController>> {
    let settings = ControllerConfig {
        location: location.to_string(),
        request_timeout_secs: 5,
        connect_timeout_secs: 2,
        ..Default::default()
    };
    Ok(Arc::new(HttpController::new(&settings)?))
}

/// A session over HTTP whose waits complete instantly.
pub async fn session() -> Result<(FakeOtg, SessionController, Arc<ManualClock>)> {
    let (fake, url) = spawn_fake().await?;
    let clock = Arc::new(ManualClock::new());
    let session = SessionController::with_clock(http_controller(&url)?, clock.clone());
    Ok((fake, session, clock))
}

pub fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

pub fn intents(toml: &str) -> IntentSet {
    IntentSet::from_toml_str(toml).unwrap()
}

pub const FLOW1: &str = r#"
    [[flows]]
    name = "flow1"
    tx = { port = "eth1" }
    rx = { port = "eth2" }
    frame_size = 128
    duration = { packets = 1000 }
    rate = { pps = 100 }

    [[flows.headers]]
    layer = "ethernet"
    src = "00:00:00:00:00:01"
    dst = "00:00:00:00:00:02"

    [[flows.headers]]
    layer = "ipv4"
    src = "10.1.1.2"
    dst = "10.2.2.2"

    [[flows.headers]]
    layer = "tcp"
    src_port = 5000
    dst_port = 6000
"#;

pub const TWO_PEERS: &str = r#"
    [[peerings]]
    device = "dut-eth1"
    port = "eth1"
    interface = { mac = "00:00:00:00:00:01", address = "10.1.1.2", gateway = "10.1.1.1", prefix = 24 }
    bgp = { router_id = "192.1.1.1", local_as = 65001, peer_address = "10.1.1.1", peer_as = 65000 }
    routes = [{ address = "192.0.2.0", count = 10 }]

    [[peerings]]
    device = "dut-eth2"
    port = "eth2"
    interface = { mac = "00:00:00:00:00:02", address = "10.2.2.2", gateway = "10.2.2.1", prefix = 24 }
    bgp = { router_id = "192.2.2.2", local_as = 65002, peer_address = "10.2.2.1", peer_as = 65000 }
    routes = [{ address = "192.1.2.0", count = 10 }]
"#;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fake_controller_answers() {
    let (fake, url) = spawn_fake().await.unwrap();
    let ctl = http_controller(&url).unwrap();

    use volley_core::Controller;
    let ack = ctl.push_config(&SessionConfig::default()).await.unwrap();
    assert!(ack.warnings.is_empty());
    assert_eq!(fake.calls(), vec!["/config".to_string()]);
}

//! Normalized metrics — the stable result shape handed to reporters.
//!
//! The controller's records carry many optional, loosely-typed fields; a
//! snapshot keeps only what Volley reports, keyed by entity name.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::otg::{
    Bgpv4MetricRecord, Bgpv4MetricsRequest, FlowMetricRecord, FlowMetricsRequest, MetricsRequest,
};

/// Which entity family a metrics query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsKind {
    Flow,
    Bgpv4,
}

impl std::fmt::Display for MetricsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flow => f.write_str("flow"),
            Self::Bgpv4 => f.write_str("bgpv4"),
        }
    }
}

impl std::str::FromStr for MetricsKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flow" | "flows" => Ok(Self::Flow),
            "bgpv4" | "bgp" | "peer" | "peers" => Ok(Self::Bgpv4),
            other => Err(format!("unknown metrics kind {other:?} (expected flow|bgpv4)")),
        }
    }
}

impl MetricsKind {
    /// Build the OTG request for `names`. An empty set asks for everything.
    pub fn request(self, names: &BTreeSet<String>) -> MetricsRequest {
        let names: Vec<String> = names.iter().cloned().collect();
        match self {
            Self::Flow => MetricsRequest::Flow {
                flow: FlowMetricsRequest { flow_names: names },
            },
            Self::Bgpv4 => MetricsRequest::Bgpv4 {
                bgpv4: Bgpv4MetricsRequest { peer_names: names },
            },
        }
    }
}

/// Flow transmit state as reported by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransmitState {
    Started,
    Stopped,
    Paused,
    Unknown,
}

impl TransmitState {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("started") => Self::Started,
            Some("stopped") => Self::Stopped,
            Some("paused") => Self::Paused,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for TransmitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Started => f.write_str("started"),
            Self::Stopped => f.write_str("stopped"),
            Self::Paused => f.write_str("paused"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// BGP session state (`up` once the FSM reaches Established).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Up,
    Down,
    Unknown,
}

impl SessionState {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("up") => Self::Up,
            Some("down") => Self::Down,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => f.write_str("up"),
            Self::Down => f.write_str("down"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowMetrics {
    pub name: String,
    pub tx_frames: u64,
    pub rx_frames: u64,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub transmit: TransmitState,
}

impl From<FlowMetricRecord> for FlowMetrics {
    fn from(r: FlowMetricRecord) -> Self {
        Self {
            transmit: TransmitState::parse(r.transmit.as_deref()),
            name: r.name,
            tx_frames: r.frames_tx,
            rx_frames: r.frames_rx,
            tx_bytes: r.bytes_tx,
            rx_bytes: r.bytes_rx,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerMetrics {
    pub name: String,
    pub session_state: SessionState,
    /// FSM state as the controller spells it, e.g. "established".
    pub fsm_state: String,
    pub routes_advertised: u64,
    pub routes_received: u64,
    pub session_flap_count: u64,
}

impl From<Bgpv4MetricRecord> for PeerMetrics {
    fn from(r: Bgpv4MetricRecord) -> Self {
        Self {
            session_state: SessionState::parse(r.session_state.as_deref()),
            fsm_state: r
                .fsm_state
                .map(|s| s.to_ascii_lowercase())
                .unwrap_or_else(|| "unknown".to_string()),
            name: r.name,
            routes_advertised: r.routes_advertised,
            routes_received: r.routes_received,
            session_flap_count: r.session_flap_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "entities", rename_all = "lowercase")]
pub enum Entities {
    Flow(BTreeMap<String, FlowMetrics>),
    Bgpv4(BTreeMap<String, PeerMetrics>),
}

/// Point-in-time readings for one entity family.
///
/// Built once per poll and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Unix ms at which the query returned.
    pub collected_at_ms: u64,
    #[serde(flatten)]
    pub entities: Entities,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Keep a record when no filter was given or its name was asked for.
fn wanted(names: &BTreeSet<String>, name: &str) -> bool {
    names.is_empty() || names.contains(name)
}

impl MetricsSnapshot {
    pub fn empty(kind: MetricsKind) -> Self {
        let entities = match kind {
            MetricsKind::Flow => Entities::Flow(BTreeMap::new()),
            MetricsKind::Bgpv4 => Entities::Bgpv4(BTreeMap::new()),
        };
        Self {
            collected_at_ms: now_ms(),
            entities,
        }
    }

    pub fn from_flow_records(
        records: impl IntoIterator<Item = FlowMetricRecord>,
        names: &BTreeSet<String>,
    ) -> Self {
        let flows = records
            .into_iter()
            .filter(|r| wanted(names, &r.name))
            .map(|r| (r.name.clone(), FlowMetrics::from(r)))
            .collect();
        Self {
            collected_at_ms: now_ms(),
            entities: Entities::Flow(flows),
        }
    }

    pub fn from_peer_records(
        records: impl IntoIterator<Item = Bgpv4MetricRecord>,
        names: &BTreeSet<String>,
    ) -> Self {
        let peers = records
            .into_iter()
            .filter(|r| wanted(names, &r.name))
            .map(|r| (r.name.clone(), PeerMetrics::from(r)))
            .collect();
        Self {
            collected_at_ms: now_ms(),
            entities: Entities::Bgpv4(peers),
        }
    }

    pub fn kind(&self) -> MetricsKind {
        match self.entities {
            Entities::Flow(_) => MetricsKind::Flow,
            Entities::Bgpv4(_) => MetricsKind::Bgpv4,
        }
    }

    pub fn len(&self) -> usize {
        match &self.entities {
            Entities::Flow(m) => m.len(),
            Entities::Bgpv4(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> BTreeSet<String> {
        match &self.entities {
            Entities::Flow(m) => m.keys().cloned().collect(),
            Entities::Bgpv4(m) => m.keys().cloned().collect(),
        }
    }

    pub fn flow(&self, name: &str) -> Option<&FlowMetrics> {
        match &self.entities {
            Entities::Flow(m) => m.get(name),
            Entities::Bgpv4(_) => None,
        }
    }

    pub fn peer(&self, name: &str) -> Option<&PeerMetrics> {
        match &self.entities {
            Entities::Bgpv4(m) => m.get(name),
            Entities::Flow(_) => None,
        }
    }

    pub fn flows(&self) -> impl Iterator<Item = &FlowMetrics> {
        let map = match &self.entities {
            Entities::Flow(m) => Some(m),
            Entities::Bgpv4(_) => None,
        };
        map.into_iter().flat_map(|m| m.values())
    }

    pub fn peers(&self) -> impl Iterator<Item = &PeerMetrics> {
        let map = match &self.entities {
            Entities::Bgpv4(m) => Some(m),
            Entities::Flow(_) => None,
        };
        map.into_iter().flat_map(|m| m.values())
    }
}

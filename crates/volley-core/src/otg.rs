//! OTG wire model — the JSON object graph exchanged with the controller.
//!
//! Field names and `choice` discriminators follow the Open Traffic Generator
//! API so these types serialize to exactly what `POST /config`,
//! `POST /control/state` and `POST /monitor/metrics` expect. Only the subset
//! Volley emits or reads is modelled.

use serde::{Deserialize, Deserializer, Serialize};

use crate::addr::MacAddr;

// ── Configuration ─────────────────────────────────────────────────────────────

/// A complete configuration, pushed in one `set_config` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<Device>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flows: Vec<Flow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub ethernets: Vec<DeviceEthernet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgp: Option<BgpRouter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEthernet {
    pub name: String,
    pub connection: EthernetConnection,
    pub mac: MacAddr,
    pub mtu: u16,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ipv4_addresses: Vec<DeviceIpv4>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "choice", rename_all = "snake_case")]
pub enum EthernetConnection {
    PortName { port_name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIpv4 {
    pub name: String,
    pub address: String,
    pub gateway: String,
    pub prefix: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BgpRouter {
    pub router_id: String,
    pub ipv4_interfaces: Vec<BgpV4Interface>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BgpV4Interface {
    pub ipv4_name: String,
    pub peers: Vec<BgpV4Peer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AsType {
    Ibgp,
    Ebgp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BgpV4Peer {
    pub name: String,
    pub peer_address: String,
    pub as_type: AsType,
    pub as_number: u32,
    pub advanced: BgpAdvanced,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub v4_routes: Vec<BgpV4RouteRange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BgpAdvanced {
    pub keep_alive_interval: u32,
    pub hold_time_interval: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BgpV4RouteRange {
    pub name: String,
    pub addresses: Vec<V4RouteAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct V4RouteAddress {
    pub address: String,
    pub prefix: u8,
    pub count: u32,
    pub step: u32,
}

// ── Flows ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub name: String,
    pub tx_rx: FlowTxRx,
    pub size: FlowSize,
    pub rate: FlowRate,
    pub duration: FlowDurationSpec,
    pub packet: Vec<FlowHeader>,
    pub metrics: FlowMetricsSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "choice", rename_all = "snake_case")]
pub enum FlowTxRx {
    Port { port: FlowPortEnds },
    Device { device: FlowDeviceEnds },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowPortEnds {
    pub tx_name: String,
    pub rx_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowDeviceEnds {
    pub tx_names: Vec<String>,
    pub rx_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "choice", rename_all = "snake_case")]
pub enum FlowSize {
    Fixed { fixed: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "choice", rename_all = "snake_case")]
pub enum FlowRate {
    Pps { pps: u64 },
    Bps { bps: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "choice", rename_all = "snake_case")]
pub enum FlowDurationSpec {
    FixedPackets { fixed_packets: FixedPackets },
    FixedSeconds { fixed_seconds: FixedSeconds },
    Continuous { continuous: Continuous },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedPackets {
    pub packets: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedSeconds {
    pub seconds: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Continuous {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowMetricsSpec {
    pub enable: bool,
}

/// One layer of the packet template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "choice", rename_all = "snake_case")]
pub enum FlowHeader {
    Ethernet { ethernet: EthernetHeader },
    Ipv4 { ipv4: Ipv4Header },
    Tcp { tcp: TcpHeader },
    Udp { udp: UdpHeader },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthernetHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<PatternValue<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst: Option<PatternValue<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv4Header {
    pub src: PatternValue<String>,
    pub dst: PatternValue<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpHeader {
    pub src_port: PatternValue<u16>,
    pub dst_port: PatternValue<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UdpHeader {
    pub src_port: PatternValue<u16>,
    pub dst_port: PatternValue<u16>,
}

/// A packet field pattern; Volley only ever sets fixed values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "choice", rename_all = "snake_case")]
pub enum PatternValue<T> {
    Value { value: T },
}

impl<T> PatternValue<T> {
    pub fn fixed(value: T) -> Self {
        Self::Value { value }
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Value { value } => value,
        }
    }
}

// ── Lookups ───────────────────────────────────────────────────────────────────

impl SessionConfig {
    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn device(&self, name: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.name == name)
    }

    pub fn flow(&self, name: &str) -> Option<&Flow> {
        self.flows.iter().find(|f| f.name == name)
    }

    pub fn flow_names(&self) -> Vec<String> {
        self.flows.iter().map(|f| f.name.clone()).collect()
    }

    pub fn peers(&self) -> impl Iterator<Item = &BgpV4Peer> {
        self.devices
            .iter()
            .filter_map(|d| d.bgp.as_ref())
            .flat_map(|bgp| bgp.ipv4_interfaces.iter())
            .flat_map(|iface| iface.peers.iter())
    }

    pub fn peer_names(&self) -> Vec<String> {
        self.peers().map(|p| p.name.clone()).collect()
    }

    pub fn ipv4_interface_names(&self) -> Vec<String> {
        self.devices
            .iter()
            .flat_map(|d| d.ethernets.iter())
            .flat_map(|e| e.ipv4_addresses.iter())
            .map(|ip| ip.name.clone())
            .collect()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// BLAKE3 over the canonical JSON encoding, hex encoded.
    ///
    /// Two structurally identical configs always share a digest.
    pub fn digest(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(blake3::hash(&bytes).as_bytes())
    }
}

// ── Control ───────────────────────────────────────────────────────────────────

/// Which part of the controller a START/STOP applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// `traffic.flow_transmit` — all configured flows.
    Traffic,
    /// `protocol.all` — every emulated protocol (BGP sessions).
    Protocol,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Traffic => f.write_str("traffic"),
            Self::Protocol => f.write_str("protocol"),
        }
    }
}

impl std::str::FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "traffic" => Ok(Self::Traffic),
            "protocol" | "protocols" | "bgp" => Ok(Self::Protocol),
            other => Err(format!("unknown scope {other:?} (expected traffic|protocol)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Start,
    Stop,
}

/// Body of `POST /control/state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "choice", rename_all = "snake_case")]
pub enum ControlState {
    Traffic { traffic: TrafficControl },
    Protocol { protocol: ProtocolControl },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "choice", rename_all = "snake_case")]
pub enum TrafficControl {
    FlowTransmit { flow_transmit: FlowTransmit },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowTransmit {
    pub state: Transition,
    /// Empty means every configured flow.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flow_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "choice", rename_all = "snake_case")]
pub enum ProtocolControl {
    All { all: ProtocolAll },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolAll {
    pub state: Transition,
}

impl ControlState {
    pub fn new(scope: Scope, state: Transition) -> Self {
        match scope {
            Scope::Traffic => Self::Traffic {
                traffic: TrafficControl::FlowTransmit {
                    flow_transmit: FlowTransmit {
                        state,
                        flow_names: Vec::new(),
                    },
                },
            },
            Scope::Protocol => Self::Protocol {
                protocol: ProtocolControl::All {
                    all: ProtocolAll { state },
                },
            },
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            Self::Traffic { .. } => Scope::Traffic,
            Self::Protocol { .. } => Scope::Protocol,
        }
    }

    pub fn transition(&self) -> Transition {
        match self {
            Self::Traffic {
                traffic: TrafficControl::FlowTransmit { flow_transmit },
            } => flow_transmit.state,
            Self::Protocol {
                protocol: ProtocolControl::All { all },
            } => all.state,
        }
    }
}

// ── Responses ─────────────────────────────────────────────────────────────────

/// Success body of config and control calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warnings {
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Error body returned with any non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtgError {
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

// ── Metrics ───────────────────────────────────────────────────────────────────

/// Body of `POST /monitor/metrics`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "choice", rename_all = "snake_case")]
pub enum MetricsRequest {
    Flow { flow: FlowMetricsRequest },
    Bgpv4 { bgpv4: Bgpv4MetricsRequest },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowMetricsRequest {
    #[serde(default)]
    pub flow_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bgpv4MetricsRequest {
    #[serde(default)]
    pub peer_names: Vec<String>,
}

/// Success body of `POST /monitor/metrics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "choice", rename_all = "snake_case")]
pub enum MetricsResponse {
    FlowMetrics {
        #[serde(default)]
        flow_metrics: Vec<FlowMetricRecord>,
    },
    Bgpv4Metrics {
        #[serde(default)]
        bgpv4_metrics: Vec<Bgpv4MetricRecord>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowMetricRecord {
    pub name: String,
    #[serde(default)]
    pub transmit: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub frames_tx: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub frames_rx: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub bytes_tx: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub bytes_rx: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bgpv4MetricRecord {
    pub name: String,
    #[serde(default)]
    pub session_state: Option<String>,
    #[serde(default)]
    pub fsm_state: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub session_flap_count: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub routes_advertised: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub routes_received: u64,
}

/// protojson encodes 64-bit counters as decimal strings; accept both forms.
/// An explicit `null` reads as an unset counter.
fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Counter {
        Number(u64),
        Text(String),
    }

    match Option::<Counter>::deserialize(deserializer)? {
        None => Ok(0),
        Some(Counter::Number(n)) => Ok(n),
        Some(Counter::Text(s)) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

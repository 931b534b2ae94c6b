//! Intent model — what the operator asked for, before any OTG objects exist.
//!
//! Intents are plain data loaded from TOML intent files or built by the CLI
//! presets. `validate()` catches every problem that can be detected locally so
//! that a bad intent never reaches the controller.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::addr::MacAddr;

pub const MIN_FRAME_SIZE: u32 = 64;
pub const MAX_FRAME_SIZE: u32 = 9216;
pub const MIN_MTU: u16 = 576;
pub const MAX_MTU: u16 = 9200;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Problems found in an intent before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{entity}: missing required field `{field}`")]
    MissingField { entity: String, field: &'static str },

    #[error("{entity}: invalid `{field}`: {reason}")]
    InvalidField {
        entity: String,
        field: &'static str,
        reason: String,
    },

    #[error("flow {flow}: bad header stack: {reason}")]
    HeaderStack { flow: String, reason: String },

    #[error("duplicate {kind} name `{name}`")]
    DuplicateName { kind: &'static str, name: String },

    #[error("{entity}: `{field}` references unknown {kind} `{name}`")]
    DanglingReference {
        entity: String,
        field: &'static str,
        kind: &'static str,
        name: String,
    },
}

impl ValidationError {
    pub fn is_duplicate_name(&self) -> bool {
        matches!(self, Self::DuplicateName { .. })
    }

    fn invalid(entity: &str, field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            entity: entity.to_string(),
            field,
            reason: reason.into(),
        }
    }

    fn missing(entity: &str, field: &'static str) -> Self {
        Self::MissingField {
            entity: entity.to_string(),
            field,
        }
    }
}

// ── Flows ─────────────────────────────────────────────────────────────────────

/// One direction of synthetic traffic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowIntent {
    pub name: String,
    pub tx: Endpoint,
    pub rx: Endpoint,
    #[serde(default = "default_frame_size")]
    pub frame_size: u32,
    #[serde(default)]
    pub duration: FlowDuration,
    pub rate: Rate,
    /// Outermost layer first. Ethernet is mandatory.
    #[serde(default)]
    pub headers: Vec<HeaderLayer>,
}

/// Where a flow enters or leaves the test topology.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    /// A test port, by location string (e.g. "eth1" or "10.0.0.5:5555").
    Port(String),
    /// An emulated device's IPv4 interface, by interface name.
    Device(String),
}

impl Endpoint {
    pub fn is_port(&self) -> bool {
        matches!(self, Self::Port(_))
    }

    fn value(&self) -> &str {
        match self {
            Self::Port(v) | Self::Device(v) => v,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowDuration {
    /// Send exactly this many packets, then stop.
    Packets(u64),
    /// Send for this many seconds, then stop.
    Seconds(f64),
    /// Send until told to stop.
    Continuous,
}

impl Default for FlowDuration {
    fn default() -> Self {
        Self::Packets(1000)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rate {
    Pps(u64),
    Bps(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "layer", rename_all = "snake_case")]
pub enum HeaderLayer {
    Ethernet(EthernetLayer),
    Ipv4(Ipv4Layer),
    Tcp(L4Layer),
    Udp(L4Layer),
}

impl HeaderLayer {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ethernet(_) => "ethernet",
            Self::Ipv4(_) => "ipv4",
            Self::Tcp(_) => "tcp",
            Self::Udp(_) => "udp",
        }
    }
}

/// Unset addresses are left for the controller to fill in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EthernetLayer {
    #[serde(default)]
    pub src: Option<MacAddr>,
    #[serde(default)]
    pub dst: Option<MacAddr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv4Layer {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct L4Layer {
    pub src_port: u16,
    pub dst_port: u16,
}

fn default_frame_size() -> u32 {
    128
}

impl FlowIntent {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let entity = format!("flow {}", display_name(&self.name));
        if self.name.trim().is_empty() {
            return Err(ValidationError::missing(&entity, "name"));
        }
        if self.tx.value().trim().is_empty() {
            return Err(ValidationError::missing(&entity, "tx"));
        }
        if self.rx.value().trim().is_empty() {
            return Err(ValidationError::missing(&entity, "rx"));
        }
        if self.tx.is_port() != self.rx.is_port() {
            return Err(ValidationError::invalid(
                &entity,
                "rx",
                "tx and rx must both be ports or both be devices",
            ));
        }
        if !(MIN_FRAME_SIZE..=MAX_FRAME_SIZE).contains(&self.frame_size) {
            return Err(ValidationError::invalid(
                &entity,
                "frame_size",
                format!(
                    "{} outside {}..={}",
                    self.frame_size, MIN_FRAME_SIZE, MAX_FRAME_SIZE
                ),
            ));
        }
        match self.duration {
            FlowDuration::Packets(0) => {
                return Err(ValidationError::invalid(&entity, "duration", "packet count must be at least 1"));
            }
            FlowDuration::Seconds(s) if !(s.is_finite() && s > 0.0) => {
                return Err(ValidationError::invalid(&entity, "duration", "seconds must be positive"));
            }
            _ => {}
        }
        match self.rate {
            Rate::Pps(0) | Rate::Bps(0) => {
                return Err(ValidationError::invalid(&entity, "rate", "rate must be at least 1"));
            }
            _ => {}
        }
        self.validate_headers()
    }

    fn validate_headers(&self) -> Result<(), ValidationError> {
        let stack_err = |reason: String| ValidationError::HeaderStack {
            flow: self.name.clone(),
            reason,
        };

        match self.headers.first() {
            Some(HeaderLayer::Ethernet(_)) => {}
            Some(other) => {
                return Err(stack_err(format!(
                    "first layer must be ethernet, found {}",
                    other.kind()
                )))
            }
            None => return Err(stack_err("ethernet layer is mandatory".to_string())),
        }

        for pair in self.headers.windows(2) {
            let (below, layer) = (&pair[0], &pair[1]);
            let ok = match layer {
                HeaderLayer::Ethernet(_) => false,
                HeaderLayer::Ipv4(_) => matches!(below, HeaderLayer::Ethernet(_)),
                HeaderLayer::Tcp(_) | HeaderLayer::Udp(_) => matches!(below, HeaderLayer::Ipv4(_)),
            };
            if !ok {
                return Err(stack_err(format!(
                    "{} cannot follow {}",
                    layer.kind(),
                    below.kind()
                )));
            }
        }

        for layer in &self.headers {
            if let HeaderLayer::Tcp(l4) | HeaderLayer::Udp(l4) = layer {
                if l4.src_port == 0 || l4.dst_port == 0 {
                    return Err(ValidationError::invalid(
                        &format!("flow {}", self.name),
                        "headers",
                        format!("{} ports must be in 1..=65535", layer.kind()),
                    ));
                }
            }
        }
        Ok(())
    }
}

// ── Peerings ──────────────────────────────────────────────────────────────────

/// An emulated device with one interface and one BGP peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeeringIntent {
    /// Device name; also the prefix for the interface and peer names.
    pub device: String,
    /// Location of the test port the device sits on.
    pub port: String,
    pub interface: InterfaceIntent,
    pub bgp: BgpIntent,
    #[serde(default)]
    pub routes: Vec<RouteBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceIntent {
    #[serde(default)]
    pub mac: Option<MacAddr>,
    #[serde(default = "default_mtu")]
    pub mtu: u16,
    pub address: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub prefix: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BgpIntent {
    pub router_id: Ipv4Addr,
    pub local_as: u32,
    pub peer_address: Ipv4Addr,
    pub peer_as: u32,
    /// Defaults to `peer_<device>`.
    #[serde(default)]
    pub peer_name: Option<String>,
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u32,
    #[serde(default = "default_hold_time")]
    pub hold_time_secs: u32,
}

/// A contiguous range of advertised IPv4 prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteBlock {
    pub address: Ipv4Addr,
    #[serde(default = "default_one")]
    pub count: u32,
    #[serde(default = "default_one")]
    pub step: u32,
    #[serde(default = "default_route_prefix")]
    pub prefix: u8,
}

fn default_mtu() -> u16 {
    1500
}

fn default_keepalive() -> u32 {
    30
}

fn default_hold_time() -> u32 {
    90
}

fn default_one() -> u32 {
    1
}

fn default_route_prefix() -> u8 {
    32
}

impl BgpIntent {
    pub fn is_ebgp(&self) -> bool {
        self.local_as != self.peer_as
    }
}

impl PeeringIntent {
    pub fn peer_name(&self) -> String {
        self.bgp
            .peer_name
            .clone()
            .unwrap_or_else(|| format!("peer_{}", self.device))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let entity = format!("device {}", display_name(&self.device));
        if self.device.trim().is_empty() {
            return Err(ValidationError::missing(&entity, "device"));
        }
        if self.port.trim().is_empty() {
            return Err(ValidationError::missing(&entity, "port"));
        }

        let iface = &self.interface;
        if iface.mac.is_none() {
            return Err(ValidationError::missing(&entity, "mac"));
        }
        if !(MIN_MTU..=MAX_MTU).contains(&iface.mtu) {
            return Err(ValidationError::invalid(
                &entity,
                "mtu",
                format!("{} outside {}..={}", iface.mtu, MIN_MTU, MAX_MTU),
            ));
        }
        check_prefix(&entity, "prefix", iface.prefix)?;
        if iface.gateway == iface.address {
            return Err(ValidationError::invalid(&entity, "gateway", "gateway equals interface address"));
        }
        if !same_subnet(iface.address, iface.gateway, iface.prefix) {
            return Err(ValidationError::invalid(
                &entity,
                "gateway",
                format!(
                    "{} is outside {}/{}",
                    iface.gateway, iface.address, iface.prefix
                ),
            ));
        }

        let bgp = &self.bgp;
        if bgp.local_as == 0 {
            return Err(ValidationError::invalid(&entity, "local_as", "AS number must be at least 1"));
        }
        if bgp.peer_as == 0 {
            return Err(ValidationError::invalid(&entity, "peer_as", "AS number must be at least 1"));
        }
        if matches!(bgp.peer_name.as_deref(), Some(n) if n.trim().is_empty()) {
            return Err(ValidationError::missing(&entity, "peer_name"));
        }
        if bgp.hold_time_secs != 0 && bgp.hold_time_secs < 3 {
            return Err(ValidationError::invalid(&entity, "hold_time_secs", "must be 0 or at least 3"));
        }
        if bgp.hold_time_secs != 0 && bgp.keepalive_secs > bgp.hold_time_secs {
            return Err(ValidationError::invalid(
                &entity,
                "keepalive_secs",
                "keepalive exceeds hold time",
            ));
        }

        for route in &self.routes {
            if route.count < 1 {
                return Err(ValidationError::invalid(&entity, "routes.count", "must be at least 1"));
            }
            if route.step < 1 {
                return Err(ValidationError::invalid(&entity, "routes.step", "must be at least 1"));
            }
            check_prefix(&entity, "routes.prefix", route.prefix)?;
        }
        Ok(())
    }
}

fn check_prefix(entity: &str, field: &'static str, prefix: u8) -> Result<(), ValidationError> {
    if (1..=32).contains(&prefix) {
        Ok(())
    } else {
        Err(ValidationError::invalid(entity, field, format!("{prefix} outside 1..=32")))
    }
}

fn same_subnet(a: Ipv4Addr, b: Ipv4Addr, prefix: u8) -> bool {
    let mask = u32::MAX << (32 - u32::from(prefix));
    (u32::from(a) & mask) == (u32::from(b) & mask)
}

fn display_name(name: &str) -> &str {
    if name.is_empty() {
        "<unnamed>"
    } else {
        name
    }
}

// ── Intent sets ───────────────────────────────────────────────────────────────

/// Anything the config builder accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Flow(FlowIntent),
    Peering(PeeringIntent),
}

impl From<FlowIntent> for Intent {
    fn from(f: FlowIntent) -> Self {
        Self::Flow(f)
    }
}

impl From<PeeringIntent> for Intent {
    fn from(p: PeeringIntent) -> Self {
        Self::Peering(p)
    }
}

/// On-disk form of an intent file: `[[flows]]` and `[[peerings]]` tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentSet {
    #[serde(default)]
    pub flows: Vec<FlowIntent>,
    #[serde(default)]
    pub peerings: Vec<PeeringIntent>,
}

impl IntentSet {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty() && self.peerings.is_empty()
    }

    /// Flatten into builder input, peerings first.
    pub fn intents(&self) -> Vec<Intent> {
        self.peerings
            .iter()
            .cloned()
            .map(Intent::from)
            .chain(self.flows.iter().cloned().map(Intent::from))
            .collect()
    }
}

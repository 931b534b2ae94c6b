//! Config builder — turns validated intents into an OTG `SessionConfig`.
//!
//! Pure and deterministic: the same intents always yield the same config.
//! Names are allocated in input order, ports are shared by location, and
//! every cross-reference is resolved here so a dangling name can never reach
//! the controller.

use std::collections::{BTreeMap, BTreeSet};

use crate::intent::{
    Endpoint, FlowDuration, FlowIntent, HeaderLayer, Intent, PeeringIntent, Rate,
    ValidationError,
};
use crate::otg::{
    AsType, BgpAdvanced, BgpRouter, BgpV4Interface, BgpV4Peer, BgpV4RouteRange, Continuous,
    Device, DeviceEthernet, DeviceIpv4, EthernetConnection, EthernetHeader, FixedPackets,
    FixedSeconds, Flow, FlowDeviceEnds, FlowDurationSpec, FlowHeader, FlowMetricsSpec,
    FlowPortEnds, FlowRate, FlowSize, FlowTxRx, Ipv4Header, PatternValue, Port, SessionConfig,
    TcpHeader, UdpHeader, V4RouteAddress,
};

/// Build a complete config from a mixed list of intents.
///
/// Peerings are laid down before flows so that device endpoints can refer to
/// interfaces regardless of where they appear in `intents`.
pub fn build(intents: &[Intent]) -> Result<SessionConfig, ValidationError> {
    let mut builder = ConfigBuilder::new();
    for intent in intents {
        if let Intent::Peering(p) = intent {
            builder.add_peering(p)?;
        }
    }
    for intent in intents {
        if let Intent::Flow(f) = intent {
            builder.add_flow(f)?;
        }
    }
    let config = builder.finish();
    tracing::debug!(
        ports = config.ports.len(),
        devices = config.devices.len(),
        flows = config.flows.len(),
        "session config built"
    );
    Ok(config)
}

/// Incremental builder. Each `add_*` returns the entity it just created.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: SessionConfig,
    /// Every object name in the config — OTG names share one namespace.
    names: BTreeSet<String>,
    /// location → index into `config.ports`
    ports_by_location: BTreeMap<String, usize>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn claim(&mut self, kind: &'static str, name: &str) -> Result<(), ValidationError> {
        if !self.names.insert(name.to_string()) {
            return Err(ValidationError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Port name for `location`, allocating the first free `portN` on first use.
    pub fn port_for(&mut self, location: &str) -> Result<&Port, ValidationError> {
        let index = match self.ports_by_location.get(location) {
            Some(&index) => index,
            None => {
                let name = (self.config.ports.len() + 1..)
                    .map(|n| format!("port{n}"))
                    .find(|name| !self.names.contains(name))
                    .unwrap_or_default();
                self.claim("port", &name)?;
                let index = self.config.ports.len();
                self.config.ports.push(Port {
                    name,
                    location: location.to_string(),
                });
                self.ports_by_location.insert(location.to_string(), index);
                index
            }
        };
        Ok(&self.config.ports[index])
    }

    pub fn add_peering(&mut self, intent: &PeeringIntent) -> Result<&Device, ValidationError> {
        intent.validate()?;

        let port_name = self.port_for(&intent.port)?.name.clone();
        let device_name = intent.device.clone();
        let eth_name = format!("{device_name}_eth");
        let ipv4_name = format!("{device_name}_v4");
        let peer_name = intent.peer_name();

        self.claim("device", &device_name)?;
        self.claim("ethernet", &eth_name)?;
        self.claim("ipv4", &ipv4_name)?;
        self.claim("peer", &peer_name)?;

        let mut v4_routes = Vec::with_capacity(intent.routes.len());
        for (i, block) in intent.routes.iter().enumerate() {
            let name = if i == 0 {
                format!("{peer_name}_routes")
            } else {
                format!("{peer_name}_routes_{}", i + 1)
            };
            self.claim("route range", &name)?;
            v4_routes.push(BgpV4RouteRange {
                name,
                addresses: vec![V4RouteAddress {
                    address: block.address.to_string(),
                    prefix: block.prefix,
                    count: block.count,
                    step: block.step,
                }],
            });
        }

        let iface = &intent.interface;
        let mac = iface.mac.ok_or_else(|| ValidationError::MissingField {
            entity: format!("device {device_name}"),
            field: "mac",
        })?;
        let bgp = &intent.bgp;

        self.config.devices.push(Device {
            name: device_name,
            ethernets: vec![DeviceEthernet {
                name: eth_name,
                connection: EthernetConnection::PortName { port_name },
                mac,
                mtu: iface.mtu,
                ipv4_addresses: vec![DeviceIpv4 {
                    name: ipv4_name.clone(),
                    address: iface.address.to_string(),
                    gateway: iface.gateway.to_string(),
                    prefix: iface.prefix,
                }],
            }],
            bgp: Some(BgpRouter {
                router_id: bgp.router_id.to_string(),
                ipv4_interfaces: vec![BgpV4Interface {
                    ipv4_name,
                    peers: vec![BgpV4Peer {
                        name: peer_name,
                        peer_address: bgp.peer_address.to_string(),
                        as_type: if bgp.is_ebgp() { AsType::Ebgp } else { AsType::Ibgp },
                        as_number: bgp.local_as,
                        advanced: BgpAdvanced {
                            keep_alive_interval: bgp.keepalive_secs,
                            hold_time_interval: bgp.hold_time_secs,
                        },
                        v4_routes,
                    }],
                }],
            }),
        });

        let index = self.config.devices.len() - 1;
        Ok(&self.config.devices[index])
    }

    pub fn add_flow(&mut self, intent: &FlowIntent) -> Result<&Flow, ValidationError> {
        intent.validate()?;

        let tx_rx = match (&intent.tx, &intent.rx) {
            (Endpoint::Port(tx), Endpoint::Port(rx)) => {
                let tx_name = self.port_for(tx)?.name.clone();
                let rx_name = self.port_for(rx)?.name.clone();
                FlowTxRx::Port {
                    port: FlowPortEnds { tx_name, rx_name },
                }
            }
            (Endpoint::Device(tx), Endpoint::Device(rx)) => {
                let known = self.config.ipv4_interface_names();
                for (field, name) in [("tx", tx), ("rx", rx)] {
                    if !known.contains(name) {
                        return Err(ValidationError::DanglingReference {
                            entity: format!("flow {}", intent.name),
                            field,
                            kind: "ipv4 interface",
                            name: name.clone(),
                        });
                    }
                }
                FlowTxRx::Device {
                    device: FlowDeviceEnds {
                        tx_names: vec![tx.clone()],
                        rx_names: vec![rx.clone()],
                    },
                }
            }
            // validate() already rejects mixed endpoint kinds
            _ => {
                return Err(ValidationError::InvalidField {
                    entity: format!("flow {}", intent.name),
                    field: "rx",
                    reason: "tx and rx must both be ports or both be devices".to_string(),
                })
            }
        };

        self.claim("flow", &intent.name)?;

        self.config.flows.push(Flow {
            name: intent.name.clone(),
            tx_rx,
            size: FlowSize::Fixed {
                fixed: intent.frame_size,
            },
            rate: match intent.rate {
                Rate::Pps(pps) => FlowRate::Pps { pps },
                Rate::Bps(bps) => FlowRate::Bps { bps },
            },
            duration: match intent.duration {
                FlowDuration::Packets(packets) => FlowDurationSpec::FixedPackets {
                    fixed_packets: FixedPackets { packets },
                },
                FlowDuration::Seconds(seconds) => FlowDurationSpec::FixedSeconds {
                    fixed_seconds: FixedSeconds { seconds },
                },
                FlowDuration::Continuous => FlowDurationSpec::Continuous {
                    continuous: Continuous::default(),
                },
            },
            packet: intent.headers.iter().map(header_to_otg).collect(),
            metrics: FlowMetricsSpec { enable: true },
        });

        let index = self.config.flows.len() - 1;
        Ok(&self.config.flows[index])
    }

    pub fn finish(self) -> SessionConfig {
        self.config
    }
}

fn header_to_otg(layer: &HeaderLayer) -> FlowHeader {
    match layer {
        HeaderLayer::Ethernet(eth) => FlowHeader::Ethernet {
            ethernet: EthernetHeader {
                src: eth.src.map(|m| PatternValue::fixed(m.to_string())),
                dst: eth.dst.map(|m| PatternValue::fixed(m.to_string())),
            },
        },
        HeaderLayer::Ipv4(ip) => FlowHeader::Ipv4 {
            ipv4: Ipv4Header {
                src: PatternValue::fixed(ip.src.to_string()),
                dst: PatternValue::fixed(ip.dst.to_string()),
            },
        },
        HeaderLayer::Tcp(l4) => FlowHeader::Tcp {
            tcp: TcpHeader {
                src_port: PatternValue::fixed(l4.src_port),
                dst_port: PatternValue::fixed(l4.dst_port),
            },
        },
        HeaderLayer::Udp(l4) => FlowHeader::Udp {
            udp: UdpHeader {
                src_port: PatternValue::fixed(l4.src_port),
                dst_port: PatternValue::fixed(l4.dst_port),
            },
        },
    }
}

//! Built-in intents used when no `--intent` file is given.
//!
//! They reproduce the lab's usual back-to-back setup: two test ports, eth1
//! and eth2, wired through the device under test.

use std::net::Ipv4Addr;

use volley_core::intent::{
    BgpIntent, Endpoint, EthernetLayer, FlowDuration, HeaderLayer, InterfaceIntent, Ipv4Layer,
    L4Layer, Rate, RouteBlock,
};
use volley_core::{FlowIntent, IntentSet, MacAddr, PeeringIntent};

/// AS of the device under test. Both emulated routers peer with it over eBGP.
const DUT_AS: u32 = 65000;

struct Side {
    port: &'static str,
    mac: MacAddr,
    ip: Ipv4Addr,
    l4_port: u16,
}

const ETH1: Side = Side {
    port: "eth1",
    mac: MacAddr([0x00, 0x00, 0x00, 0x00, 0x00, 0x01]),
    ip: Ipv4Addr::new(10, 1, 1, 2),
    l4_port: 5000,
};

const ETH2: Side = Side {
    port: "eth2",
    mac: MacAddr([0x00, 0x00, 0x00, 0x00, 0x00, 0x02]),
    ip: Ipv4Addr::new(10, 2, 2, 2),
    l4_port: 6000,
};

fn tcp_flow(name: &str, tx: &Side, rx: &Side) -> FlowIntent {
    FlowIntent {
        name: name.to_string(),
        tx: Endpoint::Port(tx.port.to_string()),
        rx: Endpoint::Port(rx.port.to_string()),
        frame_size: 128,
        duration: FlowDuration::Packets(1000),
        rate: Rate::Pps(100),
        headers: vec![
            HeaderLayer::Ethernet(EthernetLayer {
                src: Some(tx.mac),
                dst: Some(rx.mac),
            }),
            HeaderLayer::Ipv4(Ipv4Layer {
                src: tx.ip,
                dst: rx.ip,
            }),
            HeaderLayer::Tcp(L4Layer {
                src_port: tx.l4_port,
                dst_port: rx.l4_port,
            }),
        ],
    }
}

/// flow1 eth1 → eth2, plus the mirrored flow2 when `reverse` is set.
pub fn traffic(reverse: bool) -> IntentSet {
    let mut flows = vec![tcp_flow("flow1", &ETH1, &ETH2)];
    if reverse {
        flows.push(tcp_flow("flow2", &ETH2, &ETH1));
    }
    IntentSet {
        flows,
        peerings: Vec::new(),
    }
}

/// One emulated router per test port; `n` fills the middle octets.
fn peering(device: &str, side: &Side, n: u8, local_as: u32, routes: Ipv4Addr) -> PeeringIntent {
    PeeringIntent {
        device: device.to_string(),
        port: side.port.to_string(),
        interface: InterfaceIntent {
            mac: Some(side.mac),
            mtu: 1500,
            address: side.ip,
            gateway: Ipv4Addr::new(10, n, n, 1),
            prefix: 24,
        },
        bgp: BgpIntent {
            router_id: Ipv4Addr::new(192, n, n, n),
            local_as,
            peer_address: Ipv4Addr::new(10, n, n, 1),
            peer_as: DUT_AS,
            peer_name: None,
            keepalive_secs: 30,
            hold_time_secs: 90,
        },
        routes: vec![RouteBlock {
            address: routes,
            count: 10,
            step: 1,
            prefix: 32,
        }],
    }
}

/// dut-eth1 (AS 65001) and dut-eth2 (AS 65002), ten /32 routes each.
pub fn bgp() -> IntentSet {
    IntentSet {
        flows: Vec::new(),
        peerings: vec![
            peering("dut-eth1", &ETH1, 1, 65001, Ipv4Addr::new(192, 0, 2, 0)),
            peering("dut-eth2", &ETH2, 2, 65002, Ipv4Addr::new(192, 1, 2, 0)),
        ],
    }
}

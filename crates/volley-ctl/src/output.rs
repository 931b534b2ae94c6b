//! Snapshot renderers for the terminal.

use std::io::Write;

use anyhow::{Context, Result};
use volley_core::config::OutputFormat;
use volley_core::MetricsSnapshot;
use volley_services::ResultReporter;

const RULE: &str = "═══════════════════════════════════════════════════════════════";

/// Box-headed, column-aligned table per snapshot.
pub struct TableReporter<W: Write> {
    out: W,
}

impl<W: Write> TableReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn table(&mut self, title: &str, header: &[&str], rows: Vec<Vec<String>>) -> Result<()> {
        let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
        for row in &rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        writeln!(self.out, "{RULE}")?;
        writeln!(self.out, "  {title}")?;
        writeln!(self.out, "{RULE}")?;
        if rows.is_empty() {
            writeln!(self.out, "  No matching entities.")?;
            return Ok(());
        }

        let line = |cells: Vec<String>| -> String {
            let padded: Vec<String> = cells
                .into_iter()
                .zip(&widths)
                .map(|(c, w)| format!("{c:<w$}"))
                .collect();
            format!("  {}", padded.join("   ").trim_end())
        };
        writeln!(self.out, "{}", line(header.iter().map(|h| h.to_string()).collect()))?;
        writeln!(
            self.out,
            "{}",
            line(widths.iter().map(|w| "─".repeat(*w)).collect())
        )?;
        for row in rows {
            writeln!(self.out, "{}", line(row))?;
        }
        Ok(())
    }
}

impl<W: Write> ResultReporter for TableReporter<W> {
    fn report(&mut self, snapshot: MetricsSnapshot) -> Result<()> {
        let flows: Vec<Vec<String>> = snapshot
            .flows()
            .map(|f| {
                vec![
                    f.name.clone(),
                    f.tx_frames.to_string(),
                    f.rx_frames.to_string(),
                    f.tx_frames.saturating_sub(f.rx_frames).to_string(),
                    f.transmit.to_string(),
                ]
            })
            .collect();
        let peers: Vec<Vec<String>> = snapshot
            .peers()
            .map(|p| {
                vec![
                    p.name.clone(),
                    p.session_state.to_string(),
                    p.fsm_state.clone(),
                    p.routes_advertised.to_string(),
                    p.routes_received.to_string(),
                ]
            })
            .collect();

        match snapshot.kind() {
            volley_core::MetricsKind::Flow => self.table(
                &format!("Flow Metrics ({})", flows.len()),
                &["Flow", "Tx Frames", "Rx Frames", "Lost", "Transmit"],
                flows,
            )?,
            volley_core::MetricsKind::Bgpv4 => self.table(
                &format!("BGPv4 Peers ({})", peers.len()),
                &["Peer", "State", "FSM State", "Tx Routes", "Rx Routes"],
                peers,
            )?,
        }
        self.out.flush().context("failed to flush output")
    }
}

/// One pretty-printed JSON document per snapshot.
pub struct JsonReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ResultReporter for JsonReporter<W> {
    fn report(&mut self, snapshot: MetricsSnapshot) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.out, &snapshot)
            .context("failed to encode snapshot")?;
        writeln!(self.out)?;
        self.out.flush().context("failed to flush output")
    }
}

/// Reporter writing to stdout in `format`.
pub fn stdout_reporter(format: OutputFormat) -> Box<dyn ResultReporter> {
    match format {
        OutputFormat::Table => Box::new(TableReporter::new(std::io::stdout())),
        OutputFormat::Json => Box::new(JsonReporter::new(std::io::stdout())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use volley_core::otg::{Bgpv4MetricRecord, FlowMetricRecord};
    use volley_core::MetricsKind;

    fn flow_snapshot() -> MetricsSnapshot {
        MetricsSnapshot::from_flow_records(
            vec![
                FlowMetricRecord {
                    name: "flow1".into(),
                    transmit: Some("stopped".into()),
                    frames_tx: 1000,
                    frames_rx: 998,
                    ..Default::default()
                },
                FlowMetricRecord {
                    name: "flow2".into(),
                    transmit: Some("stopped".into()),
                    frames_tx: 1000,
                    frames_rx: 1000,
                    ..Default::default()
                },
            ],
            &BTreeSet::new(),
        )
    }

    #[test]
    fn flow_table_has_one_row_per_flow() {
        let mut r = TableReporter::new(Vec::new());
        r.report(flow_snapshot()).unwrap();
        let text = String::from_utf8(r.into_inner()).unwrap();

        assert!(text.contains("Flow Metrics (2)"));
        let row = text.lines().find(|l| l.trim_start().starts_with("flow1")).unwrap();
        let cells: Vec<&str> = row.split_whitespace().collect();
        assert_eq!(cells, vec!["flow1", "1000", "998", "2", "stopped"]);
    }

    #[test]
    fn peer_table_shows_session_state() {
        let snap = MetricsSnapshot::from_peer_records(
            vec![Bgpv4MetricRecord {
                name: "peer_dut-eth1".into(),
                session_state: Some("up".into()),
                fsm_state: Some("established".into()),
                routes_advertised: 10,
                routes_received: 4,
                ..Default::default()
            }],
            &BTreeSet::new(),
        );
        let mut r = TableReporter::new(Vec::new());
        r.report(snap).unwrap();
        let text = String::from_utf8(r.into_inner()).unwrap();

        assert!(text.contains("FSM State"));
        let row = text.lines().find(|l| l.contains("peer_dut-eth1")).unwrap();
        let cells: Vec<&str> = row.split_whitespace().collect();
        assert_eq!(cells, vec!["peer_dut-eth1", "up", "established", "10", "4"]);
    }

    #[test]
    fn empty_snapshot_says_so() {
        let mut r = TableReporter::new(Vec::new());
        r.report(MetricsSnapshot::empty(MetricsKind::Bgpv4)).unwrap();
        let text = String::from_utf8(r.into_inner()).unwrap();
        assert!(text.contains("BGPv4 Peers (0)"));
        assert!(text.contains("No matching entities."));
    }

    #[test]
    fn json_reporter_writes_the_snapshot() {
        let mut r = JsonReporter::new(Vec::new());
        r.report(flow_snapshot()).unwrap();
        let text = String::from_utf8(r.into_inner()).unwrap();

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["kind"], "flow");
        assert_eq!(value["entities"]["flow1"]["rx_frames"], 998);
    }
}

//! Physical quantities read back from a solved model.

use wf_core::NodeId;
use wf_network::{Network, NodeKind};

use crate::assembly::HydraulicModel;
use crate::error::{HydraulicsError, HydraulicsResult};

/// Heads, pressures, demands and flows at one instant, indexed like the
/// network's nodes and links.
#[derive(Clone, Debug, PartialEq)]
pub struct HydraulicSnapshot {
    pub time_s: f64,
    pub heads_m: Vec<f64>,
    pub pressures_m: Vec<f64>,
    pub demands_m3s: Vec<f64>,
    pub leaks_m3s: Vec<f64>,
    pub flows_m3s: Vec<f64>,
}

impl HydraulicSnapshot {
    /// Net flow into a node (links in minus links out).
    pub fn net_inflow(&self, network: &Network, node: NodeId) -> f64 {
        network
            .links_at(node)
            .iter()
            .filter_map(|&lid| network.link(lid))
            .map(|l| {
                let q = self.flows_m3s[l.id.idx()];
                if l.end == node { q } else { -q }
            })
            .sum()
    }

    /// Rate of change of a tank's level (m/s); `None` for other nodes.
    pub fn tank_level_rate(&self, network: &Network, node: NodeId) -> Option<f64> {
        let tank = network.node(node)?.as_tank()?;
        Some(self.net_inflow(network, node) / tank.area_m2())
    }
}

/// Convert a solved model into a snapshot.
pub fn extract_snapshot(
    network: &Network,
    hm: &HydraulicModel,
) -> HydraulicsResult<HydraulicSnapshot> {
    let value = |id| {
        hm.model
            .var_value(id)
            .ok_or_else(|| HydraulicsError::StateMismatch {
                what: "variable missing from solved model".to_string(),
            })
    };

    let mut heads_m = Vec::with_capacity(network.nodes().len());
    let mut pressures_m = Vec::with_capacity(network.nodes().len());
    let mut demands_m3s = Vec::with_capacity(network.nodes().len());
    let mut leaks_m3s = Vec::with_capacity(network.nodes().len());
    for node in network.nodes() {
        let i = node.id.idx();
        let h = value(hm.index.heads[i])?;
        let pressure = match &node.kind {
            NodeKind::Reservoir(_) => 0.0,
            _ => h - node.elevation_m(),
        };
        let demand = match hm.index.demands[i] {
            Some(d) => value(d)?,
            None => hm.index.fixed_demands[i],
        };
        let leak = match hm.index.leaks[i] {
            Some(l) => value(l)?,
            None => 0.0,
        };
        heads_m.push(h);
        pressures_m.push(pressure);
        demands_m3s.push(demand);
        leaks_m3s.push(leak);
    }

    let flows_m3s = hm
        .index
        .flows
        .iter()
        .map(|&q| value(q))
        .collect::<HydraulicsResult<Vec<_>>>()?;

    Ok(HydraulicSnapshot {
        time_s: hm.time_s,
        heads_m,
        pressures_m,
        demands_m3s,
        leaks_m3s,
        flows_m3s,
    })
}

//! Mutable simulation state, kept apart from the immutable network.

use serde::{Deserialize, Serialize};
use wf_core::{LinkId, LinkStatus, NodeId};

use crate::elements::{LinkKind, NodeKind};
use crate::network::Network;

/// Why a link's effective status differs from its commanded one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusHold {
    /// Closed because the tank at this end is at its minimum level.
    TankEmpty(NodeId),
    /// Closed because the tank at this end is at its maximum level.
    TankFull(NodeId),
    /// Check valve against reverse flow.
    CheckValve,
    /// Pump head cannot overcome the head rise across it.
    PumpCannotDeliver,
    /// Valve switched between regulating, open and closed.
    ValveRegime,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkState {
    /// Status last commanded by the initial conditions or a control.
    pub status: LinkStatus,
    /// Pipe roughness, pump speed, or valve setting.
    pub setting: f64,
    /// Status used when assembling the hydraulic model.
    pub effective: LinkStatus,
    pub hold: Option<StatusHold>,
}

impl LinkState {
    pub fn new(status: LinkStatus, setting: f64) -> Self {
        Self {
            status,
            setting,
            effective: status,
            hold: None,
        }
    }

    /// Apply a commanded status, dropping any automatic hold.
    pub fn command_status(&mut self, status: LinkStatus) {
        self.status = status;
        self.effective = status;
        self.hold = None;
    }
}

/// Everything that evolves over a run. Cloned for tentative steps and
/// serialized into checkpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub time_s: f64,
    /// Time of the previous control evaluation; `None` before the first.
    pub prev_control_time_s: Option<f64>,
    /// Level per node index; `None` for non-tank nodes.
    pub tank_levels_m: Vec<Option<f64>>,
    pub links: Vec<LinkState>,
    /// Last committed solution, used as the next initial guess.
    pub heads_m: Vec<f64>,
    pub flows_m3s: Vec<f64>,
    pub demands_m3s: Vec<f64>,
    pub leaks_m3s: Vec<f64>,
    /// Number of committed steps.
    pub step: u64,
}

impl SimulationState {
    /// Initial conditions from the network description.
    pub fn initial(network: &Network) -> Self {
        let nodes = network.nodes();
        let tank_levels_m = nodes
            .iter()
            .map(|n| match &n.kind {
                NodeKind::Tank(t) => Some(t.init_level_m),
                _ => None,
            })
            .collect();
        let junction_head = initial_junction_head(network);
        let heads_m = nodes
            .iter()
            .map(|n| match &n.kind {
                NodeKind::Tank(t) => t.elevation_m + t.init_level_m,
                NodeKind::Reservoir(r) => r.base_head_m,
                NodeKind::Junction(_) => junction_head,
            })
            .collect();
        let links = network
            .links()
            .iter()
            .map(|l| LinkState::new(l.initial_status, l.initial_setting))
            .collect();
        let flows_m3s = network
            .links()
            .iter()
            .map(|l| match &l.kind {
                LinkKind::Pump(p) => 0.5 * p.curve.max_flow(),
                _ => 1e-3,
            })
            .collect();
        Self {
            time_s: 0.0,
            prev_control_time_s: None,
            tank_levels_m,
            links,
            heads_m,
            flows_m3s,
            demands_m3s: vec![0.0; nodes.len()],
            leaks_m3s: vec![0.0; nodes.len()],
            step: 0,
        }
    }

    pub fn tank_level(&self, node: NodeId) -> Option<f64> {
        self.tank_levels_m.get(node.idx()).copied().flatten()
    }

    pub fn link(&self, link: LinkId) -> Option<&LinkState> {
        self.links.get(link.idx())
    }

    pub fn link_mut(&mut self, link: LinkId) -> Option<&mut LinkState> {
        self.links.get_mut(link.idx())
    }
}

/// Junction heads start at the mean fixed head, a reasonable Newton start.
fn initial_junction_head(network: &Network) -> f64 {
    let (sum, count) = network
        .nodes()
        .iter()
        .filter_map(|n| match &n.kind {
            NodeKind::Tank(t) => Some(t.elevation_m + t.init_level_m),
            NodeKind::Reservoir(r) => Some(r.base_head_m),
            NodeKind::Junction(_) => None,
        })
        .fold((0.0, 0usize), |(s, c), h| (s + h, c + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

//! Quantities a condition can observe, and the view that supplies them.

use serde::{Deserialize, Serialize};
use wf_core::{LinkId, NodeId};
use wf_network::{Network, NodeKind, SimulationState};

/// Reference to an observed quantity in the network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Observable {
    NodeHead { node: NodeId },
    /// Head minus elevation; zero at reservoirs.
    NodePressure { node: NodeId },
    NodeDemand { node: NodeId },
    TankLevel { tank: NodeId },
    LinkFlow { link: LinkId },
    /// Effective status encoded as closed=0, open=1, active=2.
    LinkStatus { link: LinkId },
    LinkSetting { link: LinkId },
}

impl Observable {
    pub fn node(self) -> Option<NodeId> {
        match self {
            Observable::NodeHead { node }
            | Observable::NodePressure { node }
            | Observable::NodeDemand { node } => Some(node),
            Observable::TankLevel { tank } => Some(tank),
            _ => None,
        }
    }

    pub fn link(self) -> Option<LinkId> {
        match self {
            Observable::LinkFlow { link }
            | Observable::LinkStatus { link }
            | Observable::LinkSetting { link } => Some(link),
            _ => None,
        }
    }
}

/// Read access to the current hydraulic state.
pub trait StateView {
    /// Current value of `what`, or `None` when it does not exist.
    fn value(&self, what: &Observable) -> Option<f64>;

    /// Rate of change of a tank level (m/s), `None` for non-tanks.
    fn level_rate(&self, tank: NodeId) -> Option<f64>;
}

/// [`StateView`] over a network and its simulation state.
///
/// Heads, demands and flows are the last committed solution; tank levels
/// are whatever the state currently holds.
#[derive(Clone, Copy, Debug)]
pub struct NetworkView<'a> {
    pub network: &'a Network,
    pub state: &'a SimulationState,
}

impl<'a> NetworkView<'a> {
    pub fn new(network: &'a Network, state: &'a SimulationState) -> Self {
        Self { network, state }
    }
}

impl StateView for NetworkView<'_> {
    fn value(&self, what: &Observable) -> Option<f64> {
        match *what {
            Observable::NodeHead { node } => {
                self.network.node(node)?;
                self.state.heads_m.get(node.idx()).copied()
            }
            Observable::NodePressure { node } => {
                let n = self.network.node(node)?;
                let head = *self.state.heads_m.get(node.idx())?;
                Some(match n.kind {
                    NodeKind::Reservoir(_) => 0.0,
                    _ => head - n.elevation_m(),
                })
            }
            Observable::NodeDemand { node } => {
                self.network.node(node)?;
                self.state.demands_m3s.get(node.idx()).copied()
            }
            Observable::TankLevel { tank } => self.state.tank_level(tank),
            Observable::LinkFlow { link } => self.state.flows_m3s.get(link.idx()).copied(),
            Observable::LinkStatus { link } => {
                self.state.link(link).map(|l| l.effective.as_f64())
            }
            Observable::LinkSetting { link } => self.state.link(link).map(|l| l.setting),
        }
    }

    fn level_rate(&self, tank: NodeId) -> Option<f64> {
        let t = self.network.node(tank)?.as_tank()?;
        let inflow: f64 = self
            .network
            .links_at(tank)
            .iter()
            .filter_map(|&lid| self.network.link(lid))
            .map(|l| {
                let q = self.state.flows_m3s.get(l.id.idx()).copied().unwrap_or(0.0);
                if l.end == tank { q } else { -q }
            })
            .sum();
        Some(inflow / t.area_m2())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_core::units::m;
    use wf_network::NetworkBuilder;

    #[test]
    fn view_reads_state() {
        let mut b = NetworkBuilder::new();
        let r = b.add_reservoir("R", m(40.0), None);
        let t = b.add_tank("T", m(10.0), m(2.0), m(0.0), m(5.0), m(2.0));
        b.add_pipe("P", r, t, m(100.0), m(0.2), 120.0);
        let net = b.build().unwrap();
        let mut state = SimulationState::initial(&net);
        state.flows_m3s[0] = 0.01;

        let view = NetworkView::new(&net, &state);
        assert_eq!(view.value(&Observable::TankLevel { tank: t }), Some(2.0));
        assert_eq!(view.value(&Observable::NodePressure { node: r }), Some(0.0));
        assert_eq!(view.value(&Observable::NodePressure { node: t }), Some(2.0));
        assert_eq!(view.value(&Observable::TankLevel { tank: r }), None);
        let p = net.link_id("P").unwrap();
        assert_eq!(view.value(&Observable::LinkStatus { link: p }), Some(1.0));

        let area = std::f64::consts::PI;
        let rate = view.level_rate(t).unwrap();
        assert!((rate - 0.01 / area).abs() < 1e-12);
        assert!(view.level_rate(r).is_none());
    }
}

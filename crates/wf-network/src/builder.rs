//! Incremental network builder.

use std::collections::HashMap;

use tracing::debug;
use wf_core::units::{Area, FlowRate, Length};
use wf_core::{LinkId, LinkStatus, NodeId, PatternId};

use crate::curve::HeadCurve;
use crate::elements::{
    DemandEntry, Junction, Leak, Link, LinkKind, Node, NodeKind, Pipe, PressureDemand, Pump,
    Reservoir, Tank, Valve, ValveKind,
};
use crate::error::{NetworkError, NetworkResult};
use crate::network::Network;
use crate::options::HydraulicOptions;
use crate::pattern::Pattern;
use crate::validate;

/// Builder for constructing a network incrementally.
///
/// `add_*` methods take SI quantities and hand back ids; `build()` validates
/// everything and freezes the result into an immutable [`Network`].
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    nodes: Vec<Node>,
    links: Vec<Link>,
    patterns: Vec<Pattern>,
    options: HydraulicOptions,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(&mut self, options: HydraulicOptions) -> &mut Self {
        self.options = options;
        self
    }

    pub fn options_mut(&mut self) -> &mut HydraulicOptions {
        &mut self.options
    }

    pub fn add_pattern(&mut self, name: impl Into<String>, multipliers: Vec<f64>) -> PatternId {
        let id = PatternId::from_index(self.patterns.len() as u32);
        self.patterns.push(Pattern {
            id,
            name: name.into(),
            multipliers,
        });
        id
    }

    fn push_node(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        let id = NodeId::from_index(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            name: name.into(),
            kind,
        });
        id
    }

    pub fn add_junction(&mut self, name: impl Into<String>, elevation: Length) -> NodeId {
        self.push_node(
            name,
            NodeKind::Junction(Junction {
                elevation_m: elevation.value,
                demands: Vec::new(),
                pressure_demand: None,
                leak: None,
            }),
        )
    }

    pub fn add_tank(
        &mut self,
        name: impl Into<String>,
        elevation: Length,
        init_level: Length,
        min_level: Length,
        max_level: Length,
        diameter: Length,
    ) -> NodeId {
        self.push_node(
            name,
            NodeKind::Tank(Tank {
                elevation_m: elevation.value,
                init_level_m: init_level.value,
                min_level_m: min_level.value,
                max_level_m: max_level.value,
                diameter_m: diameter.value,
            }),
        )
    }

    pub fn add_reservoir(
        &mut self,
        name: impl Into<String>,
        head: Length,
        head_pattern: Option<PatternId>,
    ) -> NodeId {
        self.push_node(
            name,
            NodeKind::Reservoir(Reservoir {
                base_head_m: head.value,
                head_pattern,
            }),
        )
    }

    fn junction_mut(&mut self, node: NodeId) -> NetworkResult<&mut Junction> {
        let n = self.nodes.get_mut(node.idx()).ok_or(NetworkError::Unknown {
            kind: "node",
            name: node.to_string(),
        })?;
        match &mut n.kind {
            NodeKind::Junction(j) => Ok(j),
            _ => Err(NetworkError::WrongKind {
                element: n.name.clone(),
                expected: "junction",
            }),
        }
    }

    /// Append a demand entry to a junction.
    pub fn add_demand(
        &mut self,
        node: NodeId,
        base: FlowRate,
        pattern: Option<PatternId>,
    ) -> NetworkResult<()> {
        self.junction_mut(node)?.demands.push(DemandEntry {
            base_m3s: base.value,
            pattern,
        });
        Ok(())
    }

    /// Override the global pressure-dependent demand parameters for a junction.
    pub fn set_pressure_demand(
        &mut self,
        node: NodeId,
        minimum: Length,
        required: Length,
        exponent: f64,
    ) -> NetworkResult<()> {
        self.junction_mut(node)?.pressure_demand = Some(PressureDemand {
            minimum_m: minimum.value,
            required_m: required.value,
            exponent,
        });
        Ok(())
    }

    /// Attach a leak to a junction.
    pub fn add_leak(
        &mut self,
        node: NodeId,
        area: Area,
        start_s: f64,
        end_s: Option<f64>,
    ) -> NetworkResult<()> {
        self.junction_mut(node)?.leak = Some(Leak {
            start_s,
            end_s,
            ..Leak::new(area.value)
        });
        Ok(())
    }

    /// Replace a junction's leak with fully specified parameters.
    pub fn set_leak(&mut self, node: NodeId, leak: Leak) -> NetworkResult<()> {
        self.junction_mut(node)?.leak = Some(leak);
        Ok(())
    }

    fn push_link(
        &mut self,
        name: impl Into<String>,
        start: NodeId,
        end: NodeId,
        kind: LinkKind,
        initial_status: LinkStatus,
        initial_setting: f64,
    ) -> LinkId {
        let id = LinkId::from_index(self.links.len() as u32);
        self.links.push(Link {
            id,
            name: name.into(),
            start,
            end,
            kind,
            initial_status,
            initial_setting,
        });
        id
    }

    /// Add a Hazen-Williams pipe; `roughness` is the C factor.
    pub fn add_pipe(
        &mut self,
        name: impl Into<String>,
        start: NodeId,
        end: NodeId,
        length: Length,
        diameter: Length,
        roughness: f64,
    ) -> LinkId {
        self.push_link(
            name,
            start,
            end,
            LinkKind::Pipe(Pipe {
                length_m: length.value,
                diameter_m: diameter.value,
                roughness,
                minor_loss: 0.0,
                check_valve: false,
            }),
            LinkStatus::Open,
            roughness,
        )
    }

    /// Add a pump from 1, 2 or 3 (flow, head) curve points.
    pub fn add_pump(
        &mut self,
        name: impl Into<String>,
        start: NodeId,
        end: NodeId,
        curve: &[(FlowRate, Length)],
    ) -> NetworkResult<LinkId> {
        let name = name.into();
        let points: Vec<(f64, f64)> = curve.iter().map(|(q, h)| (q.value, h.value)).collect();
        let curve = HeadCurve::from_points(&points).map_err(|e| match e {
            NetworkError::Validation { what, .. } => NetworkError::Validation {
                element: format!("pump {name}"),
                what,
            },
            other => other,
        })?;
        Ok(self.push_link(
            name,
            start,
            end,
            LinkKind::Pump(Pump { curve }),
            LinkStatus::Open,
            1.0,
        ))
    }

    /// Add a control valve. Valves start `Active` (regulating at `setting`).
    pub fn add_valve(
        &mut self,
        name: impl Into<String>,
        start: NodeId,
        end: NodeId,
        kind: ValveKind,
        diameter: Length,
        setting: f64,
    ) -> LinkId {
        self.push_link(
            name,
            start,
            end,
            LinkKind::Valve(Valve {
                kind,
                diameter_m: diameter.value,
                minor_loss: 0.0,
            }),
            LinkStatus::Active,
            setting,
        )
    }

    fn link_mut(&mut self, link: LinkId) -> NetworkResult<&mut Link> {
        self.links.get_mut(link.idx()).ok_or(NetworkError::Unknown {
            kind: "link",
            name: link.to_string(),
        })
    }

    pub fn set_initial_status(&mut self, link: LinkId, status: LinkStatus) -> NetworkResult<()> {
        self.link_mut(link)?.initial_status = status;
        Ok(())
    }

    pub fn set_initial_setting(&mut self, link: LinkId, setting: f64) -> NetworkResult<()> {
        self.link_mut(link)?.initial_setting = setting;
        Ok(())
    }

    /// Minor loss coefficient of a pipe or valve.
    pub fn set_minor_loss(&mut self, link: LinkId, k: f64) -> NetworkResult<()> {
        let l = self.link_mut(link)?;
        match &mut l.kind {
            LinkKind::Pipe(p) => p.minor_loss = k,
            LinkKind::Valve(v) => v.minor_loss = k,
            LinkKind::Pump(_) => {
                return Err(NetworkError::WrongKind {
                    element: l.name.clone(),
                    expected: "pipe or valve",
                });
            }
        }
        Ok(())
    }

    pub fn set_check_valve(&mut self, link: LinkId, check_valve: bool) -> NetworkResult<()> {
        let l = self.link_mut(link)?;
        match &mut l.kind {
            LinkKind::Pipe(p) => {
                p.check_valve = check_valve;
                Ok(())
            }
            _ => Err(NetworkError::WrongKind {
                element: l.name.clone(),
                expected: "pipe",
            }),
        }
    }

    /// Validate and freeze the network.
    pub fn build(self) -> NetworkResult<Network> {
        let node_by_name = index_names("node", self.nodes.iter().map(|n| (&n.name, n.id)))?;
        let link_by_name = index_names("link", self.links.iter().map(|l| (&l.name, l.id)))?;
        let pattern_by_name =
            index_names("pattern", self.patterns.iter().map(|p| (&p.name, p.id)))?;

        validate::validate_elements(&self.nodes, &self.links, &self.patterns)?;
        self.options.validate()?;

        let (node_link_offsets, node_links) = Network::build_adjacency(&self.nodes, &self.links);
        validate::validate_connectivity(&self.nodes, &self.links, &node_link_offsets, &node_links)?;

        debug!(
            nodes = self.nodes.len(),
            links = self.links.len(),
            patterns = self.patterns.len(),
            "network built"
        );

        Ok(Network {
            nodes: self.nodes,
            links: self.links,
            patterns: self.patterns,
            options: self.options,
            node_by_name,
            link_by_name,
            pattern_by_name,
            node_link_offsets,
            node_links,
        })
    }
}

fn index_names<'a, I>(
    kind: &'static str,
    items: impl Iterator<Item = (&'a String, I)>,
) -> NetworkResult<HashMap<String, I>> {
    let mut map = HashMap::new();
    for (name, id) in items {
        if map.insert(name.clone(), id).is_some() {
            return Err(NetworkError::DuplicateName {
                kind,
                name: name.clone(),
            });
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_core::units::{lps, m, m3ps};

    fn two_node() -> NetworkBuilder {
        let mut b = NetworkBuilder::new();
        let r = b.add_reservoir("R", m(50.0), None);
        let j = b.add_junction("J", m(10.0));
        b.add_demand(j, lps(5.0), None).unwrap();
        b.add_pipe("P", r, j, m(1000.0), m(0.3), 100.0);
        b
    }

    #[test]
    fn build_simple() {
        let net = two_node().build().unwrap();
        assert_eq!(net.nodes().len(), 2);
        assert_eq!(net.links().len(), 1);
        let j = net.node_id("J").unwrap();
        let p = net.link_id("P").unwrap();
        assert_eq!(net.links_at(j), &[p]);
        assert!((net.desired_demand(j, 0.0) - 0.005).abs() < 1e-12);
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut b = two_node();
        b.add_junction("J", m(0.0));
        assert!(matches!(
            b.build(),
            Err(NetworkError::DuplicateName { kind: "node", .. })
        ));
    }

    #[test]
    fn demand_on_reservoir_rejected() {
        let mut b = NetworkBuilder::new();
        let r = b.add_reservoir("R", m(5.0), None);
        let err = b.add_demand(r, m3ps(0.1), None).unwrap_err();
        assert!(matches!(err, NetworkError::WrongKind { .. }));
    }

    #[test]
    fn bad_pump_curve_names_the_pump() {
        let mut b = NetworkBuilder::new();
        let r = b.add_reservoir("R", m(5.0), None);
        let j = b.add_junction("J", m(0.0));
        let err = b
            .add_pump("PU1", r, j, &[(m3ps(0.0), m(10.0)), (m3ps(0.1), m(20.0))])
            .unwrap_err();
        assert!(err.to_string().contains("pump PU1"));
    }
}

//! Immutable, validated network.

use std::collections::HashMap;

use serde::Serialize;
use wf_core::{LinkId, NodeId, PatternId};

use crate::elements::{Link, Node, NodeKind};
use crate::error::{NetworkError, NetworkResult};
use crate::options::HydraulicOptions;
use crate::pattern::Pattern;

/// Network description produced by [`crate::NetworkBuilder::build`].
///
/// Node and link ids are dense: `id.idx()` indexes `nodes()` / `links()`.
#[derive(Clone, Debug, Serialize)]
pub struct Network {
    pub(crate) nodes: Vec<Node>,
    pub(crate) links: Vec<Link>,
    pub(crate) patterns: Vec<Pattern>,
    pub(crate) options: HydraulicOptions,
    #[serde(skip)]
    pub(crate) node_by_name: HashMap<String, NodeId>,
    #[serde(skip)]
    pub(crate) link_by_name: HashMap<String, LinkId>,
    #[serde(skip)]
    pub(crate) pattern_by_name: HashMap<String, PatternId>,
    #[serde(skip)]
    pub(crate) node_link_offsets: Vec<usize>,
    #[serde(skip)]
    pub(crate) node_links: Vec<LinkId>,
}

impl Network {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn options(&self) -> &HydraulicOptions {
        &self.options
    }

    /// Replace the run options. The new options are validated first.
    pub fn set_options(&mut self, options: HydraulicOptions) -> NetworkResult<()> {
        options.validate()?;
        self.options = options;
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.idx())
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.idx())
    }

    pub fn pattern(&self, id: PatternId) -> Option<&Pattern> {
        self.patterns.get(id.idx())
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.node_by_name.get(name).copied()
    }

    pub fn link_id(&self, name: &str) -> Option<LinkId> {
        self.link_by_name.get(name).copied()
    }

    pub fn pattern_id(&self, name: &str) -> Option<PatternId> {
        self.pattern_by_name.get(name).copied()
    }

    /// Node lookup that fails with a typed error.
    pub fn require_node(&self, name: &str) -> NetworkResult<NodeId> {
        self.node_id(name).ok_or_else(|| NetworkError::Unknown {
            kind: "node",
            name: name.to_string(),
        })
    }

    pub fn require_link(&self, name: &str) -> NetworkResult<LinkId> {
        self.link_id(name).ok_or_else(|| NetworkError::Unknown {
            kind: "link",
            name: name.to_string(),
        })
    }

    /// Links incident to a node, in id order.
    pub fn links_at(&self, node: NodeId) -> &[LinkId] {
        let i = node.idx();
        match (
            self.node_link_offsets.get(i),
            self.node_link_offsets.get(i + 1),
        ) {
            (Some(&a), Some(&b)) => &self.node_links[a..b],
            _ => &[],
        }
    }

    pub fn tanks(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Tank(_)))
    }

    pub fn junctions(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Junction(_)))
    }

    /// Pattern multiplier at `time_s`; `None` means a constant 1.
    pub fn pattern_multiplier(&self, pattern: Option<PatternId>, time_s: f64) -> f64 {
        pattern
            .and_then(|p| self.pattern(p))
            .map_or(1.0, |p| {
                p.multiplier_at(time_s, self.options.pattern_timestep_s)
            })
    }

    /// Desired (demand-driven) demand of a junction at `time_s`.
    pub fn desired_demand(&self, node: NodeId, time_s: f64) -> f64 {
        let Some(j) = self.node(node).and_then(Node::as_junction) else {
            return 0.0;
        };
        let base: f64 = j
            .demands
            .iter()
            .map(|d| d.base_m3s * self.pattern_multiplier(d.pattern, time_s))
            .sum();
        base * self.options.demand_multiplier
    }

    pub fn has_patterns(&self) -> bool {
        self.patterns.iter().any(|p| p.multipliers.len() > 1)
    }

    /// Rebuild the node -> incident links adjacency in CSR layout.
    pub(crate) fn build_adjacency(nodes: &[Node], links: &[Link]) -> (Vec<usize>, Vec<LinkId>) {
        let mut per_node: Vec<Vec<LinkId>> = vec![Vec::new(); nodes.len()];
        for link in links {
            if let Some(v) = per_node.get_mut(link.start.idx()) {
                v.push(link.id);
            }
            if link.end != link.start
                && let Some(v) = per_node.get_mut(link.end.idx())
            {
                v.push(link.id);
            }
        }

        let mut offsets = Vec::with_capacity(nodes.len() + 1);
        let mut flat = Vec::new();
        offsets.push(0);
        for mut list in per_node {
            list.sort_by_key(|l| l.index());
            flat.extend(list);
            offsets.push(flat.len());
        }
        (offsets, flat)
    }
}

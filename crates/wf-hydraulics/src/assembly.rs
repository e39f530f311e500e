//! Per-step assembly of the hydraulic equations into an algebraic model.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;
use wf_aml::{Expr, Model, ParamId, ScalarFn, VarId};
use wf_core::{LinkStatus, NodeId};
use wf_network::{DemandModel, Link, LinkKind, Network, Node, NodeKind, SimulationState, ValveKind};

use crate::demand::PddCurve;
use crate::error::{HydraulicsError, HydraulicsResult};
use crate::headloss::{SmoothPowerLaw, hw_resistance, minor_loss_resistance};
use crate::leak::LeakCurve;
use crate::pump::PumpGain;
use crate::valve::{open_resistance, throttle_resistance};

/// Where each physical unknown lives in the model.
#[derive(Clone, Debug)]
pub struct ModelIndex {
    /// Head variable per node.
    pub heads: Vec<VarId>,
    /// Flow variable per link.
    pub flows: Vec<VarId>,
    /// Delivered-demand variable per pressure-dependent junction.
    pub demands: Vec<Option<VarId>>,
    /// Leak discharge variable per junction with an active leak.
    pub leaks: Vec<Option<VarId>>,
    /// Demand withdrawn as a constant (demand-driven junctions).
    pub fixed_demands: Vec<f64>,
    /// Desired demand per node at the model time.
    pub desired_demands: Vec<f64>,
    /// Junctions cut off from every fixed-head node by closed links.
    pub isolated: Vec<bool>,
    /// Parameters holding fixed heads, per node.
    pub fixed_heads: Vec<Option<ParamId>>,
}

/// A ready-to-solve model plus its variable index.
#[derive(Debug)]
pub struct HydraulicModel {
    pub model: Model,
    pub index: ModelIndex,
    pub time_s: f64,
}

/// Fixed head of a tank or reservoir; `None` for junctions.
pub fn fixed_head(
    network: &Network,
    state: &SimulationState,
    node: &Node,
    time_s: f64,
) -> Option<f64> {
    match &node.kind {
        NodeKind::Tank(t) => {
            Some(t.elevation_m + state.tank_level(node.id).unwrap_or(t.init_level_m))
        }
        NodeKind::Reservoir(r) => {
            Some(r.base_head_m * network.pattern_multiplier(r.head_pattern, time_s))
        }
        NodeKind::Junction(_) => None,
    }
}

/// Effective status used for assembly; a stopped pump counts as closed.
pub fn assembly_status(link: &Link, state: &SimulationState) -> LinkStatus {
    let Some(ls) = state.link(link.id) else {
        return link.initial_status;
    };
    match &link.kind {
        LinkKind::Pump(_) if ls.setting <= 0.0 => LinkStatus::Closed,
        LinkKind::Pipe(_) | LinkKind::Pump(_) if ls.effective == LinkStatus::Active => {
            LinkStatus::Open
        }
        _ => ls.effective,
    }
}

/// Junctions that no open path connects to a tank or reservoir.
fn isolated_junctions(network: &Network, state: &SimulationState) -> Vec<bool> {
    let n = network.nodes().len();
    let mut reached = vec![false; n];
    let mut queue = VecDeque::new();
    for node in network.nodes() {
        if node.is_fixed_head() {
            reached[node.id.idx()] = true;
            queue.push_back(node.id);
        }
    }
    while let Some(id) = queue.pop_front() {
        for &lid in network.links_at(id) {
            let Some(link) = network.link(lid) else {
                continue;
            };
            if assembly_status(link, state).is_closed() {
                continue;
            }
            let other = if link.start == id { link.end } else { link.start };
            if !reached[other.idx()] {
                reached[other.idx()] = true;
                queue.push_back(other);
            }
        }
    }
    reached.into_iter().map(|r| !r).collect()
}

fn check_state(network: &Network, state: &SimulationState) -> HydraulicsResult<()> {
    let nodes = network.nodes().len();
    let links = network.links().len();
    let dims = [
        ("links", state.links.len(), links),
        ("flows", state.flows_m3s.len(), links),
        ("heads", state.heads_m.len(), nodes),
        ("tank levels", state.tank_levels_m.len(), nodes),
        ("demands", state.demands_m3s.len(), nodes),
        ("leaks", state.leaks_m3s.len(), nodes),
    ];
    for (what, got, expected) in dims {
        if got != expected {
            return Err(HydraulicsError::StateMismatch {
                what: format!("{what}: {got} entries for {expected} elements"),
            });
        }
    }
    Ok(())
}

/// Assemble the equations for `network` in `state` at `time_s`.
///
/// Statuses are read from `state` and never changed here. Initial variable
/// values come from the warm start stored in `state`.
pub fn build_model(
    network: &Network,
    state: &SimulationState,
    time_s: f64,
) -> HydraulicsResult<HydraulicModel> {
    check_state(network, state)?;
    let options = network.options();
    let nodes = network.nodes();
    let links = network.links();
    let isolated = isolated_junctions(network, state);

    let mut model = Model::new();

    // Variables: heads, then flows, then demand and leak unknowns.
    let mut heads = Vec::with_capacity(nodes.len());
    let mut fixed_heads = vec![None; nodes.len()];
    for node in nodes {
        let fixed = fixed_head(network, state, node, time_s);
        let guess = match (fixed, isolated[node.id.idx()]) {
            (Some(h), _) => h,
            (None, true) => node.elevation_m(),
            (None, false) => state.heads_m[node.id.idx()],
        };
        heads.push(model.add_var(format!("head:{}", node.name), guess)?);
        if let Some(h) = fixed {
            let p = model.add_param(format!("fixed_head:{}", node.name), h)?;
            fixed_heads[node.id.idx()] = Some(p);
        }
    }

    let isolated_link = |l: &Link| isolated[l.start.idx()] || isolated[l.end.idx()];
    let mut flows = Vec::with_capacity(links.len());
    for link in links {
        let closed = assembly_status(link, state).is_closed() || isolated_link(link);
        let guess = if closed { 0.0 } else { state.flows_m3s[link.id.idx()] };
        flows.push(model.add_var(format!("flow:{}", link.name), guess)?);
    }

    let mut demands = vec![None; nodes.len()];
    let mut leaks = vec![None; nodes.len()];
    let mut fixed_demands = vec![0.0; nodes.len()];
    let mut desired_demands = vec![0.0; nodes.len()];
    let mut pdd_rows: Vec<(NodeId, VarId, ParamId, PddCurve)> = Vec::new();
    let mut leak_rows: Vec<(NodeId, VarId, LeakCurve)> = Vec::new();

    for node in nodes {
        let Some(j) = node.as_junction() else {
            continue;
        };
        let i = node.id.idx();
        let desired = network.desired_demand(node.id, time_s);
        desired_demands[i] = desired;
        if isolated[i] {
            continue;
        }
        if options.demand_model == DemandModel::PDD && desired > 0.0 {
            let (p0, pf, e) = match &j.pressure_demand {
                Some(pd) => (pd.minimum_m, pd.required_m, pd.exponent),
                None => (
                    options.minimum_pressure_m,
                    options.required_pressure_m,
                    options.pressure_exponent,
                ),
            };
            let warm = state.demands_m3s[i];
            let guess = if warm > 0.0 { warm } else { desired };
            let d = model.add_var(format!("demand:{}", node.name), guess)?;
            let dp = model.add_param(format!("desired_demand:{}", node.name), desired)?;
            demands[i] = Some(d);
            pdd_rows.push((node.id, d, dp, PddCurve::new(p0, pf, e)));
        } else {
            fixed_demands[i] = desired;
        }
        if let Some(leak) = j.leak.as_ref().filter(|l| l.is_active(time_s)) {
            let l = model.add_var(format!("leak:{}", node.name), state.leaks_m3s[i])?;
            leaks[i] = Some(l);
            leak_rows.push((node.id, l, LeakCurve::new(leak)));
        }
    }

    // Node rows.
    for node in nodes {
        let i = node.id.idx();
        let h = heads[i];
        if let Some(p) = fixed_heads[i] {
            let row = Expr::var(h) - Expr::param(p);
            model.add_constraint(format!("fixed:{}", node.name), row)?;
            continue;
        }
        if isolated[i] {
            model.add_constraint(
                format!("isolated:{}", node.name),
                Expr::var(h) - node.elevation_m(),
            )?;
            continue;
        }
        let mut terms = Vec::new();
        for &lid in network.links_at(node.id) {
            let Some(link) = network.link(lid) else {
                continue;
            };
            let q = Expr::var(flows[lid.idx()]);
            if link.end == node.id {
                terms.push(q);
            } else {
                terms.push(-q);
            }
        }
        match demands[i] {
            Some(d) => terms.push(-Expr::var(d)),
            None if fixed_demands[i] != 0.0 => terms.push(Expr::constant(-fixed_demands[i])),
            None => {}
        }
        if let Some(l) = leaks[i] {
            terms.push(-Expr::var(l));
        }
        model.add_constraint(format!("balance:{}", node.name), Expr::sum(terms))?;
    }

    // Link rows.
    let hw: Arc<dyn ScalarFn> = Arc::new(SmoothPowerLaw::hazen_williams());
    let minor: Arc<dyn ScalarFn> = Arc::new(SmoothPowerLaw::minor_loss());
    for link in links {
        let q = flows[link.id.idx()];
        let hs = Expr::var(heads[link.start.idx()]);
        let he = Expr::var(heads[link.end.idx()]);
        let status = assembly_status(link, state);
        let setting = state.links[link.id.idx()].setting;
        let name = format!("link:{}", link.name);

        if status.is_closed() || isolated_link(link) {
            model.add_constraint(name, Expr::var(q))?;
            continue;
        }

        let row = match &link.kind {
            LinkKind::Pipe(p) => {
                let k = hw_resistance(setting, p.diameter_m, p.length_m);
                let mut row = hs - he - Expr::constant(k) * Expr::func(hw.clone(), q);
                if p.minor_loss > 0.0 {
                    let km = minor_loss_resistance(p.minor_loss, p.diameter_m);
                    row = row - Expr::constant(km) * Expr::func(minor.clone(), q);
                }
                row
            }
            LinkKind::Pump(p) => {
                let gain: Arc<dyn ScalarFn> = Arc::new(PumpGain::new(&p.curve, setting));
                he - hs - Expr::func(gain, q)
            }
            LinkKind::Valve(v) => {
                let active = status == LinkStatus::Active;
                match v.kind {
                    ValveKind::Prv if active => {
                        he - (nodes[link.end.idx()].elevation_m() + setting)
                    }
                    ValveKind::Psv if active => {
                        hs - (nodes[link.start.idx()].elevation_m() + setting)
                    }
                    ValveKind::Fcv if active => Expr::var(q) - setting,
                    ValveKind::Tcv if active => {
                        let km = throttle_resistance(v, setting);
                        hs - he - Expr::constant(km) * Expr::func(minor.clone(), q)
                    }
                    _ => {
                        let km = open_resistance(v);
                        hs - he - Expr::constant(km) * Expr::func(minor.clone(), q)
                    }
                }
            }
        };
        model.add_constraint(name, row)?;
    }

    for (node, d, dp, curve) in pdd_rows {
        let n = &nodes[node.idx()];
        let pressure = Expr::var(heads[node.idx()]) - n.elevation_m();
        let row = Expr::var(d) - Expr::param(dp) * Expr::func(Arc::new(curve), pressure);
        model.add_constraint(format!("pdd:{}", n.name), row)?;
    }

    for (node, l, curve) in leak_rows {
        let n = &nodes[node.idx()];
        let pressure = Expr::var(heads[node.idx()]) - n.elevation_m();
        let row = Expr::var(l) - Expr::func(Arc::new(curve), pressure);
        model.add_constraint(format!("leakflow:{}", n.name), row)?;
    }

    debug!(
        time_s,
        variables = model.num_vars(),
        constraints = model.num_constraints(),
        "assembled hydraulic model"
    );

    Ok(HydraulicModel {
        model,
        index: ModelIndex {
            heads,
            flows,
            demands,
            leaks,
            fixed_demands,
            desired_demands,
            isolated,
            fixed_heads,
        },
        time_s,
    })
}

//! Automatic status changes decided from a solved snapshot.
//!
//! Check valves, pumps, regulating valves and links at empty or full tanks
//! switch their *effective* status here. The commanded status is never
//! touched; a link the user closed stays closed.

use tracing::debug;
use wf_core::{LinkId, LinkStatus, NodeId};
use wf_hydraulics::{HydraulicSnapshot, PumpGain};
use wf_network::{Link, LinkKind, LinkState, Network, SimulationState, StatusHold, ValveKind};

/// Head difference treated as zero when switching statuses (m).
pub const HEAD_TOL_M: f64 = 1.5e-4;
/// Flow treated as zero when switching statuses (m³/s).
pub const FLOW_TOL_M3S: f64 = 2.8e-6;
/// Distance from a tank limit that counts as being at it (m).
pub const LEVEL_TOL_M: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusChange {
    pub link: LinkId,
    pub from: LinkStatus,
    pub to: LinkStatus,
    pub hold: Option<StatusHold>,
}

type Decision = (LinkStatus, Option<StatusHold>);

/// Re-decide effective statuses in `state` from `snapshot` and return the
/// links whose effective status changed.
pub fn update_statuses(
    network: &Network,
    state: &mut SimulationState,
    snapshot: &HydraulicSnapshot,
) -> Vec<StatusChange> {
    let mut changes = Vec::new();

    for link in network.links() {
        let Some(&ls) = state.link(link.id) else {
            continue;
        };
        if ls.status.is_closed() || is_tank_hold(ls.hold) {
            continue;
        }
        let hs = snapshot.heads_m[link.start.idx()];
        let he = snapshot.heads_m[link.end.idx()];
        let q = snapshot.flows_m3s[link.id.idx()];
        let decision = match &link.kind {
            LinkKind::Pipe(p) if p.check_valve => check_valve(&ls, hs, he, q),
            LinkKind::Pipe(_) => continue,
            LinkKind::Pump(p) => {
                if ls.setting <= 0.0 {
                    continue;
                }
                let shutoff = PumpGain::new(&p.curve, ls.setting).shutoff_head();
                pump(&ls, he - hs, shutoff, q)
            }
            LinkKind::Valve(v) => {
                if ls.status != LinkStatus::Active {
                    continue;
                }
                let elev_s = network.nodes()[link.start.idx()].elevation_m();
                let elev_e = network.nodes()[link.end.idx()].elevation_m();
                let regime = match v.kind {
                    ValveKind::Prv => prv(ls.effective, hs, he, elev_e + ls.setting, q),
                    ValveKind::Psv => psv(ls.effective, hs, he, elev_s + ls.setting, q),
                    ValveKind::Fcv => fcv(ls.effective, hs, he, ls.setting, q),
                    ValveKind::Tcv => continue,
                };
                let hold = (regime != LinkStatus::Active).then_some(StatusHold::ValveRegime);
                (regime, hold)
            }
        };
        apply(state, link.id, decision, &mut changes);
    }

    for tank in network.tanks() {
        let Some(level) = state.tank_level(tank.id) else {
            continue;
        };
        let Some(t) = tank.as_tank() else {
            continue;
        };
        let empty = level <= t.min_level_m + LEVEL_TOL_M;
        let full = level >= t.max_level_m - LEVEL_TOL_M;
        for &lid in network.links_at(tank.id) {
            let Some(link) = network.link(lid) else {
                continue;
            };
            let Some(&ls) = state.link(lid) else {
                continue;
            };
            if ls.status.is_closed() {
                continue;
            }
            if let Some(decision) = tank_decision(link, &ls, tank.id, empty, full, snapshot) {
                apply(state, lid, decision, &mut changes);
            }
        }
    }

    changes
}

fn is_tank_hold(hold: Option<StatusHold>) -> bool {
    matches!(
        hold,
        Some(StatusHold::TankEmpty(_)) | Some(StatusHold::TankFull(_))
    )
}

fn apply(
    state: &mut SimulationState,
    link: LinkId,
    (to, hold): Decision,
    changes: &mut Vec<StatusChange>,
) {
    let Some(ls) = state.link_mut(link) else {
        return;
    };
    let from = ls.effective;
    ls.effective = to;
    ls.hold = hold;
    if from != to {
        debug!(%link, %from, %to, ?hold, "status change");
        changes.push(StatusChange {
            link,
            from,
            to,
            hold,
        });
    }
}

fn check_valve(ls: &LinkState, hs: f64, he: f64, q: f64) -> Decision {
    if ls.effective.is_closed() {
        if hs - he > HEAD_TOL_M {
            (ls.status, None)
        } else {
            (LinkStatus::Closed, Some(StatusHold::CheckValve))
        }
    } else if q < -FLOW_TOL_M3S {
        (LinkStatus::Closed, Some(StatusHold::CheckValve))
    } else {
        (ls.effective, None)
    }
}

fn pump(ls: &LinkState, rise: f64, shutoff: f64, q: f64) -> Decision {
    if ls.effective.is_closed() {
        if rise < shutoff - HEAD_TOL_M {
            (LinkStatus::Open, None)
        } else {
            (LinkStatus::Closed, ls.hold.or(Some(StatusHold::PumpCannotDeliver)))
        }
    } else if rise > shutoff + HEAD_TOL_M {
        (LinkStatus::Closed, Some(StatusHold::PumpCannotDeliver))
    } else if q < -FLOW_TOL_M3S {
        (LinkStatus::Closed, Some(StatusHold::CheckValve))
    } else {
        (LinkStatus::Open, None)
    }
}

/// Pressure reducing valve; `hset` is the downstream head setpoint.
fn prv(current: LinkStatus, hs: f64, he: f64, hset: f64, q: f64) -> LinkStatus {
    match current {
        LinkStatus::Active if q < -FLOW_TOL_M3S => LinkStatus::Closed,
        LinkStatus::Active if hs < hset - HEAD_TOL_M => LinkStatus::Open,
        LinkStatus::Active => LinkStatus::Active,
        LinkStatus::Open if q < -FLOW_TOL_M3S => LinkStatus::Closed,
        LinkStatus::Open if he > hset + HEAD_TOL_M => LinkStatus::Active,
        LinkStatus::Open => LinkStatus::Open,
        LinkStatus::Closed if hs >= hset + HEAD_TOL_M && he < hset - HEAD_TOL_M => {
            LinkStatus::Active
        }
        LinkStatus::Closed if hs < hset - HEAD_TOL_M && hs > he + HEAD_TOL_M => LinkStatus::Open,
        LinkStatus::Closed => LinkStatus::Closed,
    }
}

/// Pressure sustaining valve; `hset` is the upstream head setpoint.
fn psv(current: LinkStatus, hs: f64, he: f64, hset: f64, q: f64) -> LinkStatus {
    match current {
        LinkStatus::Active if q < -FLOW_TOL_M3S => LinkStatus::Closed,
        LinkStatus::Active if he > hset + HEAD_TOL_M => LinkStatus::Open,
        LinkStatus::Active => LinkStatus::Active,
        LinkStatus::Open if q < -FLOW_TOL_M3S => LinkStatus::Closed,
        LinkStatus::Open if hs < hset - HEAD_TOL_M => LinkStatus::Active,
        LinkStatus::Open => LinkStatus::Open,
        LinkStatus::Closed if hs > hset + HEAD_TOL_M && he < hset - HEAD_TOL_M => {
            LinkStatus::Active
        }
        LinkStatus::Closed if he > hset + HEAD_TOL_M && hs > he + HEAD_TOL_M => LinkStatus::Open,
        LinkStatus::Closed => LinkStatus::Closed,
    }
}

/// Flow control valve; opens fully when upstream head cannot push the
/// setpoint flow through.
fn fcv(current: LinkStatus, hs: f64, he: f64, setting: f64, q: f64) -> LinkStatus {
    match current {
        LinkStatus::Active if hs - he < -HEAD_TOL_M => LinkStatus::Open,
        LinkStatus::Active => LinkStatus::Active,
        LinkStatus::Open if q >= setting - FLOW_TOL_M3S => LinkStatus::Active,
        LinkStatus::Open => LinkStatus::Open,
        LinkStatus::Closed => LinkStatus::Active,
    }
}

/// Close links that would drain an empty tank or overfill a full one, and
/// release them once the flow would reverse or the level leaves the limit.
fn tank_decision(
    link: &Link,
    ls: &LinkState,
    tank: NodeId,
    empty: bool,
    full: bool,
    snapshot: &HydraulicSnapshot,
) -> Option<Decision> {
    let q = snapshot.flows_m3s[link.id.idx()];
    let outflow = if link.start == tank { q } else { -q };
    let other = if link.start == tank { link.end } else { link.start };
    let tank_head = snapshot.heads_m[tank.idx()];
    let other_head = snapshot.heads_m[other.idx()];
    let is_pump = matches!(link.kind, LinkKind::Pump(_));
    let release = (ls.status, None);

    match ls.hold {
        Some(StatusHold::TankEmpty(t)) if t == tank => {
            let refills = if is_pump {
                link.end == tank
            } else {
                other_head > tank_head + HEAD_TOL_M
            };
            Some(if !empty || refills { release } else { (LinkStatus::Closed, ls.hold) })
        }
        Some(StatusHold::TankFull(t)) if t == tank => {
            let drains = if is_pump {
                link.start == tank
            } else {
                other_head < tank_head - HEAD_TOL_M
            };
            Some(if !full || drains { release } else { (LinkStatus::Closed, ls.hold) })
        }
        Some(StatusHold::TankEmpty(_)) | Some(StatusHold::TankFull(_)) => None,
        _ if ls.effective.is_closed() => None,
        _ if empty && outflow > FLOW_TOL_M3S => {
            Some((LinkStatus::Closed, Some(StatusHold::TankEmpty(tank))))
        }
        _ if full && -outflow > FLOW_TOL_M3S => {
            Some((LinkStatus::Closed, Some(StatusHold::TankFull(tank))))
        }
        _ => None,
    }
}

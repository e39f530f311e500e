//! Element and connectivity validation.

use std::collections::VecDeque;

use wf_core::LinkId;

use crate::elements::{Link, LinkKind, Node, NodeKind, ValveKind};
use crate::error::{NetworkError, NetworkResult};
use crate::pattern::Pattern;

fn positive(element: &str, field: &str, v: f64) -> NetworkResult<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(NetworkError::invalid(
            element,
            format!("{field} must be > 0 (got {v})"),
        ))
    }
}

fn finite(element: &str, field: &str, v: f64) -> NetworkResult<()> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(NetworkError::invalid(element, format!("{field} must be finite")))
    }
}

/// Check every element's physical parameters and references.
pub(crate) fn validate_elements(
    nodes: &[Node],
    links: &[Link],
    patterns: &[Pattern],
) -> NetworkResult<()> {
    let pattern_ok = |p: Option<wf_core::PatternId>| p.is_none_or(|p| p.idx() < patterns.len());

    for pattern in patterns {
        if pattern.multipliers.iter().any(|m| !m.is_finite()) {
            return Err(NetworkError::invalid(
                format!("pattern {}", pattern.name),
                "multipliers must be finite",
            ));
        }
    }

    for node in nodes {
        let el = format!("node {}", node.name);
        match &node.kind {
            NodeKind::Junction(j) => {
                finite(&el, "elevation", j.elevation_m)?;
                for d in &j.demands {
                    finite(&el, "base demand", d.base_m3s)?;
                    if !pattern_ok(d.pattern) {
                        return Err(NetworkError::invalid(&el, "unknown demand pattern"));
                    }
                }
                if let Some(pd) = &j.pressure_demand {
                    positive(&el, "pressure exponent", pd.exponent)?;
                    if pd.required_m <= pd.minimum_m {
                        return Err(NetworkError::invalid(
                            &el,
                            "required pressure must exceed minimum pressure",
                        ));
                    }
                }
                if let Some(leak) = &j.leak {
                    positive(&el, "leak area", leak.area_m2)?;
                    positive(&el, "leak discharge coefficient", leak.discharge_coeff)?;
                    positive(&el, "leak exponent", leak.exponent)?;
                    if leak.end_s.is_some_and(|end| end <= leak.start_s) {
                        return Err(NetworkError::invalid(&el, "leak ends before it starts"));
                    }
                }
            }
            NodeKind::Tank(t) => {
                finite(&el, "elevation", t.elevation_m)?;
                positive(&el, "diameter", t.diameter_m)?;
                if !(t.min_level_m >= 0.0
                    && t.min_level_m <= t.init_level_m
                    && t.init_level_m <= t.max_level_m)
                {
                    return Err(NetworkError::invalid(
                        &el,
                        "levels must satisfy 0 <= min <= init <= max",
                    ));
                }
            }
            NodeKind::Reservoir(r) => {
                finite(&el, "head", r.base_head_m)?;
                if !pattern_ok(r.head_pattern) {
                    return Err(NetworkError::invalid(&el, "unknown head pattern"));
                }
            }
        }
    }

    for link in links {
        let el = format!("{} {}", link.kind_name(), link.name);
        if link.start.idx() >= nodes.len() || link.end.idx() >= nodes.len() {
            return Err(NetworkError::invalid(&el, "references a missing node"));
        }
        if link.start == link.end {
            return Err(NetworkError::invalid(&el, "start and end node are the same"));
        }
        finite(&el, "setting", link.initial_setting)?;
        match &link.kind {
            LinkKind::Pipe(p) => {
                positive(&el, "length", p.length_m)?;
                positive(&el, "diameter", p.diameter_m)?;
                positive(&el, "roughness", p.roughness)?;
                if p.minor_loss < 0.0 {
                    return Err(NetworkError::invalid(&el, "minor loss must be >= 0"));
                }
            }
            LinkKind::Pump(_) => {
                positive(&el, "speed", link.initial_setting)?;
            }
            LinkKind::Valve(v) => {
                positive(&el, "diameter", v.diameter_m)?;
                if v.minor_loss < 0.0 {
                    return Err(NetworkError::invalid(&el, "minor loss must be >= 0"));
                }
                if matches!(v.kind, ValveKind::Fcv | ValveKind::Tcv) && link.initial_setting < 0.0
                {
                    return Err(NetworkError::invalid(&el, "setting must be >= 0"));
                }
                let ends_fixed = nodes[link.start.idx()].is_fixed_head()
                    || nodes[link.end.idx()].is_fixed_head();
                if matches!(v.kind, ValveKind::Prv | ValveKind::Psv) && ends_fixed {
                    return Err(NetworkError::invalid(
                        &el,
                        "pressure valves must connect two junctions",
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Every node must reach a fixed-head node through some link.
pub(crate) fn validate_connectivity(
    nodes: &[Node],
    links: &[Link],
    offsets: &[usize],
    node_links: &[LinkId],
) -> NetworkResult<()> {
    let mut seen = vec![false; nodes.len()];
    let mut queue: VecDeque<usize> = VecDeque::new();
    for (i, n) in nodes.iter().enumerate() {
        if n.is_fixed_head() {
            seen[i] = true;
            queue.push_back(i);
        }
    }
    if queue.is_empty() && !nodes.is_empty() {
        return Err(NetworkError::invalid(
            "network",
            "at least one tank or reservoir is required",
        ));
    }

    while let Some(i) = queue.pop_front() {
        for link in &node_links[offsets[i]..offsets[i + 1]] {
            let l = &links[link.idx()];
            let other = if l.start.idx() == i { l.end } else { l.start };
            if !seen[other.idx()] {
                seen[other.idx()] = true;
                queue.push_back(other.idx());
            }
        }
    }

    match seen.iter().position(|s| !s) {
        Some(i) => Err(NetworkError::invalid(
            format!("node {}", nodes[i].name),
            "not connected to any tank or reservoir",
        )),
        None => Ok(()),
    }
}

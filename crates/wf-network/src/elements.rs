//! Network elements. All quantities are plain SI values (m, m², m³/s).

use serde::{Deserialize, Serialize};
use wf_core::{LinkId, LinkStatus, NodeId, PatternId};

use crate::curve::HeadCurve;

/// One base demand with an optional multiplier pattern.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DemandEntry {
    pub base_m3s: f64,
    pub pattern: Option<PatternId>,
}

/// Per-junction overrides for the pressure-dependent demand curve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PressureDemand {
    pub minimum_m: f64,
    pub required_m: f64,
    pub exponent: f64,
}

/// Orifice-type leak: Cd·A·sqrt(2/ρ)·P^α, active on `[start_s, end_s]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Leak {
    pub area_m2: f64,
    pub discharge_coeff: f64,
    pub exponent: f64,
    pub start_s: f64,
    pub end_s: Option<f64>,
}

impl Leak {
    pub fn new(area_m2: f64) -> Self {
        Self {
            area_m2,
            discharge_coeff: 0.75,
            exponent: 0.5,
            start_s: 0.0,
            end_s: None,
        }
    }

    pub fn is_active(&self, time_s: f64) -> bool {
        time_s >= self.start_s && self.end_s.is_none_or(|end| time_s <= end)
    }

    /// First window edge strictly after `time_s`.
    pub fn next_switch(&self, time_s: f64) -> Option<f64> {
        if self.start_s > time_s {
            Some(self.start_s)
        } else {
            self.end_s.filter(|&end| end > time_s)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Junction {
    pub elevation_m: f64,
    pub demands: Vec<DemandEntry>,
    pub pressure_demand: Option<PressureDemand>,
    pub leak: Option<Leak>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tank {
    pub elevation_m: f64,
    pub init_level_m: f64,
    pub min_level_m: f64,
    pub max_level_m: f64,
    pub diameter_m: f64,
}

impl Tank {
    pub fn area_m2(&self) -> f64 {
        std::f64::consts::PI * self.diameter_m * self.diameter_m / 4.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reservoir {
    pub base_head_m: f64,
    pub head_pattern: Option<PatternId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Junction(Junction),
    Tank(Tank),
    Reservoir(Reservoir),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
}

impl Node {
    /// Elevation used to convert head to pressure. A reservoir's is its head.
    pub fn elevation_m(&self) -> f64 {
        match &self.kind {
            NodeKind::Junction(j) => j.elevation_m,
            NodeKind::Tank(t) => t.elevation_m,
            NodeKind::Reservoir(r) => r.base_head_m,
        }
    }

    pub fn as_junction(&self) -> Option<&Junction> {
        match &self.kind {
            NodeKind::Junction(j) => Some(j),
            _ => None,
        }
    }

    pub fn as_tank(&self) -> Option<&Tank> {
        match &self.kind {
            NodeKind::Tank(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_fixed_head(&self) -> bool {
        !matches!(self.kind, NodeKind::Junction(_))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pipe {
    pub length_m: f64,
    pub diameter_m: f64,
    /// Hazen-Williams C.
    pub roughness: f64,
    pub minor_loss: f64,
    pub check_valve: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pump {
    pub curve: HeadCurve,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValveKind {
    /// Pressure reducing: caps downstream pressure at the setting.
    Prv,
    /// Pressure sustaining: holds upstream pressure at the setting.
    Psv,
    /// Flow control: caps flow at the setting.
    Fcv,
    /// Throttle control: setting is a minor loss coefficient.
    Tcv,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Valve {
    pub kind: ValveKind,
    pub diameter_m: f64,
    pub minor_loss: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LinkKind {
    Pipe(Pipe),
    Pump(Pump),
    Valve(Valve),
}

/// A directed two-terminal element. Positive flow runs `start -> end`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub name: String,
    pub start: NodeId,
    pub end: NodeId,
    pub kind: LinkKind,
    pub initial_status: LinkStatus,
    /// Pipe roughness, pump speed, or valve setting.
    pub initial_setting: f64,
}

impl Link {
    pub fn as_pipe(&self) -> Option<&Pipe> {
        match &self.kind {
            LinkKind::Pipe(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_pump(&self) -> Option<&Pump> {
        match &self.kind {
            LinkKind::Pump(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_valve(&self) -> Option<&Valve> {
        match &self.kind {
            LinkKind::Valve(v) => Some(v),
            _ => None,
        }
    }

    /// Pipes with a check valve, and pumps, never carry reverse flow.
    pub fn blocks_reverse_flow(&self) -> bool {
        match &self.kind {
            LinkKind::Pipe(p) => p.check_valve,
            LinkKind::Pump(_) => true,
            LinkKind::Valve(_) => false,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            LinkKind::Pipe(_) => "pipe",
            LinkKind::Pump(_) => "pump",
            LinkKind::Valve(_) => "valve",
        }
    }
}

//! Result data types.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use wf_core::LinkStatus;
use wf_hydraulics::HydraulicSnapshot;
use wf_network::SimulationState;

use crate::hash::compute_run_id;

pub type RunId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub network_fingerprint: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub status: RunStatus,
    pub steps: u64,
}

impl RunManifest {
    /// Manifest stamped with the current time.
    pub fn new(network_fingerprint: impl Into<String>, status: RunStatus, steps: u64) -> Self {
        let network_fingerprint = network_fingerprint.into();
        let now = Utc::now();
        Self {
            run_id: compute_run_id(&network_fingerprint, &now),
            network_fingerprint,
            timestamp: now.to_rfc3339(),
            status,
            steps,
        }
    }
}

/// How a run ended (or paused).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunStatus {
    /// Reached the configured duration.
    Completed,
    /// A time or step budget ran out; the run can be resumed.
    Paused { time_s: f64 },
    /// A step could not converge even at the minimum timestep.
    Failed { time_s: f64, reason: String },
}

impl RunStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, RunStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeValues {
    pub head_m: f64,
    pub pressure_m: f64,
    pub demand_m3s: f64,
    pub leak_m3s: f64,
    /// Reserved for water quality; always 0.
    pub quality: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkValues {
    pub flow_m3s: f64,
    /// Effective status during the step.
    pub status: LinkStatus,
    pub setting: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestepRecord {
    pub time_s: f64,
    pub nodes: Vec<NodeValues>,
    pub links: Vec<LinkValues>,
}

impl TimestepRecord {
    /// Combine a solved snapshot with the link statuses it was solved under.
    pub fn new(snapshot: &HydraulicSnapshot, state: &SimulationState) -> Self {
        let nodes = (0..snapshot.heads_m.len())
            .map(|i| NodeValues {
                head_m: snapshot.heads_m[i],
                pressure_m: snapshot.pressures_m[i],
                demand_m3s: snapshot.demands_m3s[i],
                leak_m3s: snapshot.leaks_m3s[i],
                quality: 0.0,
            })
            .collect();
        let links = snapshot
            .flows_m3s
            .iter()
            .zip(&state.links)
            .map(|(&flow_m3s, ls)| LinkValues {
                flow_m3s,
                status: ls.effective,
                setting: ls.setting,
            })
            .collect();
        Self {
            time_s: snapshot.time_s,
            nodes,
            links,
        }
    }
}

/// Selects one node quantity for a time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeField {
    Head,
    Pressure,
    Demand,
    Leak,
    Quality,
}

impl NodeField {
    pub fn get(self, v: &NodeValues) -> f64 {
        match self {
            NodeField::Head => v.head_m,
            NodeField::Pressure => v.pressure_m,
            NodeField::Demand => v.demand_m3s,
            NodeField::Leak => v.leak_m3s,
            NodeField::Quality => v.quality,
        }
    }
}

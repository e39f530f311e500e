//! In-memory results of one simulation run.

use serde::{Deserialize, Serialize};
use wf_controls::ControlEvent;
use wf_network::Network;

use crate::types::{LinkValues, NodeField, TimestepRecord};
use crate::{ResultsError, ResultsResult};

/// Times closer than this are the same record (s).
const TIME_MATCH_S: f64 = 1e-6;

/// Records in increasing time order, plus the control events that led to
/// them. Node and link vectors are indexed like the network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HydraulicResults {
    pub node_names: Vec<String>,
    pub link_names: Vec<String>,
    pub records: Vec<TimestepRecord>,
    pub control_events: Vec<ControlEvent>,
}

impl HydraulicResults {
    pub fn new(network: &Network) -> Self {
        Self {
            node_names: network.nodes().iter().map(|n| n.name.clone()).collect(),
            link_names: network.links().iter().map(|l| l.name.clone()).collect(),
            records: Vec::new(),
            control_events: Vec::new(),
        }
    }

    /// Append a record. A record at the time of the last one replaces it.
    pub fn push(&mut self, record: TimestepRecord) {
        if let Some(last) = self.records.last_mut()
            && (last.time_s - record.time_s).abs() < TIME_MATCH_S
        {
            *last = record;
            return;
        }
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        self.records.iter().map(|r| r.time_s)
    }

    /// Record at `time_s`, if one was taken.
    pub fn at(&self, time_s: f64) -> Option<&TimestepRecord> {
        let i = self
            .records
            .partition_point(|r| r.time_s < time_s - TIME_MATCH_S);
        self.records
            .get(i)
            .filter(|r| (r.time_s - time_s).abs() < TIME_MATCH_S)
    }

    pub fn last(&self) -> Option<&TimestepRecord> {
        self.records.last()
    }

    fn node_index(&self, name: &str) -> ResultsResult<usize> {
        self.node_names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| ResultsError::UnknownElement {
                kind: "node",
                name: name.to_string(),
            })
    }

    fn link_index(&self, name: &str) -> ResultsResult<usize> {
        self.link_names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| ResultsError::UnknownElement {
                kind: "link",
                name: name.to_string(),
            })
    }

    /// `(time, value)` pairs of one node quantity.
    pub fn node_series(&self, name: &str, field: NodeField) -> ResultsResult<Vec<(f64, f64)>> {
        let i = self.node_index(name)?;
        Ok(self
            .records
            .iter()
            .filter_map(|r| r.nodes.get(i).map(|v| (r.time_s, field.get(v))))
            .collect())
    }

    /// `(time, values)` pairs of one link.
    pub fn link_series(&self, name: &str) -> ResultsResult<Vec<(f64, LinkValues)>> {
        let i = self.link_index(name)?;
        Ok(self
            .records
            .iter()
            .filter_map(|r| r.links.get(i).map(|v| (r.time_s, *v)))
            .collect())
    }

    /// Drop everything after `time_s`.
    pub fn truncate_after(&mut self, time_s: f64) {
        self.records.retain(|r| r.time_s <= time_s + TIME_MATCH_S);
        self.control_events
            .retain(|e| e.time_s <= time_s + TIME_MATCH_S);
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.control_events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeValues;
    use wf_core::LinkStatus;

    fn record(t: f64, head: f64) -> TimestepRecord {
        TimestepRecord {
            time_s: t,
            nodes: vec![NodeValues {
                head_m: head,
                pressure_m: head - 10.0,
                demand_m3s: 0.01,
                leak_m3s: 0.0,
                quality: 0.0,
            }],
            links: vec![LinkValues {
                flow_m3s: 0.01,
                status: LinkStatus::Open,
                setting: 120.0,
            }],
        }
    }

    fn results() -> HydraulicResults {
        HydraulicResults {
            node_names: vec!["J".into()],
            link_names: vec!["P".into()],
            ..Default::default()
        }
    }

    #[test]
    fn lookup_by_time_and_series() {
        let mut r = results();
        for (i, t) in [0.0, 1800.0, 3600.0].into_iter().enumerate() {
            r.push(record(t, 50.0 - i as f64));
        }
        assert_eq!(r.len(), 3);
        assert_eq!(r.at(1800.0).unwrap().nodes[0].head_m, 49.0);
        assert!(r.at(900.0).is_none());
        assert_eq!(
            r.node_series("J", NodeField::Pressure).unwrap(),
            vec![(0.0, 40.0), (1800.0, 39.0), (3600.0, 38.0)]
        );
        assert_eq!(r.link_series("P").unwrap().len(), 3);
        assert!(matches!(
            r.node_series("X", NodeField::Head),
            Err(ResultsError::UnknownElement { kind: "node", .. })
        ));
    }

    #[test]
    fn same_time_replaces_and_truncate() {
        let mut r = results();
        r.push(record(0.0, 50.0));
        r.push(record(0.0, 51.0));
        r.push(record(3600.0, 52.0));
        assert_eq!(r.len(), 2);
        assert_eq!(r.at(0.0).unwrap().nodes[0].head_m, 51.0);
        r.truncate_after(0.0);
        assert_eq!(r.len(), 1);
    }
}

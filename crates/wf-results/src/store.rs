//! Run storage API.
//!
//! One directory per run:
//! - `manifest.json`
//! - `results.json` (element names and control events)
//! - `timeseries.jsonl` (one [`TimestepRecord`] per line)
//! - `checkpoint.json` (optional)

use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use wf_controls::ControlEvent;

use crate::results::HydraulicResults;
use crate::types::{RunManifest, TimestepRecord};
use crate::{ResultsError, ResultsResult};

#[derive(Clone, Debug)]
pub struct RunStore {
    root_dir: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct ResultsHeader {
    node_names: Vec<String>,
    link_names: Vec<String>,
    control_events: Vec<ControlEvent>,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    fn existing(&self, run_id: &str, file: &str) -> ResultsResult<PathBuf> {
        let path = self.run_dir(run_id).join(file);
        if path.exists() {
            Ok(path)
        } else {
            Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            })
        }
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join("manifest.json").exists()
    }

    pub fn save_run(&self, manifest: &RunManifest, results: &HydraulicResults) -> ResultsResult<()> {
        let run_dir = self.run_dir(&manifest.run_id);
        fs::create_dir_all(&run_dir)?;

        fs::write(
            run_dir.join("manifest.json"),
            serde_json::to_string_pretty(manifest)?,
        )?;

        let header = ResultsHeader {
            node_names: results.node_names.clone(),
            link_names: results.link_names.clone(),
            control_events: results.control_events.clone(),
        };
        fs::write(run_dir.join("results.json"), serde_json::to_string(&header)?)?;

        let mut timeseries = String::new();
        for record in &results.records {
            timeseries.push_str(&serde_json::to_string(record)?);
            timeseries.push('\n');
        }
        fs::write(run_dir.join("timeseries.jsonl"), timeseries)?;

        Ok(())
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let content = fs::read_to_string(self.existing(run_id, "manifest.json")?)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load_timeseries(&self, run_id: &str) -> ResultsResult<Vec<TimestepRecord>> {
        let content = fs::read_to_string(self.existing(run_id, "timeseries.jsonl")?)?;
        let mut records = Vec::new();
        for line in content.lines() {
            if !line.trim().is_empty() {
                records.push(serde_json::from_str(line)?);
            }
        }
        Ok(records)
    }

    pub fn load_results(&self, run_id: &str) -> ResultsResult<HydraulicResults> {
        let content = fs::read_to_string(self.existing(run_id, "results.json")?)?;
        let header: ResultsHeader = serde_json::from_str(&content)?;
        Ok(HydraulicResults {
            node_names: header.node_names,
            link_names: header.link_names,
            records: self.load_timeseries(run_id)?,
            control_events: header.control_events,
        })
    }

    pub fn save_checkpoint<T: Serialize>(&self, run_id: &str, checkpoint: &T) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        fs::create_dir_all(&run_dir)?;
        fs::write(
            run_dir.join("checkpoint.json"),
            serde_json::to_string(checkpoint)?,
        )?;
        Ok(())
    }

    pub fn load_checkpoint<T: DeserializeOwned>(&self, run_id: &str) -> ResultsResult<T> {
        let content = fs::read_to_string(self.existing(run_id, "checkpoint.json")?)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Manifests of every stored run of the network with this fingerprint.
    pub fn list_runs(&self, network_fingerprint: &str) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();

        if !self.root_dir.exists() {
            return Ok(runs);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let run_id = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&run_id)
                    && manifest.network_fingerprint == network_fingerprint
                {
                    runs.push(manifest);
                }
            }
        }
        runs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }
}

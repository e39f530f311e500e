//! Independent scenarios run in parallel.

use rayon::prelude::*;
use tracing::info;
use wf_controls::Control;
use wf_network::Network;
use wf_results::HydraulicResults;

use crate::error::SimResult;
use crate::report::RunReport;
use crate::simulator::HydraulicSimulator;

/// One member of an ensemble. Each scenario owns its inputs, so runs share
/// nothing.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub network: Network,
    pub controls: Vec<Control>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, network: Network, controls: Vec<Control>) -> Self {
        Self {
            name: name.into(),
            network,
            controls,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: String,
    pub report: RunReport,
    pub results: HydraulicResults,
}

/// Run every scenario to completion on the rayon pool. Output order matches
/// input order.
pub fn run_ensemble(scenarios: Vec<Scenario>) -> Vec<SimResult<ScenarioReport>> {
    info!(scenarios = scenarios.len(), "running ensemble");
    scenarios
        .into_par_iter()
        .map(|scenario| {
            let mut sim = HydraulicSimulator::new(&scenario.network, scenario.controls)?;
            let report = sim.run()?;
            Ok(ScenarioReport {
                name: scenario.name,
                report,
                results: sim.results().clone(),
            })
        })
        .collect()
}

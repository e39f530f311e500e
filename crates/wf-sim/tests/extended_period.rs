//! Multi-step runs: controls, reset, pause/resume, checkpoints, ensembles.

use wf_controls::{Action, Comparison, Condition, Control, LinkChange};
use wf_core::LinkStatus;
use wf_core::units::{lps, m};
use wf_network::{DemandModel, Network, NetworkBuilder};
use wf_results::NodeField;
use wf_sim::{
    Checkpoint, HydraulicSimulator, RunStatus, Scenario, SimError, SimPhase, run_ensemble,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Reservoir feeding two junctions through a loop; J1 demand follows a
/// three-hour pattern.
fn looped(duration_s: f64, demand_lps: f64) -> Network {
    let mut b = NetworkBuilder::new();
    b.options_mut().duration_s = duration_s;
    let pat = b.add_pattern("diurnal", vec![1.0, 1.5, 0.5]);
    let r = b.add_reservoir("R", m(60.0), None);
    let j1 = b.add_junction("J1", m(10.0));
    let j2 = b.add_junction("J2", m(5.0));
    b.add_demand(j1, lps(demand_lps), Some(pat)).unwrap();
    b.add_demand(j2, lps(5.0), None).unwrap();
    b.add_pipe("P1", r, j1, m(1000.0), m(0.3), 120.0);
    b.add_pipe("P2", j1, j2, m(500.0), m(0.2), 120.0);
    b.add_pipe("P3", r, j2, m(1500.0), m(0.2), 110.0);
    b.build().unwrap()
}

fn close_p3_at(net: &Network, seconds: f64) -> Vec<Control> {
    let p3 = net.link_id("P3").unwrap();
    vec![Control::new(
        "close-p3",
        Condition::SimTime {
            op: Comparison::Eq,
            seconds,
        },
        vec![Action::status(p3, LinkStatus::Closed)],
    )]
}

#[test]
fn single_pipe_keeps_mass_balance_every_step() {
    init_tracing();
    let mut b = NetworkBuilder::new();
    let r = b.add_reservoir("R", m(60.0), None);
    let j = b.add_junction("J", m(10.0));
    b.add_demand(j, lps(20.0), None).unwrap();
    b.add_pipe("P", r, j, m(1000.0), m(0.3), 120.0);
    let net = b.build().unwrap();

    let mut sim = HydraulicSimulator::new(&net, Vec::new()).unwrap();
    let report = sim.run().unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.phase, SimPhase::Finished);
    assert_eq!(report.steps, 25);
    let results = sim.results();
    let times: Vec<f64> = results.times().collect();
    assert_eq!(times.first(), Some(&0.0));
    assert_eq!(times.last(), Some(&86_400.0));
    for rec in &results.records {
        let residual = rec.links[0].flow_m3s - rec.nodes[j.idx()].demand_m3s;
        assert!(residual.abs() < 1e-6);
    }
}

#[test]
fn sim_time_control_fires_once_in_ten_days() {
    init_tracing();
    let net = looped(10.0 * 86_400.0, 10.0);
    let controls = close_p3_at(&net, 435_600.0);
    let mut sim = HydraulicSimulator::new(&net, controls).unwrap();
    let report = sim.run().unwrap();
    assert_eq!(report.status, RunStatus::Completed);

    let events = &sim.results().control_events;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].time_s, 435_600.0);
    assert_eq!(events[0].after, LinkChange::Status(LinkStatus::Closed));

    let p3 = sim.results().link_series("P3").unwrap();
    for (t, v) in p3 {
        if t < 435_600.0 {
            assert_eq!(v.status, LinkStatus::Open);
            assert!(v.flow_m3s > 0.0);
        } else {
            assert_eq!(v.status, LinkStatus::Closed);
            assert!(v.flow_m3s.abs() < 1e-12);
        }
    }
}

#[test]
fn patterns_drive_demand() {
    let net = looped(6.0 * 3600.0, 10.0);
    let mut sim = HydraulicSimulator::new(&net, Vec::new()).unwrap();
    sim.run().unwrap();
    let demand: Vec<f64> = sim
        .results()
        .node_series("J1", NodeField::Demand)
        .unwrap()
        .into_iter()
        .map(|(_, d)| d)
        .collect();
    let expected = [0.01, 0.015, 0.005, 0.01, 0.015, 0.005, 0.01];
    assert_eq!(demand.len(), expected.len());
    for (d, e) in demand.iter().zip(expected) {
        assert!((d - e).abs() < 1e-12);
    }
}

#[test]
fn reset_reproduces_identical_results() {
    let net = looped(86_400.0, 10.0);
    let mut sim = HydraulicSimulator::new(&net, close_p3_at(&net, 36_000.0)).unwrap();
    let first_report = sim.run().unwrap();
    let first = sim.results().clone();

    sim.reset_initial_values();
    assert_eq!(sim.phase(), SimPhase::Initializing);
    assert!(sim.results().is_empty());
    assert_eq!(sim.state().time_s, 0.0);

    let second_report = sim.run().unwrap();
    assert_eq!(first_report, second_report);
    assert_eq!(&first, sim.results());
}

#[test]
fn pause_and_resume_match_uninterrupted_run() {
    let net = looped(86_400.0, 10.0);
    let controls = close_p3_at(&net, 36_000.0);

    let mut whole = HydraulicSimulator::new(&net, controls.clone()).unwrap();
    whole.run().unwrap();

    let mut paused = HydraulicSimulator::new(&net, controls).unwrap();
    let report = paused.run_for(7200.0).unwrap();
    assert_eq!(report.status, RunStatus::Paused { time_s: 7200.0 });
    assert_eq!(paused.phase(), SimPhase::Paused);
    assert_eq!(paused.results().len(), 3);

    let report = paused.run_for(10_800.0).unwrap();
    assert_eq!(report.time_s, 18_000.0);
    let report = paused.run().unwrap();
    assert_eq!(report.status, RunStatus::Completed);

    assert_eq!(whole.results(), paused.results());
    assert_eq!(whole.state(), paused.state());
}

#[test]
fn checkpoint_round_trips_through_json() {
    let net = looped(86_400.0, 10.0);
    let controls = close_p3_at(&net, 36_000.0);

    let mut whole = HydraulicSimulator::new(&net, controls.clone()).unwrap();
    whole.run().unwrap();

    let mut first = HydraulicSimulator::new(&net, controls.clone()).unwrap();
    first.run_for(10.0 * 3600.0).unwrap();
    let json = serde_json::to_string(&first.checkpoint()).unwrap();
    let checkpoint: Checkpoint = serde_json::from_str(&json).unwrap();
    assert_eq!(checkpoint, first.checkpoint());

    let mut resumed = HydraulicSimulator::resume_from(&net, controls, checkpoint).unwrap();
    resumed.run().unwrap();
    assert_eq!(whole.results(), resumed.results());

    // a different network is rejected
    let other = looped(86_400.0, 12.0);
    let err = HydraulicSimulator::resume_from(
        &other,
        close_p3_at(&other, 36_000.0),
        first.checkpoint(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, SimError::FingerprintMismatch { .. }));
}

#[test]
fn pdd_with_ample_pressure_matches_demand_driven() {
    let build = |model: DemandModel| {
        let mut b = NetworkBuilder::new();
        b.options_mut().duration_s = 3.0 * 3600.0;
        b.options_mut().demand_model = model;
        b.options_mut().minimum_pressure_m = 0.0;
        b.options_mut().required_pressure_m = 1e-3;
        let pat = b.add_pattern("p", vec![1.0, 2.0]);
        let r = b.add_reservoir("R", m(80.0), None);
        let j = b.add_junction("J", m(10.0));
        b.add_demand(j, lps(8.0), Some(pat)).unwrap();
        b.add_pipe("P", r, j, m(800.0), m(0.25), 120.0);
        b.build().unwrap()
    };
    let dd = build(DemandModel::DD);
    let pdd = build(DemandModel::PDD);
    let mut a = HydraulicSimulator::new(&dd, Vec::new()).unwrap();
    let mut b = HydraulicSimulator::new(&pdd, Vec::new()).unwrap();
    a.run().unwrap();
    b.run().unwrap();

    for (x, y) in a.results().records.iter().zip(&b.results().records) {
        assert_eq!(x.time_s, y.time_s);
        for (nx, ny) in x.nodes.iter().zip(&y.nodes) {
            assert!((nx.head_m - ny.head_m).abs() < 1e-5);
            assert!((nx.demand_m3s - ny.demand_m3s).abs() < 1e-8);
        }
    }
}

#[test]
fn ensemble_runs_independent_scenarios() {
    let scenarios: Vec<Scenario> = [5.0, 10.0, 15.0]
        .into_iter()
        .map(|q| {
            let net = looped(4.0 * 3600.0, q);
            Scenario::new(format!("q{q}"), net, Vec::new())
        })
        .collect();
    let out = run_ensemble(scenarios);
    assert_eq!(out.len(), 3);

    let mut previous_head = f64::INFINITY;
    for (report, name) in out.iter().zip(["q5", "q10", "q15"]) {
        let report = report.as_ref().unwrap();
        assert_eq!(report.name, name);
        assert_eq!(report.report.status, RunStatus::Completed);
        // more demand, lower head at J1
        let head = report.results.records[0].nodes[1].head_m;
        assert!(head < previous_head);
        previous_head = head;
    }
}

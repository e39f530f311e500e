//! Building small networks end to end.

use wf_core::LinkStatus;
use wf_core::units::{lps, m, m2, m3ps};
use wf_network::{
    DemandModel, HydraulicOptions, NetworkBuilder, NetworkError, SimulationState, ValveKind,
};

#[test]
fn looped_network_with_all_element_kinds() {
    let mut b = NetworkBuilder::new();
    let day = b.add_pattern("day", vec![0.6, 1.0, 1.4]);
    let r = b.add_reservoir("R1", m(20.0), None);
    let t = b.add_tank("T1", m(40.0), m(3.0), m(0.5), m(6.0), m(12.0));
    let j1 = b.add_junction("J1", m(5.0));
    let j2 = b.add_junction("J2", m(4.0));
    let j3 = b.add_junction("J3", m(3.0));
    b.add_demand(j2, lps(8.0), Some(day)).unwrap();
    b.add_demand(j3, lps(2.0), None).unwrap();
    b.add_leak(j3, m2(1e-4), 0.0, None).unwrap();
    b.set_pressure_demand(j2, m(0.0), m(15.0), 0.5).unwrap();

    b.add_pump("PU1", r, j1, &[(m3ps(0.02), m(45.0))]).unwrap();
    let p1 = b.add_pipe("P1", j1, j2, m(500.0), m(0.2), 110.0);
    b.add_pipe("P2", j2, j3, m(400.0), m(0.15), 100.0);
    b.add_pipe("P3", j3, j1, m(600.0), m(0.15), 100.0);
    let v = b.add_valve("V1", j1, j3, ValveKind::Prv, m(0.1), 25.0);
    b.add_pipe("P4", j1, t, m(300.0), m(0.25), 120.0);
    b.set_check_valve(p1, true).unwrap();

    let net = b.build().unwrap();
    assert_eq!(net.nodes().len(), 5);
    assert_eq!(net.links().len(), 6);
    assert_eq!(net.links_at(j1).len(), 5);
    assert_eq!(net.link(v).unwrap().initial_status, LinkStatus::Active);
    assert!((net.desired_demand(j2, 3600.0) - 0.008).abs() < 1e-12);
    assert!((net.desired_demand(j2, 7200.0) - 0.0112).abs() < 1e-12);

    let state = SimulationState::initial(&net);
    let json = serde_json::to_string(&state).unwrap();
    let back: SimulationState = serde_json::from_str(&json).unwrap();
    assert_eq!(back, state);
}

#[test]
fn options_from_yaml_feed_the_builder() {
    let opts = HydraulicOptions::from_yaml_str(
        "duration_s: 7200\ntimestep_s: 600\ndemand_model: PDD\nrequired_pressure_m: 12\n",
    )
    .unwrap();
    let mut b = NetworkBuilder::new();
    b.options(opts);
    let r = b.add_reservoir("R", m(30.0), None);
    let j = b.add_junction("J", m(0.0));
    b.add_pipe("P", r, j, m(100.0), m(0.2), 120.0);
    let net = b.build().unwrap();
    assert_eq!(net.options().demand_model, DemandModel::PDD);
    assert_eq!(net.options().timestep_s, 600.0);
}

#[test]
fn invalid_options_fail_the_build() {
    let mut b = NetworkBuilder::new();
    b.options_mut().timestep_s = 0.0;
    let r = b.add_reservoir("R", m(30.0), None);
    let j = b.add_junction("J", m(0.0));
    b.add_pipe("P", r, j, m(100.0), m(0.2), 120.0);
    let err = b.build().unwrap_err();
    assert!(matches!(err, NetworkError::Validation { .. }));
}

//! Steps that land on leak windows and tank limits, and a heavily loaded
//! pressure-dependent grid.

use std::f64::consts::PI;

use wf_core::units::{lps, m, m2};
use wf_network::{DemandModel, NetworkBuilder};
use wf_results::NodeField;
use wf_sim::{HydraulicSimulator, RunStatus};

#[test]
fn leak_window_edges_are_steps() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut b = NetworkBuilder::new();
    b.options_mut().duration_s = 3.0 * 3600.0;
    let r = b.add_reservoir("R", m(60.0), None);
    let j = b.add_junction("J", m(10.0));
    b.add_demand(j, lps(5.0), None).unwrap();
    b.add_leak(j, m2(1e-4), 5400.0, Some(9000.0)).unwrap();
    b.add_pipe("P", r, j, m(500.0), m(0.2), 120.0);
    let net = b.build().unwrap();

    let mut sim = HydraulicSimulator::new(&net, Vec::new()).unwrap();
    assert_eq!(sim.run().unwrap().status, RunStatus::Completed);

    let leak = sim.results().node_series("J", NodeField::Leak).unwrap();
    let times: Vec<f64> = leak.iter().map(|(t, _)| *t).collect();
    assert_eq!(times, vec![0.0, 3600.0, 5400.0, 7200.0, 9000.0, 10_800.0]);
    for (t, q) in &leak {
        if (5400.0..=9000.0).contains(t) {
            assert!(*q > 1e-3, "no leak at {t}");
        } else {
            assert_eq!(*q, 0.0, "leak at {t}");
        }
    }
}

#[test]
fn step_after_tank_event_returns_to_the_grid() {
    // empties half a second before the first hydraulic boundary
    let rate = 0.001 / PI;
    let mut b = NetworkBuilder::new();
    b.options_mut().duration_s = 3.0 * 3600.0;
    let t = b.add_tank("T", m(20.0), m(3599.5 * rate), m(0.0), m(6.0), m(2.0));
    let j = b.add_junction("J", m(0.0));
    b.add_demand(j, lps(1.0), None).unwrap();
    b.add_pipe("P", t, j, m(100.0), m(0.1), 120.0);
    let net = b.build().unwrap();

    let mut sim = HydraulicSimulator::new(&net, Vec::new()).unwrap();
    assert_eq!(sim.run().unwrap().status, RunStatus::Completed);

    let times: Vec<f64> = sim.results().times().collect();
    let expected = [0.0, 3599.5, 3600.0, 7200.0, 10_800.0];
    assert_eq!(times.len(), expected.len(), "{times:?}");
    for (got, want) in times.iter().zip(expected) {
        assert!((got - want).abs() < 1e-6, "{times:?}");
    }
}

#[test]
fn loaded_pdd_grid_completes() {
    const N: usize = 8;
    let mut b = NetworkBuilder::new();
    b.options_mut().duration_s = 4.0 * 3600.0;
    b.options_mut().demand_model = DemandModel::PDD;
    b.options_mut().minimum_pressure_m = 0.0;
    b.options_mut().required_pressure_m = 20.0;
    let pat = b.add_pattern("load", vec![0.5, 1.0, 1.5, 1.0]);
    let r = b.add_reservoir("R", m(30.0), None);
    let mut grid = Vec::with_capacity(N * N);
    for row in 0..N {
        for col in 0..N {
            let j = b.add_junction(format!("J{row}_{col}"), m(0.0));
            b.add_demand(j, lps(1.0), Some(pat)).unwrap();
            grid.push(j);
        }
    }
    b.add_pipe("feed", r, grid[0], m(100.0), m(0.3), 120.0);
    for row in 0..N {
        for col in 0..N {
            let here = grid[row * N + col];
            if col + 1 < N {
                let east = grid[row * N + col + 1];
                b.add_pipe(format!("H{row}_{col}"), here, east, m(100.0), m(0.15), 100.0);
            }
            if row + 1 < N {
                let south = grid[(row + 1) * N + col];
                b.add_pipe(format!("V{row}_{col}"), here, south, m(100.0), m(0.15), 100.0);
            }
        }
    }
    let net = b.build().unwrap();

    let mut sim = HydraulicSimulator::new(&net, Vec::new()).unwrap();
    let report = sim.run().unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.backoffs, 0);

    let times: Vec<f64> = sim.results().times().collect();
    assert_eq!(times, vec![0.0, 3600.0, 7200.0, 10_800.0, 14_400.0]);
    for rec in &sim.results().records {
        let mut delivered = 0.0;
        for &j in &grid {
            let d = rec.nodes[j.idx()].demand_m3s;
            let desired = net.desired_demand(j, rec.time_s);
            assert!(d > -1e-9 && d <= desired + 1e-9, "{d} of {desired}");
            delivered += d;
        }
        // everything delivered comes through the feed
        assert!((rec.links[0].flow_m3s - delivered).abs() < 1e-4);
    }
}

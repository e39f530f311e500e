//! Timestep halving on convergence failures.

use std::cell::Cell;

use wf_aml::{AmlError, Model};
use wf_core::units::{lps, m};
use wf_network::{Network, NetworkBuilder};
use wf_results::RunStore;
use wf_sim::{HydraulicSimulator, RunStatus, SimError, SimPhase};
use wf_solver::{NewtonResult, NewtonSolver, SolverError, SolverResult, StepSolver};

/// Fails the solve calls whose 1-based number is in `fail_on`, or every
/// call after the first when `fail_after_first` is set.
struct FlakySolver {
    inner: NewtonSolver,
    calls: Cell<usize>,
    fail_on: Vec<usize>,
    fail_after_first: bool,
}

impl FlakySolver {
    fn failing(fail_on: Vec<usize>) -> Self {
        Self {
            inner: NewtonSolver::default(),
            calls: Cell::new(0),
            fail_on,
            fail_after_first: false,
        }
    }

    fn broken_after_first() -> Self {
        Self {
            fail_after_first: true,
            ..Self::failing(Vec::new())
        }
    }
}

impl StepSolver for FlakySolver {
    fn solve(&self, model: &mut Model) -> SolverResult<NewtonResult> {
        let n = self.calls.get() + 1;
        self.calls.set(n);
        if self.fail_on.contains(&n) || (self.fail_after_first && n > 1) {
            return Err(SolverError::MaxIterationsExceeded {
                iterations: 0,
                residual: 1.0,
            });
        }
        self.inner.solve(model)
    }
}

/// Solves once, then reports a structural model error.
struct StructurallyBroken {
    inner: NewtonSolver,
    calls: Cell<usize>,
}

impl StepSolver for StructurallyBroken {
    fn solve(&self, model: &mut Model) -> SolverResult<NewtonResult> {
        let n = self.calls.get() + 1;
        self.calls.set(n);
        if n > 1 {
            return Err(AmlError::StructureNotSet.into());
        }
        self.inner.solve(model)
    }
}

fn single_pipe() -> Network {
    let mut b = NetworkBuilder::new();
    b.options_mut().duration_s = 7200.0;
    let r = b.add_reservoir("R", m(50.0), None);
    let j = b.add_junction("J", m(0.0));
    b.add_demand(j, lps(10.0), None).unwrap();
    b.add_pipe("P", r, j, m(500.0), m(0.2), 130.0);
    b.build().unwrap()
}

#[test]
fn failed_attempts_halve_then_realign() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let net = single_pipe();
    // call 1 is the t = 0 solve; calls 2 and 3 are the 3600 s and 1800 s tries
    let mut sim = HydraulicSimulator::new(&net, Vec::new())
        .unwrap()
        .with_solver(Box::new(FlakySolver::failing(vec![2, 3])));
    let report = sim.run().unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.backoffs, 2);
    let times: Vec<f64> = sim.results().times().collect();
    assert_eq!(times, vec![0.0, 900.0, 3600.0, 7200.0]);
    assert_eq!(report.steps, 4);
}

#[test]
fn failure_at_minimum_timestep_stops_the_run() {
    let net = single_pipe();
    let mut sim = HydraulicSimulator::new(&net, Vec::new())
        .unwrap()
        .with_solver(Box::new(FlakySolver::broken_after_first()));
    let report = sim.run().unwrap();

    match &report.status {
        RunStatus::Failed { time_s, reason } => {
            assert_eq!(*time_s, 0.0);
            assert!(reason.contains("did not converge"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(report.phase, SimPhase::Failed);
    // 3600 s halves down to 1.76 s before dropping below 1 s
    assert_eq!(report.backoffs, 11);
    assert_eq!(sim.results().len(), 1);

    // a failed run stays failed
    let again = sim.run().unwrap();
    assert_eq!(again, report);

    // the failure is stored with the run
    let dir = std::env::temp_dir().join("wf_sim_failed_run");
    let _ = std::fs::remove_dir_all(&dir);
    let store = RunStore::new(dir.clone()).unwrap();
    let manifest = sim.save(&store, &report).unwrap();
    assert!(store.load_manifest(&manifest.run_id).unwrap().status.is_failed());
    assert_eq!(store.load_results(&manifest.run_id).unwrap(), *sim.results());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn structural_errors_are_not_retried() {
    let net = single_pipe();
    let mut sim = HydraulicSimulator::new(&net, Vec::new())
        .unwrap()
        .with_solver(Box::new(StructurallyBroken {
            inner: NewtonSolver::default(),
            calls: Cell::new(0),
        }));
    let err = sim.run().unwrap_err();
    assert!(matches!(err, SimError::Solver(SolverError::Model(_))));
}

//! Extended-period hydraulic simulation loop.

use tracing::{debug, error, info, warn};
use wf_controls::{
    Control, ControlConflict, ControlContext, ControlEngine, ControlEvent, NetworkView, StateView,
    apply_actions, update_statuses,
};
use wf_hydraulics::{HydraulicSnapshot, build_model, extract_snapshot};
use wf_network::pattern::next_boundary;
use wf_network::{Network, SimulationState};
use wf_results::{
    HydraulicResults, RunManifest, RunStatus, RunStore, TimestepRecord, compute_fingerprint,
};
use wf_solver::{NewtonConfig, NewtonSolver, SolverError, StepSolver};

use crate::checkpoint::Checkpoint;
use crate::error::{SimError, SimResult};
use crate::report::{RunReport, SimPhase};

/// Times closer than this are treated as equal (s).
const TIME_EPS_S: f64 = 1e-6;
/// Levels closer than this to a tank limit count as at the limit (m).
const LEVEL_EPS_M: f64 = 1e-6;

/// Drives a network through time: advance tanks, apply controls, solve,
/// check statuses, commit.
///
/// ```text
/// Initializing -> Stepping -> Converged -> Stepping ... -> Finished
///                          -> Backoff   -> Stepping
///                          -> Failed
/// ```
pub struct HydraulicSimulator {
    network: Network,
    engine: ControlEngine,
    solver: Box<dyn StepSolver>,
    fingerprint: String,
    initial: SimulationState,
    state: SimulationState,
    results: HydraulicResults,
    phase: SimPhase,
    backoffs: u64,
    conflicts: Vec<ControlConflict>,
    failure: Option<(f64, String)>,
}

/// A step that converged but is not yet committed.
struct Solved {
    state: SimulationState,
    snapshot: HydraulicSnapshot,
    events: Vec<ControlEvent>,
    conflicts: Vec<ControlConflict>,
}

enum StepOutcome {
    Committed,
    Failed,
}

impl HydraulicSimulator {
    /// Validate `controls` against `network` and set up a run from the
    /// network's initial conditions.
    pub fn new(network: &Network, controls: Vec<Control>) -> SimResult<Self> {
        let engine = ControlEngine::new(network, controls)?;
        let fingerprint = compute_fingerprint(&(network, engine.controls()))?;
        let options = network.options();
        let solver = NewtonSolver::new(NewtonConfig {
            max_iterations: options.max_iterations,
            tolerance: options.accuracy,
            max_backtracks: options.max_backtracks,
        });
        let initial = SimulationState::initial(network);
        Ok(Self {
            network: network.clone(),
            engine,
            solver: Box::new(solver),
            fingerprint,
            state: initial.clone(),
            initial,
            results: HydraulicResults::new(network),
            phase: SimPhase::Initializing,
            backoffs: 0,
            conflicts: Vec::new(),
            failure: None,
        })
    }

    /// Replace the per-step solver.
    pub fn with_solver(mut self, solver: Box<dyn StepSolver>) -> Self {
        self.solver = solver;
        self
    }

    /// Continue a checkpointed run. Fails if `network` and `controls` are
    /// not the ones the checkpoint was taken from.
    pub fn resume_from(
        network: &Network,
        controls: Vec<Control>,
        checkpoint: Checkpoint,
    ) -> SimResult<Self> {
        let mut sim = Self::new(network, controls)?;
        if sim.fingerprint != checkpoint.fingerprint {
            return Err(SimError::FingerprintMismatch {
                expected: sim.fingerprint,
                found: checkpoint.fingerprint,
            });
        }
        if checkpoint.state.links.len() != network.links().len()
            || checkpoint.state.heads_m.len() != network.nodes().len()
        {
            return Err(SimError::InvalidArg {
                what: "checkpoint state does not match the network",
            });
        }
        sim.state = checkpoint.state;
        sim.results = checkpoint.results;
        sim.phase = checkpoint.phase;
        sim.backoffs = checkpoint.backoffs;
        sim.conflicts = checkpoint.conflicts;
        sim.failure = checkpoint.failure;
        info!(time_s = sim.state.time_s, "resumed from checkpoint");
        Ok(sim)
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            fingerprint: self.fingerprint.clone(),
            phase: self.phase,
            state: self.state.clone(),
            results: self.results.clone(),
            backoffs: self.backoffs,
            conflicts: self.conflicts.clone(),
            failure: self.failure.clone(),
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn controls(&self) -> &[Control] {
        self.engine.controls()
    }

    pub fn results(&self) -> &HydraulicResults {
        &self.results
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn phase(&self) -> SimPhase {
        self.phase
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Restore the initial conditions and drop all results, so the next run
    /// starts over and reproduces the same results.
    pub fn reset_initial_values(&mut self) {
        self.state = self.initial.clone();
        self.results = HydraulicResults::new(&self.network);
        self.phase = SimPhase::Initializing;
        self.backoffs = 0;
        self.conflicts.clear();
        self.failure = None;
        info!("reset to initial values");
    }

    /// Run to the configured duration.
    ///
    /// Each call commits at most `max_steps` steps; when that budget runs
    /// out the run pauses and the next call picks up from there.
    pub fn run(&mut self) -> SimResult<RunReport> {
        self.run_until(self.network.options().duration_s)
    }

    /// Run for at most `seconds` of simulation time, then pause.
    pub fn run_for(&mut self, seconds: f64) -> SimResult<RunReport> {
        if !(seconds.is_finite() && seconds >= 0.0) {
            return Err(SimError::InvalidArg {
                what: "run_for duration must be finite and non-negative",
            });
        }
        let duration = self.network.options().duration_s;
        self.run_until((self.state.time_s + seconds).min(duration))
    }

    /// Store the results, a manifest for the latest report, and a checkpoint.
    pub fn save(&self, store: &RunStore, report: &RunReport) -> SimResult<RunManifest> {
        let manifest = RunManifest::new(&self.fingerprint, report.status.clone(), report.steps);
        store.save_run(&manifest, &self.results)?;
        store.save_checkpoint(&manifest.run_id, &self.checkpoint())?;
        Ok(manifest)
    }

    fn run_until(&mut self, target_s: f64) -> SimResult<RunReport> {
        let options = self.network.options();
        let duration = options.duration_s;
        let max_steps = options.max_steps;

        if self.phase.is_terminal() {
            return Ok(self.report());
        }
        if self.phase == SimPhase::Initializing {
            info!(duration_s = duration, "starting hydraulic run");
            if let StepOutcome::Failed = self.initial_step()? {
                return Ok(self.report());
            }
        } else {
            info!(time_s = self.state.time_s, target_s, "continuing run");
        }

        let mut taken = 0usize;
        loop {
            let t = self.state.time_s;
            if t >= duration - TIME_EPS_S {
                self.phase = SimPhase::Finished;
                info!(time_s = t, steps = self.state.step, "run finished");
                break;
            }
            if t >= target_s - TIME_EPS_S || taken >= max_steps {
                self.phase = SimPhase::Paused;
                info!(time_s = t, steps = self.state.step, "run paused");
                break;
            }
            self.phase = SimPhase::Stepping;
            if let StepOutcome::Failed = self.advance(target_s)? {
                break;
            }
            taken += 1;
        }
        Ok(self.report())
    }

    fn report(&self) -> RunReport {
        let status = match (&self.failure, self.phase) {
            (Some((time_s, reason)), _) => RunStatus::Failed {
                time_s: *time_s,
                reason: reason.clone(),
            },
            (None, SimPhase::Finished) => RunStatus::Completed,
            (None, _) => RunStatus::Paused {
                time_s: self.state.time_s,
            },
        };
        RunReport {
            status,
            phase: self.phase,
            time_s: self.state.time_s,
            steps: self.state.step,
            backoffs: self.backoffs,
            conflicts: self.conflicts.clone(),
        }
    }

    /// Solve at the current time without advancing tanks.
    fn initial_step(&mut self) -> SimResult<StepOutcome> {
        let t = self.state.time_s;
        match self.attempt(0.0)? {
            Ok(solved) => {
                self.commit(solved);
                Ok(StepOutcome::Committed)
            }
            Err(e) => {
                self.fail(t, e);
                Ok(StepOutcome::Failed)
            }
        }
    }

    /// One committed step, halving the timestep on convergence failures.
    fn advance(&mut self, target_s: f64) -> SimResult<StepOutcome> {
        let t = self.state.time_s;
        let min_dt = self.network.options().min_timestep_s;
        let mut dt = self.candidate_dt(target_s);
        loop {
            match self.attempt(dt)? {
                Ok(solved) => {
                    self.commit(solved);
                    return Ok(StepOutcome::Committed);
                }
                Err(e) => {
                    let half = dt / 2.0;
                    if half < min_dt {
                        self.fail(t, e);
                        return Ok(StepOutcome::Failed);
                    }
                    warn!(time_s = t, dt_s = half, error = %e, "step failed; halving timestep");
                    self.phase = SimPhase::Backoff;
                    self.backoffs += 1;
                    dt = half;
                }
            }
        }
    }

    fn fail(&mut self, time_s: f64, e: SolverError) {
        error!(time_s, error = %e, "step failed at minimum timestep");
        self.phase = SimPhase::Failed;
        self.failure = Some((time_s, e.to_string()));
    }

    /// Largest step allowed from the current time: up to the next hydraulic
    /// or pattern boundary, control time, tank limit or leak window edge.
    fn candidate_dt(&self, target_s: f64) -> f64 {
        let options = self.network.options();
        let t = self.state.time_s;
        let view = NetworkView::new(&self.network, &self.state);

        let mut dt = gap_to_boundary(t, options.timestep_s);
        if self.network.has_patterns() {
            dt = cap(dt, gap_to_boundary(t, options.pattern_timestep_s));
        }
        let ctx = ControlContext::new(
            self.state.prev_control_time_s,
            t,
            options.start_clocktime_s,
            &view,
        );
        if let Some(tc) = self.engine.next_event_time(&ctx) {
            dt = cap(dt, tc - t);
        }
        if let Some(te) = self.next_tank_event(&view) {
            dt = cap(dt, te);
        }
        if let Some(tl) = self.next_leak_switch(t) {
            dt = cap(dt, tl - t);
        }
        dt.min(options.duration_s - t).min(target_s - t)
    }

    fn next_leak_switch(&self, t: f64) -> Option<f64> {
        self.network
            .junctions()
            .filter_map(|node| node.as_junction()?.leak?.next_switch(t + TIME_EPS_S))
            .reduce(f64::min)
    }

    /// Time until the first tank reaches its minimum or maximum level.
    fn next_tank_event(&self, view: &NetworkView<'_>) -> Option<f64> {
        self.network
            .tanks()
            .filter_map(|node| {
                let tank = node.as_tank()?;
                let level = self.state.tank_level(node.id)?;
                let rate = view.level_rate(node.id)?;
                if rate > 0.0 && level < tank.max_level_m - LEVEL_EPS_M {
                    Some((tank.max_level_m - level) / rate)
                } else if rate < 0.0 && level > tank.min_level_m + LEVEL_EPS_M {
                    Some((level - tank.min_level_m) / -rate)
                } else {
                    None
                }
            })
            .reduce(f64::min)
    }

    /// Try a step of length `dt` on a copy of the state. The outer error is
    /// fatal; the inner one is a convergence failure worth retrying.
    fn attempt(&self, dt: f64) -> SimResult<Result<Solved, SolverError>> {
        let options = self.network.options();
        let mut tentative = self.state.clone();
        if dt > 0.0 {
            advance_tanks(&self.network, &mut tentative, dt);
            tentative.time_s += dt;
        }

        let outcome = {
            let view = NetworkView::new(&self.network, &tentative);
            let ctx = ControlContext::new(
                tentative.prev_control_time_s,
                tentative.time_s,
                options.start_clocktime_s,
                &view,
            );
            self.engine.evaluate(&ctx)?
        };
        let events = apply_actions(&mut tentative, &outcome.actions);
        tentative.prev_control_time_s = Some(tentative.time_s);

        match self.solve_with_statuses(&mut tentative)? {
            Ok(snapshot) => Ok(Ok(Solved {
                state: tentative,
                snapshot,
                events,
                conflicts: outcome.conflicts,
            })),
            Err(e) => Ok(Err(e)),
        }
    }

    /// Solve, then re-solve while automatic statuses keep changing.
    fn solve_with_statuses(
        &self,
        state: &mut SimulationState,
    ) -> SimResult<Result<HydraulicSnapshot, SolverError>> {
        let max_rounds = self.network.options().max_status_iterations;
        let time_s = state.time_s;
        let mut round = 0;
        loop {
            round += 1;
            let mut hm = build_model(&self.network, state, time_s)?;
            hm.model.set_structure()?;
            let result = match self.solver.solve(&mut hm.model) {
                Ok(r) => r,
                Err(e) if e.is_convergence_failure() => return Ok(Err(e)),
                Err(e) => return Err(e.into()),
            };
            debug!(
                time_s,
                iterations = result.iterations,
                residual = result.residual_inf_norm,
                round,
                "solved"
            );
            let snapshot = extract_snapshot(&self.network, &hm)?;
            state.heads_m.clone_from(&snapshot.heads_m);
            state.flows_m3s.clone_from(&snapshot.flows_m3s);
            state.demands_m3s.clone_from(&snapshot.demands_m3s);
            state.leaks_m3s.clone_from(&snapshot.leaks_m3s);

            let before = state.links.clone();
            let changes = update_statuses(&self.network, state, &snapshot);
            if changes.is_empty() {
                return Ok(Ok(snapshot));
            }
            if round >= max_rounds {
                warn!(
                    time_s,
                    rounds = round,
                    pending = changes.len(),
                    "statuses still changing; keeping last solution"
                );
                state.links = before;
                return Ok(Ok(snapshot));
            }
            debug!(time_s, changes = changes.len(), "status changes; re-solving");
        }
    }

    fn commit(&mut self, solved: Solved) {
        let Solved {
            mut state,
            snapshot,
            events,
            conflicts,
        } = solved;
        state.step += 1;
        debug!(time_s = state.time_s, step = state.step, "step committed");
        self.results.push(TimestepRecord::new(&snapshot, &state));
        self.results.control_events.extend(events);
        self.conflicts.extend(conflicts);
        self.state = state;
        self.phase = SimPhase::Converged;
    }
}

/// Time to the first multiple of `step` that is not already `t`.
fn gap_to_boundary(t: f64, step: f64) -> f64 {
    next_boundary(t + TIME_EPS_S, step) - t
}

/// Shorten `dt` to an event `gap` ahead; events already reached are ignored.
fn cap(dt: f64, gap: f64) -> f64 {
    if gap > TIME_EPS_S { dt.min(gap) } else { dt }
}

/// Explicit update of tank levels from the last committed flows.
fn advance_tanks(network: &Network, state: &mut SimulationState, dt: f64) {
    let updates: Vec<_> = {
        let view = NetworkView::new(network, state);
        network
            .tanks()
            .filter_map(|node| {
                let tank = node.as_tank()?;
                let level = state.tank_level(node.id)?;
                let rate = view.level_rate(node.id)?;
                Some((node, tank, level + dt * rate))
            })
            .collect()
    };
    for (node, tank, raw) in updates {
        let level = raw.clamp(tank.min_level_m, tank.max_level_m);
        if (raw - level).abs() > LEVEL_EPS_M {
            warn!(tank = %node.name, level_m = raw, "tank level clamped to its limits");
        }
        state.tank_levels_m[node.id.idx()] = Some(level);
    }
}

//! Conditions: pure predicates over time and the observed state.

use serde::{Deserialize, Serialize};
use wf_core::constants::SECONDS_PER_DAY;
use wf_core::{NodeId, Tolerances, nearly_equal};

use crate::error::{ControlError, ControlResult};
use crate::observable::{Observable, StateView};

/// Slack used when comparing times with no previous evaluation.
pub const TIME_EPS_S: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl Comparison {
    /// Compare two observed values; equality is tolerance based.
    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        let eq = nearly_equal(lhs, rhs, Tolerances::default());
        match self {
            Comparison::Lt => lhs < rhs && !eq,
            Comparison::Le => lhs <= rhs || eq,
            Comparison::Eq => eq,
            Comparison::Ne => !eq,
            Comparison::Ge => lhs >= rhs || eq,
            Comparison::Gt => lhs > rhs && !eq,
        }
    }
}

/// Everything a condition may look at.
#[derive(Clone, Copy)]
pub struct ControlContext<'a> {
    /// Time of the previous control evaluation, `None` on the first.
    pub prev_time: Option<f64>,
    pub time: f64,
    /// Clock time (s after midnight) at simulation time zero.
    pub start_clocktime: f64,
    pub view: &'a dyn StateView,
}

impl<'a> ControlContext<'a> {
    pub fn new(
        prev_time: Option<f64>,
        time: f64,
        start_clocktime: f64,
        view: &'a dyn StateView,
    ) -> Self {
        Self {
            prev_time,
            time,
            start_clocktime,
            view,
        }
    }

    fn observe(&self, what: &Observable) -> ControlResult<f64> {
        self.view.value(what).ok_or_else(|| ControlError::Unobservable {
            what: format!("{what:?}"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "args")]
pub enum Condition {
    /// Elapsed simulation time against `seconds`.
    SimTime { op: Comparison, seconds: f64 },
    /// Clock time against `clock_s` (seconds after midnight).
    ///
    /// With `daily` the comparison repeats every day from `first_day` on;
    /// otherwise it refers to the single instant `clock_s` on `first_day`.
    TimeOfDay {
        op: Comparison,
        clock_s: f64,
        daily: bool,
        first_day: u32,
    },
    Value {
        target: Observable,
        op: Comparison,
        threshold: f64,
    },
    Relative {
        a: Observable,
        op: Comparison,
        b: Observable,
    },
    TankLevel {
        tank: NodeId,
        op: Comparison,
        level: f64,
    },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

/// `Eq` on a time threshold: crossed in `(prev, now]`.
fn time_holds(op: Comparison, prev: Option<f64>, now: f64, threshold: f64) -> bool {
    let crossed = match prev {
        Some(p) => p < threshold && threshold <= now,
        None => (now - threshold).abs() < TIME_EPS_S,
    };
    match op {
        Comparison::Eq => crossed,
        Comparison::Ne => !crossed,
        Comparison::Lt => now < threshold,
        Comparison::Le => now <= threshold,
        Comparison::Ge => now >= threshold,
        Comparison::Gt => now > threshold,
    }
}

/// First daily occurrence of `clock_s` at or after day `first_day`, in
/// absolute clock seconds, that is strictly later than `after`.
fn next_daily(clock_s: f64, first_day: u32, after: f64) -> f64 {
    let earliest = clock_s + f64::from(first_day) * SECONDS_PER_DAY;
    if after < earliest {
        return earliest;
    }
    let k = ((after - clock_s) / SECONDS_PER_DAY).floor() + 1.0;
    clock_s + k * SECONDS_PER_DAY
}

impl Condition {
    pub fn and(self, other: Condition) -> Self {
        Condition::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Condition) -> Self {
        Condition::Or(Box::new(self), Box::new(other))
    }

    /// Evaluate against `ctx`. Both sides of `And`/`Or` are evaluated so a
    /// missing observable always surfaces.
    pub fn evaluate(&self, ctx: &ControlContext<'_>) -> ControlResult<bool> {
        match self {
            Condition::SimTime { op, seconds } => {
                Ok(time_holds(*op, ctx.prev_time, ctx.time, *seconds))
            }
            Condition::TimeOfDay {
                op,
                clock_s,
                daily,
                first_day,
            } => {
                let now = ctx.start_clocktime + ctx.time;
                let prev = ctx.prev_time.map(|p| ctx.start_clocktime + p);
                let day_start = f64::from(*first_day) * SECONDS_PER_DAY;
                if !daily {
                    return Ok(time_holds(*op, prev, now, clock_s + day_start));
                }
                if now < day_start {
                    return Ok(matches!(op, Comparison::Ne));
                }
                match op {
                    Comparison::Eq | Comparison::Ne => {
                        let crossed = match prev {
                            Some(p) => next_daily(*clock_s, *first_day, p) <= now,
                            None => {
                                let r = (now - clock_s).rem_euclid(SECONDS_PER_DAY);
                                r < TIME_EPS_S || SECONDS_PER_DAY - r < TIME_EPS_S
                            }
                        };
                        Ok(crossed == matches!(op, Comparison::Eq))
                    }
                    _ => Ok(time_holds(
                        *op,
                        None,
                        now.rem_euclid(SECONDS_PER_DAY),
                        *clock_s,
                    )),
                }
            }
            Condition::Value {
                target,
                op,
                threshold,
            } => Ok(op.holds(ctx.observe(target)?, *threshold)),
            Condition::Relative { a, op, b } => Ok(op.holds(ctx.observe(a)?, ctx.observe(b)?)),
            Condition::TankLevel { tank, op, level } => {
                let value = ctx.observe(&Observable::TankLevel { tank: *tank })?;
                Ok(op.holds(value, *level))
            }
            Condition::And(a, b) => {
                let (x, y) = (a.evaluate(ctx)?, b.evaluate(ctx)?);
                Ok(x && y)
            }
            Condition::Or(a, b) => {
                let (x, y) = (a.evaluate(ctx)?, b.evaluate(ctx)?);
                Ok(x || y)
            }
        }
    }

    /// Earliest simulation time after `ctx.time` at which this condition
    /// may change value.
    ///
    /// Exact for time conditions; for tank levels the crossing is projected
    /// from the current level rate. Other observables give `None`.
    pub fn next_event_time(&self, ctx: &ControlContext<'_>) -> Option<f64> {
        let after = |t: f64| (t > ctx.time + TIME_EPS_S).then_some(t);
        match self {
            Condition::SimTime { seconds, .. } => after(*seconds),
            Condition::TimeOfDay {
                clock_s,
                daily,
                first_day,
                ..
            } => {
                let now = ctx.start_clocktime + ctx.time;
                let clock = if *daily {
                    next_daily(*clock_s, *first_day, now)
                } else {
                    clock_s + f64::from(*first_day) * SECONDS_PER_DAY
                };
                after(clock - ctx.start_clocktime)
            }
            Condition::TankLevel { tank, level, .. } => {
                let current = ctx.view.value(&Observable::TankLevel { tank: *tank })?;
                let rate = ctx.view.level_rate(*tank)?;
                let gap = level - current;
                if rate == 0.0 || gap == 0.0 || gap.signum() != rate.signum() {
                    return None;
                }
                after(ctx.time + gap / rate)
            }
            Condition::Value { .. } | Condition::Relative { .. } => None,
            Condition::And(a, b) | Condition::Or(a, b) => {
                match (a.next_event_time(ctx), b.next_event_time(ctx)) {
                    (Some(x), Some(y)) => Some(x.min(y)),
                    (x, y) => x.or(y),
                }
            }
        }
    }

    /// Visit every observable this condition reads.
    pub(crate) fn observables(&self, out: &mut Vec<Observable>) {
        match self {
            Condition::Value { target, .. } => out.push(*target),
            Condition::Relative { a, b, .. } => {
                out.push(*a);
                out.push(*b);
            }
            Condition::TankLevel { tank, .. } => out.push(Observable::TankLevel { tank: *tank }),
            Condition::And(a, b) | Condition::Or(a, b) => {
                a.observables(out);
                b.observables(out);
            }
            Condition::SimTime { .. } | Condition::TimeOfDay { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_core::LinkId;

    struct Fixed {
        level: f64,
        rate: f64,
    }

    impl StateView for Fixed {
        fn value(&self, what: &Observable) -> Option<f64> {
            match what {
                Observable::TankLevel { .. } => Some(self.level),
                Observable::LinkFlow { .. } => Some(0.02),
                _ => None,
            }
        }

        fn level_rate(&self, _tank: NodeId) -> Option<f64> {
            Some(self.rate)
        }
    }

    fn ctx(view: &dyn StateView, prev: Option<f64>, time: f64) -> ControlContext<'_> {
        ControlContext::new(prev, time, 0.0, view)
    }

    #[test]
    fn sim_time_eq_fires_on_crossing_only() {
        let view = Fixed { level: 0.0, rate: 0.0 };
        let c = Condition::SimTime {
            op: Comparison::Eq,
            seconds: 7200.0,
        };
        assert!(!c.evaluate(&ctx(&view, Some(0.0), 3600.0)).unwrap());
        assert!(c.evaluate(&ctx(&view, Some(3600.0), 7200.0)).unwrap());
        assert!(!c.evaluate(&ctx(&view, Some(7200.0), 10800.0)).unwrap());
        // jumped over the threshold
        assert!(c.evaluate(&ctx(&view, Some(3600.0), 9000.0)).unwrap());
        assert!(c.evaluate(&ctx(&view, None, 7200.0)).unwrap());
    }

    #[test]
    fn daily_clock_time_repeats() {
        let view = Fixed { level: 0.0, rate: 0.0 };
        let c = Condition::TimeOfDay {
            op: Comparison::Eq,
            clock_s: 6.0 * 3600.0,
            daily: true,
            first_day: 0,
        };
        let mut fired = Vec::new();
        let mut prev = None;
        let mut t = 0.0;
        while t <= 3.0 * SECONDS_PER_DAY {
            if c.evaluate(&ctx(&view, prev, t)).unwrap() {
                fired.push(t);
            }
            prev = Some(t);
            t += 3600.0;
        }
        assert_eq!(fired, vec![21600.0, 108000.0, 194400.0]);
        assert_eq!(
            c.next_event_time(&ctx(&view, None, 21600.0)),
            Some(108000.0)
        );
    }

    #[test]
    fn one_shot_clock_time_uses_first_day() {
        let view = Fixed { level: 0.0, rate: 0.0 };
        let c = Condition::TimeOfDay {
            op: Comparison::Eq,
            clock_s: 3600.0,
            daily: false,
            first_day: 1,
        };
        let cx = ControlContext::new(Some(0.0), 86400.0, 7200.0, &view);
        assert!(c.evaluate(&cx).unwrap());
        assert_eq!(c.next_event_time(&ctx(&view, None, 0.0)), Some(90000.0));
    }

    #[test]
    fn tank_crossing_is_projected() {
        let rising = Fixed { level: 2.0, rate: 1e-3 };
        let c = Condition::TankLevel {
            tank: NodeId::from_index(0),
            op: Comparison::Ge,
            level: 5.0,
        };
        let t = c.next_event_time(&ctx(&rising, None, 100.0)).unwrap();
        assert!((t - 3100.0).abs() < 1e-9);

        let falling = Fixed { level: 2.0, rate: -1e-3 };
        assert!(c.next_event_time(&ctx(&falling, None, 100.0)).is_none());
        assert!(!c.evaluate(&ctx(&falling, None, 100.0)).unwrap());
    }

    #[test]
    fn compound_conditions() {
        let view = Fixed { level: 3.0, rate: 0.0 };
        let flow = Condition::Value {
            target: Observable::LinkFlow {
                link: LinkId::from_index(0),
            },
            op: Comparison::Gt,
            threshold: 0.01,
        };
        let low = Condition::TankLevel {
            tank: NodeId::from_index(0),
            op: Comparison::Lt,
            level: 1.0,
        };
        let cx = ctx(&view, None, 0.0);
        assert!(flow.clone().or(low.clone()).evaluate(&cx).unwrap());
        assert!(!flow.and(low).evaluate(&cx).unwrap());
    }

    #[test]
    fn missing_observable_is_an_error() {
        let view = Fixed { level: 0.0, rate: 0.0 };
        let c = Condition::Value {
            target: Observable::NodeHead {
                node: NodeId::from_index(3),
            },
            op: Comparison::Gt,
            threshold: 0.0,
        };
        assert!(matches!(
            c.evaluate(&ctx(&view, None, 0.0)),
            Err(ControlError::Unobservable { .. })
        ));
    }
}

//! Evaluation and arbitration of a set of controls.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;
use wf_core::{LinkId, LinkStatus};
use wf_network::{LinkKind, Network};

use crate::action::{Action, ChangeKind, FiredAction, LinkChange};
use crate::condition::ControlContext;
use crate::control::Control;
use crate::error::{ControlError, ControlResult};
use crate::observable::Observable;

/// Two equal-priority controls asked for different values of the same
/// link attribute. The first declared control won.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlConflict {
    pub link: LinkId,
    pub kind: ChangeKind,
    pub priority: i32,
    pub winner: String,
    pub loser: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlOutcome {
    /// At most one action per (link, attribute), in link order.
    pub actions: Vec<FiredAction>,
    pub conflicts: Vec<ControlConflict>,
}

/// Validated controls for one network.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlEngine {
    controls: Vec<Control>,
}

struct Candidate<'a> {
    priority: i32,
    control: &'a str,
    change: LinkChange,
}

impl ControlEngine {
    /// Check every reference in `controls` against `network`.
    pub fn new(network: &Network, controls: Vec<Control>) -> ControlResult<Self> {
        for (i, c) in controls.iter().enumerate() {
            if controls[..i].iter().any(|o| o.name == c.name) {
                return Err(ControlError::DuplicateName {
                    name: c.name.clone(),
                });
            }
            validate_control(network, c)?;
        }
        Ok(Self { controls })
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Evaluate every control and resolve competing actions.
    pub fn evaluate(&self, ctx: &ControlContext<'_>) -> ControlResult<ControlOutcome> {
        let mut groups: BTreeMap<(LinkId, ChangeKind), Vec<Candidate<'_>>> = BTreeMap::new();
        for control in &self.controls {
            let actions = if control.condition.evaluate(ctx)? {
                &control.then_actions
            } else {
                &control.else_actions
            };
            for action in actions {
                groups
                    .entry((action.link, action.change.kind()))
                    .or_default()
                    .push(Candidate {
                        priority: control.priority,
                        control: &control.name,
                        change: action.change,
                    });
            }
        }

        let mut outcome = ControlOutcome::default();
        for ((link, kind), candidates) in groups {
            // first declared among the highest priority
            let Some(winner) = candidates
                .iter()
                .reduce(|best, c| if c.priority > best.priority { c } else { best })
            else {
                continue;
            };
            for loser in candidates
                .iter()
                .filter(|c| c.priority == winner.priority && c.change != winner.change)
            {
                warn!(
                    time_s = ctx.time,
                    %link,
                    winner = winner.control,
                    loser = loser.control,
                    "conflicting control actions"
                );
                outcome.conflicts.push(ControlConflict {
                    link,
                    kind,
                    priority: winner.priority,
                    winner: winner.control.to_string(),
                    loser: loser.control.to_string(),
                });
            }
            outcome.actions.push(FiredAction {
                control: winner.control.to_string(),
                action: Action {
                    link,
                    change: winner.change,
                },
            });
        }
        Ok(outcome)
    }

    /// Earliest time after `ctx.time` at which any condition may change.
    pub fn next_event_time(&self, ctx: &ControlContext<'_>) -> Option<f64> {
        self.controls
            .iter()
            .filter_map(|c| c.condition.next_event_time(ctx))
            .reduce(f64::min)
    }
}

fn validate_control(network: &Network, control: &Control) -> ControlResult<()> {
    let invalid = |what: String| ControlError::InvalidReference {
        control: control.name.clone(),
        what,
    };

    let mut observed = Vec::new();
    control.condition.observables(&mut observed);
    for obs in observed {
        if let Some(node) = obs.node() {
            let Some(n) = network.node(node) else {
                return Err(ControlError::UnknownNode {
                    control: control.name.clone(),
                    node,
                });
            };
            if matches!(obs, Observable::TankLevel { .. }) && n.as_tank().is_none() {
                return Err(invalid(format!("'{}' is not a tank", n.name)));
            }
        }
        if let Some(link) = obs.link()
            && network.link(link).is_none()
        {
            return Err(ControlError::UnknownLink {
                control: control.name.clone(),
                link,
            });
        }
    }

    for action in control.actions() {
        let Some(link) = network.link(action.link) else {
            return Err(ControlError::UnknownLink {
                control: control.name.clone(),
                link: action.link,
            });
        };
        match action.change {
            LinkChange::Status(LinkStatus::Active) if link.as_valve().is_none() => {
                return Err(invalid(format!("only valves can be Active, not '{}'", link.name)));
            }
            LinkChange::Setting(s) if !s.is_finite() || s < 0.0 => {
                return Err(invalid(format!("setting {s} for '{}'", link.name)));
            }
            LinkChange::Setting(s) if s == 0.0 && matches!(link.kind, LinkKind::Pipe(_)) => {
                return Err(invalid(format!("zero roughness for '{}'", link.name)));
            }
            _ => {}
        }
    }
    Ok(())
}

//! Actions on link status and settings.

use serde::{Deserialize, Serialize};
use tracing::debug;
use wf_core::{LinkId, LinkStatus};
use wf_network::SimulationState;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LinkChange {
    Status(LinkStatus),
    /// Pipe roughness, pump speed, or valve setting.
    Setting(f64),
}

/// Which attribute of a link a change targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChangeKind {
    Status,
    Setting,
}

impl LinkChange {
    pub fn kind(&self) -> ChangeKind {
        match self {
            LinkChange::Status(_) => ChangeKind::Status,
            LinkChange::Setting(_) => ChangeKind::Setting,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub link: LinkId,
    pub change: LinkChange,
}

impl Action {
    pub fn status(link: LinkId, status: LinkStatus) -> Self {
        Self {
            link,
            change: LinkChange::Status(status),
        }
    }

    pub fn setting(link: LinkId, setting: f64) -> Self {
        Self {
            link,
            change: LinkChange::Setting(setting),
        }
    }
}

/// An action chosen by arbitration, with the control that issued it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiredAction {
    pub control: String,
    pub action: Action,
}

/// A change a control actually made to the simulation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlEvent {
    pub time_s: f64,
    pub control: String,
    pub link: LinkId,
    pub before: LinkChange,
    pub after: LinkChange,
}

/// Apply `actions` to `state`, returning only those that changed something.
///
/// A new commanded status replaces any automatic hold on the link; repeating
/// the current command leaves the hold alone. Actions on links missing from
/// the state are skipped.
pub fn apply_actions(state: &mut SimulationState, actions: &[FiredAction]) -> Vec<ControlEvent> {
    let time_s = state.time_s;
    let mut events = Vec::new();
    for fired in actions {
        let link = fired.action.link;
        let Some(ls) = state.link_mut(link) else {
            continue;
        };
        let before = match fired.action.change {
            LinkChange::Status(status) => {
                if ls.status == status {
                    continue;
                }
                let before = LinkChange::Status(ls.status);
                ls.command_status(status);
                before
            }
            LinkChange::Setting(setting) => {
                if ls.setting == setting {
                    continue;
                }
                let before = LinkChange::Setting(ls.setting);
                ls.setting = setting;
                before
            }
        };
        debug!(
            time_s,
            control = %fired.control,
            %link,
            ?before,
            after = ?fired.action.change,
            "control action"
        );
        events.push(ControlEvent {
            time_s,
            control: fired.control.clone(),
            link,
            before,
            after: fired.action.change,
        });
    }
    events
}

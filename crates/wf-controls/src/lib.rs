//! Discrete-event controls for network simulation.
//!
//! Controls are evaluated between solves. Each one pairs a [`Condition`]
//! (a pure predicate over time and the observed state) with [`Action`]s on
//! link statuses and settings. [`ControlEngine`] arbitrates competing actions
//! and projects when the next condition may change, which the simulation loop
//! uses to shorten its timestep.
//!
//! # Two kinds of status change
//!
//! - **Commanded**: controls set `LinkState::status`, replacing any hold.
//! - **Automatic**: [`update_statuses`] adjusts `LinkState::effective` after a
//!   solve for check valves, pumps, regulating valves and tank limits.

pub mod action;
pub mod condition;
pub mod control;
pub mod engine;
pub mod error;
pub mod observable;
pub mod status;

pub use action::{Action, ChangeKind, ControlEvent, FiredAction, LinkChange, apply_actions};
pub use condition::{Comparison, Condition, ControlContext};
pub use control::Control;
pub use engine::{ControlConflict, ControlEngine, ControlOutcome};
pub use error::{ControlError, ControlResult};
pub use observable::{NetworkView, Observable, StateView};
pub use status::{StatusChange, update_statuses};

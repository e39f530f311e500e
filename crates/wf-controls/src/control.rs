//! Controls and rules.

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::condition::Condition;

/// A condition with actions for when it holds and, for rules, when it
/// does not. Higher `priority` wins arbitration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub name: String,
    pub condition: Condition,
    pub then_actions: Vec<Action>,
    pub else_actions: Vec<Action>,
    pub priority: i32,
}

impl Control {
    /// Simple control: one condition, actions only when it holds.
    pub fn new(name: impl Into<String>, condition: Condition, then_actions: Vec<Action>) -> Self {
        Self {
            name: name.into(),
            condition,
            then_actions,
            else_actions: Vec::new(),
            priority: 0,
        }
    }

    /// Rule with an else branch.
    pub fn rule(
        name: impl Into<String>,
        condition: Condition,
        then_actions: Vec<Action>,
        else_actions: Vec<Action>,
    ) -> Self {
        Self {
            name: name.into(),
            condition,
            then_actions,
            else_actions,
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.then_actions.iter().chain(&self.else_actions)
    }
}

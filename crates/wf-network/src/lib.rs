//! In-memory description of a pressurized pipe network.
//!
//! A [`Network`] is assembled with [`NetworkBuilder`], validated once, and then
//! treated as immutable. Everything that changes during a simulation (tank
//! levels, link statuses and settings, the warm-start solution) lives in
//! [`SimulationState`].

pub mod builder;
pub mod curve;
pub mod elements;
pub mod error;
pub mod network;
pub mod options;
pub mod pattern;
pub mod state;
pub mod validate;

pub use builder::NetworkBuilder;
pub use curve::HeadCurve;
pub use elements::{
    DemandEntry, Junction, Leak, Link, LinkKind, Node, NodeKind, PressureDemand, Pipe, Pump,
    Reservoir, Tank, Valve, ValveKind,
};
pub use error::{NetworkError, NetworkResult};
pub use network::Network;
pub use options::{DemandModel, HeadlossFormula, HydraulicOptions};
pub use pattern::Pattern;
pub use state::{LinkState, SimulationState, StatusHold};

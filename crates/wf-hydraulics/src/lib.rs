//! Constraint library for pressurized networks.
//!
//! Each timestep the network and its current [`wf_network::SimulationState`]
//! are turned into a square algebraic model: one head per node, one flow per
//! link, plus delivered demand for pressure-dependent junctions and discharge
//! for active leaks. Every nonlinear relation is smoothed to be C¹ so the
//! Newton Jacobian is continuous.

pub mod assembly;
pub mod demand;
pub mod error;
pub mod headloss;
pub mod leak;
pub mod pump;
pub mod smoothing;
pub mod snapshot;
pub mod valve;

pub use assembly::{HydraulicModel, ModelIndex, assembly_status, build_model, fixed_head};
pub use demand::PddCurve;
pub use error::{HydraulicsError, HydraulicsResult};
pub use headloss::{SmoothPowerLaw, hw_resistance, minor_loss_resistance};
pub use leak::LeakCurve;
pub use pump::PumpGain;
pub use snapshot::{HydraulicSnapshot, extract_snapshot};

//! wf-core: stable foundation for waterflow.
//!
//! Contains:
//! - units (uom SI types + constructors, hydraulic constants)
//! - numeric (Real + tolerances + float helpers)
//! - ids (stable compact IDs for network objects)
//! - status (link status shared by every layer)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod status;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{WfError, WfResult};
pub use ids::*;
pub use numeric::*;
pub use status::LinkStatus;
pub use units::*;

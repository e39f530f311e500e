//! Hydraulic run options.

use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, NetworkResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DemandModel {
    /// Demand-driven: junction demand is fixed.
    #[default]
    DD,
    /// Pressure-dependent: delivered demand follows the PDD curve.
    PDD,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeadlossFormula {
    #[default]
    HW,
}

/// Options shared by every element and the simulation loop. Every field has a
/// default, so a partial YAML document is valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydraulicOptions {
    pub timestep_s: f64,
    pub duration_s: f64,
    pub pattern_timestep_s: f64,
    /// Clock time of day at simulation time zero.
    pub start_clocktime_s: f64,
    pub demand_model: DemandModel,
    pub minimum_pressure_m: f64,
    pub required_pressure_m: f64,
    pub pressure_exponent: f64,
    pub demand_multiplier: f64,
    pub accuracy: f64,
    pub max_iterations: usize,
    pub max_backtracks: usize,
    pub headloss: HeadlossFormula,
    pub min_timestep_s: f64,
    pub max_status_iterations: usize,
    pub max_steps: usize,
}

impl Default for HydraulicOptions {
    fn default() -> Self {
        Self {
            timestep_s: 3600.0,
            duration_s: 86_400.0,
            pattern_timestep_s: 3600.0,
            start_clocktime_s: 0.0,
            demand_model: DemandModel::DD,
            minimum_pressure_m: 0.0,
            required_pressure_m: 0.07,
            pressure_exponent: 0.5,
            demand_multiplier: 1.0,
            accuracy: 1e-6,
            max_iterations: 3000,
            max_backtracks: 100,
            headloss: HeadlossFormula::HW,
            min_timestep_s: 1.0,
            max_status_iterations: 10,
            max_steps: 100_000,
        }
    }
}

impl HydraulicOptions {
    pub fn from_yaml_str(s: &str) -> NetworkResult<Self> {
        serde_yaml::from_str(s).map_err(|e| NetworkError::OptionsParse {
            message: e.to_string(),
        })
    }

    pub fn validate(&self) -> NetworkResult<()> {
        let positive = [
            ("timestep_s", self.timestep_s),
            ("pattern_timestep_s", self.pattern_timestep_s),
            ("accuracy", self.accuracy),
            ("min_timestep_s", self.min_timestep_s),
            ("pressure_exponent", self.pressure_exponent),
        ];
        for (field, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(NetworkError::invalid("options", format!("{field} must be > 0")));
            }
        }
        if !(self.duration_s.is_finite() && self.duration_s >= 0.0) {
            return Err(NetworkError::invalid("options", "duration_s must be >= 0"));
        }
        if !(self.demand_multiplier.is_finite() && self.demand_multiplier >= 0.0) {
            return Err(NetworkError::invalid(
                "options",
                "demand_multiplier must be >= 0",
            ));
        }
        if self.required_pressure_m <= self.minimum_pressure_m {
            return Err(NetworkError::invalid(
                "options",
                "required_pressure_m must exceed minimum_pressure_m",
            ));
        }
        if self.min_timestep_s > self.timestep_s {
            return Err(NetworkError::invalid(
                "options",
                "min_timestep_s must not exceed timestep_s",
            ));
        }
        if self.max_iterations == 0 || self.max_status_iterations == 0 {
            return Err(NetworkError::invalid(
                "options",
                "iteration limits must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        HydraulicOptions::default().validate().unwrap();
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "timestep_s: 900\ndemand_model: PDD\nrequired_pressure_m: 20.0\n";
        let opts = HydraulicOptions::from_yaml_str(yaml).unwrap();
        assert_eq!(opts.timestep_s, 900.0);
        assert_eq!(opts.demand_model, DemandModel::PDD);
        assert_eq!(opts.required_pressure_m, 20.0);
        assert_eq!(opts.duration_s, 86_400.0);
        assert_eq!(opts.max_backtracks, 100);
    }

    #[test]
    fn bad_yaml_is_parse_error() {
        let err = HydraulicOptions::from_yaml_str("timestep_s: [").unwrap_err();
        assert!(matches!(err, NetworkError::OptionsParse { .. }));
    }

    #[test]
    fn rejects_inverted_pressure_gap() {
        let opts = HydraulicOptions {
            minimum_pressure_m: 5.0,
            required_pressure_m: 5.0,
            ..HydraulicOptions::default()
        };
        assert!(opts.validate().is_err());
    }
}

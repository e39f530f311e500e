//! Valve loss coefficients.

use wf_network::{Valve, ValveKind};

use crate::headloss::minor_loss_resistance;

/// Smallest minor loss coefficient an open valve is given, so its flow
/// always enters its own row.
pub const OPEN_VALVE_MIN_K: f64 = 1e-2;

/// Resistance of a valve that is fully open.
pub fn open_resistance(valve: &Valve) -> f64 {
    minor_loss_resistance(valve.minor_loss.max(OPEN_VALVE_MIN_K), valve.diameter_m)
}

/// Resistance of a throttle valve at the given setting.
pub fn throttle_resistance(valve: &Valve, setting: f64) -> f64 {
    minor_loss_resistance(setting.max(OPEN_VALVE_MIN_K), valve.diameter_m)
}

/// Whether the setting of this valve kind is a pressure head (m).
pub fn is_pressure_valve(kind: ValveKind) -> bool {
    matches!(kind, ValveKind::Prv | ValveKind::Psv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_valve_has_positive_resistance() {
        let v = Valve {
            kind: ValveKind::Fcv,
            diameter_m: 0.2,
            minor_loss: 0.0,
        };
        assert!(open_resistance(&v) > 0.0);
        assert!(throttle_resistance(&v, 10.0) > open_resistance(&v));
        assert!(!is_pressure_valve(v.kind));
        assert!(is_pressure_valve(ValveKind::Psv));
    }
}

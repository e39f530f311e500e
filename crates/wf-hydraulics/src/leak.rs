//! Orifice leak discharge as a function of gauge pressure head.

use wf_aml::ScalarFn;
use wf_core::constants::{G0_MPS2, WATER_DENSITY_KGM3};
use wf_network::Leak;

use crate::smoothing::hermite;

/// Width of the cubic blend above zero pressure (m).
pub const LEAK_BLEND_M: f64 = 1e-3;

/// `Cd·A·sqrt(2/ρ)·(p·ρ·g)^α`, zero for `p <= 0`, blended over
/// `[0, LEAK_BLEND_M]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LeakCurve {
    coeff: f64,
    exponent: f64,
}

impl LeakCurve {
    pub fn new(leak: &Leak) -> Self {
        let rho = WATER_DENSITY_KGM3;
        Self {
            coeff: leak.discharge_coeff * leak.area_m2 * (2.0 / rho).sqrt(),
            exponent: leak.exponent,
        }
    }

    fn power(&self, p: f64) -> (f64, f64) {
        let to_pa = WATER_DENSITY_KGM3 * G0_MPS2;
        let pa = p * to_pa;
        (
            self.coeff * pa.powf(self.exponent),
            self.coeff * self.exponent * pa.powf(self.exponent - 1.0) * to_pa,
        )
    }

    pub fn eval(&self, p: f64) -> (f64, f64) {
        if p <= 0.0 {
            (0.0, 0.0)
        } else if p < LEAK_BLEND_M {
            let (v, d) = self.power(LEAK_BLEND_M);
            hermite(p, 0.0, LEAK_BLEND_M, 0.0, v, 0.0, d)
        } else {
            self.power(p)
        }
    }
}

impl ScalarFn for LeakCurve {
    fn value(&self, x: f64) -> f64 {
        self.eval(x).0
    }

    fn derivative(&self, x: f64) -> f64 {
        self.eval(x).1
    }
}

//! Smoothed power-law headloss: Hazen-Williams friction and minor losses.

use wf_aml::ScalarFn;
use wf_core::constants::G0_MPS2;

use crate::smoothing::hermite;

/// Hazen-Williams flow exponent.
pub const HW_EXPONENT: f64 = 1.852;
/// Below this flow (m³/s) the headloss is linear.
pub const HW_Q1: f64 = 2e-4;
/// Above this flow (m³/s) the headloss is the exact power law.
pub const HW_Q2: f64 = 4e-4;
/// Slope of the linear region.
pub const HW_M: f64 = 1e-3;

/// Odd, strictly increasing, C¹ approximation of `sign(q)·|q|^n`.
///
/// Six regions: exact power law for `|q| >= q2`, linear `m·q` for
/// `|q| <= q1`, and cubic blends in between. The linear slope is capped at
/// `q2^n / (2·q1)` so the blend stays monotone for larger exponents.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmoothPowerLaw {
    n: f64,
    q1: f64,
    q2: f64,
    m: f64,
}

impl SmoothPowerLaw {
    pub fn new(n: f64) -> Self {
        let m = HW_M.min(0.5 * HW_Q2.powf(n) / HW_Q1);
        Self {
            n,
            q1: HW_Q1,
            q2: HW_Q2,
            m,
        }
    }

    pub fn hazen_williams() -> Self {
        Self::new(HW_EXPONENT)
    }

    pub fn minor_loss() -> Self {
        Self::new(2.0)
    }

    pub fn breakpoints(&self) -> (f64, f64) {
        (self.q1, self.q2)
    }

    /// Value and slope for `q >= 0`.
    fn positive_branch(&self, q: f64) -> (f64, f64) {
        if q <= self.q1 {
            (self.m * q, self.m)
        } else if q < self.q2 {
            hermite(
                q,
                self.q1,
                self.q2,
                self.m * self.q1,
                self.q2.powf(self.n),
                self.m,
                self.n * self.q2.powf(self.n - 1.0),
            )
        } else {
            (q.powf(self.n), self.n * q.powf(self.n - 1.0))
        }
    }

    pub fn eval(&self, q: f64) -> (f64, f64) {
        let (v, d) = self.positive_branch(q.abs());
        (v.copysign(q), d)
    }
}

impl ScalarFn for SmoothPowerLaw {
    fn value(&self, x: f64) -> f64 {
        self.eval(x).0
    }

    fn derivative(&self, x: f64) -> f64 {
        self.eval(x).1
    }
}

/// Hazen-Williams resistance `K = 10.667·C^-1.852·d^-4.871·L` (SI).
pub fn hw_resistance(roughness: f64, diameter_m: f64, length_m: f64) -> f64 {
    10.667 * roughness.powf(-HW_EXPONENT) * diameter_m.powf(-4.871) * length_m
}

/// Minor loss resistance `8·k / (g·π²·d⁴)` for a dimensionless coefficient `k`.
pub fn minor_loss_resistance(k: f64, diameter_m: f64) -> f64 {
    8.0 * k / (G0_MPS2 * std::f64::consts::PI.powi(2) * diameter_m.powi(4))
}

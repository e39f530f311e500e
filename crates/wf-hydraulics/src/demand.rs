//! Pressure-dependent demand fraction.

use wf_aml::ScalarFn;

use crate::smoothing::hermite;

/// Widest cubic blend at either end of the PDD curve (m).
pub const PDD_MAX_BLEND_M: f64 = 0.2;

/// Slope added everywhere so the delivered fraction is strictly increasing
/// in pressure (1/m).
pub const PDD_SLOPE: f64 = 1e-11;

/// Fraction of desired demand delivered at pressure `p`, plus
/// `PDD_SLOPE · (p - P0)`:
///
/// - `0` for `p <= P0`
/// - `((p - P0) / (Pf - P0))^e` in the interior
/// - `1` for `p >= Pf`
///
/// Cubic blends over `[Pf - δ, Pf]`, and over `[P0, P0 + δ]` when `e <= 1`,
/// with `δ = min(0.2 m, (Pf - P0) / 2)` join the pieces with matching slope.
/// For `e > 1` the power law already leaves `P0` with zero slope and needs no
/// blend, which keeps the curve monotone for any positive exponent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PddCurve {
    p0: f64,
    pf: f64,
    exponent: f64,
    delta: f64,
}

impl PddCurve {
    /// `pf` must exceed `p0` and `exponent` must be positive (checked by
    /// network validation).
    pub fn new(p0: f64, pf: f64, exponent: f64) -> Self {
        let delta = PDD_MAX_BLEND_M.min(0.5 * (pf - p0));
        Self {
            p0,
            pf,
            exponent,
            delta,
        }
    }

    fn power(&self, p: f64) -> (f64, f64) {
        let span = self.pf - self.p0;
        let r = (p - self.p0) / span;
        (
            r.powf(self.exponent),
            self.exponent * r.powf(self.exponent - 1.0) / span,
        )
    }

    /// The saturating curve without the added slope.
    fn fraction(&self, p: f64) -> (f64, f64) {
        let lo = self.p0 + self.delta;
        let hi = self.pf - self.delta;
        if p <= self.p0 {
            (0.0, 0.0)
        } else if p >= self.pf {
            (1.0, 0.0)
        } else if p < lo && self.exponent <= 1.0 {
            let (v, d) = self.power(lo);
            hermite(p, self.p0, lo, 0.0, v, 0.0, d)
        } else if p > hi {
            let (v, d) = self.power(hi);
            hermite(p, hi, self.pf, v, 1.0, d, 0.0)
        } else {
            self.power(p)
        }
    }

    pub fn eval(&self, p: f64) -> (f64, f64) {
        let (v, d) = self.fraction(p);
        (v + PDD_SLOPE * (p - self.p0), d + PDD_SLOPE)
    }
}

impl ScalarFn for PddCurve {
    fn value(&self, x: f64) -> f64 {
        self.eval(x).0
    }

    fn derivative(&self, x: f64) -> f64 {
        self.eval(x).1
    }
}

//! Pump head gain with speed scaling.

use wf_aml::ScalarFn;
use wf_network::HeadCurve;

use crate::smoothing::hermite;

/// Flow (m³/s) below which the gain curve is blended toward shutoff.
pub const PUMP_BLEND_Q: f64 = 1e-4;
/// Gain slope used for reverse flow.
pub const PUMP_REVERSE_SLOPE: f64 = 1e-6;

/// `ω²·A − B·ω^(2−C)·q^C` for forward flow, a shallow line for reverse
/// flow, and a cubic blend on `[0, PUMP_BLEND_Q]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PumpGain {
    a: f64,
    b: f64,
    c: f64,
}

impl PumpGain {
    pub fn new(curve: &HeadCurve, speed: f64) -> Self {
        Self {
            a: speed * speed * curve.a(),
            b: curve.b() * speed.powf(2.0 - curve.c()),
            c: curve.c(),
        }
    }

    /// Shutoff head at this speed.
    pub fn shutoff_head(&self) -> f64 {
        self.a
    }

    fn curve(&self, q: f64) -> (f64, f64) {
        (
            self.a - self.b * q.powf(self.c),
            -self.c * self.b * q.powf(self.c - 1.0),
        )
    }

    pub fn eval(&self, q: f64) -> (f64, f64) {
        if q <= 0.0 {
            (self.a - PUMP_REVERSE_SLOPE * q, -PUMP_REVERSE_SLOPE)
        } else if q < PUMP_BLEND_Q {
            let (v, d) = self.curve(PUMP_BLEND_Q);
            hermite(q, 0.0, PUMP_BLEND_Q, self.a, v, -PUMP_REVERSE_SLOPE, d)
        } else {
            self.curve(q)
        }
    }
}

impl ScalarFn for PumpGain {
    fn value(&self, x: f64) -> f64 {
        self.eval(x).0
    }

    fn derivative(&self, x: f64) -> f64 {
        self.eval(x).1
    }
}

//! Pump head curves of the form `h(q) = A - B·q^C`.

use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, NetworkResult};

/// Fitted pump head curve.
///
/// Built from 1, 2 or 3 (flow, head) points:
/// - one design point `(Q, H)` expands to `(0, 4H/3)`, `(Q, H)`, `(2Q, 0)`;
/// - two points give `C = 2` through both;
/// - three points give a full power fit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeadCurve {
    points: Vec<(f64, f64)>,
    a: f64,
    b: f64,
    c: f64,
}

impl HeadCurve {
    pub fn from_points(points: &[(f64, f64)]) -> NetworkResult<Self> {
        let fitted = match points {
            [(q, h)] => {
                if *q <= 0.0 || *h <= 0.0 {
                    return Err(invalid("design point must have positive flow and head"));
                }
                fit_three(&[(0.0, 4.0 * h / 3.0), (*q, *h), (2.0 * q, 0.0)])?
            }
            [p1, p2] => fit_two(*p1, *p2)?,
            [p1, p2, p3] => fit_three(&[*p1, *p2, *p3])?,
            _ => return Err(invalid("expected 1, 2 or 3 points")),
        };
        let (a, b, c) = fitted;
        if !(a.is_finite() && b.is_finite() && c.is_finite()) || a <= 0.0 || b <= 0.0 || c <= 0.0
        {
            return Err(invalid("fit produced non-physical coefficients"));
        }
        Ok(Self {
            points: points.to_vec(),
            a,
            b,
            c,
        })
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Shutoff head.
    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    /// Head gain at nominal speed for non-negative flow.
    pub fn head_at(&self, q: f64) -> f64 {
        self.a - self.b * q.max(0.0).powf(self.c)
    }

    /// Flow at which the nominal-speed curve reaches zero head.
    pub fn max_flow(&self) -> f64 {
        (self.a / self.b).powf(1.0 / self.c)
    }
}

fn invalid(what: &str) -> NetworkError {
    NetworkError::invalid("pump curve", what)
}

fn check_decreasing(points: &[(f64, f64)]) -> NetworkResult<()> {
    if points.iter().any(|(q, _)| *q < 0.0) {
        return Err(invalid("flows must be non-negative"));
    }
    for w in points.windows(2) {
        if w[1].0 <= w[0].0 {
            return Err(invalid("flows must be strictly increasing"));
        }
        if w[1].1 >= w[0].1 {
            return Err(invalid("head must be strictly decreasing"));
        }
    }
    Ok(())
}

fn fit_two(p1: (f64, f64), p2: (f64, f64)) -> NetworkResult<(f64, f64, f64)> {
    check_decreasing(&[p1, p2])?;
    let b = (p1.1 - p2.1) / (p2.0 * p2.0 - p1.0 * p1.0);
    let a = p1.1 + b * p1.0 * p1.0;
    Ok((a, b, 2.0))
}

fn fit_three(p: &[(f64, f64); 3]) -> NetworkResult<(f64, f64, f64)> {
    check_decreasing(p)?;
    let [(q0, h0), (q1, h1), (q2, h2)] = *p;

    if q0 == 0.0 {
        let c = ((h0 - h2) / (h0 - h1)).ln() / (q2 / q1).ln();
        let b = (h0 - h1) / q1.powf(c);
        return Ok((h0, b, c));
    }

    // General case: pick C so that the head-drop ratio matches, then solve
    // for B and A. The ratio is monotone in C, so bisection is enough.
    let target = (h0 - h1) / (h1 - h2);
    let ratio = |c: f64| (q1.powf(c) - q0.powf(c)) / (q2.powf(c) - q1.powf(c));
    let (mut lo, mut hi) = (0.05_f64, 20.0_f64);
    let (r_lo, r_hi) = (ratio(lo) - target, ratio(hi) - target);
    if r_lo * r_hi > 0.0 {
        return Err(invalid("no power-law curve passes through the three points"));
    }
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if (ratio(mid) - target) * r_lo > 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let c = 0.5 * (lo + hi);
    let b = (h0 - h1) / (q1.powf(c) - q0.powf(c));
    let a = h0 + b * q0.powf(c);
    Ok((a, b, c))
}

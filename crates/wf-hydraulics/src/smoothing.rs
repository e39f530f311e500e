//! Cubic Hermite blends used to make piecewise formulations C¹.

/// Value and slope of the cubic Hermite interpolant on `[x0, x1]` matching
/// `(f0, d0)` at `x0` and `(f1, d1)` at `x1`.
pub fn hermite(x: f64, x0: f64, x1: f64, f0: f64, f1: f64, d0: f64, d1: f64) -> (f64, f64) {
    let h = x1 - x0;
    let t = (x - x0) / h;
    let t2 = t * t;
    let t3 = t2 * t;

    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;
    let value = h00 * f0 + h10 * h * d0 + h01 * f1 + h11 * h * d1;

    let dh00 = 6.0 * t2 - 6.0 * t;
    let dh10 = 3.0 * t2 - 4.0 * t + 1.0;
    let dh01 = -6.0 * t2 + 6.0 * t;
    let dh11 = 3.0 * t2 - 2.0 * t;
    let slope = (dh00 * f0 + dh10 * h * d0 + dh01 * f1 + dh11 * h * d1) / h;

    (value, slope)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_end_conditions() {
        let (v0, s0) = hermite(1.0, 1.0, 3.0, 2.0, 5.0, -1.0, 4.0);
        let (v1, s1) = hermite(3.0, 1.0, 3.0, 2.0, 5.0, -1.0, 4.0);
        assert!((v0 - 2.0).abs() < 1e-12 && (s0 + 1.0).abs() < 1e-12);
        assert!((v1 - 5.0).abs() < 1e-12 && (s1 - 4.0).abs() < 1e-12);
    }

    #[test]
    fn reproduces_a_cubic() {
        let f = |x: f64| x * x * x - 2.0 * x;
        let df = |x: f64| 3.0 * x * x - 2.0;
        let (v, s) = hermite(0.7, 0.0, 2.0, f(0.0), f(2.0), df(0.0), df(2.0));
        assert!((v - f(0.7)).abs() < 1e-12);
        assert!((s - df(0.7)).abs() < 1e-12);
    }
}

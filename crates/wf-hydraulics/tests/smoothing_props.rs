//! Property tests for the smoothed constraint functions.

use proptest::prelude::*;
use wf_hydraulics::headloss::{HW_Q1, HW_Q2};
use wf_hydraulics::{PddCurve, SmoothPowerLaw};

proptest! {
    #[test]
    fn headloss_is_odd(q in -1.0_f64..1.0) {
        for f in [SmoothPowerLaw::hazen_williams(), SmoothPowerLaw::minor_loss()] {
            let (v, d) = f.eval(q);
            let (vn, dn) = f.eval(-q);
            prop_assert_eq!(v, -vn);
            prop_assert_eq!(d, dn);
        }
    }

    #[test]
    fn headloss_strictly_increasing(q in -0.01_f64..0.01, dq in 1e-7_f64..1e-3) {
        for f in [SmoothPowerLaw::hazen_williams(), SmoothPowerLaw::minor_loss()] {
            let (v0, d0) = f.eval(q);
            let (v1, _) = f.eval(q + dq);
            prop_assert!(d0 > 0.0);
            prop_assert!(v1 > v0);
        }
    }

    #[test]
    fn headloss_slope_matches_difference_quotient(q in 1e-5_f64..0.5) {
        let f = SmoothPowerLaw::hazen_williams();
        let h = q * 1e-6;
        let fd = (f.eval(q + h).0 - f.eval(q - h).0) / (2.0 * h);
        let d = f.eval(q).1;
        prop_assert!((fd - d).abs() <= 1e-5 * d.abs().max(1e-9), "q={} fd={} d={}", q, fd, d);
    }

    #[test]
    fn pdd_monotone_and_bounded(
        p0 in -5.0_f64..5.0,
        gap in 0.01_f64..30.0,
        e in 0.2_f64..6.0,
        a in 0.0_f64..1.0,
        b in 0.0_f64..1.0,
    ) {
        let c = PddCurve::new(p0, p0 + gap, e);
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (pl, ph) = (p0 + lo * gap, p0 + hi * gap);
        let (vl, dl) = c.eval(pl);
        let (vh, _) = c.eval(ph);
        prop_assert!(vl <= vh + 1e-15);
        prop_assert!(dl > 0.0);
        prop_assert!(vl >= -1e-9 && vl <= 1.0 + 1e-9);
        let (below, d_below) = c.eval(p0 - 1.0);
        let (above, d_above) = c.eval(p0 + gap + 1.0);
        prop_assert!(below.abs() < 1e-9 && d_below > 0.0);
        prop_assert!((above - 1.0).abs() < 1e-9 && d_above > 0.0);
    }
}

#[test]
fn headloss_continuity_at_all_breakpoints() {
    let f = SmoothPowerLaw::hazen_williams();
    for q in [HW_Q1, HW_Q2, -HW_Q1, -HW_Q2] {
        let (vl, dl) = f.eval(q - 1e-13);
        let (vr, dr) = f.eval(q + 1e-13);
        assert!((vl - vr).abs() < 1e-10);
        assert!((dl - dr).abs() < 1e-6);
    }
}

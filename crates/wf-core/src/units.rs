// wf-core/src/units.rs

use uom::si::f64::{
    Acceleration as UomAcceleration, Area as UomArea, Length as UomLength,
    MassDensity as UomMassDensity, Pressure as UomPressure, Time as UomTime,
    Volume as UomVolume, VolumeRate as UomVolumeRate,
};

// Public canonical unit types (SI, f64)
pub type Accel = UomAcceleration;
pub type Area = UomArea;
pub type Density = UomMassDensity;
pub type Length = UomLength;
pub type Pressure = UomPressure;
pub type Time = UomTime;
pub type Volume = UomVolume;
pub type FlowRate = UomVolumeRate;

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn mm(v: f64) -> Length {
    use uom::si::length::millimeter;
    Length::new::<millimeter>(v)
}

#[inline]
pub fn m2(v: f64) -> Area {
    use uom::si::area::square_meter;
    Area::new::<square_meter>(v)
}

#[inline]
pub fn m3(v: f64) -> Volume {
    use uom::si::volume::cubic_meter;
    Volume::new::<cubic_meter>(v)
}

#[inline]
pub fn m3ps(v: f64) -> FlowRate {
    use uom::si::volume_rate::cubic_meter_per_second;
    FlowRate::new::<cubic_meter_per_second>(v)
}

#[inline]
pub fn lps(v: f64) -> FlowRate {
    use uom::si::volume_rate::liter_per_second;
    FlowRate::new::<liter_per_second>(v)
}

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

#[inline]
pub fn hours(v: f64) -> Time {
    use uom::si::time::hour;
    Time::new::<hour>(v)
}

pub mod constants {
    use super::*;

    pub const G0_MPS2: f64 = 9.806_65;
    pub const WATER_DENSITY_KGM3: f64 = 1000.0;
    pub const SECONDS_PER_DAY: f64 = 86_400.0;

    #[inline]
    pub fn g0() -> Accel {
        use uom::si::acceleration::meter_per_second_squared;
        Accel::new::<meter_per_second_squared>(G0_MPS2)
    }

    #[inline]
    pub fn water_density() -> Density {
        use uom::si::mass_density::kilogram_per_cubic_meter;
        Density::new::<kilogram_per_cubic_meter>(WATER_DENSITY_KGM3)
    }

    /// Pressure (Pa) of a water column of the given height (m).
    #[inline]
    pub fn head_to_pa(head_m: f64) -> f64 {
        head_m * WATER_DENSITY_KGM3 * G0_MPS2
    }
}

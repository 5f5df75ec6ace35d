//! SI physical constants shared by the bootstrap diagnostics and profiles.

pub const PI: f64 = std::f64::consts::PI;
pub const CHARGE_ELEMENTARY: f64 = 1.602_176_634e-19;
pub const MASS_ELECTRON: f64 = 9.109_383_701_5e-31;
pub const MASS_PROTON: f64 = 1.672_621_923_69e-27;
pub const SPEED_LIGHT: f64 = 299_792_458.0;
pub const PERMEABILITY: f64 = 4.0e-7 * PI;
pub const PERMITTIVITY: f64 = 1.0 / (PERMEABILITY * SPEED_LIGHT * SPEED_LIGHT);

/// Half the space diagonal of a unit cube.
pub const HALF_CUBE_DIAGONAL: f64 = 0.866_025_403_784_438_6;

#[cfg(test)]
mod tests {
    use super::{
        CHARGE_ELEMENTARY, HALF_CUBE_DIAGONAL, MASS_ELECTRON, MASS_PROTON, PERMEABILITY,
        PERMITTIVITY, SPEED_LIGHT,
    };

    #[test]
    fn constants_match_expected_relationships() {
        let c2 = 1.0 / (PERMEABILITY * PERMITTIVITY);
        assert!((c2.sqrt() - SPEED_LIGHT).abs() / SPEED_LIGHT <= 1.0e-12);
        assert!((HALF_CUBE_DIAGONAL - 0.5 * 3.0_f64.sqrt()).abs() <= 1.0e-15);
    }

    #[test]
    fn physics_constants_remain_finite_and_positive() {
        for value in [
            CHARGE_ELEMENTARY,
            MASS_ELECTRON,
            MASS_PROTON,
            SPEED_LIGHT,
            PERMEABILITY,
            PERMITTIVITY,
        ] {
            assert!(value.is_finite());
            assert!(value > 0.0);
        }
    }
}

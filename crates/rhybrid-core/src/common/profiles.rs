//! Named physics profiles selected by configuration string.

use super::constants::PI;
use crate::domain::{HybridError, HybridResult, Vec3, dot, squared_norm};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResistivityProfileKind {
    Constant,
    ConductingSphere,
}

impl ResistivityProfileKind {
    pub const ALL: [ResistivityProfileKind; 2] = [Self::Constant, Self::ConductingSphere];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::ConductingSphere => "conducting_sphere",
        }
    }

    pub fn from_name(name: &str) -> HybridResult<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| {
                HybridError::configuration(
                    "CONFIG.UNKNOWN_PROFILE",
                    format!("given resistivity profile not found ({name})"),
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResistivityProfile {
    pub kind: ResistivityProfileKind,
    /// Resistivity in Ohm m.
    pub eta: f64,
    /// Squared radius of the conducting sphere.
    pub r2: f64,
}

impl ResistivityProfile {
    pub fn evaluate(&self, position: Vec3) -> f64 {
        match self.kind {
            ResistivityProfileKind::Constant => self.eta,
            ResistivityProfileKind::ConductingSphere => {
                if squared_norm(position) < self.r2 {
                    0.0
                } else {
                    self.eta
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagneticFieldProfileKind {
    None,
    Imf,
    Dipole,
}

impl MagneticFieldProfileKind {
    pub const ALL: [MagneticFieldProfileKind; 3] = [Self::None, Self::Imf, Self::Dipole];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Imf => "imf",
            Self::Dipole => "dipole",
        }
    }

    pub fn from_name(name: &str) -> HybridResult<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| {
                HybridError::configuration(
                    "CONFIG.UNKNOWN_PROFILE",
                    format!("given magnetic field profile not found ({name})"),
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DipoleParameters {
    pub origin: Vec3,
    /// `3 * B_surface * R_surface^3`.
    pub moment_coeff: f64,
    pub min_r2: f64,
    pub theta_deg: f64,
    pub phi_deg: f64,
}

impl DipoleParameters {
    pub fn axis(&self) -> Vec3 {
        let theta = self.theta_deg * PI / 180.0;
        let phi = self.phi_deg * PI / 180.0;
        [theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagneticFieldProfile {
    pub kind: MagneticFieldProfileKind,
    pub imf: Vec3,
    pub dipole: DipoleParameters,
}

impl MagneticFieldProfile {
    pub fn evaluate(&self, position: Vec3) -> Vec3 {
        match self.kind {
            MagneticFieldProfileKind::None => [0.0; 3],
            MagneticFieldProfileKind::Imf => self.imf,
            MagneticFieldProfileKind::Dipole => self.dipole_field(position),
        }
    }

    fn dipole_field(&self, position: Vec3) -> Vec3 {
        let r = [
            position[0] - self.dipole.origin[0],
            position[1] - self.dipole.origin[1],
            position[2] - self.dipole.origin[2],
        ];
        let r2 = squared_norm(r).max(self.dipole.min_r2);
        if r2 <= 0.0 {
            return [0.0; 3];
        }
        let r3 = r2 * r2.sqrt();
        let r5 = r3 * r2;
        let axis = self.dipole.axis();
        let radial = self.dipole.moment_coeff * dot(axis, r) / r5;
        let along_axis = self.dipole.moment_coeff / (3.0 * r3);
        [
            radial * r[0] - along_axis * axis[0],
            radial * r[1] - along_axis * axis[1],
            radial * r[2] - along_axis * axis[2],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DipoleParameters, MagneticFieldProfile, MagneticFieldProfileKind, ResistivityProfile,
        ResistivityProfileKind,
    };

    fn dipole(moment_coeff: f64, min_r2: f64) -> MagneticFieldProfile {
        MagneticFieldProfile {
            kind: MagneticFieldProfileKind::Dipole,
            imf: [0.0; 3],
            dipole: DipoleParameters {
                origin: [0.0; 3],
                moment_coeff,
                min_r2,
                theta_deg: 0.0,
                phi_deg: 0.0,
            },
        }
    }

    #[test]
    fn profile_names_resolve_and_unknown_names_fail() {
        for kind in ResistivityProfileKind::ALL {
            assert_eq!(ResistivityProfileKind::from_name(kind.as_str()), Ok(kind));
        }
        for kind in MagneticFieldProfileKind::ALL {
            assert_eq!(MagneticFieldProfileKind::from_name(kind.as_str()), Ok(kind));
        }
        let error = MagneticFieldProfileKind::from_name("quadrupole")
            .expect_err("unknown profile should fail");
        assert_eq!(error.placeholder(), "CONFIG.UNKNOWN_PROFILE");
    }

    #[test]
    fn conducting_sphere_is_zero_inside_radius() {
        let profile = ResistivityProfile {
            kind: ResistivityProfileKind::ConductingSphere,
            eta: 2.0,
            r2: 4.0,
        };
        assert_eq!(profile.evaluate([1.0, 0.0, 0.0]), 0.0);
        assert_eq!(profile.evaluate([3.0, 0.0, 0.0]), 2.0);

        let constant = ResistivityProfile {
            kind: ResistivityProfileKind::Constant,
            ..profile
        };
        assert_eq!(constant.evaluate([1.0, 0.0, 0.0]), 2.0);
    }

    #[test]
    fn dipole_matches_surface_strength_on_axis_and_equator() {
        let surface_b = 1.0e-7;
        let surface_r: f64 = 2.0;
        let profile = dipole(3.0 * surface_b * surface_r.powi(3), 0.0);

        let pole = profile.evaluate([0.0, 0.0, surface_r]);
        assert!((pole[2] - 2.0 * surface_b).abs() <= 1.0e-20);

        let equator = profile.evaluate([surface_r, 0.0, 0.0]);
        assert!((equator[2] + surface_b).abs() <= 1.0e-20);
        assert!(equator[0].abs() <= 1.0e-20);
    }

    #[test]
    fn dipole_radius_is_floored_at_minimum() {
        let profile = dipole(3.0, 1.0);
        let at_origin = profile.evaluate([0.0; 3]);
        assert!(at_origin.iter().all(|value| value.is_finite()));
        assert_eq!(at_origin, [0.0, 0.0, -1.0]);
    }
}

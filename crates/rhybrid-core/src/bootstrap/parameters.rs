use crate::common::config::HybridConfig;
use crate::common::constants::{CHARGE_ELEMENTARY, PERMEABILITY};
use crate::common::profiles::{
    DipoleParameters, MagneticFieldProfile, MagneticFieldProfileKind, ResistivityProfile,
    ResistivityProfileKind,
};
use crate::domain::{HybridResult, Vec3};
use crate::modules::geometry::{BoundaryThresholds, squared_threshold};

/// Node distances (in dx) and neighbour counts of the 27-node smoothing kernel.
pub const GAUSS_KERNEL_SHELLS: [(f64, f64); 4] = [
    (0.0, 1.0),
    (1.0, 6.0),
    (std::f64::consts::SQRT_2, 12.0),
    (1.732_050_807_568_877_2, 8.0),
];

fn gaussian(x: f64, sigma: f64) -> f64 {
    (-0.5 * (x / sigma) * (x / sigma)).exp()
}

/// Normalized kernel coefficients so that the weights of all 27 nodes sum to one.
pub fn gauss_kernel_coefficients(sigma: f64) -> Option<[f64; 4]> {
    if !(sigma > 0.0) {
        return None;
    }
    let weights = GAUSS_KERNEL_SHELLS.map(|(distance, _)| gaussian(distance, sigma));
    let total: f64 = weights
        .iter()
        .zip(GAUSS_KERNEL_SHELLS)
        .map(|(weight, (_, count))| weight * count)
        .sum();
    Some(weights.map(|weight| weight / total))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResistivitySettings {
    pub profile: ResistivityProfile,
    pub eta_c: f64,
    /// `mu0 * dx^2 / dt`.
    pub grid_unit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntrinsicFieldSettings {
    pub profile: MagneticFieldProfile,
    pub laminar_r2: f64,
    pub laminar_r3: f64,
    pub coeff_dipole: f64,
    pub coeff_quadrupole: f64,
    pub surface_b: f64,
    pub surface_r: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedParameters {
    pub dx: f64,
    pub dv: f64,
    pub dt: f64,
    pub r_object: f64,
    pub obstacle_origin: Vec3,
    pub field_obstacle_r2: f64,
    pub particle_obstacle_r2: f64,
    pub xmin: Option<f64>,
    pub m_object: f64,
    pub max_ue2: f64,
    pub max_vi2: f64,
    pub min_rho_qi: f64,
    pub ecut2: Option<f64>,
    pub hall_term: bool,
    pub e_filter: u32,
    pub gauss_sigma: f64,
    pub gauss_coefficients: Option<[f64; 4]>,
    pub log_interval: u64,
    pub imf: Vec3,
    pub resistivity: Option<ResistivitySettings>,
    pub intrinsic_field: Option<IntrinsicFieldSettings>,
    pub warnings: Vec<String>,
}

impl DerivedParameters {
    pub fn derive(config: &HybridConfig, dx: f64) -> HybridResult<Self> {
        let hybrid = &config.hybrid;
        let capabilities = &config.capabilities;
        let dt = config.simulation.dt;
        let mut warnings = Vec::new();

        let mut max_vi = hybrid.max_vi;
        if max_vi > dx / dt {
            warnings.push(format!(
                "maxVi = {} km/s > dx/dt, setting maxVi = 0.9*dx/dt",
                max_vi / 1e3
            ));
            max_vi = 0.9 * dx / dt;
        }

        let gauss_coefficients = gauss_kernel_coefficients(hybrid.e_filter_node_gauss_sigma);
        let gauss_sigma = if gauss_coefficients.is_some() {
            hybrid.e_filter_node_gauss_sigma
        } else {
            0.0
        };

        let resistivity = if capabilities.resistivity {
            let grid_unit = PERMEABILITY * dx * dx / dt;
            Some(ResistivitySettings {
                profile: ResistivityProfile {
                    kind: ResistivityProfileKind::from_name(&config.resistivity.profile_name)?,
                    eta: config.resistivity.eta_c * grid_unit,
                    r2: config.resistivity.radius * config.resistivity.radius,
                },
                eta_c: config.resistivity.eta_c,
                grid_unit,
            })
        } else {
            None
        };

        let intrinsic_field = if capabilities.initial_b || capabilities.constant_b {
            let intrinsic = &config.intrinsic_b;
            Some(IntrinsicFieldSettings {
                profile: MagneticFieldProfile {
                    kind: MagneticFieldProfileKind::from_name(&intrinsic.profile_name)?,
                    imf: config.imf.vector(),
                    dipole: DipoleParameters {
                        origin: [intrinsic.x, intrinsic.y, intrinsic.z],
                        moment_coeff: 3.0 * intrinsic.dipole_surface_b * intrinsic.dipole_surface_r.powi(3),
                        min_r2: intrinsic.minimum_r * intrinsic.minimum_r,
                        theta_deg: intrinsic.theta,
                        phi_deg: intrinsic.phi,
                    },
                },
                laminar_r2: intrinsic.laminar_r * intrinsic.laminar_r,
                laminar_r3: intrinsic.laminar_r.powi(3),
                coeff_dipole: intrinsic.coeff_dipole,
                coeff_quadrupole: intrinsic.coeff_quadrupole,
                surface_b: intrinsic.dipole_surface_b,
                surface_r: intrinsic.dipole_surface_r,
            })
        } else {
            None
        };

        Ok(Self {
            dx,
            dv: dx * dx * dx,
            dt,
            r_object: if hybrid.r_object < 0.0 { 1.0 } else { hybrid.r_object },
            obstacle_origin: hybrid.obstacle_origin,
            field_obstacle_r2: squared_threshold(hybrid.r_field_obstacle),
            particle_obstacle_r2: squared_threshold(hybrid.r_particle_obstacle),
            xmin: capabilities.xmin_boundary.then_some(hybrid.xmin),
            m_object: hybrid.m_object,
            max_ue2: hybrid.max_ue * hybrid.max_ue,
            max_vi2: max_vi * max_vi,
            min_rho_qi: hybrid.min_rho_qi,
            ecut2: capabilities.ecut.then_some(hybrid.ecut * hybrid.ecut),
            hall_term: hybrid.hall_term,
            e_filter: u32::try_from(hybrid.e_filter.max(0)).unwrap_or(u32::MAX),
            gauss_sigma,
            gauss_coefficients,
            log_interval: u64::try_from(hybrid.log_interval).unwrap_or(0),
            imf: config.imf.vector(),
            resistivity,
            intrinsic_field,
            warnings,
        })
    }

    pub fn boundary_thresholds(&self) -> BoundaryThresholds {
        BoundaryThresholds {
            field_r2: self.field_obstacle_r2,
            particle_r2: self.particle_obstacle_r2,
            xmin: self.xmin,
        }
    }

    fn radius_line(&self, label: &str, r2: f64) -> String {
        if r2 > 0.0 {
            let radius = r2.sqrt();
            format!(
                "{label} = {} km = {} R_object = {} km + R_object",
                radius / 1e3,
                radius / self.r_object,
                (radius - self.r_object) / 1e3
            )
        } else {
            format!("{label} = {r2}")
        }
    }

    pub fn report_lines(&self) -> Vec<String> {
        let mut lines = vec![
            "simulation parameters".to_string(),
            format!("R_object  = {} km", self.r_object / 1e3),
            self.radius_line("R_fieldObstacle", self.field_obstacle_r2),
            self.radius_line("R_particleObstacle", self.particle_obstacle_r2),
        ];
        if let Some(xmin) = self.xmin {
            lines.push(format!("xmin = {} km", xmin / 1e3));
        }
        lines.extend([
            format!("M_object  = {} kg", self.m_object),
            format!("maxUe = {} km/s", self.max_ue2.sqrt() / 1e3),
            format!("maxVi = {} km/s", self.max_vi2.sqrt() / 1e3),
            format!(
                "minRhoQi = {} C/m^3 = {} e/cm^3",
                self.min_rho_qi,
                self.min_rho_qi / (1e6 * CHARGE_ELEMENTARY)
            ),
        ]);
        if let Some(ecut2) = self.ecut2 {
            lines.push(format!("Ecut  = {} V/m", ecut2.sqrt()));
        }
        lines.extend([
            format!("Hall term = {}", self.hall_term),
            format!("dV = {} m^3", self.dv),
            format!("log interval = {} timesteps", self.log_interval),
            "(FILTERING)".to_string(),
            format!(
                "Number of E intpol smoothings = {} (node2cell2node interpolation technique)",
                self.e_filter
            ),
            format!(
                "Sigma of E gaussian smoothing = {} dx (gaussian average technique)",
                self.gauss_sigma
            ),
        ]);
        if let Some(coefficients) = self.gauss_coefficients {
            let labels = ["d = 0", "d = 1dx", "d = sqrt(2)dx", "d = sqrt(3)dx"];
            for (index, (coefficient, label)) in coefficients.iter().zip(labels).enumerate() {
                lines.push(format!("C{} = {coefficient} ({label})", index + 1));
            }
        }

        if let Some(resistivity) = &self.resistivity {
            lines.extend([
                "(RESISTIVITY)".to_string(),
                format!("Resistivity profile = {}", resistivity.profile.kind.as_str()),
                format!(
                    "eta = {} mu_0*dx^2/dt = {} Ohm m",
                    resistivity.eta_c, resistivity.profile.eta
                ),
                self.radius_line("R", resistivity.profile.r2),
            ]);
        }

        if let Some(field) = &self.intrinsic_field {
            let dipole = &field.profile.dipole;
            lines.extend([
                "(INTRINSIC MAGNETIC FIELD)".to_string(),
                format!("Magnetic field profile = {}", field.profile.kind.as_str()),
                format!("Laminar flow around sphere R = {} km", field.laminar_r2.sqrt() / 1e3),
                format!("Dipole coefficient = {}", field.coeff_dipole),
                format!("Quadrupole coefficient = {}", field.coeff_quadrupole),
                format!("Dipole surface B = {} nT", field.surface_b / 1e-9),
                format!("Dipole surface R = {} km", field.surface_r / 1e3),
                format!("Minimum R = {} km", dipole.min_r2.sqrt() / 1e3),
                format!(
                    "origin = ({}, {}, {}) km",
                    dipole.origin[0] / 1e3,
                    dipole.origin[1] / 1e3,
                    dipole.origin[2] / 1e3
                ),
                format!("theta = {} deg", dipole.theta_deg),
                format!("phi   = {} deg", dipole.phi_deg),
            ]);
        }
        lines
    }
}

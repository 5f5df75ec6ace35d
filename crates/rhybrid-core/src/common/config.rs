//! Run configuration consumed by the bootstrap.
//!
//! The file format is JSON; section and key names follow the solver's
//! historical configuration keys (`R_fieldObstacle`, `EfilterNodeGaussSigma`,
//! ...) so existing parameter sets translate one-to-one.

use super::profiles::{MagneticFieldProfileKind, ResistivityProfileKind};
use crate::domain::{HybridError, HybridResult, Subsystem, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HybridConfig {
    pub simulation: SimulationConfig,
    pub grid: GridLayoutConfig,
    pub hybrid: HybridParameters,
    pub imf: ImfConfig,
    pub resistivity: ResistivityConfig,
    pub intrinsic_b: IntrinsicFieldConfig,
    pub populations: PopulationNames,
    pub species: BTreeMap<String, SpeciesConfig>,
    pub analysis: AnalysisConfig,
    pub capabilities: Capabilities,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub dt: f64,
    #[serde(rename = "t")]
    pub time: f64,
    pub restarted: bool,
    pub output_dir: PathBuf,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: 1.0,
            time: 0.0,
            restarted: false,
            output_dir: PathBuf::from("."),
        }
    }
}

/// Box layout used to build the in-process reference grid.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GridLayoutConfig {
    pub min: Vec3,
    pub cells: [usize; 3],
    pub cell_size: Vec3,
    pub block_width: [usize; 3],
}

impl Default for GridLayoutConfig {
    fn default() -> Self {
        Self {
            min: [-1.0, -1.0, -1.0],
            cells: [2, 2, 2],
            cell_size: [1.0, 1.0, 1.0],
            block_width: [1, 1, 1],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HybridParameters {
    pub log_interval: i64,
    pub output_parameters: String,
    #[serde(rename = "R_object")]
    pub r_object: f64,
    #[serde(rename = "R_fieldObstacle")]
    pub r_field_obstacle: f64,
    #[serde(rename = "R_particleObstacle")]
    pub r_particle_obstacle: f64,
    pub obstacle_origin: Vec3,
    pub xmin: f64,
    #[serde(rename = "M_object")]
    pub m_object: f64,
    #[serde(rename = "maxUe")]
    pub max_ue: f64,
    #[serde(rename = "maxVi")]
    pub max_vi: f64,
    #[serde(rename = "minRhoQi")]
    pub min_rho_qi: f64,
    #[serde(rename = "Ecut")]
    pub ecut: f64,
    pub hall_term: bool,
    #[serde(rename = "Efilter")]
    pub e_filter: i64,
    #[serde(rename = "EfilterNodeGaussSigma")]
    pub e_filter_node_gauss_sigma: f64,
}

impl Default for HybridParameters {
    fn default() -> Self {
        Self {
            log_interval: 0,
            output_parameters: String::new(),
            r_object: 0.0,
            r_field_obstacle: 0.0,
            r_particle_obstacle: 0.0,
            obstacle_origin: [0.0; 3],
            xmin: 0.0,
            m_object: 0.0,
            max_ue: 0.0,
            max_vi: 0.0,
            min_rho_qi: 0.0,
            ecut: 0.0,
            hall_term: true,
            e_filter: 0,
            e_filter_node_gauss_sigma: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ImfConfig {
    #[serde(rename = "Bx")]
    pub bx: f64,
    #[serde(rename = "By")]
    pub by: f64,
    #[serde(rename = "Bz")]
    pub bz: f64,
}

impl ImfConfig {
    pub fn vector(&self) -> Vec3 {
        [self.bx, self.by, self.bz]
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ResistivityConfig {
    pub profile_name: String,
    #[serde(rename = "etaC")]
    pub eta_c: f64,
    #[serde(rename = "R")]
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct IntrinsicFieldConfig {
    pub profile_name: String,
    #[serde(rename = "laminarR")]
    pub laminar_r: f64,
    #[serde(rename = "coeffDipole")]
    pub coeff_dipole: f64,
    #[serde(rename = "coeffQuadrupole")]
    pub coeff_quadrupole: f64,
    #[serde(rename = "dipoleSurfaceB")]
    pub dipole_surface_b: f64,
    #[serde(rename = "dipoleSurfaceR")]
    pub dipole_surface_r: f64,
    #[serde(rename = "minimumR")]
    pub minimum_r: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Dipole axis polar angle in degrees.
    pub theta: f64,
    /// Dipole axis azimuth in degrees.
    pub phi: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PopulationNames {
    pub uniform: Vec<String>,
    pub solarwind: Vec<String>,
    pub ionosphere: Vec<String>,
    pub exosphere: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SpeciesConfig {
    pub charge: f64,
    pub mass: f64,
    #[serde(default)]
    pub density: f64,
    #[serde(default)]
    pub velocity: f64,
    #[serde(default)]
    pub vth: f64,
    #[serde(default = "default_output_str")]
    pub output_str: String,
    #[serde(default = "default_include_in_plasma")]
    pub include_in_plasma: bool,
}

fn default_output_str() -> String {
    "-".to_string()
}

fn default_include_in_plasma() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub orbit_spectra_t_start: f64,
    pub orbit_spectra_t_end: f64,
    pub orbit_spectra_max_particles: f64,
    pub orbit_spectra_write_interval_timesteps: f64,
    #[serde(rename = "orbitfile")]
    pub orbit_files: Vec<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            orbit_spectra_t_start: -1.0,
            orbit_spectra_t_end: -1.0,
            orbit_spectra_max_particles: 1.0e5,
            orbit_spectra_write_interval_timesteps: 10.0,
            orbit_files: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Capabilities {
    pub resistivity: bool,
    pub orbit_spectra: bool,
    pub population_averages: bool,
    pub xmin_boundary: bool,
    pub ecut: bool,
    pub initial_b: bool,
    pub constant_b: bool,
}

impl Capabilities {
    pub fn enabled(&self, subsystem: Subsystem) -> bool {
        match subsystem {
            Subsystem::Resistivity => self.resistivity,
            Subsystem::OrbitSpectra => self.orbit_spectra,
            Subsystem::PopulationAverages => self.population_averages,
            Subsystem::XminBoundary => self.xmin_boundary,
            Subsystem::Ecut => self.ecut,
            Subsystem::InitialB => self.initial_b,
            Subsystem::ConstantB => self.constant_b,
        }
    }

    pub fn enabled_subsystems(&self) -> Vec<Subsystem> {
        Subsystem::ALL
            .into_iter()
            .filter(|subsystem| self.enabled(*subsystem))
            .collect()
    }
}

impl HybridConfig {
    pub fn from_json_str(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    pub fn validate(&self) -> HybridResult<()> {
        if !(self.simulation.dt.is_finite() && self.simulation.dt > 0.0) {
            return Err(HybridError::configuration(
                "CONFIG.TIMESTEP",
                format!(
                    "timestep must be positive and finite (dt = {})",
                    self.simulation.dt
                ),
            ));
        }

        if self.capabilities.initial_b && self.capabilities.constant_b {
            return Err(HybridError::configuration(
                "CONFIG.B_PROFILE_MODE",
                "cannot enable initial and constant intrinsic magnetic field at the same time",
            ));
        }

        if self.capabilities.resistivity {
            ResistivityProfileKind::from_name(&self.resistivity.profile_name)?;
        }
        if self.capabilities.initial_b || self.capabilities.constant_b {
            MagneticFieldProfileKind::from_name(&self.intrinsic_b.profile_name)?;
        }

        self.validate_grid_layout()?;
        Ok(())
    }

    fn validate_grid_layout(&self) -> HybridResult<()> {
        let layout = &self.grid;
        for axis in 0..3 {
            if layout.block_width[axis] == 0 || layout.cells[axis] == 0 {
                return Err(HybridError::configuration(
                    "CONFIG.GRID_LAYOUT",
                    format!(
                        "grid cells {:?} and block width {:?} must be positive on every axis",
                        layout.cells, layout.block_width
                    ),
                ));
            }
            if layout.cells[axis] % layout.block_width[axis] != 0 {
                return Err(HybridError::configuration(
                    "CONFIG.GRID_LAYOUT",
                    format!(
                        "grid cells {:?} are not divisible by block width {:?}",
                        layout.cells, layout.block_width
                    ),
                ));
            }
            if !(layout.cell_size[axis].is_finite() && layout.cell_size[axis] > 0.0) {
                return Err(HybridError::configuration(
                    "CONFIG.GRID_LAYOUT",
                    format!("cell size {:?} must be positive", layout.cell_size),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HybridConfigError {
    #[error("failed to read hybrid configuration '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse hybrid configuration '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl From<HybridConfigError> for HybridError {
    fn from(error: HybridConfigError) -> Self {
        match &error {
            HybridConfigError::Read { .. } => {
                HybridError::io_system("IO.CONFIG_READ", error.to_string())
            }
            HybridConfigError::Parse { .. } => {
                HybridError::configuration("CONFIG.PARSE", error.to_string())
            }
        }
    }
}

pub fn load_hybrid_config(path: impl AsRef<Path>) -> Result<HybridConfig, HybridConfigError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| HybridConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    HybridConfig::from_json_str(&source).map_err(|source| HybridConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::{HybridConfig, HybridConfigError, load_hybrid_config};
    use crate::domain::{HybridError, HybridErrorCategory, Subsystem};
    use std::fs;
    use tempfile::TempDir;

    const CONFIG_FIXTURE: &str = r#"
    {
      "simulation": { "dt": 0.05, "t": 0.0 },
      "hybrid": {
        "R_object": 2439.7e3,
        "R_fieldObstacle": 2500e3,
        "R_particleObstacle": 2439.7e3,
        "maxVi": 1500e3,
        "output_parameters": "cellB n_tot"
      },
      "imf": { "Bx": -15e-9, "By": 5e-9, "Bz": -2e-9 },
      "populations": { "solarwind": ["H+sw", ""], "exosphere": ["Na+"] },
      "species": {
        "H+sw": { "charge": 1.602176634e-19, "mass": 1.67262192369e-27, "density": 3.0e7, "velocity": 400e3, "vth": 40e3, "output_str": "sw" },
        "Na+": { "charge": 1.602176634e-19, "mass": 3.8e-26 }
      },
      "capabilities": { "orbit_spectra": true }
    }
    "#;

    #[test]
    fn historical_key_names_are_accepted() {
        let config = HybridConfig::from_json_str(CONFIG_FIXTURE).expect("config should parse");

        assert_eq!(config.simulation.dt, 0.05);
        assert_eq!(config.hybrid.r_field_obstacle, 2500e3);
        assert_eq!(config.hybrid.max_vi, 1500e3);
        assert!(config.hybrid.hall_term);
        assert_eq!(config.imf.vector(), [-15e-9, 5e-9, -2e-9]);
        assert_eq!(config.populations.solarwind, vec!["H+sw".to_string(), String::new()]);
        assert_eq!(config.species["Na+"].output_str, "-");
        assert!(config.species["Na+"].include_in_plasma);
        assert_eq!(config.analysis.orbit_spectra_max_particles, 1.0e5);
        assert_eq!(
            config.capabilities.enabled_subsystems(),
            vec![Subsystem::OrbitSpectra]
        );
        config.validate().expect("fixture should validate");
    }

    #[test]
    fn contradictory_magnetic_field_modes_are_rejected() {
        let mut config = HybridConfig::default();
        config.capabilities.initial_b = true;
        config.capabilities.constant_b = true;
        config.intrinsic_b.profile_name = "dipole".to_string();

        let error = config.validate().expect_err("both B modes should fail");
        assert_eq!(error.category(), HybridErrorCategory::ConfigurationError);
        assert_eq!(error.placeholder(), "CONFIG.B_PROFILE_MODE");
    }

    #[test]
    fn unknown_resistivity_profile_is_rejected_at_validation() {
        let mut config = HybridConfig::default();
        config.capabilities.resistivity = true;
        config.resistivity.profile_name = "spitzer".to_string();

        let error = config.validate().expect_err("unknown profile should fail");
        assert_eq!(error.placeholder(), "CONFIG.UNKNOWN_PROFILE");
        assert!(error.message().contains("spitzer"));
    }

    #[test]
    fn grid_layout_must_tile_into_blocks() {
        let mut config = HybridConfig::default();
        config.grid.cells = [4, 4, 3];
        config.grid.block_width = [2, 2, 2];

        let error = config.validate().expect_err("uneven blocks should fail");
        assert_eq!(error.placeholder(), "CONFIG.GRID_LAYOUT");
    }

    #[test]
    fn non_positive_timestep_is_rejected() {
        let mut config = HybridConfig::default();
        config.simulation.dt = 0.0;
        assert_eq!(
            config.validate().expect_err("dt = 0 should fail").placeholder(),
            "CONFIG.TIMESTEP"
        );
    }

    #[test]
    fn loader_reports_read_and_parse_failures() {
        let temp = TempDir::new().expect("tempdir should be created");
        let missing = temp.path().join("missing.json");
        let read_error = load_hybrid_config(&missing).expect_err("missing file should fail");
        assert!(matches!(read_error, HybridConfigError::Read { .. }));
        assert_eq!(
            HybridError::from(read_error).category(),
            HybridErrorCategory::IoSystemError
        );

        let broken = temp.path().join("broken.json");
        fs::write(&broken, "{ \"simulation\": ").expect("fixture should be written");
        let parse_error = load_hybrid_config(&broken).expect_err("broken json should fail");
        assert!(parse_error.to_string().contains("broken.json"));
        assert_eq!(
            HybridError::from(parse_error).category(),
            HybridErrorCategory::ConfigurationError
        );
    }
}
